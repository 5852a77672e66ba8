use phyllo_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;

    // Database, storage tiers, classifier client and routes
    let (_state, router) = phyllo_api::setup::initialize_app(config.clone()).await?;

    phyllo_api::setup::server::start_server(&config, router).await?;

    Ok(())
}
