use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use phyllo_api::auth::JwtClaims;

/// Secret shared by the test config and the tokens minted here.
pub const TEST_JWT_SECRET: &str = "test-secret-key-min-32-characters-long-for-testing";

/// A caller with a signed bearer token.
pub struct TestUser {
    pub id: String,
    pub token: String,
}

impl TestUser {
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

fn sign(sub: &str, role: Option<&str>, ttl_secs: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = JwtClaims {
        sub: sub.to_string(),
        role: role.map(String::from),
        exp: now + ttl_secs,
        iat: now,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .expect("Failed to sign test token")
}

pub fn user(id: &str) -> TestUser {
    TestUser {
        id: id.to_string(),
        token: sign(id, Some("USER"), 3600),
    }
}

pub fn admin(id: &str) -> TestUser {
    TestUser {
        id: id.to_string(),
        token: sign(id, Some("ADMIN"), 3600),
    }
}

pub fn expired(id: &str) -> TestUser {
    TestUser {
        id: id.to_string(),
        token: sign(id, None, -3600),
    }
}
