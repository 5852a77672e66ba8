//! Client for the external leaf classifier.
//!
//! The classifier exposes `POST {base}/predict` taking a multipart `image` field and
//! answers with three model outputs: species (`model1`), leaf shape (`model2`) and
//! the plant gate (`model3`).

use async_trait::async_trait;
use phyllo_core::models::{ClassificationOutcome, InferenceResult};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Gate classes that mean "not a plant".
const NOT_A_PLANT_CLASSES: &[&str] = &["false"];

#[derive(Debug, Error)]
pub enum InferenceError {
    /// Network failure, timeout or non-success status from the classifier.
    #[error("Classifier unavailable: {0}")]
    Unavailable(String),

    /// The classifier answered but the body did not have the expected shape.
    #[error("Malformed classifier response: {0}")]
    MalformedResponse(String),
}

/// Anything that can classify an uploaded image.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(
        &self,
        image: Vec<u8>,
        filename: &str,
        content_type: &str,
    ) -> Result<ClassificationOutcome, InferenceError>;
}

#[derive(Debug, Deserialize)]
struct ModelOutput {
    #[serde(default)]
    class_name: Option<String>,
    #[serde(default)]
    probability: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    model1: Option<ModelOutput>,
    model2: Option<ModelOutput>,
    model3: Option<ModelOutput>,
}

/// HTTP client for the classifier service
#[derive(Clone, Debug)]
pub struct InferenceClient {
    http_client: reqwest::Client,
    predict_url: String,
}

impl InferenceClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, InferenceError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                InferenceError::Unavailable(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            http_client,
            predict_url: format!("{}/predict", base_url.trim_end_matches('/')),
        })
    }

    pub fn predict_url(&self) -> &str {
        &self.predict_url
    }
}

/// Pull a label and a probability in [0, 1] out of one model's output.
fn labelled(output: Option<ModelOutput>, model: &str) -> Result<(String, f64), InferenceError> {
    let output = output
        .ok_or_else(|| InferenceError::MalformedResponse(format!("missing {}", model)))?;

    let label = output
        .class_name
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| InferenceError::MalformedResponse(format!("{} has no class_name", model)))?;

    let probability = output.probability.ok_or_else(|| {
        InferenceError::MalformedResponse(format!("{} has no probability", model))
    })?;
    if !(0.0..=1.0).contains(&probability) {
        return Err(InferenceError::MalformedResponse(format!(
            "{} probability {} outside [0, 1]",
            model, probability
        )));
    }

    Ok((label, probability))
}

fn interpret(response: PredictResponse) -> Result<ClassificationOutcome, InferenceError> {
    let is_plant = response
        .model3
        .and_then(|gate| gate.class_name)
        .map(|class| class.trim().to_lowercase())
        .filter(|class| !class.is_empty() && !NOT_A_PLANT_CLASSES.contains(&class.as_str()))
        .is_some();

    if !is_plant {
        return Ok(ClassificationOutcome::NotAPlant);
    }

    let (species, species_confidence) = labelled(response.model1, "model1")?;
    let (shape, shape_confidence) = labelled(response.model2, "model2")?;

    Ok(ClassificationOutcome::Plant(InferenceResult {
        species,
        species_confidence,
        shape,
        shape_confidence,
    }))
}

#[async_trait]
impl Classifier for InferenceClient {
    #[tracing::instrument(skip(self, image), fields(size_bytes = image.len(), url = %self.predict_url))]
    async fn classify(
        &self,
        image: Vec<u8>,
        filename: &str,
        content_type: &str,
    ) -> Result<ClassificationOutcome, InferenceError> {
        let start = std::time::Instant::now();

        let part = reqwest::multipart::Part::bytes(image)
            .file_name(filename.to_string())
            .mime_str(content_type)
            .map_err(|e| InferenceError::Unavailable(format!("Invalid content type: {}", e)))?;
        let form = reqwest::multipart::Form::new().part("image", part);

        let response = self
            .http_client
            .post(&self.predict_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Classifier request failed");
                InferenceError::Unavailable(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Classifier returned an error status");
            return Err(InferenceError::Unavailable(format!(
                "classifier returned {}",
                status
            )));
        }

        let body: PredictResponse = response
            .json()
            .await
            .map_err(|e| InferenceError::MalformedResponse(e.to_string()))?;

        let outcome = interpret(body)?;

        tracing::info!(
            is_plant = outcome.is_plant(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Classifier responded"
        );

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client(server: &mockito::ServerGuard) -> InferenceClient {
        InferenceClient::new(&server.url(), Duration::from_secs(5)).unwrap()
    }

    fn plant_body() -> serde_json::Value {
        json!({
            "model1": {"class": 3, "class_name": "zea-mays", "probability": 0.93, "all_probabilities": {}},
            "model2": {"class": 0, "class_name": "Elliptic", "probability": 0.81},
            "model3": {"class": 1, "class_name": "True", "probability": 0.99}
        })
    }

    #[test]
    fn test_predict_url_strips_trailing_slash() {
        let client = InferenceClient::new("http://classifier:8000/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.predict_url(), "http://classifier:8000/predict");
    }

    #[tokio::test]
    async fn test_classify_plant() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/predict")
            .match_header(
                "content-type",
                mockito::Matcher::Regex("multipart/form-data.*".to_string()),
            )
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(plant_body().to_string())
            .create_async()
            .await;

        let outcome = client(&server)
            .classify(vec![0xFF; 500], "leaf.jpg", "image/jpeg")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(
            outcome,
            ClassificationOutcome::Plant(InferenceResult {
                species: "zea-mays".to_string(),
                species_confidence: 0.93,
                shape: "Elliptic".to_string(),
                shape_confidence: 0.81,
            })
        );
    }

    #[tokio::test]
    async fn test_empty_gate_class_is_not_a_plant() {
        let mut server = mockito::Server::new_async().await;
        let mut body = plant_body();
        body["model3"]["class_name"] = json!("");
        server
            .mock("POST", "/predict")
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await;

        let outcome = client(&server)
            .classify(vec![1, 2, 3], "leaf.jpg", "image/jpeg")
            .await
            .unwrap();

        assert_eq!(outcome, ClassificationOutcome::NotAPlant);
    }

    #[tokio::test]
    async fn test_missing_gate_or_false_class_is_not_a_plant() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/predict")
            .with_status(200)
            .with_body(json!({"model1": {"class_name": "x", "probability": 0.5}}).to_string())
            .expect(1)
            .create_async()
            .await;
        let outcome = client(&server)
            .classify(vec![1], "a.jpg", "image/jpeg")
            .await
            .unwrap();
        assert_eq!(outcome, ClassificationOutcome::NotAPlant);

        let mut body = plant_body();
        body["model3"]["class_name"] = json!("False");
        let parsed: PredictResponse = serde_json::from_value(body).unwrap();
        assert_eq!(interpret(parsed).unwrap(), ClassificationOutcome::NotAPlant);
    }

    #[tokio::test]
    async fn test_server_error_is_unavailable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/predict")
            .with_status(503)
            .with_body("overloaded")
            .create_async()
            .await;

        let err = client(&server)
            .classify(vec![1], "a.jpg", "image/jpeg")
            .await
            .unwrap_err();

        assert!(matches!(err, InferenceError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_connection_refused_is_unavailable() {
        let client = InferenceClient::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let err = client
            .classify(vec![1], "a.jpg", "image/jpeg")
            .await
            .unwrap_err();
        assert!(matches!(err, InferenceError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_non_json_body_is_malformed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/predict")
            .with_status(200)
            .with_body("<html>oops</html>")
            .create_async()
            .await;

        let err = client(&server)
            .classify(vec![1], "a.jpg", "image/jpeg")
            .await
            .unwrap_err();

        assert!(matches!(err, InferenceError::MalformedResponse(_)));
    }

    #[test]
    fn test_probability_out_of_range_is_malformed() {
        let mut body = plant_body();
        body["model1"]["probability"] = json!(93.0);
        let parsed: PredictResponse = serde_json::from_value(body).unwrap();
        assert!(matches!(
            interpret(parsed),
            Err(InferenceError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_missing_shape_model_is_malformed() {
        let mut body = plant_body();
        body.as_object_mut().unwrap().remove("model2");
        let parsed: PredictResponse = serde_json::from_value(body).unwrap();
        let err = interpret(parsed).unwrap_err();
        assert!(err.to_string().contains("model2"));
    }
}
