use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::{Duration, Instant};

use crate::config::ReplicateConfig;
use crate::errors::{AppError, Result};

/// External image-restoration backend.
#[async_trait]
pub trait ImageRestorer: Send + Sync {
    /// Submits the publicly reachable `image_url` and returns the URL of
    /// the restored output.
    async fn restore(&self, image_url: &str) -> Result<String>;

    /// Fetches a restored output so it can be kept locally.
    async fn download(&self, url: &str) -> Result<Vec<u8>>;
}

#[derive(Debug, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
enum PredictionStatus {
    Starting,
    Processing,
    Succeeded,
    Failed,
    Canceled,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct PredictionUrls {
    get: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    id: String,
    status: PredictionStatus,
    #[serde(default)]
    output: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    urls: Option<PredictionUrls>,
}

pub struct ReplicateClient {
    client: Client,
    api_base: String,
    api_token: Option<String>,
    model: String,
    poll_interval: Duration,
    timeout: Duration,
}

impl ReplicateClient {
    pub fn new(config: &ReplicateConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
            model: config.model.clone(),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    fn token(&self) -> Result<&str> {
        self.api_token
            .as_deref()
            .ok_or_else(|| AppError::Restoration("REPLICATE_API_TOKEN is not configured".to_string()))
    }

    async fn create_prediction(&self, image_url: &str) -> Result<Prediction> {
        let url = format!("{}/models/{}/predictions", self.api_base, self.model);
        let body = json!({
            "input": {
                "input_image": image_url,
                "output_format": "png",
                "safety_tolerance": 2
            }
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.token()?)
            .header("Prefer", "wait")
            .json(&body)
            .send()
            .await?;

        Self::parse_prediction(response).await
    }

    async fn fetch_prediction(&self, url: &str) -> Result<Prediction> {
        let response = self
            .client
            .get(url)
            .bearer_auth(self.token()?)
            .send()
            .await?;

        Self::parse_prediction(response).await
    }

    async fn parse_prediction(response: reqwest::Response) -> Result<Prediction> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Restoration(format!(
                "Replicate returned {}: {}",
                status, body
            )));
        }

        Ok(response.json::<Prediction>().await?)
    }
}

#[async_trait]
impl ImageRestorer for ReplicateClient {
    async fn restore(&self, image_url: &str) -> Result<String> {
        let started = Instant::now();
        let mut prediction = self.create_prediction(image_url).await?;
        tracing::info!(prediction_id = %prediction.id, status = ?prediction.status, "Replicate prediction created");

        loop {
            match prediction.status {
                PredictionStatus::Succeeded => {
                    let output = prediction.output.as_ref().and_then(extract_output_url);
                    tracing::debug!(prediction_id = %prediction.id, output = ?prediction.output, "Replicate prediction succeeded");
                    return output.ok_or_else(|| {
                        AppError::Restoration(format!("prediction {} returned no output URL", prediction.id))
                    });
                }
                PredictionStatus::Failed | PredictionStatus::Canceled => {
                    return Err(AppError::Restoration(format!(
                        "prediction {} ended as {:?}: {}",
                        prediction.id,
                        prediction.status,
                        prediction.error.as_ref().map(|e| e.to_string()).unwrap_or_default()
                    )));
                }
                PredictionStatus::Starting | PredictionStatus::Processing | PredictionStatus::Unknown => {}
            }

            if started.elapsed() >= self.timeout {
                return Err(AppError::Restoration(format!(
                    "prediction {} timed out after {:?}",
                    prediction.id, self.timeout
                )));
            }

            tokio::time::sleep(self.poll_interval).await;

            let poll_url = prediction
                .urls
                .as_ref()
                .and_then(|urls| urls.get.clone())
                .unwrap_or_else(|| format!("{}/predictions/{}", self.api_base, prediction.id));
            prediction = self.fetch_prediction(&poll_url).await?;
        }
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(AppError::Restoration(format!(
                "downloading restored image failed with {}",
                response.status()
            )));
        }

        let bytes = response.bytes().await?;
        tracing::debug!("Downloaded {} bytes of restored output", bytes.len());
        Ok(bytes.to_vec())
    }
}

/// Models answer with a bare URL, a list of URLs, or an object carrying
/// one. Takes the first URL found.
pub fn extract_output_url(output: &Value) -> Option<String> {
    match output {
        Value::String(url) if !url.is_empty() => Some(url.clone()),
        Value::Array(items) => items.iter().find_map(extract_output_url),
        Value::Object(map) => map
            .get("url")
            .or_else(|| map.get("output"))
            .and_then(extract_output_url)
            .or_else(|| map.values().find_map(extract_output_url)),
        _ => None,
    }
}
