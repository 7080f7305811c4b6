// src/distance.rs
//! Optional driving-distance lookup through the Google Distance Matrix API.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

const DISTANCE_MATRIX_URL: &str = "https://maps.googleapis.com/maps/api/distancematrix/json";
const METERS_PER_MILE: f64 = 1609.344;
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Distance between two addresses in miles. `None` is a normal answer.
#[async_trait]
pub trait DistanceResolver: Send + Sync {
    async fn resolve(&self, origin: &str, destination: &str) -> Option<f64>;
}

pub struct GoogleDistanceResolver {
    client: Client,
    api_key: Option<String>,
    endpoint: String,
}

impl GoogleDistanceResolver {
    pub fn new(api_key: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|e| {
                warn!("Falling back to default HTTP client: {}", e);
                Client::new()
            });

        Self {
            client,
            api_key,
            endpoint: DISTANCE_MATRIX_URL.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    async fn fetch(&self, api_key: &str, origin: &str, destination: &str) -> anyhow::Result<Value> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("origins", origin),
                ("destinations", destination),
                ("key", api_key),
                ("units", "imperial"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("distance service returned {}", status);
        }
        Ok(response.json::<Value>().await?)
    }
}

#[async_trait]
impl DistanceResolver for GoogleDistanceResolver {
    async fn resolve(&self, origin: &str, destination: &str) -> Option<f64> {
        let Some(api_key) = self.api_key.as_deref() else {
            debug!("No distance API key configured");
            return None;
        };
        if origin.trim().is_empty() || destination.trim().is_empty() {
            return None;
        }

        match self.fetch(api_key, origin, destination).await {
            Ok(body) => {
                let miles = parse_distance_miles(&body);
                if miles.is_none() {
                    warn!("Distance response had no usable distance for {}", destination);
                }
                miles
            }
            Err(e) => {
                warn!("Distance API error: {}", e);
                None
            }
        }
    }
}

/// Resolver used when distance lookups are disabled.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoDistance;

#[async_trait]
impl DistanceResolver for NoDistance {
    async fn resolve(&self, _origin: &str, _destination: &str) -> Option<f64> {
        None
    }
}

/// Miles from a Distance Matrix body: the `"12.4 mi"` text, else meters.
pub fn parse_distance_miles(body: &Value) -> Option<f64> {
    if let Some(status) = body.get("status").and_then(Value::as_str) {
        if status != "OK" {
            return None;
        }
    }

    let element = body.pointer("/rows/0/elements/0")?;
    if element
        .get("status")
        .and_then(Value::as_str)
        .is_some_and(|s| s != "OK")
    {
        return None;
    }

    let distance = element.get("distance")?;
    distance
        .get("text")
        .and_then(Value::as_str)
        .and_then(miles_from_text)
        .or_else(|| {
            distance
                .get("value")
                .and_then(Value::as_f64)
                .map(|meters| (meters / METERS_PER_MILE * 10.0).round() / 10.0)
        })
}

fn miles_from_text(text: &str) -> Option<f64> {
    let number = text.trim().strip_suffix("mi")?.trim().replace(',', "");
    number.parse().ok()
}
