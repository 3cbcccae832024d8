use restaurant_service::config::RestaurantConfig;
use restaurant_service::startup::Application;
use reqwest::{Client, Response};
use serde_json::Value;
use service_core::config::Config as CoreConfig;
use std::collections::HashMap;

pub const DATASET_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/data/restaurants.json");

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub client: Client,
}

impl TestApp {
    /// Spawn the service with the mock provider and the sample dataset.
    pub async fn spawn() -> Self {
        Self::spawn_with(&[]).await
    }

    /// Spawn the service with extra environment settings layered on the test defaults.
    pub async fn spawn_with(overrides: &[(&str, &str)]) -> Self {
        let mut vars: HashMap<String, String> = [
            ("ENVIRONMENT", "test"),
            ("ASSISTANT_PROVIDER", "mock"),
            ("RESTAURANT_DATA_PATH", DATASET_PATH),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        for (k, v) in overrides {
            vars.insert(k.to_string(), v.to_string());
        }

        let common = CoreConfig {
            port: 0, // Random port for testing
            log_level: "info".to_string(),
        };
        let config = RestaurantConfig::from_lookup(common, |key| vars.get(key).cloned())
            .expect("Failed to load configuration");

        let app = Application::build(config)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server to be ready by polling the health endpoint
        let client = Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            client,
        }
    }

    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(format!("{}{}", self.address, path))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> Response {
        self.client
            .post(format!("{}{}", self.address, path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn query(&self, query: &str) -> Response {
        self.post_json("/query", &serde_json::json!({ "query": query }))
            .await
    }
}
