use std::time::Duration;

use serde_json::Value;

use super::agent::GenerationAgent;
use super::block_on;

#[derive(Debug, Clone, Default)]
pub struct HttpGenerationAgent {
    http_client: reqwest::Client,
}

impl HttpGenerationAgent {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GenerationAgent for HttpGenerationAgent {
    fn generate(
        &self,
        endpoint: &str,
        payload: &Value,
        timeout: Duration,
    ) -> Result<String, String> {
        let client = self.http_client.clone();
        let url = endpoint.to_string();
        let body = payload.clone();

        block_on(async move {
            let response = client
                .post(url)
                .json(&body)
                .timeout(timeout)
                .send()
                .await
                .map_err(|error| format!("failed to call generation agent: {error}"))?;

            let status = response.status();
            let text = response
                .text()
                .await
                .map_err(|error| format!("failed to read generation agent response: {error}"))?;

            if status.is_success() {
                Ok(text)
            } else {
                Err(format!("generation agent returned {status}: {text}"))
            }
        })
    }
}
