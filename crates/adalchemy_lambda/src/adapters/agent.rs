use std::time::Duration;

use serde_json::Value;

pub trait GenerationAgent {
    /// Posts `payload` to the agent once and returns the raw response body.
    fn generate(&self, endpoint: &str, payload: &Value, timeout: Duration)
        -> Result<String, String>;
}
