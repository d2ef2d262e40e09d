use adalchemy_core::contract::HandlerResponse;
use adalchemy_core::error::PipelineError;
use serde_json::Value;

pub mod decision;
pub mod enqueue;
pub mod process;

/// Maps a handler outcome onto what the Lambda runtime reports.
///
/// Success and fatal errors become status responses. Every other error is
/// returned so the invocation fails and the queue or orchestrator redelivers.
pub fn respond(
    component: &'static str,
    outcome: Result<Value, PipelineError>,
) -> Result<HandlerResponse, PipelineError> {
    match outcome {
        Ok(body) => Ok(HandlerResponse::json(200, &body)),
        Err(error) if error.is_fatal() => {
            tracing::error!(
                component,
                event = "invocation_rejected",
                error_code = error.error_code(),
                error = %error,
                "invocation rejected without side effects"
            );
            Ok(HandlerResponse::error(
                error.status_code(),
                error.error_code(),
                &error.to_string(),
            ))
        }
        Err(error) => {
            tracing::error!(
                component,
                event = "invocation_failed",
                error_code = error.error_code(),
                error = %error,
                "invocation failed; leaving retry to the platform"
            );
            Err(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use adalchemy_core::config::{ConfigError, MONGO_URI};
    use serde_json::json;

    use super::*;

    #[test]
    fn success_becomes_ok_response() {
        let response = respond("test", Ok(json!({"enqueued": 2}))).expect("should respond");
        assert_eq!(response.status_code, 200);
        assert_eq!(response.body, r#"{"enqueued":2}"#);
    }

    #[test]
    fn configuration_errors_are_answered_not_raised() {
        let response = respond(
            "test",
            Err(ConfigError::Missing(vec![MONGO_URI]).into()),
        )
        .expect("fatal errors should be answered");

        assert_eq!(response.status_code, 500);
        let body: Value = serde_json::from_str(&response.body).expect("body should be JSON");
        assert_eq!(body["error"], "misconfiguration");
        assert!(body["message"]
            .as_str()
            .is_some_and(|message| message.contains("MONGO_URI")));
    }

    #[test]
    fn upstream_errors_fail_the_invocation() {
        let error = respond("test", Err(PipelineError::Upstream("timed out".into())))
            .expect_err("upstream errors should propagate");
        assert!(matches!(error, PipelineError::Upstream(_)));
    }
}
