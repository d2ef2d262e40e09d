use adalchemy_core::config::AWS_OPERATION_TIMEOUT;
use adalchemy_core::contract::Notification;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, SdkConfig};
use aws_sdk_sesv2::types::{Body, Content, Destination, EmailContent, Message};

use super::block_on;
use super::notify::Notifier;
use super::queue::QueuePublisher;
use super::workflow::WorkflowTrigger;

/// Shared SDK configuration with a bounded per-operation timeout.
pub async fn load_sdk_config() -> SdkConfig {
    let timeouts = TimeoutConfig::builder()
        .operation_timeout(AWS_OPERATION_TIMEOUT)
        .build();
    aws_config::defaults(BehaviorVersion::latest())
        .timeout_config(timeouts)
        .load()
        .await
}

pub struct SqsQueuePublisher {
    sqs_client: aws_sdk_sqs::Client,
}

impl SqsQueuePublisher {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            sqs_client: aws_sdk_sqs::Client::new(config),
        }
    }
}

impl QueuePublisher for SqsQueuePublisher {
    fn publish(&self, queue_url: &str, body: &str) -> Result<String, String> {
        let client = self.sqs_client.clone();
        let target_queue_url = queue_url.to_string();
        let message_body = body.to_string();

        block_on(async move {
            client
                .send_message()
                .queue_url(target_queue_url)
                .message_body(message_body)
                .send()
                .await
                .map(|output| output.message_id().unwrap_or_default().to_string())
                .map_err(|error| format!("failed to enqueue company message: {error}"))
        })
    }
}

pub struct SesNotifier {
    ses_client: aws_sdk_sesv2::Client,
}

impl SesNotifier {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            ses_client: aws_sdk_sesv2::Client::new(config),
        }
    }
}

fn email_content(notification: &Notification) -> Result<EmailContent, String> {
    let subject = Content::builder()
        .data(&notification.subject)
        .charset("UTF-8")
        .build()
        .map_err(|error| format!("invalid email subject: {error}"))?;
    let text = Content::builder()
        .data(&notification.body)
        .charset("UTF-8")
        .build()
        .map_err(|error| format!("invalid email body: {error}"))?;

    let message = Message::builder()
        .subject(subject)
        .body(Body::builder().text(text).build())
        .build();
    Ok(EmailContent::builder().simple(message).build())
}

impl Notifier for SesNotifier {
    fn send(&self, from: &str, notification: &Notification) -> Result<(), String> {
        let content = email_content(notification)?;
        let destination = Destination::builder()
            .to_addresses(&notification.to)
            .build();
        let client = self.ses_client.clone();
        let source = from.to_string();

        block_on(async move {
            client
                .send_email()
                .from_email_address(source)
                .destination(destination)
                .content(content)
                .send()
                .await
                .map(|_| ())
                .map_err(|error| format!("failed to send notification email: {error}"))
        })
    }
}

pub struct StepFunctionsTrigger {
    sfn_client: aws_sdk_sfn::Client,
}

impl StepFunctionsTrigger {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            sfn_client: aws_sdk_sfn::Client::new(config),
        }
    }
}

impl WorkflowTrigger for StepFunctionsTrigger {
    fn start(&self, workflow_arn: &str, input: &str) -> Result<String, String> {
        let client = self.sfn_client.clone();
        let state_machine_arn = workflow_arn.to_string();
        let execution_input = input.to_string();

        block_on(async move {
            client
                .start_execution()
                .state_machine_arn(state_machine_arn)
                .input(execution_input)
                .send()
                .await
                .map(|output| output.execution_arn().to_string())
                .map_err(|error| format!("failed to start decision workflow: {error}"))
        })
    }
}
