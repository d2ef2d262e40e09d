use adalchemy_core::config::ProcessEnv;
use adalchemy_core::contract::HandlerResponse;
use adalchemy_lambda::adapters::aws::{load_sdk_config, SqsQueuePublisher};
use adalchemy_lambda::adapters::mongo::MongoConnector;
use adalchemy_lambda::handlers::enqueue::handle_enqueue;
use adalchemy_lambda::handlers::respond;
use adalchemy_lambda::observability;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;

async fn handle_request(_event: LambdaEvent<Value>) -> Result<HandlerResponse, Error> {
    let sdk_config = load_sdk_config().await;
    let queue = SqsQueuePublisher::new(&sdk_config);

    let outcome = handle_enqueue(&ProcessEnv, &MongoConnector, &queue);
    respond("enqueuer", outcome.map(|summary| summary.to_body())).map_err(Error::from)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    observability::init();
    lambda_runtime::run(service_fn(handle_request)).await
}
