use adalchemy_core::config::ProcessEnv;
use adalchemy_core::contract::HandlerResponse;
use adalchemy_lambda::adapters::http::HttpGenerationAgent;
use adalchemy_lambda::adapters::mongo::MongoConnector;
use adalchemy_lambda::handlers::decision::handle_decision_event;
use adalchemy_lambda::handlers::respond;
use adalchemy_lambda::observability;
use chrono::Utc;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;

async fn handle_request(
    event: LambdaEvent<Value>,
    agent: &HttpGenerationAgent,
) -> Result<HandlerResponse, Error> {
    let outcome = handle_decision_event(
        &event.payload,
        &ProcessEnv,
        &MongoConnector,
        agent,
        Utc::now(),
    );
    respond("decision_maker", outcome.map(|summary| summary.to_body())).map_err(Error::from)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    observability::init();

    let agent = HttpGenerationAgent::new();
    let agent = &agent;

    lambda_runtime::run(service_fn(move |event| handle_request(event, agent))).await
}
