use adalchemy_core::config::ProcessEnv;
use adalchemy_core::contract::HandlerResponse;
use adalchemy_lambda::adapters::aws::{load_sdk_config, SesNotifier, StepFunctionsTrigger};
use adalchemy_lambda::adapters::http::HttpGenerationAgent;
use adalchemy_lambda::adapters::mongo::MongoConnector;
use adalchemy_lambda::handlers::process::{handle_process_event, ProcessDependencies};
use adalchemy_lambda::handlers::respond;
use adalchemy_lambda::observability;
use chrono::Utc;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;

struct RuntimeDependencies {
    agent: HttpGenerationAgent,
    notifier: SesNotifier,
    workflow: StepFunctionsTrigger,
}

async fn handle_request(
    event: LambdaEvent<Value>,
    runtime: &RuntimeDependencies,
) -> Result<HandlerResponse, Error> {
    let deps = ProcessDependencies {
        store: &MongoConnector,
        agent: &runtime.agent,
        notifier: &runtime.notifier,
        workflow: &runtime.workflow,
    };

    let outcome = handle_process_event(&event.payload, &ProcessEnv, &deps, Utc::now());
    respond("processor", outcome.map(|summary| summary.to_body())).map_err(Error::from)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    observability::init();

    let sdk_config = load_sdk_config().await;
    let runtime = RuntimeDependencies {
        agent: HttpGenerationAgent::new(),
        notifier: SesNotifier::new(&sdk_config),
        workflow: StepFunctionsTrigger::new(&sdk_config),
    };
    let runtime = &runtime;

    lambda_runtime::run(service_fn(move |event| handle_request(event, runtime))).await
}
