use lakehouse_ops::adapters::{load_sdk_config, EmrServerlessRunner};
use lakehouse_ops::config::lambda::EmrTriggerConfig;
use lakehouse_ops::core::emr_jobs::EmrJobTrigger;
use lakehouse_ops::domain::model::{LambdaResponse, SqsEvent};
use lakehouse_ops::utils::logger;
use lakehouse_ops::utils::validation::Validate;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};

async fn function_handler(
    trigger: &EmrJobTrigger<EmrServerlessRunner>,
    event: LambdaEvent<SqsEvent>,
) -> Result<LambdaResponse, Error> {
    tracing::debug!("Received {} SQS records", event.payload.records.len());
    Ok(trigger.handle(&event.payload).await)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    logger::init_lambda_logger();

    let config = EmrTriggerConfig::from_env()?;
    config.validate()?;

    let sdk = load_sdk_config(&config.aws).await;
    let trigger = EmrJobTrigger::new(
        EmrServerlessRunner::new(aws_sdk_emrserverless::Client::new(&sdk)),
        config.trigger_settings(),
    );

    let trigger = &trigger;
    run(service_fn(move |event| async move {
        function_handler(trigger, event).await
    }))
    .await
}
