use lakehouse_ops::adapters::{load_sdk_config, AwsSettings, S3Storage, SqsQueue};
use lakehouse_ops::config::lambda::RelayConfig;
use lakehouse_ops::core::s3_relay::S3EventRelay;
use lakehouse_ops::domain::model::{LambdaResponse, S3Event};
use lakehouse_ops::utils::logger;
use lakehouse_ops::utils::validation::Validate;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};

type Relay = S3EventRelay<S3Storage, SqsQueue>;

async fn function_handler(relay: &Relay, event: LambdaEvent<S3Event>) -> Result<LambdaResponse, Error> {
    Ok(relay.handle(&event.payload).await?)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    logger::init_lambda_logger();

    let config = RelayConfig::from_env()?;
    config.validate()?;

    let sdk = load_sdk_config(&AwsSettings::default()).await;
    let relay = S3EventRelay::new(
        S3Storage::new(
            aws_sdk_s3::Client::new(&sdk),
            config.artifactory_bucket.clone(),
        ),
        SqsQueue::new(aws_sdk_sqs::Client::new(&sdk)),
        config.relay_settings(),
    );

    let relay = &relay;
    run(service_fn(move |event| async move {
        function_handler(relay, event).await
    }))
    .await
}
