use lakehouse_ops::adapters::{load_sdk_config, AwsSettings, HttpResponseSender, S3Admin};
use lakehouse_ops::config::lambda::NotificationLambdaConfig;
use lakehouse_ops::core::notifications::NotificationHandler;
use lakehouse_ops::domain::model::{CustomResourceRequest, CustomResourceResponse};
use lakehouse_ops::utils::logger;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};

async fn function_handler(
    handler: &NotificationHandler<S3Admin, HttpResponseSender>,
    event: LambdaEvent<CustomResourceRequest>,
) -> Result<CustomResourceResponse, Error> {
    tracing::info!(request_id = %event.context.request_id, "Custom resource invocation");
    Ok(handler.handle(&event.payload).await?)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    logger::init_lambda_logger();

    let config = NotificationLambdaConfig::from_env();
    let sdk = load_sdk_config(&AwsSettings::default()).await;
    let handler = NotificationHandler::new(
        S3Admin::new(aws_sdk_s3::Client::new(&sdk)),
        HttpResponseSender::default(),
        config.log_stream_name,
    );

    let handler = &handler;
    run(service_fn(move |event| async move {
        function_handler(handler, event).await
    }))
    .await
}
