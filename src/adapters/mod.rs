// Adapters layer: AWS SDK and HTTP implementations of the domain ports.

pub mod athena;
pub mod codecommit;
pub mod custom_resource;
pub mod emr;
pub mod glue;
pub mod s3;
pub mod session;
pub mod sqs;

pub use athena::AthenaQueryEngine;
pub use codecommit::CodeCommitSource;
pub use custom_resource::HttpResponseSender;
pub use emr::EmrServerlessRunner;
pub use glue::GlueCatalog;
pub use s3::{S3Admin, S3Storage};
pub use session::{load_sdk_config, AwsSettings};
pub use sqs::SqsQueue;
