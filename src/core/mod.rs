pub mod bucket_policy;
pub mod data_quality;
pub mod ddl;
pub mod ddl_diff;
pub mod emr_jobs;
pub mod notifications;
pub mod parquet_loader;
pub mod query;
pub mod repositories;
pub mod s3_relay;

pub use crate::domain::ports::{
    BucketAdmin, Catalog, JobRunner, MessageQueue, NotificationStore, PolicyReport, QueryEngine,
    ResponseSender, SourceControl, Storage,
};
pub use crate::utils::error::Result;
