//! Seams between the orchestrator and AWS.

use jetstream_publish::{CannedAcl, S3Address, S3Client, S3Store, StorageBackend};

use crate::error::TestError;

/// Snapshot of a stack from `DescribeStacks`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackInfo {
    pub name: String,
    pub status: String,
    pub reason: Option<String>,
}

/// A stack event whose resource status contains `FAILED`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackEvent {
    pub event_id: String,
    pub status: String,
    pub reason: Option<String>,
}

/// The orchestration service that runs stacks.
pub trait StackService {
    /// Create `name` from the template at `template_url` with IAM capabilities.
    fn create_stack(&self, name: &str, template_url: &str) -> Result<(), TestError>;

    /// `name_or_id` may be a stack name or a full stack id.
    fn describe_stack(&self, name_or_id: &str) -> Result<StackInfo, TestError>;

    fn list_stack_ids(&self) -> Result<Vec<String>, TestError>;

    fn failed_events(&self, name_or_id: &str) -> Result<Vec<StackEvent>, TestError>;

    fn delete_stack(&self, name: &str) -> Result<(), TestError>;
}

/// Bucket administration for the transient staging bucket.
pub trait StagingStore {
    fn create_bucket(&self, bucket: &str, region: Option<&str>) -> Result<(), TestError>;

    fn bucket_exists(&self, bucket: &str) -> Result<bool, TestError>;

    fn list_keys(&self, bucket: &str) -> Result<Vec<String>, TestError>;

    fn delete_keys(&self, bucket: &str, keys: &[String]) -> Result<(), TestError>;

    fn delete_bucket(&self, bucket: &str) -> Result<(), TestError>;

    /// Private storage backend rooted at the bucket, used for uploads.
    fn backend(&self, bucket: &str) -> Box<dyn StorageBackend>;
}

impl StagingStore for S3Client {
    fn create_bucket(&self, bucket: &str, region: Option<&str>) -> Result<(), TestError> {
        Ok(S3Client::create_bucket(self, bucket, region)?)
    }

    fn bucket_exists(&self, bucket: &str) -> Result<bool, TestError> {
        Ok(S3Client::bucket_exists(self, bucket)?)
    }

    fn list_keys(&self, bucket: &str) -> Result<Vec<String>, TestError> {
        Ok(S3Client::list_keys(self, bucket)?)
    }

    fn delete_keys(&self, bucket: &str, keys: &[String]) -> Result<(), TestError> {
        for key in keys {
            self.delete_object(bucket, key)?;
        }
        Ok(())
    }

    fn delete_bucket(&self, bucket: &str) -> Result<(), TestError> {
        Ok(S3Client::delete_bucket(self, bucket)?)
    }

    fn backend(&self, bucket: &str) -> Box<dyn StorageBackend> {
        Box::new(S3Store::new(
            self.clone(),
            S3Address::new(bucket, None),
            CannedAcl::Private,
        ))
    }
}
