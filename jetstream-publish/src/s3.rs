//! S3 backend and bucket administration.
//!
//! Addresses look like `s3://bucket[/prefix]`. Bucket names use
//! `[a-zA-Z0-9_.-]`, prefixes additionally allow `/`.

use std::fmt;
use std::str::FromStr;

use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration, ObjectCannedAcl};

use crate::aws::AwsContext;
use crate::error::{backend_err, PublishError};
use crate::gate::StorageBackend;

const SCHEME: &str = "s3://";

/// Region in which a bucket must be created without a location constraint.
const DEFAULT_BUCKET_REGION: &str = "us-east-1";

// ---------------------------------------------------------------------------
// S3Address
// ---------------------------------------------------------------------------

/// A parsed `s3://bucket[/prefix]` address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Address {
    pub bucket: String,
    pub prefix: Option<String>,
}

impl S3Address {
    pub fn new(bucket: impl Into<String>, prefix: Option<&str>) -> Self {
        Self {
            bucket: bucket.into(),
            prefix: prefix
                .map(|p| p.trim_matches('/').to_owned())
                .filter(|p| !p.is_empty()),
        }
    }

    /// Object key for `name`, i.e. `prefix/name` or just `name`.
    pub fn key(&self, name: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}/{name}"),
            None => name.to_owned(),
        }
    }
}

impl FromStr for S3Address {
    type Err = PublishError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PublishError::InvalidAddress(s.to_owned());
        let rest = s.strip_prefix(SCHEME).ok_or_else(invalid)?;
        let (bucket, prefix) = match rest.split_once('/') {
            Some((bucket, prefix)) => (bucket, Some(prefix)),
            None => (rest, None),
        };

        let bucket_ok = !bucket.is_empty() && bucket.chars().all(is_bucket_char);
        let prefix_ok = prefix
            .map(|p| p.chars().all(|c| is_bucket_char(c) || c == '/'))
            .unwrap_or(true);
        if !bucket_ok || !prefix_ok {
            return Err(invalid());
        }
        Ok(Self::new(bucket, prefix))
    }
}

impl fmt::Display for S3Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "{SCHEME}{}/{prefix}", self.bucket),
            None => write!(f, "{SCHEME}{}", self.bucket),
        }
    }
}

fn is_bucket_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')
}

// ---------------------------------------------------------------------------
// S3Client
// ---------------------------------------------------------------------------

/// Canned ACL applied to every object a [`S3Store`] writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CannedAcl {
    Private,
    PublicRead,
}

impl CannedAcl {
    pub fn from_public(public: bool) -> Self {
        if public {
            CannedAcl::PublicRead
        } else {
            CannedAcl::Private
        }
    }

    fn to_sdk(self) -> ObjectCannedAcl {
        match self {
            CannedAcl::Private => ObjectCannedAcl::Private,
            CannedAcl::PublicRead => ObjectCannedAcl::PublicRead,
        }
    }
}

/// Blocking wrapper over the S3 SDK client.
#[derive(Clone)]
pub struct S3Client {
    ctx: AwsContext,
    client: aws_sdk_s3::Client,
}

impl S3Client {
    pub fn new(ctx: AwsContext) -> Self {
        let client = aws_sdk_s3::Client::new(ctx.config());
        Self { ctx, client }
    }

    /// Object body, or `None` when the key does not exist.
    pub fn get_object(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>, PublishError> {
        let location = format!("{SCHEME}{bucket}/{key}");
        self.ctx.block_on(async {
            let output = match self.client.get_object().bucket(bucket).key(key).send().await {
                Ok(output) => output,
                Err(err) => {
                    let missing = err
                        .as_service_error()
                        .map(|e| e.is_no_such_key())
                        .unwrap_or(false);
                    if missing {
                        return Ok(None);
                    }
                    return Err(backend_err(&location, DisplayErrorContext(&err)));
                }
            };
            let body = output
                .body
                .collect()
                .await
                .map_err(|e| backend_err(&location, e))?;
            Ok(Some(body.into_bytes().to_vec()))
        })
    }

    pub fn put_object(
        &self,
        bucket: &str,
        key: &str,
        contents: &[u8],
        acl: CannedAcl,
    ) -> Result<(), PublishError> {
        let location = format!("{SCHEME}{bucket}/{key}");
        self.ctx
            .block_on(
                self.client
                    .put_object()
                    .bucket(bucket)
                    .key(key)
                    .acl(acl.to_sdk())
                    .body(ByteStream::from(contents.to_vec()))
                    .send(),
            )
            .map_err(|e| backend_err(&location, DisplayErrorContext(&e)))?;
        tracing::debug!(location = %location, acl = ?acl, "put object");
        Ok(())
    }

    /// Create `bucket`; `region` sets the location constraint unless it is
    /// `us-east-1`.
    pub fn create_bucket(&self, bucket: &str, region: Option<&str>) -> Result<(), PublishError> {
        let mut request = self.client.create_bucket().bucket(bucket);
        if let Some(region) = region.filter(|r| *r != DEFAULT_BUCKET_REGION) {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(region))
                    .build(),
            );
        }
        self.ctx
            .block_on(request.send())
            .map_err(|e| backend_err(format!("{SCHEME}{bucket}"), DisplayErrorContext(&e)))?;
        tracing::info!(bucket, region = ?region, "created bucket");
        Ok(())
    }

    pub fn bucket_exists(&self, bucket: &str) -> Result<bool, PublishError> {
        match self.ctx.block_on(self.client.head_bucket().bucket(bucket).send()) {
            Ok(_) => Ok(true),
            Err(err) => {
                let missing = err
                    .as_service_error()
                    .map(|e| e.is_not_found())
                    .unwrap_or(false);
                if missing {
                    Ok(false)
                } else {
                    Err(backend_err(format!("{SCHEME}{bucket}"), DisplayErrorContext(&err)))
                }
            }
        }
    }

    pub fn list_keys(&self, bucket: &str) -> Result<Vec<String>, PublishError> {
        let location = format!("{SCHEME}{bucket}");
        self.ctx.block_on(async {
            let mut keys = Vec::new();
            let mut pages = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .into_paginator()
                .send();
            while let Some(page) = pages.next().await {
                let page = page.map_err(|e| backend_err(&location, DisplayErrorContext(&e)))?;
                keys.extend(page.contents().iter().filter_map(|o| o.key().map(str::to_owned)));
            }
            Ok(keys)
        })
    }

    pub fn delete_object(&self, bucket: &str, key: &str) -> Result<(), PublishError> {
        self.ctx
            .block_on(self.client.delete_object().bucket(bucket).key(key).send())
            .map_err(|e| backend_err(format!("{SCHEME}{bucket}/{key}"), DisplayErrorContext(&e)))?;
        Ok(())
    }

    pub fn delete_bucket(&self, bucket: &str) -> Result<(), PublishError> {
        self.ctx
            .block_on(self.client.delete_bucket().bucket(bucket).send())
            .map_err(|e| backend_err(format!("{SCHEME}{bucket}"), DisplayErrorContext(&e)))?;
        tracing::info!(bucket, "deleted bucket");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// S3Store
// ---------------------------------------------------------------------------

/// [`StorageBackend`] writing to `s3://bucket/prefix/<name>` with a fixed ACL.
#[derive(Clone)]
pub struct S3Store {
    client: S3Client,
    address: S3Address,
    acl: CannedAcl,
}

impl S3Store {
    pub fn new(client: S3Client, address: S3Address, acl: CannedAcl) -> Self {
        Self { client, address, acl }
    }
}

impl StorageBackend for S3Store {
    fn location(&self, name: &str) -> String {
        format!("{SCHEME}{}/{}", self.address.bucket, self.address.key(name))
    }

    fn read(&self, name: &str) -> Result<Option<Vec<u8>>, PublishError> {
        self.client.get_object(&self.address.bucket, &self.address.key(name))
    }

    fn write(&self, name: &str, contents: &[u8]) -> Result<(), PublishError> {
        self.client
            .put_object(&self.address.bucket, &self.address.key(name), contents, self.acl)
    }
}
