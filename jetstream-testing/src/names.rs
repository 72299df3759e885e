use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Object name of the parent stack template in the staging bucket.
pub const PARENT_TEMPLATE: &str = "master.template";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

pub const BUCKET_PREFIX: &str = "jetstream-test";
pub const STACK_PREFIX: &str = "JetstreamTest";
pub const S3_URL: &str = "https://s3.amazonaws.com";

/// Environment variables consulted, in order, for the staging bucket region.
pub const REGION_ENV_VARS: &[&str] = &["AWS_DEFAULT_REGION", "DEFAULT_REGION", "REGION"];

const SUFFIX_LEN: usize = 10;

/// Names of the transient resources a validation run creates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingNames {
    pub bucket: String,
    pub stack_name: String,
    pub bucket_url: String,
}

impl StagingNames {
    pub fn generate() -> Self {
        Self::at(Utc::now(), &Uuid::new_v4().simple().to_string())
    }

    /// Names for a run started at `now`; the first ten characters of
    /// `random` make the bucket name globally unique.
    pub fn at(now: DateTime<Utc>, random: &str) -> Self {
        let timestamp = now.format("%Y%m%d%H%M%S").to_string();
        let suffix: String = random.chars().take(SUFFIX_LEN).collect();
        let bucket = format!("{BUCKET_PREFIX}-{timestamp}-{suffix}");
        Self {
            bucket_url: format!("{S3_URL}/{bucket}"),
            stack_name: format!("{STACK_PREFIX}{timestamp}"),
            bucket,
        }
    }

    pub fn template_url(&self, name: &str) -> String {
        format!("{}/{name}", self.bucket_url)
    }
}

/// Location constraint for the staging bucket: the first of
/// [`REGION_ENV_VARS`] that is set, with `us-east-1` meaning none.
pub fn region_from_env() -> Option<String> {
    region_from(|key| std::env::var(key).ok())
}

pub fn region_from(lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    REGION_ENV_VARS
        .iter()
        .find_map(|&key| lookup(key).filter(|v| !v.is_empty()))
        .filter(|region| region != "us-east-1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn names_share_timestamp() {
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let names = StagingNames::at(now, "0123456789abcdef");
        assert_eq!(names.bucket, "jetstream-test-20240102030405-0123456789");
        assert_eq!(names.stack_name, "JetstreamTest20240102030405");
        assert_eq!(
            names.template_url("master.template"),
            "https://s3.amazonaws.com/jetstream-test-20240102030405-0123456789/master.template"
        );
    }

    #[test]
    fn generated_suffix_is_lowercase_hex() {
        let names = StagingNames::generate();
        let suffix = names.bucket.rsplit('-').next().unwrap();
        assert_eq!(suffix.len(), 10);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    fn env(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |key| pairs.iter().find(|(k, _)| *k == key).map(|(_, v)| v.to_string())
    }

    #[test]
    fn region_lookup_order_and_us_east_1() {
        assert_eq!(
            region_from(env(&[("REGION", "eu-west-1"), ("DEFAULT_REGION", "us-west-2")])),
            Some("us-west-2".to_string())
        );
        assert_eq!(region_from(env(&[("AWS_DEFAULT_REGION", "us-east-1")])), None);
        assert_eq!(region_from(env(&[])), None);
    }
}
