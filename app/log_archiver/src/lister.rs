use chrono::DateTime;
use chrono::Utc;
use framework::exception;
use framework::exception::CoreRsResult;
use framework::exception::error_code;
use framework::s3::S3Object;
use tracing::debug;
use tracing::info;

use crate::store::ObjectStore;

pub const ARCHIVE_SUFFIX: &str = ".tar.gz";

#[derive(Debug, Clone, PartialEq)]
pub struct CandidateObject {
    pub key: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

impl From<S3Object> for CandidateObject {
    fn from(object: S3Object) -> Self {
        CandidateObject {
            key: object.key,
            size: object.size,
            last_modified: object.last_modified,
        }
    }
}

pub async fn list_candidates<S>(store: &S, prefix: &str, log_prefix: &str) -> CoreRsResult<Vec<CandidateObject>>
where
    S: ObjectStore,
{
    let objects = store.list_objects(prefix).await.map_err(|err| {
        exception!(
            code = error_code::LIST_ERROR,
            message = format!("failed to list objects, prefix={prefix}"),
            source = err
        )
    })?;

    let mut candidates = Vec::new();
    for object in objects {
        if let Some(reason) = exclusion(&object.key, log_prefix) {
            debug!(key = object.key, reason, "skip object");
            continue;
        }
        candidates.push(CandidateObject::from(object));
    }
    candidates.sort_by(|left, right| left.key.cmp(&right.key));

    let total_size: u64 = candidates.iter().map(|candidate| candidate.size).sum();
    info!(prefix, candidates = candidates.len(), total_size, "listed candidate objects");
    Ok(candidates)
}

fn exclusion(key: &str, log_prefix: &str) -> Option<&'static str> {
    if key.is_empty() || key.ends_with('/') {
        Some("folder")
    } else if key.ends_with(ARCHIVE_SUFFIX) {
        Some("compressed")
    } else if key.strip_prefix(log_prefix).is_some_and(|rest| rest.starts_with('/')) {
        Some("log_output")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use framework::exception::error_code;

    use super::list_candidates;
    use crate::store::memory::MemoryStore;
    use crate::store::memory::Operation;

    fn keys(candidates: &[super::CandidateObject]) -> Vec<&str> {
        candidates.iter().map(|candidate| candidate.key.as_str()).collect()
    }

    #[tokio::test]
    async fn exclude_archives_and_log_output() {
        let store = MemoryStore::with_objects(&[
            ("b.log", "b"),
            ("a.log", "a"),
            ("archive-old.tar.gz", "old"),
            ("logs/run1.log", "run1"),
        ]);

        let candidates = list_candidates(&store, "", "logs").await.unwrap();
        assert_eq!(keys(&candidates), vec!["a.log", "b.log"]);
        assert_eq!(candidates[0].size, 1);
    }

    #[tokio::test]
    async fn listing_is_repeatable() {
        let store = MemoryStore::with_objects(&[("app/2.log", "2"), ("app/1.log", "1"), ("logs/x.tar.gz", "x")]);

        let first = list_candidates(&store, "", "logs").await.unwrap();
        let second = list_candidates(&store, "", "logs").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn empty_store() {
        let store = MemoryStore::default();
        let candidates = list_candidates(&store, "", "logs").await.unwrap();
        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn list_failed() {
        let store = MemoryStore::with_objects(&[("a.log", "a")]);
        store.fail(Operation::List);

        let error = list_candidates(&store, "", "logs").await.unwrap_err();
        assert_eq!(error.code(), Some(error_code::LIST_ERROR));
    }

    #[test]
    fn exclusion() {
        assert_eq!(super::exclusion("a.log", "logs"), None);
        assert_eq!(super::exclusion("logs-old/a.log", "logs"), None);
        assert_eq!(super::exclusion("logs", "logs"), None);
        assert_eq!(super::exclusion("logs/run1.log", "logs"), Some("log_output"));
        assert_eq!(super::exclusion("app/weekly.tar.gz", "logs"), Some("compressed"));
        assert_eq!(super::exclusion("app/", "logs"), Some("folder"));
        assert_eq!(super::exclusion("app/a.tar", "logs"), None);
    }
}
