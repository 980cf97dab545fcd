use std::collections::BTreeMap;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;

use framework::exception;
use framework::exception::CoreRsResult;
use framework::s3::S3Object;
use tokio::fs;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use super::ObjectStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Credentials,
    List,
    Download,
    Upload,
    Tag,
    Delete,
}

pub struct StoredObject {
    pub content: Vec<u8>,
    pub content_type: Option<String>,
    pub tags: Vec<(String, String)>,
}

/// In-memory bucket with failure injection per operation.
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<String, StoredObject>>,
    failures: Mutex<HashSet<Operation>>,
    calls: Mutex<Vec<(Operation, String)>>,
}

impl MemoryStore {
    pub fn with_objects(objects: &[(&str, &str)]) -> Self {
        let store = Self::default();
        for (key, content) in objects {
            store.insert(key, content.as_bytes().to_vec());
        }
        store
    }

    pub fn insert(&self, key: &str, content: Vec<u8>) {
        self.objects.lock().unwrap().insert(
            key.to_owned(),
            StoredObject {
                content,
                content_type: None,
                tags: Vec::new(),
            },
        );
    }

    pub fn fail(&self, operation: Operation) {
        self.failures.lock().unwrap().insert(operation);
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }

    pub fn content(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).map(|object| object.content.clone())
    }

    pub fn content_type(&self, key: &str) -> Option<String> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .and_then(|object| object.content_type.clone())
    }

    pub fn tags(&self, key: &str) -> Vec<(String, String)> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .map(|object| object.tags.clone())
            .unwrap_or_default()
    }

    pub fn calls(&self, operation: Operation) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(called, _)| *called == operation)
            .map(|(_, target)| target.clone())
            .collect()
    }

    fn call(&self, operation: Operation, target: &str) -> CoreRsResult<()> {
        self.calls.lock().unwrap().push((operation, target.to_owned()));
        if self.failures.lock().unwrap().contains(&operation) {
            return Err(exception!(message = format!("simulated network error, operation={operation:?}, target={target}")));
        }
        Ok(())
    }
}

impl ObjectStore for MemoryStore {
    async fn check_credentials(&self) -> CoreRsResult<()> {
        self.call(Operation::Credentials, "")
    }

    async fn list_objects(&self, prefix: &str) -> CoreRsResult<Vec<S3Object>> {
        self.call(Operation::List, prefix)?;
        Ok(self
            .objects
            .lock()
            .unwrap()
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, object)| S3Object {
                key: key.clone(),
                size: object.content.len() as u64,
                last_modified: None,
            })
            .collect())
    }

    async fn download(&self, key: &str, path: &Path) -> CoreRsResult<u64> {
        self.call(Operation::Download, key)?;
        let content = self
            .content(key)
            .ok_or_else(|| exception!(message = format!("object not found, key={key}")))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let mut file = OpenOptions::new().write(true).create_new(true).open(path).await?;
        file.write_all(&content).await?;
        file.flush().await?;
        Ok(content.len() as u64)
    }

    async fn upload(&self, path: &Path, key: &str, content_type: &str) -> CoreRsResult<()> {
        self.call(Operation::Upload, key)?;
        let content = fs::read(path).await?;
        self.objects.lock().unwrap().insert(
            key.to_owned(),
            StoredObject {
                content,
                content_type: Some(content_type.to_owned()),
                tags: Vec::new(),
            },
        );
        Ok(())
    }

    async fn put_tags(&self, key: &str, tags: &[(String, String)]) -> CoreRsResult<()> {
        self.call(Operation::Tag, key)?;
        let mut objects = self.objects.lock().unwrap();
        let object = objects
            .get_mut(key)
            .ok_or_else(|| exception!(message = format!("object not found, key={key}")))?;
        object.tags = tags.to_vec();
        Ok(())
    }

    async fn delete(&self, key: &str) -> CoreRsResult<()> {
        self.call(Operation::Delete, key)?;
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }
}
