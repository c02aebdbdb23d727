//! JSONL outbox: every produced envelope is appended as one line.
//!
//! The file is the same format `agora ingest` reads, so moving an outbox to
//! another node replays this node's traffic there.

use agora_application::{Transport, TransportError};
use agora_domain::IdempotencyKey;
use async_trait::async_trait;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

pub struct JsonlOutboxTransport {
    file: Mutex<File>,
    path: PathBuf,
}

impl JsonlOutboxTransport {
    /// Open `path` for appending, creating parent directories as needed
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Transport for JsonlOutboxTransport {
    async fn produce(
        &self,
        topic: &str,
        key: &IdempotencyKey,
        payload: &[u8],
    ) -> Result<(), TransportError> {
        if payload.contains(&b'\n') {
            return Err(TransportError::Rejected(format!(
                "{}: payload spans several lines",
                key
            )));
        }

        let mut file = self
            .file
            .lock()
            .map_err(|_| TransportError::Unavailable("outbox lock poisoned".into()))?;
        file.write_all(payload)
            .and_then(|_| file.write_all(b"\n"))
            .and_then(|_| file.flush())
            .map_err(|e| TransportError::Unavailable(format!("{}: {}", self.path.display(), e)))?;

        debug!("Appended {} ({}) to {}", key, topic, self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_appends_one_line_per_message() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("outbox.jsonl");
        let outbox = JsonlOutboxTransport::open(&path).unwrap();

        outbox
            .produce("t", &IdempotencyKey::proposal("p-1"), br#"{"a":1}"#)
            .await
            .unwrap();
        outbox
            .produce("t", &IdempotencyKey::proposal("p-2"), br#"{"a":2}"#)
            .await
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "{\"a\":1}\n{\"a\":2}\n");
    }

    #[tokio::test]
    async fn test_reopen_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outbox.jsonl");
        let key = IdempotencyKey::proposal("p-1");
        JsonlOutboxTransport::open(&path)
            .unwrap()
            .produce("t", &key, b"1")
            .await
            .unwrap();
        JsonlOutboxTransport::open(&path)
            .unwrap()
            .produce("t", &key, b"2")
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 2);
    }

    #[tokio::test]
    async fn test_multiline_payload_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let outbox = JsonlOutboxTransport::open(dir.path().join("o.jsonl")).unwrap();
        let err = outbox
            .produce("t", &IdempotencyKey::proposal("p"), b"{\n}")
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Rejected(_)));
    }
}
