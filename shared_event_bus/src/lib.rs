#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Event publishing for module-to-module and module-to-disk notification.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::{fs::OpenOptions, io::AsyncWriteExt, sync::broadcast};

/// A single event carried on the bus, encoded as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusEvent {
    /// Unique identifier.
    pub id: String,
    /// Component producing the event.
    pub source: String,
    /// Event kind (e.g. `dialogue.teach.created`).
    pub kind: String,
    /// Emission timestamp.
    pub timestamp: DateTime<Utc>,
    /// Arbitrary JSON payload.
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Publishes events to some sink.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publishes one event.
    async fn publish(&self, event: BusEvent) -> Result<()>;
}

/// In-memory broadcast bus retaining a bounded backlog, for local runs and tests.
#[derive(Debug, Clone)]
pub struct MemoryEventBus {
    sender: broadcast::Sender<BusEvent>,
    backlog: Arc<Mutex<VecDeque<BusEvent>>>,
    capacity: usize,
}

impl MemoryEventBus {
    /// Creates a bus retaining at most `capacity` recent events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            backlog: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    /// Subscribes to events published after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<BusEvent> {
        self.sender.subscribe()
    }

    /// Snapshot of the retained backlog, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<BusEvent> {
        self.backlog.lock().iter().cloned().collect()
    }
}

#[async_trait]
impl EventPublisher for MemoryEventBus {
    async fn publish(&self, event: BusEvent) -> Result<()> {
        {
            let mut backlog = self.backlog.lock();
            backlog.push_back(event.clone());
            while backlog.len() > self.capacity {
                backlog.pop_front();
            }
        }
        // Send failures only mean nobody is subscribed right now.
        let _ = self.sender.send(event);
        Ok(())
    }
}

/// Durable publisher appending JSON lines to a file.
#[derive(Debug, Clone)]
pub struct FileEventPublisher {
    path: PathBuf,
}

impl FileEventPublisher {
    /// Creates a publisher appending to the given path.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self { path })
    }
}

#[async_trait]
impl EventPublisher for FileEventPublisher {
    async fn publish(&self, event: BusEvent) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        let mut data = serde_json::to_vec(&event)?;
        data.push(b'\n');
        file.write_all(&data).await?;
        file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tokio::runtime::Runtime;

    fn sample_event(kind: &str) -> BusEvent {
        BusEvent {
            id: "evt-1".into(),
            source: "tester".into(),
            kind: kind.into(),
            timestamp: Utc::now(),
            payload: serde_json::json!({ "value": 1 }),
        }
    }

    #[test]
    fn broadcasts_and_retains() {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let bus = MemoryEventBus::new(8);
            let mut rx = bus.subscribe();
            bus.publish(sample_event("unit.test")).await.unwrap();
            let event = rx.recv().await.unwrap();
            assert_eq!(event.kind, "unit.test");
            assert_eq!(bus.snapshot().len(), 1);
        });
    }

    #[test]
    fn backlog_stays_bounded() {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let bus = MemoryEventBus::new(2);
            for i in 0..5 {
                bus.publish(sample_event(&format!("k{i}"))).await.unwrap();
            }
            let snapshot = bus.snapshot();
            assert_eq!(snapshot.len(), 2);
            assert_eq!(snapshot[0].kind, "k3");
        });
    }

    #[test]
    fn file_publisher_appends_lines() {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let dir = tempdir().unwrap();
            let path = dir.path().join("events.log");
            let publisher = FileEventPublisher::new(&path).unwrap();
            publisher.publish(sample_event("unit.test")).await.unwrap();
            let content = std::fs::read_to_string(path).unwrap();
            assert!(content.contains("unit.test"));
        });
    }
}
