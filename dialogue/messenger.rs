use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;

/// Delivers text to a requester session.
///
/// The runtime only ever needs this one operation; transports live outside
/// the crate.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Sends one text message to the given session.
    async fn send_text(&self, session: &str, text: &str) -> Result<()>;
}

/// Messenger that records every send, for tests and local development.
#[derive(Debug, Default)]
pub struct RecordingMessenger {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingMessenger {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything sent so far as `(session, text)` pairs.
    #[must_use]
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().clone()
    }

    /// The most recent text sent, if any.
    #[must_use]
    pub fn last_text(&self) -> Option<String> {
        self.sent.lock().last().map(|(_, text)| text.clone())
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_text(&self, session: &str, text: &str) -> Result<()> {
        self.sent.lock().push((session.to_string(), text.to_string()));
        Ok(())
    }
}
