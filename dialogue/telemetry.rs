use std::{fmt, path::PathBuf, sync::Arc};

use anyhow::Result;
use chrono::Utc;
use serde_json::Value;
use shared_event_bus::{BusEvent, EventPublisher};
use shared_logging::{JsonLogger, LogLevel, LogRecord};
use tokio::runtime::{Handle, Runtime};
use uuid::Uuid;

/// Builder configuring telemetry for the dialogue stack.
pub struct DialogueTelemetryBuilder {
    component: String,
    log_path: Option<PathBuf>,
    min_level: LogLevel,
    event_publisher: Option<Arc<dyn EventPublisher>>,
}

impl DialogueTelemetryBuilder {
    /// Creates a builder for the named component.
    #[must_use]
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            log_path: None,
            min_level: LogLevel::Debug,
            event_publisher: None,
        }
    }

    /// Sets the JSON log path.
    #[must_use]
    pub fn log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    /// Drops log records below the given level.
    #[must_use]
    pub const fn min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    /// Assigns the event publisher.
    #[must_use]
    pub fn event_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.event_publisher = Some(publisher);
        self
    }

    /// Finalizes the builder.
    pub fn build(self) -> Result<DialogueTelemetry> {
        let logger = match self.log_path {
            Some(path) => Some(JsonLogger::new(path)?.with_min_level(self.min_level)),
            None => None,
        };
        let event = match self.event_publisher {
            Some(publisher) => Some(EventHandle::new(publisher)?),
            None => None,
        };
        Ok(DialogueTelemetry {
            inner: Arc::new(TelemetryInner {
                component: self.component,
                logger,
                event,
            }),
        })
    }
}

/// Telemetry handle shared by the dialogue runtime and its components.
#[derive(Clone)]
pub struct DialogueTelemetry {
    inner: Arc<TelemetryInner>,
}

impl fmt::Debug for DialogueTelemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialogueTelemetry")
            .field("component", &self.inner.component)
            .finish()
    }
}

struct TelemetryInner {
    component: String,
    logger: Option<JsonLogger>,
    event: Option<EventHandle>,
}

struct EventHandle {
    runtime: Runtime,
    publisher: Arc<dyn EventPublisher>,
}

impl EventHandle {
    fn new(publisher: Arc<dyn EventPublisher>) -> Result<Self> {
        Ok(Self {
            runtime: Runtime::new()?,
            publisher,
        })
    }

    fn publish(&self, event: BusEvent) -> Result<()> {
        // Inside an async context the publish is spawned; otherwise the
        // private runtime drives it to completion.
        if let Ok(handle) = Handle::try_current() {
            let publisher = Arc::clone(&self.publisher);
            handle.spawn(async move {
                if let Err(err) = publisher.publish(event).await {
                    eprintln!("telemetry event publish failed: {err:?}");
                }
            });
            Ok(())
        } else {
            self.runtime.block_on(self.publisher.publish(event))
        }
    }
}

impl DialogueTelemetry {
    /// Returns a builder for the named component.
    #[must_use]
    pub fn builder(component: impl Into<String>) -> DialogueTelemetryBuilder {
        DialogueTelemetryBuilder::new(component)
    }

    /// Logs a structured record, optionally scoped to a session.
    pub fn log(
        &self,
        level: LogLevel,
        session: Option<&str>,
        message: &str,
        fields: Value,
    ) -> Result<()> {
        if let Some(logger) = &self.inner.logger {
            let mut record = LogRecord::new(&self.inner.component, level, message);
            if let Some(session) = session {
                record = record.with_session(session);
            }
            if let Some(object) = fields.as_object() {
                record = record.with_fields(object.clone());
            }
            logger.log(&record)?;
        }
        Ok(())
    }

    /// Emits an event via the configured publisher.
    pub fn event(&self, kind: &str, payload: Value) -> Result<()> {
        if let Some(handle) = &self.inner.event {
            handle.publish(BusEvent {
                id: format!("evt-{}", Uuid::new_v4()),
                source: self.inner.component.clone(),
                kind: kind.into(),
                timestamp: Utc::now(),
                payload,
            })?;
        }
        Ok(())
    }
}
