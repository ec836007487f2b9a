use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
#[error("Can't send notification: {0}")]
pub struct NotificationError(pub String);

/// Fire-and-forget outbound message channel
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, message: &str) -> Result<(), NotificationError>;
}

/// Writes notifications to the tracing log only
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl NotificationSink for LogNotifier {
    async fn send(&self, message: &str) -> Result<(), NotificationError> {
        tracing::info!(target: "notifications", "{}", message);
        Ok(())
    }
}
