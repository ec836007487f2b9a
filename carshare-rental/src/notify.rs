use carshare_core::notification::NotificationSink;

/// Sends `message`, logging and swallowing any sink failure
pub async fn send_best_effort(sink: &dyn NotificationSink, message: &str) {
    if let Err(e) = sink.send(message).await {
        tracing::warn!("Notification dropped: {}", e);
    }
}

#[cfg(any(test, feature = "testing"))]
pub use recording::RecordingNotifier;

#[cfg(any(test, feature = "testing"))]
mod recording {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use carshare_core::notification::{NotificationError, NotificationSink};

    /// Sink that keeps every message in memory; can be told to fail
    #[derive(Debug, Default)]
    pub struct RecordingNotifier {
        messages: Mutex<Vec<String>>,
        failing: bool,
    }

    impl RecordingNotifier {
        pub fn new() -> Self {
            Self::default()
        }

        /// A sink whose every send fails after recording the attempt
        pub fn failing() -> Self {
            Self {
                messages: Mutex::new(Vec::new()),
                failing: true,
            }
        }

        pub fn messages(&self) -> Vec<String> {
            self.messages.lock().map(|m| m.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl NotificationSink for RecordingNotifier {
        async fn send(&self, message: &str) -> Result<(), NotificationError> {
            if let Ok(mut messages) = self.messages.lock() {
                messages.push(message.to_string());
            }
            if self.failing {
                return Err(NotificationError("chat unreachable".to_string()));
            }
            Ok(())
        }
    }
}
