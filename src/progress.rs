//! Progress reporting for long-running orchestration steps.
//!
//! A [`ProgressSink`] is handed to a single orchestration call. Reporting never
//! blocks and never fails: if nobody is listening the message is dropped.
//! [`channel`] pairs a sink with a receiver that only keeps the most recent
//! message, which is all a loading indicator needs.

use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// Fire-and-forget destination for human-readable progress messages.
#[derive(Clone)]
pub struct ProgressSink {
    notify: Arc<dyn Fn(String) + Send + Sync>,
}

impl ProgressSink {
    /// Forward every message to `callback`.
    pub fn from_fn(callback: impl Fn(String) + Send + Sync + 'static) -> Self {
        Self {
            notify: Arc::new(callback),
        }
    }

    pub fn report(&self, message: impl Into<String>) {
        (self.notify)(message.into());
    }
}

impl fmt::Debug for ProgressSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressSink").finish_non_exhaustive()
    }
}

/// Consumer side of [`channel`]. Holds only the latest message.
#[derive(Debug)]
pub struct ProgressReceiver {
    rx: watch::Receiver<Option<String>>,
}

impl ProgressReceiver {
    /// Most recent message, if any was reported.
    pub fn latest(&self) -> Option<String> {
        self.rx.borrow().clone()
    }

    /// Wait for the next message. Returns `None` once every sink is dropped
    /// and no unseen message remains.
    pub async fn next(&mut self) -> Option<String> {
        match self.rx.changed().await {
            Ok(()) => self.rx.borrow_and_update().clone(),
            Err(_) => None,
        }
    }
}

/// Create a sink/receiver pair for one call.
pub fn channel() -> (ProgressSink, ProgressReceiver) {
    let (tx, rx) = watch::channel(None);
    let sink = ProgressSink::from_fn(move |message| {
        tx.send_replace(Some(message));
    });
    (sink, ProgressReceiver { rx })
}

/// Message sent when a model download starts for `subject`
/// (e.g. `"en->zh"` or `"language detection"`).
pub fn download_started_message(subject: &str) -> String {
    format!("{}: downloading model...", subject)
}

/// Message sent as a download advances; `fraction` is in `[0, 1]`.
pub fn download_progress_message(subject: &str, fraction: f64) -> String {
    format!("{}: downloading model... {:.0}%", subject, fraction * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_from_fn_forwards_messages() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let store = seen.clone();
        let sink = ProgressSink::from_fn(move |m| store.lock().unwrap().push(m));

        sink.report("first");
        sink.report(String::from("second"));

        assert_eq!(*seen.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn test_channel_keeps_latest_message() {
        let (sink, receiver) = channel();
        assert_eq!(receiver.latest(), None);

        sink.report("one");
        sink.report("two");

        assert_eq!(receiver.latest(), Some("two".to_string()));
    }

    #[test]
    fn test_report_without_receiver_does_not_panic() {
        let (sink, receiver) = channel();
        drop(receiver);
        sink.report("nobody listening");
    }

    #[tokio::test]
    async fn test_next_waits_for_message() {
        let (sink, mut receiver) = channel();

        let reporter = tokio::spawn(async move {
            sink.report("downloading");
        });

        assert_eq!(receiver.next().await, Some("downloading".to_string()));
        reporter.await.unwrap();

        // All sinks dropped, nothing unseen left
        assert_eq!(receiver.next().await, None);
    }

    #[test]
    fn test_download_messages() {
        assert_eq!(download_started_message("en->zh"), "en->zh: downloading model...");
        assert_eq!(
            download_progress_message("en->zh", 0.42),
            "en->zh: downloading model... 42%"
        );
        assert_eq!(
            download_progress_message("language detection", 1.0),
            "language detection: downloading model... 100%"
        );
    }
}
