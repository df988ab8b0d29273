use async_trait::async_trait;

/// Toast/notification sink owned by the surrounding shell.
pub trait Notifier: Send + Sync {
    fn success(&self, text: &str);
    fn error(&self, text: &str);
}

/// Default sink: structured log lines.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn success(&self, text: &str) {
        tracing::info!(notice = text, "user notification");
    }

    fn error(&self, text: &str) {
        tracing::warn!(notice = text, "user notification");
    }
}

/// Destructive-action confirmation owned by the surrounding shell.
#[async_trait]
pub trait ConfirmPrompt: Send + Sync {
    async fn confirm(&self, prompt: &str) -> bool;
}
