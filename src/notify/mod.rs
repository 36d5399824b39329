pub mod email;
pub mod templates;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Phase, RunReport};

pub use email::SmtpNotifier;

/// Outbound run notifications. Failures are returned to the caller and never retried.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Summary of every updated and prepared game.
    async fn send_success(&self, report: &RunReport) -> Result<()>;

    /// Report for one failed phase.
    async fn send_error(&self, phase: Phase, error: &str) -> Result<()>;
}
