use crate::domain::model::OutgoingMail;
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Local};

/// Tabular store holding the form responses.
///
/// Coordinates passed to `write_cell` are 1-based, matching the row indices
/// reported by the row selector.
pub trait SheetStore: Send + Sync {
    fn read_display_values(
        &self,
        sheet: &str,
    ) -> impl std::future::Future<Output = Result<Vec<Vec<String>>>> + Send;

    fn write_cell(
        &self,
        sheet: &str,
        row: usize,
        column: usize,
        value: &str,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> Result<()>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}
