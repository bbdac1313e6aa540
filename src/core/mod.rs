pub mod directory;
pub mod engine;
pub mod selector;
pub mod template;

pub use crate::domain::model::{CampusEntry, EligibleRow, OutgoingMail, RecordSet, Row, RunSummary};
pub use crate::domain::ports::{Clock, MailTransport, SheetStore, SystemClock};
pub use crate::utils::error::Result;
