// Adapters layer: concrete implementations of the domain ports.

pub mod csv_workbook;
pub mod log_only;
pub mod smtp;

pub use csv_workbook::CsvWorkbook;
pub use log_only::LogOnlyTransport;
pub use smtp::{SmtpMailTransport, SmtpSettings};
