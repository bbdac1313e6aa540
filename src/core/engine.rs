use crate::core::directory::CampusDirectory;
use crate::core::selector::{select_eligible, RowGate};
use crate::core::template::{MessageTemplate, TemplateRenderer};
use crate::domain::model::{EligibleRow, OutgoingMail, RecordSet, RunSummary};
use crate::domain::ports::{Clock, MailTransport, SheetStore, SystemClock};
use crate::utils::error::{NotifyError, Result};
use crate::utils::escape::escape_data;
use std::fmt::Write;

pub const DEFAULT_STAMP_FORMAT: &str = "%m/%d/%Y %H:%M:%S";

/// Run parameters resolved from configuration.
#[derive(Debug, Clone)]
pub struct NotifySettings {
    /// Sheet to read and stamp.
    pub sheet: String,
    /// When set, the run refuses to start on any other sheet.
    pub expected_sheet: Option<String>,
    pub gate: RowGate,
    pub campus_column: String,
    pub cc: Vec<String>,
    pub reply_to: Option<String>,
    pub stamp_format: String,
    /// Dry runs leave the sheet untouched.
    pub stamp_rows: bool,
}

/// Drives one notification pass over a sheet.
///
/// Rows are handled strictly one after another: resolve campus, render,
/// send, stamp. A row failure is recorded and the pass moves on; only the
/// sheet-level checks abort the run.
pub struct NotificationEngine<S: SheetStore, M: MailTransport> {
    store: S,
    transport: M,
    settings: NotifySettings,
    directory: CampusDirectory,
    template: MessageTemplate,
    renderer: TemplateRenderer,
    clock: Box<dyn Clock>,
}

impl<S: SheetStore, M: MailTransport> NotificationEngine<S, M> {
    pub fn new(store: S, transport: M, settings: NotifySettings, directory: CampusDirectory) -> Self {
        Self {
            store,
            transport,
            settings,
            directory,
            template: MessageTemplate::default(),
            renderer: TemplateRenderer::default(),
            clock: Box::new(SystemClock),
        }
    }

    pub fn with_template(mut self, template: MessageTemplate, renderer: TemplateRenderer) -> Self {
        self.template = template;
        self.renderer = renderer;
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn transport(&self) -> &M {
        &self.transport
    }

    pub async fn run(&self) -> Result<RunSummary> {
        let sheet = self.settings.sheet.as_str();
        tracing::info!(sheet, "Starting campus notification run");

        if let Some(expected) = &self.settings.expected_sheet {
            if expected != sheet {
                return Err(NotifyError::WrongSheet {
                    expected: expected.clone(),
                    actual: sheet.to_string(),
                });
            }
        }

        let grid = self.store.read_display_values(sheet).await?;
        let records = RecordSet::from_grid(grid);
        tracing::debug!(rows = records.rows.len(), "Loaded sheet snapshot");

        let completion_column = self.settings.gate.check_headers(&records)?;
        for field in self.template.missing_fields(&records.headers) {
            tracing::warn!(field = %field, "Template references a column missing from the header row");
        }
        let eligible = select_eligible(&records, &self.settings.gate)?;
        tracing::info!(eligible = eligible.len(), "Selected rows ready for notification");

        let mut summary = RunSummary::default();
        for candidate in &eligible {
            match self.notify_row(candidate, completion_column).await {
                Ok(()) => {
                    tracing::info!(row = candidate.index, "Notification sent");
                    summary.record_success();
                }
                Err(e) => {
                    tracing::error!(row = candidate.index, error = %e, "Error on row {}", candidate.index);
                    summary.record_failure(candidate.index, e.to_string());
                }
            }
        }

        tracing::info!(
            sent = summary.success_count,
            errors = summary.error_count,
            "Campus notification run finished"
        );
        Ok(summary)
    }

    async fn notify_row(&self, candidate: &EligibleRow, completion_column: usize) -> Result<()> {
        let campus = candidate.row.value(&self.settings.campus_column);
        let entry = self.directory.resolve(campus);
        if entry.recipients.is_empty() {
            return Err(NotifyError::UnknownCampus {
                campus: campus.to_string(),
            });
        }

        let message = self.renderer.render(&self.template, &candidate.row, &entry.folder_id)?;
        tracing::debug!(
            row = candidate.index,
            campus,
            recipients = entry.recipients.len(),
            subject = %escape_data(&message.subject),
            "Rendered notification"
        );

        let mail = OutgoingMail {
            to: entry.recipients,
            cc: self.settings.cc.clone(),
            reply_to: self.settings.reply_to.clone(),
            subject: message.subject,
            text_body: message.text_body,
            html_body: message.html_body,
        };
        self.transport.send(&mail).await?;

        if self.settings.stamp_rows {
            let stamp = self.stamp()?;
            self.store
                .write_cell(&self.settings.sheet, candidate.index, completion_column + 1, &stamp)
                .await?;
        }
        Ok(())
    }

    fn stamp(&self) -> Result<String> {
        let mut stamp = String::new();
        write!(stamp, "{}", self.clock.now().format(&self.settings.stamp_format)).map_err(|_| {
            NotifyError::InvalidConfigValueError {
                field: "stamp.format".to_string(),
                value: self.settings.stamp_format.clone(),
                reason: "Not a valid strftime format".to_string(),
            }
        })?;
        Ok(stamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::directory::{CampusRecord, Recipients};
    use async_trait::async_trait;
    use chrono::{DateTime, Local, TimeZone};
    use std::sync::Mutex;

    const COMPLETION: &str = "Date when the email was sent to campuses";

    struct MemorySheet {
        grid: Mutex<Vec<Vec<String>>>,
    }

    impl MemorySheet {
        fn new(rows: &[&[&str]]) -> Self {
            Self {
                grid: Mutex::new(
                    rows.iter()
                        .map(|r| r.iter().map(|c| c.to_string()).collect())
                        .collect(),
                ),
            }
        }

        fn cell(&self, row: usize, column: usize) -> String {
            self.grid.lock().unwrap()[row - 1][column - 1].clone()
        }
    }

    impl SheetStore for MemorySheet {
        async fn read_display_values(&self, _sheet: &str) -> Result<Vec<Vec<String>>> {
            Ok(self.grid.lock().unwrap().clone())
        }

        async fn write_cell(&self, _sheet: &str, row: usize, column: usize, value: &str) -> Result<()> {
            self.grid.lock().unwrap()[row - 1][column - 1] = value.to_string();
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<OutgoingMail>>,
        reject_subject_containing: Option<String>,
    }

    #[async_trait]
    impl MailTransport for RecordingTransport {
        async fn send(&self, mail: &OutgoingMail) -> Result<()> {
            if let Some(needle) = &self.reject_subject_containing {
                if mail.subject.contains(needle.as_str()) {
                    return Err(NotifyError::mail("relay refused"));
                }
            }
            self.sent.lock().unwrap().push(mail.clone());
            Ok(())
        }
    }

    struct FixedClock(DateTime<Local>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Local> {
            self.0
        }
    }

    fn settings() -> NotifySettings {
        NotifySettings {
            sheet: "Form Responses 2".to_string(),
            expected_sheet: Some("Form Responses 2".to_string()),
            gate: RowGate::new("Return Date", COMPLETION),
            campus_column: "Campus".to_string(),
            cc: vec!["lead@example.org".to_string()],
            reply_to: Some("lead@example.org".to_string()),
            stamp_format: DEFAULT_STAMP_FORMAT.to_string(),
            stamp_rows: true,
        }
    }

    fn directory() -> CampusDirectory {
        CampusDirectory::new(vec![CampusRecord {
            name: "North".to_string(),
            recipients: Recipients::Many(vec!["n1@example.org".to_string(), "n2@example.org".to_string()]),
            folder_id: "north-folder".to_string(),
        }])
    }

    fn subject_template() -> MessageTemplate {
        MessageTemplate {
            subject: "Transition: ${Student Name}".to_string(),
            html: "<p>${Student Name} returns to ${Campus}</p>".to_string(),
            text: None,
        }
    }

    fn engine(
        sheet: MemorySheet,
        transport: RecordingTransport,
        settings: NotifySettings,
    ) -> NotificationEngine<MemorySheet, RecordingTransport> {
        let clock = FixedClock(Local.with_ymd_and_hms(2024, 9, 2, 8, 30, 0).unwrap());
        NotificationEngine::new(sheet, transport, settings, directory())
            .with_template(subject_template(), TemplateRenderer::default())
            .with_clock(clock)
    }

    #[tokio::test]
    async fn test_sends_and_stamps_eligible_rows() {
        let sheet = MemorySheet::new(&[
            &["Campus", "Student Name", "Return Date", COMPLETION],
            &["North", "Ann", "2024-09-01", ""],
            &["North", "Ben", "", ""],
            &["North", "Cal", "2024-09-01", "09/01/2024 08:00:00"],
        ]);
        let engine = engine(sheet, RecordingTransport::default(), settings());

        let summary = engine.run().await.unwrap();

        assert_eq!(summary.success_count, 1);
        assert_eq!(summary.error_count, 0);
        assert_eq!(engine.store().cell(2, 4), "09/02/2024 08:30:00");
        assert_eq!(engine.store().cell(3, 4), "");
        assert_eq!(engine.store().cell(4, 4), "09/01/2024 08:00:00");

        let sent = engine.transport().sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, vec!["n1@example.org", "n2@example.org"]);
        assert_eq!(sent[0].cc, vec!["lead@example.org"]);
        assert_eq!(sent[0].reply_to.as_deref(), Some("lead@example.org"));
        assert_eq!(sent[0].subject, "Transition: Ann");
        assert_eq!(sent[0].text_body, "Ann returns to North");
    }

    #[tokio::test]
    async fn test_unknown_campus_is_a_row_error() {
        let sheet = MemorySheet::new(&[
            &["Campus", "Student Name", "Return Date", COMPLETION],
            &["Nowhere", "Ann", "2024-09-01", ""],
            &["north", "Ben", "2024-09-01", ""],
        ]);
        let engine = engine(sheet, RecordingTransport::default(), settings());

        let summary = engine.run().await.unwrap();

        assert_eq!(summary.success_count, 1);
        assert_eq!(summary.error_count, 1);
        assert_eq!(
            summary.errors[0].to_string(),
            "Row 2: No recipients configured for campus \"Nowhere\""
        );
        assert_eq!(engine.store().cell(2, 4), "");
        assert_ne!(engine.store().cell(3, 4), "");
        assert_eq!(engine.transport().sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_send_failure_leaves_row_unstamped() {
        let sheet = MemorySheet::new(&[
            &["Campus", "Student Name", "Return Date", COMPLETION],
            &["North", "Ann", "2024-09-01", ""],
            &["North", "Ben", "2024-09-01", ""],
        ]);
        let transport = RecordingTransport {
            reject_subject_containing: Some("Ann".to_string()),
            ..Default::default()
        };
        let engine = engine(sheet, transport, settings());

        let summary = engine.run().await.unwrap();

        assert_eq!(summary.success_count, 1);
        assert_eq!(summary.error_count, 1);
        assert_eq!(summary.errors[0].to_string(), "Row 2: Mail error: relay refused");
        assert_eq!(engine.store().cell(2, 4), "");
        assert_eq!(engine.store().cell(3, 4), "09/02/2024 08:30:00");
    }

    #[tokio::test]
    async fn test_wrong_sheet_aborts_before_reading() {
        let sheet = MemorySheet::new(&[&["Campus"]]);
        let mut settings = settings();
        settings.sheet = "Form Responses 1".to_string();
        let engine = engine(sheet, RecordingTransport::default(), settings);

        let err = engine.run().await.unwrap_err();
        assert!(matches!(err, NotifyError::WrongSheet { .. }));
    }

    #[tokio::test]
    async fn test_missing_completion_column_aborts_run() {
        let sheet = MemorySheet::new(&[
            &["Campus", "Student Name", "Return Date"],
            &["North", "Ann", "2024-09-01"],
        ]);
        let engine = engine(sheet, RecordingTransport::default(), settings());

        let err = engine.run().await.unwrap_err();
        assert!(matches!(err, NotifyError::MissingColumn { .. }));
        assert!(engine.transport().sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_does_not_stamp() {
        let sheet = MemorySheet::new(&[
            &["Campus", "Student Name", "Return Date", COMPLETION],
            &["North", "Ann", "2024-09-01", ""],
        ]);
        let mut settings = settings();
        settings.stamp_rows = false;
        let engine = engine(sheet, RecordingTransport::default(), settings);

        let summary = engine.run().await.unwrap();
        assert_eq!(summary.success_count, 1);
        assert_eq!(engine.store().cell(2, 4), "");
    }

    #[tokio::test]
    async fn test_invalid_stamp_format_is_a_row_error() {
        let sheet = MemorySheet::new(&[
            &["Campus", "Student Name", "Return Date", COMPLETION],
            &["North", "Ann", "2024-09-01", ""],
        ]);
        let mut settings = settings();
        settings.stamp_format = "%Q".to_string();
        let engine = engine(sheet, RecordingTransport::default(), settings);

        let summary = engine.run().await.unwrap();
        assert_eq!(summary.success_count, 0);
        assert_eq!(summary.error_count, 1);
        assert_eq!(engine.store().cell(2, 4), "");
    }
}
