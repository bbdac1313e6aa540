use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// One data row keyed by header name. Every header has a value, possibly empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub data: HashMap<String, String>,
}

impl Row {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.data.get(field).map(String::as_str)
    }

    /// Missing fields read as empty.
    pub fn value(&self, field: &str) -> &str {
        self.get(field).unwrap_or("")
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Row {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            data: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// A snapshot of a sheet: the header row plus the data rows below it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordSet {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl RecordSet {
    /// Builds a record set from display values; the first grid row is the header.
    /// Short rows are padded with empty strings, extra trailing cells are dropped.
    pub fn from_grid(grid: Vec<Vec<String>>) -> Self {
        let mut grid = grid.into_iter();
        let headers = match grid.next() {
            Some(headers) => headers,
            None => return Self::default(),
        };

        let rows = grid
            .map(|cells| {
                let mut cells = cells.into_iter();
                headers
                    .iter()
                    .map(|header| (header.clone(), cells.next().unwrap_or_default()))
                    .collect()
            })
            .collect();

        Self { headers, rows }
    }

    /// 0-based position of a header, first match wins.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

/// Recipients and shared-folder id for one campus.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CampusEntry {
    pub recipients: Vec<String>,
    pub folder_id: String,
}

impl CampusEntry {
    pub fn is_empty(&self) -> bool {
        self.recipients.is_empty() && self.folder_id.is_empty()
    }
}

/// Finished message for one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedMessage {
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

/// Everything the transport needs to deliver one notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub reply_to: Option<String>,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

/// A data row that passed the trigger/completion gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibleRow {
    /// 1-based sheet row, header included; the first data row is 2.
    pub index: usize,
    pub row: Row,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFailure {
    pub row: usize,
    pub message: String,
}

impl fmt::Display for RowFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Row {}: {}", self.row, self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub success_count: usize,
    pub error_count: usize,
    pub errors: Vec<RowFailure>,
}

impl RunSummary {
    pub fn record_success(&mut self) {
        self.success_count += 1;
    }

    pub fn record_failure(&mut self, row: usize, message: impl Into<String>) {
        self.error_count += 1;
        self.errors.push(RowFailure {
            row,
            message: message.into(),
        });
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let errors: Vec<String> = self.errors.iter().map(ToString::to_string).collect();
        write!(
            f,
            "Emails Sent: {}\nErrors: {}\n{}",
            self.success_count,
            self.error_count,
            errors.join("\n")
        )
    }
}
