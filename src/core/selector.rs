use crate::domain::model::{EligibleRow, RecordSet};
use crate::utils::error::{NotifyError, Result};

/// Rows below the header start at sheet row 2.
const FIRST_DATA_ROW: usize = 2;

/// Column names that gate notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowGate {
    pub trigger: String,
    pub completion: String,
}

impl RowGate {
    pub fn new(trigger: impl Into<String>, completion: impl Into<String>) -> Self {
        Self {
            trigger: trigger.into(),
            completion: completion.into(),
        }
    }

    /// 0-based completion column, or a fatal error when either gate column is absent.
    pub fn check_headers(&self, records: &RecordSet) -> Result<usize> {
        let completion = records
            .column_index(&self.completion)
            .ok_or_else(|| NotifyError::MissingColumn {
                column: self.completion.clone(),
            })?;

        if records.column_index(&self.trigger).is_none() {
            return Err(NotifyError::MissingColumn {
                column: self.trigger.clone(),
            });
        }

        Ok(completion)
    }

    pub fn is_eligible(&self, trigger_value: &str, completion_value: &str) -> bool {
        !trigger_value.is_empty() && completion_value.is_empty()
    }
}

/// Rows whose trigger cell is filled and whose completion cell is empty,
/// each tagged with its 1-based sheet row.
pub fn select_eligible(records: &RecordSet, gate: &RowGate) -> Result<Vec<EligibleRow>> {
    gate.check_headers(records)?;

    let eligible = records
        .rows
        .iter()
        .enumerate()
        .filter(|(_, row)| gate.is_eligible(row.value(&gate.trigger), row.value(&gate.completion)))
        .map(|(offset, row)| EligibleRow {
            index: offset + FIRST_DATA_ROW,
            row: row.clone(),
        })
        .collect();

    Ok(eligible)
}
