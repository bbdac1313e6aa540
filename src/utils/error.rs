use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("This run can only be started from the \"{expected}\" sheet (got \"{actual}\")")]
    WrongSheet { expected: String, actual: String },

    #[error("Required column is missing: \"{column}\"")]
    MissingColumn { column: String },

    #[error("No recipients configured for campus \"{campus}\"")]
    UnknownCampus { campus: String },

    #[error("Template error: {message}")]
    TemplateError { message: String },

    #[error("Mail error: {message}")]
    MailError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Aborts the whole run before any row is touched.
    Configuration,
    /// Confined to a single row; the run continues.
    Row,
    /// Storage or serialization failure outside row processing.
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl NotifyError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    pub fn mail(message: impl Into<String>) -> Self {
        Self::MailError {
            message: message.into(),
        }
    }

    pub fn template(message: impl Into<String>) -> Self {
        Self::TemplateError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::TomlError(_)
            | Self::WrongSheet { .. }
            | Self::MissingColumn { .. } => ErrorCategory::Configuration,
            Self::UnknownCampus { .. } | Self::TemplateError { .. } | Self::MailError { .. } => {
                ErrorCategory::Row
            }
            Self::IoError(_) | Self::CsvError(_) | Self::SerializationError(_) => {
                ErrorCategory::System
            }
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.category() != ErrorCategory::Row
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Row => ErrorSeverity::Medium,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::WrongSheet { .. } => "Pass the form responses sheet with --sheet or fix source.expected_sheet",
            Self::MissingColumn { .. } => {
                "Check that the header row still matches the column names in [columns]"
            }
            Self::UnknownCampus { .. } => "Add the campus to [[campuses]] or correct the Campus cell",
            Self::MailError { .. } => "Check the SMTP settings in [mail] and the recipient addresses",
            Self::TemplateError { .. } => "Check the [template] section for malformed content",
            Self::TomlError(_)
            | Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. } => "Fix the configuration file and run again",
            Self::IoError(_) | Self::CsvError(_) => {
                "Make sure the workbook directory exists and the sheet file is readable and writable"
            }
            Self::SerializationError(_) => "Report this error together with the template in use",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Row => format!("Could not notify campus: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}

impl From<lettre::error::Error> for NotifyError {
    fn from(err: lettre::error::Error) -> Self {
        Self::mail(format!("message build failed: {err}"))
    }
}

impl From<lettre::address::AddressError> for NotifyError {
    fn from(err: lettre::address::AddressError) -> Self {
        Self::mail(format!("invalid address: {err}"))
    }
}

impl From<lettre::transport::smtp::Error> for NotifyError {
    fn from(err: lettre::transport::smtp::Error) -> Self {
        Self::mail(format!("SMTP send failed: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, NotifyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_column_is_fatal() {
        let err = NotifyError::MissingColumn {
            column: "Return Date".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert!(err.is_fatal());
        assert_eq!(err.to_string(), "Required column is missing: \"Return Date\"");
    }

    #[test]
    fn test_row_errors_are_recoverable() {
        let err = NotifyError::UnknownCampus {
            campus: "Nowhere".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Row);
        assert!(!err.is_fatal());
        assert_eq!(err.severity(), ErrorSeverity::Medium);

        assert!(!NotifyError::mail("relay refused").is_fatal());
    }

    #[test]
    fn test_io_errors_are_system_errors() {
        let err = NotifyError::from(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "missing",
        ));
        assert_eq!(err.category(), ErrorCategory::System);
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert!(err.user_friendly_message().starts_with("System error"));
    }
}
