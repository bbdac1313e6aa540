use crate::adapters::SmtpSettings;
use crate::core::directory::{CampusDirectory, CampusRecord};
use crate::core::engine::{NotifySettings, DEFAULT_STAMP_FORMAT};
use crate::core::selector::RowGate;
use crate::core::template::{MessageTemplate, TemplateRenderer, DEFAULT_FOLDER_BASE_URL, DEFAULT_HTML, DEFAULT_SUBJECT};
use crate::utils::error::{NotifyError, Result};
use crate::utils::validation::{self, Validate};
use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_SHEET: &str = "Form Responses 2";
pub const DEFAULT_TRIGGER_COLUMN: &str = "Return Date";
pub const DEFAULT_COMPLETION_COLUMN: &str = "Date when the email was sent to campuses";
pub const DEFAULT_CAMPUS_COLUMN: &str = "Campus";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub columns: ColumnsConfig,
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub template: TemplateConfig,
    #[serde(default)]
    pub stamp: StampConfig,
    /// Replaces the built-in directory when present.
    pub campuses: Option<Vec<CampusRecord>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_workbook")]
    pub workbook: String,
    #[serde(default = "default_sheet")]
    pub sheet: String,
    /// Guard against running on the wrong sheet. On unless the key is set
    /// to an empty string.
    #[serde(default = "default_expected_sheet", deserialize_with = "deserialize_expected_sheet")]
    pub expected_sheet: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnsConfig {
    #[serde(default = "default_trigger_column")]
    pub trigger: String,
    #[serde(default = "default_completion_column")]
    pub completion: String,
    #[serde(default = "default_campus_column")]
    pub campus: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MailConfig {
    pub from: Option<String>,
    pub reply_to: Option<String>,
    #[serde(default)]
    pub cc: Vec<String>,
    pub smtp: Option<SmtpConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(default = "default_starttls")]
    pub starttls: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateConfig {
    #[serde(default = "default_subject")]
    pub subject: String,
    #[serde(default = "default_html")]
    pub html: String,
    pub text: Option<String>,
    #[serde(default = "default_folder_base_url")]
    pub folder_base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StampConfig {
    #[serde(default = "default_stamp_format")]
    pub format: String,
}

fn default_workbook() -> String {
    ".".to_string()
}

fn default_sheet() -> String {
    DEFAULT_SHEET.to_string()
}

fn default_expected_sheet() -> Option<String> {
    Some(DEFAULT_SHEET.to_string())
}

fn deserialize_expected_sheet<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let sheet = String::deserialize(deserializer)?;
    Ok((!sheet.is_empty()).then_some(sheet))
}

fn default_trigger_column() -> String {
    DEFAULT_TRIGGER_COLUMN.to_string()
}

fn default_completion_column() -> String {
    DEFAULT_COMPLETION_COLUMN.to_string()
}

fn default_campus_column() -> String {
    DEFAULT_CAMPUS_COLUMN.to_string()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_starttls() -> bool {
    true
}

fn default_subject() -> String {
    DEFAULT_SUBJECT.to_string()
}

fn default_html() -> String {
    DEFAULT_HTML.to_string()
}

fn default_folder_base_url() -> String {
    DEFAULT_FOLDER_BASE_URL.to_string()
}

fn default_stamp_format() -> String {
    DEFAULT_STAMP_FORMAT.to_string()
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            workbook: default_workbook(),
            sheet: default_sheet(),
            expected_sheet: default_expected_sheet(),
        }
    }
}

impl Default for ColumnsConfig {
    fn default() -> Self {
        Self {
            trigger: default_trigger_column(),
            completion: default_completion_column(),
            campus: default_campus_column(),
        }
    }
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            subject: default_subject(),
            html: default_html(),
            text: None,
            folder_base_url: default_folder_base_url(),
        }
    }
}

impl Default for StampConfig {
    fn default() -> Self {
        Self {
            format: default_stamp_format(),
        }
    }
}

impl TomlConfig {
    /// Loads and parses a configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(NotifyError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);
        Ok(toml::from_str(&processed_content)?)
    }

    /// Replaces `${env:NAME}` with the variable's value; unset variables stay verbatim.
    fn substitute_env_vars(content: &str) -> String {
        use regex::Regex;
        use std::sync::LazyLock;

        static ENV_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"\$\{env:([A-Za-z_][A-Za-z0-9_]*)\}").expect("env token pattern is valid")
        });

        ENV_TOKEN
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| caps[0].to_string())
            })
            .into_owned()
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_path("source.workbook", &self.source.workbook)?;
        validation::validate_non_empty_string("source.sheet", &self.source.sheet)?;
        if let Some(expected) = &self.source.expected_sheet {
            validation::validate_non_empty_string("source.expected_sheet", expected)?;
        }

        validation::validate_non_empty_string("columns.trigger", &self.columns.trigger)?;
        validation::validate_non_empty_string("columns.completion", &self.columns.completion)?;
        validation::validate_non_empty_string("columns.campus", &self.columns.campus)?;

        if let Some(from) = &self.mail.from {
            validation::validate_email_address("mail.from", from)?;
        }
        if let Some(reply_to) = &self.mail.reply_to {
            validation::validate_email_address("mail.reply_to", reply_to)?;
        }
        for cc in &self.mail.cc {
            validation::validate_email_address("mail.cc", cc)?;
        }
        if let Some(smtp) = &self.mail.smtp {
            validation::validate_non_empty_string("mail.smtp.host", &smtp.host)?;
            validation::validate_positive_number("mail.smtp.port", usize::from(smtp.port), 1)?;
        }

        validation::validate_non_empty_string("template.subject", &self.template.subject)?;
        validation::validate_url("template.folder_base_url", &self.template.folder_base_url)?;

        validate_stamp_format(&self.stamp.format)?;

        if let Some(campuses) = &self.campuses {
            validation::validate_unique_names("campuses", campuses.iter().map(|c| c.name.as_str()))?;
            for campus in campuses {
                validation::validate_non_empty_string("campuses.name", &campus.name)?;
                for address in campus.recipients.clone().into_vec() {
                    validation::validate_email_address(&format!("campuses.{}.recipients", campus.name), &address)?;
                }
            }
        }

        Ok(())
    }

    /// Settings for the SMTP transport; required unless running dry.
    pub fn smtp_settings(&self) -> Result<(SmtpSettings, String)> {
        let smtp = validation::validate_required_field("mail.smtp", &self.mail.smtp)?;
        let from = validation::validate_required_field("mail.from", &self.mail.from)?;
        Ok((
            SmtpSettings {
                host: smtp.host.clone(),
                port: smtp.port,
                username: smtp.username.clone(),
                password: smtp.password.clone(),
                starttls: smtp.starttls,
            },
            from.clone(),
        ))
    }

    pub fn notify_settings(&self, stamp_rows: bool) -> NotifySettings {
        NotifySettings {
            sheet: self.source.sheet.clone(),
            expected_sheet: self.source.expected_sheet.clone(),
            gate: RowGate::new(&self.columns.trigger, &self.columns.completion),
            campus_column: self.columns.campus.clone(),
            cc: self.mail.cc.clone(),
            reply_to: self.mail.reply_to.clone(),
            stamp_format: self.stamp.format.clone(),
            stamp_rows,
        }
    }

    pub fn directory(&self) -> Result<CampusDirectory> {
        match &self.campuses {
            Some(campuses) => Ok(CampusDirectory::new(campuses.clone())),
            None => CampusDirectory::builtin(),
        }
    }

    pub fn message_template(&self) -> MessageTemplate {
        MessageTemplate {
            subject: self.template.subject.clone(),
            html: self.template.html.clone(),
            text: self.template.text.clone(),
        }
    }

    pub fn renderer(&self) -> TemplateRenderer {
        TemplateRenderer::new(&self.template.folder_base_url)
    }
}

fn validate_stamp_format(format: &str) -> Result<()> {
    validation::validate_non_empty_string("stamp.format", format)?;
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(NotifyError::InvalidConfigValueError {
            field: "stamp.format".to_string(),
            value: format.to_string(),
            reason: "Not a valid strftime format".to_string(),
        });
    }
    Ok(())
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
