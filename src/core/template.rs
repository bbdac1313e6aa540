//! Placeholder substitution for notification messages.
//!
//! A template is any serializable message object whose string leaves may
//! contain `${field}` markers. Markers name a column of the row being
//! notified, or one of the reserved names below. The template is walked as a
//! `serde_json::Value`, each string leaf is substituted in a single pass, and
//! the value is reassembled into the template type, so the output always has
//! the same shape as the input. Values spliced into the `html` leaf are
//! HTML-escaped; other leaves receive them verbatim.

use crate::domain::model::{RenderedMessage, Row};
use crate::utils::error::{NotifyError, Result};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::LazyLock;

/// Replaced by the campus folder identifier.
pub const FOLDER_ID_MARKER: &str = "driveLink";
/// Replaced by the folder base URL followed by the folder identifier.
pub const FOLDER_URL_MARKER: &str = "folderUrl";

const HTML_FIELD: &str = "html";

pub const DEFAULT_FOLDER_BASE_URL: &str = "https://drive.google.com/drive/folders/";
pub const DEFAULT_SUBJECT: &str = "AEP Placement Transition Plan";

pub const DEFAULT_HTML: &str = r#"${Student Name} has nearly completed their assigned placement at NAMS and should be returning to ${Campus} on or around ${Return Date}.<br><br>
On their last day of placement, they will be given withdrawal documents and the parents/guardians will have been called and told to contact ${Campus} to set up an appointment to re-enroll and meet with an administrator/counselor.<br><br>
Below are links and attachments to a Personalized Transition Plan (with notes from NAMS' assigned social worker), the student's AEP Transition Plan (with grades and notes from their teachers at NAMS), and a link to ${Campus}'s folder with all of the transition plans for this year.<br><br>
Please let me know if you have any questions or concerns.<br><br>
Thank you for all you do,<br>
JD<br><br>
<ul>
  <li><a href="${Merged Doc URL - Home Campus Transition Plan}">Home Campus Transition Plan</a></li>
  <li><a href="${Merged Doc URL - Student Transition }">Student Transition Plan</a></li>
  <li><a href="${folderUrl}">Drive Folder</a></li>
  <li><a href="https://drive.google.com/file/d/1qnyQ8cCxLVM9D6rg4wkyBp6KrXIELfNx/view?usp=sharing">Updates in Special Education</a></li>
</ul>"#;

// No nested braces inside a marker.
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^{}]+?)\}").expect("placeholder pattern is valid"));

static LINE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").expect("line break pattern is valid"));
static ANCHOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\s[^>]*?href\s*=\s*"([^"]*)"[^>]*>(.*?)</a>"#).expect("anchor pattern is valid")
});
static LIST_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<li[^>]*>").expect("list item pattern is valid"));
static BLOCK_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</(li|p|ul|ol|div)>").expect("block end pattern is valid"));
static ANY_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("tag pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageTemplate {
    pub subject: String,
    pub html: String,
    /// Plain-text body; derived from `html` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Default for MessageTemplate {
    fn default() -> Self {
        Self {
            subject: DEFAULT_SUBJECT.to_string(),
            html: DEFAULT_HTML.to_string(),
            text: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    folder_base_url: String,
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_FOLDER_BASE_URL)
    }
}

impl TemplateRenderer {
    pub fn new(folder_base_url: impl Into<String>) -> Self {
        Self {
            folder_base_url: folder_base_url.into(),
        }
    }

    pub fn render(
        &self,
        template: &MessageTemplate,
        row: &Row,
        folder_id: &str,
    ) -> Result<RenderedMessage> {
        let value = match self.render_value(serde_json::to_value(template)?, row, folder_id) {
            Value::Object(mut fields) => {
                let html = self.substitute_html(&template.html, row, folder_id);
                fields.insert(HTML_FIELD.to_string(), Value::String(html));
                Value::Object(fields)
            }
            other => other,
        };
        let rendered: MessageTemplate = serde_json::from_value(value)
            .map_err(|e| NotifyError::template(format!("rendered message is malformed: {e}")))?;

        let text_body = match rendered.text {
            Some(text) => text,
            None => html_to_text(&rendered.html),
        };

        Ok(RenderedMessage {
            subject: rendered.subject,
            text_body,
            html_body: rendered.html,
        })
    }

    /// Substitutes every string leaf; keys and non-string leaves are kept.
    pub fn render_value(&self, value: Value, row: &Row, folder_id: &str) -> Value {
        match value {
            Value::String(s) => Value::String(self.substitute(&s, row, folder_id)),
            Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(|item| self.render_value(item, row, folder_id))
                    .collect(),
            ),
            Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(key, item)| (key, self.render_value(item, row, folder_id)))
                    .collect(),
            ),
            other => other,
        }
    }

    /// Replaces markers in one string. Values are inserted verbatim and never re-scanned.
    pub fn substitute(&self, text: &str, row: &Row, folder_id: &str) -> String {
        PLACEHOLDER
            .replace_all(text, |caps: &Captures| self.lookup(&caps[1], row, folder_id))
            .into_owned()
    }

    /// Like [`substitute`](Self::substitute), with values HTML-escaped.
    pub fn substitute_html(&self, html: &str, row: &Row, folder_id: &str) -> String {
        PLACEHOLDER
            .replace_all(html, |caps: &Captures| {
                escape_html(&self.lookup(&caps[1], row, folder_id))
            })
            .into_owned()
    }

    fn lookup(&self, marker: &str, row: &Row, folder_id: &str) -> String {
        match marker {
            FOLDER_ID_MARKER => folder_id.to_string(),
            FOLDER_URL_MARKER => format!("{}{}", self.folder_base_url, folder_id),
            field => row.value(field).to_string(),
        }
    }
}

impl MessageTemplate {
    /// Row columns the template refers to, reserved markers excluded.
    pub fn referenced_fields(&self) -> Vec<String> {
        let mut fields = Vec::new();
        for text in [Some(&self.subject), Some(&self.html), self.text.as_ref()]
            .into_iter()
            .flatten()
        {
            for name in placeholders(text) {
                if name != FOLDER_ID_MARKER && name != FOLDER_URL_MARKER && !fields.contains(&name) {
                    fields.push(name);
                }
            }
        }
        fields
    }

    /// Referenced columns that `headers` does not have; these render as empty strings.
    pub fn missing_fields(&self, headers: &[String]) -> Vec<String> {
        self.referenced_fields()
            .into_iter()
            .filter(|field| !headers.contains(field))
            .collect()
    }
}

/// Lists the markers a template string references, in order of appearance.
pub fn placeholders(text: &str) -> Vec<String> {
    PLACEHOLDER
        .captures_iter(text)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Plain-text rendition of a simple HTML body.
pub fn html_to_text(html: &str) -> String {
    let text = LINE_BREAK.replace_all(html, "\n");
    let text = ANCHOR.replace_all(&text, "$2 ($1)");
    let text = LIST_ITEM.replace_all(&text, "- ");
    let text = BLOCK_END.replace_all(&text, "\n");
    let text = ANY_TAG.replace_all(&text, "");
    let text = decode_entities(&text);

    let mut lines: Vec<&str> = Vec::new();
    for line in text.lines().map(str::trim) {
        if line.is_empty() && lines.last().map_or(true, |last| last.is_empty()) {
            continue;
        }
        lines.push(line);
    }
    while lines.last().is_some_and(|last| last.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
