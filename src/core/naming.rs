use crate::utils::error::{MergeError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const DEFAULT_FILENAME_PATTERN: &str = "{date}_{prefix}_{index}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Docx,
    Pdf,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Docx => "docx",
            OutputFormat::Pdf => "pdf",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "docx" | "word" => Ok(OutputFormat::Docx),
            "pdf" => Ok(OutputFormat::Pdf),
            other => Err(MergeError::InvalidConfigValue {
                field: "output.format".to_string(),
                value: other.to_string(),
                reason: "Valid formats: docx, pdf".to_string(),
            }),
        }
    }
}

/// 輸出文件命名規則：`{date}`、`{prefix}`、`{index}`（從 1 開始）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingPolicy {
    pattern: String,
    extension: String,
}

impl NamingPolicy {
    pub fn new(pattern: impl Into<String>, format: OutputFormat) -> Result<Self> {
        let pattern = pattern.into();
        if !pattern.contains("{index}") {
            // 沒有序號會讓每份文件寫到同一個路徑
            return Err(MergeError::InvalidConfigValue {
                field: "output.filename_pattern".to_string(),
                value: pattern,
                reason: "pattern must contain {index}".to_string(),
            });
        }
        Ok(Self {
            pattern,
            extension: format.extension().to_string(),
        })
    }

    pub fn file_name(&self, date: NaiveDate, prefix: &str, index: usize) -> String {
        let stem = self
            .pattern
            .replace("{date}", &date.format("%Y%m%d").to_string())
            .replace("{prefix}", &sanitize_file_component(prefix))
            .replace("{index}", &index.to_string());
        format!("{}.{}", stem, self.extension)
    }
}

impl Default for NamingPolicy {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_FILENAME_PATTERN.to_string(),
            extension: OutputFormat::Docx.extension().to_string(),
        }
    }
}

pub fn sanitize_file_component(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}
