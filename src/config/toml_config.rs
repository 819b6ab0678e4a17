use crate::core::batch::FailurePolicy;
use crate::core::naming::{OutputFormat, DEFAULT_FILENAME_PATTERN};
use crate::core::projector::DEFAULT_FILE_PREFIX;
use crate::core::session::{SessionSettings, DEFAULT_WORKSHEET_NAME};
use crate::utils::error::{MergeError, Result};
use crate::utils::validation::{
    validate_file_extension, validate_non_empty_string, validate_one_of, validate_path, Validate,
};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static ENV_VAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is valid"));

pub const TEMPLATE_EXTENSIONS: &[&str] = &["docx"];
pub const DATA_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "csv"];
const FORMATS: &[&str] = &["docx", "word", "pdf"];
const FAILURE_POLICIES: &[&str] = &["fail_fast", "continue"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    pub template: TemplateConfig,
    pub data: DataConfig,
    /// 手動映射：變量名 = 列名
    pub mapping: BTreeMap<String, String>,
    pub output: OutputConfig,
    pub batch: BatchConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    pub path: Option<PathBuf>,
    pub write_worksheet: bool,
    pub worksheet_name: String,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            path: None,
            write_worksheet: true,
            worksheet_name: DEFAULT_WORKSHEET_NAME.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub path: Option<PathBuf>,
    pub sheet: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: Option<PathBuf>,
    pub file_prefix: String,
    pub format: String,
    pub filename_pattern: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: None,
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
            format: "docx".to_string(),
            filename_pattern: DEFAULT_FILENAME_PATTERN.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub failure_policy: String,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            failure_policy: "fail_fast".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

impl MergeConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| MergeError::Config {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${OUTPUT_DIR})；未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR_PATTERN
            .replace_all(content, |caps: &Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    pub fn output_format(&self) -> Result<OutputFormat> {
        OutputFormat::parse(&self.output.format)
    }

    pub fn failure_policy(&self) -> Result<FailurePolicy> {
        match self.batch.failure_policy.trim() {
            "fail_fast" => Ok(FailurePolicy::FailFast),
            "continue" => Ok(FailurePolicy::Continue),
            other => Err(MergeError::InvalidConfigValue {
                field: "batch.failure_policy".to_string(),
                value: other.to_string(),
                reason: format!("Valid values: {}", FAILURE_POLICIES.join(", ")),
            }),
        }
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.enabled
    }

    /// 轉換為合併作業的設定
    pub fn session_settings(&self) -> Result<SessionSettings> {
        Ok(SessionSettings {
            template_path: self.template.path.clone(),
            data_path: self.data.path.clone(),
            sheet: self.data.sheet.clone(),
            output_dir: self.output.dir.clone(),
            file_prefix: self.output.file_prefix.clone(),
            format: self.output_format()?,
            filename_pattern: self.output.filename_pattern.clone(),
            failure_policy: self.failure_policy()?,
            write_worksheet: self.template.write_worksheet,
            worksheet_name: self.template.worksheet_name.clone(),
            mapping_overrides: self.mapping.clone(),
            date: None,
        })
    }
}

impl Validate for MergeConfig {
    fn validate(&self) -> Result<()> {
        if let Some(path) = &self.template.path {
            validate_path("template.path", path)?;
            validate_file_extension("template.path", path, TEMPLATE_EXTENSIONS)?;
        }

        if let Some(path) = &self.data.path {
            validate_path("data.path", path)?;
            validate_file_extension("data.path", path, DATA_EXTENSIONS)?;
        }

        if let Some(dir) = &self.output.dir {
            validate_path("output.dir", dir)?;
        }

        validate_non_empty_string("template.worksheet_name", &self.template.worksheet_name)?;
        validate_file_extension(
            "template.worksheet_name",
            Path::new(&self.template.worksheet_name),
            &["xlsx"],
        )?;

        let format = self.output.format.trim().to_ascii_lowercase();
        validate_one_of("output.format", &format, FORMATS)?;
        validate_one_of("batch.failure_policy", self.batch.failure_policy.trim(), FAILURE_POLICIES)?;

        if !self.output.filename_pattern.contains("{index}") {
            return Err(MergeError::InvalidConfigValue {
                field: "output.filename_pattern".to_string(),
                value: self.output.filename_pattern.clone(),
                reason: "pattern must contain {index}".to_string(),
            });
        }

        // 列名留空表示取消映射，只有變量名必須存在
        for placeholder in self.mapping.keys() {
            validate_non_empty_string("mapping", placeholder)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const FULL_CONFIG: &str = r#"
[template]
path = "模板/律师函模板.docx"
write_worksheet = false

[data]
path = "数据/客户.xlsx"
sheet = "欠款"

[mapping]
"客户名称" = "姓名"

[output]
dir = "./输出"
file_prefix = "催款函"
filename_pattern = "{prefix}_{index}"

[batch]
failure_policy = "continue"

[monitoring]
enabled = true
"#;

    #[test]
    fn test_parse_full_config() {
        let config = MergeConfig::from_toml_str(FULL_CONFIG).unwrap();

        assert_eq!(config.template.path, Some(PathBuf::from("模板/律师函模板.docx")));
        assert!(!config.template.write_worksheet);
        assert_eq!(config.data.sheet.as_deref(), Some("欠款"));
        assert_eq!(config.mapping["客户名称"], "姓名");
        assert_eq!(config.failure_policy().unwrap(), FailurePolicy::Continue);
        assert!(config.monitoring_enabled());
        assert!(config.validate().is_ok());

        let settings = config.session_settings().unwrap();
        assert_eq!(settings.file_prefix, "催款函");
        assert_eq!(settings.format, OutputFormat::Docx);
        assert_eq!(settings.mapping_overrides.len(), 1);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = MergeConfig::from_toml_str("").unwrap();

        assert!(config.template.write_worksheet);
        assert_eq!(config.template.worksheet_name, DEFAULT_WORKSHEET_NAME);
        assert_eq!(config.output.file_prefix, DEFAULT_FILE_PREFIX);
        assert_eq!(config.output.filename_pattern, DEFAULT_FILENAME_PATTERN);
        assert_eq!(config.failure_policy().unwrap(), FailurePolicy::FailFast);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("LETTER_MERGE_TEST_OUTPUT", "/tmp/letters");

        let config = MergeConfig::from_toml_str(
            r#"
[output]
dir = "${LETTER_MERGE_TEST_OUTPUT}"
file_prefix = "${LETTER_MERGE_UNSET_VAR}"
"#,
        )
        .unwrap();
        assert_eq!(config.output.dir, Some(PathBuf::from("/tmp/letters")));
        assert_eq!(config.output.file_prefix, "${LETTER_MERGE_UNSET_VAR}");

        std::env::remove_var("LETTER_MERGE_TEST_OUTPUT");
    }

    #[test]
    fn test_config_validation() {
        let bad_template = MergeConfig::from_toml_str("[template]\npath = \"letter.pdf\"\n").unwrap();
        assert!(bad_template.validate().is_err());

        let bad_policy = MergeConfig::from_toml_str("[batch]\nfailure_policy = \"retry\"\n").unwrap();
        assert!(bad_policy.validate().is_err());
        assert!(bad_policy.session_settings().is_err());

        let bad_pattern = MergeConfig::from_toml_str("[output]\nfilename_pattern = \"{date}\"\n").unwrap();
        assert!(bad_pattern.validate().is_err());

        assert!(MergeConfig::from_toml_str("[output\n").is_err());

        let blank_key = MergeConfig::from_toml_str("[mapping]\n\" \" = \"姓名\"\n").unwrap();
        assert!(blank_key.validate().is_err());
    }

    #[test]
    fn test_blank_mapping_column_unmaps() {
        let config = MergeConfig::from_toml_str("[mapping]\n\"备注\" = \"\"\n").unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.session_settings().unwrap().mapping_overrides["备注"], "");
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(FULL_CONFIG.as_bytes()).unwrap();

        let config = MergeConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.output.file_prefix, "催款函");
    }
}
