use crate::adapters::spreadsheet::{load_dataset, write_worksheet_template};
use crate::core::batch::{BatchHandle, BatchOptions, BatchOrchestrator, FailurePolicy};
use crate::core::naming::{NamingPolicy, OutputFormat, DEFAULT_FILENAME_PATTERN};
use crate::core::projector::{project_all, DEFAULT_FILE_PREFIX, FILE_PREFIX_KEY};
use crate::core::resolver::resolve;
use crate::core::scanner::scan;
use crate::document::Template;
use crate::domain::model::{DataSet, Mapping, PlaceholderSet, SubstitutionRecord};
use crate::domain::ports::Storage;
use crate::utils::error::{MergeError, Result};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const DEFAULT_WORKSHEET_NAME: &str = "律师函数据模板.xlsx";

/// 一次合併作業的輸入與選項
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub template_path: Option<PathBuf>,
    pub data_path: Option<PathBuf>,
    pub sheet: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub file_prefix: String,
    pub format: OutputFormat,
    pub filename_pattern: String,
    pub failure_policy: FailurePolicy,
    /// 提取變量後是否在模板目錄生成數據模板
    pub write_worksheet: bool,
    pub worksheet_name: String,
    /// 自動映射後套用的手動映射（變量 → 列名）
    pub mapping_overrides: BTreeMap<String, String>,
    pub date: Option<NaiveDate>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            template_path: None,
            data_path: None,
            sheet: None,
            output_dir: None,
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
            format: OutputFormat::Docx,
            filename_pattern: DEFAULT_FILENAME_PATTERN.to_string(),
            failure_policy: FailurePolicy::FailFast,
            write_worksheet: true,
            worksheet_name: DEFAULT_WORKSHEET_NAME.to_string(),
            mapping_overrides: BTreeMap::new(),
            date: None,
        }
    }
}

/// 合併作業的狀態：模板變量、數據、映射，依序建立
pub struct MergeSession {
    settings: SessionSettings,
    placeholders: Option<PlaceholderSet>,
    worksheet_path: Option<PathBuf>,
    dataset: Option<DataSet>,
    mapping: Option<Mapping>,
}

impl MergeSession {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            settings,
            placeholders: None,
            worksheet_path: None,
            dataset: None,
            mapping: None,
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn placeholders(&self) -> Option<&PlaceholderSet> {
        self.placeholders.as_ref()
    }

    pub fn worksheet_path(&self) -> Option<&Path> {
        self.worksheet_path.as_deref()
    }

    pub fn dataset(&self) -> Option<&DataSet> {
        self.dataset.as_ref()
    }

    pub fn mapping(&self) -> Option<&Mapping> {
        self.mapping.as_ref()
    }

    /// 掃描模板中的變量，並視設定生成數據模板
    pub fn extract_placeholders(&mut self) -> Result<&PlaceholderSet> {
        let template_path = self
            .settings
            .template_path
            .clone()
            .ok_or_else(|| MergeError::input_missing("template"))?;

        let template = Template::open(&template_path)?;
        let placeholders = scan(&template);
        tracing::info!(
            "🔍 Found {} placeholders in {}",
            placeholders.len(),
            template_path.display()
        );

        self.worksheet_path = None;
        if self.settings.write_worksheet && !placeholders.is_empty() {
            let dir = template_path.parent().unwrap_or_else(|| Path::new(""));
            let path = dir.join(&self.settings.worksheet_name);
            write_worksheet_template(&placeholders, &path)?;
            self.worksheet_path = Some(path);
        }

        // 變量改變後舊映射不再有效
        self.mapping = None;
        Ok(&*self.placeholders.insert(placeholders))
    }

    /// 載入數據並立即自動映射
    pub fn load_data(&mut self) -> Result<&DataSet> {
        let data_path = self
            .settings
            .data_path
            .clone()
            .ok_or_else(|| MergeError::input_missing("data"))?;
        if self.placeholders.is_none() {
            return Err(MergeError::data_not_loaded("template placeholders"));
        }

        let dataset = load_dataset(&data_path, self.settings.sheet.as_deref())?;
        self.dataset = Some(dataset);
        self.auto_map()?;

        self.dataset
            .as_ref()
            .ok_or_else(|| MergeError::data_not_loaded("data"))
    }

    pub fn auto_map(&mut self) -> Result<&Mapping> {
        let dataset = self
            .dataset
            .as_ref()
            .ok_or_else(|| MergeError::data_not_loaded("data"))?;
        let placeholders = self
            .placeholders
            .as_ref()
            .ok_or_else(|| MergeError::data_not_loaded("template placeholders"))?;

        let mut mapping = resolve(placeholders, &dataset.columns);

        for (placeholder, column) in &self.settings.mapping_overrides {
            if !mapping.contains(placeholder) {
                tracing::warn!("⚠️ Mapping override for unknown placeholder '{}' ignored", placeholder);
                continue;
            }
            mapping.assign(placeholder, Some(column), &dataset.columns)?;
        }

        let unmapped = mapping.unmapped();
        if !unmapped.is_empty() {
            tracing::warn!("⚠️ Unmapped placeholders will be blank: {}", unmapped.join(", "));
        }

        Ok(&*self.mapping.insert(mapping))
    }

    pub fn edit_mapping(&mut self, placeholder: &str, column: Option<&str>) -> Result<()> {
        let dataset = self
            .dataset
            .as_ref()
            .ok_or_else(|| MergeError::data_not_loaded("data"))?;
        let mapping = self
            .mapping
            .as_mut()
            .ok_or_else(|| MergeError::data_not_loaded("mapping"))?;

        mapping.assign(placeholder, column, &dataset.columns)?;
        tracing::debug!("🔗 {} -> {}", placeholder, column.unwrap_or("<blank>"));
        Ok(())
    }

    /// 開始批次前的同步檢查，回傳批次選項
    pub fn preflight(&self) -> Result<BatchOptions> {
        let template_path = self
            .settings
            .template_path
            .clone()
            .ok_or_else(|| MergeError::input_missing("template"))?;
        let output_dir = self
            .settings
            .output_dir
            .clone()
            .ok_or_else(|| MergeError::input_missing("output directory"))?;

        let dataset = self
            .dataset
            .as_ref()
            .ok_or_else(|| MergeError::data_not_loaded("data"))?;
        let mapping = self
            .mapping
            .as_ref()
            .ok_or_else(|| MergeError::data_not_loaded("mapping"))?;

        if mapping.is_empty() {
            return Err(MergeError::MappingIncomplete {
                message: "no placeholder mapping exists".to_string(),
            });
        }
        if dataset.is_empty() {
            tracing::warn!("⚠️ Data file has no rows; nothing will be generated");
        }

        if self.settings.format == OutputFormat::Pdf {
            return Err(MergeError::InvalidConfigValue {
                field: "output.format".to_string(),
                value: "pdf".to_string(),
                reason: "PDF output is not supported yet; use docx".to_string(),
            });
        }

        let naming = NamingPolicy::new(self.settings.filename_pattern.clone(), self.settings.format)?;

        Ok(BatchOptions {
            template_path,
            output_dir,
            naming,
            failure_policy: self.settings.failure_policy,
            date: self.settings.date,
        })
    }

    pub fn project_records(&self) -> Result<Vec<SubstitutionRecord>> {
        let dataset = self
            .dataset
            .as_ref()
            .ok_or_else(|| MergeError::data_not_loaded("data"))?;
        let mapping = self
            .mapping
            .as_ref()
            .ok_or_else(|| MergeError::data_not_loaded("mapping"))?;

        let prefix = match self.settings.file_prefix.trim() {
            "" => DEFAULT_FILE_PREFIX,
            prefix => prefix,
        };
        let mut extras = BTreeMap::new();
        extras.insert(FILE_PREFIX_KEY.to_string(), prefix.to_string());

        Ok(project_all(dataset, mapping, &extras))
    }

    /// 檢查通過後在背景啟動批次
    pub fn start_batch<S: Storage + 'static>(&self, storage: S) -> Result<BatchHandle> {
        let options = self.preflight()?;
        let records = self.project_records()?;
        Ok(BatchOrchestrator::new(storage, options).spawn(records))
    }
}
