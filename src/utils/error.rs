use thiserror::Error;

#[derive(Error, Debug)]
pub enum MergeError {
    #[error("Required input is missing: {field}")]
    InputMissing { field: String },

    #[error("{what} must be loaded before this operation")]
    DataNotLoaded { what: String },

    #[error("Document format error: {message}")]
    DocumentFormat { message: String },

    #[error("Data format error: {message}")]
    DataFormat { message: String },

    #[error("Mapping incomplete: {message}")]
    MappingIncomplete { message: String },

    #[error("Mapping error: {message}")]
    Mapping { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Zip operation failed: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("CSV processing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Configuration field '{field}' is missing")]
    MissingConfig { field: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Processing error: {message}")]
    Processing { message: String },
}

pub type Result<T> = std::result::Result<T, MergeError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Document,
    Data,
    Mapping,
    Storage,
    Configuration,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl MergeError {
    pub fn document_format(message: impl Into<String>) -> Self {
        Self::DocumentFormat {
            message: message.into(),
        }
    }

    pub fn data_format(message: impl Into<String>) -> Self {
        Self::DataFormat {
            message: message.into(),
        }
    }

    pub fn input_missing(field: impl Into<String>) -> Self {
        Self::InputMissing {
            field: field.into(),
        }
    }

    pub fn data_not_loaded(what: impl Into<String>) -> Self {
        Self::DataNotLoaded { what: what.into() }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InputMissing { .. } | Self::DataNotLoaded { .. } => ErrorCategory::Input,
            Self::DocumentFormat { .. } | Self::Zip(_) | Self::Xml(_) => ErrorCategory::Document,
            Self::DataFormat { .. } | Self::Csv(_) => ErrorCategory::Data,
            Self::MappingIncomplete { .. } | Self::Mapping { .. } => ErrorCategory::Mapping,
            Self::Io(_) | Self::Serialization(_) => ErrorCategory::Storage,
            Self::Config { .. } | Self::MissingConfig { .. } | Self::InvalidConfigValue { .. } => {
                ErrorCategory::Configuration
            }
            Self::Processing { .. } => ErrorCategory::Internal,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 未映射的變量會以空字串替換，只是提示
            Self::MappingIncomplete { .. } => ErrorSeverity::Low,
            Self::InputMissing { .. }
            | Self::DataNotLoaded { .. }
            | Self::Mapping { .. }
            | Self::Config { .. }
            | Self::MissingConfig { .. }
            | Self::InvalidConfigValue { .. } => ErrorSeverity::Medium,
            Self::DocumentFormat { .. }
            | Self::DataFormat { .. }
            | Self::Zip(_)
            | Self::Xml(_)
            | Self::Csv(_)
            | Self::Serialization(_) => ErrorSeverity::High,
            Self::Io(_) | Self::Processing { .. } => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Input => "请先选择模板、数据文件与输出目录，并依次完成变量解析、数据加载",
            ErrorCategory::Document => "确认模板为有效的 .docx 文件，且未被其他程序锁定",
            ErrorCategory::Data => "确认数据文件为 .xlsx 或 .csv，且第一行为列名",
            ErrorCategory::Mapping => "检查变量映射，映射的列名必须存在于数据文件中",
            ErrorCategory::Storage => "确认输出目录可写入，且磁盘空间充足",
            ErrorCategory::Configuration => "检查配置文件与命令行参数",
            ErrorCategory::Internal => "请重试；若问题持续，使用 --verbose 查看详细日志",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::InputMissing { field } => format!("请先选择{}", field),
            Self::DataNotLoaded { what } => format!("请先加载{}", what),
            Self::DocumentFormat { message } => format!("模板文件无法读取: {}", message),
            Self::DataFormat { message } => format!("数据文件无法读取: {}", message),
            Self::MappingIncomplete { message } => format!("变量映射不完整: {}", message),
            Self::Mapping { message } => format!("变量映射错误: {}", message),
            Self::Io(e) => format!("文件读写失败: {}", e),
            other => other.to_string(),
        }
    }
}
