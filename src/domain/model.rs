use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;

/// 模板中解析出的變量名，排序且去重
pub type PlaceholderSet = BTreeSet<String>;

/// 單筆文檔的替換數據：變量名 -> 顯示文字
pub type SubstitutionRecord = BTreeMap<String, String>;

/// 數據文件中的單元格值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    String(String),
    Number(f64),
    Date(NaiveDateTime),
    Blank,
}

impl Value {
    pub fn is_blank(&self) -> bool {
        matches!(self, Value::Blank)
    }

    /// 唯一的字串化規則，投影與預覽共用
    pub fn to_display_string(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Number(n) => format_number(*n),
            Value::Date(dt) => {
                if dt.time().num_seconds_from_midnight() == 0 {
                    dt.format("%Y-%m-%d").to_string()
                } else {
                    dt.format("%Y-%m-%d %H:%M:%S").to_string()
                }
            }
            Value::Blank => String::new(),
        }
    }
}

pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub cells: HashMap<String, Value>,
}

impl Row {
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.cells.get(column)
    }
}

/// 表頭唯一的有序數據集
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataSet {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl DataSet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// 變量 -> 列名，`None` 表示未映射
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mapping {
    entries: BTreeMap<String, Option<String>>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, placeholder: impl Into<String>, column: Option<String>) {
        self.entries.insert(placeholder.into(), column);
    }

    pub fn get(&self, placeholder: &str) -> Option<&str> {
        self.entries.get(placeholder).and_then(|c| c.as_deref())
    }

    pub fn contains(&self, placeholder: &str) -> bool {
        self.entries.contains_key(placeholder)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, Option<&String>)> {
        self.entries.iter().map(|(k, v)| (k, v.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn unmapped(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, column)| column.is_none())
            .map(|(placeholder, _)| placeholder.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    Progress {
        percent: f64,
        completed: usize,
        total: usize,
        message: String,
        output: PathBuf,
    },
    RecordFailed {
        index: usize,
        message: String,
    },
    Completed {
        succeeded: usize,
        failed: usize,
        message: String,
    },
    Failed {
        completed: usize,
        message: String,
    },
    Cancelled {
        completed: usize,
        message: String,
    },
}

impl ProgressEvent {
    /// 進度百分比，錯誤時為負值
    pub fn percent(&self) -> f64 {
        match self {
            ProgressEvent::Progress { percent, .. } => *percent,
            ProgressEvent::Completed { .. } => 100.0,
            ProgressEvent::RecordFailed { .. }
            | ProgressEvent::Failed { .. }
            | ProgressEvent::Cancelled { .. } => -1.0,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ProgressEvent::Progress { message, .. }
            | ProgressEvent::RecordFailed { message, .. }
            | ProgressEvent::Completed { message, .. }
            | ProgressEvent::Failed { message, .. }
            | ProgressEvent::Cancelled { message, .. } => message,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProgressEvent::Completed { .. } | ProgressEvent::Failed { .. } | ProgressEvent::Cancelled { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchState {
    Idle,
    Running,
    Completed,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecordOutcome {
    Generated { index: usize, path: PathBuf },
    Failed { index: usize, error: String },
}

/// 一次批次生成的結果
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub state: BatchState,
    pub total: usize,
    pub outcomes: Vec<RecordOutcome>,
}

impl BatchReport {
    pub fn new(total: usize) -> Self {
        Self {
            state: BatchState::Idle,
            total,
            outcomes: Vec::with_capacity(total),
        }
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, RecordOutcome::Generated { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, RecordOutcome::Failed { .. }))
            .count()
    }

    pub fn generated_paths(&self) -> Vec<&PathBuf> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                RecordOutcome::Generated { path, .. } => Some(path),
                RecordOutcome::Failed { .. } => None,
            })
            .collect()
    }
}
