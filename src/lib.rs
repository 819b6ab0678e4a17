pub mod adapters;
pub mod config;
pub mod core;
pub mod document;
pub mod domain;
pub mod utils;

pub use crate::adapters::{load_dataset, write_worksheet_template, LocalStorage};
pub use crate::config::MergeConfig;
pub use crate::core::{
    projector::project, renderer::render, resolver::resolve, scanner::scan, BatchHandle,
    BatchOptions, BatchOrchestrator, FailurePolicy, MergeSession, NamingPolicy, OutputFormat,
    SessionSettings,
};
pub use crate::document::{Document, Template};
pub use crate::domain::model::{
    BatchReport, BatchState, DataSet, Mapping, PlaceholderSet, ProgressEvent, RecordOutcome, Row,
    SubstitutionRecord, Value,
};
pub use crate::utils::error::{MergeError, Result};
