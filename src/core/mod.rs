pub mod batch;
pub mod naming;
pub mod projector;
pub mod renderer;
pub mod resolver;
pub mod scanner;
pub mod session;

pub use crate::domain::model::{DataSet, Mapping, PlaceholderSet, ProgressEvent, SubstitutionRecord};
pub use crate::domain::ports::Storage;
pub use crate::utils::error::Result;
pub use batch::{BatchHandle, BatchOptions, BatchOrchestrator, CancelToken, FailurePolicy};
pub use naming::{NamingPolicy, OutputFormat};
pub use session::{MergeSession, SessionSettings};
