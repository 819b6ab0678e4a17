// Adapters layer: concrete implementations for external systems (storage, spreadsheets).

pub mod spreadsheet;
pub mod storage;

pub use spreadsheet::{load_dataset, write_worksheet_template};
pub use storage::LocalStorage;
