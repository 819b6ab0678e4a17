pub mod package;
pub mod paragraph;
pub mod xml;

pub use package::{Document, Template, DOCUMENT_PART};
