//! Document backends: DOCX parsing into the flat element stream.
//!
//! The backend owns everything between raw uploaded bytes and the typed
//! element stream consumed by the structure manager:
//!
//! - [`docx::DocxParser`] walks the document body and runs the extractors
//! - [`numbering::NumberingEngine`] renders list markers
//! - [`nesting::NestingCalculator`] assigns indentation depth
//! - [`storage::FileStorage`] persists extracted media
//! - [`service::ParserService`] ties the pipeline together per upload

pub mod docx;
pub mod nesting;
pub mod numbering;
pub mod service;
pub mod storage;

pub use docx::{DocxPackage, DocxParser};
pub use nesting::NestingCalculator;
pub use numbering::{NumFormat, NumberingEngine, NumberingItem};
pub use service::ParserService;
pub use storage::{FileStorage, LocalStorage, MemoryStorage};
