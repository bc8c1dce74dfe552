//! ProfeGo Processing Library
//!
//! The per-file stages of the ingestion pipeline that do not touch storage:
//! validation, temporary staging, and conversion to plain text.

pub mod converter;
pub mod dispatcher;
pub mod staging;
pub mod validator;

pub use converter::{BuiltinConverter, ConversionError, Converter};
#[cfg(feature = "remote-converter")]
pub use converter::HttpConverter;
pub use dispatcher::{ConversionDispatcher, ConversionOutcome, ConvertedText};
pub use staging::{StagedFile, Staging, StagingError, TempStaging};
pub use validator::{check_size, FileValidator, ValidationError};
