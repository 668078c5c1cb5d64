//! Error types for the instrument crate

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for instrumentation operations
pub type Result<T> = std::result::Result<T, InstrumentError>;

#[derive(Error, Debug)]
pub enum InstrumentError {
    /// IO operations failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The grammar could not be loaded into the parser
    #[error("Grammar error: {0}")]
    Grammar(#[from] tree_sitter::LanguageError),

    /// The parser produced no tree for the module
    #[error("Failed to parse module: {path:?}")]
    Parse { path: PathBuf },

    /// The file extension maps to no supported grammar
    #[error("Unsupported file extension: {path:?}")]
    UnsupportedExtension { path: PathBuf },
}
