use std::path::PathBuf;
use thiserror::Error;

use crate::script::{CompileError, ParseError};

/// A script that could not be turned into runnable code
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read script '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{name}: syntax error: {source}")]
    Parse {
        name: String,
        #[source]
        source: ParseError,
    },

    #[error("{name}: {source}")]
    Compile {
        name: String,
        #[source]
        source: CompileError,
    },

    #[error("script host is not initialized (call init() before running scripts)")]
    NotInitialized,
}
