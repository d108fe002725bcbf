use std::path::PathBuf;

use archgraph_class_file::ClassFileError;
use thiserror::Error;

/// Result type for import operations
pub type Result<T> = std::result::Result<T, ImportError>;

/// Fatal conditions that abort a whole import run.
///
/// Per-file parse failures are not fatal by default; they are collected in
/// [`crate::ImportResult::failures`] and only surface here as
/// [`ImportError::Malformed`] under the fail-fast policy.
#[derive(Error, Debug)]
pub enum ImportError {
    /// A requested input source does not exist
    #[error("input source not found: {0}")]
    SourceNotFound(PathBuf),

    /// An archive source is structurally broken and cannot be enumerated
    #[error("unreadable archive {path}: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    /// A class file failed to parse while the fail-fast policy was active
    #[error("malformed class file at {location}: {source}")]
    Malformed {
        location: String,
        #[source]
        source: ClassFileError,
    },

    /// IO error outside the per-file scope
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One isolated per-file parse failure. The run continues past these under
/// the default collect-and-continue policy.
#[derive(Debug)]
pub struct ImportFailure {
    pub location: String,
    pub error: ClassFileError,
}

/// Non-fatal inconsistencies recovered during import.
///
/// Distinct from the error channel so callers and tests can assert
/// "N diagnostics emitted, 0 fatal errors". Each diagnostic costs some
/// completeness of the graph, never correctness of what is present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// Exception-handler tracking for one method was internally
    /// inconsistent; its remaining blocks were dropped rather than surfaced.
    UnmatchedTryCatchBlocks {
        class_name: String,
        member: String,
        dropped: usize,
    },
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::UnmatchedTryCatchBlocks { class_name, member, dropped } => write!(
                f,
                "dropped {dropped} unmatched try-catch block(s) in {class_name}.{member}"
            ),
        }
    }
}
