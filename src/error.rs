use crate::ai::AiError;

/// Error types for the synchronization core
///
/// Most failure modes in the pipeline deliberately do not surface here:
/// parsing is permissive and never fails, unmappable hunks become
/// whole-document fallback changes, collaborator failures downgrade to
/// unmatched results, and oversized content is truncated with a flag.
/// What remains is the small set of conditions that must abort a single
/// document's update.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncError {
    /// The rewritten document no longer round-trips, or an untouched
    /// section changed. The rewrite must be discarded.
    SerializationMismatch(String),
    /// An edit referred to a section path that does not exist in the
    /// target outline.
    MissingSection(String),
    /// A collaborator error that could not be downgraded.
    Ai(AiError),
}

impl std::fmt::Display for SyncError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncError::SerializationMismatch(msg) => {
                write!(f, "Serialization mismatch: {}", msg)
            }
            SyncError::MissingSection(path) => {
                write!(f, "Section not found in target outline: {}", path)
            }
            SyncError::Ai(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for SyncError {}

impl From<AiError> for SyncError {
    fn from(err: AiError) -> Self {
        SyncError::Ai(err)
    }
}

/// Result type for synchronization operations
pub type SyncResult<T> = Result<T, SyncError>;
