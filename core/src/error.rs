use thiserror::Error;

/// Fatal, crate-internal error conditions. Recoverable per-item conditions
/// (an unresolved reference, an unrecognized template, an unknown language
/// code) are never modeled as `Result` errors here; callers log them and
/// fall through, matching the propagation policy of the rest of the crate.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown relation type name: {0}")]
    UnknownRelationType(String),

    #[error("relation store already finalized")]
    AlreadyFinalized,

    #[error("no multi-meaning slot reserved for {0:?}; the index must be built first")]
    UnknownLexiconSlot(String),

    #[error("failed to load gloss matcher model")]
    GlossModelLoad(#[source] anyhow::Error),
}

pub type CoreResult<T> = Result<T, CoreError>;
