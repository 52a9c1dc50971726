use thiserror::Error;

/// Typed failure taxonomy for engine operations.
#[derive(Debug, Error, Clone)]
pub enum EngineError {
    /// Malformed input; nothing was mutated.
    #[error("validation error: {0}")]
    Validation(String),
    /// Unknown entity id; nothing was mutated.
    #[error("{0} not found: {1}")]
    NotFound(&'static str, String),
    /// Another evaluation is in flight for the box. Skip or retry later.
    #[error("evaluation already in flight for box {0}")]
    ConcurrencyConflict(String),
    /// Persistence or lookup collaborator failed; the current operation is
    /// aborted and may be retried on the next cycle.
    #[error("collaborator unavailable: {0}")]
    Collaborator(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing store")]
    MissingStore,
    #[error("missing notifier")]
    MissingNotifier,
    #[error("missing tier lookup")]
    MissingTierLookup,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;

/// Map a collaborator's boxed error into the engine taxonomy.
#[inline]
pub(crate) fn collab_err(e: smartbox_traits::DynError) -> Report {
    Report::new(EngineError::Collaborator(e.to_string()))
}
