use thiserror::Error;

/// Errors surfaced by the public actor API.
///
/// Data-plane failures (transient refresh errors, stale replies) never
/// become a variant here: per the propagation policy, the actor absorbs
/// those internally and only fails fast on configuration errors or on
/// calls made after it has already stopped.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("unrecognised start option: {0}")]
    InvalidOption(String),

    #[error("cluster coordinator actor has stopped")]
    ActorGone,

    #[error("no node available to query CLUSTER SLOTS")]
    ClusterSlotsUnavailable,
}

pub type Result<T> = std::result::Result<T, CoordinatorError>;
