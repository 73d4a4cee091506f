//! Sync layer errors

use aniverse_core::CoreError;

/// Failure reported by the remote store for a write
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MutationError {
    /// The store refused the write (constraint, policy, validation)
    #[error("rejected by store ({code}): {message}")]
    Rejected {
        /// Store error code
        code: String,
        /// Store error message
        message: String,
    },

    /// The request never reached the store or the connection dropped
    #[error("network error: {message}")]
    Network {
        /// Transport error message
        message: String,
    },

    /// No answer within the configured deadline
    #[error("no response after {after_ms} ms")]
    Timeout {
        /// Deadline that elapsed
        after_ms: u64,
    },

    /// The store answered with a row that could not be decoded
    #[error("undecodable response: {message}")]
    Decode {
        /// Decoder message
        message: String,
    },
}

impl MutationError {
    /// Build a rejection
    pub fn rejected(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rejected {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Build a network failure
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Whether retrying might succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Timeout { .. })
    }
}

/// Errors surfaced by reconcilers, streams, and the subscription manager
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// An optimistic change was rolled back because the store refused it
    #[error("optimistic mutation failed: {source}")]
    OptimisticMutationFailed {
        /// What the store reported
        #[source]
        source: MutationError,
    },

    /// A mutation outcome arrived for a change this stream does not track
    #[error("no pending mutation {id}")]
    UnknownMutation {
        /// Placeholder or pending delete id
        id: String,
    },

    /// A local delete targeted a record that is not in the stream
    #[error("record {id} is not in this stream")]
    UnknownRecord {
        /// Record id
        id: String,
    },

    /// A row could not be decoded into the stream's record type
    #[error("cannot decode {table} row: {message}")]
    Decode {
        /// Source table
        table: String,
        /// Decoder message
        message: String,
    },

    /// The change feed refused or lost a subscription
    #[error("change feed error: {message}")]
    Feed {
        /// Feed error message
        message: String,
    },
}

impl SyncError {
    /// Build a feed error
    pub fn feed(message: impl Into<String>) -> Self {
        Self::Feed {
            message: message.into(),
        }
    }

    /// Build a decode error for a table
    pub fn decode(table: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Decode {
            table: table.into(),
            message: message.to_string(),
        }
    }

    /// The store-side failure, if this error wraps one
    pub fn mutation_error(&self) -> Option<&MutationError> {
        match self {
            Self::OptimisticMutationFailed { source } => Some(source),
            _ => None,
        }
    }
}

impl From<MutationError> for SyncError {
    fn from(source: MutationError) -> Self {
        Self::OptimisticMutationFailed { source }
    }
}

impl From<SyncError> for CoreError {
    fn from(err: SyncError) -> Self {
        match &err {
            SyncError::OptimisticMutationFailed {
                source: MutationError::Network { .. } | MutationError::Timeout { .. },
            }
            | SyncError::Feed { .. } => Self::network(err.to_string()),
            SyncError::OptimisticMutationFailed {
                source: MutationError::Rejected { .. },
            } => Self::invalid(err.to_string()),
            SyncError::UnknownMutation { .. } | SyncError::UnknownRecord { .. } => {
                Self::not_found(err.to_string())
            }
            SyncError::OptimisticMutationFailed {
                source: MutationError::Decode { .. },
            }
            | SyncError::Decode { .. } => Self::serialization(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_error_mapping() {
        let timeout: CoreError = SyncError::from(MutationError::Timeout { after_ms: 10 }).into();
        assert!(matches!(timeout, CoreError::Network { .. }));

        let rejected: CoreError =
            SyncError::from(MutationError::rejected("23505", "duplicate")).into();
        assert!(matches!(rejected, CoreError::Invalid { .. }));

        let missing: CoreError = SyncError::UnknownRecord { id: "7".into() }.into();
        assert!(matches!(missing, CoreError::NotFound { .. }));
    }

    #[test]
    fn test_transient_classification() {
        assert!(MutationError::network("reset").is_transient());
        assert!(MutationError::Timeout { after_ms: 1 }.is_transient());
        assert!(!MutationError::rejected("42501", "rls").is_transient());
    }
}
