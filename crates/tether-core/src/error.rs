use thiserror::Error as ThisError;

///
/// Mutation
///
/// The three mutation kinds the engine can orchestrate.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Mutation {
    Insert,
    Update,
    Delete,
}

impl Mutation {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

///
/// ExecutorError
///
/// Opaque failure surfaced by the executor collaborator. Never retried;
/// reported once through the diagnostics error channel.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("{message}")]
pub struct ExecutorError {
    pub message: String,
}

impl ExecutorError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

///
/// BindingFailure
///
/// Why a master binding degraded to unbound. Always non-fatal; the owning
/// controller proceeds with no master-derived filter.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum BindingFailure {
    #[error("no registry supplied; master '{master}' cannot be resolved")]
    NoRegistry { master: String },

    #[error("master '{master}' not found in registry")]
    MasterNotFound { master: String },

    #[error("binding field '{field}' missing from child field list")]
    MissingChildField { field: String },

    #[error("binding field '{field}' missing from master '{master}' field list")]
    MissingMasterField { master: String, field: String },
}

///
/// CapabilityReason
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CapabilityReason {
    Disabled,
    NoMutationTarget,
}

///
/// EngineError
///
/// Recoverable-failure taxonomy. None of these cross the public boundary as
/// `Err`; each is converted to a failure return plus one diagnostics report.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum EngineError {
    #[error("{} denied: {}", operation.as_str(), match reason {
        CapabilityReason::Disabled => "capability flag not enabled",
        CapabilityReason::NoMutationTarget => "no mutation target configured",
    })]
    CapabilityDenied {
        operation: Mutation,
        reason: CapabilityReason,
    },

    #[error(transparent)]
    Binding(#[from] BindingFailure),

    #[error(transparent)]
    Executor(#[from] ExecutorError),
}
