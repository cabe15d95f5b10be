//! Error kinds recognised by the core (spec §7).

use std::fmt;

/// The four error kinds the engine distinguishes.
///
/// `NotApplicable` is not really an error in the exception-handling sense: analyses
/// return it as a sentinel value, paired with a human-readable reason, rather than
/// unwinding. It is folded into this enum anyway so analysis code can use `?`
/// uniformly and let the caller decide whether to treat it as a short-circuit.
#[derive(Debug, Clone)]
pub enum EngineError {
    /// Simulation cannot proceed: no non-conditional rules, no living taxa, an
    /// invalid configuration discovered at run time.
    Execution(String),
    /// Programmer error: out-of-range index, missing taxon name lookup.
    Index(String),
    /// An analysis short-circuited; the reporter should emit the reason as a normal
    /// analysis line rather than treat it as a failure.
    NotApplicable(String),
    /// A [`crate::persist::SaveSink`] failed to write a rep to disk. Carries the
    /// flattened `anyhow` context chain rather than the original error, since the
    /// underlying writer is an external collaborator (spec §1, §7).
    File(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Execution(msg) => write!(f, "execution error: {msg}"),
            Self::Index(msg) => write!(f, "index error: {msg}"),
            Self::NotApplicable(msg) => write!(f, "not applicable: {msg}"),
            Self::File(msg) => write!(f, "file error: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl EngineError {
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }
    pub fn index(msg: impl Into<String>) -> Self {
        Self::Index(msg.into())
    }
    pub fn not_applicable(msg: impl Into<String>) -> Self {
        Self::NotApplicable(msg.into())
    }
    pub fn file(msg: impl Into<String>) -> Self {
        Self::File(msg.into())
    }

    pub fn is_not_applicable(&self) -> bool {
        matches!(self, Self::NotApplicable(_))
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
