/// Errors surfaced by the reconciliation core. Store-level failures are
/// classified at the kube boundary (404 → `NotFound`, 409 → `Conflict`);
/// everything else from the API client passes through transparently so the
/// caller can treat it as retryable.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("conflicting write on {0}")]
    Conflict(String),

    #[error("conflict retries exhausted for {resource} after {attempts} attempts")]
    ConflictsExhausted { resource: String, attempts: u32 },

    #[error("invalid team name: {0:?}")]
    InvalidTeamName(String),

    #[error("credential hashing failed: {0}")]
    Credential(String),

    #[error("malformed resource: {0}")]
    Malformed(String),

    #[error("step {step} failed: {source}")]
    Step {
        step: &'static str,
        #[source]
        source: Box<Error>,
    },

    #[error(transparent)]
    Kube(#[from] kube::Error),
}

impl Error {
    /// Tag this error with the pipeline step that produced it.
    pub fn at_step(self, step: &'static str) -> Self {
        Self::Step {
            step,
            source: Box::new(self),
        }
    }

    /// Unwrap step tagging down to the underlying failure.
    pub fn root(&self) -> &Error {
        match self {
            Self::Step { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether a prompt retry can plausibly succeed. `NotFound` needs the
    /// missing resource to be created externally first, and a hashing or
    /// naming failure will repeat identically on every attempt.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self.root(),
            Self::NotFound(_) | Self::InvalidTeamName(_) | Self::Credential(_) | Self::Malformed(_)
        )
    }
}
