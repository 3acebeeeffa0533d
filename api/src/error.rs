use thiserror::Error;

/// Why a claim's compare-and-set declined to mutate the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimRejection {
    /// No user document exists.
    MissingDocument,
    /// The document is idle; either nothing was started or the reward was already taken.
    NoSession,
    /// The session end time has not been reached yet.
    NotMatured,
}

impl std::fmt::Display for ClaimRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            ClaimRejection::MissingDocument => "user document missing",
            ClaimRejection::NoSession => "no session to claim",
            ClaimRejection::NotMatured => "session not matured",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MiningError {
    #[error("Login required")]
    NotAuthenticated,

    #[error("Mining already active")]
    AlreadyActive,
    #[error("Failed to start mining: {0}")]
    SessionStartFailed(String),

    #[error("Not ready to claim yet ({0})")]
    ClaimNotReady(ClaimRejection),
    #[error("Claim failed: {0}")]
    ClaimTransportFailure(String),
    #[error("Failed to record mining transaction: {0}")]
    TransactionLogWriteFailure(String),

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
}

impl MiningError {
    /// Failures the user can simply try again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MiningError::SessionStartFailed(_) | MiningError::ClaimTransportFailure(_)
        )
    }
}
