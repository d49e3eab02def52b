use bulwark_config::ConfigError;
use bulwark_core::RejectionReason;

/// Errors that can occur while setting up a mediated session.
///
/// Mediation itself never fails with an error: refusals are
/// [`Outcome::Abort`](bulwark_core::Outcome::Abort) values.
#[derive(Debug, thiserror::Error)]
pub enum ApprovalError {
    /// The initial working directory is not usable under the policy.
    #[error("invalid working directory: {0}")]
    WorkingDirectory(RejectionReason),

    /// The policy configuration could not be turned into a policy.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for approval operations.
pub type ApprovalResult<T> = Result<T, ApprovalError>;
