/// Errors produced while submitting a document to the registry.
///
/// Every variant maps to a distinct process exit code (see
/// [`GatewayError::exit_code`]) so scripted callers can branch on the kind of
/// failure without parsing messages.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GatewayError {
    /// The gateway could not be built: the rate is not positive or the base
    /// URL does not parse.
    #[error("Invalid gateway configuration: {0}")]
    InvalidConfiguration(String),

    /// The document could not be encoded. Nothing was sent.
    #[error("Failed to serialize document: {0}")]
    Serialization(String),

    /// The HTTP exchange itself failed (connection refused, reset, I/O error).
    ///
    /// The string contains the `Display` representation of the transport error.
    #[error("Transport failure: {0}")]
    Transport(String),

    /// The registry answered with a status other than `200 OK`.
    #[error("Server returned non-OK status: {status}")]
    SubmissionFailed {
        /// The status code the registry responded with.
        status: u16,
        /// Whatever body came back with it, possibly empty.
        body: String,
    },

    /// The submission did not get a permit or the outbound channel within its
    /// deadline. Nothing was sent.
    #[error("Timed out waiting for rate limit capacity or the outbound channel")]
    Timeout,
}

impl GatewayError {
    /// Process exit code for this kind of failure.
    ///
    /// `0` is success and `1` is left for failures outside this taxonomy.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::InvalidConfiguration(_) => 2,
            Self::Serialization(_) => 3,
            Self::Transport(_) => 4,
            Self::SubmissionFailed { .. } => 5,
            Self::Timeout => 6,
        }
    }

    /// Short, stable label used for metric attributes and log fields.
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Self::InvalidConfiguration(_) => "invalid_configuration",
            Self::Serialization(_) => "serialization",
            Self::Transport(_) => "transport",
            Self::SubmissionFailed { .. } => "submission_failed",
            Self::Timeout => "timeout",
        }
    }
}

impl From<pace_limit::ConfigError> for GatewayError {
    fn from(err: pace_limit::ConfigError) -> Self {
        Self::InvalidConfiguration(err.to_string())
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
