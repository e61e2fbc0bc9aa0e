use {botdeck_channels::EstablishError, std::time::Duration};

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while starting, running or dispatching for
/// the bot connection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The token is empty or contains characters a bot token never has.
    #[error("invalid token format")]
    InvalidCredentialFormat,

    /// One attempt of the retry plan ran out of time.
    #[error("attempt \"{label}\" timed out after {}ms", .timeout.as_millis())]
    AttemptTimeout { label: String, timeout: Duration },

    /// The messaging service rejected the token.
    #[error("invalid bot token")]
    InvalidCredential,

    /// The bot lacks a privileged intent it asked for.
    #[error("missing required intents")]
    MissingPrivilege,

    #[error("messaging service unreachable: {message}")]
    NetworkUnreachable { message: String },

    /// Every attempt failed with a timeout or an unclassified error.
    #[error("connection failed after {attempts} attempts: {last_cause}")]
    AttemptsExhausted { attempts: usize, last_cause: String },

    /// A command handler failed. Never leaves the dispatcher.
    #[error("command \"{command}\" failed: {message}")]
    DispatchHandlerError { command: String, message: String },
}

impl Error {
    /// Stable machine-readable code, used as the `code` field of HTTP errors.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidCredentialFormat => "InvalidCredentialFormat",
            Self::AttemptTimeout { .. } => "AttemptTimeout",
            Self::InvalidCredential => "InvalidCredential",
            Self::MissingPrivilege => "MissingPrivilege",
            Self::NetworkUnreachable { .. } => "NetworkUnreachable",
            Self::AttemptsExhausted { .. } => "AttemptsExhausted",
            Self::DispatchHandlerError { .. } => "DispatchHandlerError",
        }
    }

    /// Short operator-facing headline.
    #[must_use]
    pub fn headline(&self) -> &'static str {
        match self {
            Self::InvalidCredentialFormat => "Invalid token format",
            Self::AttemptTimeout { .. } | Self::AttemptsExhausted { .. } => "Connection timeout",
            Self::InvalidCredential => "Invalid bot token",
            Self::MissingPrivilege => "Missing required intents",
            Self::NetworkUnreachable { .. } => "Discord is unreachable",
            Self::DispatchHandlerError { .. } => "Command failed",
        }
    }

    /// Follow-up lines appended to the start log trail.
    #[must_use]
    pub fn hints(&self) -> &'static [&'static str] {
        match self {
            Self::InvalidCredentialFormat => &["Please check your bot token"],
            Self::InvalidCredential => &[
                "The bot token is invalid or has been regenerated",
                "Copy a fresh token from the Discord Developer Portal",
            ],
            Self::MissingPrivilege => &[
                "Enable the privileged gateway intents for this bot",
                "Developer Portal > Bot > Privileged Gateway Intents",
            ],
            Self::NetworkUnreachable { .. } => &["Check the server's network connection"],
            Self::AttemptTimeout { .. } | Self::AttemptsExhausted { .. } => &[
                "Discord did not answer in time",
                "Try again in a moment",
            ],
            Self::DispatchHandlerError { .. } => &[],
        }
    }

    /// Start error for a plan of `attempts` whose last attempt failed with
    /// `err`. Unclassified failures count as exhausting the plan.
    #[must_use]
    pub fn from_establish(err: EstablishError, attempts: usize) -> Self {
        match err {
            EstablishError::InvalidCredential => Self::InvalidCredential,
            EstablishError::MissingPrivilege => Self::MissingPrivilege,
            EstablishError::NetworkUnreachable(message) => Self::NetworkUnreachable { message },
            EstablishError::Other(last_cause) => Self::AttemptsExhausted {
                attempts,
                last_cause,
            },
        }
    }
}
