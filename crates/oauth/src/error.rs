use botdeck_common::BoxedSource;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Client id or secret missing from the configuration.
    #[error("Discord credentials not configured: missing {missing}")]
    NotConfigured { missing: &'static str },

    /// The token endpoint rejected the authorization code.
    #[error("Failed to get access token (HTTP {status})")]
    TokenExchange {
        status: u16,
        details: serde_json::Value,
    },

    /// `/users/@me` failed after a successful exchange.
    #[error("Failed to get user data (HTTP {status})")]
    UserLookup {
        status: u16,
        details: serde_json::Value,
    },

    #[error("{message}")]
    Message { message: String },

    #[error("{context}: {source}")]
    External {
        context: String,
        #[source]
        source: BoxedSource,
    },

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Provider response body attached to HTTP failures, if any.
    #[must_use]
    pub fn details(&self) -> Option<&serde_json::Value> {
        match self {
            Self::TokenExchange { details, .. } | Self::UserLookup { details, .. } => Some(details),
            _ => None,
        }
    }
}

impl botdeck_common::FromContext for Error {
    fn from_context(context: String, source: Option<BoxedSource>) -> Self {
        match source {
            Some(source) => Self::External { context, source },
            None => Self::Message { message: context },
        }
    }
}

botdeck_common::impl_context!();
