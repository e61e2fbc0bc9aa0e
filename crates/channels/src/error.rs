use botdeck_common::BoxedSource;

/// Crate-wide result type for gateway connection operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Runtime errors of an established connection (sending, probing).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input payload or parameter is invalid.
    #[error("invalid gateway input: {message}")]
    InvalidInput { message: String },

    /// The connection is not (or no longer) able to serve the request.
    #[error("gateway operation unavailable: {message}")]
    Unavailable { message: String },

    /// Wrapped source error from an external dependency.
    #[error("gateway operation failed: {context}: {source}")]
    External {
        context: String,
        #[source]
        source: BoxedSource,
    },

    /// JSON (de)serialization failed.
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

impl Error {
    #[must_use]
    pub fn invalid_input(message: impl std::fmt::Display) -> Self {
        Self::InvalidInput {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn unavailable(message: impl std::fmt::Display) -> Self {
        Self::Unavailable {
            message: message.to_string(),
        }
    }
}

/// A missing value reads as the connection being unable to serve the request.
impl botdeck_common::FromContext for Error {
    fn from_context(context: String, source: Option<BoxedSource>) -> Self {
        match source {
            Some(source) => Self::External { context, source },
            None => Self::Unavailable { message: context },
        }
    }
}

botdeck_common::impl_context!();

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_result_becomes_external() {
        let err = serde_json::from_str::<u32>("x")
            .context("decode reply")
            .unwrap_err();
        assert!(matches!(&err, Error::External { context, .. } if context == "decode reply"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn missing_value_is_unavailable() {
        let err = None::<u8>.context("no session").unwrap_err();
        assert!(matches!(err, Error::Unavailable { message } if message == "no session"));
    }
}
