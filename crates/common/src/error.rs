//! `.context()` for crate error types.
//!
//! Each crate keeps its own `thiserror` enum. Implementing [`FromContext`]
//! and invoking [`impl_context!`] next to it gives that crate a local
//! `Context` trait, so call sites can write
//! `resp.json().await.context("decode token response")?` and keep the
//! underlying error as the source.

use std::error::Error as StdError;

/// Boxed source error carried by a context failure.
pub type BoxedSource = Box<dyn StdError + Send + Sync>;

/// Builds a crate error from a context message and, for failed `Result`s,
/// the error it wraps. `source` is `None` when an `Option` was empty.
pub trait FromContext: Sized {
    fn from_context(context: String, source: Option<BoxedSource>) -> Self;
}

/// Generate a crate-local `Context` trait over `Result` and `Option`.
///
/// Expects `Error: FromContext` and `type Result<T>` in scope.
///
/// ```ignore
/// // in crates/foo/src/error.rs
/// botdeck_common::impl_context!();
/// ```
#[macro_export]
macro_rules! impl_context {
    () => {
        pub trait Context<T> {
            fn context(self, context: impl Into<String>) -> Result<T>;

            fn with_context<C, F>(self, f: F) -> Result<T>
            where
                C: Into<String>,
                F: FnOnce() -> C;
        }

        impl<T, E> Context<T> for std::result::Result<T, E>
        where
            E: std::error::Error + Send + Sync + 'static,
        {
            fn context(self, context: impl Into<String>) -> Result<T> {
                self.map_err(|source| {
                    <Error as $crate::FromContext>::from_context(
                        context.into(),
                        Some(Box::new(source)),
                    )
                })
            }

            fn with_context<C, F>(self, f: F) -> Result<T>
            where
                C: Into<String>,
                F: FnOnce() -> C,
            {
                self.map_err(|source| {
                    <Error as $crate::FromContext>::from_context(f().into(), Some(Box::new(source)))
                })
            }
        }

        impl<T> Context<T> for Option<T> {
            fn context(self, context: impl Into<String>) -> Result<T> {
                self.ok_or_else(|| {
                    <Error as $crate::FromContext>::from_context(context.into(), None)
                })
            }

            fn with_context<C, F>(self, f: F) -> Result<T>
            where
                C: Into<String>,
                F: FnOnce() -> C,
            {
                self.ok_or_else(|| <Error as $crate::FromContext>::from_context(f().into(), None))
            }
        }
    };
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    mod local {
        use crate::{BoxedSource, FromContext};

        #[derive(Debug, thiserror::Error)]
        pub enum Error {
            #[error("{0}")]
            Missing(String),

            #[error("{context}: {source}")]
            Wrapped {
                context: String,
                #[source]
                source: BoxedSource,
            },
        }

        impl FromContext for Error {
            fn from_context(context: String, source: Option<BoxedSource>) -> Self {
                match source {
                    Some(source) => Self::Wrapped { context, source },
                    None => Self::Missing(context),
                }
            }
        }

        pub type Result<T> = std::result::Result<T, Error>;

        crate::impl_context!();

        pub fn parse_port(raw: &str) -> Result<u16> {
            raw.parse::<u16>().context("invalid port")
        }

        pub fn first_char(raw: &str) -> Result<char> {
            raw.chars().next().with_context(|| format!("empty input '{raw}'"))
        }
    }

    #[test]
    fn result_context_keeps_the_source() {
        let err = local::parse_port("nope").unwrap_err();
        assert!(err.to_string().starts_with("invalid port: "));
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "invalid digit found in string");
    }

    #[test]
    fn option_context_has_no_source() {
        let err = local::first_char("").unwrap_err();
        assert_eq!(err.to_string(), "empty input ''");
        assert!(std::error::Error::source(&err).is_none());
        assert_eq!(local::first_char("abc").unwrap(), 'a');
    }
}
