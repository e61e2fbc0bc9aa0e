use crate::error::{Error, Result};

/// Syntactic check of a bot token: non-empty, ASCII alphanumerics plus
/// `.`, `_` and `-`. Makes no network call.
pub fn validate_credential(raw: &str) -> Result<()> {
    let well_formed = !raw.is_empty()
        && raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if well_formed {
        Ok(())
    } else {
        Err(Error::InvalidCredentialFormat)
    }
}
