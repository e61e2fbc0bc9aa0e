//! Discord sign-in for the dashboard: authorization-code exchange and role
//! resolution.

pub mod access;
pub mod client;
pub mod error;
pub mod types;

pub use {
    access::{Access, resolve_access},
    client::{DEFAULT_ORIGIN, DiscordOAuth},
    error::{Error, Result},
    types::{DiscordUser, Identity, PartialGuild},
};
