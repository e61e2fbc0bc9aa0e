//! Discord gateway client built on serenity.
//!
//! Exposed to the rest of the workspace only as a
//! [`botdeck_channels::GatewayConnector`]; serenity types stay inside.

mod connection;
mod handler;
mod state;

pub use connection::{DiscordConnection, DiscordConnector, MAX_MESSAGE_LEN, classify, intents};
