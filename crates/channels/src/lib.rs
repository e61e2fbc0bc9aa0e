//! Messaging gateway abstraction and dashboard collaborators.
//!
//! A gateway client (Discord, or a scripted fake in tests) implements
//! [`GatewayConnector`] / [`GatewayConnection`]. The lifecycle supervisor only
//! ever talks to these traits. The stores hold the users, commands and bot
//! settings the dashboard edits.

pub mod connection;
pub mod error;
pub mod permissions;
pub mod store;

pub use {
    connection::{
        BotUser, ConnectOptions, ConnectionSnapshot, EstablishError, EventHub, GatewayConnection,
        GatewayConnector, GatewayEvent, InboundMessage, MessageAuthor, OutboundReply,
        Subscription,
    },
    error::{Error, Result},
    permissions::{PERMISSIONS, Permission, PermissionCategory, Role},
    store::{
        BotConfigStore, CommandDefinition, CommandStore, MemoryBotConfigStore, MemoryCommandStore,
        MemoryUserStore, StoredBotConfig, StoredUser, UserStore,
    },
};
