//! Error context plumbing and small utilities shared by the botdeck crates.

pub mod error;
pub mod time;

pub use error::{BoxedSource, FromContext};
