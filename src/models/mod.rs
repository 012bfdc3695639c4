//! Row types, request payloads and response shapes.
//!
//! Rows mirror the Postgres columns (snake_case on the wire); request payloads and
//! composed responses use camelCase like the admin SPA that consumes them.

pub mod blog;
pub mod career;
pub mod common;
pub mod dashboard;
pub mod media;
pub mod portfolio;
pub mod taxonomy;
pub mod user;

pub use blog::*;
pub use career::*;
pub use common::*;
pub use dashboard::*;
pub use media::*;
pub use portfolio::*;
pub use taxonomy::*;
pub use user::*;
