//! HTTP handlers, one module per resource.
//!
//! Handlers pick the extractors and the authorization gate, then hand off to the
//! matching `services` module. Each carries its `#[utoipa::path]` so the OpenAPI
//! document stays next to the code it describes.

pub mod auth;
pub mod careers;
pub mod categories;
pub mod dashboard;
pub mod health;
pub mod media;
pub mod portfolio;
pub mod posts;
pub mod tags;
pub mod users;
