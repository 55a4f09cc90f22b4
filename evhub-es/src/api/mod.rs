//! HTTP API handlers for evhub-es

pub mod auth;
pub mod events;
pub mod health;
pub mod sse;

pub use events::event_routes;
pub use health::health_routes;
pub use sse::event_stream;
