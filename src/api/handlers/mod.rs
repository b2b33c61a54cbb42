//! Request handlers for the HTTP surface.

/// Health check handler.
pub mod health;
/// Research session handlers (start, abort).
pub mod research;
