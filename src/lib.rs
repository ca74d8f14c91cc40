//! chat-sync - client-side synchronization engine for the complaint chat server.
//!
//! Keeps an operator's conversation list and open conversation fresh by
//! polling through a short-lived response cache, detects newly arrived
//! citizen messages, raises in-app and desktop notifications, and sends
//! replies with confirm-then-append semantics.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Application layer containing the session orchestrator and its services.
pub mod application;
/// Domain layer containing entities, errors, and port definitions.
pub mod domain;
/// Infrastructure layer containing adapters for external services.
pub mod infrastructure;

/// Current version of the application.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name.
pub const NAME: &str = "chat-sync";
