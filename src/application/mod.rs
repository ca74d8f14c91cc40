//! Application layer with the session orchestrator, its services and use cases.

/// Data transfer objects.
pub mod dto;
/// Session change notifications.
pub mod events;
/// Synchronization services.
pub mod services;
/// Session orchestrator.
pub mod session;
/// Use case implementations.
pub mod use_cases;

pub use dto::TokenSource;
pub use events::SessionEvent;
pub use session::{ChatSession, SessionSettings};
pub use use_cases::{ResolveTokenUseCase, ResolvedToken};
