//! Use case implementations.

mod resolve_token_use_case;

pub use resolve_token_use_case::{ResolveTokenUseCase, ResolvedToken};
