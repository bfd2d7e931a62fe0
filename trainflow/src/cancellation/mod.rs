//! Cooperative cancellation between pipeline stages.

mod token;

pub use token::CancellationToken;
