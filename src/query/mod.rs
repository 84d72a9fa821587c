//! Query coordination
//!
//! Fans a query out to the lexical and semantic retrievers, enforces the
//! per-call timeout and cancellation, and fuses the results.

mod coordinator;
mod error;
mod executor;

pub use coordinator::*;
pub use error::*;
pub use executor::*;
