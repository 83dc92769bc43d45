//! Shared domain types for the Taleify engine.
//!
//! Holds the error taxonomy, identifier aliases, the page state machine,
//! prompt rendering and request validation helpers. Nothing in here performs
//! I/O, so every other crate in the workspace can depend on it.

pub mod error;
pub mod page;
pub mod prompt;
pub mod types;
pub mod validation;
