//! Read-only catalog of cases and their weighted items.
//!
//! The catalog is maintained elsewhere; operations here only read a
//! snapshot of it and draw from the item list with [`ItemSelector`].

pub mod models;
pub mod selector;

pub use models::{Case, CaseItem};
pub use selector::{DrawSource, FixedDraw, ItemSelector, RngDraw};
