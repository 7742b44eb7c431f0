//! Redeemable codes: minting, ownership transfer and consumption.
//!
//! A code starts `Active`, may change owner any number of times while
//! active, and becomes `Consumed` exactly once.

pub mod issuer;
pub mod models;

pub use issuer::{CODE_ALPHABET, MIN_CODE_LENGTH, consume, generate_code, issue, transfer};
pub use models::{CodeState, CodeView, NewCode, RedeemableCode};
