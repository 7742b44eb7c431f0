//! Peer-to-peer marketplace for redeemable codes.
//!
//! A listing is an offer to sell one active code at a fixed price. A
//! purchase moves the price from buyer to seller, hands the code to the
//! buyer and closes the listing, all inside the caller's transaction.

pub mod exchange;
pub mod models;

pub use exchange::{Purchase, buy, cancel_listing, list_for_sale};
pub use models::{ListingState, ListingView, MarketListing};
