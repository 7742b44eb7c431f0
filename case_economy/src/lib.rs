//! # Case Economy
//!
//! A virtual-goods economy: users spend balance to open cases, receive a
//! randomly drawn item as a redeemable code, and either sell the code back
//! to the house or trade it with other users on a marketplace.
//!
//! Every balance change, code state change and listing change happens
//! inside a single store transaction, so a failed or cancelled request
//! leaves no partial effects behind.
//!
//! ## Core Modules
//!
//! - [`catalog`]: Cases, their items and the weighted [`ItemSelector`]
//! - [`codes`]: Minting, transferring and consuming redeemable codes
//! - [`ledger`]: Account balances
//! - [`market`]: Listings and the atomic buy
//! - [`opening`] / [`redemption`]: Case opening and house buy-back
//! - [`economy`]: [`EconomyManager`], the transactional entry point
//! - [`store`]: Persistence behind [`Store`], backed by PostgreSQL or memory
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use case_economy::{
//!     Case, CaseItem, EconomyConfig, EconomyManager, FixedDraw, ItemSelector, MemoryStore,
//! };
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), case_economy::EconomyError> {
//! let store = MemoryStore::new();
//! store.insert_account(1, "alice", 1_000).await;
//! store
//!     .insert_case(
//!         Case { id: 1, name: "Starter".into(), price: 100 },
//!         vec![CaseItem {
//!             id: 1,
//!             case_id: 1,
//!             name: "Sticker".into(),
//!             rarity: "common".into(),
//!             drop_chance: 1.0,
//!         }],
//!     )
//!     .await;
//!
//! let economy = EconomyManager::with_selector(
//!     Arc::new(store),
//!     ItemSelector::new(FixedDraw(0.5)),
//!     EconomyConfig::default(),
//! );
//! let opening = economy.open_case(1, 1).await?;
//! assert_eq!(opening.new_balance, 900);
//! # Ok(())
//! # }
//! ```

/// Account identifier
pub type UserId = i64;
/// Case identifier
pub type CaseId = i64;
/// Case item identifier
pub type ItemId = i64;
/// Redeemable code identifier
pub type CodeId = i64;
/// Market listing identifier
pub type ListingId = i64;

pub mod catalog;
pub mod codes;
pub mod config;
pub mod db;
pub mod economy;
pub mod errors;
pub mod ledger;
pub mod market;
pub mod opening;
pub mod redemption;
pub mod store;

pub use catalog::{Case, CaseItem, DrawSource, FixedDraw, ItemSelector, RngDraw};
pub use codes::{CodeState, CodeView, RedeemableCode};
pub use config::EconomyConfig;
pub use economy::{Command, CommandOutput, EconomyManager};
pub use errors::{EconomyError, EconomyResult, ErrorCategory};
pub use ledger::Account;
pub use market::{ListingState, ListingView, MarketListing, Purchase};
pub use opening::CaseOpening;
pub use redemption::{Redemption, sell_price};
pub use store::{MemoryStore, PgStore, Store, StoreTx};
