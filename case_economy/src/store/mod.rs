//! Store abstraction over the durable state.
//!
//! Every multi-step operation runs inside one [`StoreTx`]. Mutations become
//! visible only after [`StoreTx::commit`]; dropping the transaction instead
//! rolls all of them back, which is also what happens when a request future
//! is cancelled mid-operation.
//!
//! Two implementations are provided:
//! - [`PgStore`]: PostgreSQL via sqlx, with row locks
//! - [`MemoryStore`]: in-process, one transaction at a time

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;

use crate::{
    CaseId, CodeId, ListingId, UserId,
    catalog::{Case, CaseItem},
    codes::{CodeState, CodeView, NewCode, RedeemableCode},
    errors::EconomyResult,
    ledger::Account,
    market::{ListingState, ListingView, MarketListing},
};

/// Durable state shared by all requests
#[async_trait]
pub trait Store: Send + Sync {
    /// Start a transaction
    async fn begin(&self) -> EconomyResult<Box<dyn StoreTx>>;

    /// Read an account outside of any transaction
    async fn account(&self, user_id: UserId) -> EconomyResult<Option<Account>>;

    /// All open listings with seller display names, oldest first
    async fn open_listings(&self) -> EconomyResult<Vec<ListingView>>;

    /// Codes currently owned by a user with their case name, price and item
    /// rarity, newest first
    async fn codes_for_user(&self, user_id: UserId) -> EconomyResult<Vec<CodeView>>;
}

/// Transaction-scoped primitives
#[async_trait]
pub trait StoreTx: Send {
    /// Read and lock an account
    async fn account_for_update(&mut self, user_id: UserId) -> EconomyResult<Option<Account>>;

    /// Subtract `amount` if the balance covers it; `None` when the account is
    /// missing or the balance is too low
    async fn debit(&mut self, user_id: UserId, amount: i64) -> EconomyResult<Option<i64>>;

    /// Add `amount`; `None` when the account is missing
    async fn credit(&mut self, user_id: UserId, amount: i64) -> EconomyResult<Option<i64>>;

    /// Look up a case
    async fn find_case(&mut self, case_id: CaseId) -> EconomyResult<Option<Case>>;

    /// Items of a case in ascending item id order
    async fn case_items(&mut self, case_id: CaseId) -> EconomyResult<Vec<CaseItem>>;

    /// Insert an active code; `None` if the code string is already taken
    async fn insert_code(&mut self, code: NewCode) -> EconomyResult<Option<RedeemableCode>>;

    /// Read and lock a code
    async fn code_for_update(&mut self, code_id: CodeId) -> EconomyResult<Option<RedeemableCode>>;

    /// Reassign a code
    async fn set_code_owner(&mut self, code_id: CodeId, owner: UserId) -> EconomyResult<()>;

    /// Change a code's lifecycle state
    async fn set_code_state(&mut self, code_id: CodeId, state: CodeState) -> EconomyResult<()>;

    /// The open listing for a code, if any
    ///
    /// Does not lock the listing. Call it with the code row already locked
    /// through [`StoreTx::code_for_update`].
    async fn open_listing_for_code(
        &mut self,
        code_id: CodeId,
    ) -> EconomyResult<Option<MarketListing>>;

    /// Insert an open listing
    async fn insert_listing(
        &mut self,
        seller_id: UserId,
        code_id: CodeId,
        asking_price: i64,
    ) -> EconomyResult<MarketListing>;

    /// Read and lock a listing
    async fn listing_for_update(
        &mut self,
        listing_id: ListingId,
    ) -> EconomyResult<Option<MarketListing>>;

    /// Close a listing, recording the buyer for sales
    async fn set_listing_state(
        &mut self,
        listing_id: ListingId,
        state: ListingState,
        buyer_id: Option<UserId>,
    ) -> EconomyResult<()>;

    /// Make every mutation of this transaction durable
    async fn commit(self: Box<Self>) -> EconomyResult<()>;
}
