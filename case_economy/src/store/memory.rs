//! In-process store.
//!
//! A transaction takes the single state lock for its whole lifetime and
//! mutates a private copy, which replaces the shared state on commit.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{Store, StoreTx};
use crate::{
    CaseId, CodeId, ListingId, UserId,
    catalog::{Case, CaseItem},
    codes::{CodeState, CodeView, NewCode, RedeemableCode},
    errors::{EconomyError, EconomyResult},
    ledger::Account,
    market::{ListingState, ListingView, MarketListing},
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    accounts: HashMap<UserId, Account>,
    cases: HashMap<CaseId, Case>,
    items: HashMap<CaseId, Vec<CaseItem>>,
    codes: BTreeMap<CodeId, RedeemableCode>,
    code_strings: HashSet<String>,
    listings: BTreeMap<ListingId, MarketListing>,
    next_code_id: CodeId,
    next_listing_id: ListingId,
}

/// In-memory [`Store`]
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or replace an account
    pub async fn insert_account(&self, user_id: UserId, display_name: &str, balance: i64) {
        let mut state = self.state.lock().await;
        state.accounts.insert(
            user_id,
            Account {
                user_id,
                display_name: display_name.to_string(),
                balance,
                updated_at: Utc::now(),
            },
        );
    }

    /// Create or replace a case and its items. Items keep the given order.
    pub async fn insert_case(&self, case: Case, items: Vec<CaseItem>) {
        let mut state = self.state.lock().await;
        state.items.insert(case.id, items);
        state.cases.insert(case.id, case);
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> EconomyResult<Box<dyn StoreTx>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTx { guard, working }))
    }

    async fn account(&self, user_id: UserId) -> EconomyResult<Option<Account>> {
        Ok(self.state.lock().await.accounts.get(&user_id).cloned())
    }

    async fn open_listings(&self) -> EconomyResult<Vec<ListingView>> {
        let state = self.state.lock().await;
        let views = state
            .listings
            .values()
            .filter(|listing| listing.state == ListingState::Open)
            .filter_map(|listing| {
                let code = state.codes.get(&listing.code_id)?;
                let seller = state.accounts.get(&listing.seller_id)?;
                Some(ListingView {
                    listing_id: listing.id,
                    code_id: listing.code_id,
                    item_name: code.item_name.clone(),
                    seller_id: listing.seller_id,
                    seller_name: seller.display_name.clone(),
                    asking_price: listing.asking_price,
                    created_at: listing.created_at,
                })
            })
            .collect();
        Ok(views)
    }

    async fn codes_for_user(&self, user_id: UserId) -> EconomyResult<Vec<CodeView>> {
        let state = self.state.lock().await;
        // Ids grow with creation time, so reverse id order is newest first
        let views = state
            .codes
            .values()
            .rev()
            .filter(|code| code.owner_user_id == user_id)
            .filter_map(|code| {
                let case = state.cases.get(&code.case_id)?;
                let rarity = state
                    .items
                    .get(&code.case_id)
                    .and_then(|items| items.iter().find(|item| item.id == code.item_id))
                    .map(|item| item.rarity.clone());
                Some(CodeView {
                    code: code.clone(),
                    case_name: case.name.clone(),
                    case_price: case.price,
                    rarity,
                    redeem_value: None,
                })
            })
            .collect();
        Ok(views)
    }
}

/// Transaction over [`MemoryStore`]
pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

impl MemoryTx {
    fn code_mut(&mut self, code_id: CodeId) -> EconomyResult<&mut RedeemableCode> {
        self.working
            .codes
            .get_mut(&code_id)
            .ok_or(EconomyError::CodeNotFound(code_id))
    }
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn account_for_update(&mut self, user_id: UserId) -> EconomyResult<Option<Account>> {
        Ok(self.working.accounts.get(&user_id).cloned())
    }

    async fn debit(&mut self, user_id: UserId, amount: i64) -> EconomyResult<Option<i64>> {
        match self.working.accounts.get_mut(&user_id) {
            Some(account) if account.balance >= amount => {
                account.balance -= amount;
                account.updated_at = Utc::now();
                Ok(Some(account.balance))
            }
            _ => Ok(None),
        }
    }

    async fn credit(&mut self, user_id: UserId, amount: i64) -> EconomyResult<Option<i64>> {
        let Some(account) = self.working.accounts.get_mut(&user_id) else {
            return Ok(None);
        };
        account.balance = account
            .balance
            .checked_add(amount)
            .ok_or(EconomyError::BalanceOverflow(user_id))?;
        account.updated_at = Utc::now();
        Ok(Some(account.balance))
    }

    async fn find_case(&mut self, case_id: CaseId) -> EconomyResult<Option<Case>> {
        Ok(self.working.cases.get(&case_id).cloned())
    }

    async fn case_items(&mut self, case_id: CaseId) -> EconomyResult<Vec<CaseItem>> {
        Ok(self
            .working
            .items
            .get(&case_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn insert_code(&mut self, code: NewCode) -> EconomyResult<Option<RedeemableCode>> {
        if !self.working.code_strings.insert(code.code.clone()) {
            return Ok(None);
        }

        self.working.next_code_id += 1;
        let record = RedeemableCode {
            id: self.working.next_code_id,
            owner_user_id: code.owner_user_id,
            case_id: code.case_id,
            item_id: code.item_id,
            item_name: code.item_name,
            code: code.code,
            state: CodeState::Active,
            created_at: Utc::now(),
        };
        self.working.codes.insert(record.id, record.clone());
        Ok(Some(record))
    }

    async fn code_for_update(&mut self, code_id: CodeId) -> EconomyResult<Option<RedeemableCode>> {
        Ok(self.working.codes.get(&code_id).cloned())
    }

    async fn set_code_owner(&mut self, code_id: CodeId, owner: UserId) -> EconomyResult<()> {
        self.code_mut(code_id)?.owner_user_id = owner;
        Ok(())
    }

    async fn set_code_state(&mut self, code_id: CodeId, state: CodeState) -> EconomyResult<()> {
        self.code_mut(code_id)?.state = state;
        Ok(())
    }

    async fn open_listing_for_code(
        &mut self,
        code_id: CodeId,
    ) -> EconomyResult<Option<MarketListing>> {
        Ok(self
            .working
            .listings
            .values()
            .find(|listing| listing.code_id == code_id && listing.state == ListingState::Open)
            .cloned())
    }

    async fn insert_listing(
        &mut self,
        seller_id: UserId,
        code_id: CodeId,
        asking_price: i64,
    ) -> EconomyResult<MarketListing> {
        self.working.next_listing_id += 1;
        let listing = MarketListing {
            id: self.working.next_listing_id,
            seller_id,
            code_id,
            asking_price,
            state: ListingState::Open,
            buyer_id: None,
            created_at: Utc::now(),
        };
        self.working.listings.insert(listing.id, listing.clone());
        Ok(listing)
    }

    async fn listing_for_update(
        &mut self,
        listing_id: ListingId,
    ) -> EconomyResult<Option<MarketListing>> {
        Ok(self.working.listings.get(&listing_id).cloned())
    }

    async fn set_listing_state(
        &mut self,
        listing_id: ListingId,
        state: ListingState,
        buyer_id: Option<UserId>,
    ) -> EconomyResult<()> {
        let listing = self
            .working
            .listings
            .get_mut(&listing_id)
            .ok_or(EconomyError::NotAvailable(listing_id))?;
        listing.state = state;
        listing.buyer_id = buyer_id;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> EconomyResult<()> {
        let MemoryTx { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}
