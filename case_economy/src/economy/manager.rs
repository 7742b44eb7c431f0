//! Economy manager: runs each operation as one store transaction.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::{
    CaseId, CodeId, ListingId, UserId,
    catalog::ItemSelector,
    codes::{CodeState, CodeView},
    config::EconomyConfig,
    db::timeouts::with_timeout,
    errors::{EconomyError, EconomyResult},
    ledger::Account,
    market::{self, ListingView, MarketListing, Purchase},
    opening::{self, CaseOpening},
    redemption::{self, Redemption, sell_price},
    store::{Store, StoreTx},
};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Entry point for the case economy
#[derive(Clone)]
pub struct EconomyManager {
    store: Arc<dyn Store>,
    selector: Arc<ItemSelector>,
    config: EconomyConfig,
}

impl EconomyManager {
    /// Create a manager drawing items from an OS-seeded generator
    ///
    /// # Arguments
    ///
    /// * `store` - Durable state
    /// * `config` - Economy configuration
    pub fn new(store: Arc<dyn Store>, config: EconomyConfig) -> Self {
        Self::with_selector(store, ItemSelector::default(), config)
    }

    /// Create a manager with an explicit item selector
    pub fn with_selector(
        store: Arc<dyn Store>,
        selector: ItemSelector,
        config: EconomyConfig,
    ) -> Self {
        Self {
            store,
            selector: Arc::new(selector),
            config,
        }
    }

    /// Active configuration
    pub fn config(&self) -> &EconomyConfig {
        &self.config
    }

    /// Open a case, returning the drawn item, its code and the new balance
    ///
    /// # Errors
    ///
    /// * `EconomyError::UserNotFound` / `EconomyError::CaseNotFound`
    /// * `EconomyError::InsufficientBalance` - Balance below the case price
    /// * `EconomyError::EmptyCase` - Case has no items
    pub async fn open_case(&self, user_id: UserId, case_id: CaseId) -> EconomyResult<CaseOpening> {
        let selector = self.selector.clone();
        let code_length = self.config.code_length;

        let opening = self
            .run_in_transaction("open_case", move |tx| {
                let selector = selector.clone();
                Box::pin(async move {
                    opening::open_case(tx, &selector, user_id, case_id, code_length).await
                })
            })
            .await?;

        log::info!(
            "User {} opened case {} and won item {} (code {}), balance now {}",
            user_id,
            case_id,
            opening.item.id,
            opening.code.id,
            opening.new_balance
        );
        Ok(opening)
    }

    /// Sell a code back to the house
    ///
    /// # Errors
    ///
    /// * `EconomyError::CodeNotFound` - No such code
    /// * `EconomyError::NotOwner` - Code belongs to someone else
    /// * `EconomyError::AlreadyConsumed` - Code was redeemed before
    /// * `EconomyError::CodeListed` - Code has an open market listing
    pub async fn redeem(&self, code_id: CodeId, user_id: UserId) -> EconomyResult<Redemption> {
        let sell_rate_bps = self.config.sell_rate_bps;

        let redemption = self
            .run_in_transaction("redeem", move |tx| {
                Box::pin(redemption::redeem(tx, code_id, user_id, sell_rate_bps))
            })
            .await?;

        log::info!(
            "User {} redeemed code {} for {}, balance now {}",
            user_id,
            code_id,
            redemption.amount,
            redemption.new_balance
        );
        Ok(redemption)
    }

    /// List a code on the market
    ///
    /// # Errors
    ///
    /// * `EconomyError::InvalidAmount` - Price not positive
    /// * `EconomyError::InvalidCode` - Code missing, consumed, or not the seller's
    /// * `EconomyError::AlreadyListed` - Code already has an open listing
    pub async fn list_for_sale(
        &self,
        code_id: CodeId,
        seller_id: UserId,
        price: i64,
    ) -> EconomyResult<MarketListing> {
        if price <= 0 {
            return Err(EconomyError::InvalidAmount(price));
        }

        let listing = self
            .run_in_transaction("list_for_sale", move |tx| {
                Box::pin(market::list_for_sale(tx, code_id, seller_id, price))
            })
            .await?;

        log::info!(
            "User {} listed code {} for {} (listing {})",
            seller_id,
            code_id,
            price,
            listing.id
        );
        Ok(listing)
    }

    /// Buy an open listing
    ///
    /// # Errors
    ///
    /// * `EconomyError::NotAvailable` - Listing missing or not open
    /// * `EconomyError::SelfTrade` - Buyer is the seller
    /// * `EconomyError::InsufficientBalance` - Buyer cannot pay
    pub async fn buy(&self, listing_id: ListingId, buyer_id: UserId) -> EconomyResult<Purchase> {
        let purchase = self
            .run_in_transaction("buy", move |tx| {
                Box::pin(market::buy(tx, listing_id, buyer_id))
            })
            .await?;

        log::info!(
            "User {} bought code {} from user {} for {} (listing {})",
            buyer_id,
            purchase.code.id,
            purchase.listing.seller_id,
            purchase.listing.asking_price,
            listing_id
        );
        Ok(purchase)
    }

    /// Withdraw an open listing
    pub async fn cancel_listing(
        &self,
        listing_id: ListingId,
        seller_id: UserId,
    ) -> EconomyResult<MarketListing> {
        let listing = self
            .run_in_transaction("cancel_listing", move |tx| {
                Box::pin(market::cancel_listing(tx, listing_id, seller_id))
            })
            .await?;

        log::info!("User {seller_id} cancelled listing {listing_id}");
        Ok(listing)
    }

    /// Open listings with seller display names
    pub async fn list_market(&self) -> EconomyResult<Vec<ListingView>> {
        with_timeout(self.config.tx_timeout, self.store.open_listings()).await
    }

    /// A user's codes, newest first, with the buy-back value of each active code
    pub async fn list_codes(&self, user_id: UserId) -> EconomyResult<Vec<CodeView>> {
        let mut codes =
            with_timeout(self.config.tx_timeout, self.store.codes_for_user(user_id)).await?;

        for view in &mut codes {
            if view.code.state == CodeState::Active {
                view.redeem_value = Some(sell_price(view.case_price, self.config.sell_rate_bps)?);
            }
        }
        Ok(codes)
    }

    /// Current account state
    ///
    /// # Errors
    ///
    /// * `EconomyError::UserNotFound` - No such account
    pub async fn account(&self, user_id: UserId) -> EconomyResult<Account> {
        with_timeout(self.config.tx_timeout, self.store.account(user_id))
            .await?
            .ok_or(EconomyError::UserNotFound(user_id))
    }

    /// Run `op` inside a fresh transaction, committing on success.
    ///
    /// Serialization failures and deadlocks are retried up to
    /// `max_tx_retries` times; every other error is returned as is. Each
    /// attempt runs under `tx_timeout`.
    async fn run_in_transaction<T, F>(&self, operation: &'static str, op: F) -> EconomyResult<T>
    where
        T: Send,
        F: for<'t> Fn(&'t mut dyn StoreTx) -> BoxFuture<'t, EconomyResult<T>> + Send + Sync,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;

            let result = with_timeout(self.config.tx_timeout, async {
                let mut tx = self.store.begin().await?;
                let value = op(&mut *tx).await?;
                tx.commit().await?;
                Ok(value)
            })
            .await;

            match result {
                Err(err) if err.is_transient() && attempt <= self.config.max_tx_retries => {
                    log::warn!("{operation}: transient failure on attempt {attempt}, retrying: {err}");
                }
                Err(err) if err.is_transient() => {
                    log::error!("{operation}: giving up after {attempt} attempts: {err}");
                    return Err(EconomyError::TransactionFailed(format!(
                        "{operation} aborted after {attempt} attempts"
                    )));
                }
                other => return other,
            }
        }
    }
}
