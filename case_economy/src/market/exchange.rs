//! Listing and purchase steps.

use serde::{Deserialize, Serialize};

use super::models::{ListingState, MarketListing};
use crate::{
    CodeId, ListingId, UserId,
    codes::{self, RedeemableCode},
    errors::{EconomyError, EconomyResult},
    ledger,
    store::StoreTx,
};

/// Outcome of a purchase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Purchase {
    pub listing: MarketListing,
    pub code: RedeemableCode,
    /// Buyer balance after paying
    pub new_balance: i64,
}

/// Offer a code for sale
///
/// # Arguments
///
/// * `tx` - Open store transaction
/// * `code_id` - Code to sell
/// * `seller_id` - Current owner of the code
/// * `price` - Asking price in cents
///
/// # Errors
///
/// * `EconomyError::InvalidAmount` - Price not positive
/// * `EconomyError::InvalidCode` - Code missing, consumed, or owned by someone else
/// * `EconomyError::AlreadyListed` - Code already has an open listing
pub async fn list_for_sale(
    tx: &mut dyn StoreTx,
    code_id: CodeId,
    seller_id: UserId,
    price: i64,
) -> EconomyResult<MarketListing> {
    if price <= 0 {
        return Err(EconomyError::InvalidAmount(price));
    }

    match tx.code_for_update(code_id).await? {
        Some(code) if code.owner_user_id == seller_id && code.state.is_transferable() => {}
        _ => return Err(EconomyError::InvalidCode(code_id)),
    }

    if tx.open_listing_for_code(code_id).await?.is_some() {
        return Err(EconomyError::AlreadyListed(code_id));
    }

    tx.insert_listing(seller_id, code_id, price).await
}

/// Buy an open listing
///
/// Debits the buyer, credits the seller, transfers the code and marks the
/// listing sold. Rows are locked listing first, then code, then both
/// accounts in ascending id order.
///
/// # Errors
///
/// * `EconomyError::NotAvailable` - Listing missing or not open
/// * `EconomyError::SelfTrade` - Buyer is the seller
/// * `EconomyError::InsufficientBalance` - Buyer cannot pay
pub async fn buy(
    tx: &mut dyn StoreTx,
    listing_id: ListingId,
    buyer_id: UserId,
) -> EconomyResult<Purchase> {
    let mut listing = tx
        .listing_for_update(listing_id)
        .await?
        .ok_or(EconomyError::NotAvailable(listing_id))?;

    if listing.state != ListingState::Open {
        return Err(EconomyError::NotAvailable(listing_id));
    }

    if listing.seller_id == buyer_id {
        return Err(EconomyError::SelfTrade(listing_id));
    }

    match tx.code_for_update(listing.code_id).await? {
        Some(code) if code.owner_user_id == listing.seller_id => {}
        _ => return Err(EconomyError::NotAvailable(listing_id)),
    }

    let (first, second) = if buyer_id < listing.seller_id {
        (buyer_id, listing.seller_id)
    } else {
        (listing.seller_id, buyer_id)
    };
    for user_id in [first, second] {
        if tx.account_for_update(user_id).await?.is_none() {
            return Err(EconomyError::UserNotFound(user_id));
        }
    }

    let new_balance = ledger::debit(tx, buyer_id, listing.asking_price).await?;
    ledger::credit(tx, listing.seller_id, listing.asking_price).await?;
    let code = codes::transfer(tx, listing.code_id, buyer_id).await?;

    let next = listing.state.close(listing_id, ListingState::Sold)?;
    tx.set_listing_state(listing_id, next, Some(buyer_id)).await?;
    listing.state = next;
    listing.buyer_id = Some(buyer_id);

    Ok(Purchase {
        listing,
        code,
        new_balance,
    })
}

/// Withdraw an open listing
///
/// # Errors
///
/// * `EconomyError::NotAvailable` - Listing missing or not open
/// * `EconomyError::NotOwner` - Caller is not the seller
pub async fn cancel_listing(
    tx: &mut dyn StoreTx,
    listing_id: ListingId,
    seller_id: UserId,
) -> EconomyResult<MarketListing> {
    let mut listing = tx
        .listing_for_update(listing_id)
        .await?
        .ok_or(EconomyError::NotAvailable(listing_id))?;

    if listing.seller_id != seller_id {
        return Err(EconomyError::NotOwner {
            user_id: seller_id,
            resource: format!("listing {listing_id}"),
        });
    }

    let next = listing.state.close(listing_id, ListingState::Cancelled)?;
    tx.set_listing_state(listing_id, next, None).await?;
    listing.state = next;
    Ok(listing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        catalog::CaseItem,
        codes::CodeState,
        store::{MemoryStore, Store},
    };

    async fn setup() -> (MemoryStore, RedeemableCode) {
        let store = MemoryStore::new();
        store.insert_account(1, "seller", 0).await;
        store.insert_account(2, "buyer", 1_000).await;

        let item = CaseItem {
            id: 5,
            case_id: 1,
            name: "Combat Knife".to_string(),
            rarity: "rare".to_string(),
            drop_chance: 1.0,
        };
        let mut tx = store.begin().await.unwrap();
        let code = codes::issue(tx.as_mut(), 1, 1, &item, 12).await.unwrap();
        tx.commit().await.unwrap();
        (store, code)
    }

    #[tokio::test]
    async fn test_buy_moves_money_and_code() {
        let (store, code) = setup().await;
        let mut tx = store.begin().await.unwrap();

        let listing = list_for_sale(tx.as_mut(), code.id, 1, 400).await.unwrap();
        let purchase = buy(tx.as_mut(), listing.id, 2).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(purchase.new_balance, 600);
        assert_eq!(purchase.code.owner_user_id, 2);
        assert_eq!(purchase.code.state, CodeState::Active);
        assert_eq!(purchase.listing.state, ListingState::Sold);
        assert_eq!(purchase.listing.buyer_id, Some(2));

        assert_eq!(store.account(1).await.unwrap().unwrap().balance, 400);
        assert_eq!(store.account(2).await.unwrap().unwrap().balance, 600);
    }

    #[tokio::test]
    async fn test_list_rejects_non_owner_and_bad_price() {
        let (store, code) = setup().await;
        let mut tx = store.begin().await.unwrap();

        assert!(matches!(
            list_for_sale(tx.as_mut(), code.id, 2, 100).await,
            Err(EconomyError::InvalidCode(_))
        ));
        assert!(matches!(
            list_for_sale(tx.as_mut(), code.id, 1, 0).await,
            Err(EconomyError::InvalidAmount(0))
        ));
        assert!(matches!(
            list_for_sale(tx.as_mut(), 404, 1, 100).await,
            Err(EconomyError::InvalidCode(404))
        ));
    }

    #[tokio::test]
    async fn test_cannot_list_twice() {
        let (store, code) = setup().await;
        let mut tx = store.begin().await.unwrap();

        list_for_sale(tx.as_mut(), code.id, 1, 100).await.unwrap();
        assert!(matches!(
            list_for_sale(tx.as_mut(), code.id, 1, 200).await,
            Err(EconomyError::AlreadyListed(_))
        ));
    }

    #[tokio::test]
    async fn test_self_trade_rejected() {
        let (store, code) = setup().await;
        let mut tx = store.begin().await.unwrap();

        let listing = list_for_sale(tx.as_mut(), code.id, 1, 100).await.unwrap();
        assert!(matches!(
            buy(tx.as_mut(), listing.id, 1).await,
            Err(EconomyError::SelfTrade(_))
        ));
    }

    #[tokio::test]
    async fn test_buy_unknown_listing() {
        let (store, _code) = setup().await;
        let mut tx = store.begin().await.unwrap();

        assert!(matches!(
            buy(tx.as_mut(), 77, 2).await,
            Err(EconomyError::NotAvailable(77))
        ));
    }

    #[tokio::test]
    async fn test_cancelled_listing_not_available() {
        let (store, code) = setup().await;
        let mut tx = store.begin().await.unwrap();

        let listing = list_for_sale(tx.as_mut(), code.id, 1, 100).await.unwrap();
        assert!(matches!(
            cancel_listing(tx.as_mut(), listing.id, 2).await,
            Err(EconomyError::NotOwner { .. })
        ));

        let cancelled = cancel_listing(tx.as_mut(), listing.id, 1).await.unwrap();
        assert_eq!(cancelled.state, ListingState::Cancelled);

        assert!(matches!(
            buy(tx.as_mut(), listing.id, 2).await,
            Err(EconomyError::NotAvailable(_))
        ));

        // The code can be listed again once the old listing is closed
        list_for_sale(tx.as_mut(), code.id, 1, 150).await.unwrap();
    }
}
