//! End-to-end flows through the economy manager on the in-memory store.
//!
//! Covers opening cases, redeeming codes, trading on the market and the
//! JSON command surface.

use case_economy::{
    Case, CaseItem, CodeState, Command, CommandOutput, EconomyConfig, EconomyError,
    EconomyManager, FixedDraw, ItemSelector, ListingState, MemoryStore,
};
use std::sync::Arc;

const ALICE: i64 = 1;
const BOB: i64 = 2;
const STARTER: i64 = 10;

fn starter_items() -> Vec<CaseItem> {
    vec![
        CaseItem {
            id: 100,
            case_id: STARTER,
            name: "Dragon Lore".to_string(),
            rarity: "covert".to_string(),
            drop_chance: 10.0,
        },
        CaseItem {
            id: 101,
            case_id: STARTER,
            name: "Sand Dune".to_string(),
            rarity: "consumer".to_string(),
            drop_chance: 90.0,
        },
    ]
}

/// Helper to build a manager whose draws always land on `draw`
async fn setup(alice_balance: i64, bob_balance: i64, draw: f64) -> EconomyManager {
    let store = MemoryStore::new();
    store.insert_account(ALICE, "alice", alice_balance).await;
    store.insert_account(BOB, "bob", bob_balance).await;
    store
        .insert_case(
            Case {
                id: STARTER,
                name: "Starter Case".to_string(),
                price: 100,
            },
            starter_items(),
        )
        .await;
    store
        .insert_case(
            Case {
                id: 11,
                name: "Empty Case".to_string(),
                price: 50,
            },
            Vec::new(),
        )
        .await;

    EconomyManager::with_selector(
        Arc::new(store),
        ItemSelector::new(FixedDraw(draw)),
        EconomyConfig::default(),
    )
}

#[tokio::test]
async fn test_open_then_redeem() {
    let economy = setup(1_000, 0, 5.0).await;

    let opening = economy.open_case(ALICE, STARTER).await.unwrap();
    assert_eq!(opening.item.name, "Dragon Lore");
    assert_eq!(opening.new_balance, 900);
    assert_eq!(opening.code.owner_user_id, ALICE);
    assert_eq!(opening.code.state, CodeState::Active);
    assert_eq!(opening.code.code.len(), 12);

    let redemption = economy.redeem(opening.code.id, ALICE).await.unwrap();
    assert_eq!(redemption.amount, 50);
    assert_eq!(redemption.new_balance, 950);
    assert_eq!(economy.account(ALICE).await.unwrap().balance, 950);

    let codes = economy.list_codes(ALICE).await.unwrap();
    assert_eq!(codes.len(), 1);
    assert_eq!(codes[0].code.state, CodeState::Consumed);
    assert_eq!(codes[0].redeem_value, None);
}

#[tokio::test]
async fn test_code_listing_shows_case_and_buy_back_value() {
    let economy = setup(1_000, 0, 50.0).await;

    let code = economy.open_case(ALICE, STARTER).await.unwrap().code;
    assert_eq!(code.item_name, "Sand Dune");

    let codes = economy.list_codes(ALICE).await.unwrap();
    assert_eq!(codes.len(), 1);
    assert_eq!(codes[0].code.id, code.id);
    assert_eq!(codes[0].case_name, "Starter Case");
    assert_eq!(codes[0].case_price, 100);
    assert_eq!(codes[0].rarity.as_deref(), Some("consumer"));
    assert_eq!(codes[0].redeem_value, Some(50));
    assert!(economy.list_codes(BOB).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_draw_past_first_item_selects_second() {
    let economy = setup(1_000, 0, 10.5).await;

    let opening = economy.open_case(ALICE, STARTER).await.unwrap();
    assert_eq!(opening.item.name, "Sand Dune");
}

#[tokio::test]
async fn test_open_with_exact_balance_reaches_zero() {
    let economy = setup(100, 0, 5.0).await;

    let opening = economy.open_case(ALICE, STARTER).await.unwrap();
    assert_eq!(opening.new_balance, 0);

    let err = economy.open_case(ALICE, STARTER).await.unwrap_err();
    assert!(matches!(
        err,
        EconomyError::InsufficientBalance {
            available: 0,
            required: 100,
            ..
        }
    ));
}

#[tokio::test]
async fn test_failed_open_leaves_no_trace() {
    let economy = setup(99, 0, 5.0).await;

    assert!(matches!(
        economy.open_case(ALICE, STARTER).await,
        Err(EconomyError::InsufficientBalance { .. })
    ));
    assert_eq!(economy.account(ALICE).await.unwrap().balance, 99);
    assert!(economy.list_codes(ALICE).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_open_errors() {
    let economy = setup(1_000, 0, 5.0).await;

    assert!(matches!(
        economy.open_case(ALICE, 404).await,
        Err(EconomyError::CaseNotFound(404))
    ));
    assert!(matches!(
        economy.open_case(77, STARTER).await,
        Err(EconomyError::UserNotFound(77))
    ));

    let err = economy.open_case(ALICE, 11).await.unwrap_err();
    assert!(matches!(err, EconomyError::EmptyCase(11)));
    assert_eq!(economy.account(ALICE).await.unwrap().balance, 1_000);
}

#[tokio::test]
async fn test_redeem_twice_fails() {
    let economy = setup(1_000, 0, 5.0).await;
    let code = economy.open_case(ALICE, STARTER).await.unwrap().code;

    economy.redeem(code.id, ALICE).await.unwrap();
    let err = economy.redeem(code.id, ALICE).await.unwrap_err();

    assert!(matches!(err, EconomyError::AlreadyConsumed(id) if id == code.id));
    assert_eq!(err.status_code(), 400);
    assert_eq!(economy.account(ALICE).await.unwrap().balance, 950);
}

#[tokio::test]
async fn test_redeem_requires_ownership() {
    let economy = setup(1_000, 0, 5.0).await;
    let code = economy.open_case(ALICE, STARTER).await.unwrap().code;

    let err = economy.redeem(code.id, BOB).await.unwrap_err();
    assert!(matches!(err, EconomyError::NotOwner { user_id: BOB, .. }));
    assert_eq!(err.status_code(), 403);

    assert!(matches!(
        economy.redeem(9_999, ALICE).await,
        Err(EconomyError::CodeNotFound(9_999))
    ));
}

#[tokio::test]
async fn test_market_trade() {
    let economy = setup(1_000, 500, 5.0).await;
    let code = economy.open_case(ALICE, STARTER).await.unwrap().code;

    let listing = economy.list_for_sale(code.id, ALICE, 300).await.unwrap();
    assert_eq!(listing.state, ListingState::Open);

    let board = economy.list_market().await.unwrap();
    assert_eq!(board.len(), 1);
    assert_eq!(board[0].seller_name, "alice");
    assert_eq!(board[0].item_name, "Dragon Lore");
    assert_eq!(board[0].asking_price, 300);

    // A listed code stays with the seller but cannot be redeemed
    assert!(matches!(
        economy.redeem(code.id, ALICE).await,
        Err(EconomyError::CodeListed(_))
    ));

    let purchase = economy.buy(listing.id, BOB).await.unwrap();
    assert_eq!(purchase.new_balance, 200);
    assert_eq!(purchase.code.owner_user_id, BOB);
    assert_eq!(purchase.listing.state, ListingState::Sold);

    assert_eq!(economy.account(ALICE).await.unwrap().balance, 1_200);
    assert_eq!(economy.account(BOB).await.unwrap().balance, 200);
    assert!(economy.list_market().await.unwrap().is_empty());

    // Ownership moved with the code
    assert!(matches!(
        economy.redeem(code.id, ALICE).await,
        Err(EconomyError::NotOwner { .. })
    ));
    let redemption = economy.redeem(code.id, BOB).await.unwrap();
    assert_eq!(redemption.new_balance, 250);
}

#[tokio::test]
async fn test_sold_listing_cannot_be_bought_again() {
    let economy = setup(1_000, 1_000, 5.0).await;
    let code = economy.open_case(ALICE, STARTER).await.unwrap().code;
    let listing = economy.list_for_sale(code.id, ALICE, 300).await.unwrap();

    economy.buy(listing.id, BOB).await.unwrap();
    assert!(matches!(
        economy.buy(listing.id, BOB).await,
        Err(EconomyError::NotAvailable(_))
    ));
    assert_eq!(economy.account(BOB).await.unwrap().balance, 700);
}

#[tokio::test]
async fn test_poor_buyer_changes_nothing() {
    let economy = setup(1_000, 299, 5.0).await;
    let code = economy.open_case(ALICE, STARTER).await.unwrap().code;
    let listing = economy.list_for_sale(code.id, ALICE, 300).await.unwrap();

    let err = economy.buy(listing.id, BOB).await.unwrap_err();
    assert!(matches!(
        err,
        EconomyError::InsufficientBalance {
            user_id: BOB,
            available: 299,
            required: 300,
        }
    ));

    assert_eq!(economy.account(ALICE).await.unwrap().balance, 900);
    assert_eq!(economy.account(BOB).await.unwrap().balance, 299);
    assert_eq!(economy.list_market().await.unwrap().len(), 1);
    assert_eq!(economy.list_codes(ALICE).await.unwrap()[0].code.id, code.id);
}

#[tokio::test]
async fn test_self_trade_rejected() {
    let economy = setup(1_000, 0, 5.0).await;
    let code = economy.open_case(ALICE, STARTER).await.unwrap().code;
    let listing = economy.list_for_sale(code.id, ALICE, 300).await.unwrap();

    assert!(matches!(
        economy.buy(listing.id, ALICE).await,
        Err(EconomyError::SelfTrade(_))
    ));
    assert_eq!(economy.account(ALICE).await.unwrap().balance, 900);
}

#[tokio::test]
async fn test_consumed_code_cannot_be_listed() {
    let economy = setup(1_000, 0, 5.0).await;
    let code = economy.open_case(ALICE, STARTER).await.unwrap().code;
    economy.redeem(code.id, ALICE).await.unwrap();

    assert!(matches!(
        economy.list_for_sale(code.id, ALICE, 300).await,
        Err(EconomyError::InvalidCode(_))
    ));
}

#[tokio::test]
async fn test_cancel_then_relist() {
    let economy = setup(1_000, 1_000, 5.0).await;
    let code = economy.open_case(ALICE, STARTER).await.unwrap().code;
    let listing = economy.list_for_sale(code.id, ALICE, 300).await.unwrap();

    assert!(matches!(
        economy.list_for_sale(code.id, ALICE, 250).await,
        Err(EconomyError::AlreadyListed(_))
    ));

    let cancelled = economy.cancel_listing(listing.id, ALICE).await.unwrap();
    assert_eq!(cancelled.state, ListingState::Cancelled);
    assert!(economy.list_market().await.unwrap().is_empty());

    let relisted = economy.list_for_sale(code.id, ALICE, 250).await.unwrap();
    assert_ne!(relisted.id, listing.id);
}

#[tokio::test]
async fn test_commands_dispatch() {
    let economy = setup(1_000, 0, 5.0).await;

    let command: Command =
        serde_json::from_str(r#"{"action":"open_case","user_id":1,"case_id":10}"#).unwrap();
    let CommandOutput::CaseOpened(opening) = economy.execute(command).await.unwrap() else {
        panic!("expected case_opened output");
    };

    let output = economy
        .execute(Command::Redeem {
            code_id: opening.code.id,
            user_id: ALICE,
        })
        .await
        .unwrap();
    assert!(matches!(output, CommandOutput::Redeemed(r) if r.new_balance == 950));

    let output = economy
        .execute(Command::Balance { user_id: ALICE })
        .await
        .unwrap();
    let json = serde_json::to_value(&output).unwrap();
    assert_eq!(json["result"], "balance");
    assert_eq!(json["data"]["balance"], 950);

    let err = economy
        .execute(Command::Balance { user_id: 404 })
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 404);
}
