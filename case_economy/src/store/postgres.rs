//! PostgreSQL store.
#![allow(clippy::needless_raw_string_hashes)]

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};

use super::{Store, StoreTx};
use crate::{
    CaseId, CodeId, ListingId, UserId,
    catalog::{Case, CaseItem},
    codes::{CodeState, CodeView, NewCode, RedeemableCode},
    errors::{EconomyError, EconomyResult, SQLSTATE_NUMERIC_OUT_OF_RANGE},
    ledger::Account,
    market::{ListingState, ListingView, MarketListing},
};

const CODE_COLUMNS: &str =
    "id, owner_user_id, case_id, item_id, item_name, code, state, created_at";

const LISTING_COLUMNS: &str =
    "id, seller_id, code_id, asking_price, state, buyer_id, created_at";

/// PostgreSQL-backed [`Store`]
#[derive(Clone)]
pub struct PgStore {
    pool: Arc<PgPool>,
}

impl PgStore {
    /// Create a store over a connection pool
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> EconomyResult<Box<dyn StoreTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTx { tx }))
    }

    async fn account(&self, user_id: UserId) -> EconomyResult<Option<Account>> {
        let row = sqlx::query(
            "SELECT user_id, display_name, balance, updated_at FROM accounts WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(|r| account_from_row(&r)))
    }

    async fn open_listings(&self) -> EconomyResult<Vec<ListingView>> {
        let rows = sqlx::query(
            r#"
            SELECT l.id, l.code_id, c.item_name, l.seller_id, a.display_name, l.asking_price, l.created_at
            FROM market_listings l
            JOIN redeemable_codes c ON c.id = l.code_id
            JOIN accounts a ON a.user_id = l.seller_id
            WHERE l.state = 'open'
            ORDER BY l.created_at ASC, l.id ASC
            "#,
        )
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| ListingView {
                listing_id: r.get("id"),
                code_id: r.get("code_id"),
                item_name: r.get("item_name"),
                seller_id: r.get("seller_id"),
                seller_name: r.get("display_name"),
                asking_price: r.get("asking_price"),
                created_at: r.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
            })
            .collect())
    }

    async fn codes_for_user(&self, user_id: UserId) -> EconomyResult<Vec<CodeView>> {
        let rows = sqlx::query(
            r#"
            SELECT rc.id, rc.owner_user_id, rc.case_id, rc.item_id, rc.item_name, rc.code,
                   rc.state, rc.created_at,
                   c.name AS case_name, c.price AS case_price, ci.rarity
            FROM redeemable_codes rc
            JOIN cases c ON c.id = rc.case_id
            LEFT JOIN case_items ci ON ci.id = rc.item_id
            WHERE rc.owner_user_id = $1
            ORDER BY rc.created_at DESC, rc.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        rows.iter()
            .map(|r| {
                Ok(CodeView {
                    code: code_from_row(r)?,
                    case_name: r.get("case_name"),
                    case_price: r.get("case_price"),
                    rarity: r.get("rarity"),
                    redeem_value: None,
                })
            })
            .collect()
    }
}

/// Transaction over [`PgStore`]
pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PgTx {
    async fn account_for_update(&mut self, user_id: UserId) -> EconomyResult<Option<Account>> {
        let row = sqlx::query(
            "SELECT user_id, display_name, balance, updated_at
             FROM accounts
             WHERE user_id = $1
             FOR UPDATE",
        )
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(|r| account_from_row(&r)))
    }

    async fn debit(&mut self, user_id: UserId, amount: i64) -> EconomyResult<Option<i64>> {
        // Check and decrement in one statement so concurrent debits serialize on the row
        let row = sqlx::query(
            "UPDATE accounts
             SET balance = balance - $1, updated_at = NOW()
             WHERE user_id = $2 AND balance >= $1
             RETURNING balance",
        )
        .bind(amount)
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(|r| r.get("balance")))
    }

    async fn credit(&mut self, user_id: UserId, amount: i64) -> EconomyResult<Option<i64>> {
        let row = sqlx::query(
            "UPDATE accounts
             SET balance = balance + $1, updated_at = NOW()
             WHERE user_id = $2
             RETURNING balance",
        )
        .bind(amount)
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|err| credit_error(err, user_id))?;

        Ok(row.map(|r| r.get("balance")))
    }

    async fn find_case(&mut self, case_id: CaseId) -> EconomyResult<Option<Case>> {
        let row = sqlx::query("SELECT id, name, price FROM cases WHERE id = $1")
            .bind(case_id)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(row.map(|r| Case {
            id: r.get("id"),
            name: r.get("name"),
            price: r.get("price"),
        }))
    }

    async fn case_items(&mut self, case_id: CaseId) -> EconomyResult<Vec<CaseItem>> {
        let rows = sqlx::query(
            "SELECT id, case_id, name, rarity, drop_chance
             FROM case_items
             WHERE case_id = $1
             ORDER BY id ASC",
        )
        .bind(case_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| CaseItem {
                id: r.get("id"),
                case_id: r.get("case_id"),
                name: r.get("name"),
                rarity: r.get("rarity"),
                drop_chance: r.get("drop_chance"),
            })
            .collect())
    }

    async fn insert_code(&mut self, code: NewCode) -> EconomyResult<Option<RedeemableCode>> {
        // ON CONFLICT keeps the transaction usable after a code collision
        let row = sqlx::query(&format!(
            "INSERT INTO redeemable_codes (owner_user_id, case_id, item_id, item_name, code, state)
             VALUES ($1, $2, $3, $4, $5, 'active')
             ON CONFLICT (code) DO NOTHING
             RETURNING {CODE_COLUMNS}"
        ))
        .bind(code.owner_user_id)
        .bind(code.case_id)
        .bind(code.item_id)
        .bind(&code.item_name)
        .bind(&code.code)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(code_from_row).transpose()
    }

    async fn code_for_update(&mut self, code_id: CodeId) -> EconomyResult<Option<RedeemableCode>> {
        let row = sqlx::query(&format!(
            "SELECT {CODE_COLUMNS} FROM redeemable_codes WHERE id = $1 FOR UPDATE"
        ))
        .bind(code_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(code_from_row).transpose()
    }

    async fn set_code_owner(&mut self, code_id: CodeId, owner: UserId) -> EconomyResult<()> {
        sqlx::query("UPDATE redeemable_codes SET owner_user_id = $1 WHERE id = $2")
            .bind(owner)
            .bind(code_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn set_code_state(&mut self, code_id: CodeId, state: CodeState) -> EconomyResult<()> {
        sqlx::query("UPDATE redeemable_codes SET state = $1 WHERE id = $2")
            .bind(state.to_string())
            .bind(code_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn open_listing_for_code(
        &mut self,
        code_id: CodeId,
    ) -> EconomyResult<Option<MarketListing>> {
        // No row lock here: callers already hold the code row, and buy takes
        // the listing before the code
        let row = sqlx::query(&format!(
            "SELECT {LISTING_COLUMNS} FROM market_listings
             WHERE code_id = $1 AND state = 'open'"
        ))
        .bind(code_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(listing_from_row).transpose()
    }

    async fn insert_listing(
        &mut self,
        seller_id: UserId,
        code_id: CodeId,
        asking_price: i64,
    ) -> EconomyResult<MarketListing> {
        let row = sqlx::query(&format!(
            "INSERT INTO market_listings (seller_id, code_id, asking_price, state)
             VALUES ($1, $2, $3, 'open')
             RETURNING {LISTING_COLUMNS}"
        ))
        .bind(seller_id)
        .bind(code_id)
        .bind(asking_price)
        .fetch_one(&mut *self.tx)
        .await?;

        listing_from_row(&row)
    }

    async fn listing_for_update(
        &mut self,
        listing_id: ListingId,
    ) -> EconomyResult<Option<MarketListing>> {
        let row = sqlx::query(&format!(
            "SELECT {LISTING_COLUMNS} FROM market_listings WHERE id = $1 FOR UPDATE"
        ))
        .bind(listing_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(listing_from_row).transpose()
    }

    async fn set_listing_state(
        &mut self,
        listing_id: ListingId,
        state: ListingState,
        buyer_id: Option<UserId>,
    ) -> EconomyResult<()> {
        sqlx::query(
            "UPDATE market_listings
             SET state = $1, buyer_id = $2, closed_at = NOW()
             WHERE id = $3",
        )
        .bind(state.to_string())
        .bind(buyer_id)
        .bind(listing_id)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> EconomyResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

/// Maps BIGINT overflow on `balance + $1` to [`EconomyError::BalanceOverflow`]
fn credit_error(err: sqlx::Error, user_id: UserId) -> EconomyError {
    let err = EconomyError::from(err);
    if err.sqlstate().as_deref() == Some(SQLSTATE_NUMERIC_OUT_OF_RANGE) {
        EconomyError::BalanceOverflow(user_id)
    } else {
        err
    }
}

fn account_from_row(row: &PgRow) -> Account {
    Account {
        user_id: row.get("user_id"),
        display_name: row.get("display_name"),
        balance: row.get("balance"),
        updated_at: row.get::<chrono::NaiveDateTime, _>("updated_at").and_utc(),
    }
}

fn code_from_row(row: &PgRow) -> EconomyResult<RedeemableCode> {
    Ok(RedeemableCode {
        id: row.get("id"),
        owner_user_id: row.get("owner_user_id"),
        case_id: row.get("case_id"),
        item_id: row.get("item_id"),
        item_name: row.get("item_name"),
        code: row.get("code"),
        state: row.get::<String, _>("state").parse()?,
        created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
    })
}

fn listing_from_row(row: &PgRow) -> EconomyResult<MarketListing> {
    Ok(MarketListing {
        id: row.get("id"),
        seller_id: row.get("seller_id"),
        code_id: row.get("code_id"),
        asking_price: row.get("asking_price"),
        state: row.get::<String, _>("state").parse()?,
        buyer_id: row.get("buyer_id"),
        created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
    })
}
