//! Selling a code back to the house.

use serde::{Deserialize, Serialize};

use crate::{
    CodeId, UserId,
    codes::{self, CodeState},
    errors::{EconomyError, EconomyResult},
    ledger,
    store::StoreTx,
};

/// Basis points in one whole
pub const BPS_DENOMINATOR: u32 = 10_000;

/// Outcome of a redemption
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redemption {
    pub code_id: CodeId,
    /// Amount credited in cents
    pub amount: i64,
    pub new_balance: i64,
}

/// House buy-back price for a case price, rounded down to the cent
pub fn sell_price(case_price: i64, sell_rate_bps: u32) -> EconomyResult<i64> {
    let amount = i128::from(case_price) * i128::from(sell_rate_bps) / i128::from(BPS_DENOMINATOR);
    i64::try_from(amount).map_err(|_| EconomyError::InvalidAmount(case_price))
}

/// Redeem a code for a balance credit
///
/// # Errors
///
/// * `EconomyError::CodeNotFound` - No such code
/// * `EconomyError::NotOwner` - Code belongs to someone else
/// * `EconomyError::AlreadyConsumed` - Code was redeemed before
/// * `EconomyError::CodeListed` - Code has an open market listing
pub async fn redeem(
    tx: &mut dyn StoreTx,
    code_id: CodeId,
    user_id: UserId,
    sell_rate_bps: u32,
) -> EconomyResult<Redemption> {
    let code = tx
        .code_for_update(code_id)
        .await?
        .ok_or(EconomyError::CodeNotFound(code_id))?;

    if code.owner_user_id != user_id {
        return Err(EconomyError::NotOwner {
            user_id,
            resource: format!("code {code_id}"),
        });
    }

    if code.state != CodeState::Active {
        return Err(EconomyError::AlreadyConsumed(code_id));
    }

    if tx.open_listing_for_code(code_id).await?.is_some() {
        return Err(EconomyError::CodeListed(code_id));
    }

    let case = tx
        .find_case(code.case_id)
        .await?
        .ok_or(EconomyError::CaseNotFound(code.case_id))?;

    let amount = sell_price(case.price, sell_rate_bps)?;
    let new_balance = ledger::credit(tx, user_id, amount).await?;
    codes::consume(tx, code_id).await?;

    Ok(Redemption {
        code_id,
        amount,
        new_balance,
    })
}
