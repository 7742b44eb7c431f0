//! Opening a case: draw an item, mint its code and charge the case price.

use serde::{Deserialize, Serialize};

use crate::{
    CaseId, UserId,
    catalog::{CaseItem, ItemSelector},
    codes::{self, RedeemableCode},
    errors::{EconomyError, EconomyResult},
    ledger,
    store::StoreTx,
};

/// Outcome of opening a case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseOpening {
    pub item: CaseItem,
    pub code: RedeemableCode,
    /// Balance after paying for the case
    pub new_balance: i64,
}

/// Open a case for a user
///
/// The account row stays locked from the balance check until the debit, and
/// the minted code and the debit commit or roll back together with `tx`.
///
/// # Errors
///
/// * `EconomyError::UserNotFound` - No such account
/// * `EconomyError::CaseNotFound` - No such case
/// * `EconomyError::InsufficientBalance` - Balance below the case price
/// * `EconomyError::EmptyCase` - Case has no items
/// * `EconomyError::InvalidCatalog` - Item weights cannot produce a draw
pub async fn open_case(
    tx: &mut dyn StoreTx,
    selector: &ItemSelector,
    user_id: UserId,
    case_id: CaseId,
    code_length: usize,
) -> EconomyResult<CaseOpening> {
    let account = tx
        .account_for_update(user_id)
        .await?
        .ok_or(EconomyError::UserNotFound(user_id))?;

    let case = tx
        .find_case(case_id)
        .await?
        .ok_or(EconomyError::CaseNotFound(case_id))?;

    if account.balance < case.price {
        return Err(EconomyError::InsufficientBalance {
            user_id,
            available: account.balance,
            required: case.price,
        });
    }

    let items = tx.case_items(case_id).await?;
    if items.is_empty() {
        return Err(EconomyError::EmptyCase(case_id));
    }

    let item = selector.select(&items)?.clone();
    let code = codes::issue(tx, user_id, case_id, &item, code_length).await?;
    let new_balance = ledger::debit(tx, user_id, case.price).await?;

    Ok(CaseOpening {
        item,
        code,
        new_balance,
    })
}
