//! Debit and credit within a transaction.

use crate::{
    UserId,
    errors::{EconomyError, EconomyResult},
    store::StoreTx,
};

/// Debit an account
///
/// # Arguments
///
/// * `tx` - Open store transaction
/// * `user_id` - Account to debit
/// * `amount` - Amount in cents
///
/// # Returns
///
/// * `EconomyResult<i64>` - New balance or error
///
/// # Errors
///
/// * `EconomyError::InsufficientBalance` - Balance below `amount`
/// * `EconomyError::UserNotFound` - No such account
pub async fn debit(tx: &mut dyn StoreTx, user_id: UserId, amount: i64) -> EconomyResult<i64> {
    if amount < 0 {
        return Err(EconomyError::InvalidAmount(amount));
    }

    if let Some(new_balance) = tx.debit(user_id, amount).await? {
        return Ok(new_balance);
    }

    // Either the account doesn't exist or the balance is too low
    match tx.account_for_update(user_id).await? {
        Some(account) => Err(EconomyError::InsufficientBalance {
            user_id,
            available: account.balance,
            required: amount,
        }),
        None => Err(EconomyError::UserNotFound(user_id)),
    }
}

/// Credit an account
///
/// # Errors
///
/// * `EconomyError::UserNotFound` - No such account
/// * `EconomyError::BalanceOverflow` - Balance would exceed `i64::MAX`
pub async fn credit(tx: &mut dyn StoreTx, user_id: UserId, amount: i64) -> EconomyResult<i64> {
    if amount < 0 {
        return Err(EconomyError::InvalidAmount(amount));
    }

    tx.credit(user_id, amount)
        .await?
        .ok_or(EconomyError::UserNotFound(user_id))
}
