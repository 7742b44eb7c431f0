//! Code minting and lifecycle transitions.

use rand::Rng;

use super::models::{CodeState, NewCode, RedeemableCode};
use crate::{
    CaseId, CodeId, UserId,
    catalog::CaseItem,
    errors::{EconomyError, EconomyResult},
    store::StoreTx,
};

/// Symbols a code is drawn from
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Shortest code length accepted by configuration
pub const MIN_CODE_LENGTH: usize = 12;

/// Fresh strings tried before giving up on a mint
const MAX_MINT_ATTEMPTS: usize = 8;

/// Generate a random code string
pub fn generate_code(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Mint an active code for a won item
///
/// # Arguments
///
/// * `tx` - Open store transaction
/// * `user_id` - Initial owner
/// * `case_id` - Case the item was drawn from
/// * `item` - Drawn item
/// * `code_length` - Number of symbols in the code string
///
/// # Returns
///
/// * `EconomyResult<RedeemableCode>` - The persisted code
pub async fn issue(
    tx: &mut dyn StoreTx,
    user_id: UserId,
    case_id: CaseId,
    item: &CaseItem,
    code_length: usize,
) -> EconomyResult<RedeemableCode> {
    for attempt in 1..=MAX_MINT_ATTEMPTS {
        let new_code = NewCode {
            owner_user_id: user_id,
            case_id,
            item_id: item.id,
            item_name: item.name.clone(),
            code: generate_code(code_length),
        };

        if let Some(code) = tx.insert_code(new_code).await? {
            return Ok(code);
        }

        log::warn!("Code collision on mint attempt {attempt} for user {user_id}");
    }

    Err(EconomyError::TransactionFailed(
        "could not mint a unique code".to_string(),
    ))
}

/// Reassign an active code to a new owner
///
/// # Errors
///
/// * `EconomyError::CodeNotFound` - No such code
/// * `EconomyError::InvalidState` - Code already consumed
pub async fn transfer(
    tx: &mut dyn StoreTx,
    code_id: CodeId,
    new_owner_id: UserId,
) -> EconomyResult<RedeemableCode> {
    let mut code = tx
        .code_for_update(code_id)
        .await?
        .ok_or(EconomyError::CodeNotFound(code_id))?;

    if !code.state.is_transferable() {
        return Err(EconomyError::InvalidState(code_id));
    }

    tx.set_code_owner(code_id, new_owner_id).await?;
    code.owner_user_id = new_owner_id;
    Ok(code)
}

/// Consume an active code
///
/// # Errors
///
/// * `EconomyError::CodeNotFound` - No such code
/// * `EconomyError::AlreadyConsumed` - Code is not active
pub async fn consume(tx: &mut dyn StoreTx, code_id: CodeId) -> EconomyResult<RedeemableCode> {
    let mut code = tx
        .code_for_update(code_id)
        .await?
        .ok_or(EconomyError::CodeNotFound(code_id))?;

    let next: CodeState = code.state.consume(code_id)?;
    tx.set_code_state(code_id, next).await?;
    code.state = next;
    Ok(code)
}
