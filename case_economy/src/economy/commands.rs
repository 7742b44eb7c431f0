//! Serializable command surface over [`EconomyManager`].

use serde::{Deserialize, Serialize};

use super::manager::EconomyManager;
use crate::{
    CaseId, CodeId, ListingId, UserId,
    codes::CodeView,
    errors::EconomyResult,
    ledger::Account,
    market::{ListingView, MarketListing, Purchase},
    opening::CaseOpening,
    redemption::Redemption,
};

/// A single economy request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Command {
    OpenCase {
        user_id: UserId,
        case_id: CaseId,
    },
    Redeem {
        code_id: CodeId,
        user_id: UserId,
    },
    ListForSale {
        code_id: CodeId,
        seller_id: UserId,
        price: i64,
    },
    Buy {
        listing_id: ListingId,
        buyer_id: UserId,
    },
    CancelListing {
        listing_id: ListingId,
        seller_id: UserId,
    },
    ListMarket,
    ListCodes {
        user_id: UserId,
    },
    Balance {
        user_id: UserId,
    },
}

impl Command {
    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::OpenCase { .. } => "open_case",
            Self::Redeem { .. } => "redeem",
            Self::ListForSale { .. } => "list_for_sale",
            Self::Buy { .. } => "buy",
            Self::CancelListing { .. } => "cancel_listing",
            Self::ListMarket => "list_market",
            Self::ListCodes { .. } => "list_codes",
            Self::Balance { .. } => "balance",
        }
    }
}

/// Result of a [`Command`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", content = "data", rename_all = "snake_case")]
pub enum CommandOutput {
    CaseOpened(CaseOpening),
    Redeemed(Redemption),
    Listed(MarketListing),
    Purchased(Purchase),
    ListingCancelled(MarketListing),
    Market(Vec<ListingView>),
    Codes(Vec<CodeView>),
    Balance(Account),
}

impl EconomyManager {
    /// Dispatch a command to the matching operation
    pub async fn execute(&self, command: Command) -> EconomyResult<CommandOutput> {
        log::debug!("Executing {}", command.name());

        let output = match command {
            Command::OpenCase { user_id, case_id } => {
                CommandOutput::CaseOpened(self.open_case(user_id, case_id).await?)
            }
            Command::Redeem { code_id, user_id } => {
                CommandOutput::Redeemed(self.redeem(code_id, user_id).await?)
            }
            Command::ListForSale {
                code_id,
                seller_id,
                price,
            } => CommandOutput::Listed(self.list_for_sale(code_id, seller_id, price).await?),
            Command::Buy {
                listing_id,
                buyer_id,
            } => CommandOutput::Purchased(self.buy(listing_id, buyer_id).await?),
            Command::CancelListing {
                listing_id,
                seller_id,
            } => CommandOutput::ListingCancelled(self.cancel_listing(listing_id, seller_id).await?),
            Command::ListMarket => CommandOutput::Market(self.list_market().await?),
            Command::ListCodes { user_id } => CommandOutput::Codes(self.list_codes(user_id).await?),
            Command::Balance { user_id } => CommandOutput::Balance(self.account(user_id).await?),
        };

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tagged_commands() {
        let command: Command =
            serde_json::from_str(r#"{"action":"open_case","user_id":1,"case_id":2}"#).unwrap();
        assert_eq!(
            command,
            Command::OpenCase {
                user_id: 1,
                case_id: 2
            }
        );

        let command: Command = serde_json::from_str(r#"{"action":"list_market"}"#).unwrap();
        assert_eq!(command, Command::ListMarket);
        assert_eq!(command.name(), "list_market");
    }

    #[test]
    fn test_unknown_action_rejected() {
        assert!(serde_json::from_str::<Command>(r#"{"action":"gift","user_id":1}"#).is_err());
    }

    #[test]
    fn test_missing_field_rejected() {
        assert!(
            serde_json::from_str::<Command>(r#"{"action":"buy","listing_id":3}"#).is_err()
        );
    }

    #[test]
    fn test_output_is_adjacently_tagged() {
        let output = CommandOutput::Redeemed(Redemption {
            code_id: 4,
            amount: 50,
            new_balance: 950,
        });
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["result"], "redeemed");
        assert_eq!(json["data"]["amount"], 50);
    }

    #[test]
    fn test_codes_output_flattens_code_fields() {
        use crate::codes::{CodeState, RedeemableCode};

        let output = CommandOutput::Codes(vec![CodeView {
            code: RedeemableCode {
                id: 8,
                owner_user_id: 1,
                case_id: 2,
                item_id: 3,
                item_name: "Dragon Lore".to_string(),
                code: "ABCDEFGHJKLM".to_string(),
                state: CodeState::Active,
                created_at: chrono::Utc::now(),
            },
            case_name: "Weapon Case".to_string(),
            case_price: 250,
            rarity: Some("covert".to_string()),
            redeem_value: Some(125),
        }]);

        let json = serde_json::to_value(&output).unwrap();
        let first = &json["data"][0];
        assert_eq!(json["result"], "codes");
        assert_eq!(first["id"], 8);
        assert_eq!(first["state"], "active");
        assert_eq!(first["case_name"], "Weapon Case");
        assert_eq!(first["rarity"], "covert");
        assert_eq!(first["redeem_value"], 125);
    }
}
