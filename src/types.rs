//! Data model shared by the relay's components (see the catalog, chain query,
//! and relay engine modules for how each piece is produced/consumed).

use crate::timestamp::UnixMillis;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Durable "last processed block height" checkpoint (the Progress Store's
/// sole record).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub height: i64,
}

/// Catalog status of an NFT. Only `Queued` (and, for older catalog variants,
/// `Approved`) is mintable; anything else causes a refund.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NftStatus {
    Queued,
    Approved,
    Rejected,
    Expired,
    Deleted,
}

impl NftStatus {
    pub fn is_mintable(&self) -> bool {
        matches!(self, NftStatus::Queued | NftStatus::Approved)
    }
}

/// NFT descriptor as returned by the catalog client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NftDescriptor {
    pub id: String,
    /// Price in the payment denom's base units.
    #[serde(with = "crate::util::amount_as_string")]
    pub price: u128,
    pub name: String,
    pub uri: String,
    pub data: String,
    pub denom_id: String,
    pub status: NftStatus,
    pub price_valid_until: UnixMillis,
}

/// The JSON payload carried in a payment transaction's memo field.
///
/// An absent or empty `uuid` means the payment is not a mint request at all
/// (skipped, non-fatal).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMemo {
    #[serde(default)]
    pub uuid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_payment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eth_tx_hash: Option<String>,
}

impl PaymentMemo {
    /// Recipient the mint or residual funds belong to: `recipientAddress` if
    /// set, otherwise the payment's sender.
    pub fn recipient_or(&self, sender: &str) -> String {
        self.recipient_address
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| sender.to_string())
    }
}

/// A single incoming coin transfer into the service wallet, derived from a
/// chain transaction that has already passed the acceptance invariants
/// (exactly one message, plain transfer, single coin, configured denom,
/// parseable non-empty-uuid memo).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingPayment {
    pub tx_hash: String,
    pub block_height: i64,
    pub from_address: String,
    pub to_address: String,
    pub amount: u128,
    pub denom: String,
    pub memo: PaymentMemo,
}

impl fmt::Display for IncomingPayment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}{} from {} at height {})",
            self.tx_hash, self.amount, self.denom, self.from_address, self.block_height
        )
    }
}

/// Result of gas simulation: declared gas limit and the fee it implies in the
/// payment denom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasEstimate {
    pub gas_limit: u64,
    pub fee_amount: u128,
}

/// An outgoing action the relay engine takes in response to a payment. Both
/// variants carry the triggering payment's tx hash as their memo — the sole
/// idempotence key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Mint {
        descriptor_id: String,
        denom_id: String,
        recipient: String,
        name: String,
        uri: String,
        data: String,
        price: u128,
        memo: String,
    },
    Refund {
        to: String,
        amount: u128,
        denom: String,
        memo: String,
    },
}
