//! Blockchain-facing components: the Signer Identity, the custom mint
//! message codec, account-info lookups, the Chain Querier, and the
//! Tx Builder/Sender.

pub mod account;
pub mod proto;
pub mod query;
pub mod signer;
pub mod tx;
