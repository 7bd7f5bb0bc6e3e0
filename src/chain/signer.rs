//! The single BIP-39/BIP-32 derived key that controls the service wallet.
//! Derived once at startup, held process-wide, never persisted.

use bip32::{DerivationPath, Mnemonic, XPrv};
use cosmrs::AccountId;
use cosmrs::crypto::secp256k1::SigningKey;
use std::str::FromStr;

pub const DERIVATION_PATH: &str = "m/44'/118'/0'/0/0";

#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    #[error("invalid mnemonic: {0}")]
    InvalidMnemonic(String),
    #[error("invalid derivation path {0:?}: {1}")]
    InvalidPath(String, bip32::Error),
    #[error("key derivation failed: {0}")]
    Derivation(#[from] bip32::Error),
    #[error("invalid bech32 prefix or address: {0}")]
    InvalidAddress(String),
}

/// The service wallet's signing key and bech32 address.
pub struct SignerIdentity {
    signing_key: SigningKey,
    account_id: AccountId,
}

impl SignerIdentity {
    /// Derives the signer from a BIP-39 mnemonic phrase at
    /// [`DERIVATION_PATH`], producing a bech32 address under `bech32_prefix`.
    pub fn derive(mnemonic_phrase: &str, bech32_prefix: &str) -> Result<Self, SignerError> {
        let mnemonic = Mnemonic::new(mnemonic_phrase.trim(), bip32::Language::English)
            .map_err(|e| SignerError::InvalidMnemonic(e.to_string()))?;
        let seed = mnemonic.to_seed("");

        let path = DerivationPath::from_str(DERIVATION_PATH)
            .map_err(|e| SignerError::InvalidPath(DERIVATION_PATH.to_string(), e))?;
        let child_xprv = XPrv::derive_from_path(&seed, &path)?;

        let signing_key = SigningKey::from_slice(&child_xprv.private_key().to_bytes())
            .map_err(|e| SignerError::InvalidAddress(e.to_string()))?;

        let account_id = signing_key
            .public_key()
            .account_id(bech32_prefix)
            .map_err(|e| SignerError::InvalidAddress(e.to_string()))?;

        Ok(Self {
            signing_key,
            account_id,
        })
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    pub fn address(&self) -> &AccountId {
        &self.account_id
    }
}
