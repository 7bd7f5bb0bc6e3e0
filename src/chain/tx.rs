//! Builds, signs, simulates, broadcasts, and awaits commit of transactions.
//! Account sequence is refreshed before every call — never cached, since a
//! stale sequence produces a rejected or out-of-order transaction.

use crate::chain::account::{AccountInfo, AccountInfoClient, AccountInfoError};
use crate::types::GasEstimate;
use async_trait::async_trait;
use cosmrs::proto::cosmos::base::v1beta1::Coin as ProtoCoin;
use cosmrs::proto::cosmos::tx::v1beta1::{
    BroadcastMode, BroadcastTxRequest, SimulateRequest, service_client::ServiceClient,
};
use cosmrs::tendermint::chain::Id as ChainId;
use cosmrs::tx::{Body, Fee, ModeInfo, Raw, SignDoc, SignMode, SignerInfo, SignerPublicKey};
use cosmrs::{AccountId, Any, Coin};
use cosmrs::crypto::secp256k1::SigningKey;
use cosmrs::rpc::{Client, HttpClient};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tonic::transport::Channel;
use tracing::instrument;

pub const GAS_ADJUSTMENT: f64 = 1.3;
const COMMIT_POLL_ATTEMPTS: u32 = 5;
const COMMIT_POLL_INTERVAL: Duration = Duration::from_secs(6);

#[derive(Debug, thiserror::Error)]
pub enum TxError {
    #[error("account info lookup failed: {0}")]
    AccountInfo(#[from] AccountInfoError),
    #[error("tx signing failed: {0}")]
    Sign(#[source] cosmrs::ErrorReport),
    #[error("simulation failed: {0}")]
    Simulate(#[from] tonic::Status),
    #[error("simulation returned no gas info")]
    NoGasInfo,
    #[error("broadcast rejected with code {code}: {log}")]
    BroadcastRejected { code: u32, log: String },
    #[error("tx {0} not found after {1} polling attempts")]
    NotConfirmed(String, u32),
    #[error("tx {0} included with non-zero code {1}: {2}")]
    IncludedWithError(String, u32, String),
}

/// Builds, signs, simulates, broadcasts, and confirms transactions against a
/// single signer identity. `send_tx` and `estimate_gas` are mutually
/// exclusive at the account-sequence level.
#[async_trait]
pub trait TxSender: Send + Sync {
    async fn estimate_gas(&self, msgs: Vec<Any>, memo: &str) -> Result<GasEstimate, TxError>;
    async fn send_tx(
        &self,
        msgs: Vec<Any>,
        memo: &str,
        gas: GasEstimate,
    ) -> Result<String, TxError>;
}

pub struct CosmosTxSender {
    signing_key: SigningKey,
    address: AccountId,
    chain_id: ChainId,
    payment_denom: String,
    gas_price: u128,
    account_info: AccountInfoClient,
    tx_service: Mutex<ServiceClient<Channel>>,
    rpc: HttpClient,
    /// Serializes `send_tx`/`estimate_gas` so concurrent callers never race
    /// on the account sequence.
    sequence_lock: Mutex<()>,
}

impl CosmosTxSender {
    pub fn new(
        signing_key: SigningKey,
        address: AccountId,
        chain_id: ChainId,
        payment_denom: impl Into<String>,
        gas_price: u128,
        grpc_channel: Channel,
        rpc: HttpClient,
    ) -> Self {
        Self {
            account_info: AccountInfoClient::new(grpc_channel.clone()),
            tx_service: Mutex::new(ServiceClient::new(grpc_channel)),
            signing_key,
            address,
            chain_id,
            payment_denom: payment_denom.into(),
            gas_price,
            rpc,
            sequence_lock: Mutex::new(()),
        }
    }

    async fn account(&self) -> Result<AccountInfo, TxError> {
        Ok(self.account_info.query(&self.address).await?)
    }

    fn body(&self, msgs: Vec<Any>, memo: &str) -> Body {
        Body::new(msgs, memo, 0u32)
    }

    fn placeholder_signer_info(&self, sequence: u64) -> SignerInfo {
        SignerInfo {
            public_key: Some(SignerPublicKey::Single(self.signing_key.public_key())),
            mode_info: ModeInfo::single(SignMode::Direct),
            sequence,
        }
    }

    /// The two-pass signing protocol: a placeholder signer-info block
    /// establishes the canonical sign bytes, which are then signed and
    /// spliced into the final `Raw` transaction.
    fn sign(
        &self,
        body: &Body,
        fee: Fee,
        account: AccountInfo,
    ) -> Result<Raw, TxError> {
        let signer_info = self.placeholder_signer_info(account.sequence);
        let auth_info = signer_info.auth_info(fee);
        let sign_doc = SignDoc::new(body, &auth_info, &self.chain_id, account.account_number)
            .map_err(TxError::Sign)?;
        sign_doc
            .sign(&self.signing_key)
            .map_err(TxError::Sign)
    }

    fn fee(&self, gas_limit: u64, amount: u128) -> Fee {
        Fee::from_amount_and_gas(
            Coin {
                denom: self.payment_denom.parse().expect("payment denom is a valid denom"),
                amount,
            },
            gas_limit,
        )
    }
}

#[async_trait]
impl TxSender for CosmosTxSender {
    #[instrument(skip(self, msgs), err)]
    async fn estimate_gas(&self, msgs: Vec<Any>, memo: &str) -> Result<GasEstimate, TxError> {
        let _guard = self.sequence_lock.lock().await;
        let account = self.account().await?;

        let body = self.body(msgs, memo);
        let zero_fee = self.fee(0, 0);
        let raw = self.sign(&body, zero_fee, account)?;

        let mut client = self.tx_service.lock().await;
        let response = client
            .simulate(SimulateRequest {
                tx_bytes: raw.to_bytes().map_err(TxError::Sign)?,
                tx: None,
            })
            .await?
            .into_inner();

        let gas_info = response.gas_info.ok_or(TxError::NoGasInfo)?;
        let gas_limit = (gas_info.gas_used as f64 * GAS_ADJUSTMENT).ceil() as u64;
        let fee_amount = gas_limit as u128 * self.gas_price;

        Ok(GasEstimate {
            gas_limit,
            fee_amount,
        })
    }

    #[instrument(skip(self, msgs), err)]
    async fn send_tx(
        &self,
        msgs: Vec<Any>,
        memo: &str,
        gas: GasEstimate,
    ) -> Result<String, TxError> {
        let _guard = self.sequence_lock.lock().await;
        let account = self.account().await?;

        let body = self.body(msgs, memo);
        let fee = self.fee(gas.gas_limit, gas.fee_amount);
        let raw = self.sign(&body, fee, account)?;
        let tx_bytes = raw.to_bytes().map_err(TxError::Sign)?;

        let mut client = self.tx_service.lock().await;
        let response = client
            .broadcast_tx(BroadcastTxRequest {
                tx_bytes,
                mode: BroadcastMode::Sync as i32,
            })
            .await?
            .into_inner();
        drop(client);

        let tx_response = response.tx_response.ok_or(TxError::NoGasInfo)?;
        if tx_response.code != 0 {
            return Err(TxError::BroadcastRejected {
                code: tx_response.code,
                log: tx_response.raw_log,
            });
        }
        let tx_hash = tx_response.txhash;

        for _ in 0..COMMIT_POLL_ATTEMPTS {
            sleep(COMMIT_POLL_INTERVAL).await;
            if let Ok(confirmed) = self.poll_for_inclusion(&tx_hash).await {
                if confirmed.code != 0 {
                    return Err(TxError::IncludedWithError(
                        tx_hash,
                        confirmed.code,
                        confirmed.log,
                    ));
                }
                return Ok(tx_hash);
            }
        }
        Err(TxError::NotConfirmed(tx_hash, COMMIT_POLL_ATTEMPTS))
    }
}

struct IncludedTx {
    code: u32,
    log: String,
}

impl CosmosTxSender {
    async fn poll_for_inclusion(&self, tx_hash: &str) -> Result<IncludedTx, TxError> {
        let hash = tx_hash
            .parse()
            .map_err(|_| TxError::NotConfirmed(tx_hash.to_string(), 0))?;
        let response = self
            .rpc
            .tx(hash, false)
            .await
            .map_err(|_| TxError::NotConfirmed(tx_hash.to_string(), 0))?;
        Ok(IncludedTx {
            code: response.tx_result.code.value(),
            log: response.tx_result.log,
        })
    }
}

/// Builds a plain bank-transfer `Any` message (used for both incoming-payment
/// decoding contexts and refund construction).
pub fn bank_send_message(from: &AccountId, to: &AccountId, amount: u128, denom: &str) -> Any {
    use cosmrs::bank::MsgSend;
    let coin = Coin {
        denom: denom.parse().expect("payment denom is a valid denom"),
        amount,
    };
    MsgSend {
        from_address: from.clone(),
        to_address: to.clone(),
        amount: vec![coin],
    }
    .to_any()
    .expect("MsgSend always encodes")
}

/// Builds the marketplace mint message as an `Any`.
pub fn mint_message(
    creator: &AccountId,
    denom_id: &str,
    recipient: &str,
    name: &str,
    uri: &str,
    data: &str,
    uid: &str,
    price: u128,
    payment_denom: &str,
) -> Any {
    use crate::chain::proto::MsgMintNft;
    MsgMintNft {
        creator: creator.to_string(),
        denom_id: denom_id.to_string(),
        recipient: recipient.to_string(),
        name: name.to_string(),
        uri: uri.to_string(),
        data: data.to_string(),
        uid: uid.to_string(),
        price: Some(ProtoCoin {
            denom: payment_denom.to_string(),
            amount: price.to_string(),
        }),
    }
    .to_any()
}
