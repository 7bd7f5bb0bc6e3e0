//! One pass over all payments newer than the checkpoint. The checkpoint only
//! advances once every payment in the batch has been handled without error;
//! any error aborts the whole tick and leaves the checkpoint unchanged so the
//! next tick retries the same batch.

use crate::alerting::AlertingSink;
use crate::catalog::CatalogClient;
use crate::chain::query::{ChainQuerier, ChainQueryError, Predicates};
use crate::chain::tx::TxSender;
use crate::checkpoint::{CheckpointError, ProgressStore};
use crate::relay::payment::{PaymentError, PaymentProcessor};
use crate::types::{Checkpoint, IncomingPayment, PaymentMemo};
use cosmrs::AccountId;
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum TickError {
    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),
    #[error("chain query error: {0}")]
    ChainQuery(#[from] ChainQueryError),
    #[error("payment processing error: {0}")]
    Payment(#[from] PaymentError),
}

pub struct RelayTick<'a> {
    pub progress: &'a dyn ProgressStore,
    pub querier: &'a dyn ChainQuerier,
    pub catalog: &'a dyn CatalogClient,
    pub sender: &'a dyn TxSender,
    pub alerting: &'a dyn AlertingSink,
    pub service_wallet: &'a AccountId,
    pub payment_denom: &'a str,
}

impl<'a> RelayTick<'a> {
    /// Executes one tick. Returns `Ok(())` whether or not any payments were
    /// found; the checkpoint only moves forward, never backward, and only on
    /// a tick that completes every payment without error.
    pub async fn run(&self) -> Result<(), TickError> {
        let checkpoint = self.progress.get().await?;

        let predicates: Predicates = vec![(
            "transfer.recipient".to_string(),
            self.service_wallet.to_string(),
        )];
        let txs = self.querier.query(&predicates, checkpoint.height + 1).await?;

        if txs.is_empty() {
            return Ok(());
        }

        let mut payments: Vec<IncomingPayment> = Vec::with_capacity(txs.len());
        for tx in &txs {
            match decode_incoming_payment(tx, self.service_wallet, self.payment_denom) {
                Some(payment) => payments.push(payment),
                None => continue,
            }
        }
        payments.sort_by_key(|p| p.block_height);

        let processor = PaymentProcessor {
            catalog: self.catalog,
            querier: self.querier,
            sender: self.sender,
            alerting: self.alerting,
            service_wallet: self.service_wallet,
            payment_denom: self.payment_denom,
        };

        let max_height = txs.iter().map(|tx| tx.height).max().unwrap_or(checkpoint.height);

        for payment in &payments {
            processor.process(payment).await?;
        }

        self.progress
            .set(Checkpoint {
                height: max_height,
            })
            .await?;
        info!(height = max_height, count = payments.len(), "tick complete");
        Ok(())
    }
}

/// Decodes one chain transaction into an [`IncomingPayment`], enforcing the
/// acceptance rules for a valid mint-request payment. Any rule violation is
/// non-fatal: the transaction is skipped rather than erroring out the tick.
fn decode_incoming_payment(
    tx: &crate::chain::query::ChainTx,
    service_wallet: &AccountId,
    payment_denom: &str,
) -> Option<IncomingPayment> {
    if tx.message_count != 1 {
        warn!(
            tx_hash = %tx.hash,
            message_count = tx.message_count,
            "transaction does not carry exactly one message, skipping"
        );
        return None;
    }
    let recipient = tx.attributes.get("transfer.recipient")?;
    if recipient != &service_wallet.to_string() {
        return None;
    }
    let sender = tx.attributes.get("transfer.sender")?.clone();
    let amount_attr = tx.attributes.get("transfer.amount")?;
    let (amount, denom) = split_amount(amount_attr)?;
    if denom != payment_denom {
        warn!(tx_hash = %tx.hash, denom, "wrong denom, skipping");
        return None;
    }

    let memo: PaymentMemo = serde_json::from_str(&tx.memo).ok()?;
    if memo.uuid.is_empty() {
        return None;
    }

    Some(IncomingPayment {
        tx_hash: tx.hash.clone(),
        block_height: tx.height,
        from_address: sender,
        to_address: recipient.clone(),
        amount,
        denom,
        memo,
    })
}

/// Splits a Cosmos SDK coin string like `"1000acudos"` into `(amount, denom)`.
fn split_amount(s: &str) -> Option<(u128, String)> {
    let split_at = s.find(|c: char| !c.is_ascii_digit())?;
    let (amount_str, denom) = s.split_at(split_at);
    let amount = amount_str.parse::<u128>().ok()?;
    Some((amount, denom.to_string()))
}
