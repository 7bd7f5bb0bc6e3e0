//! The idempotence checks, catalog lookup, and mint-or-refund decision for a
//! single incoming payment.

use crate::alerting::AlertingSink;
use crate::catalog::{CatalogClient, CatalogError};
use crate::chain::query::{ChainQuerier, ChainQueryError, Predicates};
use crate::chain::tx::{TxError, TxSender};
use crate::chain::tx as chain_tx;
use crate::timestamp::UnixMillis;
use crate::types::{IncomingPayment, NftDescriptor};
use cosmrs::AccountId;
use std::str::FromStr;
use tracing::{error, info, warn};

/// The gas cushion deducted from the paid amount before asking the catalog
/// whether the buyer can afford the NFT: 300k gas at the default gas price,
/// expressed in base units (1.5 CUDOS).
pub const CATALOG_GAS_CUSHION: u128 = 1_500_000_000_000_000_000;

/// Refunds below this threshold are suppressed entirely rather than sent as
/// dust — it protects the service wallet from being drained by a flood of
/// tiny payments, not a promise made to payers.
pub const MIN_REFUND_AMOUNT: u128 = 5_000_000_000_000_000_000;

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("chain query failed: {0}")]
    ChainQuery(#[from] ChainQueryError),
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("tx error: {0}")]
    Tx(#[from] TxError),
    #[error("mint rejected: {0}")]
    MintRejected(String),
}

pub struct PaymentProcessor<'a> {
    pub catalog: &'a dyn CatalogClient,
    pub querier: &'a dyn ChainQuerier,
    pub sender: &'a dyn TxSender,
    pub alerting: &'a dyn AlertingSink,
    pub service_wallet: &'a AccountId,
    pub payment_denom: &'a str,
}

impl<'a> PaymentProcessor<'a> {
    /// Processes one payment end to end. Chain query, catalog transport, and
    /// send failures propagate to abort the tick; everything else either
    /// mints, refunds, or is a benign no-op.
    pub async fn process(&self, payment: &IncomingPayment) -> Result<(), PaymentError> {
        let recipient = payment.memo.recipient_or(&payment.from_address);

        if self.already_minted_for_payment(payment, &recipient).await? {
            info!(tx_hash = %payment.tx_hash, "already minted for this payment, skipping");
            return Ok(());
        }
        if self.already_refunded(payment).await? {
            info!(tx_hash = %payment.tx_hash, "already refunded this payment, skipping");
            return Ok(());
        }

        let catalog_amount = payment.amount.saturating_sub(CATALOG_GAS_CUSHION);
        let descriptor = self
            .catalog
            .get_nft(&payment.memo.uuid, &recipient, catalog_amount)
            .await?;

        let descriptor = match descriptor {
            Some(d) => d,
            None => {
                info!(tx_hash = %payment.tx_hash, "catalog: not eligible, refunding");
                return self.refund(payment).await;
            }
        };

        if self.already_minted_globally(payment, &descriptor.id).await? {
            info!(uid = %descriptor.id, "nft already minted globally, refunding");
            return self.refund(payment).await;
        }

        match self.mint(payment, &recipient, &descriptor).await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(tx_hash = %payment.tx_hash, error = %e, "mint failed, attempting refund");
                self.alerting
                    .notify(&format!("mint failed for {}: {}", payment.tx_hash, e))
                    .await;
                self.refund(payment).await
            }
        }
    }

    /// Every idempotence check below requires `message_count == 1` on the
    /// candidate match. A transaction's event attributes are flattened across
    /// all of its messages, so a bundled multi-message transaction could
    /// otherwise present the right buyer/creator/uid attribute combination by
    /// coincidence without actually being the mint or refund it looks like.
    async fn already_minted_for_payment(
        &self,
        payment: &IncomingPayment,
        recipient: &str,
    ) -> Result<bool, PaymentError> {
        let predicates: Predicates = vec![(
            "marketplace_mint_nft.buyer".to_string(),
            recipient.to_string(),
        )];
        let results = self.querier.query(&predicates, payment.block_height).await?;
        Ok(results.iter().any(|tx| {
            tx.message_count == 1
                && tx.memo == payment.tx_hash
                && tx
                    .attributes
                    .get("marketplace_mint_nft.creator")
                    .map(|c| *c == self.service_wallet.to_string())
                    .unwrap_or(false)
        }))
    }

    async fn already_refunded(&self, payment: &IncomingPayment) -> Result<bool, PaymentError> {
        let predicates: Predicates = vec![
            (
                "transfer.sender".to_string(),
                self.service_wallet.to_string(),
            ),
            (
                "transfer.recipient".to_string(),
                payment.from_address.clone(),
            ),
        ];
        let results = self.querier.query(&predicates, payment.block_height).await?;
        Ok(results
            .iter()
            .any(|tx| tx.message_count == 1 && tx.memo == payment.tx_hash))
    }

    async fn already_minted_globally(
        &self,
        payment: &IncomingPayment,
        uid: &str,
    ) -> Result<bool, PaymentError> {
        let predicates: Predicates =
            vec![("marketplace_mint_nft.uid".to_string(), uid.to_string())];
        let results = self.querier.query(&predicates, payment.block_height).await?;
        Ok(results.iter().any(|tx| {
            tx.message_count == 1
                && tx
                    .attributes
                    .get("marketplace_mint_nft.creator")
                    .map(|c| *c == self.service_wallet.to_string())
                    .unwrap_or(false)
        }))
    }

    async fn mint(
        &self,
        payment: &IncomingPayment,
        recipient: &str,
        descriptor: &NftDescriptor,
    ) -> Result<(), PaymentError> {
        let now = UnixMillis::now().map_err(|e| PaymentError::MintRejected(e.to_string()))?;
        if now > descriptor.price_valid_until {
            return Err(PaymentError::MintRejected("price quote expired".into()));
        }
        if !descriptor.status.is_mintable() {
            return Err(PaymentError::MintRejected(format!(
                "nft status {:?} is not mintable",
                descriptor.status
            )));
        }

        let msg = chain_tx::mint_message(
            self.service_wallet,
            &descriptor.denom_id,
            recipient,
            &descriptor.name,
            &descriptor.uri,
            &descriptor.data,
            &descriptor.id,
            descriptor.price,
            self.payment_denom,
        );

        let gas = self.sender.estimate_gas(vec![msg.clone()], "").await?;
        if gas.fee_amount > payment.amount {
            return Err(PaymentError::MintRejected("amount below gas".into()));
        }
        if payment.amount - gas.fee_amount < descriptor.price {
            return Err(PaymentError::MintRejected("amount below price".into()));
        }

        let tx_hash = self
            .sender
            .send_tx(vec![msg], &payment.tx_hash, gas)
            .await?;
        info!(tx_hash, uid = %descriptor.id, "mint broadcast and confirmed");
        Ok(())
    }

    async fn refund(&self, payment: &IncomingPayment) -> Result<(), PaymentError> {
        let from_account =
            AccountId::from_str(&payment.from_address).map_err(|e| {
                PaymentError::MintRejected(format!("invalid refund recipient: {e}"))
            })?;

        let gross_msg = chain_tx::bank_send_message(
            self.service_wallet,
            &from_account,
            payment.amount,
            &payment.denom,
        );
        let gas = self
            .sender
            .estimate_gas(vec![gross_msg], &payment.tx_hash)
            .await?;

        if gas.fee_amount >= payment.amount {
            error!(tx_hash = %payment.tx_hash, "refund gas exceeds payment amount, skipping refund");
            return Ok(());
        }
        let net = payment.amount - gas.fee_amount;
        if net < MIN_REFUND_AMOUNT {
            error!(tx_hash = %payment.tx_hash, net, "refund below minimum, skipping (dust protection)");
            return Ok(());
        }

        let net_msg = chain_tx::bank_send_message(
            self.service_wallet,
            &from_account,
            net,
            &payment.denom,
        );
        let tx_hash = self
            .sender
            .send_tx(vec![net_msg], &payment.tx_hash, gas)
            .await?;
        info!(tx_hash, refunded_to = %payment.from_address, net, "refund broadcast and confirmed");
        Ok(())
    }
}
