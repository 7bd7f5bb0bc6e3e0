//! Paginated on-chain search for historical transactions matching event
//! predicates.

use async_trait::async_trait;
use cosmrs::rpc::query::Query;
use cosmrs::rpc::{Client, HttpClient, Order};
use std::collections::BTreeMap;

const PAGE_SIZE: u32 = 100;

#[derive(Debug, thiserror::Error)]
pub enum ChainQueryError {
    #[error("tendermint rpc query failed: {0}")]
    Rpc(#[from] cosmrs::rpc::Error),
}

/// A decoded chain transaction, opaque to this module beyond what the relay
/// engine needs to classify it: its hash, height, raw event attributes, and
/// the shape of its message list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainTx {
    pub hash: String,
    pub height: i64,
    /// Raw `(attribute_key, attribute_value)` pairs from all events attached
    /// to this transaction, flattened. The relay engine's idempotence checks
    /// read specific keys out of this (e.g. `marketplace_mint_nft.buyer`).
    ///
    /// Note that a transaction bundling more than one message can produce
    /// events that collapse into the same attribute keys here; callers that
    /// need to distinguish a single-message transfer/mint from a bundled one
    /// must also check `message_count`.
    pub attributes: BTreeMap<String, String>,
    /// The transaction's memo field, used for idempotence correlation.
    pub memo: String,
    /// Number of messages in the transaction body. A valid incoming payment
    /// or mint/refund broadcast always carries exactly one message; anything
    /// else is rejected rather than trusted, since a bundled transaction's
    /// flattened `attributes` can't otherwise be told apart from a plain
    /// single-message one.
    pub message_count: usize,
}

/// ANDed equality predicates over Tendermint event attributes, e.g.
/// `[("transfer.recipient", W), ("tx.height", ">10")]`.
pub type Predicates = Vec<(String, String)>;

#[async_trait]
pub trait ChainQuerier: Send + Sync {
    /// Returns every transaction with `height >= min_height` matching all of
    /// `predicates`, in ascending height order. Pagination is exhaustive:
    /// every page is fetched, never just the first.
    async fn query(
        &self,
        predicates: &Predicates,
        min_height: i64,
    ) -> Result<Vec<ChainTx>, ChainQueryError>;
}

pub struct TendermintChainQuerier {
    client: HttpClient,
}

impl TendermintChainQuerier {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ChainQuerier for TendermintChainQuerier {
    async fn query(
        &self,
        predicates: &Predicates,
        min_height: i64,
    ) -> Result<Vec<ChainTx>, ChainQueryError> {
        let query_str = build_query_string(predicates, min_height);
        let query: Query = query_str
            .parse()
            .map_err(|e: cosmrs::rpc::Error| ChainQueryError::Rpc(e))?;

        let mut page = 1u32;
        let mut results = Vec::new();
        loop {
            let response = self
                .client
                .tx_search(query.clone(), false, page, PAGE_SIZE, Order::Ascending)
                .await?;

            let fetched = response.txs.len() as u32;
            for tx in response.txs {
                results.push(decode_tx(tx));
            }

            if page * PAGE_SIZE >= response.total_count || fetched == 0 {
                break;
            }
            page += 1;
        }

        results.sort_by_key(|tx| tx.height);
        Ok(results)
    }
}

fn build_query_string(predicates: &Predicates, min_height: i64) -> String {
    let mut parts: Vec<String> = predicates
        .iter()
        .map(|(key, value)| format!("{key}='{value}'"))
        .collect();
    parts.push(format!("tx.height>={min_height}"));
    parts.join(" AND ")
}

fn decode_tx(tx: cosmrs::rpc::endpoint::tx::Response) -> ChainTx {
    let mut attributes = BTreeMap::new();
    for event in &tx.tx_result.events {
        for attribute in &event.attributes {
            let key = format!("{}.{}", event.kind, attribute.key);
            attributes.insert(key, attribute.value.clone());
        }
    }
    let (memo, message_count) = match cosmrs::Tx::from_bytes(&tx.tx) {
        Ok(decoded) => (decoded.body.memo, decoded.body.messages.len()),
        Err(_) => (String::new(), 0),
    };
    ChainTx {
        hash: tx.hash.to_string(),
        height: tx.height.value() as i64,
        attributes,
        memo,
        message_count,
    }
}
