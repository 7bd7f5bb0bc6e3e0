//! Queries the off-chain catalog for NFT eligibility, price, and metadata.

use crate::types::NftDescriptor;
use async_trait::async_trait;
use tracing::instrument;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("catalog returned malformed body: {0}")]
    Decode(String),
}

/// The catalog authoritatively evaluates eligibility (price, price validity,
/// status, recipient entitlement). A `None` result means "not eligible,
/// refund" and is not an error; any other error aborts the tick.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    async fn get_nft(
        &self,
        uid: &str,
        recipient_address: &str,
        paid_amount: u128,
    ) -> Result<Option<NftDescriptor>, CatalogError>;
}

/// HTTP-backed catalog client, matching the source service's
/// `aura-pool`/`cudos-markets` backend protocol.
pub struct HttpCatalogClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpCatalogClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    #[instrument(skip(self), fields(uid, recipient_address), err)]
    async fn get_nft(
        &self,
        uid: &str,
        recipient_address: &str,
        paid_amount: u128,
    ) -> Result<Option<NftDescriptor>, CatalogError> {
        let url = format!(
            "{}/api/v1/nft/on-demand-minting-nft/{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            uid,
            recipient_address,
            paid_amount
        );
        let response = self
            .client
            .get(&url)
            .header("aura-pool-api-key", &self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            tracing::info!(status = %response.status(), uid, "catalog: not eligible");
            return Ok(None);
        }

        let descriptor = response
            .json::<NftDescriptor>()
            .await
            .map_err(|e| CatalogError::Decode(e.to_string()))?;
        Ok(Some(descriptor))
    }
}
