//! Account-info lookups: `{account_number, sequence}` for the service wallet,
//! kept as a thin, separately-testable unit rather than inlined into the
//! sender (so it can be unit-tested against a fake gRPC channel the way the
//! source service's `account_info_client.go` was).

use async_trait::async_trait;
use cosmrs::proto::cosmos::auth::v1beta1::{
    BaseAccount, QueryAccountRequest, query_client::QueryClient,
};
use cosmrs::{AccountId, Any};
use prost::Message as _;
use tonic::transport::Channel;

#[derive(Debug, thiserror::Error)]
pub enum AccountInfoError {
    #[error("account query failed: {0}")]
    Grpc(#[from] tonic::Status),
    #[error("account {0} not found on chain")]
    NotFound(AccountId),
    #[error("account response could not be decoded as BaseAccount")]
    Decode,
}

/// Current on-chain `{account_number, sequence}` for a single address. Never
/// cached by the caller — every `send_tx`/`estimate_gas` must re-query this,
/// since the sequence advances with every confirmed transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountInfo {
    pub account_number: u64,
    pub sequence: u64,
}

/// The gRPC call itself, pulled out behind a trait so the lookup-and-decode
/// logic in [`AccountInfoClient::query`] can be unit tested against a fake
/// transport instead of a live channel.
#[async_trait]
trait AccountQueryTransport: Send + Sync {
    async fn fetch_account(&self, address: &str) -> Result<Option<Any>, tonic::Status>;
}

struct GrpcAccountQueryTransport {
    channel: Channel,
}

#[async_trait]
impl AccountQueryTransport for GrpcAccountQueryTransport {
    async fn fetch_account(&self, address: &str) -> Result<Option<Any>, tonic::Status> {
        let mut client = QueryClient::new(self.channel.clone());
        let response = client
            .account(QueryAccountRequest {
                address: address.to_string(),
            })
            .await?
            .into_inner();
        Ok(response.account)
    }
}

pub struct AccountInfoClient {
    transport: Box<dyn AccountQueryTransport>,
}

impl AccountInfoClient {
    pub fn new(channel: Channel) -> Self {
        Self {
            transport: Box::new(GrpcAccountQueryTransport { channel }),
        }
    }

    #[cfg(test)]
    fn with_transport(transport: impl AccountQueryTransport + 'static) -> Self {
        Self {
            transport: Box::new(transport),
        }
    }

    pub async fn query(&self, address: &AccountId) -> Result<AccountInfo, AccountInfoError> {
        let any = self
            .transport
            .fetch_account(&address.to_string())
            .await?
            .ok_or_else(|| AccountInfoError::NotFound(address.clone()))?;
        decode_base_account(&any)
    }
}

/// Pure decode step, split out from the gRPC call so it can be exercised
/// directly against hand-built `Any` payloads in tests.
fn decode_base_account(any: &Any) -> Result<AccountInfo, AccountInfoError> {
    let base_account =
        BaseAccount::decode(any.value.as_slice()).map_err(|_| AccountInfoError::Decode)?;
    Ok(AccountInfo {
        account_number: base_account.account_number,
        sequence: base_account.sequence,
    })
}
