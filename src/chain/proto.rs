//! Wire-level message the marketplace module accepts to mint an NFT.
//!
//! `cosmrs` has no built-in knowledge of this chain-specific module, so the
//! message is hand-encoded with `prost` the way any Cosmos SDK custom-module
//! client would.

use cosmrs::Any;
use cosmrs::proto::cosmos::base::v1beta1::Coin as ProtoCoin;
use prost::Message;

/// `cudoventures.cudosnode.marketplace.MsgMintNft`'s wire shape:
/// `(creator, denom_id, recipient, name, uri, data, uid, price)`.
#[derive(Clone, PartialEq, Message)]
pub struct MsgMintNft {
    #[prost(string, tag = "1")]
    pub creator: String,
    #[prost(string, tag = "2")]
    pub denom_id: String,
    #[prost(string, tag = "3")]
    pub recipient: String,
    #[prost(string, tag = "4")]
    pub name: String,
    #[prost(string, tag = "5")]
    pub uri: String,
    #[prost(string, tag = "6")]
    pub data: String,
    #[prost(string, tag = "7")]
    pub uid: String,
    #[prost(message, optional, tag = "8")]
    pub price: Option<ProtoCoin>,
}

pub const MSG_MINT_NFT_TYPE_URL: &str = "/cudoventures.cudosnode.marketplace.MsgMintNft";

impl MsgMintNft {
    pub fn to_any(&self) -> Any {
        Any {
            type_url: MSG_MINT_NFT_TYPE_URL.to_string(),
            value: self.encode_to_vec(),
        }
    }
}
