//! On-demand NFT minting relayer entrypoint.
//!
//! Derives the service wallet's signer identity, dials the chain's gRPC and
//! RPC endpoints, and runs the relay engine until a shutdown signal or the
//! retry budget is exhausted.

use dotenvy::dotenv;
use ondemand_minting_relay::alerting::EmailAlertingSink;
use ondemand_minting_relay::catalog::HttpCatalogClient;
use ondemand_minting_relay::chain::query::TendermintChainQuerier;
use ondemand_minting_relay::chain::signer::SignerIdentity;
use ondemand_minting_relay::chain::tx::CosmosTxSender;
use ondemand_minting_relay::checkpoint::FileProgressStore;
use ondemand_minting_relay::config::Config;
use ondemand_minting_relay::relay::engine::{self, EngineConfig};
use ondemand_minting_relay::relay::tick::RelayTick;
use ondemand_minting_relay::sig_down::SigDown;
use ondemand_minting_relay::telemetry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    telemetry::init();

    let config = Config::load()?;

    let signer = SignerIdentity::derive(&config.wallet_mnemonic, &config.bech32_prefix)
        .unwrap_or_else(|e| {
            tracing::error!("signer derivation failed: {}", e);
            std::process::exit(1);
        });
    tracing::info!(address = %signer.address(), "service wallet derived");

    let grpc_channel = tonic::transport::Channel::from_shared(config.chain_grpc.clone())?
        .connect()
        .await?;
    let rpc = cosmrs::rpc::HttpClient::new(config.chain_rpc.as_str())?;

    let chain_id = cosmrs::tendermint::chain::Id::try_from(config.chain_id.clone())?;

    let progress = FileProgressStore::new(config.state_file.clone(), config.starting_height);
    let querier = TendermintChainQuerier::new(rpc.clone());
    let catalog = HttpCatalogClient::new(config.catalog_backend.clone(), config.catalog_api_key.clone());
    let sender = CosmosTxSender::new(
        signer.signing_key().clone(),
        signer.address().clone(),
        chain_id,
        config.payment_denom.clone(),
        config.gas_price,
        grpc_channel,
        rpc,
    );
    let alerting = EmailAlertingSink::new(
        &config.sendgrid_api_key,
        &config.email_from,
        &config.service_email,
        config.email_send_interval,
    );

    let sig_down = SigDown::try_new()?;
    let cancellation = sig_down.cancellation_token();

    let relay_tick = RelayTick {
        progress: &progress,
        querier: &querier,
        catalog: &catalog,
        sender: &sender,
        alerting: &alerting,
        service_wallet: signer.address(),
        payment_denom: &config.payment_denom,
    };
    let engine_config = EngineConfig {
        max_retries: config.max_retries,
        retry_interval: config.retry_interval,
        relay_interval: config.relay_interval,
    };

    engine::run_with_tick(&engine_config, &alerting, cancellation, &relay_tick).await;

    Ok(())
}
