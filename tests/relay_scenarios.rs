//! End-to-end relay tick scenarios, exercising the engine against in-memory
//! fakes for every external collaborator (progress store, catalog, chain
//! querier, tx sender, alerting).

use cosmrs::AccountId;
use ondemand_minting_relay::alerting::fake::RecordingAlertingSink;
use ondemand_minting_relay::catalog::fake::FakeCatalogClient;
use ondemand_minting_relay::chain::query::fake::FakeChainQuerier;
use ondemand_minting_relay::chain::query::ChainTx;
use ondemand_minting_relay::chain::tx::fake::FakeTxSender;
use ondemand_minting_relay::checkpoint::fake::InMemoryProgressStore;
use ondemand_minting_relay::checkpoint::ProgressStore;
use ondemand_minting_relay::relay::tick::RelayTick;
use ondemand_minting_relay::timestamp::UnixMillis;
use ondemand_minting_relay::types::{GasEstimate, NftDescriptor, NftStatus};
use std::collections::BTreeMap;

const PAYMENT_DENOM: &str = "acudos";

fn service_wallet() -> AccountId {
    AccountId::new("cudos", &[7u8; 20]).unwrap()
}

fn buyer(seed: u8) -> AccountId {
    AccountId::new("cudos", &[seed; 20]).unwrap()
}

fn incoming_tx(hash: &str, height: i64, from: &AccountId, to: &AccountId, amount: u128, memo: &str) -> ChainTx {
    let mut attributes = BTreeMap::new();
    attributes.insert("transfer.recipient".to_string(), to.to_string());
    attributes.insert("transfer.sender".to_string(), from.to_string());
    attributes.insert(
        "transfer.amount".to_string(),
        format!("{amount}{PAYMENT_DENOM}"),
    );
    ChainTx {
        hash: hash.to_string(),
        height,
        attributes,
        memo: memo.to_string(),
        message_count: 1,
    }
}

fn far_future_ms() -> UnixMillis {
    UnixMillis(UnixMillis::now().unwrap().0 + 365 * 24 * 60 * 60 * 1000)
}

/// A valid payment against a queued, affordable NFT produces one mint
/// broadcast and advances the checkpoint.
#[tokio::test]
async fn happy_mint_advances_checkpoint() {
    let wallet = service_wallet();
    let buyer_addr = buyer(1);
    let querier = FakeChainQuerier::new();
    querier.push(incoming_tx(
        "h1",
        10,
        &buyer_addr,
        &wallet,
        8_005_000_000_000_000_000,
        r#"{"uuid":"nft#1"}"#,
    ));

    let catalog = FakeCatalogClient::new();
    catalog.insert(NftDescriptor {
        id: "nft#1".to_string(),
        price: 8_000_000_000_000_000_000,
        name: "Test NFT".to_string(),
        uri: "ipfs://x".to_string(),
        data: "{}".to_string(),
        denom_id: "testcollection".to_string(),
        status: NftStatus::Queued,
        price_valid_until: far_future_ms(),
    });

    let sender = FakeTxSender::new(GasEstimate {
        gas_limit: 300_000,
        fee_amount: 5_000_000_000_000,
    });
    let alerting = RecordingAlertingSink::new();
    let progress = InMemoryProgressStore::new(1);

    let tick = RelayTick {
        progress: &progress,
        querier: &querier,
        catalog: &catalog,
        sender: &sender,
        alerting: &alerting,
        service_wallet: &wallet,
        payment_denom: PAYMENT_DENOM,
    };

    tick.run().await.unwrap();

    assert_eq!(progress.get().await.unwrap().height, 10);
    let sent = sender.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].1, "h1");
}

/// A rejected NFT status triggers a refund instead of a mint.
#[tokio::test]
async fn refund_on_rejected_status() {
    let wallet = service_wallet();
    let buyer_addr = buyer(2);
    let querier = FakeChainQuerier::new();
    querier.push(incoming_tx(
        "h2",
        11,
        &buyer_addr,
        &wallet,
        8_005_000_000_000_000_000,
        r#"{"uuid":"nft#2"}"#,
    ));

    let catalog = FakeCatalogClient::new();
    catalog.insert(NftDescriptor {
        id: "nft#2".to_string(),
        price: 8_000_000_000_000_000_000,
        name: "Rejected NFT".to_string(),
        uri: "ipfs://y".to_string(),
        data: "{}".to_string(),
        denom_id: "testcollection".to_string(),
        status: NftStatus::Rejected,
        price_valid_until: far_future_ms(),
    });

    let sender = FakeTxSender::new(GasEstimate {
        gas_limit: 300_000,
        fee_amount: 1_000_000_000_000_000, // well under min_refund_amount headroom
    });
    let alerting = RecordingAlertingSink::new();
    let progress = InMemoryProgressStore::new(1);

    let tick = RelayTick {
        progress: &progress,
        querier: &querier,
        catalog: &catalog,
        sender: &sender,
        alerting: &alerting,
        service_wallet: &wallet,
        payment_denom: PAYMENT_DENOM,
    };

    tick.run().await.unwrap();

    assert_eq!(progress.get().await.unwrap().height, 11);
    let sent = sender.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].1, "h2");
}

/// After refund-gas subtraction the net refund would be below
/// `MIN_REFUND_AMOUNT`, so no broadcast happens and the checkpoint still
/// advances.
#[tokio::test]
async fn refund_below_dust_threshold_is_skipped() {
    let wallet = service_wallet();
    let buyer_addr = buyer(3);
    let querier = FakeChainQuerier::new();
    querier.push(incoming_tx(
        "h3",
        12,
        &buyer_addr,
        &wallet,
        1_000_000_000_000_000_000,
        r#"{"uuid":"nft#2"}"#,
    ));

    let catalog = FakeCatalogClient::new();
    catalog.insert(NftDescriptor {
        id: "nft#2".to_string(),
        price: 8_000_000_000_000_000_000,
        name: "Rejected NFT".to_string(),
        uri: "ipfs://y".to_string(),
        data: "{}".to_string(),
        denom_id: "testcollection".to_string(),
        status: NftStatus::Rejected,
        price_valid_until: far_future_ms(),
    });

    // Gas fee leaves net well below 5e18.
    let sender = FakeTxSender::new(GasEstimate {
        gas_limit: 300_000,
        fee_amount: 999_000_000_000_000_000,
    });
    let alerting = RecordingAlertingSink::new();
    let progress = InMemoryProgressStore::new(1);

    let tick = RelayTick {
        progress: &progress,
        querier: &querier,
        catalog: &catalog,
        sender: &sender,
        alerting: &alerting,
        service_wallet: &wallet,
        payment_denom: PAYMENT_DENOM,
    };

    tick.run().await.unwrap();

    assert_eq!(progress.get().await.unwrap().height, 12);
    assert!(sender.sent.lock().unwrap().is_empty());
}

/// A payment whose mint tx already exists on-chain (memo = tx hash) is
/// recognized and skipped, not re-minted — this is what makes a restart
/// from an old checkpoint safe.
#[tokio::test]
async fn restart_idempotence_skips_existing_mint() {
    let wallet = service_wallet();
    let buyer_addr = buyer(1);
    let querier = FakeChainQuerier::new();
    querier.push(incoming_tx(
        "h1",
        10,
        &buyer_addr,
        &wallet,
        8_005_000_000_000_000_000,
        r#"{"uuid":"nft#1"}"#,
    ));
    // The prior mint already landed on-chain with memo = h1.
    let mut mint_attrs = BTreeMap::new();
    mint_attrs.insert(
        "marketplace_mint_nft.buyer".to_string(),
        buyer_addr.to_string(),
    );
    mint_attrs.insert(
        "marketplace_mint_nft.creator".to_string(),
        wallet.to_string(),
    );
    querier.push(ChainTx {
        hash: "mint-tx-1".to_string(),
        height: 10,
        attributes: mint_attrs,
        memo: "h1".to_string(),
        message_count: 1,
    });

    let catalog = FakeCatalogClient::new();
    let sender = FakeTxSender::new(GasEstimate {
        gas_limit: 300_000,
        fee_amount: 5_000_000_000_000,
    });
    let alerting = RecordingAlertingSink::new();
    let progress = InMemoryProgressStore::new(1);

    let tick = RelayTick {
        progress: &progress,
        querier: &querier,
        catalog: &catalog,
        sender: &sender,
        alerting: &alerting,
        service_wallet: &wallet,
        payment_denom: PAYMENT_DENOM,
    };

    tick.run().await.unwrap();

    assert_eq!(progress.get().await.unwrap().height, 10);
    assert!(sender.sent.lock().unwrap().is_empty());
}

/// A catalog transport error aborts the tick without advancing the
/// checkpoint and without broadcasting anything.
#[tokio::test]
async fn catalog_transient_error_aborts_tick() {
    let wallet = service_wallet();
    let buyer_addr = buyer(4);
    let querier = FakeChainQuerier::new();
    querier.push(incoming_tx(
        "h4",
        13,
        &buyer_addr,
        &wallet,
        8_005_000_000_000_000_000,
        r#"{"uuid":"nft#4"}"#,
    ));

    let catalog = FakeCatalogClient::new();
    catalog.fail_next_call();

    let sender = FakeTxSender::new(GasEstimate {
        gas_limit: 300_000,
        fee_amount: 5_000_000_000_000,
    });
    let alerting = RecordingAlertingSink::new();
    let progress = InMemoryProgressStore::new(1);

    let tick = RelayTick {
        progress: &progress,
        querier: &querier,
        catalog: &catalog,
        sender: &sender,
        alerting: &alerting,
        service_wallet: &wallet,
        payment_denom: PAYMENT_DENOM,
    };

    let result = tick.run().await;
    assert!(result.is_err());
    assert_eq!(progress.get().await.unwrap().height, 1);
    assert!(sender.sent.lock().unwrap().is_empty());
}

/// A payment in an unrecognized denom is skipped as invalid traffic, but the
/// checkpoint still advances to its height.
#[tokio::test]
async fn wrong_denom_payment_is_skipped() {
    let wallet = service_wallet();
    let buyer_addr = buyer(5);
    let querier = FakeChainQuerier::new();
    let mut attrs = BTreeMap::new();
    attrs.insert("transfer.recipient".to_string(), wallet.to_string());
    attrs.insert("transfer.sender".to_string(), buyer_addr.to_string());
    attrs.insert("transfer.amount".to_string(), "1000000ucudos".to_string());
    querier.push(ChainTx {
        hash: "h5".to_string(),
        height: 14,
        attributes: attrs,
        memo: r#"{"uuid":"nft#5"}"#.to_string(),
        message_count: 1,
    });

    let catalog = FakeCatalogClient::new();
    let sender = FakeTxSender::new(GasEstimate {
        gas_limit: 300_000,
        fee_amount: 5_000_000_000_000,
    });
    let alerting = RecordingAlertingSink::new();
    let progress = InMemoryProgressStore::new(1);

    let tick = RelayTick {
        progress: &progress,
        querier: &querier,
        catalog: &catalog,
        sender: &sender,
        alerting: &alerting,
        service_wallet: &wallet,
        payment_denom: PAYMENT_DENOM,
    };

    tick.run().await.unwrap();

    assert_eq!(progress.get().await.unwrap().height, 14);
    assert!(sender.sent.lock().unwrap().is_empty());
}

/// No transactions at all leaves the checkpoint unchanged.
#[tokio::test]
async fn empty_batch_is_a_no_op() {
    let wallet = service_wallet();
    let querier = FakeChainQuerier::new();
    let catalog = FakeCatalogClient::new();
    let sender = FakeTxSender::new(GasEstimate {
        gas_limit: 300_000,
        fee_amount: 5_000_000_000_000,
    });
    let alerting = RecordingAlertingSink::new();
    let progress = InMemoryProgressStore::new(7);

    let tick = RelayTick {
        progress: &progress,
        querier: &querier,
        catalog: &catalog,
        sender: &sender,
        alerting: &alerting,
        service_wallet: &wallet,
        payment_denom: PAYMENT_DENOM,
    };

    tick.run().await.unwrap();
    assert_eq!(progress.get().await.unwrap().height, 7);
}

/// A transaction bundling more than one message is never treated as a valid
/// incoming payment, even if its flattened attributes happen to look like
/// one — the attribute map can't distinguish "one transfer" from "a transfer
/// plus something else" once multiple messages' events are merged.
#[tokio::test]
async fn bundled_multi_message_tx_is_not_accepted_as_payment() {
    let wallet = service_wallet();
    let buyer_addr = buyer(6);
    let querier = FakeChainQuerier::new();
    let mut tx = incoming_tx(
        "h6",
        15,
        &buyer_addr,
        &wallet,
        8_005_000_000_000_000_000,
        r#"{"uuid":"nft#6"}"#,
    );
    tx.message_count = 2;
    querier.push(tx);

    let catalog = FakeCatalogClient::new();
    catalog.insert(NftDescriptor {
        id: "nft#6".to_string(),
        price: 8_000_000_000_000_000_000,
        name: "Bundled NFT".to_string(),
        uri: "ipfs://z".to_string(),
        data: "{}".to_string(),
        denom_id: "testcollection".to_string(),
        status: NftStatus::Queued,
        price_valid_until: far_future_ms(),
    });

    let sender = FakeTxSender::new(GasEstimate {
        gas_limit: 300_000,
        fee_amount: 5_000_000_000_000,
    });
    let alerting = RecordingAlertingSink::new();
    let progress = InMemoryProgressStore::new(1);

    let tick = RelayTick {
        progress: &progress,
        querier: &querier,
        catalog: &catalog,
        sender: &sender,
        alerting: &alerting,
        service_wallet: &wallet,
        payment_denom: PAYMENT_DENOM,
    };

    tick.run().await.unwrap();

    assert_eq!(progress.get().await.unwrap().height, 15);
    assert!(sender.sent.lock().unwrap().is_empty());
}
