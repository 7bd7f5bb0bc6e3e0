//! On-demand NFT minting relayer.
//!
//! Watches a Cosmos SDK chain for CUDOS-denominated payments into a
//! service-controlled wallet, validates each against an off-chain catalog,
//! and mints the requested NFT or refunds the payer. See [`relay::engine`]
//! for the top-level control loop.
//!
//! # Modules
//!
//! - [`checkpoint`] — durable "last processed height" progress store.
//! - [`catalog`] — off-chain catalog client (eligibility, price, metadata).
//! - [`chain`] — signer identity, mint-message codec, account info, chain
//!   querier, and transaction builder/sender.
//! - [`relay`] — the orchestrating control loop: outer retry wrapper, inner
//!   tick, per-payment processing.
//! - [`alerting`] — rate-limited error notification sink.
//! - [`config`] — environment-driven process configuration.
//! - [`types`] — shared data model.
//! - [`timestamp`] — millisecond Unix timestamp used for price-validity
//!   windows.
//! - [`util`] — small shared helpers.
//! - [`telemetry`] — logging setup.
//! - [`sig_down`] — graceful shutdown signal handling.

pub mod alerting;
pub mod catalog;
pub mod chain;
pub mod checkpoint;
pub mod config;
pub mod fee_http;
pub mod relay;
pub mod sig_down;
pub mod telemetry;
pub mod timestamp;
pub mod types;
pub mod util;
