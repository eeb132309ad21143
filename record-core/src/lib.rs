//! Record construction core
//!
//! Builds the ordered, consensus-critical record stream for one handled
//! transaction: the user transaction's record plus the synthetic preceding
//! and following records it spawned.
//!
//! # Architecture
//!
//! - **Record Builder**: Mutable accumulator for one transaction, sealed once
//! - **Capability traits**: Narrow builder views per transaction family
//! - **Record List**: Timestamp allocation, capacity limits, revert and removal
//! - **Replay**: Deterministic script replay for cross-node comparison
//!
//! # Invariants
//!
//! - Deterministic output: same calls, same consensus time → same records
//! - Preceding records occupy T-1, T-2, ... ; following records T+1, T+2, ...
//! - Irreversible records survive every revert untouched
//! - Sealed records are immutable

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod types;
pub mod transaction;
pub mod record;
pub mod builder;
pub mod capabilities;
pub mod record_list;
pub mod crypto;
pub mod error;
pub mod config;
pub mod metrics;
pub mod replay;

// Re-exports
pub use builder::{RecordBuilder, TransactionCustomizer};
pub use config::{Config, HandleConfig};
pub use error::{Error, Result};
pub use record::{SingleTransactionRecord, TransactionReceipt, TransactionRecord};
pub use record_list::{BuilderHandle, RecordListBuilder, RecordListCheckpoint, RecordListResult};
pub use types::{
    AccountId, ChildList, LimitBehavior, ResponseCode, ReversingBehavior, Timestamp,
    TransactionCategory, TransactionId,
};
