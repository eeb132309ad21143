//! Hashing for records
//!
//! This module provides:
//! - SHA-384 transaction hashes (the record's `transaction_hash` field)
//! - SHA-384 digests over sealed record lists, for comparing node outputs

use crate::{record::SingleTransactionRecord, Result};
use bytes::Bytes;
use sha2::{Digest, Sha384};

/// Length of a SHA-384 digest
pub const SHA384_LEN: usize = 48;

/// Hash arbitrary bytes using SHA-384
pub fn hash_bytes_sha384(data: &[u8]) -> Bytes {
    let mut hasher = Sha384::new();
    hasher.update(data);
    Bytes::copy_from_slice(&hasher.finalize())
}

/// Hash of the serialized transaction, as externalized in its record
pub fn transaction_hash(transaction_bytes: &[u8]) -> Bytes {
    hash_bytes_sha384(transaction_bytes)
}

/// Digest of an ordered list of sealed records
///
/// Folds the canonical bytes of every record, in order, into one SHA-384.
/// Two nodes that handled the same transaction must produce the same value.
pub fn record_list_digest(records: &[SingleTransactionRecord]) -> Result<Bytes> {
    let mut hasher = Sha384::new();
    for record in records {
        let canonical = record.canonical_bytes()?;
        hasher.update((canonical.len() as u64).to_be_bytes());
        hasher.update(&canonical);
    }
    Ok(Bytes::copy_from_slice(&hasher.finalize()))
}
