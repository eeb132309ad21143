//! Core types for record construction
//!
//! All types are designed for:
//! - Deterministic serialization (bincode)
//! - Total ordering where records must be sorted
//! - Nanosecond-exact consensus time arithmetic

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        pub struct $name {
            /// Shard number
            pub shard: i64,
            /// Realm number
            pub realm: i64,
            /// Entity number within the realm
            pub num: i64,
        }

        impl $name {
            /// Create id in shard 0, realm 0
            pub fn new(num: i64) -> Self {
                Self { shard: 0, realm: 0, num }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}.{}.{}", self.shard, self.realm, self.num)
            }
        }
    };
}

entity_id!(
    /// Account identifier
    AccountId
);
entity_id!(
    /// File identifier
    FileId
);
entity_id!(
    /// Smart contract identifier
    ContractId
);
entity_id!(
    /// Consensus topic identifier
    TopicId
);
entity_id!(
    /// Token identifier
    TokenId
);
entity_id!(
    /// Schedule identifier
    ScheduleId
);

/// Wire-level timestamp (seconds + nanos since the Unix epoch)
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Timestamp {
    /// Whole seconds
    pub seconds: i64,
    /// Nanoseconds within the second, `0..1_000_000_000`
    pub nanos: i32,
}

impl Timestamp {
    /// Create from seconds and nanos
    pub fn new(seconds: i64, nanos: i32) -> Self {
        Self { seconds, nanos }
    }

    /// Convert to a consensus instant
    pub fn to_instant(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.seconds, self.nanos as u32).unwrap_or_default()
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(instant: DateTime<Utc>) -> Self {
        Self {
            seconds: instant.timestamp(),
            nanos: instant.timestamp_subsec_nanos() as i32,
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.seconds, self.nanos)
    }
}

/// Offset a consensus instant by a (possibly negative) number of nanoseconds
pub fn plus_nanos(instant: DateTime<Utc>, nanos: i64) -> DateTime<Utc> {
    instant + Duration::nanoseconds(nanos)
}

/// Transaction identifier
///
/// Children of a user transaction share its payer and valid start and are
/// distinguished by `nonce`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId {
    /// Paying account
    pub account_id: Option<AccountId>,
    /// Valid start of the transaction
    pub valid_start: Option<Timestamp>,
    /// Whether this id belongs to a scheduled execution
    pub scheduled: bool,
    /// Child nonce (0 for user transactions)
    pub nonce: i32,
}

impl TransactionId {
    /// Create a user transaction id
    pub fn new(account_id: AccountId, valid_start: Timestamp) -> Self {
        Self {
            account_id: Some(account_id),
            valid_start: Some(valid_start),
            scheduled: false,
            nonce: 0,
        }
    }

    /// Copy of this id with the given nonce
    pub fn with_nonce(&self, nonce: i32) -> Self {
        Self {
            nonce,
            ..self.clone()
        }
    }

    /// Copy of this id flagged as scheduled
    pub fn as_scheduled(&self) -> Self {
        Self {
            scheduled: true,
            ..self.clone()
        }
    }

    /// True if no field has been set
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let payer = self.account_id.unwrap_or_default();
        let start = self.valid_start.unwrap_or_default();
        write!(f, "{}@{}", payer, start)?;
        if self.scheduled {
            write!(f, "?scheduled")?;
        }
        if self.nonce != 0 {
            write!(f, "/{}", self.nonce)?;
        }
        Ok(())
    }
}

/// Transaction outcome status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ResponseCode {
    /// Not yet handled
    #[default]
    Ok,
    /// Handled successfully
    Success,
    /// A fee schedule file part was uploaded
    FeeScheduleFilePartUploaded,
    /// Succeeded, but an expected operation did not happen
    SuccessButMissingExpectedOperation,
    /// Succeeded, then rolled back with its parent
    RevertedSuccess,
    /// A schedule with identical body already exists
    IdenticalScheduleAlreadyCreated,
    /// Too many preceding or following records requested
    MaxChildRecordsExceeded,
    /// Payer cannot cover fees
    InsufficientPayerBalance,
    /// Account balance too low for a transfer
    InsufficientAccountBalance,
    /// Signature check failed
    InvalidSignature,
    /// Account does not exist
    InvalidAccountId,
    /// Token does not exist
    InvalidTokenId,
    /// Contract execution reverted
    ContractRevertExecuted,
    /// Gas exhausted
    InsufficientGas,
    /// Unexpected internal failure
    FailInvalid,
}

impl ResponseCode {
    /// Statuses treated as success when a parent rolls back
    pub const SUCCESSES: [ResponseCode; 4] = [
        ResponseCode::Ok,
        ResponseCode::Success,
        ResponseCode::FeeScheduleFilePartUploaded,
        ResponseCode::SuccessButMissingExpectedOperation,
    ];

    /// Whether this status counts as a success
    pub fn is_success(&self) -> bool {
        Self::SUCCESSES.contains(self)
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResponseCode::Ok => "OK",
            ResponseCode::Success => "SUCCESS",
            ResponseCode::FeeScheduleFilePartUploaded => "FEE_SCHEDULE_FILE_PART_UPLOADED",
            ResponseCode::SuccessButMissingExpectedOperation => {
                "SUCCESS_BUT_MISSING_EXPECTED_OPERATION"
            }
            ResponseCode::RevertedSuccess => "REVERTED_SUCCESS",
            ResponseCode::IdenticalScheduleAlreadyCreated => "IDENTICAL_SCHEDULE_ALREADY_CREATED",
            ResponseCode::MaxChildRecordsExceeded => "MAX_CHILD_RECORDS_EXCEEDED",
            ResponseCode::InsufficientPayerBalance => "INSUFFICIENT_PAYER_BALANCE",
            ResponseCode::InsufficientAccountBalance => "INSUFFICIENT_ACCOUNT_BALANCE",
            ResponseCode::InvalidSignature => "INVALID_SIGNATURE",
            ResponseCode::InvalidAccountId => "INVALID_ACCOUNT_ID",
            ResponseCode::InvalidTokenId => "INVALID_TOKEN_ID",
            ResponseCode::ContractRevertExecuted => "CONTRACT_REVERT_EXECUTED",
            ResponseCode::InsufficientGas => "INSUFFICIENT_GAS",
            ResponseCode::FailInvalid => "FAIL_INVALID",
        };
        f.write_str(name)
    }
}

/// What happens to a record when an ancestor transaction rolls back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReversingBehavior {
    /// Kept, side effects blanked, success status becomes `REVERTED_SUCCESS`
    Reversible,
    /// Erased from the record list as if it never happened
    Removable,
    /// Committed regardless of ancestors
    Irreversible,
}

/// Where a transaction sits relative to the user transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionCategory {
    /// The consensus-ordered user transaction
    User,
    /// Synthetic transaction placed before the user transaction
    Preceding,
    /// Synthetic transaction placed after its parent
    Child,
    /// Triggered execution of a scheduled transaction
    Scheduled,
}

/// Whether a preceding allocation is bounded by the configured maximum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LimitBehavior {
    /// Subject to `max_preceding_records`
    Limited,
    /// Bulk bootstrap and maintenance work only
    Unlimited,
}

/// Which side of the user transaction a child record sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChildList {
    /// Before the user transaction
    Preceding,
    /// After the user transaction
    Following,
}

impl fmt::Display for ChildList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChildList::Preceding => f.write_str("preceding"),
            ChildList::Following => f.write_str("following"),
        }
    }
}

/// Token type touched by a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenType {
    /// Interchangeable units
    FungibleCommon,
    /// Unique serial-numbered units
    NonFungibleUnique,
}

/// Kind of operation carried by a transaction body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Functionality {
    /// No operation set
    None,
    /// Create an account
    CryptoCreate,
    /// Move value between accounts
    CryptoTransfer,
    /// Delete an account
    CryptoDelete,
    /// Create a contract
    ContractCreate,
    /// Call a contract
    ContractCall,
    /// Create a token
    TokenCreate,
    /// Mint token supply
    TokenMint,
    /// Airdrop tokens
    TokenAirdrop,
    /// Create a schedule
    ScheduleCreate,
    /// Delete a schedule
    ScheduleDelete,
    /// Submit a topic message
    ConsensusSubmitMessage,
    /// Generate pseudorandom output
    UtilPrng,
    /// Update node stakes
    NodeStakeUpdate,
}
