//! Sealed record types
//!
//! Everything here is what downstream stream writers consume. Field order
//! and list order are part of the consensus output.

use crate::{
    crypto::hash_bytes_sha384,
    transaction::Transaction,
    types::{
        AccountId, ContractId, FileId, Functionality, ScheduleId, Timestamp, TokenId, TokenType,
        TopicId, TransactionId, ResponseCode,
    },
    Result,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Signed hbar adjustment for one account
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountAmount {
    /// Adjusted account
    pub account_id: AccountId,
    /// Tinybar delta (negative for debits)
    pub amount: i64,
    /// Whether the adjustment used an allowance
    pub is_approval: bool,
}

impl AccountAmount {
    /// Plain (non-approval) adjustment
    pub fn new(account_id: AccountId, amount: i64) -> Self {
        Self {
            account_id,
            amount,
            is_approval: false,
        }
    }
}

/// Hbar adjustments of a transaction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferList {
    /// Adjustments, in the order the handler produced them
    pub account_amounts: Vec<AccountAmount>,
}

/// Transfer of one NFT serial
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftTransfer {
    /// Sender
    pub sender_account_id: AccountId,
    /// Receiver
    pub receiver_account_id: AccountId,
    /// Serial number
    pub serial_number: i64,
}

/// Adjustments for one token
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenTransferList {
    /// Token
    pub token: TokenId,
    /// Fungible adjustments
    pub transfers: Vec<AccountAmount>,
    /// NFT movements
    pub nft_transfers: Vec<NftTransfer>,
    /// Expected decimals, if asserted by the payer
    pub expected_decimals: Option<u32>,
}

/// Custom fee charged as part of a transfer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessedCustomFee {
    /// Amount charged
    pub amount: i64,
    /// Denominating token (`None` for hbar)
    pub token_id: Option<TokenId>,
    /// Fee collector
    pub fee_collector_account_id: AccountId,
    /// Accounts that paid the fee
    pub effective_payer_account_ids: Vec<AccountId>,
}

/// Token associated automatically during a transfer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAssociation {
    /// Token
    pub token_id: TokenId,
    /// Account
    pub account_id: AccountId,
}

impl TokenAssociation {
    /// Sort key: token number, then account number
    pub fn sort_key(&self) -> (i64, i64) {
        (self.token_id.num, self.account_id.num)
    }
}

/// Token being held for a receiver until claimed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PendingTokenReference {
    /// Fungible token
    FungibleToken(TokenId),
    /// One NFT serial
    NonFungibleToken {
        /// NFT collection
        token_id: TokenId,
        /// Serial number
        serial_number: i64,
    },
}

impl PendingTokenReference {
    fn sort_key(&self) -> (i64, u8, i64) {
        match self {
            PendingTokenReference::FungibleToken(token_id) => (token_id.num, 0, 0),
            PendingTokenReference::NonFungibleToken {
                token_id,
                serial_number,
            } => (token_id.num, 1, *serial_number),
        }
    }
}

/// Identifies one pending airdrop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAirdropId {
    /// Sending account
    pub sender_id: AccountId,
    /// Receiving account
    pub receiver_id: AccountId,
    /// Token held pending
    pub token_reference: PendingTokenReference,
}

impl Ord for PendingAirdropId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sender_id
            .num
            .cmp(&other.sender_id.num)
            .then(self.receiver_id.num.cmp(&other.receiver_id.num))
            .then(self.token_reference.sort_key().cmp(&other.token_reference.sort_key()))
    }
}

impl PartialOrd for PendingAirdropId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Pending airdrop created by a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAirdropRecord {
    /// Airdrop id
    pub pending_airdrop_id: PendingAirdropId,
    /// Fungible amount pending (0 for NFTs)
    pub pending_airdrop_value: u64,
}

/// Hbar/cent conversion rate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRate {
    /// Hbar side of the rate
    pub hbar_equiv: i32,
    /// Cent side of the rate
    pub cent_equiv: i32,
    /// When this rate expires
    pub expiration_time: Option<Timestamp>,
}

/// Current and next exchange rates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRateSet {
    /// Rate in effect
    pub current_rate: Option<ExchangeRate>,
    /// Rate taking effect at the current rate's expiry
    pub next_rate: Option<ExchangeRate>,
}

impl ExchangeRateSet {
    /// Both rates present
    pub fn is_complete(&self) -> bool {
        self.current_rate.is_some() && self.next_rate.is_some()
    }
}

/// Result of an EVM execution
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractFunctionResult {
    /// Executing contract
    pub contract_id: Option<ContractId>,
    /// Return data
    pub contract_call_result: Bytes,
    /// Revert reason or error message
    pub error_message: String,
    /// Gas consumed
    pub gas_used: u64,
    /// Contracts created during execution
    pub created_contract_ids: Vec<ContractId>,
    /// EVM address of a created contract
    pub evm_address: Bytes,
}

/// Which contract result slot of the record is populated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractResult {
    /// Result of a contract call
    Call(ContractFunctionResult),
    /// Result of a contract creation
    Create(ContractFunctionResult),
}

/// Pseudorandom output of a PRNG transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Entropy {
    /// Number in `[0, range)`
    Number(i32),
    /// 48 random bytes
    Bytes(Bytes),
}

/// Storage slot read or written
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageChange {
    /// Slot key
    pub slot: Bytes,
    /// Value read
    pub value_read: Bytes,
    /// Value written, if any
    pub value_written: Option<Bytes>,
}

/// Storage changes of one contract
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractStateChange {
    /// Contract
    pub contract_id: ContractId,
    /// Slot changes
    pub storage_changes: Vec<StorageChange>,
}

/// State-change sidecar payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractStateChanges {
    /// Per-contract changes
    pub contract_state_changes: Vec<ContractStateChange>,
}

/// One call frame of an EVM trace
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractAction {
    /// Call depth
    pub call_depth: i32,
    /// Caller account
    pub caller: Option<AccountId>,
    /// Callee contract
    pub recipient_contract: Option<ContractId>,
    /// Gas supplied
    pub gas: u64,
    /// Gas used
    pub gas_used: u64,
    /// Value transferred
    pub value: u64,
    /// Input data
    pub input: Bytes,
    /// Output data
    pub output: Bytes,
}

/// Action sidecar payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractActions {
    /// Call frames
    pub contract_actions: Vec<ContractAction>,
}

/// Bytecode sidecar payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractBytecode {
    /// Contract
    pub contract_id: Option<ContractId>,
    /// Init code
    pub initcode: Bytes,
    /// Deployed code
    pub runtime_bytecode: Bytes,
}

/// Payload of a sidecar record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SidecarPayload {
    /// Contract storage changes
    StateChanges(ContractStateChanges),
    /// EVM call trace
    Actions(ContractActions),
    /// Contract bytecode
    Bytecode(ContractBytecode),
}

/// Sidecar record tied to a transaction record by consensus timestamp
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSidecarRecord {
    /// Consensus timestamp of the owning record
    pub consensus_timestamp: Timestamp,
    /// Produced by a state migration rather than a transaction
    pub migration: bool,
    /// Payload
    pub payload: SidecarPayload,
}

/// Receipt of a transaction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    /// Outcome
    pub status: ResponseCode,
    /// Created account
    pub account_id: Option<AccountId>,
    /// Created file
    pub file_id: Option<FileId>,
    /// Created contract
    pub contract_id: Option<ContractId>,
    /// Exchange rates (only when both are known)
    pub exchange_rate: Option<ExchangeRateSet>,
    /// Created topic
    pub topic_id: Option<TopicId>,
    /// Topic sequence number after a submit
    pub topic_sequence_number: u64,
    /// Topic running hash after a submit
    pub topic_running_hash: Bytes,
    /// Topic running hash version
    pub topic_running_hash_version: u64,
    /// Created token
    pub token_id: Option<TokenId>,
    /// Supply after a mint/burn/wipe
    pub new_total_supply: u64,
    /// Created or referenced schedule
    pub schedule_id: Option<ScheduleId>,
    /// Id the scheduled transaction executes under
    pub scheduled_transaction_id: Option<TransactionId>,
    /// Minted NFT serials
    pub serial_numbers: Vec<i64>,
    /// Created node
    pub node_id: u64,
}

/// Record of a transaction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Receipt
    pub receipt: TransactionReceipt,
    /// SHA-384 of the transaction bytes
    pub transaction_hash: Bytes,
    /// Consensus timestamp
    pub consensus_timestamp: Timestamp,
    /// Transaction id (with nonce for children)
    pub transaction_id: Option<TransactionId>,
    /// Memo
    pub memo: String,
    /// Fee charged
    pub transaction_fee: u64,
    /// EVM result, if any
    pub contract_result: Option<ContractResult>,
    /// Hbar adjustments
    pub transfer_list: TransferList,
    /// Token adjustments
    pub token_transfer_lists: Vec<TokenTransferList>,
    /// Schedule whose execution produced this record
    pub schedule_ref: Option<ScheduleId>,
    /// Custom fees charged
    pub assessed_custom_fees: Vec<AssessedCustomFee>,
    /// Automatic associations, sorted
    pub automatic_token_associations: Vec<TokenAssociation>,
    /// Consensus timestamp of the parent (children only)
    pub parent_consensus_timestamp: Option<Timestamp>,
    /// Alias of a created account
    pub alias: Bytes,
    /// Ethereum transaction hash
    pub ethereum_hash: Bytes,
    /// Staking rewards paid
    pub paid_staking_rewards: Vec<AccountAmount>,
    /// PRNG output
    pub entropy: Option<Entropy>,
    /// EVM address of a created account
    pub evm_address: Bytes,
    /// Pending airdrops, sorted
    pub new_pending_airdrops: Vec<PendingAirdropRecord>,
}

/// Typed summary of a sealed transaction for callers that only need receipt-adjacent info
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOutputs {
    /// Token type touched, if any
    pub token_type: Option<TokenType>,
    /// Functionality of the externalized transaction
    pub functionality: Functionality,
}

/// Immutable bundle produced by sealing one record builder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleTransactionRecord {
    /// Externalized transaction
    pub transaction: Transaction,
    /// Record
    pub transaction_record: TransactionRecord,
    /// Sidecars, in state-changes/actions/bytecode order
    pub transaction_sidecar_records: Vec<TransactionSidecarRecord>,
    /// Typed summary
    pub transaction_outputs: TransactionOutputs,
}

impl SingleTransactionRecord {
    /// Create canonical bytes for hashing and cross-node comparison
    pub fn canonical_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// SHA-384 over the canonical bytes
    pub fn digest(&self) -> Result<Bytes> {
        Ok(hash_bytes_sha384(&self.canonical_bytes()?))
    }

    /// Consensus timestamp of the record
    pub fn consensus_timestamp(&self) -> Timestamp {
        self.transaction_record.consensus_timestamp
    }

    /// Receipt status
    pub fn status(&self) -> ResponseCode {
        self.transaction_record.receipt.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn airdrop(sender: i64, receiver: i64, token: PendingTokenReference) -> PendingAirdropId {
        PendingAirdropId {
            sender_id: AccountId::new(sender),
            receiver_id: AccountId::new(receiver),
            token_reference: token,
        }
    }

    #[test]
    fn test_pending_airdrop_id_ordering() {
        let fungible = PendingTokenReference::FungibleToken(TokenId::new(5));
        let nft = |serial| PendingTokenReference::NonFungibleToken {
            token_id: TokenId::new(5),
            serial_number: serial,
        };

        assert!(airdrop(1, 9, fungible) < airdrop(2, 1, fungible));
        assert!(airdrop(1, 2, fungible) < airdrop(1, 3, fungible));
        assert!(airdrop(1, 2, fungible) < airdrop(1, 2, nft(1)));
        assert!(airdrop(1, 2, nft(1)) < airdrop(1, 2, nft(2)));
    }

    #[test]
    fn test_exchange_rate_set_completeness() {
        let rate = ExchangeRate {
            hbar_equiv: 1,
            cent_equiv: 12,
            expiration_time: None,
        };
        let partial = ExchangeRateSet {
            current_rate: Some(rate),
            next_rate: None,
        };
        assert!(!partial.is_complete());
        assert!(ExchangeRateSet {
            next_rate: Some(rate),
            ..partial
        }
        .is_complete());
    }
}
