//! Narrow builder views handed to transaction handlers
//!
//! Each trait exposes only the fields one family of transactions may write.
//! [`RecordBuilder`] implements all of them, so a handler written against
//! `&mut impl TokenSupplyStreamBuilder` cannot touch, say, the topic fields.

use crate::{
    builder::RecordBuilder,
    record::{
        AccountAmount, AssessedCustomFee, ContractActions, ContractBytecode,
        ContractFunctionResult, ContractStateChanges, ExchangeRateSet, PendingAirdropRecord,
        TokenAssociation, TokenTransferList, TransferList,
    },
    transaction::TransactionBody,
    types::{
        AccountId, ContractId, FileId, ReversingBehavior, ResponseCode, ScheduleId, TokenId,
        TokenType, TopicId, TransactionCategory, TransactionId,
    },
    Result,
};
use bytes::Bytes;

/// Fields every handler may touch
pub trait StreamBuilder {
    /// Current status
    fn status(&self) -> ResponseCode;
    /// Set the status
    fn set_status(&mut self, status: ResponseCode) -> &mut Self;
    /// Set the memo
    fn set_memo(&mut self, memo: String) -> &mut Self;
    /// Set the exchange rates
    fn set_exchange_rate(&mut self, exchange_rate: Option<ExchangeRateSet>) -> &mut Self;
    /// Reversion policy
    fn reversing_behavior(&self) -> ReversingBehavior;
    /// Category
    fn category(&self) -> TransactionCategory;
    /// Parse the in-progress transaction body
    fn transaction_body(&self) -> Result<TransactionBody>;
    /// Blank side effects of a rolled-back transaction
    fn null_out_side_effect_fields(&mut self);
}

/// Fee and staking reward fields
pub trait FeeStreamBuilder: StreamBuilder {
    /// Fee charged so far
    fn transaction_fee(&self) -> u64;
    /// Set the fee charged
    fn set_transaction_fee(&mut self, fee: u64) -> &mut Self;
    /// Append a paid staking reward
    fn add_paid_staking_reward(&mut self, reward: AccountAmount) -> &mut Self;
    /// Paid staking rewards
    fn paid_staking_rewards(&self) -> &[AccountAmount];
    /// Track an account in an explicit reward situation
    fn track_explicit_reward_situation(&mut self, account_id: AccountId) -> &mut Self;
}

/// Account creation
pub trait CryptoCreateStreamBuilder: StreamBuilder {
    /// Set the created account
    fn set_account_id(&mut self, account_id: AccountId) -> &mut Self;
    /// Set the alias
    fn set_alias(&mut self, alias: Bytes) -> &mut Self;
    /// Set the EVM address
    fn set_evm_address(&mut self, evm_address: Bytes) -> &mut Self;
}

/// Hbar and token transfers
pub trait CryptoTransferStreamBuilder: StreamBuilder {
    /// Set the hbar transfer list
    fn set_transfer_list(&mut self, transfer_list: TransferList) -> &mut Self;
    /// Hbar transfer list
    fn transfer_list(&self) -> &TransferList;
    /// Append a token transfer list
    fn add_token_transfer_list(&mut self, list: TokenTransferList) -> &mut Self;
    /// Token transfer lists
    fn token_transfer_lists(&self) -> &[TokenTransferList];
    /// Append an assessed custom fee
    fn add_assessed_custom_fee(&mut self, fee: AssessedCustomFee) -> &mut Self;
    /// Append an automatic association
    fn add_automatic_token_association(&mut self, association: TokenAssociation) -> &mut Self;
    /// Number of automatic associations so far
    fn num_auto_associations(&self) -> usize;
}

/// Airdrops, which transfer or park tokens
pub trait TokenAirdropStreamBuilder: CryptoTransferStreamBuilder {
    /// Append a pending airdrop
    fn add_pending_airdrop(&mut self, record: PendingAirdropRecord) -> &mut Self;
}

/// Account deletion
pub trait CryptoDeleteStreamBuilder: StreamBuilder {
    /// Record the beneficiary of a deleted account
    fn add_beneficiary_for_deleted_account(
        &mut self,
        deleted_account_id: AccountId,
        beneficiary: AccountId,
    ) -> &mut Self;
    /// Number of accounts deleted
    fn number_of_deleted_accounts(&self) -> usize;
    /// Beneficiary of a deleted account
    fn deleted_account_beneficiary_for(&self, deleted_account_id: &AccountId) -> Option<AccountId>;
}

/// Token creation
pub trait TokenCreateStreamBuilder: StreamBuilder {
    /// Set the created token
    fn set_token_id(&mut self, token_id: TokenId) -> &mut Self;
    /// Token id last set
    fn token_id(&self) -> Option<TokenId>;
    /// Set the token type
    fn set_token_type(&mut self, token_type: TokenType) -> &mut Self;
}

/// Mint, burn and wipe
pub trait TokenSupplyStreamBuilder: StreamBuilder {
    /// Set the token type
    fn set_token_type(&mut self, token_type: TokenType) -> &mut Self;
    /// Set the supply after the change
    fn set_new_total_supply(&mut self, new_total_supply: u64) -> &mut Self;
    /// Supply after the change
    fn new_total_supply(&self) -> u64;
    /// Append a minted serial
    fn add_serial_number(&mut self, serial_number: i64) -> &mut Self;
    /// Minted serials
    fn serial_numbers(&self) -> &[i64];
}

/// Shared by calls and creates
pub trait ContractOperationStreamBuilder: StreamBuilder {
    /// Set the contract id
    fn set_contract_id(&mut self, contract_id: Option<ContractId>) -> &mut Self;
    /// Set the ethereum transaction hash
    fn set_ethereum_hash(&mut self, ethereum_hash: Bytes) -> &mut Self;
    /// Append state changes
    fn add_contract_state_changes(
        &mut self,
        changes: ContractStateChanges,
        is_migration: bool,
    ) -> &mut Self;
    /// Append actions
    fn add_contract_actions(&mut self, actions: ContractActions, is_migration: bool) -> &mut Self;
    /// Append bytecode
    fn add_contract_bytecode(&mut self, bytecode: ContractBytecode, is_migration: bool)
        -> &mut Self;
    /// Whether a result has been set
    fn has_contract_result(&self) -> bool;
    /// Gas used, if a result has been set
    fn gas_used_for_contract_txn(&self) -> Option<u64>;
}

/// Contract call
pub trait ContractCallStreamBuilder: ContractOperationStreamBuilder {
    /// Set the call result
    fn set_contract_call_result(&mut self, result: Option<ContractFunctionResult>) -> &mut Self;
}

/// Contract creation
pub trait ContractCreateStreamBuilder: ContractOperationStreamBuilder {
    /// Set the create result
    fn set_contract_create_result(&mut self, result: Option<ContractFunctionResult>)
        -> &mut Self;
}

/// Topic creation and message submission
pub trait ConsensusStreamBuilder: StreamBuilder {
    /// Set the created topic
    fn set_topic_id(&mut self, topic_id: TopicId) -> &mut Self;
    /// Set the sequence number
    fn set_topic_sequence_number(&mut self, sequence_number: u64) -> &mut Self;
    /// Set the running hash
    fn set_topic_running_hash(&mut self, running_hash: Bytes) -> &mut Self;
    /// Set the running hash version
    fn set_topic_running_hash_version(&mut self, version: u64) -> &mut Self;
}

/// Schedule create, sign and delete
pub trait ScheduleStreamBuilder: StreamBuilder {
    /// Set the schedule
    fn set_schedule_id(&mut self, schedule_id: ScheduleId) -> &mut Self;
    /// Schedule id last set
    fn schedule_id(&self) -> Option<ScheduleId>;
    /// Set the id the scheduled transaction executes under
    fn set_scheduled_transaction_id(&mut self, transaction_id: TransactionId) -> &mut Self;
    /// Set the schedule whose execution produced this record
    fn set_schedule_ref(&mut self, schedule_ref: ScheduleId) -> &mut Self;
}

/// Pseudorandom number generation
pub trait PrngStreamBuilder: StreamBuilder {
    /// Set a number
    fn set_entropy_number(&mut self, num: i32) -> &mut Self;
    /// Set bytes
    fn set_entropy_bytes(&mut self, prng_bytes: Bytes) -> &mut Self;
}

/// File creation
pub trait FileStreamBuilder: StreamBuilder {
    /// Set the created file
    fn set_file_id(&mut self, file_id: FileId) -> &mut Self;
}

/// Node creation
pub trait NodeStreamBuilder: StreamBuilder {
    /// Set the created node
    fn set_node_id(&mut self, node_id: u64) -> &mut Self;
}

impl StreamBuilder for RecordBuilder {
    fn status(&self) -> ResponseCode {
        RecordBuilder::status(self)
    }

    fn set_status(&mut self, status: ResponseCode) -> &mut Self {
        RecordBuilder::set_status(self, status)
    }

    fn set_memo(&mut self, memo: String) -> &mut Self {
        RecordBuilder::set_memo(self, memo)
    }

    fn set_exchange_rate(&mut self, exchange_rate: Option<ExchangeRateSet>) -> &mut Self {
        RecordBuilder::set_exchange_rate(self, exchange_rate)
    }

    fn reversing_behavior(&self) -> ReversingBehavior {
        RecordBuilder::reversing_behavior(self)
    }

    fn category(&self) -> TransactionCategory {
        RecordBuilder::category(self)
    }

    fn transaction_body(&self) -> Result<TransactionBody> {
        RecordBuilder::transaction_body(self)
    }

    fn null_out_side_effect_fields(&mut self) {
        RecordBuilder::null_out_side_effect_fields(self)
    }
}

impl FeeStreamBuilder for RecordBuilder {
    fn transaction_fee(&self) -> u64 {
        RecordBuilder::transaction_fee(self)
    }

    fn set_transaction_fee(&mut self, fee: u64) -> &mut Self {
        RecordBuilder::set_transaction_fee(self, fee)
    }

    fn add_paid_staking_reward(&mut self, reward: AccountAmount) -> &mut Self {
        RecordBuilder::add_paid_staking_reward(self, reward)
    }

    fn paid_staking_rewards(&self) -> &[AccountAmount] {
        RecordBuilder::paid_staking_rewards(self)
    }

    fn track_explicit_reward_situation(&mut self, account_id: AccountId) -> &mut Self {
        RecordBuilder::track_explicit_reward_situation(self, account_id)
    }
}

impl CryptoCreateStreamBuilder for RecordBuilder {
    fn set_account_id(&mut self, account_id: AccountId) -> &mut Self {
        RecordBuilder::set_account_id(self, account_id)
    }

    fn set_alias(&mut self, alias: Bytes) -> &mut Self {
        RecordBuilder::set_alias(self, alias)
    }

    fn set_evm_address(&mut self, evm_address: Bytes) -> &mut Self {
        RecordBuilder::set_evm_address(self, evm_address)
    }
}

impl CryptoTransferStreamBuilder for RecordBuilder {
    fn set_transfer_list(&mut self, transfer_list: TransferList) -> &mut Self {
        RecordBuilder::set_transfer_list(self, transfer_list)
    }

    fn transfer_list(&self) -> &TransferList {
        RecordBuilder::transfer_list(self)
    }

    fn add_token_transfer_list(&mut self, list: TokenTransferList) -> &mut Self {
        RecordBuilder::add_token_transfer_list(self, list)
    }

    fn token_transfer_lists(&self) -> &[TokenTransferList] {
        RecordBuilder::token_transfer_lists(self)
    }

    fn add_assessed_custom_fee(&mut self, fee: AssessedCustomFee) -> &mut Self {
        RecordBuilder::add_assessed_custom_fee(self, fee)
    }

    fn add_automatic_token_association(&mut self, association: TokenAssociation) -> &mut Self {
        RecordBuilder::add_automatic_token_association(self, association)
    }

    fn num_auto_associations(&self) -> usize {
        RecordBuilder::num_auto_associations(self)
    }
}

impl TokenAirdropStreamBuilder for RecordBuilder {
    fn add_pending_airdrop(&mut self, record: PendingAirdropRecord) -> &mut Self {
        RecordBuilder::add_pending_airdrop(self, record)
    }
}

impl CryptoDeleteStreamBuilder for RecordBuilder {
    fn add_beneficiary_for_deleted_account(
        &mut self,
        deleted_account_id: AccountId,
        beneficiary: AccountId,
    ) -> &mut Self {
        RecordBuilder::add_beneficiary_for_deleted_account(self, deleted_account_id, beneficiary)
    }

    fn number_of_deleted_accounts(&self) -> usize {
        RecordBuilder::number_of_deleted_accounts(self)
    }

    fn deleted_account_beneficiary_for(&self, deleted_account_id: &AccountId) -> Option<AccountId> {
        RecordBuilder::deleted_account_beneficiary_for(self, deleted_account_id)
    }
}

impl TokenCreateStreamBuilder for RecordBuilder {
    fn set_token_id(&mut self, token_id: TokenId) -> &mut Self {
        RecordBuilder::set_token_id(self, token_id)
    }

    fn token_id(&self) -> Option<TokenId> {
        RecordBuilder::token_id(self)
    }

    fn set_token_type(&mut self, token_type: TokenType) -> &mut Self {
        RecordBuilder::set_token_type(self, token_type)
    }
}

impl TokenSupplyStreamBuilder for RecordBuilder {
    fn set_token_type(&mut self, token_type: TokenType) -> &mut Self {
        RecordBuilder::set_token_type(self, token_type)
    }

    fn set_new_total_supply(&mut self, new_total_supply: u64) -> &mut Self {
        RecordBuilder::set_new_total_supply(self, new_total_supply)
    }

    fn new_total_supply(&self) -> u64 {
        RecordBuilder::new_total_supply(self)
    }

    fn add_serial_number(&mut self, serial_number: i64) -> &mut Self {
        RecordBuilder::add_serial_number(self, serial_number)
    }

    fn serial_numbers(&self) -> &[i64] {
        RecordBuilder::serial_numbers(self)
    }
}

impl ContractOperationStreamBuilder for RecordBuilder {
    fn set_contract_id(&mut self, contract_id: Option<ContractId>) -> &mut Self {
        RecordBuilder::set_contract_id(self, contract_id)
    }

    fn set_ethereum_hash(&mut self, ethereum_hash: Bytes) -> &mut Self {
        RecordBuilder::set_ethereum_hash(self, ethereum_hash)
    }

    fn add_contract_state_changes(
        &mut self,
        changes: ContractStateChanges,
        is_migration: bool,
    ) -> &mut Self {
        RecordBuilder::add_contract_state_changes(self, changes, is_migration)
    }

    fn add_contract_actions(&mut self, actions: ContractActions, is_migration: bool) -> &mut Self {
        RecordBuilder::add_contract_actions(self, actions, is_migration)
    }

    fn add_contract_bytecode(
        &mut self,
        bytecode: ContractBytecode,
        is_migration: bool,
    ) -> &mut Self {
        RecordBuilder::add_contract_bytecode(self, bytecode, is_migration)
    }

    fn has_contract_result(&self) -> bool {
        RecordBuilder::has_contract_result(self)
    }

    fn gas_used_for_contract_txn(&self) -> Option<u64> {
        RecordBuilder::gas_used_for_contract_txn(self)
    }
}

impl ContractCallStreamBuilder for RecordBuilder {
    fn set_contract_call_result(&mut self, result: Option<ContractFunctionResult>) -> &mut Self {
        RecordBuilder::set_contract_call_result(self, result)
    }
}

impl ContractCreateStreamBuilder for RecordBuilder {
    fn set_contract_create_result(
        &mut self,
        result: Option<ContractFunctionResult>,
    ) -> &mut Self {
        RecordBuilder::set_contract_create_result(self, result)
    }
}

impl ConsensusStreamBuilder for RecordBuilder {
    fn set_topic_id(&mut self, topic_id: TopicId) -> &mut Self {
        RecordBuilder::set_topic_id(self, topic_id)
    }

    fn set_topic_sequence_number(&mut self, sequence_number: u64) -> &mut Self {
        RecordBuilder::set_topic_sequence_number(self, sequence_number)
    }

    fn set_topic_running_hash(&mut self, running_hash: Bytes) -> &mut Self {
        RecordBuilder::set_topic_running_hash(self, running_hash)
    }

    fn set_topic_running_hash_version(&mut self, version: u64) -> &mut Self {
        RecordBuilder::set_topic_running_hash_version(self, version)
    }
}

impl ScheduleStreamBuilder for RecordBuilder {
    fn set_schedule_id(&mut self, schedule_id: ScheduleId) -> &mut Self {
        RecordBuilder::set_schedule_id(self, schedule_id)
    }

    fn schedule_id(&self) -> Option<ScheduleId> {
        RecordBuilder::schedule_id(self)
    }

    fn set_scheduled_transaction_id(&mut self, transaction_id: TransactionId) -> &mut Self {
        RecordBuilder::set_scheduled_transaction_id(self, transaction_id)
    }

    fn set_schedule_ref(&mut self, schedule_ref: ScheduleId) -> &mut Self {
        RecordBuilder::set_schedule_ref(self, schedule_ref)
    }
}

impl PrngStreamBuilder for RecordBuilder {
    fn set_entropy_number(&mut self, num: i32) -> &mut Self {
        RecordBuilder::set_entropy_number(self, num)
    }

    fn set_entropy_bytes(&mut self, prng_bytes: Bytes) -> &mut Self {
        RecordBuilder::set_entropy_bytes(self, prng_bytes)
    }
}

impl FileStreamBuilder for RecordBuilder {
    fn set_file_id(&mut self, file_id: FileId) -> &mut Self {
        RecordBuilder::set_file_id(self, file_id)
    }
}

impl NodeStreamBuilder for RecordBuilder {
    fn set_node_id(&mut self, node_id: u64) -> &mut Self {
        RecordBuilder::set_node_id(self, node_id)
    }
}
