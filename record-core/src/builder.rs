//! Record builder
//!
//! A [`RecordBuilder`] accumulates the outcome of exactly one logical
//! transaction while it is handled. Fields may be written any number of
//! times; [`RecordBuilder::seal`] consumes the builder and produces the
//! immutable [`SingleTransactionRecord`].
//!
//! Handlers normally see a builder through one of the narrow traits in
//! [`crate::capabilities`]; the record list and tests use the inherent
//! methods directly.

use crate::{
    crypto::transaction_hash,
    record::{
        AccountAmount, AssessedCustomFee, ContractActions, ContractBytecode,
        ContractFunctionResult, ContractResult, ContractStateChanges, Entropy, ExchangeRateSet,
        PendingAirdropRecord, SidecarPayload, SingleTransactionRecord, TokenAssociation,
        TokenTransferList, TransactionOutputs, TransactionReceipt, TransactionRecord,
        TransactionSidecarRecord, TransferList,
    },
    transaction::{Transaction, TransactionBody},
    types::{
        AccountId, ContractId, FileId, ReversingBehavior, ResponseCode, ScheduleId, Timestamp,
        TokenId, TokenType, TopicId, TransactionCategory, TransactionId,
    },
    Result,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::{collections::HashMap, fmt, sync::Arc};

/// Function rewriting a transaction right before it is externalized
pub type CustomizeFn = dyn Fn(Transaction) -> Result<Transaction> + Send + Sync;

/// Controls how a dispatched transaction appears in the record stream
#[derive(Clone, Default)]
pub enum TransactionCustomizer {
    /// Externalize the transaction as dispatched
    #[default]
    Noop,
    /// Never insert the record into the following list
    Suppressing,
    /// Rewrite the transaction at seal time
    Rewrite(Arc<CustomizeFn>),
}

impl TransactionCustomizer {
    /// Customizer applying `f` at seal time
    pub fn rewrite<F>(f: F) -> Self
    where
        F: Fn(Transaction) -> Result<Transaction> + Send + Sync + 'static,
    {
        TransactionCustomizer::Rewrite(Arc::new(f))
    }

    /// Whether the record must be left out of the following list entirely
    pub fn should_suppress_record(&self) -> bool {
        matches!(self, TransactionCustomizer::Suppressing)
    }
}

impl fmt::Debug for TransactionCustomizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionCustomizer::Noop => f.write_str("Noop"),
            TransactionCustomizer::Suppressing => f.write_str("Suppressing"),
            TransactionCustomizer::Rewrite(_) => f.write_str("Rewrite(..)"),
        }
    }
}

/// Mutable accumulator for one transaction's record
#[derive(Debug)]
pub struct RecordBuilder {
    // base transaction data
    transaction: Transaction,
    transaction_bytes: Bytes,
    // mutable: removals among siblings can shift the provisional time
    consensus_now: DateTime<Utc>,
    parent_consensus: Option<DateTime<Utc>>,
    transaction_id: Option<TransactionId>,

    // record fields assembled at seal time
    transfer_list: TransferList,
    token_transfer_lists: Vec<TokenTransferList>,
    assessed_custom_fees: Vec<AssessedCustomFee>,
    pending_airdrop_records: Vec<PendingAirdropRecord>,
    automatic_token_associations: Vec<TokenAssociation>,
    paid_staking_rewards: Vec<AccountAmount>,
    record: TransactionRecord,

    // receipt fields
    exchange_rate: Option<ExchangeRateSet>,
    receipt: TransactionReceipt,

    // sidecars, the flag marks migration output
    contract_state_changes: Vec<(ContractStateChanges, bool)>,
    contract_actions: Vec<(ContractActions, bool)>,
    contract_bytecodes: Vec<(ContractBytecode, bool)>,

    // never externalized; used for staking reward routing
    deleted_account_beneficiaries: HashMap<AccountId, AccountId>,
    explicit_reward_receiver_ids: Vec<AccountId>,

    // cached copies of externalized values, read back by handlers
    transaction_fee: u64,
    contract_function_result: Option<ContractFunctionResult>,
    token_id: Option<TokenId>,
    schedule_id: Option<ScheduleId>,
    token_type: Option<TokenType>,

    reversing_behavior: ReversingBehavior,
    category: TransactionCategory,
    customizer: TransactionCustomizer,
}

impl RecordBuilder {
    /// Create builder with the given policy, customizer and category
    pub fn new(
        reversing_behavior: ReversingBehavior,
        customizer: TransactionCustomizer,
        category: TransactionCategory,
    ) -> Self {
        Self {
            transaction: Transaction::default(),
            transaction_bytes: Bytes::new(),
            consensus_now: DateTime::<Utc>::UNIX_EPOCH,
            parent_consensus: None,
            transaction_id: None,
            transfer_list: TransferList::default(),
            token_transfer_lists: Vec::new(),
            assessed_custom_fees: Vec::new(),
            pending_airdrop_records: Vec::new(),
            automatic_token_associations: Vec::new(),
            paid_staking_rewards: Vec::new(),
            record: TransactionRecord::default(),
            exchange_rate: None,
            receipt: TransactionReceipt::default(),
            contract_state_changes: Vec::new(),
            contract_actions: Vec::new(),
            contract_bytecodes: Vec::new(),
            deleted_account_beneficiaries: HashMap::new(),
            explicit_reward_receiver_ids: Vec::new(),
            transaction_fee: 0,
            contract_function_result: None,
            token_id: None,
            schedule_id: None,
            token_type: None,
            reversing_behavior,
            customizer,
            category,
        }
    }

    /// Seal the builder into an immutable record bundle
    ///
    /// Fails only if the stored transaction cannot be parsed, which means the
    /// caller stored something that was never a transaction.
    pub fn seal(mut self) -> Result<SingleTransactionRecord> {
        if let TransactionCustomizer::Rewrite(customize) = &self.customizer {
            self.transaction = customize(std::mem::take(&mut self.transaction))?;
            self.transaction_bytes = self.transaction.signed_transaction_bytes.clone();
        }
        let functionality = self.transaction.body()?.data.kind();

        let mut receipt = self.receipt;
        // preceding records historically carry no rate unless both halves are known
        receipt.exchange_rate = self.exchange_rate.filter(ExchangeRateSet::is_complete);

        let consensus_timestamp = Timestamp::from(self.consensus_now);

        let mut automatic_token_associations = self.automatic_token_associations;
        automatic_token_associations.sort_by_key(TokenAssociation::sort_key);
        let mut new_pending_airdrops = self.pending_airdrop_records;
        new_pending_airdrops.sort_by(|a, b| a.pending_airdrop_id.cmp(&b.pending_airdrop_id));

        let transaction_record = TransactionRecord {
            receipt,
            transaction_hash: transaction_hash(&self.transaction_bytes),
            consensus_timestamp,
            transaction_id: self.transaction_id,
            parent_consensus_timestamp: self.parent_consensus.map(Timestamp::from),
            transfer_list: self.transfer_list,
            token_transfer_lists: self.token_transfer_lists,
            new_pending_airdrops,
            assessed_custom_fees: self.assessed_custom_fees,
            automatic_token_associations,
            paid_staking_rewards: self.paid_staking_rewards,
            ..self.record
        };

        let state_changes = self
            .contract_state_changes
            .into_iter()
            .map(|(changes, migration)| (SidecarPayload::StateChanges(changes), migration));
        let actions = self
            .contract_actions
            .into_iter()
            .map(|(actions, migration)| (SidecarPayload::Actions(actions), migration));
        let bytecodes = self
            .contract_bytecodes
            .into_iter()
            .map(|(bytecode, migration)| (SidecarPayload::Bytecode(bytecode), migration));
        let transaction_sidecar_records = state_changes
            .chain(actions)
            .chain(bytecodes)
            .map(|(payload, migration)| TransactionSidecarRecord {
                consensus_timestamp,
                migration,
                payload,
            })
            .collect();

        tracing::debug!(
            transaction_id = ?transaction_record.transaction_id,
            consensus_timestamp = %consensus_timestamp,
            status = %transaction_record.receipt.status,
            "End of transaction record"
        );

        Ok(SingleTransactionRecord {
            transaction: self.transaction,
            transaction_record,
            transaction_sidecar_records,
            transaction_outputs: TransactionOutputs {
                token_type: self.token_type,
                functionality,
            },
        })
    }

    /// Blank every side effect a rolled-back transaction must not externalize
    ///
    /// Status, memo, fee, contract result, schedule ref, entropy, topic id,
    /// node id and exchange rate are kept. A duplicate-schedule status keeps
    /// its schedule ids because they name a pre-existing schedule.
    pub fn null_out_side_effect_fields(&mut self) {
        self.receipt.serial_numbers.clear();
        self.token_transfer_lists.clear();
        self.pending_airdrop_records.clear();
        self.automatic_token_associations.clear();
        self.transfer_list = TransferList::default();
        self.paid_staking_rewards.clear();
        self.assessed_custom_fees.clear();

        self.transaction_fee = 0;
        self.contract_function_result = None;

        self.receipt.account_id = None;
        self.receipt.contract_id = None;
        self.receipt.file_id = None;
        self.receipt.token_id = None;
        if self.receipt.status != ResponseCode::IdenticalScheduleAlreadyCreated {
            self.receipt.schedule_id = None;
            self.receipt.scheduled_transaction_id = None;
        }
        self.receipt.topic_running_hash = Bytes::new();
        self.receipt.new_total_supply = 0;
        self.receipt.topic_running_hash_version = 0;
        self.receipt.topic_sequence_number = 0;
        self.record.alias = Bytes::new();
        self.record.ethereum_hash = Bytes::new();
        self.record.evm_address = Bytes::new();
    }

    /// Apply ancestor rollback to a reversible following builder
    pub(crate) fn revert(&mut self) {
        self.null_out_side_effect_fields();
        self.mark_reverted();
    }

    /// Apply user rollback to a reversible preceding builder
    ///
    /// Only the status changes. Side effects stay in the record.
    pub(crate) fn mark_reverted(&mut self) {
        if self.status().is_success() {
            self.set_status(ResponseCode::RevertedSuccess);
        }
    }

    // ---------------------------------------------------------------------
    // base transaction data

    /// Reversion policy
    pub fn reversing_behavior(&self) -> ReversingBehavior {
        self.reversing_behavior
    }

    /// Transaction category
    pub fn category(&self) -> TransactionCategory {
        self.category
    }

    /// Externalization customizer
    pub fn customizer(&self) -> &TransactionCustomizer {
        &self.customizer
    }

    /// Set the parent's consensus time
    pub fn set_parent_consensus(&mut self, parent_consensus: DateTime<Utc>) -> &mut Self {
        self.parent_consensus = Some(parent_consensus);
        self
    }

    /// Parent's consensus time, for children
    pub fn parent_consensus_timestamp(&self) -> Option<DateTime<Utc>> {
        self.parent_consensus
    }

    /// Set the consensus time
    pub fn set_consensus_timestamp(&mut self, now: DateTime<Utc>) -> &mut Self {
        self.consensus_now = now;
        self
    }

    /// Consensus time currently assigned
    pub fn consensus_timestamp(&self) -> DateTime<Utc> {
        self.consensus_now
    }

    /// Set the transaction; its signed bytes become the hashed bytes
    pub fn set_transaction(&mut self, transaction: Transaction) -> &mut Self {
        self.transaction_bytes = transaction.signed_transaction_bytes.clone();
        self.transaction = transaction;
        self
    }

    /// Override the bytes hashed into the record (the submitted form of a user transaction)
    pub fn set_transaction_bytes(&mut self, transaction_bytes: Bytes) -> &mut Self {
        self.transaction_bytes = transaction_bytes;
        self
    }

    /// Current transaction
    pub fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    /// Set the transaction id
    pub fn set_transaction_id(&mut self, transaction_id: TransactionId) -> &mut Self {
        self.transaction_id = Some(transaction_id);
        self
    }

    /// Transaction id, if set
    pub fn transaction_id(&self) -> Option<&TransactionId> {
        self.transaction_id.as_ref()
    }

    /// Rewrite the stored body so it carries the record's transaction id
    pub fn sync_body_id_from_record_id(&mut self) -> Result<&mut Self> {
        let mut body = self.transaction_body()?;
        body.transaction_id = self.transaction_id.clone();
        self.transaction = Transaction::from_body(&body)?;
        self.transaction_bytes = self.transaction.signed_transaction_bytes.clone();
        Ok(self)
    }

    /// Parse the in-progress transaction body
    pub fn transaction_body(&self) -> Result<TransactionBody> {
        self.transaction.body()
    }

    /// Set the memo
    pub fn set_memo(&mut self, memo: impl Into<String>) -> &mut Self {
        self.record.memo = memo.into();
        self
    }

    /// Memo
    pub fn memo(&self) -> &str {
        &self.record.memo
    }

    // ---------------------------------------------------------------------
    // record fields

    /// Set the fee charged
    pub fn set_transaction_fee(&mut self, transaction_fee: u64) -> &mut Self {
        self.transaction_fee = transaction_fee;
        self.record.transaction_fee = transaction_fee;
        self
    }

    /// Fee charged so far
    pub fn transaction_fee(&self) -> u64 {
        self.transaction_fee
    }

    /// Track an account that must be treated as in a reward situation
    pub fn track_explicit_reward_situation(&mut self, account_id: AccountId) -> &mut Self {
        if !self.explicit_reward_receiver_ids.contains(&account_id) {
            self.explicit_reward_receiver_ids.push(account_id);
        }
        self
    }

    /// Accounts explicitly in a reward situation, in insertion order
    pub fn explicit_reward_situation_ids(&self) -> &[AccountId] {
        &self.explicit_reward_receiver_ids
    }

    /// Set the contract call result
    pub fn set_contract_call_result(&mut self, result: Option<ContractFunctionResult>) -> &mut Self {
        self.record.contract_result = result.clone().map(ContractResult::Call);
        self.contract_function_result = result;
        self
    }

    /// Set the contract create result
    pub fn set_contract_create_result(
        &mut self,
        result: Option<ContractFunctionResult>,
    ) -> &mut Self {
        self.record.contract_result = result.clone().map(ContractResult::Create);
        self.contract_function_result = result;
        self
    }

    /// Whether a contract result is present
    pub fn has_contract_result(&self) -> bool {
        self.contract_function_result.is_some()
    }

    /// Gas used by the contract execution, if any
    pub fn gas_used_for_contract_txn(&self) -> Option<u64> {
        self.contract_function_result.as_ref().map(|r| r.gas_used)
    }

    /// Contract result, if any
    pub fn contract_function_result(&self) -> Option<&ContractFunctionResult> {
        self.contract_function_result.as_ref()
    }

    /// Set the hbar transfer list
    pub fn set_transfer_list(&mut self, transfer_list: TransferList) -> &mut Self {
        self.transfer_list = transfer_list;
        self
    }

    /// Hbar transfer list
    pub fn transfer_list(&self) -> &TransferList {
        &self.transfer_list
    }

    /// Replace the token transfer lists
    pub fn set_token_transfer_lists(&mut self, lists: Vec<TokenTransferList>) -> &mut Self {
        self.token_transfer_lists = lists;
        self
    }

    /// Token transfer lists
    pub fn token_transfer_lists(&self) -> &[TokenTransferList] {
        &self.token_transfer_lists
    }

    /// Append a token transfer list
    pub fn add_token_transfer_list(&mut self, list: TokenTransferList) -> &mut Self {
        self.token_transfer_lists.push(list);
        self
    }

    /// Append a pending airdrop
    pub fn add_pending_airdrop(&mut self, record: PendingAirdropRecord) -> &mut Self {
        self.pending_airdrop_records.push(record);
        self
    }

    /// Pending airdrops in arrival order
    pub fn pending_airdrops(&self) -> &[PendingAirdropRecord] {
        &self.pending_airdrop_records
    }

    /// Set the token type touched
    pub fn set_token_type(&mut self, token_type: TokenType) -> &mut Self {
        self.token_type = Some(token_type);
        self
    }

    /// Set the schedule whose execution produced this record
    pub fn set_schedule_ref(&mut self, schedule_ref: ScheduleId) -> &mut Self {
        self.record.schedule_ref = Some(schedule_ref);
        self
    }

    /// Replace the assessed custom fees
    pub fn set_assessed_custom_fees(&mut self, fees: Vec<AssessedCustomFee>) -> &mut Self {
        self.assessed_custom_fees = fees;
        self
    }

    /// Append an assessed custom fee
    pub fn add_assessed_custom_fee(&mut self, fee: AssessedCustomFee) -> &mut Self {
        self.assessed_custom_fees.push(fee);
        self
    }

    /// Assessed custom fees
    pub fn assessed_custom_fees(&self) -> &[AssessedCustomFee] {
        &self.assessed_custom_fees
    }

    /// Replace the automatic token associations
    pub fn set_automatic_token_associations(
        &mut self,
        associations: Vec<TokenAssociation>,
    ) -> &mut Self {
        self.automatic_token_associations = associations;
        self
    }

    /// Append an automatic token association
    pub fn add_automatic_token_association(&mut self, association: TokenAssociation) -> &mut Self {
        self.automatic_token_associations.push(association);
        self
    }

    /// Number of automatic associations so far
    pub fn num_auto_associations(&self) -> usize {
        self.automatic_token_associations.len()
    }

    /// Set the ethereum transaction hash
    pub fn set_ethereum_hash(&mut self, ethereum_hash: Bytes) -> &mut Self {
        self.record.ethereum_hash = ethereum_hash;
        self
    }

    /// Replace the paid staking rewards
    pub fn set_paid_staking_rewards(&mut self, rewards: Vec<AccountAmount>) -> &mut Self {
        self.paid_staking_rewards = rewards;
        self
    }

    /// Append a paid staking reward
    pub fn add_paid_staking_reward(&mut self, reward: AccountAmount) -> &mut Self {
        self.paid_staking_rewards.push(reward);
        self
    }

    /// Paid staking rewards
    pub fn paid_staking_rewards(&self) -> &[AccountAmount] {
        &self.paid_staking_rewards
    }

    /// Set a pseudorandom number
    pub fn set_entropy_number(&mut self, num: i32) -> &mut Self {
        self.record.entropy = Some(Entropy::Number(num));
        self
    }

    /// Set pseudorandom bytes
    pub fn set_entropy_bytes(&mut self, prng_bytes: Bytes) -> &mut Self {
        self.record.entropy = Some(Entropy::Bytes(prng_bytes));
        self
    }

    /// Set the EVM address of a created account
    pub fn set_evm_address(&mut self, evm_address: Bytes) -> &mut Self {
        self.record.evm_address = evm_address;
        self
    }

    /// Set the alias of a created account
    pub fn set_alias(&mut self, alias: Bytes) -> &mut Self {
        self.record.alias = alias;
        self
    }

    // ---------------------------------------------------------------------
    // receipt fields

    /// Set the status
    pub fn set_status(&mut self, status: ResponseCode) -> &mut Self {
        self.receipt.status = status;
        self
    }

    /// Current status
    pub fn status(&self) -> ResponseCode {
        self.receipt.status
    }

    /// In-progress receipt (exchange rate is attached at seal time)
    pub fn receipt(&self) -> &TransactionReceipt {
        &self.receipt
    }

    /// In-progress record fields not tracked elsewhere (memo, fee, contract result, ...)
    pub fn record_fields(&self) -> &TransactionRecord {
        &self.record
    }

    /// Set the created account
    pub fn set_account_id(&mut self, account_id: AccountId) -> &mut Self {
        self.receipt.account_id = Some(account_id);
        self
    }

    /// Set the created file
    pub fn set_file_id(&mut self, file_id: FileId) -> &mut Self {
        self.receipt.file_id = Some(file_id);
        self
    }

    /// Set the created contract
    ///
    /// Clears the receipt account id so the creation is not externalized twice.
    pub fn set_contract_id(&mut self, contract_id: Option<ContractId>) -> &mut Self {
        self.receipt.account_id = None;
        self.receipt.contract_id = contract_id;
        self
    }

    /// Set the exchange rates
    pub fn set_exchange_rate(&mut self, exchange_rate: Option<ExchangeRateSet>) -> &mut Self {
        self.exchange_rate = exchange_rate;
        self
    }

    /// Exchange rates
    pub fn exchange_rate(&self) -> Option<ExchangeRateSet> {
        self.exchange_rate
    }

    /// Set the created topic
    pub fn set_topic_id(&mut self, topic_id: TopicId) -> &mut Self {
        self.receipt.topic_id = Some(topic_id);
        self
    }

    /// Set the topic sequence number
    pub fn set_topic_sequence_number(&mut self, sequence_number: u64) -> &mut Self {
        self.receipt.topic_sequence_number = sequence_number;
        self
    }

    /// Set the topic running hash
    pub fn set_topic_running_hash(&mut self, running_hash: Bytes) -> &mut Self {
        self.receipt.topic_running_hash = running_hash;
        self
    }

    /// Set the topic running hash version
    pub fn set_topic_running_hash_version(&mut self, version: u64) -> &mut Self {
        self.receipt.topic_running_hash_version = version;
        self
    }

    /// Set the created token
    pub fn set_token_id(&mut self, token_id: TokenId) -> &mut Self {
        self.token_id = Some(token_id);
        self.receipt.token_id = Some(token_id);
        self
    }

    /// Token id last set
    pub fn token_id(&self) -> Option<TokenId> {
        self.token_id
    }

    /// Set the created node
    pub fn set_node_id(&mut self, node_id: u64) -> &mut Self {
        self.receipt.node_id = node_id;
        self
    }

    /// Set the supply after a mint/burn/wipe
    pub fn set_new_total_supply(&mut self, new_total_supply: u64) -> &mut Self {
        self.receipt.new_total_supply = new_total_supply;
        self
    }

    /// Supply after a mint/burn/wipe
    pub fn new_total_supply(&self) -> u64 {
        self.receipt.new_total_supply
    }

    /// Set the schedule
    pub fn set_schedule_id(&mut self, schedule_id: ScheduleId) -> &mut Self {
        self.schedule_id = Some(schedule_id);
        self.receipt.schedule_id = Some(schedule_id);
        self
    }

    /// Schedule id last set
    pub fn schedule_id(&self) -> Option<ScheduleId> {
        self.schedule_id
    }

    /// Set the id the scheduled transaction executes under
    pub fn set_scheduled_transaction_id(&mut self, transaction_id: TransactionId) -> &mut Self {
        self.receipt.scheduled_transaction_id = Some(transaction_id);
        self
    }

    /// Replace the minted serial numbers
    pub fn set_serial_numbers(&mut self, serial_numbers: Vec<i64>) -> &mut Self {
        self.receipt.serial_numbers = serial_numbers;
        self
    }

    /// Append a minted serial number
    pub fn add_serial_number(&mut self, serial_number: i64) -> &mut Self {
        self.receipt.serial_numbers.push(serial_number);
        self
    }

    /// Minted serial numbers
    pub fn serial_numbers(&self) -> &[i64] {
        &self.receipt.serial_numbers
    }

    // ---------------------------------------------------------------------
    // sidecars

    /// Append contract state changes
    pub fn add_contract_state_changes(
        &mut self,
        changes: ContractStateChanges,
        is_migration: bool,
    ) -> &mut Self {
        self.contract_state_changes.push((changes, is_migration));
        self
    }

    /// Append contract actions
    pub fn add_contract_actions(&mut self, actions: ContractActions, is_migration: bool) -> &mut Self {
        self.contract_actions.push((actions, is_migration));
        self
    }

    /// Append contract bytecode
    pub fn add_contract_bytecode(
        &mut self,
        bytecode: ContractBytecode,
        is_migration: bool,
    ) -> &mut Self {
        self.contract_bytecodes.push((bytecode, is_migration));
        self
    }

    // ---------------------------------------------------------------------
    // staking reward routing for deleted accounts

    /// Record the beneficiary of a deleted account
    pub fn add_beneficiary_for_deleted_account(
        &mut self,
        deleted_account_id: AccountId,
        beneficiary: AccountId,
    ) -> &mut Self {
        self.deleted_account_beneficiaries
            .insert(deleted_account_id, beneficiary);
        self
    }

    /// Number of accounts deleted
    pub fn number_of_deleted_accounts(&self) -> usize {
        self.deleted_account_beneficiaries.len()
    }

    /// Beneficiary of a deleted account
    pub fn deleted_account_beneficiary_for(&self, deleted_account_id: &AccountId) -> Option<AccountId> {
        self.deleted_account_beneficiaries
            .get(deleted_account_id)
            .copied()
    }
}
