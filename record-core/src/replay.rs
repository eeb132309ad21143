//! Deterministic replay of record list scripts
//!
//! A [`HandleScript`] is a JSON description of how an execution engine drove
//! one record list: slot requests, field writes, reverts and checkpoints.
//! Replaying it yields the ordered records plus a SHA-384 digest, so the
//! output of two nodes (or two builds) can be compared byte for byte.
//!
//! ```json
//! {
//!   "consensus_time": "2024-01-01T00:00:00.000001000Z",
//!   "user": [{ "write": "status", "status": "Success" }],
//!   "steps": [
//!     { "op": "add_child", "label": "c1", "category": "Child" },
//!     { "op": "write", "target": "c1", "write": "memo", "memo": "hello" },
//!     { "op": "revert_children_of", "target": "user" }
//!   ]
//! }
//! ```

use crate::{
    builder::{RecordBuilder, TransactionCustomizer},
    capabilities::{
        ConsensusStreamBuilder, ContractCallStreamBuilder, ContractOperationStreamBuilder,
        CryptoCreateStreamBuilder, CryptoTransferStreamBuilder, FeeStreamBuilder,
        PrngStreamBuilder, ScheduleStreamBuilder, StreamBuilder, TokenCreateStreamBuilder,
        TokenSupplyStreamBuilder,
    },
    config::{HandleConfig, ReplayConfig},
    crypto::record_list_digest,
    metrics::Metrics,
    record::{AccountAmount, ContractFunctionResult, ExchangeRateSet, SingleTransactionRecord},
    record_list::{BuilderHandle, RecordListBuilder, RecordListCheckpoint},
    transaction::{Transaction, TransactionBody},
    types::{
        AccountId, ContractId, LimitBehavior, ResponseCode, ReversingBehavior, ScheduleId,
        TokenId, TokenType, TopicId, TransactionCategory, TransactionId,
    },
    Error, Result,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Label that always names the user transaction's builder
pub const USER_LABEL: &str = "user";

const TOPIC_RUNNING_HASH_VERSION: u64 = 3;

/// One handled transaction, as seen by the record list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandleScript {
    /// Consensus time of the user transaction
    pub consensus_time: DateTime<Utc>,
    /// Writes applied to the user builder before any step
    #[serde(default)]
    pub user: Vec<FieldWrite>,
    /// Steps in execution order
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// One engine action
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Request an irreversible preceding slot
    AddPreceding {
        /// Label for later steps
        label: String,
        /// Whether the preceding limit applies
        #[serde(default = "limited")]
        limit: LimitBehavior,
    },
    /// Request a reversible preceding slot
    AddReversiblePreceding {
        /// Label for later steps
        label: String,
    },
    /// Request a removable preceding slot
    AddRemovablePreceding {
        /// Label for later steps
        label: String,
    },
    /// Request a reversible child slot
    AddChild {
        /// Label for later steps
        label: String,
        /// Child category
        #[serde(default = "child")]
        category: TransactionCategory,
    },
    /// Request a removable child slot
    AddRemovableChild {
        /// Label for later steps
        label: String,
        /// Keep the child out of the record stream
        #[serde(default)]
        suppress: bool,
    },
    /// Request a following slot with an explicit policy
    AddFollowing {
        /// Label for later steps
        label: String,
        /// Child category
        category: TransactionCategory,
        /// Reversion policy
        behavior: ReversingBehavior,
    },
    /// Write a field into a labeled builder
    Write {
        /// Builder label
        target: String,
        /// Field to write
        #[serde(flatten)]
        write: FieldWrite,
    },
    /// Revert the children of a labeled builder
    RevertChildrenOf {
        /// Builder label
        target: String,
    },
    /// Capture a checkpoint under a name
    Checkpoint {
        /// Checkpoint name
        name: String,
    },
    /// Revert everything after a named checkpoint
    RevertChildrenFrom {
        /// Checkpoint name
        checkpoint: String,
    },
}

fn limited() -> LimitBehavior {
    LimitBehavior::Limited
}

fn child() -> TransactionCategory {
    TransactionCategory::Child
}

/// Field written into a builder, each through the narrowest builder view that allows it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "write", rename_all = "snake_case")]
pub enum FieldWrite {
    /// Transaction, wrapped from a body
    Transaction {
        /// Body to wrap
        body: TransactionBody,
    },
    /// Transaction id
    TransactionId {
        /// Id
        transaction_id: TransactionId,
    },
    /// Status
    Status {
        /// Status
        status: ResponseCode,
    },
    /// Memo
    Memo {
        /// Memo
        memo: String,
    },
    /// Exchange rates
    ExchangeRate {
        /// Rates
        rates: ExchangeRateSet,
    },
    /// Additional fee charged
    Fee {
        /// Amount in tinybars
        amount: u64,
    },
    /// Staking reward paid
    StakingReward {
        /// Receiving account
        account_id: AccountId,
        /// Amount in tinybars
        amount: i64,
    },
    /// Hbar adjustment appended to the transfer list
    Transfer {
        /// Account
        account_id: AccountId,
        /// Signed amount in tinybars
        amount: i64,
    },
    /// Created account
    CreatedAccount {
        /// Account
        account_id: AccountId,
        /// Alias, if any
        #[serde(default)]
        alias: Bytes,
    },
    /// Created token
    CreatedToken {
        /// Token
        token_id: TokenId,
        /// Token type
        token_type: TokenType,
    },
    /// Mint result
    Mint {
        /// Minted serials
        #[serde(default)]
        serial_numbers: Vec<i64>,
        /// Supply after the mint
        new_total_supply: u64,
    },
    /// Topic message submission
    TopicMessage {
        /// Topic
        topic_id: TopicId,
        /// Sequence number after the submit
        sequence_number: u64,
        /// Running hash after the submit
        running_hash: Bytes,
    },
    /// Schedule creation
    Schedule {
        /// Schedule
        schedule_id: ScheduleId,
        /// Id the scheduled transaction executes under
        scheduled_transaction_id: TransactionId,
    },
    /// Scheduled execution back-reference
    ScheduleRef {
        /// Schedule whose execution produced the record
        schedule_ref: ScheduleId,
    },
    /// PRNG number
    Prng {
        /// Number
        number: i32,
    },
    /// Contract call result
    ContractCall {
        /// Called contract
        contract_id: ContractId,
        /// Gas used
        gas_used: u64,
    },
}

/// Replay output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayOutput {
    /// Records in consensus order
    pub records: Vec<SingleTransactionRecord>,
    /// Hex SHA-384 over the canonical bytes of `records` as emitted
    pub digest: String,
}

/// Replays scripts against fresh record lists
#[derive(Debug, Clone)]
pub struct Replayer {
    handle: HandleConfig,
    replay: ReplayConfig,
    metrics: Option<Metrics>,
}

impl Replayer {
    /// Create replayer
    pub fn new(handle: HandleConfig, replay: ReplayConfig) -> Self {
        Self {
            handle,
            replay,
            metrics: None,
        }
    }

    /// Attach metrics shared by every replayed list
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Parse and replay a JSON script
    pub fn replay_json(&self, json: &str) -> Result<ReplayOutput> {
        let script: HandleScript = serde_json::from_str(json)?;
        self.replay(&script)
    }

    /// Replay a script
    pub fn replay(&self, script: &HandleScript) -> Result<ReplayOutput> {
        let mut list = RecordListBuilder::new(script.consensus_time, self.handle);
        if let Some(metrics) = &self.metrics {
            list = list.with_metrics(metrics.clone());
        }
        for write in &script.user {
            apply_write(list.user_builder_mut(), write)?;
        }

        let mut labels = HashMap::from([(USER_LABEL.to_string(), list.user_handle())]);
        let mut checkpoints: HashMap<String, RecordListCheckpoint> = HashMap::new();

        for step in &script.steps {
            match step {
                Step::AddPreceding { label, limit } => {
                    labels.insert(label.clone(), list.add_preceding(*limit)?);
                }
                Step::AddReversiblePreceding { label } => {
                    labels.insert(label.clone(), list.add_reversible_preceding()?);
                }
                Step::AddRemovablePreceding { label } => {
                    labels.insert(label.clone(), list.add_removable_preceding()?);
                }
                Step::AddChild { label, category } => {
                    labels.insert(label.clone(), list.add_child(*category)?);
                }
                Step::AddRemovableChild { label, suppress } => {
                    let handle = if *suppress {
                        list.add_removable_child_with_customizer(TransactionCustomizer::Suppressing)?
                    } else {
                        list.add_removable_child()?
                    };
                    labels.insert(label.clone(), handle);
                }
                Step::AddFollowing {
                    label,
                    category,
                    behavior,
                } => {
                    let handle =
                        list.add_following(*category, *behavior, TransactionCustomizer::Noop)?;
                    labels.insert(label.clone(), handle);
                }
                Step::Write { target, write } => {
                    let handle = lookup(&labels, target)?;
                    let builder = list
                        .builder_mut(handle)
                        .ok_or(Error::BuilderNotFound(handle))?;
                    apply_write(builder, write)?;
                }
                Step::RevertChildrenOf { target } => {
                    list.revert_children_of(lookup(&labels, target)?)?;
                }
                Step::Checkpoint { name } => {
                    checkpoints.insert(name.clone(), list.create_checkpoint());
                }
                Step::RevertChildrenFrom { checkpoint } => {
                    let checkpoint = checkpoints.get(checkpoint).copied().ok_or_else(|| {
                        Error::Other(format!("Unknown checkpoint: {}", checkpoint))
                    })?;
                    list.revert_children_from(checkpoint)?;
                }
            }
        }

        let mut records = list.build()?.records;
        if !self.replay.emit_sidecars {
            for record in &mut records {
                record.transaction_sidecar_records.clear();
            }
        }
        let digest = hex::encode(record_list_digest(&records)?);

        tracing::info!(
            consensus_time = %script.consensus_time,
            records = records.len(),
            digest = %digest,
            "Replayed handle script"
        );
        Ok(ReplayOutput { records, digest })
    }

    /// Render output as JSON, pretty if configured
    pub fn render(&self, output: &ReplayOutput) -> Result<String> {
        let rendered = if self.replay.pretty {
            serde_json::to_string_pretty(output)?
        } else {
            serde_json::to_string(output)?
        };
        Ok(rendered)
    }
}

fn lookup(labels: &HashMap<String, BuilderHandle>, label: &str) -> Result<BuilderHandle> {
    labels
        .get(label)
        .copied()
        .ok_or_else(|| Error::Other(format!("Unknown builder label: {}", label)))
}

fn apply_write(builder: &mut RecordBuilder, write: &FieldWrite) -> Result<()> {
    match write {
        FieldWrite::Transaction { body } => {
            builder.set_transaction(Transaction::from_body(body)?);
        }
        FieldWrite::TransactionId { transaction_id } => {
            builder.set_transaction_id(transaction_id.clone());
        }
        FieldWrite::Status { status } => {
            StreamBuilder::set_status(builder, *status);
        }
        FieldWrite::Memo { memo } => {
            StreamBuilder::set_memo(builder, memo.clone());
        }
        FieldWrite::ExchangeRate { rates } => {
            StreamBuilder::set_exchange_rate(builder, Some(*rates));
        }
        FieldWrite::Fee { amount } => charge_fee(builder, *amount),
        FieldWrite::StakingReward { account_id, amount } => {
            FeeStreamBuilder::add_paid_staking_reward(
                builder,
                AccountAmount::new(*account_id, *amount),
            );
        }
        FieldWrite::Transfer { account_id, amount } => {
            append_transfer(builder, AccountAmount::new(*account_id, *amount))
        }
        FieldWrite::CreatedAccount { account_id, alias } => {
            CryptoCreateStreamBuilder::set_account_id(builder, *account_id)
                .set_alias(alias.clone());
        }
        FieldWrite::CreatedToken {
            token_id,
            token_type,
        } => {
            TokenCreateStreamBuilder::set_token_id(&mut *builder, *token_id);
            TokenCreateStreamBuilder::set_token_type(builder, *token_type);
        }
        FieldWrite::Mint {
            serial_numbers,
            new_total_supply,
        } => mint(builder, serial_numbers, *new_total_supply),
        FieldWrite::TopicMessage {
            topic_id,
            sequence_number,
            running_hash,
        } => {
            ConsensusStreamBuilder::set_topic_id(builder, *topic_id)
                .set_topic_sequence_number(*sequence_number)
                .set_topic_running_hash(running_hash.clone())
                .set_topic_running_hash_version(TOPIC_RUNNING_HASH_VERSION);
        }
        FieldWrite::Schedule {
            schedule_id,
            scheduled_transaction_id,
        } => {
            ScheduleStreamBuilder::set_schedule_id(builder, *schedule_id)
                .set_scheduled_transaction_id(scheduled_transaction_id.clone());
        }
        FieldWrite::ScheduleRef { schedule_ref } => {
            ScheduleStreamBuilder::set_schedule_ref(builder, *schedule_ref);
        }
        FieldWrite::Prng { number } => {
            PrngStreamBuilder::set_entropy_number(builder, *number);
        }
        FieldWrite::ContractCall {
            contract_id,
            gas_used,
        } => {
            ContractOperationStreamBuilder::set_contract_id(&mut *builder, Some(*contract_id));
            ContractCallStreamBuilder::set_contract_call_result(
                builder,
                Some(ContractFunctionResult {
                    contract_id: Some(*contract_id),
                    gas_used: *gas_used,
                    ..Default::default()
                }),
            );
        }
    }
    Ok(())
}

fn charge_fee<B: FeeStreamBuilder>(builder: &mut B, amount: u64) {
    let total = builder.transaction_fee().saturating_add(amount);
    builder.set_transaction_fee(total);
}

fn append_transfer<B: CryptoTransferStreamBuilder>(builder: &mut B, adjustment: AccountAmount) {
    let mut transfer_list = builder.transfer_list().clone();
    transfer_list.account_amounts.push(adjustment);
    builder.set_transfer_list(transfer_list);
}

fn mint<B: TokenSupplyStreamBuilder>(builder: &mut B, serial_numbers: &[i64], supply: u64) {
    builder.set_new_total_supply(supply);
    for serial in serial_numbers {
        builder.add_serial_number(*serial);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = r#"{
        "consensus_time": "2024-01-01T00:00:00.000001000Z",
        "user": [
            { "write": "transaction_id",
              "transaction_id": { "account_id": { "shard": 0, "realm": 0, "num": 1001 },
                                  "valid_start": { "seconds": 1704067199, "nanos": 0 },
                                  "scheduled": false, "nonce": 0 } },
            { "write": "status", "status": "Success" },
            { "write": "fee", "amount": 100 }
        ],
        "steps": [
            { "op": "add_preceding", "label": "auto_create" },
            { "op": "write", "target": "auto_create", "write": "created_account",
              "account_id": { "shard": 0, "realm": 0, "num": 2002 } },
            { "op": "add_child", "label": "transfer" },
            { "op": "write", "target": "transfer", "write": "transfer",
              "account_id": { "shard": 0, "realm": 0, "num": 2002 }, "amount": 5 },
            { "op": "write", "target": "transfer", "write": "status", "status": "Success" },
            { "op": "checkpoint", "name": "before_mint" },
            { "op": "add_removable_child", "label": "mint" },
            { "op": "write", "target": "mint", "write": "mint",
              "serial_numbers": [1, 2], "new_total_supply": 2 },
            { "op": "revert_children_from", "checkpoint": "before_mint" }
        ]
    }"#;

    fn replayer() -> Replayer {
        Replayer::new(HandleConfig::default(), ReplayConfig::default())
    }

    #[test]
    fn test_replay_script() {
        let output = replayer().replay_json(SCRIPT).unwrap();
        assert_eq!(output.records.len(), 3);
        assert_eq!(output.digest.len(), 96);

        let preceding = &output.records[0].transaction_record;
        assert_eq!(preceding.receipt.account_id, Some(AccountId::new(2002)));
        assert_eq!(preceding.transaction_id.as_ref().unwrap().nonce, 1);

        let user = &output.records[1].transaction_record;
        assert_eq!(user.transaction_fee, 100);

        let transfer = &output.records[2].transaction_record;
        assert_eq!(transfer.transfer_list.account_amounts.len(), 1);
        assert_eq!(transfer.consensus_timestamp.nanos, 1001);
    }

    #[test]
    fn test_replay_is_deterministic() {
        let a = replayer().replay_json(SCRIPT).unwrap();
        let b = replayer().replay_json(SCRIPT).unwrap();
        assert_eq!(a.digest, b.digest);
        assert_eq!(a.records, b.records);
    }

    #[test]
    fn test_unknown_label_and_checkpoint() {
        let script = r#"{
            "consensus_time": "2024-01-01T00:00:00Z",
            "steps": [{ "op": "revert_children_of", "target": "missing" }]
        }"#;
        let err = replayer().replay_json(script).unwrap_err();
        assert!(err.to_string().contains("missing"));

        let script = r#"{
            "consensus_time": "2024-01-01T00:00:00Z",
            "steps": [{ "op": "revert_children_from", "checkpoint": "nope" }]
        }"#;
        assert!(replayer().replay_json(script).is_err());
    }

    #[test]
    fn test_malformed_script_is_json_error() {
        let err = replayer().replay_json("{ \"steps\": [").unwrap_err();
        assert!(matches!(err, Error::Json(_)));
        assert!(!err.is_fatal());

        let script = r#"{
            "consensus_time": "2024-01-01T00:00:00Z",
            "steps": [{ "op": "explode" }]
        }"#;
        assert!(matches!(
            replayer().replay_json(script).unwrap_err(),
            Error::Json(_)
        ));
    }

    #[test]
    fn test_capacity_error_surfaces() {
        let script = r#"{
            "consensus_time": "2024-01-01T00:00:00Z",
            "steps": [
                { "op": "add_reversible_preceding", "label": "a" },
                { "op": "add_reversible_preceding", "label": "b" }
            ]
        }"#;
        let config = HandleConfig {
            max_preceding_records: 1,
            max_following_records: 50,
        };
        let err = Replayer::new(config, ReplayConfig::default())
            .replay_json(script)
            .unwrap_err();
        assert!(matches!(err, Error::MaxChildRecordsExceeded { .. }));
    }

    #[test]
    fn test_render_pretty() {
        let replayer = Replayer::new(
            HandleConfig::default(),
            ReplayConfig {
                emit_sidecars: false,
                pretty: true,
            },
        );
        let output = replayer.replay_json(SCRIPT).unwrap();
        let rendered = replayer.render(&output).unwrap();
        assert!(rendered.contains('\n'));
        assert!(rendered.contains(&output.digest));
    }
}
