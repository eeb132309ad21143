//! Record list for one user transaction
//!
//! A [`RecordListBuilder`] owns the user transaction's builder plus every
//! synthetic builder requested while handling it:
//!
//! - **Preceding** builders sit just before the user transaction. Slot `k`
//!   (0-based, in allocation order) gets `T - (k + 1)` ns.
//! - **Following** builders sit after it. Each gets its predecessor's time
//!   plus 1 ns, or plus `max_preceding_records + 1` ns for scheduled
//!   children so they have room for their own preceding records.
//!
//! Reverting walks forward from a failure point and applies each builder's
//! [`ReversingBehavior`]. [`RecordListBuilder::build`] assigns nonces, seals
//! every builder and returns the records in consensus order.
//!
//! # Invariants
//!
//! - Preceding count never exceeds the configured maximum for limited requests
//! - Following count never exceeds the configured maximum
//! - Irreversible builders are never touched by a revert
//! - Output order is preceding (earliest first), user, following

use crate::{
    builder::{RecordBuilder, TransactionCustomizer},
    config::HandleConfig,
    metrics::Metrics,
    record::SingleTransactionRecord,
    types::{
        plus_nanos, ChildList, LimitBehavior, ReversingBehavior, TransactionCategory,
        TransactionId,
    },
    Error, Result,
};
use chrono::{DateTime, Utc};
use std::fmt;

/// Stable reference to a builder owned by a [`RecordListBuilder`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BuilderHandle(pub(crate) u64);

impl fmt::Display for BuilderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "builder#{}", self.0)
    }
}

/// Position captured by [`RecordListBuilder::create_checkpoint`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordListCheckpoint {
    first_preceding: Option<BuilderHandle>,
    last_following: Option<BuilderHandle>,
}

impl RecordListCheckpoint {
    /// Most recently allocated preceding builder at checkpoint time
    pub fn first_preceding(&self) -> Option<BuilderHandle> {
        self.first_preceding
    }

    /// Last following builder at checkpoint time
    pub fn last_following(&self) -> Option<BuilderHandle> {
        self.last_following
    }
}

/// Output of [`RecordListBuilder::build`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordListResult {
    /// The user transaction's record
    pub user_record: SingleTransactionRecord,
    /// Every record in consensus order, the user record included
    pub records: Vec<SingleTransactionRecord>,
}

#[derive(Debug)]
struct Slot {
    handle: BuilderHandle,
    builder: RecordBuilder,
}

#[derive(Debug, Default, Clone, Copy)]
struct RevertOutcome {
    reverted: usize,
    removed: usize,
}

/// Builders for one user transaction and its synthetic children
#[derive(Debug)]
pub struct RecordListBuilder {
    consensus_time: DateTime<Utc>,
    config: HandleConfig,
    user: Slot,
    // allocation order: index 0 is T-1
    preceding: Vec<Slot>,
    following: Vec<Slot>,
    // writable through their handles, never emitted
    suppressed: Vec<Slot>,
    following_removed: bool,
    next_handle: u64,
    metrics: Option<Metrics>,
}

impl RecordListBuilder {
    /// Create a list for the user transaction reaching consensus at `consensus_time`
    pub fn new(consensus_time: DateTime<Utc>, config: HandleConfig) -> Self {
        let mut builder = RecordBuilder::new(
            ReversingBehavior::Reversible,
            TransactionCustomizer::Noop,
            TransactionCategory::User,
        );
        builder.set_consensus_timestamp(consensus_time);

        Self {
            consensus_time,
            config,
            user: Slot {
                handle: BuilderHandle(0),
                builder,
            },
            preceding: Vec::new(),
            following: Vec::new(),
            suppressed: Vec::new(),
            following_removed: false,
            next_handle: 1,
            metrics: None,
        }
    }

    /// Attach metrics
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Consensus time of the user transaction
    pub fn consensus_time(&self) -> DateTime<Utc> {
        self.consensus_time
    }

    /// Handle of the user transaction's builder
    pub fn user_handle(&self) -> BuilderHandle {
        self.user.handle
    }

    /// User transaction's builder
    pub fn user_builder(&self) -> &RecordBuilder {
        &self.user.builder
    }

    /// User transaction's builder, mutably
    pub fn user_builder_mut(&mut self) -> &mut RecordBuilder {
        &mut self.user.builder
    }

    /// Add an irreversible preceding builder
    pub fn add_preceding(&mut self, limit: LimitBehavior) -> Result<BuilderHandle> {
        self.do_add_preceding(ReversingBehavior::Irreversible, limit)
    }

    /// Add a reversible preceding builder (limited)
    pub fn add_reversible_preceding(&mut self) -> Result<BuilderHandle> {
        self.do_add_preceding(ReversingBehavior::Reversible, LimitBehavior::Limited)
    }

    /// Add a removable preceding builder (limited)
    pub fn add_removable_preceding(&mut self) -> Result<BuilderHandle> {
        self.do_add_preceding(ReversingBehavior::Removable, LimitBehavior::Limited)
    }

    fn do_add_preceding(
        &mut self,
        reversing_behavior: ReversingBehavior,
        limit: LimitBehavior,
    ) -> Result<BuilderHandle> {
        let count = self.preceding.len() as u64;
        if limit == LimitBehavior::Limited && count >= self.config.max_preceding_records {
            return Err(
                self.capacity_exceeded(ChildList::Preceding, self.config.max_preceding_records)
            );
        }

        // later allocations sit earlier in time
        let consensus_now = plus_nanos(self.consensus_time, -(count as i64 + 1));
        let mut builder = RecordBuilder::new(
            reversing_behavior,
            TransactionCustomizer::Noop,
            TransactionCategory::Preceding,
        );
        builder
            .set_consensus_timestamp(consensus_now)
            .set_exchange_rate(self.user.builder.exchange_rate());

        let handle = self.allocate_handle();
        tracing::debug!(
            handle = %handle,
            behavior = ?reversing_behavior,
            consensus_time = %consensus_now,
            "Allocated preceding record"
        );
        self.preceding.push(Slot { handle, builder });
        Ok(handle)
    }

    /// Add a reversible child of the given category
    pub fn add_child(&mut self, category: TransactionCategory) -> Result<BuilderHandle> {
        self.add_following(
            category,
            ReversingBehavior::Reversible,
            TransactionCustomizer::Noop,
        )
    }

    /// Add a removable child
    pub fn add_removable_child(&mut self) -> Result<BuilderHandle> {
        self.add_following(
            TransactionCategory::Child,
            ReversingBehavior::Removable,
            TransactionCustomizer::Noop,
        )
    }

    /// Add a removable child whose externalized transaction is customized
    pub fn add_removable_child_with_customizer(
        &mut self,
        customizer: TransactionCustomizer,
    ) -> Result<BuilderHandle> {
        self.add_following(
            TransactionCategory::Child,
            ReversingBehavior::Removable,
            customizer,
        )
    }

    /// Add a following builder
    ///
    /// A suppressing customizer still yields a writable builder, but it never
    /// joins the following list and so takes no timestamp slot.
    pub fn add_following(
        &mut self,
        category: TransactionCategory,
        reversing_behavior: ReversingBehavior,
        customizer: TransactionCustomizer,
    ) -> Result<BuilderHandle> {
        let count = self.following.len() as u64;
        if count >= self.config.max_following_records {
            return Err(
                self.capacity_exceeded(ChildList::Following, self.config.max_following_records)
            );
        }

        let previous = self
            .following
            .last()
            .map_or(self.consensus_time, |slot| slot.builder.consensus_timestamp());
        let offset = if category == TransactionCategory::Scheduled {
            self.config.max_preceding_records as i64 + 1
        } else {
            1
        };
        let consensus_now = plus_nanos(previous, offset);

        let suppressed = customizer.should_suppress_record();
        let mut builder = RecordBuilder::new(reversing_behavior, customizer, category);
        builder.set_consensus_timestamp(consensus_now);
        if category == TransactionCategory::Scheduled {
            builder.set_exchange_rate(self.user.builder.exchange_rate());
        } else {
            builder.set_parent_consensus(self.consensus_time);
        }

        let handle = self.allocate_handle();
        let slot = Slot { handle, builder };
        if suppressed {
            tracing::debug!(handle = %handle, "Suppressed following record");
            self.suppressed.push(slot);
        } else {
            tracing::debug!(
                handle = %handle,
                category = ?category,
                behavior = ?reversing_behavior,
                consensus_time = %consensus_now,
                "Allocated following record"
            );
            self.following.push(slot);
        }
        Ok(handle)
    }

    /// Revert everything that depends on the builder behind `handle`
    ///
    /// For the user builder this is every preceding and every following
    /// builder. For a following builder it is the following builders after it.
    /// Reversible preceding builders only have a success status replaced with
    /// `REVERTED_SUCCESS`; reversible following builders are also blanked.
    pub fn revert_children_of(&mut self, handle: BuilderHandle) -> Result<()> {
        if handle == self.user.handle {
            let preceding = revert_tail(&mut self.preceding, 0, RecordBuilder::mark_reverted);
            self.record_outcome(preceding, ChildList::Preceding);
            let following = revert_tail(&mut self.following, 0, RecordBuilder::revert);
            self.record_outcome(following, ChildList::Following);
            return Ok(());
        }

        let index = position(&self.following, handle)?;
        let following = revert_tail(&mut self.following, index + 1, RecordBuilder::revert);
        self.record_outcome(following, ChildList::Following);
        Ok(())
    }

    /// Capture the current end of both lists
    pub fn create_checkpoint(&self) -> RecordListCheckpoint {
        RecordListCheckpoint {
            first_preceding: self.preceding.last().map(|slot| slot.handle),
            last_following: self.following.last().map(|slot| slot.handle),
        }
    }

    /// Revert every builder allocated after `checkpoint`
    pub fn revert_children_from(&mut self, checkpoint: RecordListCheckpoint) -> Result<()> {
        let preceding_from = match checkpoint.first_preceding {
            Some(handle) => position(&self.preceding, handle)? + 1,
            None => 0,
        };
        let following_from = match checkpoint.last_following {
            Some(handle) => position(&self.following, handle)? + 1,
            None => 0,
        };

        let preceding = revert_tail(
            &mut self.preceding,
            preceding_from,
            RecordBuilder::mark_reverted,
        );
        self.record_outcome(preceding, ChildList::Preceding);
        let following = revert_tail(&mut self.following, following_from, RecordBuilder::revert);
        self.record_outcome(following, ChildList::Following);
        Ok(())
    }

    /// Preceding builders in allocation order (nearest to the user transaction first)
    pub fn preceding_builders(&self) -> impl Iterator<Item = (BuilderHandle, &RecordBuilder)> + '_ {
        self.preceding.iter().map(|slot| (slot.handle, &slot.builder))
    }

    /// Following builders in list order
    pub fn following_builders(&self) -> impl Iterator<Item = (BuilderHandle, &RecordBuilder)> + '_ {
        self.following.iter().map(|slot| (slot.handle, &slot.builder))
    }

    /// Look up a builder, suppressed ones included
    pub fn builder(&self, handle: BuilderHandle) -> Option<&RecordBuilder> {
        std::iter::once(&self.user)
            .chain(&self.preceding)
            .chain(&self.following)
            .chain(&self.suppressed)
            .find(|slot| slot.handle == handle)
            .map(|slot| &slot.builder)
    }

    /// Look up a builder mutably, suppressed ones included
    pub fn builder_mut(&mut self, handle: BuilderHandle) -> Option<&mut RecordBuilder> {
        std::iter::once(&mut self.user)
            .chain(&mut self.preceding)
            .chain(&mut self.following)
            .chain(&mut self.suppressed)
            .find(|slot| slot.handle == handle)
            .map(|slot| &mut slot.builder)
    }

    /// Assign nonces, seal every builder and return records in consensus order
    pub fn build(self) -> Result<RecordListResult> {
        let RecordListBuilder {
            consensus_time,
            user,
            preceding,
            mut following,
            following_removed,
            metrics,
            ..
        } = self;

        let user_transaction_id = user.builder.transaction_id().cloned();
        let user_record = user.builder.seal().map_err(fatal)?;
        let mut records = Vec::with_capacity(preceding.len() + following.len() + 1);
        let mut next_nonce = 1;

        // the most recently allocated preceding record gets nonce 1
        for slot in preceding.into_iter().rev() {
            let mut builder = slot.builder;
            builder
                .set_transaction_id(child_id(user_transaction_id.as_ref(), next_nonce)?)
                .sync_body_id_from_record_id()
                .map_err(fatal)?;
            next_nonce += 1;
            records.push(builder.seal().map_err(fatal)?);
        }

        records.push(user_record.clone());

        if following_removed {
            for (i, slot) in following.iter_mut().enumerate() {
                slot.builder
                    .set_consensus_timestamp(plus_nanos(consensus_time, i as i64 + 1));
            }
        }

        for slot in following {
            let mut builder = slot.builder;
            if builder.transaction_id().map_or(true, TransactionId::is_default) {
                builder
                    .set_transaction_id(child_id(user_transaction_id.as_ref(), next_nonce)?)
                    .sync_body_id_from_record_id()
                    .map_err(fatal)?;
                next_nonce += 1;
            }
            records.push(builder.seal().map_err(fatal)?);
        }

        if let Some(metrics) = &metrics {
            metrics.record_sealed(records.len());
        }
        tracing::debug!(
            consensus_time = %consensus_time,
            records = records.len(),
            redensified = following_removed,
            "Built record list"
        );

        Ok(RecordListResult {
            user_record,
            records,
        })
    }

    fn allocate_handle(&mut self) -> BuilderHandle {
        let handle = BuilderHandle(self.next_handle);
        self.next_handle += 1;
        handle
    }

    fn capacity_exceeded(&self, kind: ChildList, limit: u64) -> Error {
        tracing::warn!(kind = %kind, limit, "Maximum child records exceeded");
        if let Some(metrics) = &self.metrics {
            metrics.record_capacity_exceeded();
        }
        Error::MaxChildRecordsExceeded { kind, limit }
    }

    fn record_outcome(&mut self, outcome: RevertOutcome, list: ChildList) {
        if list == ChildList::Following && outcome.removed > 0 {
            self.following_removed = true;
        }
        if let Some(metrics) = &self.metrics {
            for _ in 0..outcome.reverted {
                metrics.record_reverted();
            }
            metrics.record_removed(outcome.removed);
        }
        if outcome.reverted + outcome.removed > 0 {
            tracing::debug!(
                list = %list,
                reverted = outcome.reverted,
                removed = outcome.removed,
                "Reverted child records"
            );
        }
    }
}

/// Apply each builder's reversing behavior to `slots[from..]`
///
/// `revert` is what happens to a reversible builder in this list.
fn revert_tail(
    slots: &mut Vec<Slot>,
    from: usize,
    revert: fn(&mut RecordBuilder),
) -> RevertOutcome {
    let mut outcome = RevertOutcome::default();
    let tail = slots.split_off(from);
    slots.extend(tail.into_iter().filter_map(|mut slot| {
        match slot.builder.reversing_behavior() {
            ReversingBehavior::Reversible => {
                revert(&mut slot.builder);
                outcome.reverted += 1;
                Some(slot)
            }
            ReversingBehavior::Removable => {
                outcome.removed += 1;
                None
            }
            ReversingBehavior::Irreversible => Some(slot),
        }
    }));
    outcome
}

fn position(slots: &[Slot], handle: BuilderHandle) -> Result<usize> {
    slots
        .iter()
        .position(|slot| slot.handle == handle)
        .ok_or_else(|| fatal(Error::BuilderNotFound(handle)))
}

fn child_id(user_transaction_id: Option<&TransactionId>, nonce: i32) -> Result<TransactionId> {
    user_transaction_id
        .map(|id| id.with_nonce(nonce))
        .ok_or_else(|| {
            fatal(Error::InvariantViolation(
                "child record needs a nonce but the user transaction has no id".to_string(),
            ))
        })
}

fn fatal(err: Error) -> Error {
    if err.is_fatal() {
        tracing::error!(error = %err, "Record list invariant violated");
    }
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        record::{AccountAmount, ExchangeRate, ExchangeRateSet, TransferList},
        transaction::{Transaction, TransactionBody, TransactionData},
        types::{AccountId, ResponseCode, Timestamp},
    };

    const T: u32 = 1000;

    fn at(nanos: u32) -> DateTime<Utc> {
        DateTime::from_timestamp(0, nanos).unwrap()
    }

    fn nanos(time: DateTime<Utc>) -> i64 {
        time.timestamp_nanos_opt().unwrap()
    }

    fn user_id() -> TransactionId {
        TransactionId::new(AccountId::new(1001), Timestamp::new(0, 500))
    }

    fn list() -> RecordListBuilder {
        list_with(HandleConfig::default())
    }

    fn list_with(config: HandleConfig) -> RecordListBuilder {
        let mut list = RecordListBuilder::new(at(T), config);
        let body = TransactionBody::new(TransactionData::CryptoTransfer { transfers: vec![] })
            .with_transaction_id(user_id());
        list.user_builder_mut()
            .set_transaction(Transaction::from_body(&body).unwrap())
            .set_transaction_id(user_id())
            .set_status(ResponseCode::Success);
        list
    }

    fn following_times(list: &RecordListBuilder) -> Vec<i64> {
        list.following_builders()
            .map(|(_, b)| nanos(b.consensus_timestamp()))
            .collect()
    }

    #[test]
    fn test_preceding_timestamps_fill_backward() {
        let mut list = list();
        list.add_preceding(LimitBehavior::Limited).unwrap();
        list.add_child(TransactionCategory::Child).unwrap();
        list.add_reversible_preceding().unwrap();
        list.add_removable_preceding().unwrap();

        let times: Vec<_> = list
            .preceding_builders()
            .map(|(_, b)| nanos(b.consensus_timestamp()))
            .collect();
        assert_eq!(times, vec![999, 998, 997]);
    }

    #[test]
    fn test_following_timestamps_and_parent() {
        let mut list = list();
        for _ in 0..3 {
            list.add_child(TransactionCategory::Child).unwrap();
        }
        assert_eq!(following_times(&list), vec![1001, 1002, 1003]);
        assert!(list
            .following_builders()
            .all(|(_, b)| b.parent_consensus_timestamp() == Some(at(T))));
    }

    #[test]
    fn test_scheduled_child_offset_and_exchange_rate() {
        let rates = ExchangeRateSet {
            current_rate: Some(ExchangeRate {
                hbar_equiv: 1,
                cent_equiv: 12,
                expiration_time: None,
            }),
            next_rate: Some(ExchangeRate {
                hbar_equiv: 1,
                cent_equiv: 13,
                expiration_time: None,
            }),
        };
        let mut list = list();
        list.user_builder_mut().set_exchange_rate(Some(rates));

        list.add_child(TransactionCategory::Child).unwrap();
        let scheduled = list.add_child(TransactionCategory::Scheduled).unwrap();
        list.add_child(TransactionCategory::Child).unwrap();

        // default max preceding is 3, so scheduled children skip 4 ns
        assert_eq!(following_times(&list), vec![1001, 1005, 1006]);
        let builder = list.builder(scheduled).unwrap();
        assert_eq!(builder.exchange_rate(), Some(rates));
        assert_eq!(builder.parent_consensus_timestamp(), None);
    }

    #[test]
    fn test_preceding_capacity() {
        let mut list = list();
        for _ in 0..3 {
            list.add_preceding(LimitBehavior::Limited).unwrap();
        }
        let err = list.add_preceding(LimitBehavior::Limited).unwrap_err();
        assert!(matches!(
            err,
            Error::MaxChildRecordsExceeded {
                kind: ChildList::Preceding,
                limit: 3
            }
        ));
        assert_eq!(err.status(), Some(ResponseCode::MaxChildRecordsExceeded));
        assert!(list.add_reversible_preceding().is_err());

        let handle = list.add_preceding(LimitBehavior::Unlimited).unwrap();
        assert_eq!(nanos(list.builder(handle).unwrap().consensus_timestamp()), 996);
    }

    #[test]
    fn test_following_capacity_has_no_escape() {
        let config = HandleConfig {
            max_preceding_records: 3,
            max_following_records: 2,
        };
        let metrics = Metrics::new().unwrap();
        let mut list = list_with(config).with_metrics(metrics.clone());
        list.add_child(TransactionCategory::Child).unwrap();
        list.add_removable_child().unwrap();

        assert!(list.add_child(TransactionCategory::Scheduled).is_err());
        let err = list
            .add_removable_child_with_customizer(TransactionCustomizer::Suppressing)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::MaxChildRecordsExceeded {
                kind: ChildList::Following,
                ..
            }
        ));
        assert_eq!(metrics.capacity_exceeded.get(), 2);
    }

    #[test]
    fn test_suppressed_child_is_never_emitted() {
        let mut list = list();
        let suppressed = list
            .add_removable_child_with_customizer(TransactionCustomizer::Suppressing)
            .unwrap();
        let child = list.add_child(TransactionCategory::Child).unwrap();

        assert_eq!(following_times(&list), vec![1001]);
        list.builder_mut(suppressed)
            .unwrap()
            .set_status(ResponseCode::Success);
        assert!(matches!(
            list.revert_children_of(suppressed),
            Err(Error::BuilderNotFound(h)) if h == suppressed
        ));

        let result = list.build().unwrap();
        assert_eq!(result.records.len(), 2);
        assert_eq!(
            result.records[1].transaction_record.transaction_id,
            Some(user_id().with_nonce(1))
        );
        assert_ne!(child, suppressed);
    }

    #[test]
    fn test_revert_user_processes_all_children() {
        let mut list = list();
        let irreversible = list.add_preceding(LimitBehavior::Limited).unwrap();
        let reversible = list.add_reversible_preceding().unwrap();
        list.add_removable_preceding().unwrap();
        let child = list.add_child(TransactionCategory::Child).unwrap();
        list.add_removable_child().unwrap();

        for handle in [irreversible, reversible, child] {
            list.builder_mut(handle)
                .unwrap()
                .set_status(ResponseCode::Success)
                .set_transfer_list(TransferList {
                    account_amounts: vec![AccountAmount::new(AccountId::new(2), 5)],
                });
        }

        let user = list.user_handle();
        list.revert_children_of(user).unwrap();

        let preceding: Vec<_> = list.preceding_builders().map(|(h, _)| h).collect();
        assert_eq!(preceding, vec![irreversible, reversible]);
        let kept = list.builder(irreversible).unwrap();
        assert_eq!(kept.status(), ResponseCode::Success);
        assert_eq!(kept.transfer_list().account_amounts.len(), 1);

        let reverted = list.builder(reversible).unwrap();
        assert_eq!(reverted.status(), ResponseCode::RevertedSuccess);
        assert_eq!(reverted.transfer_list().account_amounts.len(), 1);

        assert_eq!(list.following_builders().count(), 1);
        let reverted_child = list.builder(child).unwrap();
        assert_eq!(reverted_child.status(), ResponseCode::RevertedSuccess);
        assert!(reverted_child.transfer_list().account_amounts.is_empty());
    }

    #[test]
    fn test_revert_user_leaves_failed_preceding_alone() {
        let mut list = list();
        let succeeded = list.add_reversible_preceding().unwrap();
        let failed = list.add_reversible_preceding().unwrap();
        list.builder_mut(succeeded)
            .unwrap()
            .set_status(ResponseCode::Success);
        list.builder_mut(failed)
            .unwrap()
            .set_status(ResponseCode::InsufficientAccountBalance);
        for handle in [succeeded, failed] {
            list.builder_mut(handle)
                .unwrap()
                .set_transfer_list(TransferList {
                    account_amounts: vec![AccountAmount::new(AccountId::new(2), 5)],
                })
                .set_account_id(AccountId::new(9));
        }

        let user = list.user_handle();
        list.revert_children_of(user).unwrap();

        let succeeded = list.builder(succeeded).unwrap();
        assert_eq!(succeeded.status(), ResponseCode::RevertedSuccess);
        assert_eq!(succeeded.transfer_list().account_amounts.len(), 1);
        assert_eq!(succeeded.receipt().account_id, Some(AccountId::new(9)));

        let failed = list.builder(failed).unwrap();
        assert_eq!(failed.status(), ResponseCode::InsufficientAccountBalance);
        assert_eq!(failed.transfer_list().account_amounts.len(), 1);
        assert_eq!(failed.receipt().account_id, Some(AccountId::new(9)));
    }

    #[test]
    fn test_checkpoint_keeps_preceding_side_effects() {
        let mut list = list();
        let checkpoint = list.create_checkpoint();
        let succeeded = list.add_reversible_preceding().unwrap();
        let failed = list.add_reversible_preceding().unwrap();
        list.builder_mut(succeeded)
            .unwrap()
            .set_status(ResponseCode::Success)
            .set_account_id(AccountId::new(9));
        list.builder_mut(failed)
            .unwrap()
            .set_status(ResponseCode::InvalidSignature)
            .set_account_id(AccountId::new(10));

        list.revert_children_from(checkpoint).unwrap();

        let succeeded = list.builder(succeeded).unwrap();
        assert_eq!(succeeded.status(), ResponseCode::RevertedSuccess);
        assert_eq!(succeeded.receipt().account_id, Some(AccountId::new(9)));
        let failed = list.builder(failed).unwrap();
        assert_eq!(failed.status(), ResponseCode::InvalidSignature);
        assert_eq!(failed.receipt().account_id, Some(AccountId::new(10)));
    }

    #[test]
    fn test_failed_child_keeps_its_status() {
        let mut list = list();
        let first = list.add_child(TransactionCategory::Child).unwrap();
        let second = list.add_child(TransactionCategory::Child).unwrap();
        list.builder_mut(second)
            .unwrap()
            .set_status(ResponseCode::InsufficientAccountBalance);

        list.revert_children_of(first).unwrap();
        assert_eq!(
            list.builder(second).unwrap().status(),
            ResponseCode::InsufficientAccountBalance
        );
    }

    #[test]
    fn test_revert_unknown_handle() {
        let mut list = list();
        let preceding = list.add_preceding(LimitBehavior::Limited).unwrap();
        let err = list.revert_children_of(preceding).unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(
            list.revert_children_of(BuilderHandle(99)),
            Err(Error::BuilderNotFound(_))
        ));
    }

    #[test]
    fn test_scenario_revert_and_redensify() {
        let mut list = list();
        let p1 = list.add_preceding(LimitBehavior::Limited).unwrap();
        let p2 = list.add_preceding(LimitBehavior::Limited).unwrap();
        assert_eq!(nanos(list.builder(p1).unwrap().consensus_timestamp()), 999);
        assert_eq!(nanos(list.builder(p2).unwrap().consensus_timestamp()), 998);

        let first = list.add_child(TransactionCategory::Child).unwrap();
        let second = list.add_child(TransactionCategory::Child).unwrap();
        list.add_removable_child().unwrap();
        assert_eq!(following_times(&list), vec![1001, 1002, 1003]);

        list.builder_mut(first)
            .unwrap()
            .set_status(ResponseCode::Success);
        list.builder_mut(second)
            .unwrap()
            .set_status(ResponseCode::Success)
            .set_account_id(AccountId::new(77));

        list.revert_children_of(first).unwrap();

        assert_eq!(following_times(&list), vec![1001, 1002]);
        assert_eq!(
            list.builder(first).unwrap().status(),
            ResponseCode::Success
        );
        let reverted = list.builder(second).unwrap();
        assert_eq!(reverted.status(), ResponseCode::RevertedSuccess);
        assert_eq!(reverted.receipt().account_id, None);

        let result = list.build().unwrap();
        let times: Vec<_> = result
            .records
            .iter()
            .map(|r| r.consensus_timestamp().nanos)
            .collect();
        assert_eq!(times, vec![998, 999, 1000, 1001, 1002]);
    }

    #[test]
    fn test_removal_redensifies_following() {
        let mut list = list();
        let first = list.add_child(TransactionCategory::Child).unwrap();
        list.add_removable_child().unwrap();
        list.add_child(TransactionCategory::Child).unwrap();
        list.add_removable_child().unwrap();
        list.add_child(TransactionCategory::Child).unwrap();

        list.revert_children_of(first).unwrap();
        assert_eq!(following_times(&list), vec![1001, 1003, 1005]);

        let result = list.build().unwrap();
        let times: Vec<_> = result.records[1..]
            .iter()
            .map(|r| r.consensus_timestamp().nanos)
            .collect();
        assert_eq!(times, vec![1001, 1002, 1003]);
    }

    #[test]
    fn test_checkpoint_reverts_only_later_builders() {
        let metrics = Metrics::new().unwrap();
        let mut list = list().with_metrics(metrics.clone());
        let early_preceding = list.add_reversible_preceding().unwrap();
        let early_child = list.add_child(TransactionCategory::Child).unwrap();
        for handle in [early_preceding, early_child] {
            list.builder_mut(handle)
                .unwrap()
                .set_status(ResponseCode::Success);
        }

        let checkpoint = list.create_checkpoint();
        assert_eq!(checkpoint.first_preceding(), Some(early_preceding));
        assert_eq!(checkpoint.last_following(), Some(early_child));

        let late_preceding = list.add_removable_preceding().unwrap();
        let late_child = list.add_child(TransactionCategory::Child).unwrap();
        list.add_removable_child().unwrap();
        list.builder_mut(late_child)
            .unwrap()
            .set_status(ResponseCode::Success);

        list.revert_children_from(checkpoint).unwrap();

        assert!(list.builder(late_preceding).is_none());
        assert_eq!(
            list.builder(early_preceding).unwrap().status(),
            ResponseCode::Success
        );
        assert_eq!(
            list.builder(early_child).unwrap().status(),
            ResponseCode::Success
        );
        assert_eq!(
            list.builder(late_child).unwrap().status(),
            ResponseCode::RevertedSuccess
        );
        assert_eq!(list.following_builders().count(), 2);
        assert_eq!(metrics.records_removed.get(), 2);
        assert_eq!(metrics.records_reverted.get(), 1);
    }

    #[test]
    fn test_empty_checkpoint_reverts_everything() {
        let mut list = list();
        let checkpoint = list.create_checkpoint();
        list.add_removable_preceding().unwrap();
        list.add_removable_child().unwrap();

        list.revert_children_from(checkpoint).unwrap();
        assert_eq!(list.preceding_builders().count(), 0);
        assert_eq!(list.following_builders().count(), 0);
    }

    #[test]
    fn test_stale_checkpoint_is_not_found() {
        let mut list = list();
        let first = list.add_child(TransactionCategory::Child).unwrap();
        list.add_removable_child().unwrap();
        let checkpoint = list.create_checkpoint();

        list.revert_children_of(first).unwrap();
        assert!(matches!(
            list.revert_children_from(checkpoint),
            Err(Error::BuilderNotFound(_))
        ));
    }

    #[test]
    fn test_nonce_assignment() {
        let mut list = list();
        let p1 = list.add_preceding(LimitBehavior::Limited).unwrap();
        let p2 = list.add_preceding(LimitBehavior::Limited).unwrap();
        let p3 = list.add_preceding(LimitBehavior::Limited).unwrap();
        list.add_child(TransactionCategory::Child).unwrap();
        let stamped = list.add_child(TransactionCategory::Scheduled).unwrap();
        list.add_child(TransactionCategory::Child).unwrap();

        let scheduled_id = user_id().as_scheduled();
        list.builder_mut(stamped)
            .unwrap()
            .set_transaction_id(scheduled_id.clone());
        for handle in [p1, p2, p3] {
            list.builder_mut(handle)
                .unwrap()
                .set_memo(handle.to_string());
        }

        let result = list.build().unwrap();
        let ids: Vec<_> = result
            .records
            .iter()
            .map(|r| r.transaction_record.transaction_id.clone().unwrap())
            .collect();
        assert_eq!(
            ids,
            vec![
                user_id().with_nonce(1),
                user_id().with_nonce(2),
                user_id().with_nonce(3),
                user_id(),
                user_id().with_nonce(4),
                scheduled_id,
                user_id().with_nonce(5),
            ]
        );

        // nonce 1 went to the most recently allocated preceding record
        assert_eq!(result.records[0].transaction_record.memo, p3.to_string());
        assert_eq!(result.records[2].transaction_record.memo, p1.to_string());

        // bodies carry the assigned ids
        let body = result.records[0].transaction.body().unwrap();
        assert_eq!(body.transaction_id, Some(user_id().with_nonce(1)));
        assert_eq!(result.user_record, result.records[3]);
    }

    #[test]
    fn test_build_without_user_id() {
        let list = RecordListBuilder::new(at(T), HandleConfig::default());
        let result = list.build().unwrap();
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.user_record.transaction_record.transaction_id, None);

        let mut list = RecordListBuilder::new(at(T), HandleConfig::default());
        list.add_child(TransactionCategory::Child).unwrap();
        let err = list.build().unwrap_err();
        assert!(matches!(err, Error::InvariantViolation(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_metrics_on_build() {
        let metrics = Metrics::new().unwrap();
        let mut list = list().with_metrics(metrics.clone());
        list.add_preceding(LimitBehavior::Limited).unwrap();
        list.add_child(TransactionCategory::Child).unwrap();
        list.build().unwrap();

        assert_eq!(metrics.records_sealed.get(), 3);
        assert_eq!(metrics.list_size.get_sample_count(), 1);
    }
}
