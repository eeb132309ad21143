//! Property-based tests for record list invariants
//!
//! These tests use proptest to verify:
//! - Timestamp laws: preceding at T-i, following at T+i, re-densified after removal
//! - Capacity enforcement for limited, unlimited and following requests
//! - Irreversible builders survive reverts untouched
//! - Nonce assignment order
//! - Deterministic output for identical call sequences

use chrono::{DateTime, Utc};
use proptest::prelude::*;
use record_core::{
    crypto::record_list_digest,
    record::{AccountAmount, TransferList},
    transaction::{Transaction, TransactionBody, TransactionData},
    AccountId, Error, HandleConfig, LimitBehavior, RecordListBuilder, ResponseCode,
    ReversingBehavior, Timestamp, TransactionCategory, TransactionId, TransactionCustomizer,
};

fn consensus_time() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 500_000_000).unwrap()
}

fn total_nanos(timestamp: Timestamp) -> i64 {
    timestamp.seconds * 1_000_000_000 + timestamp.nanos as i64
}

fn user_nanos() -> i64 {
    total_nanos(Timestamp::from(consensus_time()))
}

fn user_id() -> TransactionId {
    TransactionId::new(AccountId::new(1001), Timestamp::new(1_699_999_990, 0))
}

fn list(config: HandleConfig) -> RecordListBuilder {
    let mut list = RecordListBuilder::new(consensus_time(), config);
    let body = TransactionBody::new(TransactionData::CryptoTransfer { transfers: vec![] })
        .with_transaction_id(user_id());
    list.user_builder_mut()
        .set_transaction(Transaction::from_body(&body).unwrap())
        .set_transaction_id(user_id())
        .set_status(ResponseCode::Success);
    list
}

/// Strategy for generating reversing behaviors
fn behavior_strategy() -> impl Strategy<Value = ReversingBehavior> {
    prop_oneof![
        Just(ReversingBehavior::Reversible),
        Just(ReversingBehavior::Removable),
        Just(ReversingBehavior::Irreversible),
    ]
}

/// One slot request: `true` for preceding, `false` for following
fn request_strategy() -> impl Strategy<Value = (bool, ReversingBehavior)> {
    (any::<bool>(), behavior_strategy())
}

fn run(requests: &[(bool, ReversingBehavior)], revert_user: bool) -> Vec<u8> {
    let mut list = list(HandleConfig::default());
    for (preceding, behavior) in requests {
        if *preceding {
            let _ = match behavior {
                ReversingBehavior::Reversible => list.add_reversible_preceding(),
                ReversingBehavior::Removable => list.add_removable_preceding(),
                ReversingBehavior::Irreversible => list.add_preceding(LimitBehavior::Limited),
            };
        } else {
            let _ = list.add_following(
                TransactionCategory::Child,
                *behavior,
                TransactionCustomizer::Noop,
            );
        }
    }
    if revert_user {
        let user = list.user_handle();
        list.revert_children_of(user).unwrap();
    }
    let result = list.build().unwrap();
    record_list_digest(&result.records).unwrap().to_vec()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Preceding slot i sits at T-(i+1) regardless of interleaved following requests
    #[test]
    fn prop_preceding_timestamps(interleave in prop::collection::vec(any::<bool>(), 1..40)) {
        let mut list = list(HandleConfig::default());
        for add_preceding in &interleave {
            if *add_preceding {
                list.add_preceding(LimitBehavior::Unlimited).unwrap();
            } else {
                list.add_child(TransactionCategory::Child).unwrap();
            }
        }

        let t = user_nanos();
        for (i, (_, builder)) in list.preceding_builders().enumerate() {
            let nanos = total_nanos(Timestamp::from(builder.consensus_timestamp()));
            prop_assert_eq!(nanos, t - (i as i64 + 1));
        }
        for (i, (_, builder)) in list.following_builders().enumerate() {
            let nanos = total_nanos(Timestamp::from(builder.consensus_timestamp()));
            prop_assert_eq!(nanos, t + i as i64 + 1);
        }
    }

    /// After removals, build re-densifies following records to T+1..T+M
    #[test]
    fn prop_following_redensified(behaviors in prop::collection::vec(behavior_strategy(), 1..40)) {
        let mut list = list(HandleConfig::default());
        let anchor = list.add_child(TransactionCategory::Child).unwrap();
        for behavior in &behaviors {
            list.add_following(TransactionCategory::Child, *behavior, TransactionCustomizer::Noop)
                .unwrap();
        }
        list.revert_children_of(anchor).unwrap();

        let survivors = 1 + behaviors
            .iter()
            .filter(|b| **b != ReversingBehavior::Removable)
            .count();
        let result = list.build().unwrap();
        prop_assert_eq!(result.records.len(), survivors + 1);

        let t = user_nanos();
        for (i, record) in result.records[1..].iter().enumerate() {
            prop_assert_eq!(total_nanos(record.consensus_timestamp()), t + i as i64 + 1);
        }
    }

    /// Limited preceding requests stop at the maximum; unlimited ones do not
    #[test]
    fn prop_capacity_enforced(max_preceding in 0u64..6, max_following in 1u64..20) {
        let config = HandleConfig { max_preceding_records: max_preceding, max_following_records: max_following };
        let mut list = list(config);

        for _ in 0..max_preceding {
            list.add_reversible_preceding().unwrap();
        }
        let is_capacity_error = matches!(
            list.add_reversible_preceding(),
            Err(Error::MaxChildRecordsExceeded { .. })
        );
        prop_assert!(is_capacity_error);
        prop_assert!(list.add_preceding(LimitBehavior::Unlimited).is_ok());

        for _ in 0..max_following {
            list.add_removable_child().unwrap();
        }
        let is_capacity_error = matches!(
            list.add_child(TransactionCategory::Child),
            Err(Error::MaxChildRecordsExceeded { .. })
        );
        prop_assert!(is_capacity_error);
    }

    /// Reverting the user never changes an irreversible builder
    #[test]
    fn prop_irreversible_untouched(requests in prop::collection::vec(request_strategy(), 1..30)) {
        let mut list = list(HandleConfig::default());
        let mut irreversible = Vec::new();
        for (preceding, behavior) in &requests {
            let handle = if *preceding {
                list.add_preceding(LimitBehavior::Unlimited)
            } else {
                list.add_following(TransactionCategory::Child, *behavior, TransactionCustomizer::Noop)
            };
            let handle = handle.unwrap();
            let builder = list.builder_mut(handle).unwrap();
            builder
                .set_status(ResponseCode::Success)
                .set_transfer_list(TransferList {
                    account_amounts: vec![AccountAmount::new(AccountId::new(3), 7)],
                });
            if builder.reversing_behavior() == ReversingBehavior::Irreversible {
                irreversible.push(handle);
            }
        }

        let user = list.user_handle();
        list.revert_children_of(user).unwrap();

        for handle in irreversible {
            let builder = list.builder(handle).unwrap();
            prop_assert_eq!(builder.status(), ResponseCode::Success);
            prop_assert_eq!(builder.transfer_list().account_amounts.len(), 1);
        }
    }

    /// Nonce 1 goes to the last preceding request; following records continue from P+1
    #[test]
    fn prop_nonce_assignment(preceding in 0usize..8, following in 0usize..20) {
        let mut list = list(HandleConfig::default());
        let mut memos = Vec::new();
        for i in 0..preceding {
            let handle = list.add_preceding(LimitBehavior::Unlimited).unwrap();
            list.builder_mut(handle).unwrap().set_memo(format!("p{}", i));
            memos.push(format!("p{}", i));
        }
        for _ in 0..following {
            list.add_child(TransactionCategory::Child).unwrap();
        }

        let result = list.build().unwrap();
        prop_assert_eq!(result.records.len(), preceding + following + 1);

        for (i, record) in result.records[..preceding].iter().enumerate() {
            let id = record.transaction_record.transaction_id.clone().unwrap();
            prop_assert_eq!(id.nonce, i as i32 + 1);
            prop_assert_eq!(&record.transaction_record.memo, &memos[preceding - 1 - i]);
        }
        prop_assert_eq!(
            result.records[preceding].transaction_record.transaction_id.clone(),
            Some(user_id())
        );
        for (i, record) in result.records[preceding + 1..].iter().enumerate() {
            let id = record.transaction_record.transaction_id.clone().unwrap();
            prop_assert_eq!(id.nonce, (preceding + i) as i32 + 1);
        }
    }

    /// Same calls, same records
    #[test]
    fn prop_deterministic_output(
        requests in prop::collection::vec(request_strategy(), 0..30),
        revert_user in any::<bool>(),
    ) {
        prop_assert_eq!(run(&requests, revert_user), run(&requests, revert_user));
    }
}
