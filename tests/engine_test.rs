// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


//! Transfer engine public API integration tests.

use funds_transfer_rs::{
    Account, AccountId, AccountRepository, ChannelNotificationService, EngineConfig,
    InMemoryAccountRepository, NotificationError, NotificationService, TransferEngine,
    TransferError, TransferRequest,
};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

// === Test Doubles ===

/// Records every notification it receives.
#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<(AccountId, String)>>,
}

impl RecordingNotifier {
    fn sent(&self) -> Vec<(AccountId, String)> {
        self.sent.lock().clone()
    }

    fn count_for(&self, id: &str) -> usize {
        self.sent
            .lock()
            .iter()
            .filter(|(account_id, _)| account_id.as_str() == id)
            .count()
    }
}

impl NotificationService for RecordingNotifier {
    fn notify_about_transfer(
        &self,
        account: &Account,
        message: &str,
    ) -> Result<(), NotificationError> {
        self.sent
            .lock()
            .push((account.id().clone(), message.to_string()));
        Ok(())
    }
}

struct FailingNotifier;

impl NotificationService for FailingNotifier {
    fn notify_about_transfer(&self, _: &Account, _: &str) -> Result<(), NotificationError> {
        Err(NotificationError::Delivery("smtp down".to_string()))
    }
}

struct PanickingNotifier;

impl NotificationService for PanickingNotifier {
    fn notify_about_transfer(&self, _: &Account, _: &str) -> Result<(), NotificationError> {
        panic!("sink exploded");
    }
}

// === Helper Functions ===

fn make_accounts(balances: &[(&str, Decimal)]) -> Arc<InMemoryAccountRepository> {
    let repository = Arc::new(InMemoryAccountRepository::new());
    for (id, balance) in balances {
        repository
            .create_account(Account::with_balance(AccountId::from(*id), *balance).unwrap())
            .unwrap();
    }
    repository
}

fn setup(
    balances: &[(&str, Decimal)],
) -> (
    Arc<InMemoryAccountRepository>,
    TransferEngine,
    Arc<RecordingNotifier>,
) {
    let repository = make_accounts(balances);
    let notifier = Arc::new(RecordingNotifier::default());
    let engine = TransferEngine::new(repository.clone(), notifier.clone());
    (repository, engine, notifier)
}

fn setup_with_timeout(
    balances: &[(&str, Decimal)],
    timeout: Duration,
) -> (Arc<InMemoryAccountRepository>, TransferEngine) {
    let repository = make_accounts(balances);
    let engine = TransferEngine::with_config(
        repository.clone(),
        Arc::new(RecordingNotifier::default()),
        EngineConfig::with_lock_timeout(timeout),
    );
    (repository, engine)
}

fn balance(repository: &InMemoryAccountRepository, id: &str) -> Decimal {
    repository
        .get_account(&AccountId::from(id))
        .unwrap()
        .lock()
        .balance()
}

// === Successful Transfers ===

#[test]
fn transfer_moves_funds_and_notifies_both_parties() {
    let (repository, engine, notifier) = setup(&[("1", dec!(1000.0)), ("2", dec!(500.0))]);

    engine
        .transfer(&TransferRequest::new("1", "2", dec!(200.0)))
        .unwrap();

    assert_eq!(balance(&repository, "1"), dec!(800.0));
    assert_eq!(balance(&repository, "2"), dec!(700.0));
    assert_eq!(
        notifier.sent(),
        vec![
            (
                AccountId::from("1"),
                "Transferred 200.0 to account 2".to_string()
            ),
            (
                AccountId::from("2"),
                "Received 200.0 from account 1".to_string()
            ),
        ]
    );
}

#[test]
fn transfer_of_entire_balance_leaves_zero() {
    let (repository, engine, _) = setup(&[("1", dec!(75.25)), ("2", Decimal::ZERO)]);

    engine
        .transfer(&TransferRequest::new("1", "2", dec!(75.25)))
        .unwrap();

    assert_eq!(balance(&repository, "1"), Decimal::ZERO);
    assert_eq!(balance(&repository, "2"), dec!(75.25));
}

#[test]
fn transfer_from_larger_id_to_smaller_id() {
    let (repository, engine, _) = setup(&[("a", dec!(10)), ("z", dec!(10))]);

    engine
        .transfer(&TransferRequest::new("z", "a", dec!(4)))
        .unwrap();

    assert_eq!(balance(&repository, "a"), dec!(14));
    assert_eq!(balance(&repository, "z"), dec!(6));
}

#[test]
fn repeated_small_transfers_have_no_rounding_drift() {
    let (repository, engine, _) = setup(&[("1", dec!(1)), ("2", Decimal::ZERO)]);

    for _ in 0..10 {
        engine
            .transfer(&TransferRequest::new("1", "2", dec!(0.1)))
            .unwrap();
    }

    assert_eq!(balance(&repository, "1"), Decimal::ZERO);
    assert_eq!(balance(&repository, "2"), dec!(1.0));
}

// === Rejected Transfers ===

#[test]
fn insufficient_funds_leaves_balances_unchanged() {
    let (repository, engine, notifier) = setup(&[("1", dec!(100.0)), ("2", dec!(500.0))]);

    let result = engine.transfer(&TransferRequest::new("1", "2", dec!(200.0)));

    let err = result.unwrap_err();
    assert_eq!(err, TransferError::InsufficientFunds(AccountId::from("1")));
    assert_eq!(err.to_string(), "Insufficient funds in account: 1");
    assert_eq!(balance(&repository, "1"), dec!(100.0));
    assert_eq!(balance(&repository, "2"), dec!(500.0));
    assert!(notifier.sent().is_empty());
}

#[test]
fn missing_source_account_is_named() {
    let (repository, engine, notifier) = setup(&[("2", dec!(500.0))]);

    let err = engine
        .transfer(&TransferRequest::new("1", "2", dec!(200.0)))
        .unwrap_err();

    assert_eq!(err, TransferError::AccountNotFound(AccountId::from("1")));
    assert_eq!(err.to_string(), "Account not found: 1");
    assert_eq!(balance(&repository, "2"), dec!(500.0));
    assert!(notifier.sent().is_empty());
}

#[test]
fn missing_destination_account_is_named() {
    let (repository, engine, _) = setup(&[("1", dec!(500.0))]);

    let err = engine
        .transfer(&TransferRequest::new("1", "2", dec!(200.0)))
        .unwrap_err();

    assert_eq!(err, TransferError::AccountNotFound(AccountId::from("2")));
    assert_eq!(balance(&repository, "1"), dec!(500.0));
}

#[test]
fn missing_account_fails_without_taking_locks() {
    let (repository, engine) = setup_with_timeout(&[("1", dec!(10))], Duration::from_millis(10));
    let source = repository.get_account(&AccountId::from("1")).unwrap();
    let _held = source.lock();

    // Lookup fails before the held lock is ever contended.
    let err = engine
        .transfer(&TransferRequest::new("1", "2", dec!(1)))
        .unwrap_err();
    assert_eq!(err, TransferError::AccountNotFound(AccountId::from("2")));
}

#[test]
fn non_positive_amounts_are_invalid() {
    let (repository, engine, notifier) = setup(&[("1", dec!(100)), ("2", dec!(100))]);

    for amount in [Decimal::ZERO, dec!(-0.01), dec!(-100)] {
        let result = engine.transfer(&TransferRequest::new("1", "2", amount));
        assert_eq!(result, Err(TransferError::InvalidAmount));
    }

    assert_eq!(balance(&repository, "1"), dec!(100));
    assert_eq!(balance(&repository, "2"), dec!(100));
    assert!(notifier.sent().is_empty());
}

#[test]
fn invalid_amount_is_reported_before_lookup() {
    let (_, engine, _) = setup(&[]);

    let result = engine.transfer(&TransferRequest::new("nope", "missing", dec!(-1)));
    assert_eq!(result, Err(TransferError::InvalidAmount));
}

#[test]
fn blank_account_ids_are_invalid() {
    let (_, engine, _) = setup(&[("1", dec!(100))]);

    assert_eq!(
        engine.transfer(&TransferRequest::new("", "1", dec!(1))),
        Err(TransferError::InvalidAccountId)
    );
    assert_eq!(
        engine.transfer(&TransferRequest::new("1", "  ", dec!(1))),
        Err(TransferError::InvalidAccountId)
    );
}

#[test]
fn credit_overflow_rolls_back_nothing() {
    let (repository, engine, notifier) = setup(&[("1", dec!(10)), ("2", Decimal::MAX)]);

    let result = engine.transfer(&TransferRequest::new("1", "2", dec!(1)));

    assert_eq!(result, Err(TransferError::Overflow));
    assert_eq!(balance(&repository, "1"), dec!(10));
    assert_eq!(balance(&repository, "2"), Decimal::MAX);
    assert!(notifier.sent().is_empty());
}

// === Self Transfers ===

#[test]
fn self_transfer_is_a_no_op() {
    let (repository, engine, notifier) = setup(&[("1", dec!(100))]);

    engine
        .transfer(&TransferRequest::new("1", "1", dec!(60)))
        .unwrap();

    assert_eq!(balance(&repository, "1"), dec!(100));
    assert!(notifier.sent().is_empty());
}

#[test]
fn self_transfer_checks_funds() {
    let (repository, engine, _) = setup(&[("1", dec!(100))]);

    let result = engine.transfer(&TransferRequest::new("1", "1", dec!(100.01)));

    assert_eq!(
        result,
        Err(TransferError::InsufficientFunds(AccountId::from("1")))
    );
    assert_eq!(balance(&repository, "1"), dec!(100));
}

#[test]
fn concurrent_self_transfers_do_not_deadlock() {
    let (repository, engine, _) = setup(&[("1", dec!(100))]);
    let engine = Arc::new(engine);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engine = engine.clone();
            thread::spawn(move || {
                for _ in 0..100 {
                    engine
                        .transfer(&TransferRequest::new("1", "1", dec!(1)))
                        .unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }
    assert_eq!(balance(&repository, "1"), dec!(100));
}

// === Lock Timeouts ===

#[test]
fn lock_timeout_on_second_lock_releases_first() {
    let (repository, engine) =
        setup_with_timeout(&[("a", dec!(100)), ("b", dec!(100))], Duration::from_millis(50));
    let a = repository.get_account(&AccountId::from("a")).unwrap();
    let b = repository.get_account(&AccountId::from("b")).unwrap();

    let held = b.lock();
    let result = engine.transfer(&TransferRequest::new("a", "b", dec!(10)));
    assert_eq!(result, Err(TransferError::LockTimeout(AccountId::from("b"))));

    // "a" was acquired first and must have been released.
    assert!(a.try_lock().is_some());
    drop(held);

    assert_eq!(balance(&repository, "a"), dec!(100));
    assert_eq!(balance(&repository, "b"), dec!(100));
}

#[test]
fn lock_order_is_independent_of_direction() {
    let (repository, engine) =
        setup_with_timeout(&[("a", dec!(100)), ("b", dec!(100))], Duration::from_millis(50));
    let a = repository.get_account(&AccountId::from("a")).unwrap();
    let b = repository.get_account(&AccountId::from("b")).unwrap();

    // Holding "a" blocks a b -> a transfer on its first acquisition, so "b"
    // is never taken.
    let held = a.lock();
    let result = engine.transfer(&TransferRequest::new("b", "a", dec!(10)));
    assert_eq!(result, Err(TransferError::LockTimeout(AccountId::from("a"))));
    assert!(b.try_lock().is_some());
    drop(held);
}

#[test]
fn lock_timeout_is_retriable() {
    let (repository, engine) =
        setup_with_timeout(&[("a", dec!(100)), ("b", dec!(0))], Duration::from_millis(20));
    let b = repository.get_account(&AccountId::from("b")).unwrap();

    let err = {
        let _held = b.lock();
        engine
            .transfer(&TransferRequest::new("a", "b", dec!(30)))
            .unwrap_err()
    };
    assert!(err.is_retriable());

    engine
        .transfer(&TransferRequest::new("a", "b", dec!(30)))
        .unwrap();
    assert_eq!(balance(&repository, "a"), dec!(70));
    assert_eq!(balance(&repository, "b"), dec!(30));
}

#[test]
fn default_lock_timeout_is_ten_seconds() {
    let (_, engine, _) = setup(&[]);
    assert_eq!(engine.config().lock_timeout, Duration::from_secs(10));
}

// === Notifications ===

#[test]
fn notification_failure_does_not_fail_transfer() {
    let repository = make_accounts(&[("1", dec!(100)), ("2", dec!(0))]);
    let engine = TransferEngine::new(repository.clone(), Arc::new(FailingNotifier));

    engine
        .transfer(&TransferRequest::new("1", "2", dec!(25)))
        .unwrap();

    assert_eq!(balance(&repository, "1"), dec!(75));
    assert_eq!(balance(&repository, "2"), dec!(25));
}

#[test]
fn notification_panic_does_not_undo_transfer() {
    let repository = make_accounts(&[("1", dec!(100)), ("2", dec!(0))]);
    let engine = TransferEngine::new(repository.clone(), Arc::new(PanickingNotifier));

    engine
        .transfer(&TransferRequest::new("1", "2", dec!(25)))
        .unwrap();

    assert_eq!(balance(&repository, "1"), dec!(75));
    assert_eq!(balance(&repository, "2"), dec!(25));

    // Locks were released before the sink ran.
    engine
        .transfer(&TransferRequest::new("2", "1", dec!(5)))
        .unwrap();
    assert_eq!(balance(&repository, "1"), dec!(80));
}

#[test]
fn channel_notifier_receives_post_transfer_messages() {
    let repository = make_accounts(&[("1", dec!(100)), ("2", dec!(0))]);
    let (sink, receiver) = ChannelNotificationService::new();
    let engine = TransferEngine::new(repository.clone(), Arc::new(sink));

    engine
        .transfer(&TransferRequest::new("1", "2", dec!(12.50)))
        .unwrap();

    let messages: Vec<String> = receiver.try_iter().map(|n| n.message).collect();
    assert_eq!(
        messages,
        vec![
            "Transferred 12.50 to account 2".to_string(),
            "Received 12.50 from account 1".to_string(),
        ]
    );
}

#[test]
fn disconnected_channel_notifier_is_ignored() {
    let repository = make_accounts(&[("1", dec!(100)), ("2", dec!(0))]);
    let (sink, receiver) = ChannelNotificationService::new();
    drop(receiver);
    let engine = TransferEngine::new(repository.clone(), Arc::new(sink));

    assert!(
        engine
            .transfer(&TransferRequest::new("1", "2", dec!(1)))
            .is_ok()
    );
    assert_eq!(balance(&repository, "2"), dec!(1));
}

// === Concurrency ===

#[test]
fn concurrent_transfers_same_direction() {
    let (repository, engine, notifier) = setup(&[("1", dec!(1000.0)), ("2", dec!(500.0))]);
    let engine = Arc::new(engine);

    const NUM_THREADS: usize = 10;

    let handles: Vec<_> = (0..NUM_THREADS)
        .map(|_| {
            let engine = engine.clone();
            thread::spawn(move || {
                engine
                    .transfer(&TransferRequest::new("1", "2", dec!(100.0)))
                    .unwrap();
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    assert_eq!(balance(&repository, "1"), dec!(0));
    assert_eq!(balance(&repository, "2"), dec!(1500));
    assert_eq!(notifier.count_for("1"), NUM_THREADS);
    assert_eq!(notifier.count_for("2"), NUM_THREADS);
}

#[test]
fn concurrent_overdraft_attempts_never_go_negative() {
    let (repository, engine, notifier) = setup(&[("1", dec!(550)), ("2", dec!(0))]);
    let engine = Arc::new(engine);

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let engine = engine.clone();
            thread::spawn(move || engine.transfer(&TransferRequest::new("1", "2", dec!(100))))
        })
        .collect();

    let results: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().expect("Thread panicked"))
        .collect();

    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(succeeded, 5);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| *e == TransferError::InsufficientFunds(AccountId::from("1")))
    );
    assert_eq!(balance(&repository, "1"), dec!(50));
    assert_eq!(balance(&repository, "2"), dec!(500));
    assert_eq!(notifier.count_for("2"), 5);
}
