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


//! Funds transfer engine.
//!
//! The [`TransferEngine`] moves an amount between two accounts held in an
//! [`AccountRepository`] and tells both owners through a
//! [`NotificationService`].
//!
//! # Transfer Processing
//!
//! 1. **Validation**: ids must be non-blank and the amount strictly positive.
//! 2. **Resolution**: both accounts are looked up before any lock is taken.
//! 3. **Locking**: the two account locks are taken in ascending id order, each
//!    attempt bounded by [`EngineConfig::lock_timeout`].
//! 4. **Mutation**: with both locks held the funds check is repeated, then the
//!    destination is credited and the source debited.
//! 5. **Notification**: after the locks are released, each party receives one
//!    message. Delivery failures are logged and dropped.
//!
//! # Thread Safety
//!
//! Transfers on disjoint account pairs never contend. Because every transfer
//! touching a pair locks the smaller id first, opposing transfers (A to B and
//! B to A) cannot wait on each other in a cycle.

use crate::account::{Account, SharedAccount};
use crate::base::AccountId;
use crate::notification::NotificationService;
use crate::repository::AccountRepository;
use crate::{TransferError, TransferRequest};
use parking_lot::MutexGuard;
use rust_decimal::Decimal;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Tunables for the [`TransferEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Upper bound on each single lock acquisition.
    pub lock_timeout: Duration,
}

impl EngineConfig {
    pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self { lock_timeout }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Self::DEFAULT_LOCK_TIMEOUT,
        }
    }
}

/// Moves funds between accounts.
///
/// # Invariants
///
/// - A balance never goes negative.
/// - A transfer either mutates both accounts or neither.
/// - The sum of all balances is unchanged by any transfer.
/// - Locks are always acquired in ascending [`AccountId`] order and released
///   on every exit path.
pub struct TransferEngine {
    accounts: Arc<dyn AccountRepository>,
    notifier: Arc<dyn NotificationService>,
    config: EngineConfig,
}

impl TransferEngine {
    /// Creates an engine with the default configuration.
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        notifier: Arc<dyn NotificationService>,
    ) -> Self {
        Self::with_config(accounts, notifier, EngineConfig::default())
    }

    pub fn with_config(
        accounts: Arc<dyn AccountRepository>,
        notifier: Arc<dyn NotificationService>,
        config: EngineConfig,
    ) -> Self {
        TransferEngine {
            accounts,
            notifier,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Transfers `request.amount` from the source to the destination account.
    ///
    /// A self-transfer succeeds without touching the balance, provided the
    /// account holds at least `amount`. No notifications are sent for it.
    ///
    /// # Errors
    ///
    /// - [`TransferError::InvalidAccountId`] - An account id is blank.
    /// - [`TransferError::InvalidAmount`] - Amount is zero or negative.
    /// - [`TransferError::AccountNotFound`] - An account id is unknown.
    /// - [`TransferError::LockTimeout`] - A lock was not acquired in time. Safe to retry.
    /// - [`TransferError::InsufficientFunds`] - Source balance is below the amount.
    /// - [`TransferError::Overflow`] - Destination balance would overflow.
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(
            from = %request.account_from_id,
            to = %request.account_to_id,
            amount = %request.amount
        )
    )]
    pub fn transfer(&self, request: &TransferRequest) -> Result<(), TransferError> {
        request.validate()?;

        let from_id = &request.account_from_id;
        let to_id = &request.account_to_id;
        let from = self.resolve(from_id)?;
        let to = self.resolve(to_id)?;

        if request.is_self_transfer() {
            return self.self_transfer(from_id, &from, request.amount);
        }

        let (from_after, to_after) = {
            let (mut from_guard, mut to_guard) = self.lock_pair(from_id, &from, to_id, &to)?;
            Self::move_funds(&mut from_guard, &mut to_guard, request.amount)?;
            ((*from_guard).clone(), (*to_guard).clone())
        };

        debug!(
            from_balance = %from_after.balance(),
            to_balance = %to_after.balance(),
            "transfer committed"
        );

        self.notify(
            &from_after,
            &format!("Transferred {} to account {}", request.amount, to_id),
        );
        self.notify(
            &to_after,
            &format!("Received {} from account {}", request.amount, from_id),
        );

        Ok(())
    }

    fn resolve(&self, id: &AccountId) -> Result<SharedAccount, TransferError> {
        self.accounts
            .get_account(id)
            .ok_or_else(|| TransferError::AccountNotFound(id.clone()))
    }

    fn acquire<'a>(
        &self,
        id: &AccountId,
        account: &'a SharedAccount,
    ) -> Result<MutexGuard<'a, Account>, TransferError> {
        account.try_lock_for(self.config.lock_timeout).ok_or_else(|| {
            warn!(
                account_id = %id,
                timeout_ms = self.config.lock_timeout.as_millis() as u64,
                "timed out waiting for account lock"
            );
            TransferError::LockTimeout(id.clone())
        })
    }

    /// Locks both accounts, smaller id first, and returns the guards as
    /// `(from, to)`. If the second lock times out the first guard is dropped
    /// before returning.
    fn lock_pair<'a>(
        &self,
        from_id: &AccountId,
        from: &'a SharedAccount,
        to_id: &AccountId,
        to: &'a SharedAccount,
    ) -> Result<(MutexGuard<'a, Account>, MutexGuard<'a, Account>), TransferError> {
        if from_id < to_id {
            let from_guard = self.acquire(from_id, from)?;
            let to_guard = self.acquire(to_id, to)?;
            Ok((from_guard, to_guard))
        } else {
            let to_guard = self.acquire(to_id, to)?;
            let from_guard = self.acquire(from_id, from)?;
            Ok((from_guard, to_guard))
        }
    }

    fn move_funds(
        from: &mut Account,
        to: &mut Account,
        amount: Decimal,
    ) -> Result<(), TransferError> {
        if from.balance() < amount {
            return Err(TransferError::InsufficientFunds(from.id().clone()));
        }
        // Credit first: after the funds check it is the only mutator left that can fail.
        to.credit(amount)?;
        from.debit(amount)
    }

    fn self_transfer(
        &self,
        id: &AccountId,
        account: &SharedAccount,
        amount: Decimal,
    ) -> Result<(), TransferError> {
        let guard = self.acquire(id, account)?;
        if guard.balance() < amount {
            return Err(TransferError::InsufficientFunds(id.clone()));
        }
        debug!("self-transfer accepted without balance change");
        Ok(())
    }

    fn notify(&self, account: &Account, message: &str) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.notifier.notify_about_transfer(account, message)
        }));
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(account_id = %account.id(), error = %e, "notification not delivered"),
            Err(_) => warn!(account_id = %account.id(), "notification sink panicked"),
        }
    }
}
