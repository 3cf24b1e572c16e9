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


//! Account entity.
//!
//! An [`Account`] holds an id and a non-negative balance. Its mutators do no
//! locking of their own: callers that share an account across threads wrap it
//! in a [`SharedAccount`] and hold that lock while calling [`Account::debit`]
//! or [`Account::credit`].
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use funds_transfer_rs::{Account, AccountId};
//!
//! let mut account = Account::with_balance(AccountId::from("1"), dec!(100.00)).unwrap();
//! account.debit(dec!(40.00)).unwrap();
//! account.credit(dec!(15.50)).unwrap();
//! assert_eq!(account.balance(), dec!(75.50));
//! ```

use crate::base::AccountId;
use crate::error::{AccountError, TransferError};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::sync::Arc;

/// An account together with its lock.
///
/// The repository hands out one instance per id, so every holder of a
/// `SharedAccount` contends on the same mutex.
pub type SharedAccount = Arc<Mutex<Account>>;

/// Ledger account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    id: AccountId,
    balance: Decimal,
}

impl Account {
    const DECIMAL_PRECISION: u32 = 4;

    /// Creates an account with a zero balance.
    pub fn new(id: AccountId) -> Self {
        Self {
            id,
            balance: Decimal::ZERO,
        }
    }

    /// Creates an account with an opening balance.
    ///
    /// # Errors
    ///
    /// - [`AccountError::EmptyAccountId`] - `id` is blank.
    /// - [`AccountError::NegativeBalance`] - `balance` is below zero.
    pub fn with_balance(id: AccountId, balance: Decimal) -> Result<Self, AccountError> {
        if id.is_empty() {
            return Err(AccountError::EmptyAccountId);
        }
        if balance < Decimal::ZERO {
            return Err(AccountError::NegativeBalance);
        }
        Ok(Self { id, balance })
    }

    pub fn id(&self) -> &AccountId {
        &self.id
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    /// Wraps the account in its lock for sharing across threads.
    pub fn into_shared(self) -> SharedAccount {
        Arc::new(Mutex::new(self))
    }

    fn assert_invariants(&self) {
        debug_assert!(
            self.balance >= Decimal::ZERO,
            "Invariant violated: balance went negative: {}",
            self.balance
        );
    }

    /// Decreases the balance.
    ///
    /// # Errors
    ///
    /// - [`TransferError::InvalidAmount`] - `amount` is negative.
    /// - [`TransferError::InsufficientFunds`] - `amount` exceeds the balance.
    pub fn debit(&mut self, amount: Decimal) -> Result<(), TransferError> {
        if amount < Decimal::ZERO {
            return Err(TransferError::InvalidAmount);
        }
        if self.balance < amount {
            return Err(TransferError::InsufficientFunds(self.id.clone()));
        }
        self.balance -= amount;
        self.assert_invariants();
        Ok(())
    }

    /// Increases the balance.
    ///
    /// # Errors
    ///
    /// - [`TransferError::InvalidAmount`] - `amount` is negative.
    /// - [`TransferError::Overflow`] - the new balance is out of decimal range.
    pub fn credit(&mut self, amount: Decimal) -> Result<(), TransferError> {
        if amount < Decimal::ZERO {
            return Err(TransferError::InvalidAmount);
        }
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(TransferError::Overflow)?;
        self.assert_invariants();
        Ok(())
    }
}

impl Serialize for Account {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("Account", 2)?;
        state.serialize_field("account_id", &self.id)?;
        state.serialize_field(
            "balance",
            &self.balance.round_dp(Account::DECIMAL_PRECISION),
        )?;
        state.end()
    }
}
