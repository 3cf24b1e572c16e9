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


//! Account storage.
//!
//! The engine only reads accounts through [`AccountRepository`]. The
//! [`InMemoryAccountRepository`] keeps one [`SharedAccount`] per id, which makes
//! it the process-wide registry of account locks as well.

use crate::account::{Account, SharedAccount};
use crate::base::AccountId;
use crate::error::AccountError;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Keyed lookup of accounts.
///
/// Implementations must return the same [`SharedAccount`] instance for the
/// same id on every call and must be safe to call concurrently.
pub trait AccountRepository: Send + Sync {
    fn get_account(&self, id: &AccountId) -> Option<SharedAccount>;
}

/// A thread-safe in-memory account store.
///
/// Uses a [`DashMap`] so lookups of distinct accounts don't contend, and the
/// entry API so registering an id is an atomic check-and-insert.
#[derive(Debug, Default)]
pub struct InMemoryAccountRepository {
    accounts: DashMap<AccountId, SharedAccount>,
}

impl InMemoryAccountRepository {
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
        }
    }

    /// Registers an account and returns its shared handle.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::DuplicateAccountId`] if the id is taken.
    pub fn create_account(&self, account: Account) -> Result<SharedAccount, AccountError> {
        if account.id().is_empty() {
            return Err(AccountError::EmptyAccountId);
        }
        match self.accounts.entry(account.id().clone()) {
            Entry::Occupied(entry) => Err(AccountError::DuplicateAccountId(entry.key().clone())),
            Entry::Vacant(entry) => {
                let shared = account.into_shared();
                entry.insert(Arc::clone(&shared));
                Ok(shared)
            }
        }
    }

    /// Copies every account, sorted by id.
    ///
    /// Each account is locked only while it is copied, so the result is not a
    /// consistent cut across accounts while transfers are in flight.
    pub fn snapshot(&self) -> Vec<Account> {
        // Clone handles first so no shard lock is held while locking accounts.
        let handles: Vec<SharedAccount> = self
            .accounts
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        let mut accounts: Vec<Account> = handles
            .iter()
            .map(|shared| shared.lock().clone())
            .collect();
        accounts.sort_by(|a, b| a.id().cmp(b.id()));
        accounts
    }

    /// Sum of all balances.
    pub fn total_balance(&self) -> Decimal {
        self.snapshot().iter().map(Account::balance).sum()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn clear(&self) {
        self.accounts.clear();
    }
}

impl AccountRepository for InMemoryAccountRepository {
    fn get_account(&self, id: &AccountId) -> Option<SharedAccount> {
        self.accounts.get(id).map(|entry| Arc::clone(entry.value()))
    }
}
