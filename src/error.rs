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


//! Error types for funds transfers.

use crate::base::AccountId;
use thiserror::Error;

/// Outcomes of a rejected transfer.
///
/// Every variant is recoverable. Only [`TransferError::LockTimeout`] is
/// transient; the others are deterministic for the same request and state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    /// Source or destination account id is empty
    #[error("account id must not be empty")]
    InvalidAccountId,

    /// Amount is zero or negative
    #[error("Transfer amount must be positive")]
    InvalidAmount,

    /// Referenced account does not exist
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// Source balance is lower than the amount
    #[error("Insufficient funds in account: {0}")]
    InsufficientFunds(AccountId),

    /// Account lock was not acquired within the configured timeout
    #[error("Unable to acquire lock for account {0}, operation timed out")]
    LockTimeout(AccountId),

    /// Crediting would overflow the decimal range
    #[error("balance overflow")]
    Overflow,
}

impl TransferError {
    /// Stable error code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            TransferError::InvalidAccountId => "INVALID_ACCOUNT_ID",
            TransferError::InvalidAmount => "INVALID_AMOUNT",
            TransferError::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            TransferError::InsufficientFunds(_) => "INSUFFICIENT_FUNDS",
            TransferError::LockTimeout(_) => "LOCK_TIMEOUT",
            TransferError::Overflow => "OVERFLOW",
        }
    }

    /// Whether retrying the same request from scratch may succeed.
    pub fn is_retriable(&self) -> bool {
        matches!(self, TransferError::LockTimeout(_))
    }
}

/// Errors raised while creating or registering accounts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccountError {
    #[error("account id must not be empty")]
    EmptyAccountId,

    #[error("Initial balance must be positive.")]
    NegativeBalance,

    #[error("Account id {0} already exists!")]
    DuplicateAccountId(AccountId),
}

/// Delivery failures reported by a notification sink.
///
/// The engine logs these and never surfaces them to the transfer caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotificationError {
    #[error("notification channel disconnected")]
    Disconnected,

    #[error("notification delivery failed: {0}")]
    Delivery(String),
}
