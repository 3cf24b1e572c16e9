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


//! # Funds Transfer
//!
//! This library moves money between accounts atomically under arbitrary
//! concurrent use, with deadlock-free lock ordering and non-negative balances.
//!
//! ## Core Components
//!
//! - [`TransferEngine`]: Validates, locks, and applies transfers
//! - [`Account`]: Account entity with debit/credit mutators
//! - [`AccountRepository`]: Keyed account lookup, with [`InMemoryAccountRepository`]
//! - [`NotificationService`]: Best-effort sink for transfer messages
//! - [`TransferError`]: Typed outcomes of a rejected transfer
//!
//! ## Example
//!
//! ```
//! use funds_transfer_rs::{
//!     Account, AccountId, AccountRepository, InMemoryAccountRepository, LoggingNotificationService,
//!     TransferEngine, TransferRequest,
//! };
//! use rust_decimal_macros::dec;
//! use std::sync::Arc;
//!
//! let accounts = Arc::new(InMemoryAccountRepository::new());
//! accounts
//!     .create_account(Account::with_balance(AccountId::from("1"), dec!(1000)).unwrap())
//!     .unwrap();
//! accounts
//!     .create_account(Account::with_balance(AccountId::from("2"), dec!(500)).unwrap())
//!     .unwrap();
//!
//! let engine = TransferEngine::new(accounts.clone(), Arc::new(LoggingNotificationService));
//! engine.transfer(&TransferRequest::new("1", "2", dec!(200))).unwrap();
//!
//! let from = accounts.get_account(&AccountId::from("1")).unwrap();
//! assert_eq!(from.lock().balance(), dec!(800));
//! ```
//!
//! ## Thread Safety
//!
//! Each account carries its own lock. A transfer holds only the two locks it
//! needs, so transfers between unrelated accounts run in parallel.

pub mod account;
mod base;
mod engine;
pub mod error;
pub mod logging;
mod notification;
mod repository;
mod transfer;

pub use account::{Account, SharedAccount};
pub use base::AccountId;
pub use engine::{EngineConfig, TransferEngine};
pub use error::{AccountError, NotificationError, TransferError};
pub use notification::{
    ChannelNotificationService, LoggingNotificationService, Notification, NotificationService,
};
pub use repository::{AccountRepository, InMemoryAccountRepository};
pub use transfer::TransferRequest;
