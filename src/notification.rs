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


//! Transfer notifications.
//!
//! Delivery is best-effort: the engine logs a failed [`NotificationService`]
//! call and carries on, since the transfer it describes is already committed.

use crate::account::Account;
use crate::base::AccountId;
use crate::error::NotificationError;
use crossbeam::channel::{self, Receiver, Sender};
use tracing::info;

/// Sink for human-readable transfer events.
pub trait NotificationService: Send + Sync {
    /// Delivers `message` to the owner of `account`.
    fn notify_about_transfer(&self, account: &Account, message: &str)
    -> Result<(), NotificationError>;
}

/// A message addressed to an account owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub account_id: AccountId,
    pub message: String,
}

/// Writes notifications to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingNotificationService;

impl NotificationService for LoggingNotificationService {
    fn notify_about_transfer(
        &self,
        account: &Account,
        message: &str,
    ) -> Result<(), NotificationError> {
        info!(
            account_id = %account.id(),
            "Sending notification to owner of {}: {}",
            account.id(),
            message
        );
        Ok(())
    }
}

/// Hands notifications off to a channel without blocking.
///
/// A consumer drains the paired [`Receiver`] on its own schedule. Once the
/// receiver is dropped every send fails with [`NotificationError::Disconnected`].
#[derive(Debug, Clone)]
pub struct ChannelNotificationService {
    sender: Sender<Notification>,
}

impl ChannelNotificationService {
    /// Creates a sink over an unbounded channel.
    pub fn new() -> (Self, Receiver<Notification>) {
        let (sender, receiver) = channel::unbounded();
        (Self { sender }, receiver)
    }
}

impl NotificationService for ChannelNotificationService {
    fn notify_about_transfer(
        &self,
        account: &Account,
        message: &str,
    ) -> Result<(), NotificationError> {
        self.sender
            .send(Notification {
                account_id: account.id().clone(),
                message: message.to_string(),
            })
            .map_err(|_| NotificationError::Disconnected)
    }
}
