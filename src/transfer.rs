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


//! Transfer requests.

use crate::base::AccountId;
use crate::error::TransferError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A request to move `amount` from one account to another.
///
/// Serializes with the field names of the public JSON contract:
///
/// ```json
/// {"accountFromId": "1", "accountToId": "2", "amount": "100.00"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub account_from_id: AccountId,
    pub account_to_id: AccountId,
    pub amount: Decimal,
}

impl TransferRequest {
    pub fn new(
        account_from_id: impl Into<AccountId>,
        account_to_id: impl Into<AccountId>,
        amount: Decimal,
    ) -> Self {
        Self {
            account_from_id: account_from_id.into(),
            account_to_id: account_to_id.into(),
            amount,
        }
    }

    /// Checks the request fields before any account is touched.
    ///
    /// # Errors
    ///
    /// - [`TransferError::InvalidAccountId`] - either id is blank.
    /// - [`TransferError::InvalidAmount`] - `amount` is zero or negative.
    pub fn validate(&self) -> Result<(), TransferError> {
        if self.account_from_id.is_empty() || self.account_to_id.is_empty() {
            return Err(TransferError::InvalidAccountId);
        }
        if self.amount <= Decimal::ZERO {
            return Err(TransferError::InvalidAmount);
        }
        Ok(())
    }

    pub fn is_self_transfer(&self) -> bool {
        self.account_from_id == self.account_to_id
    }
}
