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

//! Customers and their loyalty point balance.

use crate::base::CustomerId;
use crate::error::{BookingError, ValidationError};
use crate::store::Entity;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub username: String,
    pub loyalty_points: u32,
}

impl Customer {
    pub fn new(username: impl Into<String>, loyalty_points: u32) -> Self {
        Self {
            username: username.into(),
            loyalty_points,
        }
    }

    /// Removes `points` from the balance and returns what is left.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::InsufficientPoints`] if the balance is too low;
    /// the balance is left unchanged.
    pub fn debit(&mut self, points: u32) -> Result<u32, BookingError> {
        self.loyalty_points = self
            .loyalty_points
            .checked_sub(points)
            .ok_or(BookingError::InsufficientPoints)?;
        Ok(self.loyalty_points)
    }

    /// Adds `points`, saturating at `u32::MAX`.
    pub fn credit(&mut self, points: u32) -> u32 {
        self.loyalty_points = self.loyalty_points.saturating_add(points);
        self.loyalty_points
    }
}

impl Entity for Customer {
    type Id = CustomerId;
    const KIND: &'static str = "customer";

    fn validate(&self) -> Result<(), ValidationError> {
        if self.username.is_empty() {
            return Err(ValidationError::new(Self::KIND, "username", "must not be empty"));
        }
        if self.username.chars().any(char::is_whitespace) {
            return Err(ValidationError::new(
                Self::KIND,
                "username",
                "must not contain whitespace",
            ));
        }
        Ok(())
    }
}
