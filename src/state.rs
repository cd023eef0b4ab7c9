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

//! Booking lifecycle states and the transition table.
//!
//! ```text
//!                  reserve_seat
//!                   ┌───────┐
//!                   ▼       │
//!  (new) ───────► Booked ───┘
//!                   │ │
//!        check_in ──┘ └── cancel
//!           ▼               ▼
//!       CheckedIn       Cancelled
//! ```
//!
//! Both `CheckedIn` and `Cancelled` are terminal. The table below is the only
//! source of truth: capability predicates are derived from it.

use crate::error::BookingError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a booking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingState {
    #[default]
    Booked,
    CheckedIn,
    Cancelled,
}

/// Operation requested on a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Cancel,
    CheckIn,
    ReserveSeat,
}

/// Allowed `(from, action, to)` triples.
const TRANSITIONS: &[(BookingState, Action, BookingState)] = &[
    (BookingState::Booked, Action::Cancel, BookingState::Cancelled),
    (BookingState::Booked, Action::CheckIn, BookingState::CheckedIn),
    (BookingState::Booked, Action::ReserveSeat, BookingState::Booked),
];

impl BookingState {
    /// Looks up the state reached by applying `action`.
    ///
    /// # Errors
    ///
    /// - [`BookingError::AlreadyInState`] - the action would lead to the state
    ///   the booking is already in (e.g. cancelling a cancelled booking).
    /// - [`BookingError::InvalidTransition`] - any other disallowed action.
    pub fn next(self, action: Action) -> Result<BookingState, BookingError> {
        if let Some((_, _, to)) = TRANSITIONS
            .iter()
            .find(|(from, a, _)| *from == self && *a == action)
        {
            return Ok(*to);
        }

        let repeats = TRANSITIONS
            .iter()
            .any(|(from, a, to)| *a == action && *to == self && *from != self);
        if repeats {
            Err(BookingError::AlreadyInState(self))
        } else {
            Err(BookingError::InvalidTransition {
                state: self,
                action,
            })
        }
    }

    pub fn can_cancel(self) -> bool {
        self.next(Action::Cancel).is_ok()
    }

    pub fn can_check_in(self) -> bool {
        self.next(Action::CheckIn).is_ok()
    }

    pub fn can_change_seat(self) -> bool {
        self.next(Action::ReserveSeat).is_ok()
    }

    /// Returns `true` when no transition leaves this state.
    pub fn is_terminal(self) -> bool {
        !TRANSITIONS.iter().any(|(from, _, _)| *from == self)
    }

    /// Legacy status label, derived from the state.
    pub fn status_name(self) -> &'static str {
        match self {
            Self::Booked => "booked",
            Self::CheckedIn => "checked_in",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for BookingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.status_name())
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cancel => "cancel",
            Self::CheckIn => "check in",
            Self::ReserveSeat => "reserve a seat for",
        })
    }
}
