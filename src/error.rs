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

//! Error types for the booking core.
//!
//! Every fallible operation returns a [`BookingError`]; [`BookingError::kind`]
//! groups them into the four recoverable families callers branch on.

use crate::base::SeatId;
use crate::state::{Action, BookingState};
use thiserror::Error;

/// Broad failure family of a [`BookingError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A referenced entity or seat does not exist.
    NotFound,
    /// The booking's current state does not permit the operation.
    InvalidTransition,
    /// A shared resource is held by someone else.
    ResourceConflict,
    /// A record failed schema validation.
    ValidationFailure,
}

/// A record that failed validation, naming the entity kind and offending field.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {entity} {field}: {reason}")]
pub struct ValidationError {
    pub entity: &'static str,
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(entity: &'static str, field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            entity,
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Booking processing errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookingError {
    /// Referenced booking ID does not exist
    #[error("booking not found")]
    BookingNotFound,

    /// Referenced flight ID does not exist
    #[error("flight not found")]
    FlightNotFound,

    /// Referenced customer ID does not exist
    #[error("customer not found")]
    CustomerNotFound,

    /// Seat number is not part of the flight
    #[error("seat {0} does not exist on this flight")]
    SeatNotFound(SeatId),

    /// The current state does not allow the requested action
    #[error("cannot {action} a booking that is {state}")]
    InvalidTransition { state: BookingState, action: Action },

    /// The booking already reached the state the action leads to
    #[error("booking is already {0}")]
    AlreadyInState(BookingState),

    /// Check-in attempted before any seat was reserved
    #[error("no seat selected")]
    NoSeatSelected,

    /// Seat is occupied or checked in by another booking
    #[error("seat {0} is not available")]
    SeatUnavailable(SeatId),

    /// Seat is not occupied by the acting booking
    #[error("seat {0} is not held by this booking")]
    SeatNotHeld(SeatId),

    /// Acting customer does not own the booking
    #[error("customer does not own this booking")]
    NotOwner,

    /// Loyalty debit exceeds the customer's balance
    #[error("insufficient loyalty points")]
    InsufficientPoints,

    /// Record rejected by entity validation
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl BookingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BookingNotFound
            | Self::FlightNotFound
            | Self::CustomerNotFound
            | Self::SeatNotFound(_) => ErrorKind::NotFound,
            Self::InvalidTransition { .. } | Self::AlreadyInState(_) | Self::NoSeatSelected => {
                ErrorKind::InvalidTransition
            }
            Self::SeatUnavailable(_)
            | Self::SeatNotHeld(_)
            | Self::NotOwner
            | Self::InsufficientPoints => ErrorKind::ResourceConflict,
            Self::Validation(_) => ErrorKind::ValidationFailure,
        }
    }
}
