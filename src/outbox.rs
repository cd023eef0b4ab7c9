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

//! Lock-free outbox of committed booking events.
//!
//! The engine pushes an event after each committed lifecycle change. Payment
//! and notification collaborators drain the outbox on their own schedule; the
//! core never calls them.

use crate::base::{BookingId, CustomerId, FlightId, SeatId};
use crossbeam::queue::SegQueue;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BookingEvent {
    /// A booking was created with its committed price.
    Booked {
        booking: BookingId,
        flight: FlightId,
        customer: CustomerId,
        price: Decimal,
    },
    SeatReserved {
        booking: BookingId,
        seat: SeatId,
        released: Option<SeatId>,
    },
    CheckedIn {
        booking: BookingId,
        seat: SeatId,
    },
    Cancelled {
        booking: BookingId,
        released: Option<SeatId>,
    },
}

impl BookingEvent {
    pub fn booking(&self) -> BookingId {
        match self {
            Self::Booked { booking, .. } => *booking,
            Self::SeatReserved { booking, .. } => *booking,
            Self::CheckedIn { booking, .. } => *booking,
            Self::Cancelled { booking, .. } => *booking,
        }
    }
}

/// FIFO queue of [`BookingEvent`]s, safe for concurrent producers.
#[derive(Debug, Default)]
pub struct EventOutbox {
    events: SegQueue<BookingEvent>,
}

impl EventOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: BookingEvent) {
        self.events.push(event);
    }

    /// Removes and returns every queued event, oldest first.
    pub fn drain(&self) -> Vec<BookingEvent> {
        std::iter::from_fn(|| self.events.pop()).collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
