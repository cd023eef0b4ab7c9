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

//! Per-flight seat inventory.
//!
//! ```text
//!  Open ──occupy──► Occupied ──check_in──► CheckedIn
//!   ▲                  │                      │
//!   └──────open────────┴──────────open────────┘
//! ```
//!
//! A seat records its owning booking exactly while it is not `Open`. The
//! inventory does not know which seats a booking holds; keeping a booking to a
//! single seat is the booking lifecycle's job.
//!
//! # Example
//!
//! Seats change only through a [`Booking`](crate::Booking); callers outside
//! the crate get a read-only view.
//!
//! ```
//! use booking_demo_rs::{Booking, BookingId, CustomerId, FlightId, SeatId, SeatInventory, SeatStatus};
//! use rust_decimal_macros::dec;
//!
//! let seats = SeatInventory::new(10);
//! let mut booking = Booking::new(FlightId(0), CustomerId(0), "Ana Lima", "123.456.789-09", dec!(500));
//! booking.reserve_seat(BookingId(0), SeatId(5), &seats).unwrap();
//!
//! assert_eq!(seats.seat(SeatId(5)).unwrap().status, SeatStatus::Occupied);
//! assert_eq!(seats.open_seats().len(), 9);
//! ```
//!
//! ```compile_fail
//! use booking_demo_rs::{BookingId, SeatId, SeatInventory};
//!
//! let seats = SeatInventory::new(10);
//! seats.occupy(BookingId(0), SeatId(5)).unwrap();
//! ```

use crate::base::{BookingId, SeatId};
use crate::error::BookingError;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeatStatus {
    Open,
    Occupied,
    CheckedIn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
    pub id: SeatId,
    pub status: SeatStatus,
    /// Owning booking, set iff `status != Open`.
    pub booking: Option<BookingId>,
}

impl Seat {
    fn open(id: SeatId) -> Self {
        Self {
            id,
            status: SeatStatus::Open,
            booking: None,
        }
    }
}

#[derive(Debug)]
struct SeatMap {
    seats: BTreeMap<SeatId, Seat>,
}

impl SeatMap {
    fn new(capacity: u16) -> Self {
        Self {
            seats: (1..=capacity).map(|n| (SeatId(n), Seat::open(SeatId(n)))).collect(),
        }
    }

    fn assert_invariants(&self) {
        debug_assert!(
            self.seats
                .values()
                .all(|seat| seat.booking.is_some() == (seat.status != SeatStatus::Open)),
            "Invariant violated: seat owner set without occupancy or vice versa"
        );
    }

    /// Marks an open seat as occupied by `booking`.
    fn occupy(&mut self, booking: BookingId, seat_id: SeatId) -> Result<Seat, BookingError> {
        let seat = self
            .seats
            .get_mut(&seat_id)
            .ok_or(BookingError::SeatNotFound(seat_id))?;
        if seat.status != SeatStatus::Open {
            return Err(BookingError::SeatUnavailable(seat_id));
        }
        seat.status = SeatStatus::Occupied;
        seat.booking = Some(booking);
        let seat = *seat;
        self.assert_invariants();
        Ok(seat)
    }

    /// Resets a seat to open, whatever its status.
    fn open(&mut self, seat_id: SeatId) {
        if let Some(seat) = self.seats.get_mut(&seat_id) {
            *seat = Seat::open(seat_id);
        }
        self.assert_invariants();
    }

    /// Moves a seat occupied by `booking` to checked in.
    fn check_in(&mut self, booking: BookingId, seat_id: SeatId) -> Result<(), BookingError> {
        let seat = self
            .seats
            .get_mut(&seat_id)
            .ok_or(BookingError::SeatNotFound(seat_id))?;
        if seat.status != SeatStatus::Occupied || seat.booking != Some(booking) {
            return Err(BookingError::SeatNotHeld(seat_id));
        }
        seat.status = SeatStatus::CheckedIn;
        self.assert_invariants();
        Ok(())
    }
}

/// Seat table for one flight, guarded by a single lock.
#[derive(Debug)]
pub struct SeatInventory {
    inner: Mutex<SeatMap>,
}

impl SeatInventory {
    /// Creates `capacity` open seats numbered `1..=capacity`.
    pub fn new(capacity: u16) -> Self {
        Self {
            inner: Mutex::new(SeatMap::new(capacity)),
        }
    }

    /// Releases a seat unconditionally. Unknown seats are ignored.
    pub(crate) fn open(&self, seat_id: SeatId) {
        self.inner.lock().open(seat_id)
    }

    /// Checks in a seat currently occupied by `booking`.
    ///
    /// # Errors
    ///
    /// - [`BookingError::SeatNotFound`] - no such seat on this flight.
    /// - [`BookingError::SeatNotHeld`] - seat is not occupied by `booking`.
    pub(crate) fn check_in(&self, booking: BookingId, seat_id: SeatId) -> Result<(), BookingError> {
        self.inner.lock().check_in(booking, seat_id)
    }

    /// Acquires `seat_id` and then releases `previous`, under one lock.
    ///
    /// If the new seat cannot be acquired the previous seat is kept.
    ///
    /// # Errors
    ///
    /// - [`BookingError::SeatNotFound`] - no such seat on this flight.
    /// - [`BookingError::SeatUnavailable`] - seat is occupied or checked in.
    pub(crate) fn reassign(
        &self,
        booking: BookingId,
        previous: Option<SeatId>,
        seat_id: SeatId,
    ) -> Result<Seat, BookingError> {
        let mut data = self.inner.lock();
        let seat = data.occupy(booking, seat_id)?;
        if let Some(previous) = previous {
            data.open(previous);
        }
        Ok(seat)
    }

    pub fn seat(&self, seat_id: SeatId) -> Option<Seat> {
        self.inner.lock().seats.get(&seat_id).copied()
    }

    /// Snapshot of every seat, ordered by seat number.
    pub fn seats(&self) -> Vec<Seat> {
        self.inner.lock().seats.values().copied().collect()
    }

    pub fn open_seats(&self) -> Vec<SeatId> {
        self.inner
            .lock()
            .seats
            .values()
            .filter(|seat| seat.status == SeatStatus::Open)
            .map(|seat| seat.id)
            .collect()
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().seats.len()
    }
}
