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

//! Bookings and their lifecycle transitions.
//!
//! A booking's state and seat only change through [`Booking::reserve_seat`],
//! [`Booking::check_in`] and [`Booking::cancel`]. These are also the only
//! operations that touch a flight's [`SeatInventory`] on a booking's behalf.
//!
//! # Example
//!
//! ```
//! use booking_demo_rs::{Booking, BookingId, BookingState, CustomerId, FlightId, SeatId, SeatInventory};
//! use rust_decimal_macros::dec;
//!
//! let seats = SeatInventory::new(10);
//! let mut booking = Booking::new(FlightId(0), CustomerId(0), "Ana Lima", "123.456.789-09", dec!(500));
//!
//! booking.reserve_seat(BookingId(0), SeatId(5), &seats).unwrap();
//! booking.check_in(BookingId(0), &seats).unwrap();
//! assert_eq!(booking.state(), BookingState::CheckedIn);
//! assert!(booking.cancel(&seats).is_err());
//! ```

use crate::base::{BookingId, CustomerId, FlightId, SeatId};
use crate::error::{BookingError, ValidationError};
use crate::seat::{Seat, SeatInventory};
use crate::state::{Action, BookingState};
use crate::store::Entity;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Brazilian CPF layout: `ddd.ddd.ddd-dd`.
static PASSENGER_DOCUMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{3}\.\d{3}\.\d{3}-\d{2}$").expect("valid document pattern"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub flight_id: FlightId,
    pub owner_id: CustomerId,
    pub passenger_name: String,
    pub passenger_document: String,
    /// Committed amount, fixed at creation.
    price: Decimal,
    seat_id: Option<SeatId>,
    state: BookingState,
}

impl Booking {
    /// Creates a booking in [`BookingState::Booked`] without a seat.
    pub fn new(
        flight_id: FlightId,
        owner_id: CustomerId,
        passenger_name: impl Into<String>,
        passenger_document: impl Into<String>,
        price: Decimal,
    ) -> Self {
        Self {
            flight_id,
            owner_id,
            passenger_name: passenger_name.into(),
            passenger_document: passenger_document.into(),
            price,
            seat_id: None,
            state: BookingState::Booked,
        }
    }

    pub fn price(&self) -> Decimal {
        self.price
    }

    pub fn seat_id(&self) -> Option<SeatId> {
        self.seat_id
    }

    pub fn state(&self) -> BookingState {
        self.state
    }

    pub fn can_cancel(&self) -> bool {
        self.state.can_cancel()
    }

    pub fn can_check_in(&self) -> bool {
        self.state.can_check_in()
    }

    pub fn can_change_seat(&self) -> bool {
        self.state.can_change_seat()
    }

    /// Acquires `seat_id` for this booking, then releases the seat it held.
    ///
    /// On failure the previously held seat, if any, is kept.
    ///
    /// # Errors
    ///
    /// - [`BookingError::InvalidTransition`] - booking is checked in or cancelled.
    /// - [`BookingError::SeatNotFound`] - no such seat on the flight.
    /// - [`BookingError::SeatUnavailable`] - seat is taken (including by this booking).
    pub fn reserve_seat(
        &mut self,
        id: BookingId,
        seat_id: SeatId,
        seats: &SeatInventory,
    ) -> Result<Seat, BookingError> {
        self.state.next(Action::ReserveSeat)?;
        let seat = seats.reassign(id, self.seat_id, seat_id)?;
        self.seat_id = Some(seat.id);
        Ok(seat)
    }

    /// Checks in the booking's seat and moves to [`BookingState::CheckedIn`].
    ///
    /// Returns the checked-in seat.
    ///
    /// # Errors
    ///
    /// - [`BookingError::AlreadyInState`] - booking is already checked in.
    /// - [`BookingError::InvalidTransition`] - booking is cancelled.
    /// - [`BookingError::NoSeatSelected`] - no seat reserved yet.
    /// - [`BookingError::SeatNotHeld`] - the inventory disagrees about ownership.
    pub fn check_in(&mut self, id: BookingId, seats: &SeatInventory) -> Result<SeatId, BookingError> {
        let next = self.state.next(Action::CheckIn)?;
        let seat_id = self.seat_id.ok_or(BookingError::NoSeatSelected)?;
        seats.check_in(id, seat_id)?;
        self.state = next;
        Ok(seat_id)
    }

    /// Releases any held seat and moves to [`BookingState::Cancelled`].
    ///
    /// Returns the released seat, if one was held.
    ///
    /// # Errors
    ///
    /// - [`BookingError::AlreadyInState`] - booking is already cancelled.
    /// - [`BookingError::InvalidTransition`] - booking is checked in.
    pub fn cancel(&mut self, seats: &SeatInventory) -> Result<Option<SeatId>, BookingError> {
        let next = self.state.next(Action::Cancel)?;
        let released = self.seat_id.take();
        if let Some(seat_id) = released {
            seats.open(seat_id);
        }
        self.state = next;
        Ok(released)
    }
}

impl Entity for Booking {
    type Id = BookingId;
    const KIND: &'static str = "booking";

    fn validate(&self) -> Result<(), ValidationError> {
        if self.passenger_name.trim().is_empty() {
            return Err(ValidationError::new(
                Self::KIND,
                "passenger_name",
                "must not be empty",
            ));
        }
        if !PASSENGER_DOCUMENT.is_match(&self.passenger_document) {
            return Err(ValidationError::new(
                Self::KIND,
                "passenger_document",
                "must look like 000.000.000-00",
            ));
        }
        if self.price < Decimal::ZERO {
            return Err(ValidationError::new(Self::KIND, "price", "must not be negative"));
        }
        match (self.state, self.seat_id) {
            (BookingState::CheckedIn, None) => Err(ValidationError::new(
                Self::KIND,
                "seat_id",
                "checked-in booking must hold a seat",
            )),
            (BookingState::Cancelled, Some(_)) => Err(ValidationError::new(
                Self::KIND,
                "seat_id",
                "cancelled booking must not hold a seat",
            )),
            _ => Ok(()),
        }
    }

    /// Only passenger details may change through a store update.
    fn check_update(previous: &Self, next: &Self) -> Result<(), ValidationError> {
        let locked = [
            ("flight_id", previous.flight_id == next.flight_id),
            ("owner_id", previous.owner_id == next.owner_id),
            ("price", previous.price == next.price),
            ("seat_id", previous.seat_id == next.seat_id),
            ("state", previous.state == next.state),
        ];
        if let Some((field, _)) = locked.iter().find(|(_, unchanged)| !unchanged) {
            return Err(ValidationError::new(Self::KIND, *field, "is immutable"));
        }
        next.validate()
    }
}
