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

//! Booking engine.
//!
//! The [`Engine`] is the application root: it owns the entity [`Registry`],
//! one [`SeatInventory`] per flight, the [`FeeSchedule`] and the event outbox.
//!
//! # Booking Flow
//!
//! 1. Build a [`PriceQuote`] with [`Engine::quote`] and stack extras on it.
//! 2. [`Engine::book`] commits the quote's price and stores a new booking.
//! 3. [`Engine::process`] drives the booking through its lifecycle with
//!    [`BookingCommand`]s; only these touch seat occupancy.
//!
//! # Thread Safety
//!
//! Entities live in [`DashMap`]-backed stores. A command holds its booking's
//! entry lock for the whole transition and takes the flight's seat lock inside
//! it, always in that order.

use crate::base::{BookingId, CustomerId, FlightId, SeatId};
use crate::booking::Booking;
use crate::customer::Customer;
use crate::error::{BookingError, ValidationError};
use crate::flight::{Flight, FlightQuery};
use crate::outbox::{BookingEvent, EventOutbox};
use crate::pricing::{FeeSchedule, PriceQuote};
use crate::seat::SeatInventory;
use crate::state::Action;
use crate::store::{Entity, Registry};
use dashmap::DashMap;
use std::sync::Arc;

/// Everything needed to create a booking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingRequest {
    pub customer: CustomerId,
    pub passenger_name: String,
    pub passenger_document: String,
    /// Quote whose price becomes the booking's committed price.
    pub quote: PriceQuote,
}

/// Lifecycle command issued by a customer against one of their bookings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingCommand {
    ReserveSeat {
        customer: CustomerId,
        booking: BookingId,
        seat: SeatId,
    },
    CheckIn {
        customer: CustomerId,
        booking: BookingId,
    },
    Cancel {
        customer: CustomerId,
        booking: BookingId,
    },
}

impl BookingCommand {
    pub fn customer(&self) -> CustomerId {
        match self {
            Self::ReserveSeat { customer, .. } => *customer,
            Self::CheckIn { customer, .. } => *customer,
            Self::Cancel { customer, .. } => *customer,
        }
    }

    pub fn booking(&self) -> BookingId {
        match self {
            Self::ReserveSeat { booking, .. } => *booking,
            Self::CheckIn { booking, .. } => *booking,
            Self::Cancel { booking, .. } => *booking,
        }
    }

    pub fn action(&self) -> Action {
        match self {
            Self::ReserveSeat { .. } => Action::ReserveSeat,
            Self::CheckIn { .. } => Action::CheckIn,
            Self::Cancel { .. } => Action::Cancel,
        }
    }
}

/// Booking engine managing flights, customers, bookings and seats.
///
/// # Invariants
///
/// - Entity identities are unique per type and never reused.
/// - A seat is held by at most one booking; a booking holds at most one seat.
/// - A booking's price never changes after [`Engine::book`].
/// - `CheckedIn` and `Cancelled` bookings never change again.
pub struct Engine {
    registry: Registry,
    /// Seat inventories indexed by flight ID.
    seats: DashMap<FlightId, Arc<SeatInventory>>,
    fees: FeeSchedule,
    outbox: EventOutbox,
}

impl Engine {
    /// Creates an empty engine with the default fee schedule.
    pub fn new() -> Self {
        Self::with_fees(FeeSchedule::default())
    }

    pub fn with_fees(fees: FeeSchedule) -> Self {
        Engine {
            registry: Registry::new(),
            seats: DashMap::new(),
            fees,
            outbox: EventOutbox::new(),
        }
    }

    pub fn fees(&self) -> &FeeSchedule {
        &self.fees
    }

    // === Flights ===

    /// Stores a flight and creates its seat inventory.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Validation`] if the flight is invalid.
    pub fn add_flight(&self, flight: Flight) -> Result<FlightId, BookingError> {
        flight.validate()?;
        let seat_count = flight.seat_count;
        let id = self.registry.store::<Flight>().save(flight);
        self.seats
            .insert(id, Arc::new(SeatInventory::new(seat_count)));
        Ok(id)
    }

    pub fn flight(&self, id: FlightId) -> Option<Flight> {
        self.registry.store::<Flight>().get(id)
    }

    pub fn flights(&self) -> Vec<(FlightId, Flight)> {
        self.registry.store::<Flight>().list()
    }

    /// Flights matching every criterion of `query`, in creation order.
    pub fn search(&self, query: &FlightQuery) -> Vec<(FlightId, Flight)> {
        self.flights()
            .into_iter()
            .filter(|(id, flight)| query.matches(*id, flight))
            .collect()
    }

    /// Returns the flight's seat inventory.
    pub fn seats(&self, id: FlightId) -> Option<Arc<SeatInventory>> {
        self.seats.get(&id).map(|seats| Arc::clone(seats.value()))
    }

    /// Starts a price quote at the flight's listed fare.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::FlightNotFound`] for unknown flights.
    pub fn quote(&self, id: FlightId) -> Result<PriceQuote, BookingError> {
        let flight = self.flight(id).ok_or(BookingError::FlightNotFound)?;
        Ok(PriceQuote::new(id, &flight, self.fees.clone()))
    }

    // === Customers ===

    /// # Errors
    ///
    /// Returns [`BookingError::Validation`] if the customer is invalid.
    pub fn register_customer(&self, customer: Customer) -> Result<CustomerId, BookingError> {
        customer.validate()?;
        Ok(self.registry.store::<Customer>().save(customer))
    }

    pub fn customer(&self, id: CustomerId) -> Option<Customer> {
        self.registry.store::<Customer>().get(id)
    }

    pub fn loyalty_points(&self, id: CustomerId) -> Option<u32> {
        self.customer(id).map(|customer| customer.loyalty_points)
    }

    /// Debits loyalty points and returns the remaining balance.
    ///
    /// Called by the caller after it priced a loyalty discount; pricing never
    /// touches balances itself.
    ///
    /// # Errors
    ///
    /// - [`BookingError::CustomerNotFound`] - unknown customer.
    /// - [`BookingError::InsufficientPoints`] - balance too low; nothing debited.
    pub fn debit_points(&self, id: CustomerId, points: u32) -> Result<u32, BookingError> {
        self.registry
            .store::<Customer>()
            .modify(id, |customer| customer.debit(points))
            .ok_or(BookingError::CustomerNotFound)?
    }

    /// # Errors
    ///
    /// Returns [`BookingError::CustomerNotFound`] for unknown customers.
    pub fn credit_points(&self, id: CustomerId, points: u32) -> Result<u32, BookingError> {
        self.registry
            .store::<Customer>()
            .modify(id, |customer| customer.credit(points))
            .ok_or(BookingError::CustomerNotFound)
    }

    // === Bookings ===

    /// Creates a booking in `Booked` state with the quote's price committed.
    ///
    /// # Errors
    ///
    /// - [`BookingError::CustomerNotFound`] - unknown customer.
    /// - [`BookingError::FlightNotFound`] - the quoted flight does not exist.
    /// - [`BookingError::Validation`] - invalid extras or passenger details, or a
    ///   price outside the `Decimal` range.
    pub fn book(&self, request: BookingRequest) -> Result<BookingId, BookingError> {
        if !self.registry.store::<Customer>().contains(request.customer) {
            return Err(BookingError::CustomerNotFound);
        }
        let flight_id = request.quote.flight_id();
        if !self.registry.store::<Flight>().contains(flight_id) {
            return Err(BookingError::FlightNotFound);
        }
        request.quote.validate()?;

        let price = request.quote.price()?;
        let booking = Booking::new(
            flight_id,
            request.customer,
            request.passenger_name,
            request.passenger_document,
            price,
        );
        booking.validate()?;

        // Published under the new entry's lock so it precedes any later event.
        let (id, ()) = self
            .registry
            .store::<Booking>()
            .save_with(booking, |id, _| {
                self.outbox.push(BookingEvent::Booked {
                    booking: id,
                    flight: flight_id,
                    customer: request.customer,
                    price,
                })
            });
        Ok(id)
    }

    pub fn booking(&self, id: BookingId) -> Option<Booking> {
        self.registry.store::<Booking>().get(id)
    }

    pub fn bookings(&self) -> Vec<(BookingId, Booking)> {
        self.registry.store::<Booking>().list()
    }

    pub fn customer_bookings(&self, customer: CustomerId) -> Vec<(BookingId, Booking)> {
        self.bookings()
            .into_iter()
            .filter(|(_, booking)| booking.owner_id == customer)
            .collect()
    }

    /// Patches passenger details of a booking.
    ///
    /// Returns `Ok(None)` for unknown bookings.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if the patch is malformed or touches a
    /// lifecycle field (state, seat, price, flight, owner).
    pub fn update_booking(
        &self,
        id: BookingId,
        patch: serde_json::Value,
    ) -> Result<Option<Booking>, ValidationError> {
        self.registry.store::<Booking>().update(id, patch)
    }

    /// Applies a lifecycle command to a booking.
    ///
    /// # Commands
    ///
    /// | Command | Behavior |
    /// |---------|----------|
    /// | ReserveSeat | Acquires the new seat, then releases the old one |
    /// | CheckIn | Checks in the held seat |
    /// | Cancel | Releases the held seat |
    ///
    /// # Errors
    ///
    /// - [`BookingError::BookingNotFound`] - unknown booking.
    /// - [`BookingError::NotOwner`] - the customer does not own the booking.
    /// - [`BookingError::InvalidTransition`] / [`BookingError::AlreadyInState`] -
    ///   the booking's state forbids the command.
    /// - [`BookingError::NoSeatSelected`] - check-in without a seat.
    /// - [`BookingError::SeatNotFound`] / [`BookingError::SeatUnavailable`] /
    ///   [`BookingError::SeatNotHeld`] - seat inventory rejected the change.
    pub fn process(&self, command: BookingCommand) -> Result<(), BookingError> {
        let id = command.booking();
        self.registry
            .store::<Booking>()
            .modify(id, |booking| {
                if booking.owner_id != command.customer() {
                    return Err(BookingError::NotOwner);
                }
                let seats = self
                    .seats(booking.flight_id)
                    .ok_or(BookingError::FlightNotFound)?;

                let event = match command {
                    BookingCommand::ReserveSeat { seat, .. } => {
                        let released = booking.seat_id();
                        let seat = booking.reserve_seat(id, seat, &seats)?;
                        BookingEvent::SeatReserved {
                            booking: id,
                            seat: seat.id,
                            released,
                        }
                    }
                    BookingCommand::CheckIn { .. } => {
                        let seat = booking.check_in(id, &seats)?;
                        BookingEvent::CheckedIn { booking: id, seat }
                    }
                    BookingCommand::Cancel { .. } => {
                        let released = booking.cancel(&seats)?;
                        BookingEvent::Cancelled {
                            booking: id,
                            released,
                        }
                    }
                };
                // Pushed before the entry lock drops, so per-booking order
                // in the outbox is commit order.
                self.outbox.push(event);
                Ok(())
            })
            .ok_or(BookingError::BookingNotFound)?
    }

    /// Removes and returns all events committed since the last drain.
    pub fn drain_events(&self) -> Vec<BookingEvent> {
        self.outbox.drain()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
