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

//! # Booking Demo
//!
//! This library provides the core of a flight booking workflow: customers
//! reserve seats on flights, check in, or cancel.
//!
//! ## Core Components
//!
//! - [`EntityStore`] / [`Registry`]: identity-assigning in-memory stores, one per entity type
//! - [`SeatInventory`]: per-flight seat table with open/occupied/checked-in seats
//! - [`PriceQuote`]: a base fare with an ordered chain of fees and discounts
//! - [`BookingState`]: lifecycle state machine driven through [`Booking`]
//! - [`Engine`]: application root tying flights, customers and bookings together
//! - [`BookingError`]: error types for rejected operations
//!
//! ## Example
//!
//! ```
//! use booking_demo_rs::{
//!     BookingCommand, BookingRequest, BookingState, Customer, Engine, Extra, Flight, SeatId,
//! };
//! use chrono::NaiveDate;
//! use rust_decimal_macros::dec;
//!
//! let engine = Engine::new();
//! let day = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
//! let flight = engine
//!     .add_flight(Flight::new(
//!         "GRU",
//!         "JFK",
//!         day.and_hms_opt(8, 0, 0).unwrap(),
//!         day.and_hms_opt(18, 0, 0).unwrap(),
//!         dec!(500.00),
//!         30,
//!     ))
//!     .unwrap();
//! let customer = engine.register_customer(Customer::new("ana", 0)).unwrap();
//!
//! // Price the trip, then commit it as a booking
//! let quote = engine.quote(flight).unwrap().with(Extra::SeatSelection);
//! let booking = engine
//!     .book(BookingRequest {
//!         customer,
//!         passenger_name: "Ana Lima".into(),
//!         passenger_document: "123.456.789-09".into(),
//!         quote,
//!     })
//!     .unwrap();
//!
//! engine
//!     .process(BookingCommand::ReserveSeat { customer, booking, seat: SeatId(5) })
//!     .unwrap();
//! engine
//!     .process(BookingCommand::CheckIn { customer, booking })
//!     .unwrap();
//!
//! let booking = engine.booking(booking).unwrap();
//! assert_eq!(booking.price(), dec!(540.00));
//! assert_eq!(booking.state(), BookingState::CheckedIn);
//! ```
//!
//! ## Thread Safety
//!
//! Stores are backed by `DashMap` and each flight's seats sit behind one
//! mutex, so seat acquisition is an atomic check-then-set.

mod base;
pub mod booking;
pub mod customer;
mod engine;
pub mod error;
pub mod flight;
mod outbox;
pub mod pricing;
pub mod seat;
pub mod state;
pub mod store;

pub use base::{BookingId, CustomerId, FlightId, SeatId};
pub use booking::Booking;
pub use customer::Customer;
pub use engine::{BookingCommand, BookingRequest, Engine};
pub use error::{BookingError, ErrorKind, ValidationError};
pub use flight::{Flight, FlightQuery};
pub use outbox::{BookingEvent, EventOutbox};
pub use pricing::{Extra, FeeSchedule, InsuranceTier, LoyaltyTier, PriceQuote};
pub use seat::{Seat, SeatInventory, SeatStatus};
pub use state::{Action, BookingState};
pub use store::{Entity, EntityStore, Registry};
