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

//! Flights and flight search.

use crate::base::FlightId;
use crate::error::ValidationError;
use crate::store::Entity;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A scheduled flight with its listed fare.
///
/// The seat inventory is created alongside the flight and owned by the
/// [`Engine`](crate::Engine); the record itself only stores the seat count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flight {
    pub origin: String,
    pub destination: String,
    pub departure: NaiveDateTime,
    pub arrival: NaiveDateTime,
    pub fare: Decimal,
    pub seat_count: u16,
}

impl Flight {
    pub fn new(
        origin: impl Into<String>,
        destination: impl Into<String>,
        departure: NaiveDateTime,
        arrival: NaiveDateTime,
        fare: Decimal,
        seat_count: u16,
    ) -> Self {
        Self {
            origin: origin.into(),
            destination: destination.into(),
            departure,
            arrival,
            fare,
            seat_count,
        }
    }

    /// Returns `"{origin} → {destination}"`.
    pub fn route(&self) -> String {
        format!("{} → {}", self.origin, self.destination)
    }
}

impl Entity for Flight {
    type Id = FlightId;
    const KIND: &'static str = "flight";

    fn validate(&self) -> Result<(), ValidationError> {
        if self.origin.trim().is_empty() {
            return Err(ValidationError::new(Self::KIND, "origin", "must not be empty"));
        }
        if self.destination.trim().is_empty() {
            return Err(ValidationError::new(Self::KIND, "destination", "must not be empty"));
        }
        if self.origin.eq_ignore_ascii_case(&self.destination) {
            return Err(ValidationError::new(
                Self::KIND,
                "destination",
                "must differ from origin",
            ));
        }
        if self.arrival <= self.departure {
            return Err(ValidationError::new(
                Self::KIND,
                "arrival",
                "must be after departure",
            ));
        }
        if self.fare < Decimal::ZERO {
            return Err(ValidationError::new(Self::KIND, "fare", "must not be negative"));
        }
        if self.seat_count == 0 {
            return Err(ValidationError::new(Self::KIND, "seat_count", "must be at least 1"));
        }
        Ok(())
    }

    /// The seat inventory is sized once; it cannot be resized by a patch.
    fn check_update(previous: &Self, next: &Self) -> Result<(), ValidationError> {
        if previous.seat_count != next.seat_count {
            return Err(ValidationError::new(Self::KIND, "seat_count", "is immutable"));
        }
        next.validate()
    }
}

/// Conjunctive flight search criteria. Unset criteria match every flight.
///
/// # Example
///
/// ```
/// use booking_demo_rs::FlightQuery;
/// use rust_decimal_macros::dec;
///
/// let query = FlightQuery::new().from("GRU").price_between(dec!(100), dec!(600));
/// assert_eq!(query.describe(), "from GRU + price 100-600");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlightQuery {
    flight: Option<FlightId>,
    from: Option<String>,
    to: Option<String>,
    min_price: Option<Decimal>,
    max_price: Option<Decimal>,
    departing: Option<(NaiveDateTime, NaiveDateTime)>,
    arriving: Option<(NaiveDateTime, NaiveDateTime)>,
}

impl FlightQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flight(mut self, id: FlightId) -> Self {
        self.flight = Some(id);
        self
    }

    pub fn from(mut self, origin: impl Into<String>) -> Self {
        self.from = Some(origin.into());
        self
    }

    pub fn to(mut self, destination: impl Into<String>) -> Self {
        self.to = Some(destination.into());
        self
    }

    /// Inclusive fare range.
    pub fn price_between(mut self, min: Decimal, max: Decimal) -> Self {
        self.min_price = Some(min);
        self.max_price = Some(max);
        self
    }

    pub fn max_price(mut self, max: Decimal) -> Self {
        self.max_price = Some(max);
        self
    }

    /// Inclusive departure window.
    pub fn departing_between(mut self, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        self.departing = Some((start, end));
        self
    }

    /// Inclusive arrival window.
    pub fn arriving_between(mut self, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        self.arriving = Some((start, end));
        self
    }

    pub fn matches(&self, id: FlightId, flight: &Flight) -> bool {
        let within = |at: NaiveDateTime, window: Option<(NaiveDateTime, NaiveDateTime)>| {
            window.is_none_or(|(start, end)| start <= at && at <= end)
        };

        self.flight.is_none_or(|wanted| wanted == id)
            && self
                .from
                .as_ref()
                .is_none_or(|origin| origin.eq_ignore_ascii_case(&flight.origin))
            && self
                .to
                .as_ref()
                .is_none_or(|destination| destination.eq_ignore_ascii_case(&flight.destination))
            && self.min_price.is_none_or(|min| flight.fare >= min)
            && self.max_price.is_none_or(|max| flight.fare <= max)
            && within(flight.departure, self.departing)
            && within(flight.arrival, self.arriving)
    }

    /// Human-readable summary of the active criteria.
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(id) = self.flight {
            parts.push(format!("flight {id}"));
        }
        if let Some(origin) = &self.from {
            parts.push(format!("from {origin}"));
        }
        if let Some(destination) = &self.to {
            parts.push(format!("to {destination}"));
        }
        match (self.min_price, self.max_price) {
            (Some(min), Some(max)) => parts.push(format!("price {min}-{max}")),
            (Some(min), None) => parts.push(format!("price from {min}")),
            (None, Some(max)) => parts.push(format!("price up to {max}")),
            (None, None) => {}
        }
        if let Some((start, end)) = self.departing {
            parts.push(format!("departing {} - {}", start.date(), end.date()));
        }
        if let Some((start, end)) = self.arriving {
            parts.push(format!("arriving {} - {}", start.date(), end.date()));
        }

        if parts.is_empty() {
            "no filters".to_string()
        } else {
            parts.join(" + ")
        }
    }
}
