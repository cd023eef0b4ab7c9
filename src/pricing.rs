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

//! Composable flight pricing.
//!
//! A [`PriceQuote`] starts from a flight's listed fare and applies an ordered
//! list of [`Extra`]s. Flat fees add to the running total; a loyalty discount
//! takes a percentage off whatever total has accumulated at its position, so
//! a discount placed after the fees also discounts the fees.
//!
//! Nothing is cached: [`PriceQuote::price`] and [`PriceQuote::features`]
//! recompute from the fare every time, and the flight is never modified.
//!
//! # Example
//!
//! ```
//! use booking_demo_rs::{Extra, FeeSchedule, Flight, FlightId, PriceQuote};
//! use chrono::NaiveDate;
//! use rust_decimal_macros::dec;
//!
//! let day = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
//! let flight = Flight::new(
//!     "GRU",
//!     "JFK",
//!     day.and_hms_opt(8, 0, 0).unwrap(),
//!     day.and_hms_opt(18, 0, 0).unwrap(),
//!     dec!(500.00),
//!     30,
//! );
//!
//! let quote = PriceQuote::new(FlightId(0), &flight, FeeSchedule::default())
//!     .with(Extra::SeatSelection)
//!     .with(Extra::Baggage { bags: 1 });
//! assert_eq!(quote.price(), Ok(dec!(689.99)));
//!
//! let discounted = quote.with(Extra::LoyaltyDiscount { percent: dec!(10) });
//! assert_eq!(discounted.price(), Ok(dec!(620.991)));
//! ```

use crate::base::FlightId;
use crate::error::ValidationError;
use crate::flight::Flight;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Flat fees charged for each add-on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeSchedule {
    pub seat_selection: Decimal,
    pub priority_boarding: Decimal,
    /// Charged once per bag.
    pub baggage_per_bag: Decimal,
    pub insurance_basic: Decimal,
    pub insurance_premium: Decimal,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            seat_selection: dec!(40.00),
            priority_boarding: dec!(59.90),
            baggage_per_bag: dec!(149.99),
            insurance_basic: dec!(29.90),
            insurance_premium: dec!(79.90),
        }
    }
}

impl FeeSchedule {
    pub fn insurance(&self, tier: InsuranceTier) -> Decimal {
        match tier {
            InsuranceTier::Basic => self.insurance_basic,
            InsuranceTier::Premium => self.insurance_premium,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsuranceTier {
    Basic,
    Premium,
}

impl fmt::Display for InsuranceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Basic => "Basic",
            Self::Premium => "Premium",
        })
    }
}

/// One pricing step applied on top of the running total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extra {
    SeatSelection,
    PriorityBoarding,
    Baggage { bags: u32 },
    Insurance(InsuranceTier),
    /// Percentage off the total accumulated so far.
    LoyaltyDiscount { percent: Decimal },
}

impl Extra {
    /// Flat fee this extra adds; zero for discounts. `None` on overflow.
    fn fee(&self, fees: &FeeSchedule) -> Option<Decimal> {
        match self {
            Self::SeatSelection => Some(fees.seat_selection),
            Self::PriorityBoarding => Some(fees.priority_boarding),
            Self::Baggage { bags } => fees.baggage_per_bag.checked_mul(Decimal::from(*bags)),
            Self::Insurance(tier) => Some(fees.insurance(*tier)),
            Self::LoyaltyDiscount { .. } => Some(Decimal::ZERO),
        }
    }

    /// New running total, or `None` if it leaves the `Decimal` range.
    fn apply(&self, running: Decimal, fees: &FeeSchedule) -> Option<Decimal> {
        match self {
            Self::LoyaltyDiscount { percent } => {
                let off = running.checked_mul(percent.checked_div(dec!(100))?)?;
                running.checked_sub(off)
            }
            _ => running.checked_add(self.fee(fees)?),
        }
    }

    fn feature(&self, fees: &FeeSchedule) -> String {
        let fee = self
            .fee(fees)
            .map_or_else(|| "overflow".to_string(), |fee| fee.to_string());
        match self {
            Self::SeatSelection => format!("Seat selection (+{fee})"),
            Self::PriorityBoarding => format!("Priority boarding (+{fee})"),
            Self::Baggage { bags } => format!("{bags}x Extra baggage (+{fee})"),
            Self::Insurance(tier) => format!("{tier} insurance (+{fee})"),
            Self::LoyaltyDiscount { percent } => format!("Loyalty discount {percent}%"),
        }
    }

    fn summary(&self) -> String {
        match self {
            Self::SeatSelection => "Seat selection".to_string(),
            Self::PriorityBoarding => "Priority boarding".to_string(),
            Self::Baggage { bags } => format!("{bags} extra bag(s)"),
            Self::Insurance(tier) => format!("{tier} insurance"),
            Self::LoyaltyDiscount { percent } => format!("Loyalty discount {percent}%"),
        }
    }

    /// # Errors
    ///
    /// Rejects zero bags and discounts outside `0..=100` percent.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Baggage { bags: 0 } => Err(ValidationError::new(
                "extra",
                "bags",
                "must be at least 1",
            )),
            Self::LoyaltyDiscount { percent }
                if *percent < Decimal::ZERO || *percent > dec!(100) =>
            {
                Err(ValidationError::new(
                    "extra",
                    "percent",
                    "must be between 0 and 100",
                ))
            }
            _ => Ok(()),
        }
    }
}

/// A base fare plus the extras stacked on top of it, in application order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceQuote {
    flight_id: FlightId,
    route: String,
    fare: Decimal,
    fees: FeeSchedule,
    extras: Vec<Extra>,
}

impl PriceQuote {
    /// Starts a quote at the flight's listed fare.
    pub fn new(flight_id: FlightId, flight: &Flight, fees: FeeSchedule) -> Self {
        Self {
            flight_id,
            route: flight.route(),
            fare: flight.fare,
            fees,
            extras: Vec::new(),
        }
    }

    /// Stacks `extra` on top of the current chain.
    pub fn with(mut self, extra: Extra) -> Self {
        self.extras.push(extra);
        self
    }

    pub fn flight_id(&self) -> FlightId {
        self.flight_id
    }

    pub fn fare(&self) -> Decimal {
        self.fare
    }

    pub fn extras(&self) -> &[Extra] {
        &self.extras
    }

    pub fn has(&self, extra: &Extra) -> bool {
        self.extras.contains(extra)
    }

    /// Total after applying every extra in order.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] on field `price` if the total leaves the
    /// range `Decimal` can represent.
    pub fn price(&self) -> Result<Decimal, ValidationError> {
        self.extras
            .iter()
            .try_fold(self.fare, |running, extra| extra.apply(running, &self.fees))
            .ok_or_else(|| ValidationError::new("quote", "price", "is out of range"))
    }

    /// Feature labels, base fare first, then one per extra in order.
    pub fn features(&self) -> Vec<String> {
        std::iter::once("Base fare".to_string())
            .chain(self.extras.iter().map(|extra| extra.feature(&self.fees)))
            .collect()
    }

    pub fn description(&self) -> String {
        let mut description = format!("Flight {}: {}", self.flight_id, self.route);
        for extra in &self.extras {
            description.push_str(" + ");
            description.push_str(&extra.summary());
        }
        description
    }

    /// Validates every extra in the chain.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.extras.iter().try_for_each(Extra::validate)
    }
}

/// Loyalty redemption tier: a discount bought with points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoyaltyTier {
    pub percent: Decimal,
    pub points: u32,
}

impl LoyaltyTier {
    pub const ALL: [LoyaltyTier; 3] = [
        LoyaltyTier {
            percent: dec!(10),
            points: 100,
        },
        LoyaltyTier {
            percent: dec!(15),
            points: 200,
        },
        LoyaltyTier {
            percent: dec!(25),
            points: 300,
        },
    ];

    /// Tiers a customer with `balance` points can pay for.
    pub fn affordable(balance: u32) -> impl Iterator<Item = LoyaltyTier> {
        Self::ALL.into_iter().filter(move |tier| tier.points <= balance)
    }

    pub fn extra(&self) -> Extra {
        Extra::LoyaltyDiscount {
            percent: self.percent,
        }
    }
}
