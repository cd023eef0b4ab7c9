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

use booking_demo_rs::{
    BookingCommand, BookingId, BookingRequest, Customer, CustomerId, Engine, Extra, FeeSchedule,
    Flight, FlightId, InsuranceTier, LoyaltyTier, SeatId,
};
use chrono::NaiveDateTime;
use clap::Parser;
use csv::{ReaderBuilder, Trim, Writer};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process;
use tracing::{debug, error, warn};
use tracing_subscriber::EnvFilter;

/// Booking Engine - Replay booking commands against a flight schedule
///
/// Loads flights and customers, applies the commands CSV in order and writes
/// the resulting bookings to stdout.
#[derive(Parser, Debug)]
#[command(name = "booking-demo-rs")]
#[command(about = "A booking engine that replays booking command CSVs", long_about = None)]
struct Args {
    /// Path to CSV file with booking commands
    ///
    /// Expected format: type,customer,flight,booking,seat,passenger,document,extras
    /// Example: cargo run -- --flights flights.csv --customers customers.csv commands.csv
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// CSV with columns origin,destination,departure,arrival,fare,seats
    #[arg(long, value_name = "FILE")]
    flights: PathBuf,

    /// CSV with columns username,points
    #[arg(long, value_name = "FILE")]
    customers: PathBuf,

    /// JSON fee schedule overriding the default add-on fees
    #[arg(long, value_name = "FILE")]
    fees: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let fees = match args.fees.as_deref().map(load_fees).transpose() {
        Ok(fees) => fees.unwrap_or_default(),
        Err(e) => {
            error!("Error reading fee schedule: {}", e);
            process::exit(1);
        }
    };
    let engine = Engine::with_fees(fees);

    let loaded = open(&args.flights)
        .and_then(|file| load_flights(&engine, file).map_err(|e| e.to_string()))
        .and_then(|()| open(&args.customers))
        .and_then(|file| load_customers(&engine, file).map_err(|e| e.to_string()))
        .and_then(|()| open(&args.input))
        .and_then(|file| process_commands(&engine, file).map_err(|e| e.to_string()));
    if let Err(e) = loaded {
        error!("Error processing input: {}", e);
        process::exit(1);
    }

    // Write results to stdout
    if let Err(e) = write_bookings(&engine, std::io::stdout()) {
        error!("Error writing output: {}", e);
        process::exit(1);
    }
}

fn open(path: &Path) -> Result<BufReader<File>, String> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| format!("cannot open '{}': {}", path.display(), e))
}

fn load_fees(path: &Path) -> Result<FeeSchedule, String> {
    let reader = open(path)?;
    serde_json::from_reader(reader).map_err(|e| e.to_string())
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .has_headers(true)
        .from_reader(reader)
}

/// Raw flight row: `origin, destination, departure, arrival, fare, seats`.
#[derive(Debug, Deserialize)]
struct CsvFlight {
    origin: String,
    destination: String,
    departure: NaiveDateTime,
    arrival: NaiveDateTime,
    fare: Decimal,
    seats: u16,
}

/// Loads flights in file order; the n-th valid row becomes flight `n`.
///
/// Malformed or invalid rows are skipped.
pub fn load_flights<R: Read>(engine: &Engine, reader: R) -> Result<(), csv::Error> {
    for result in csv_reader(reader).deserialize::<CsvFlight>() {
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                debug!("Skipping malformed flight row: {}", e);
                continue;
            }
        };
        let flight = Flight::new(
            row.origin,
            row.destination,
            row.departure,
            row.arrival,
            row.fare,
            row.seats,
        );
        if let Err(e) = engine.add_flight(flight) {
            warn!("Skipping flight: {}", e);
        }
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct CsvCustomer {
    username: String,
    points: u32,
}

/// Loads customers in file order; the n-th valid row becomes customer `n`.
pub fn load_customers<R: Read>(engine: &Engine, reader: R) -> Result<(), csv::Error> {
    for result in csv_reader(reader).deserialize::<CsvCustomer>() {
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                debug!("Skipping malformed customer row: {}", e);
                continue;
            }
        };
        if let Err(e) = engine.register_customer(Customer::new(row.username, row.points)) {
            warn!("Skipping customer: {}", e);
        }
    }
    Ok(())
}

/// Raw command row matching the input format.
///
/// Fields: `type, customer, flight, booking, seat, passenger, document, extras`
#[derive(Debug, Deserialize)]
struct CsvCommand {
    #[serde(rename = "type")]
    command: String,
    customer: u32,
    #[serde(deserialize_with = "csv::invalid_option")]
    flight: Option<u32>,
    #[serde(deserialize_with = "csv::invalid_option")]
    booking: Option<u32>,
    #[serde(deserialize_with = "csv::invalid_option")]
    seat: Option<u16>,
    passenger: Option<String>,
    document: Option<String>,
    extras: Option<String>,
}

/// Parses a `;`-separated extras list such as `seat;bags:2;discount:10`.
///
/// Returns `None` if any entry is unknown or malformed.
fn parse_extras(raw: &str) -> Option<Vec<Extra>> {
    raw.split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (name, value) = entry.split_once(':').unwrap_or((entry, ""));
            match (name.to_lowercase().as_str(), value) {
                ("seat", "") => Some(Extra::SeatSelection),
                ("priority", "") => Some(Extra::PriorityBoarding),
                ("bags", n) => n.parse().ok().map(|bags| Extra::Baggage { bags }),
                ("insurance", "basic") => Some(Extra::Insurance(InsuranceTier::Basic)),
                ("insurance", "premium") => Some(Extra::Insurance(InsuranceTier::Premium)),
                ("discount", p) => p
                    .parse()
                    .ok()
                    .map(|percent| Extra::LoyaltyDiscount { percent }),
                _ => None,
            }
        })
        .collect()
}

/// Books a flight, debiting loyalty points for a discount in the extras.
///
/// At most one loyalty discount may be redeemed per booking.
fn book(engine: &Engine, row: CsvCommand) -> Result<BookingId, String> {
    let customer = CustomerId(row.customer);
    let flight = FlightId(row.flight.ok_or("missing flight")?);
    let extras = parse_extras(row.extras.as_deref().unwrap_or(""))
        .ok_or_else(|| "invalid extras".to_string())?;

    let mut quote = engine.quote(flight).map_err(|e| e.to_string())?;
    let mut redeemed: Option<LoyaltyTier> = None;
    for extra in extras {
        if let Extra::LoyaltyDiscount { percent } = extra {
            if redeemed.is_some() {
                return Err("only one loyalty discount per booking".to_string());
            }
            let tier = LoyaltyTier::ALL
                .into_iter()
                .find(|tier| tier.percent == percent)
                .ok_or_else(|| format!("no loyalty tier for {percent}%"))?;
            redeemed = Some(tier);
        }
        quote = quote.with(extra);
    }

    if let Some(tier) = redeemed {
        engine
            .debit_points(customer, tier.points)
            .map_err(|e| e.to_string())?;
    }

    let request = BookingRequest {
        customer,
        passenger_name: row.passenger.unwrap_or_default(),
        passenger_document: row.document.unwrap_or_default(),
        quote,
    };
    engine.book(request).map_err(|e| {
        if let Some(tier) = redeemed {
            if let Err(refund) = engine.credit_points(customer, tier.points) {
                warn!(
                    customer = %customer,
                    points = tier.points,
                    "Could not refund loyalty points: {}",
                    refund
                );
            }
        }
        e.to_string()
    })
}

/// Applies one command row.
fn apply(engine: &Engine, row: CsvCommand) -> Result<(), String> {
    let customer = CustomerId(row.customer);
    let booking = row.booking.map(BookingId).ok_or("missing booking");

    let command = match row.command.to_lowercase().as_str() {
        "book" => return book(engine, row).map(|_| ()),
        "reserve" => BookingCommand::ReserveSeat {
            customer,
            booking: booking?,
            seat: row.seat.map(SeatId).ok_or("missing seat")?,
        },
        "checkin" => BookingCommand::CheckIn {
            customer,
            booking: booking?,
        },
        "cancel" => BookingCommand::Cancel {
            customer,
            booking: booking?,
        },
        other => return Err(format!("unknown command '{other}'")),
    };
    engine.process(command).map_err(|e| e.to_string())
}

/// Process booking commands from a CSV reader.
///
/// Commands are applied in file order. Malformed rows and rejected commands
/// are skipped and reported through `tracing`. Committed booking events are
/// drained after every row and logged at `debug`.
///
/// # CSV Format
///
/// ```csv
/// type,customer,flight,booking,seat,passenger,document,extras
/// book,0,0,,,Ana Lima,123.456.789-09,seat;bags:1
/// reserve,0,,0,5,,,
/// checkin,0,,0,,,,
/// ```
///
/// # Errors
///
/// Returns a CSV error if the reader fails.
pub fn process_commands<R: Read>(engine: &Engine, reader: R) -> Result<(), csv::Error> {
    for (line, result) in csv_reader(reader).deserialize::<CsvCommand>().enumerate() {
        match result {
            Ok(row) => {
                if let Err(e) = apply(engine, row) {
                    warn!(row = line + 1, "Skipping command: {}", e);
                }
                for event in engine.drain_events() {
                    debug!(row = line + 1, booking = %event.booking(), ?event, "Committed");
                }
            }
            Err(e) => {
                debug!(row = line + 1, "Skipping malformed row: {}", e);
            }
        }
    }
    Ok(())
}

/// Output row: one per booking.
#[derive(Debug, Serialize)]
struct BookingRow {
    booking: BookingId,
    flight: FlightId,
    customer: CustomerId,
    passenger: String,
    price: Decimal,
    seat: Option<SeatId>,
    status: &'static str,
}

/// Write bookings to a CSV writer, prices rounded to 2 decimal places.
///
/// # CSV Format
///
/// ```csv
/// booking,flight,customer,passenger,price,seat,status
/// 0,0,0,Ana Lima,689.99,5,checked_in
/// ```
///
/// # Errors
///
/// Returns a CSV error if writing fails.
pub fn write_bookings<W: Write>(engine: &Engine, writer: W) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);

    for (id, booking) in engine.bookings() {
        wtr.serialize(BookingRow {
            booking: id,
            flight: booking.flight_id,
            customer: booking.owner_id,
            passenger: booking.passenger_name.clone(),
            price: booking.price().round_dp(2),
            seat: booking.seat_id(),
            status: booking.state().status_name(),
        })?;
    }

    wtr.flush()?;
    Ok(())
}
