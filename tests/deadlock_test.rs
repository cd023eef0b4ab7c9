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

//! Deadlock detection tests using parking_lot's built-in deadlock detector.
//!
//! These tests drive the real engine from many threads. Commands take a
//! booking's entry lock and then its flight's seat lock, always in that order.
//!
//! The seat inventory uses parking_lot::Mutex, so with the `deadlock_detection`
//! feature any cycle in the lock graph is reported by the detector thread.

use booking_demo_rs::{
    BookingCommand, BookingError, BookingEvent, BookingId, BookingRequest, BookingState,
    Customer, CustomerId, Engine, Flight, FlightId, SeatId, SeatStatus,
};
use chrono::NaiveDate;
use parking_lot::deadlock;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

// === Fixtures ===

/// Engine with `flights` flights of `seats` seats and `customers` customers.
fn setup(flights: u16, seats: u16, customers: u32) -> Arc<Engine> {
    let engine = Engine::new();
    let day = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
    for _ in 0..flights {
        engine
            .add_flight(Flight::new(
                "GRU",
                "JFK",
                day.and_hms_opt(8, 0, 0).unwrap(),
                day.and_hms_opt(18, 0, 0).unwrap(),
                dec!(500.00),
                seats,
            ))
            .unwrap();
    }
    for i in 0..customers {
        engine
            .register_customer(Customer::new(format!("user{i}"), 0))
            .unwrap();
    }
    Arc::new(engine)
}

fn book(engine: &Engine, customer: CustomerId, flight: FlightId) -> BookingId {
    engine
        .book(BookingRequest {
            customer,
            passenger_name: "Ana Lima".to_string(),
            passenger_document: "123.456.789-09".to_string(),
            quote: engine.quote(flight).unwrap(),
        })
        .unwrap()
}

// === Deadlock Detection Infrastructure ===

/// Starts a background thread that checks for deadlocks.
/// Returns a handle to stop the detector.
fn start_deadlock_detector() -> Arc<AtomicBool> {
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = running.clone();

    thread::spawn(move || {
        while running_clone.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(100));
            let deadlocks = deadlock::check_deadlock();
            if !deadlocks.is_empty() {
                eprintln!("\n=== DEADLOCK DETECTED ===");
                for (i, threads) in deadlocks.iter().enumerate() {
                    eprintln!("\nDeadlock #{}", i + 1);
                    for t in threads {
                        eprintln!("Thread ID: {:?}", t.thread_id());
                        eprintln!("Backtrace:\n{:#?}", t.backtrace());
                    }
                }
                panic!("Deadlock detected! See output above for details.");
            }
        }
    });

    running
}

/// Stops the deadlock detector.
fn stop_deadlock_detector(running: Arc<AtomicBool>) {
    running.store(false, Ordering::SeqCst);
    thread::sleep(Duration::from_millis(150)); // Let detector thread exit
}

// === Tests ===

/// Many bookings race for the same seat; exactly one wins.
#[test]
fn no_deadlock_single_seat_race() {
    let detector = start_deadlock_detector();
    const NUM_THREADS: u32 = 50;

    let engine = setup(1, 10, NUM_THREADS);
    let bookings: Vec<_> = (0..NUM_THREADS)
        .map(|i| book(&engine, CustomerId(i), FlightId(0)))
        .collect();

    let mut handles = Vec::with_capacity(NUM_THREADS as usize);
    for (i, booking) in bookings.into_iter().enumerate() {
        let engine = engine.clone();
        handles.push(thread::spawn(move || {
            engine.process(BookingCommand::ReserveSeat {
                customer: CustomerId(i as u32),
                booking,
                seat: SeatId(1),
            })
        }));
    }

    let results: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().expect("Thread panicked"))
        .collect();

    stop_deadlock_detector(detector);

    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| *e == BookingError::SeatUnavailable(SeatId(1)))
    );

    let seat = engine.seats(FlightId(0)).unwrap().seat(SeatId(1)).unwrap();
    let owner = seat.booking.expect("seat should be taken");
    assert_eq!(engine.booking(owner).unwrap().seat_id(), Some(SeatId(1)));
    println!("Single seat race passed: {} threads", NUM_THREADS);
}

/// Each thread keeps moving its own booking between seats shared with others.
#[test]
fn no_deadlock_seat_shuffling() {
    let detector = start_deadlock_detector();
    const NUM_THREADS: u32 = 20;
    const OPS_PER_THREAD: u16 = 200;
    const SEATS: u16 = 8;

    let engine = setup(1, SEATS, NUM_THREADS);
    let bookings: Vec<_> = (0..NUM_THREADS)
        .map(|i| book(&engine, CustomerId(i), FlightId(0)))
        .collect();

    let mut handles = Vec::with_capacity(NUM_THREADS as usize);
    for (i, booking) in bookings.iter().copied().enumerate() {
        let engine = engine.clone();
        handles.push(thread::spawn(move || {
            let customer = CustomerId(i as u32);
            for op in 0..OPS_PER_THREAD {
                let seat = SeatId((op + i as u16) % SEATS + 1);
                let _ = engine.process(BookingCommand::ReserveSeat {
                    customer,
                    booking,
                    seat,
                });
                // Readers interleave with writers.
                let _ = engine.booking(booking);
                let _ = engine.seats(FlightId(0)).map(|seats| seats.open_seats());
            }
        }));
    }

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    stop_deadlock_detector(detector);

    // Seats and bookings agree.
    let seats = engine.seats(FlightId(0)).unwrap();
    for seat in seats.seats() {
        if let Some(owner) = seat.booking {
            assert_eq!(engine.booking(owner).unwrap().seat_id(), Some(seat.id));
        }
    }
    let held = bookings
        .iter()
        .filter(|id| engine.booking(**id).unwrap().seat_id().is_some())
        .count();
    assert_eq!(held, SEATS as usize - seats.open_seats().len());
}

/// Full lifecycle across several flights with concurrent listing.
#[test]
fn no_deadlock_lifecycle_across_flights() {
    let detector = start_deadlock_detector();
    const NUM_FLIGHTS: u16 = 4;
    const NUM_CUSTOMERS: u32 = 40;

    let engine = setup(NUM_FLIGHTS, NUM_CUSTOMERS as u16, NUM_CUSTOMERS);
    let running = Arc::new(AtomicBool::new(true));
    let mut handles = Vec::new();

    for i in 0..NUM_CUSTOMERS {
        let engine = engine.clone();
        handles.push(thread::spawn(move || {
            let customer = CustomerId(i);
            let flight = FlightId(i % NUM_FLIGHTS as u32);
            let booking = book(&engine, customer, flight);
            let seat = SeatId(i as u16 + 1);

            engine
                .process(BookingCommand::ReserveSeat {
                    customer,
                    booking,
                    seat,
                })
                .expect("seat is unique per customer");

            thread::sleep(Duration::from_micros(100));

            let command = if i % 2 == 0 {
                BookingCommand::CheckIn { customer, booking }
            } else {
                BookingCommand::Cancel { customer, booking }
            };
            engine.process(command).expect("lifecycle step");
        }));
    }

    // Readers list bookings while writers mutate them.
    for _ in 0..4 {
        let engine = engine.clone();
        let running = running.clone();
        handles.push(thread::spawn(move || {
            let mut iterations = 0;
            while running.load(Ordering::SeqCst) && iterations < 200 {
                let _ = engine.bookings();
                let _ = engine.flights();
                iterations += 1;
                thread::yield_now();
            }
        }));
    }

    thread::sleep(Duration::from_millis(200));
    running.store(false, Ordering::SeqCst);

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    stop_deadlock_detector(detector);

    for (id, booking) in engine.bookings() {
        let seats = engine.seats(booking.flight_id).unwrap();
        match booking.state() {
            BookingState::CheckedIn => {
                let seat = seats.seat(booking.seat_id().unwrap()).unwrap();
                assert_eq!(seat.status, SeatStatus::CheckedIn);
                assert_eq!(seat.booking, Some(id));
            }
            BookingState::Cancelled => assert_eq!(booking.seat_id(), None),
            BookingState::Booked => panic!("booking {id} left unfinished"),
        }
    }
    assert_eq!(engine.bookings().len(), NUM_CUSTOMERS as usize);

    // Each booking's events appear in commit order.
    let events = engine.drain_events();
    assert_eq!(events.len(), NUM_CUSTOMERS as usize * 3);
    let mut per_booking: HashMap<BookingId, Vec<&BookingEvent>> = HashMap::new();
    for event in &events {
        per_booking.entry(event.booking()).or_default().push(event);
    }
    for (id, events) in per_booking {
        let booking = engine.booking(id).unwrap();
        assert!(matches!(events[0], BookingEvent::Booked { .. }));
        assert!(matches!(events[1], BookingEvent::SeatReserved { released: None, .. }));
        match booking.state() {
            BookingState::CheckedIn => {
                assert!(matches!(events[2], BookingEvent::CheckedIn { .. }))
            }
            _ => assert!(matches!(events[2], BookingEvent::Cancelled { .. })),
        }
    }
}

/// Threads fight over one booking's seat; the outbox replays the exact
/// seat chain.
#[test]
fn events_follow_commit_order_on_one_booking() {
    let detector = start_deadlock_detector();
    const NUM_THREADS: u16 = 8;
    const OPS_PER_THREAD: u16 = 100;
    const SEATS: u16 = 16;

    let engine = setup(1, SEATS, 1);
    let customer = CustomerId(0);
    let booking = book(&engine, customer, FlightId(0));

    let mut handles = Vec::with_capacity(NUM_THREADS as usize);
    for t in 0..NUM_THREADS {
        let engine = engine.clone();
        handles.push(thread::spawn(move || {
            for op in 0..OPS_PER_THREAD {
                let seat = SeatId((t * 3 + op) % SEATS + 1);
                let _ = engine.process(BookingCommand::ReserveSeat {
                    customer,
                    booking,
                    seat,
                });
            }
            if t == 0 {
                let _ = engine.process(BookingCommand::Cancel { customer, booking });
            }
        }));
    }

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    stop_deadlock_detector(detector);

    let events = engine.drain_events();
    assert!(matches!(events[0], BookingEvent::Booked { .. }));

    // Every reservation releases the seat the previous one took.
    let mut held = None;
    let mut cancelled = false;
    for event in &events[1..] {
        assert!(!cancelled, "event after cancellation: {event:?}");
        match event {
            BookingEvent::SeatReserved { seat, released, .. } => {
                assert_eq!(*released, held);
                held = Some(*seat);
            }
            BookingEvent::Cancelled { released, .. } => {
                assert_eq!(*released, held);
                cancelled = true;
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
    assert!(cancelled);
    assert_eq!(engine.booking(booking).unwrap().state(), BookingState::Cancelled);
}
