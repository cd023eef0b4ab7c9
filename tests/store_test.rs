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

//! Entity store, registry and seat inventory integration tests.

use booking_demo_rs::{
    Booking, BookingError, BookingId, Customer, CustomerId, Entity, EntityStore, Flight, FlightId,
    Registry, SeatId, SeatInventory, SeatStatus,
};
use chrono::NaiveDate;
use rust_decimal_macros::dec;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

// === Helper Functions ===

fn make_flight(origin: &str, destination: &str) -> Flight {
    let day = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
    Flight::new(
        origin,
        destination,
        day.and_hms_opt(8, 0, 0).unwrap(),
        day.and_hms_opt(18, 0, 0).unwrap(),
        dec!(500.00),
        30,
    )
}

// === Entity Store ===

#[test]
fn save_assigns_increasing_ids() {
    let store = EntityStore::<Customer>::new();
    let ids: Vec<_> = ["ana", "bia", "caio"]
        .into_iter()
        .map(|name| store.save(Customer::new(name, 0)))
        .collect();

    assert_eq!(ids, vec![CustomerId(0), CustomerId(1), CustomerId(2)]);
    assert_eq!(store.len(), 3);
}

#[test]
fn ids_are_not_reused_after_remove() {
    let store = EntityStore::<Customer>::new();
    let first = store.save(Customer::new("ana", 0));
    assert!(store.remove(first).is_some());
    assert!(store.remove(first).is_none());

    let second = store.save(Customer::new("bia", 0));
    assert_ne!(first, second);
    assert!(store.get(first).is_none());
    assert!(!store.is_empty());
}

#[test]
fn list_is_in_creation_order() {
    let store = EntityStore::<Flight>::new();
    store.save(make_flight("GRU", "JFK"));
    store.save(make_flight("GRU", "LIS"));
    store.save(make_flight("GIG", "MIA"));

    let destinations: Vec<_> = store
        .list()
        .into_iter()
        .map(|(_, flight)| flight.destination)
        .collect();
    assert_eq!(destinations, vec!["JFK", "LIS", "MIA"]);
}

#[test]
fn get_returns_a_copy() {
    let store = EntityStore::<Customer>::new();
    let id = store.save(Customer::new("ana", 10));

    let mut copy = store.get(id).unwrap();
    copy.loyalty_points = 999;
    assert_eq!(store.get(id).unwrap().loyalty_points, 10);
}

#[test]
fn update_merges_patch() {
    let store = EntityStore::<Customer>::new();
    let id = store.save(Customer::new("ana", 10));

    let updated = store
        .update(id, json!({ "loyalty_points": 40 }))
        .unwrap()
        .unwrap();
    assert_eq!(updated.username, "ana");
    assert_eq!(updated.loyalty_points, 40);
    assert_eq!(store.get(id).unwrap(), updated);
}

#[test]
fn update_rejects_bad_patches() {
    let store = EntityStore::<Customer>::new();
    let id = store.save(Customer::new("ana", 10));

    let err = store.update(id, json!("ana")).unwrap_err();
    assert_eq!(err.field, "patch");

    let err = store.update(id, json!({ "email": "a@b.c" })).unwrap_err();
    assert_eq!(err.field, "email");

    let err = store.update(id, json!({ "loyalty_points": "lots" })).unwrap_err();
    assert_eq!(err.field, "record");

    let err = store.update(id, json!({ "username": "ana lima" })).unwrap_err();
    assert_eq!(err.field, "username");

    // Nothing was committed.
    assert_eq!(store.get(id).unwrap(), Customer::new("ana", 10));
}

#[test]
fn update_unknown_id_is_none() {
    let store = EntityStore::<Customer>::new();
    assert_eq!(
        store.update(CustomerId(3), json!({ "loyalty_points": 1 })),
        Ok(None)
    );
}

#[test]
fn flight_seat_count_is_immutable() {
    let store = EntityStore::<Flight>::new();
    let id = store.save(make_flight("GRU", "JFK"));

    let err = store.update(id, json!({ "seat_count": 40 })).unwrap_err();
    assert_eq!(err.field, "seat_count");

    let updated = store
        .update(id, json!({ "fare": "450.00" }))
        .unwrap()
        .unwrap();
    assert_eq!(updated.fare, dec!(450.00));
}

#[test]
fn concurrent_saves_get_unique_ids() {
    let store = Arc::new(EntityStore::<Customer>::new());
    let mut handles = vec![];

    for t in 0..8 {
        let store = Arc::clone(&store);
        handles.push(thread::spawn(move || {
            (0..100)
                .map(|i| store.save(Customer::new(format!("user{t}_{i}"), 0)))
                .collect::<Vec<_>>()
        }));
    }

    let ids: HashSet<_> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    assert_eq!(ids.len(), 800);
    assert_eq!(store.len(), 800);
}

// === Registry ===

#[test]
fn registry_has_one_store_per_type() {
    let registry = Registry::new();
    registry.store::<Customer>().save(Customer::new("ana", 0));
    registry.store::<Flight>().save(make_flight("GRU", "JFK"));

    assert_eq!(registry.len(), 2);
    assert_eq!(registry.store::<Customer>().len(), 1);
    assert!(Arc::ptr_eq(
        &registry.store::<Customer>(),
        &registry.store::<Customer>()
    ));
}

#[test]
fn identity_sequences_are_independent_per_type() {
    let registry = Registry::new();
    let customer = registry.store::<Customer>().save(Customer::new("ana", 0));
    let flight = registry.store::<Flight>().save(make_flight("GRU", "JFK"));

    assert_eq!(customer, CustomerId(0));
    assert_eq!(flight, FlightId(0));
    assert_eq!(Customer::KIND, "customer");
    assert_eq!(Flight::KIND, "flight");
}

#[test]
fn registries_do_not_share_state() {
    let a = Registry::new();
    let b = Registry::new();
    a.store::<Customer>().save(Customer::new("ana", 0));

    assert!(b.store::<Customer>().is_empty());
    assert!(Registry::default().is_empty());
}

// === Seat Inventory ===

fn make_booking() -> Booking {
    Booking::new(
        FlightId(0),
        CustomerId(0),
        "Ana Lima",
        "123.456.789-09",
        dec!(500.00),
    )
}

#[test]
fn seats_start_open() {
    let seats = SeatInventory::new(4);
    assert_eq!(seats.capacity(), 4);
    assert_eq!(
        seats.open_seats(),
        vec![SeatId(1), SeatId(2), SeatId(3), SeatId(4)]
    );
    assert!(seats.seat(SeatId(0)).is_none());
    assert!(seats.seat(SeatId(5)).is_none());
}

#[test]
fn reserve_and_check_in_through_booking() {
    let seats = SeatInventory::new(4);
    let mut first = make_booking();
    let mut second = make_booking();

    let seat = first.reserve_seat(BookingId(1), SeatId(2), &seats).unwrap();
    assert_eq!(seat.status, SeatStatus::Occupied);
    assert_eq!(seat.booking, Some(BookingId(1)));

    assert_eq!(
        second.reserve_seat(BookingId(2), SeatId(2), &seats),
        Err(BookingError::SeatUnavailable(SeatId(2)))
    );
    assert_eq!(
        second.check_in(BookingId(2), &seats),
        Err(BookingError::NoSeatSelected)
    );

    first.check_in(BookingId(1), &seats).unwrap();
    assert_eq!(seats.seat(SeatId(2)).unwrap().status, SeatStatus::CheckedIn);
    assert_eq!(seats.open_seats().len(), 3);
}

#[test]
fn cancel_frees_seat() {
    let seats = SeatInventory::new(2);
    let mut first = make_booking();
    first.reserve_seat(BookingId(1), SeatId(1), &seats).unwrap();
    assert_eq!(first.cancel(&seats), Ok(Some(SeatId(1))));

    let seat = seats.seat(SeatId(1)).unwrap();
    assert_eq!(seat.status, SeatStatus::Open);
    assert_eq!(seat.booking, None);

    let mut second = make_booking();
    second.reserve_seat(BookingId(2), SeatId(1), &seats).unwrap();
}

#[test]
fn concurrent_reservations_single_winner() {
    let seats = Arc::new(SeatInventory::new(1));
    let mut handles = vec![];

    for id in 0..16 {
        let seats = Arc::clone(&seats);
        handles.push(thread::spawn(move || {
            make_booking()
                .reserve_seat(BookingId(id), SeatId(1), &seats)
                .is_ok()
        }));
    }

    let winners = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|won| *won)
        .count();
    assert_eq!(winners, 1);
    assert_eq!(seats.seat(SeatId(1)).unwrap().status, SeatStatus::Occupied);
}
