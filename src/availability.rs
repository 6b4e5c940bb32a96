// Table availability index
// Answers "is table T free at (date, hour)?" for one window of bookings and events.
// Built fresh on every refresh, never persisted.

use crate::hours::{slots_in_duration, HourSlot};
use crate::models::{BookingRecord, EventRecord, Recurrence, TableId};
use crate::window::DateWindow;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::{debug, warn};

// A contiguous run of half-hour slots on one date, held by one table
#[derive(Debug, Clone, PartialEq)]
pub struct Reservation {
    pub date: NaiveDate,
    pub start: HourSlot,
    pub duration: f64,
    pub table: TableId,
}

// Reservation rule replicated across the days of a window
#[derive(Debug, Clone, PartialEq)]
pub struct RecurringEvent {
    pub start: HourSlot,
    pub duration: f64,
    pub table: TableId,
    pub recurrence: Recurrence,
}

// Mapping date → half-hour slot → tables occupied in that slot.
// A table may be listed more than once for the same slot; only membership
// matters to readers.
#[derive(Debug, Clone, Default)]
pub struct AvailabilityIndex {
    booked: BTreeMap<NaiveDate, BTreeMap<HourSlot, Vec<TableId>>>,
}

impl AvailabilityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    // Build the index for `window` from the three backend collections.
    // Bookings and one-off events are inserted as they are, repeating events
    // are expanded over every day of the window.
    pub fn build(
        window: &DateWindow,
        bookings: &[BookingRecord],
        events_current: &[EventRecord],
        events_repeat: &[EventRecord],
    ) -> Self {
        let mut index = Self::new();

        for booking in bookings {
            index.insert_reservation(&booking.reservation());
        }

        for event in events_current {
            match event.reservation() {
                Some(reservation) => index.insert_reservation(&reservation),
                None => warn!(
                    "Skipping one-off event without a date (table {}, {})",
                    event.table, event.hour
                ),
            }
        }

        for event in events_repeat {
            index.expand_recurring(&event.recurring(), window);
        }

        debug!(
            "Built availability index for {}..{}: {} dates, {} slots",
            window.start,
            window.end,
            index.booked.len(),
            index.slot_count()
        );

        index
    }

    // Mark `table` as occupied for every half-hour from `start` while below start + duration
    pub fn insert(&mut self, date: NaiveDate, start: HourSlot, duration: f64, table: TableId) {
        let slots = slots_in_duration(duration);
        if slots == 0 {
            return;
        }

        let day = self.booked.entry(date).or_default();
        for step in 0..slots {
            day.entry(start.offset(step))
                .or_default()
                .push(table.clone());
        }
    }

    pub fn insert_reservation(&mut self, reservation: &Reservation) {
        self.insert(
            reservation.date,
            reservation.start,
            reservation.duration,
            reservation.table.clone(),
        );
    }

    // Add a booking confirmed by the backend without rebuilding
    pub fn record(&mut self, booking: &BookingRecord) {
        self.insert_reservation(&booking.reservation());
    }

    // Expand a repeating event over `window`, returns the number of days inserted.
    // Only daily events expand. Other kinds are dropped: the backend defines
    // no semantics for them.
    pub fn expand_recurring(&mut self, event: &RecurringEvent, window: &DateWindow) -> usize {
        match &event.recurrence {
            Recurrence::Daily => {
                let mut days = 0;
                for day in window.days() {
                    self.insert(day, event.start, event.duration, event.table.clone());
                    days += 1;
                }
                days
            }
            Recurrence::Other(kind) => {
                debug!(
                    "Ignoring event with unsupported recurrence '{}' (table {})",
                    kind, event.table
                );
                0
            }
            Recurrence::None => 0,
        }
    }

    pub fn is_occupied(&self, date: NaiveDate, hour: HourSlot, table: &TableId) -> bool {
        self.occupied_tables(date, hour).contains(table)
    }

    pub fn occupied_tables(&self, date: NaiveDate, hour: HourSlot) -> &[TableId] {
        self.booked
            .get(&date)
            .and_then(|day| day.get(&hour))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    // True when nothing at all is booked in the slot
    pub fn is_slot_free(&self, date: NaiveDate, hour: HourSlot) -> bool {
        self.occupied_tables(date, hour).is_empty()
    }

    pub fn slots(&self) -> impl Iterator<Item = (NaiveDate, HourSlot, &[TableId])> {
        self.booked.iter().flat_map(|(date, day)| {
            day.iter()
                .map(move |(hour, tables)| (*date, *hour, tables.as_slice()))
        })
    }

    pub fn slot_count(&self) -> usize {
        self.booked.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.booked.is_empty()
    }
}
