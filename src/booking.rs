// Table booking flow
// Loads availability for the date window, tracks the selected date/hour/table,
// validates the booking form and submits it to the backend.

use crate::api::{ApiError, BackendApi};
use crate::availability::AvailabilityIndex;
use crate::config::BookingConfig;
use crate::hours::{slots_in_duration, HourSlot};
use crate::models::{BookingPayload, BookingRecord, TableId};
use crate::window::DateWindow;
use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

// Form problems, worded for the customer
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Please, choose a table.")]
    TableNotSelected,

    #[error("Please, enter a valid phone number (Use {digits} digits).")]
    InvalidPhone { digits: usize },

    #[error("Please, enter a valid address (Use more than {min_length} letters and numbers).")]
    InvalidAddress { min_length: usize },
}

#[derive(Error, Debug)]
pub enum BookingError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("This table is already booked")]
    TableAlreadyBooked(TableId),

    #[error("Unknown table: {0}")]
    UnknownTable(TableId),

    #[error("Booking window of {0} days does not fit the calendar")]
    WindowOutOfRange(u32),

    #[error("Date {0} is outside the booking window")]
    DateOutOfWindow(NaiveDate),

    #[error("Hour {0} is outside opening hours")]
    HourOutOfRange(HourSlot),

    #[error("Invalid {field}: {value}")]
    InvalidAmount { field: &'static str, value: u32 },

    #[error("Unknown starter: {0}")]
    UnknownStarter(String),

    #[error(transparent)]
    Api(#[from] ApiError),
}

pub fn validate_phone(phone: &str, digits: usize) -> Result<(), ValidationError> {
    if phone.len() == digits && phone.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::InvalidPhone { digits })
    }
}

pub fn validate_address(address: &str, min_length: usize) -> Result<(), ValidationError> {
    if address.chars().count() >= min_length {
        Ok(())
    } else {
        Err(ValidationError::InvalidAddress { min_length })
    }
}

// What a renderer needs to draw one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableState {
    pub table: TableId,
    pub booked: bool,
    pub selected: bool,
}

// Callbacks fired by `BookingView`; every method defaults to a no-op.
pub trait BookingListener: Send + Sync {
    // Table states for the current date/hour changed
    fn on_availability(&self, _date: NaiveDate, _hour: HourSlot, _tables: &[TableState]) {}

    fn on_select(&self, _selected: Option<&TableId>) {}

    fn on_submit(&self, _booking: &BookingRecord) {}

    fn on_rejected(&self, _error: &BookingError) {}
}

pub struct NoopListener;

impl BookingListener for NoopListener {}

// At most one pending table.
// select: replaces any previous choice; selecting the chosen table again deselects it.
// clear: on refresh, date/hour change and after a successful submit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableSelection {
    selected: Option<TableId>,
}

impl TableSelection {
    pub fn selected(&self) -> Option<&TableId> {
        self.selected.as_ref()
    }

    pub fn is_selected(&self, table: &TableId) -> bool {
        self.selected.as_ref() == Some(table)
    }

    pub fn toggle(&mut self, table: TableId) -> Option<&TableId> {
        if self.is_selected(&table) {
            self.selected = None;
        } else {
            self.selected = Some(table);
        }
        self.selected.as_ref()
    }

    // Returns true if a table was selected before
    pub fn clear(&mut self) -> bool {
        self.selected.take().is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BookingForm {
    pub people: u32,
    pub hours: u32,
    pub starters: BTreeSet<String>,
    pub phone: String,
    pub address: String,
}

impl BookingForm {
    fn new(config: &BookingConfig) -> Self {
        Self {
            people: config.people.default,
            hours: config.hours.default,
            starters: BTreeSet::new(),
            phone: String::new(),
            address: String::new(),
        }
    }
}

// Result of one availability load, tagged with the refresh that produced it
#[derive(Debug)]
pub struct AvailabilitySnapshot {
    generation: u64,
    window: DateWindow,
    index: AvailabilityIndex,
}

impl AvailabilitySnapshot {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn index(&self) -> &AvailabilityIndex {
        &self.index
    }
}

pub struct BookingView {
    backend: Arc<dyn BackendApi>,
    listener: Arc<dyn BookingListener>,
    config: BookingConfig,
    window: DateWindow,
    date: NaiveDate,
    hour: HourSlot,
    index: AvailabilityIndex,
    selection: TableSelection,
    form: BookingForm,
    next_generation: AtomicU64,
    applied_generation: u64,
}

impl BookingView {
    pub fn new(backend: Arc<dyn BackendApi>, config: BookingConfig) -> Result<Self, BookingError> {
        let window = DateWindow::from_today(config.max_days_in_future)
            .ok_or(BookingError::WindowOutOfRange(config.max_days_in_future))?;
        Ok(Self {
            backend,
            listener: Arc::new(NoopListener),
            window,
            date: window.start,
            hour: config.opening_hour,
            index: AvailabilityIndex::new(),
            selection: TableSelection::default(),
            form: BookingForm::new(&config),
            next_generation: AtomicU64::new(0),
            applied_generation: 0,
            config,
        })
    }

    pub fn with_listener(mut self, listener: Arc<dyn BookingListener>) -> Self {
        self.listener = listener;
        self
    }

    pub fn with_window(mut self, window: DateWindow) -> Self {
        self.set_window(window);
        self
    }

    pub fn config(&self) -> &BookingConfig {
        &self.config
    }

    pub fn window(&self) -> DateWindow {
        self.window
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn hour(&self) -> HourSlot {
        self.hour
    }

    pub fn index(&self) -> &AvailabilityIndex {
        &self.index
    }

    pub fn form(&self) -> &BookingForm {
        &self.form
    }

    pub fn selected_table(&self) -> Option<&TableId> {
        self.selection.selected()
    }

    // Replaces the window; the index is stale until the next refresh
    pub fn set_window(&mut self, window: DateWindow) {
        self.window = window;
        if !window.contains(self.date) {
            self.date = window.start;
        }
        self.reset_selection();
    }

    // Fetch bookings, one-off events and repeating events for the current
    // window and build a fresh index from them.
    // The three requests run concurrently; nothing is applied here, see
    // `BookingView::apply_snapshot`.
    pub async fn load_snapshot(&self) -> Result<AvailabilitySnapshot, ApiError> {
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let window = self.window;
        debug!(
            "Loading availability #{} for {}..{}",
            generation, window.start, window.end
        );

        let (bookings, events_current, events_repeat) = futures::try_join!(
            self.backend.fetch_bookings(&window),
            self.backend.fetch_events_current(&window),
            self.backend.fetch_events_repeat(&window),
        )?;

        let index = AvailabilityIndex::build(&window, &bookings, &events_current, &events_repeat);
        Ok(AvailabilitySnapshot {
            generation,
            window,
            index,
        })
    }

    // Swap in a loaded index. Snapshots older than the last applied one, or
    // built for another window, are dropped.
    pub fn apply_snapshot(&mut self, snapshot: AvailabilitySnapshot) -> bool {
        if snapshot.generation <= self.applied_generation || snapshot.window != self.window {
            debug!(
                "Discarding stale availability #{} (applied #{})",
                snapshot.generation, self.applied_generation
            );
            return false;
        }

        self.index = snapshot.index;
        self.applied_generation = snapshot.generation;
        self.reset_selection();
        self.render();
        true
    }

    pub async fn refresh(&mut self) -> Result<(), BookingError> {
        match self.load_snapshot().await {
            Ok(snapshot) => {
                self.apply_snapshot(snapshot);
                Ok(())
            }
            Err(e) => {
                warn!("Availability refresh failed: {}", e);
                Err(self.reject(e.into()))
            }
        }
    }

    pub fn set_date(&mut self, date: NaiveDate) -> Result<(), BookingError> {
        if !self.window.contains(date) {
            return Err(self.reject(BookingError::DateOutOfWindow(date)));
        }
        self.date = date;
        self.reset_selection();
        self.render();
        Ok(())
    }

    pub fn set_hour(&mut self, hour: HourSlot) -> Result<(), BookingError> {
        if hour < self.config.opening_hour || hour >= self.config.closing_hour {
            return Err(self.reject(BookingError::HourOutOfRange(hour)));
        }
        self.hour = hour;
        self.reset_selection();
        self.render();
        Ok(())
    }

    pub fn table_states(&self) -> Vec<TableState> {
        self.config
            .tables
            .iter()
            .map(|table| TableState {
                table: table.clone(),
                booked: self.index.is_occupied(self.date, self.hour, table),
                selected: self.selection.is_selected(table),
            })
            .collect()
    }

    pub fn select_table(&mut self, table: TableId) -> Result<Option<TableId>, BookingError> {
        if !self.config.tables.contains(&table) {
            return Err(self.reject(BookingError::UnknownTable(table)));
        }
        if self.index.is_occupied(self.date, self.hour, &table) {
            return Err(self.reject(BookingError::TableAlreadyBooked(table)));
        }

        let selected = self.selection.toggle(table).cloned();
        match &selected {
            Some(t) => debug!("Selected table {} at {} {}", t, self.date, self.hour),
            None => debug!("Table selection cleared"),
        }
        self.listener.on_select(selected.as_ref());
        Ok(selected)
    }

    pub fn set_people(&mut self, people: u32) -> Result<(), BookingError> {
        if !self.config.people.contains(people) {
            return Err(self.reject(BookingError::InvalidAmount {
                field: "people",
                value: people,
            }));
        }
        self.form.people = people;
        Ok(())
    }

    pub fn set_hours(&mut self, hours: u32) -> Result<(), BookingError> {
        if !self.config.hours.contains(hours) {
            return Err(self.reject(BookingError::InvalidAmount {
                field: "hours",
                value: hours,
            }));
        }
        self.form.hours = hours;
        Ok(())
    }

    pub fn set_phone(&mut self, phone: impl Into<String>) {
        self.form.phone = phone.into();
    }

    pub fn set_address(&mut self, address: impl Into<String>) {
        self.form.address = address.into();
    }

    // Returns whether the starter is now checked
    pub fn toggle_starter(&mut self, starter: &str) -> Result<bool, BookingError> {
        if !self.config.starters.iter().any(|s| s == starter) {
            return Err(self.reject(BookingError::UnknownStarter(starter.to_string())));
        }
        if self.form.starters.remove(starter) {
            Ok(false)
        } else {
            self.form.starters.insert(starter.to_string());
            Ok(true)
        }
    }

    // Validate the form and build the POST body.
    // Checks run in a fixed order: table, phone, address.
    pub fn payload(&self) -> Result<BookingPayload, ValidationError> {
        let table = self
            .selection
            .selected()
            .cloned()
            .ok_or(ValidationError::TableNotSelected)?;
        validate_phone(&self.form.phone, self.config.phone_digits)?;
        validate_address(&self.form.address, self.config.min_address_length)?;

        let starters = self
            .config
            .starters
            .iter()
            .filter(|s| self.form.starters.contains(*s))
            .cloned()
            .collect();

        Ok(BookingPayload {
            date: self.date,
            hour: self.hour,
            table,
            duration: self.form.hours as f64,
            ppl: self.form.people,
            starters,
            phone: self.form.phone.clone(),
            address: self.form.address.clone(),
        })
    }

    pub async fn submit(&mut self) -> Result<BookingRecord, BookingError> {
        let payload = match self.payload() {
            Ok(payload) => payload,
            Err(e) => return Err(self.reject(e.into())),
        };

        // The whole requested stay has to be free, not just the first slot
        let slots = slots_in_duration(payload.duration);
        let clash = (0..slots).any(|step| {
            self.index.is_occupied(payload.date, payload.hour.offset(step), &payload.table)
        });
        if clash {
            return Err(self.reject(BookingError::TableAlreadyBooked(payload.table)));
        }

        let record = match self.backend.create_booking(&payload).await {
            Ok(record) => record,
            Err(e) => return Err(self.reject(e.into())),
        };

        info!(
            "Table {} booked for {} on {} at {}",
            record.table, payload.ppl, record.date, record.hour
        );
        self.index.record(&record);
        self.reset_selection();
        self.listener.on_submit(&record);
        self.render();
        Ok(record)
    }

    fn reset_selection(&mut self) {
        if self.selection.clear() {
            self.listener.on_select(None);
        }
    }

    fn render(&self) {
        let states = self.table_states();
        self.listener.on_availability(self.date, self.hour, &states);
    }

    fn reject(&self, error: BookingError) -> BookingError {
        debug!("Booking action rejected: {}", error);
        self.listener.on_rejected(&error);
        error
    }
}
