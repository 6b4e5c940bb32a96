// Restaurant ordering and table booking

pub mod api;
pub mod availability;
pub mod booking;
pub mod cart;
pub mod config;
pub mod hours;
pub mod models;
pub mod product;
pub mod window;

// Re-export key types for convenience
pub use api::{ApiError, BackendApi, ClientConfig, ClientStats, HttpBackend, RetryConfig};
pub use availability::{AvailabilityIndex, RecurringEvent, Reservation};
pub use booking::{
    BookingError, BookingListener, BookingView, TableSelection, TableState, ValidationError,
};
pub use cart::{Cart, CartError, CartLine, CartTotals, LineItem};
pub use config::{AmountLimits, BookingConfig, CartConfig, ConfigError, Settings};
pub use hours::{HourError, HourSlot};
pub use models::{BookingRecord, EventRecord, Recurrence, TableId};
pub use product::{load_catalog, ProductError, ProductForm};
pub use window::DateWindow;
