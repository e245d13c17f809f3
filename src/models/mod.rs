//! Data models for lockout.
//!
//! This module contains the core data structures shared by the services and
//! storage layers.

mod brand;
mod filter;
mod record;
mod request;
pub mod temporal;

pub use brand::Brand;
pub use filter::{TodayEntry, TodayFilter};
pub use record::{ContactPii, ContactRecord, StoredRecord};
pub use request::{LockRequest, ValidationError};
pub use temporal::{Clock, FixedClock, StoreTimezone, SystemClock};
