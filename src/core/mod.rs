//! Core value types, constants, and codec errors.

pub mod constants;
mod error;
mod types;

pub use error::CodecError;
pub use types::{Availability, Day, HourMinutes, TimeSlot};
