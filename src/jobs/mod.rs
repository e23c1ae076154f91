//! Background work that runs beside the HTTP server.

pub mod expiry;

pub use expiry::{spawn as spawn_expiry, sweep, SweepReport};
