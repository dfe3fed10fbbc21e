//! Climate Guardian: two-sensor climate fusion daemon.
//!
//! Reads a locally attached sensor on a timer, accepts pushed readings from a
//! remote device, fuses both into one estimate with propagated uncertainty,
//! and alerts over Telegram when a source goes quiet.
//!
//! See `DESIGN.md` for the architecture notes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod logging;

pub mod fusion;
pub mod gateway;
pub mod monitor;

pub mod runtime;
pub mod sensor;
pub mod weather;

pub mod server;
pub mod telegram;
