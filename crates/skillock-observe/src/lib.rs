//! Observability setup for skillock.
//!
//! The library crates only emit `tracing` events; installing a subscriber is
//! left to whatever embeds them. Applications call
//! [`tracing_setup::init_tracing`] once at startup and
//! [`tracing_setup::shutdown_tracing`] before exit.
//!
//! - `tracing_setup`: subscriber initialization (env filter, plain or JSON
//!   output, optional OpenTelemetry export)

pub mod tracing_setup;
