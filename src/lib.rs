//! GasBoiler firmware library.
//!
//! Exposes the pure-logic modules for integration testing and host
//! simulation. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod error;
pub mod flags;
pub mod fsm;
pub mod pins;
pub mod safety;
pub mod timer;

// The ESP-IDF-facing modules compile on the host too; the real
// implementations are guarded by cfg attributes inside.
pub mod adapters;
pub mod control;
pub mod drivers;
pub mod sensors;
