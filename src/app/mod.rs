//! Application core: pure combustion logic, zero I/O.
//!
//! This module wires the sensor layer, the interlocks and the FSM into one
//! control loop.  All interaction with hardware happens through **port
//! traits** defined in [`ports`], keeping this layer fully testable without
//! real peripherals.

pub mod events;
pub mod ports;
pub mod service;
