//! Burner output control: the heat table and the valve modulator.

pub mod heat_table;
pub mod modulator;

pub use heat_table::{HEAT_LEVELS, HeatLevel};
pub use modulator::Modulator;
