//! Port traits: the hexagonal boundary between the combustion core and
//! the board.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ BoilerService (domain)
//! ```
//!
//! Driven adapters (GPIO/ADC, averaging, event sinks) implement these
//! traits.  [`BoilerService`](super::service::BoilerService) consumes them
//! via generics, so the core never touches a register directly.

use crate::flags::{InputFlag, OutputFlag};
use crate::sensors::analog::AnalogInput;

// ───────────────────────────────────────────────────────────────
// Hardware I/O (driven adapter: domain ↔ pins)
// ───────────────────────────────────────────────────────────────

/// Raw pin access.  Logical ids are mapped to physical pins by the adapter
/// (see [`crate::pins`]).
pub trait HardwareIo {
    /// Electrical level of an input pin, before polarity correction.
    fn read_digital(&mut self, input: InputFlag) -> bool;

    /// Drive an output.  `true` = energised.
    fn write_digital(&mut self, output: OutputFlag, on: bool);

    /// Raw ADC sample of an analog input.
    fn read_adc(&mut self, input: AnalogInput) -> u16;
}

// ───────────────────────────────────────────────────────────────
// Sensor averaging (driven adapter: raw ADC → filtered value)
// ───────────────────────────────────────────────────────────────

/// Hands back an already-filtered reading per analog input.  The core only
/// relies on the value being monotonic with the physical quantity.
pub trait SensorAveraging {
    fn filtered(&mut self, input: AnalogInput) -> u16;
}

// ───────────────────────────────────────────────────────────────
// Event sink (driven adapter: domain → logging / dashboard)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go (serial log,
/// dashboard, test recorder).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}
