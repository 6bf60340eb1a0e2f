//! Hardware adapter: bridges the board's GPIO and ADC1 to the port traits.
//!
//! Implements [`HardwareIo`] over the raw `hw_init` accessors and
//! [`SensorAveraging`] with a moving-average window per analog input.
//! This is the only module in the system that touches actual pins.  On
//! non-espidf targets the accessors are inert stubs.

use crate::app::ports::{HardwareIo, SensorAveraging};
use crate::drivers::hw_init::{adc1_read, gpio_read, gpio_write};
use crate::flags::{InputFlag, OutputFlag};
use crate::pins;
use crate::sensors::analog::{AnalogInput, Averager};

/// ADC1 converts at 12 bits; the controller works on a 10-bit scale.
const ADC_SHIFT: u32 = 2;

/// Concrete adapter for the boiler control board.
pub struct HardwareAdapter {
    averager: Averager,
}

impl HardwareAdapter {
    /// Call after `hw_init::init_peripherals()`.
    pub fn new() -> Self {
        Self {
            averager: Averager::new(),
        }
    }
}

impl Default for HardwareAdapter {
    fn default() -> Self {
        Self::new()
    }
}

// ── HardwareIo implementation ─────────────────────────────────

impl HardwareIo for HardwareAdapter {
    fn read_digital(&mut self, input: InputFlag) -> bool {
        gpio_read(pins::input_gpio(input))
    }

    fn write_digital(&mut self, output: OutputFlag, on: bool) {
        gpio_write(pins::output_gpio(output), on);
    }

    fn read_adc(&mut self, input: AnalogInput) -> u16 {
        adc1_read(pins::adc_channel(input)) >> ADC_SHIFT
    }
}

// ── SensorAveraging implementation ────────────────────────────

impl SensorAveraging for HardwareAdapter {
    fn filtered(&mut self, input: AnalogInput) -> u16 {
        let raw = self.read_adc(input);
        self.averager.push(input, raw);
        self.averager.average(input)
    }
}
