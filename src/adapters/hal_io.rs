//! `embedded-hal` adapter.
//!
//! [`HalIo`] implements the hardware ports over any
//! `embedded_hal::digital` pin bank, so the controller can run on a board
//! support crate other than ESP-IDF.  Pins are indexed by flag bit
//! position, see [`crate::flags`].

use embedded_hal::digital::{InputPin, OutputPin, PinState};
use log::warn;

use crate::app::ports::{HardwareIo, SensorAveraging};
use crate::flags::{InputFlag, OutputFlag};
use crate::sensors::analog::{AnalogInput, Averager};

/// Source of raw 10-bit conversions.
pub trait AdcReader {
    fn read(&mut self, input: AnalogInput) -> u16;
}

pub struct HalIo<I, O, A> {
    inputs: [I; 5],
    outputs: [O; 8],
    adc: A,
    averager: Averager,
}

impl<I, O, A> HalIo<I, O, A>
where
    I: InputPin,
    O: OutputPin,
    A: AdcReader,
{
    pub fn new(inputs: [I; 5], outputs: [O; 8], adc: A) -> Self {
        Self {
            inputs,
            outputs,
            adc,
            averager: Averager::new(),
        }
    }

    /// Give the pins back.
    pub fn release(self) -> ([I; 5], [O; 8], A) {
        (self.inputs, self.outputs, self.adc)
    }
}

impl<I, O, A> HardwareIo for HalIo<I, O, A>
where
    I: InputPin,
    O: OutputPin,
    A: AdcReader,
{
    /// A failed read returns HIGH: contacts read as released, flame and
    /// overheat read as present.
    fn read_digital(&mut self, input: InputFlag) -> bool {
        self.inputs[input as usize].is_high().unwrap_or_else(|_| {
            warn!("hal_io: read of {:?} failed", input);
            true
        })
    }

    fn write_digital(&mut self, output: OutputFlag, on: bool) {
        if self.outputs[output as usize]
            .set_state(PinState::from(on))
            .is_err()
        {
            warn!("hal_io: write of {:?} failed", output);
        }
    }

    fn read_adc(&mut self, input: AnalogInput) -> u16 {
        self.adc.read(input)
    }
}

impl<I, O, A> SensorAveraging for HalIo<I, O, A>
where
    I: InputPin,
    O: OutputPin,
    A: AdcReader,
{
    fn filtered(&mut self, input: AnalogInput) -> u16 {
        let raw = self.adc.read(input);
        self.averager.push(input, raw);
        self.averager.average(input)
    }
}
