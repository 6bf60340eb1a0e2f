//! Analog inputs: thermistors and setpoint knobs.
//!
//! All values are raw 10-bit ADC counts after averaging.  Larger counts
//! mean hotter water / a higher setpoint; the core never converts to
//! degrees.

use heapless::HistoryBuffer;

/// Full-scale reading of the 10-bit converter.
pub const ADC_FULL_SCALE: u16 = 1023;

/// Samples per averaging window.
pub const AVG_WINDOW: usize = 16;

/// Logical analog inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalogInput {
    /// Domestic hot water outlet thermistor.
    DhwTemp,
    /// Central heating flow thermistor.
    ChTemp,
    /// DHW setpoint potentiometer.
    DhwSet,
    /// CH setpoint potentiometer.
    ChSet,
    /// Mode / power knob.
    Mode,
}

impl AnalogInput {
    pub const ALL: [Self; 5] = [
        Self::DhwTemp,
        Self::ChTemp,
        Self::DhwSet,
        Self::ChSet,
        Self::Mode,
    ];

    const fn index(self) -> usize {
        self as usize
    }
}

/// Filtered analog readings captured once per tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalogSnapshot {
    pub dhw_temp: u16,
    pub ch_temp: u16,
    pub dhw_set: u16,
    pub ch_set: u16,
    pub mode: u16,
}

impl AnalogSnapshot {
    /// Build a snapshot from any per-input reader.
    pub fn capture(mut read: impl FnMut(AnalogInput) -> u16) -> Self {
        Self {
            dhw_temp: read(AnalogInput::DhwTemp),
            ch_temp: read(AnalogInput::ChTemp),
            dhw_set: read(AnalogInput::DhwSet),
            ch_set: read(AnalogInput::ChSet),
            mode: read(AnalogInput::Mode),
        }
    }

    pub fn get(&self, input: AnalogInput) -> u16 {
        match input {
            AnalogInput::DhwTemp => self.dhw_temp,
            AnalogInput::ChTemp => self.ch_temp,
            AnalogInput::DhwSet => self.dhw_set,
            AnalogInput::ChSet => self.ch_set,
            AnalogInput::Mode => self.mode,
        }
    }
}

/// Fixed-window moving average, one window per analog input.
pub struct Averager {
    windows: [HistoryBuffer<u16, AVG_WINDOW>; 5],
}

impl Averager {
    pub fn new() -> Self {
        Self {
            windows: [const { HistoryBuffer::new() }; 5],
        }
    }

    /// Add one raw sample.
    pub fn push(&mut self, input: AnalogInput, raw: u16) {
        self.windows[input.index()].write(raw.min(ADC_FULL_SCALE));
    }

    /// Mean of the samples seen so far (up to the window size).  Zero
    /// before the first sample.
    pub fn average(&self, input: AnalogInput) -> u16 {
        let w = &self.windows[input.index()];
        let samples = w.as_slice();
        if samples.is_empty() {
            return 0;
        }
        let sum: u32 = samples.iter().map(|&s| u32::from(s)).sum();
        (sum / samples.len() as u32) as u16
    }
}

impl Default for Averager {
    fn default() -> Self {
        Self::new()
    }
}
