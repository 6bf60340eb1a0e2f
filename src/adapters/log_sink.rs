//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).
//! A display or dashboard adapter would implement the same trait.

use log::{error, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Telemetry(t) => {
                info!(
                    "TELEM | {}/{} | in=0b{:05b} out=0b{:08b} | dhw={} ch={} set={}/{} mode={} | \
                     err={} tries={} level={} | up={}ms",
                    t.state.name(),
                    t.step,
                    t.inputs,
                    t.outputs,
                    t.analog.dhw_temp,
                    t.analog.ch_temp,
                    t.analog.dhw_set,
                    t.analog.ch_set,
                    t.analog.mode,
                    t.error_code,
                    t.ignition_tries,
                    t.heat_level,
                    t.uptime_ms,
                );
            }
            AppEvent::StateChanged { from, to } => {
                info!("STATE | {} -> {}", from.name(), to.name());
            }
            AppEvent::FaultRaised(code) => {
                warn!("FAULT | raised {}", code);
            }
            AppEvent::FaultCleared => {
                info!("FAULT | cleared, retrying");
            }
            AppEvent::Halted(code) => {
                error!("HALT | {} (reset required)", code);
            }
            AppEvent::Started(state) => {
                info!("START | initial_state={}", state.name());
            }
        }
    }
}
