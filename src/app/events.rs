//! Outbound application events.
//!
//! The [`BoilerService`](super::service::BoilerService) emits these through
//! the [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log to serial, refresh the display,
//! record them in a test.

use crate::error::ErrorCode;
use crate::fsm::StateId;
use crate::fsm::context::SysInfo;
use crate::sensors::analog::AnalogSnapshot;
use crate::timer::Millis;

/// Structured events emitted by the combustion core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// The service has started (carries the boot state).
    Started(StateId),

    /// The FSM moved between top-level states.
    StateChanged { from: StateId, to: StateId },

    /// A fault closed the gas and sent the FSM to ERROR.
    FaultRaised(ErrorCode),

    /// ERROR finished its display and released the fault.
    FaultCleared,

    /// Unrecoverable fault; the controller stays in ERROR until reset.
    Halted(ErrorCode),

    /// Periodic dashboard snapshot.
    Telemetry(Snapshot),
}

/// Read-only view of [`SysInfo`] for the dashboard, refreshed once per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub state: StateId,
    pub step: &'static str,
    /// Raw input flag byte.
    pub inputs: u8,
    /// Raw output flag byte.
    pub outputs: u8,
    pub analog: AnalogSnapshot,
    /// 0 when healthy.
    pub error_code: u8,
    pub ignition_tries: u8,
    pub heat_level: u8,
    pub uptime_ms: Millis,
}

impl Snapshot {
    pub fn of(info: &SysInfo, uptime_ms: Millis) -> Self {
        Self {
            state: info.state.id(),
            step: info.state.step_name(),
            inputs: info.inputs.bits(),
            outputs: info.outputs.bits(),
            analog: info.analog,
            error_code: info.error_code(),
            ignition_tries: info.ignition_tries,
            heat_level: info.heat_level,
            uptime_ms,
        }
    }
}
