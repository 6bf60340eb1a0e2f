//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements                   | Connects to              |
//! |------------|------------------------------|--------------------------|
//! | `hardware` | HardwareIo, SensorAveraging  | ESP32 GPIO, ADC1         |
//! | `hal_io`   | HardwareIo, SensorAveraging  | any embedded-hal pins    |
//! | `log_sink` | EventSink                    | Serial log output        |

pub mod hal_io;
pub mod hardware;
pub mod log_sink;
