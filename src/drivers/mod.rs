//! Hardware initialisation, the millisecond tick source and the watchdog.

pub mod hw_init;
pub mod hw_timer;
pub mod watchdog;
