//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that drives the whole controller
//! against the mock boiler in `mock_hw`.  All tests run on the host
//! (x86_64) with simulated time and no real hardware required.

mod boiler_scenarios;
mod mock_hw;
