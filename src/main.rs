//! GasBoiler Firmware: Main Entry Point
//!
//! Hexagonal architecture driven by a single cooperative loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter              LogEventSink                     │
//! │  (HardwareIo + averaging)     (EventSink)                      │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │            BoilerService (pure logic)                  │    │
//! │  │  Sensors · Interlocks · FSM · Modulator                │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  1 ms esp_timer → timer::tick()        Task watchdog           │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use log::{error, info};

use gasboiler::adapters::hardware::HardwareAdapter;
use gasboiler::adapters::log_sink::LogEventSink;
use gasboiler::app::service::BoilerService;
use gasboiler::config::BoilerConfig;
use gasboiler::drivers::{hw_init, hw_timer, watchdog};
use gasboiler::timer::SysTickClock;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  GasBoiler v{}                        ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Peripherals and the millisecond tick ───────────────
    if let Err(e) = hw_init::init_peripherals() {
        // Outputs may be floating; do not try to run a burner.
        error!("HAL init failed: {}, restarting", e);
        watchdog::restart();
    }
    if !hw_timer::start_tick() {
        error!("No millisecond tick, restarting");
        watchdog::restart();
    }
    let watchdog = watchdog::Watchdog::new();

    // ── 3. Configuration ──────────────────────────────────────
    let config = BoilerConfig::default();
    config.validate()?;

    // ── 4. Adapters and service ───────────────────────────────
    let mut hw = HardwareAdapter::new();
    let mut sink = LogEventSink::new();
    let mut service = BoilerService::new(config, SysTickClock);

    service.start(&mut hw, &mut sink);

    // ── 5. Control loop ───────────────────────────────────────
    loop {
        service.tick(&mut hw, &mut sink);
        watchdog.feed();
        // Yield to the IDLE task so its own watchdog stays fed.
        esp_idf_hal::delay::FreeRtos::delay_ms(1);
    }
}
