//! Task Watchdog Timer (TWDT) driver.
//!
//! Wraps the ESP-IDF TWDT API to reset the device if the control loop
//! stalls for more than [`WATCHDOG_TIMEOUT_MS`].  The loop must call
//! [`Watchdog::feed`] on every iteration.
//!
//! [`restart`] is the deliberate reset path: shortest timeout, no more
//! feeding, spin.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

pub const WATCHDOG_TIMEOUT_MS: u32 = 2_000;

pub struct Watchdog {
    #[cfg(target_os = "espidf")]
    subscribed: bool,
}

impl Default for Watchdog {
    fn default() -> Self {
        Self::new()
    }
}

impl Watchdog {
    /// Initialise and subscribe the current task to the TWDT.
    pub fn new() -> Self {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: TWDT calls from the main task during boot.
            unsafe {
                let cfg = esp_task_wdt_config_t {
                    timeout_ms: WATCHDOG_TIMEOUT_MS,
                    idle_core_mask: 0,
                    trigger_panic: true,
                };
                let ret = esp_task_wdt_reconfigure(&cfg);
                if ret != ESP_OK {
                    log::warn!("TWDT reconfigure returned {} (may already be configured)", ret);
                }

                let ret = esp_task_wdt_add(core::ptr::null_mut());
                let subscribed = ret == ESP_OK;
                if subscribed {
                    info!("Watchdog: subscribed ({}ms timeout, panic on trigger)", WATCHDOG_TIMEOUT_MS);
                } else {
                    log::warn!("Watchdog: failed to subscribe ({})", ret);
                }

                Self { subscribed }
            }
        }

        #[cfg(not(target_os = "espidf"))]
        {
            log::info!("Watchdog(sim): no-op");
            Self {}
        }
    }

    /// Feed the watchdog.
    pub fn feed(&self) {
        #[cfg(target_os = "espidf")]
        {
            if self.subscribed {
                // SAFETY: resets the calling task's TWDT entry; main task only.
                unsafe {
                    esp_task_wdt_reset();
                }
            }
        }
    }
}

/// Reset the controller.  Never returns.
#[cfg(target_os = "espidf")]
pub fn restart() -> ! {
    log::error!("Watchdog: restart requested");
    // SAFETY: reconfigures the TWDT and subscribes this task; after that we
    // only spin, so the panic handler resets the chip within 1 ms.
    unsafe {
        let cfg = esp_task_wdt_config_t {
            timeout_ms: 1,
            idle_core_mask: 0,
            trigger_panic: true,
        };
        esp_task_wdt_reconfigure(&cfg);
        esp_task_wdt_add(core::ptr::null_mut());
    }
    loop {
        core::hint::spin_loop();
    }
}

/// Host builds have no watchdog; the process stands in for the chip.
#[cfg(not(target_os = "espidf"))]
pub fn restart() -> ! {
    log::error!("Watchdog(sim): restart requested, aborting");
    std::process::abort()
}
