//! Millisecond tick source using ESP-IDF's esp_timer API.
//!
//! A 1 kHz periodic timer calls [`timer::tick`](crate::timer::tick), the
//! only code that advances the shared millisecond counter.  The callback
//! runs in the esp_timer task; `tick()` takes a critical section, so the
//! main loop's reads never see a torn value.
//!
//! On simulation targets there is no tick source; host code drives time
//! through [`ManualClock`](crate::timer::ManualClock) instead.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

/// Tick period in microseconds.
pub const TICK_PERIOD_US: u64 = 1_000;

#[cfg(target_os = "espidf")]
static mut TICK_TIMER: esp_timer_handle_t = core::ptr::null_mut();

/// SAFETY: TICK_TIMER is written once in `start_tick()` before the
/// callback fires.  Only called from the single main task.
#[cfg(target_os = "espidf")]
unsafe fn tick_timer() -> esp_timer_handle_t {
    unsafe { TICK_TIMER }
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn tick_cb(_arg: *mut core::ffi::c_void) {
    crate::timer::tick();
}

/// Start the 1 ms tick.  Returns `false` if the timer could not be
/// created; the caller must not run the controller without it.
#[cfg(target_os = "espidf")]
pub fn start_tick() -> bool {
    // SAFETY: TICK_TIMER is written here once at boot from the single
    // main-task context before the callback can fire.
    unsafe {
        let args = esp_timer_create_args_t {
            callback: Some(tick_cb),
            arg: core::ptr::null_mut(),
            dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
            name: c"ms_tick".as_ptr(),
            skip_unhandled_events: false,
        };
        let ret = esp_timer_create(&args, &raw mut TICK_TIMER);
        if ret != ESP_OK {
            log::error!("hw_timer: tick timer create failed (rc={})", ret);
            return false;
        }
        let ret = esp_timer_start_periodic(tick_timer(), TICK_PERIOD_US);
        if ret != ESP_OK {
            log::error!("hw_timer: tick timer start failed (rc={})", ret);
            return false;
        }
    }
    info!("hw_timer: 1ms tick started");
    true
}

#[cfg(not(target_os = "espidf"))]
pub fn start_tick() -> bool {
    log::info!("hw_timer(sim): no tick source, time is driven by the caller");
    true
}
