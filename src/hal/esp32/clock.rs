//! ESP32 clock implementation using the ESP-IDF high-resolution timer.

use crate::traits::Clock;

/// Milliseconds since the node started.
///
/// Backed by `esp_timer_get_time()`, which counts microseconds since boot
/// and never goes backwards.
///
/// # Example
///
/// ```ignore
/// use rs_loconode::hal::esp32::Esp32Clock;
/// use rs_loconode::traits::Clock;
///
/// let clock = Esp32Clock::new();
/// node.tick(clock.now_ms())?;
/// ```
pub struct Esp32Clock {
    origin_us: i64,
}

impl Esp32Clock {
    /// Starts counting from now.
    pub fn new() -> Self {
        Self {
            origin_us: boot_micros(),
        }
    }
}

impl Default for Esp32Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for Esp32Clock {
    #[inline]
    fn now_ms(&self) -> u64 {
        (boot_micros().saturating_sub(self.origin_us) / 1000) as u64
    }
}

#[inline]
fn boot_micros() -> i64 {
    // Safe: plain read of the hardware timer
    unsafe { esp_idf_hal::sys::esp_timer_get_time() }
}
