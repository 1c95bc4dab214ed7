//! Heartbeat blinker, the liveness indicator next to the radio.

use embassy_time::{Duration, Timer};
use log::info;

/// Half-period of the heartbeat blink.
pub const HEARTBEAT_PERIOD: Duration = Duration::from_secs(1);

/// Whatever the board uses as its status LED.
pub trait StatusLed {
    fn set(&mut self, on: bool);
}

/// Toggles the LED once per [`HEARTBEAT_PERIOD`], forever. Runs as its own
/// task and never touches the radio.
pub async fn run(mut led: impl StatusLed) -> ! {
    info!("Heartbeat task started");
    let mut on = false;
    loop {
        on = !on;
        led.set(on);
        Timer::after(HEARTBEAT_PERIOD).await;
    }
}
