//! Peripheral identity and advertising configuration.

use anyhow::{anyhow, Result};
use embassy_time::Duration;

use crate::adv_payload::{
    AdvertisingPayload, FLAG_BR_EDR_NOT_SUPPORTED, FLAG_LE_GENERAL_DISCOVERABLE, MAX_ADV_SERVICES,
};
use crate::gatt::Uuid16;

// Advertising interval limits for legacy advertising (20ms to 10.24s).
const ADV_INTERVAL_MIN_MS: u64 = 20;
const ADV_INTERVAL_MAX_MS: u64 = 10_240;

/// Static configuration of the peripheral: what it calls itself, which
/// service and characteristic it exposes and how often it advertises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    /// Name broadcast in the advertising payload.
    pub broadcast_name: &'static str,
    /// 16-bit UUID of the exposed service.
    pub service_uuid: Uuid16,
    /// 16-bit UUID of the writable characteristic.
    pub characteristic_uuid: Uuid16,
    /// Advertising interval in milliseconds.
    pub advertising_interval_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            broadcast_name: "MyDevice",
            service_uuid: Uuid16(0x180C),
            characteristic_uuid: Uuid16(0x2A56),
            advertising_interval_ms: 1000,
        }
    }
}

impl Settings {
    /// Validate settings values are within acceptable ranges.
    pub fn validate(&self) -> Result<()> {
        if self.broadcast_name.is_empty() {
            return Err(anyhow!("Broadcast name must not be empty"));
        }

        if !self.broadcast_name.is_ascii() {
            return Err(anyhow!("Broadcast name must be ASCII"));
        }

        if self.advertising_interval_ms < ADV_INTERVAL_MIN_MS
            || self.advertising_interval_ms > ADV_INTERVAL_MAX_MS
        {
            return Err(anyhow!(
                "Advertising interval must be between {}ms and {}ms",
                ADV_INTERVAL_MIN_MS,
                ADV_INTERVAL_MAX_MS
            ));
        }

        self.advertising_payload()
            .encode()
            .map_err(|e| anyhow!("Broadcast name does not fit in one advertising frame: {}", e))?;

        Ok(())
    }

    /// Advertising interval as a duration.
    pub fn advertising_interval(&self) -> Duration {
        Duration::from_millis(self.advertising_interval_ms)
    }

    /// The advertising payload announced for this configuration.
    pub fn advertising_payload(&self) -> AdvertisingPayload<'_> {
        let mut services = heapless::Vec::<Uuid16, MAX_ADV_SERVICES>::new();
        services.push(self.service_uuid).ok();
        AdvertisingPayload {
            flags: FLAG_LE_GENERAL_DISCOVERABLE | FLAG_BR_EDR_NOT_SUPPORTED,
            local_name: self.broadcast_name,
            services,
        }
    }
}
