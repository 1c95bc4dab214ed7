//! Radio transport seam.
//!
//! [`BleTransport`] is the narrow interface the peripheral core drives: bring
//! the stack up, register the service, hook the stack's callbacks, advertise
//! and push value updates. Radio backends implement it; the simulated
//! backend in [`crate::sim`] implements it for host runs and tests.

use std::fmt;

use crate::adv_payload::AdvParams;
use crate::gatt::{AttHandle, DisconnectParams, GattWriteParams, ServiceDef};

/// Identifies which radio instance a stack event belongs to. Single-radio
/// targets only ever report [`DEFAULT_INSTANCE`].
pub type InstanceId = u8;

/// The instance this peripheral drives.
pub const DEFAULT_INSTANCE: InstanceId = 0;

/// Errors surfaced by a radio transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// An operation was attempted before the stack finished initializing.
    NotInitialized,
    /// The stack was asked to initialize twice.
    AlreadyInitialized,
    /// The stack reported an error code while bringing the radio up.
    InitFailed(u32),
    /// The attribute table rejected the service definition.
    ServiceRegistrationFailed,
    /// Advertising was started before a payload was configured.
    AdvertisingNotConfigured,
    /// The stack rejected the advertising payload or parameters.
    AdvertisingConfigFailed,
    /// The stack refused to enter advertising mode.
    AdvertisingStartFailed,
    /// No attribute exists at the requested handle.
    InvalidHandle,
    /// The operation requires a connected central.
    NotConnected,
    /// The attribute write could not be applied.
    WriteFailed,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::NotInitialized => write!(f, "BLE stack not initialized"),
            TransportError::AlreadyInitialized => write!(f, "BLE stack already initialized"),
            TransportError::InitFailed(code) => {
                write!(f, "BLE stack initialization failed (code {})", code)
            }
            TransportError::ServiceRegistrationFailed => {
                write!(f, "GATT service registration failed")
            }
            TransportError::AdvertisingNotConfigured => {
                write!(f, "advertising has not been configured")
            }
            TransportError::AdvertisingConfigFailed => {
                write!(f, "advertising configuration rejected")
            }
            TransportError::AdvertisingStartFailed => write!(f, "failed to start advertising"),
            TransportError::InvalidHandle => write!(f, "no attribute at the requested handle"),
            TransportError::NotConnected => write!(f, "no central is connected"),
            TransportError::WriteFailed => write!(f, "attribute write failed"),
        }
    }
}

impl std::error::Error for TransportError {}

pub type TransportResult<T> = Result<T, TransportError>;

/// Outcome of asynchronous stack initialization, delivered through the
/// callback passed to [`BleTransport::init`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitEvent {
    /// `Ok` when the radio came up, `Err` with the stack's code otherwise.
    pub status: Result<(), TransportError>,
    /// Which radio instance completed. Events for other instances must be
    /// ignored by the consumer.
    pub instance: InstanceId,
}

/// Called by the stack once initialization completes. May be invoked from
/// driver context; implementations must not block.
pub type InitCallback = Box<dyn Fn(InitEvent) + Send>;

/// Called by the stack whenever a central writes any attribute. Runs in
/// interrupt context on real radios: no allocation, no logging, no waiting.
pub type WriteCallback = Box<dyn Fn(GattWriteParams<'_>) + Send + Sync>;

/// Called by the stack when the link to the central drops. Same execution
/// context constraints as [`WriteCallback`].
pub type DisconnectCallback = Box<dyn Fn(DisconnectParams) + Send + Sync>;

/// Operations the peripheral core needs from a BLE radio stack.
///
/// Contract:
/// - `init` is asynchronous: completion is reported through the callback,
///   possibly before `init` itself returns.
/// - `configure_advertising` records payload and parameters; they persist
///   across connections so `start_advertising` can re-arm the same frame
///   after a disconnection.
/// - `write_value` updates the attribute locally and, when a central is
///   connected and the characteristic supports it, sends a notification.
pub trait BleTransport {
    /// Starts stack initialization. The callback fires once per radio
    /// instance that completes.
    fn init(&mut self, on_complete: InitCallback) -> TransportResult<()>;

    /// Adds the service to the attribute table and returns the value handle
    /// of its characteristic.
    fn register_service(&mut self, service: &ServiceDef) -> TransportResult<AttHandle>;

    /// Registers the callback invoked on every completed GATT write.
    fn on_data_written(&mut self, callback: WriteCallback);

    /// Registers the callback invoked when the central disconnects.
    fn on_disconnect(&mut self, callback: DisconnectCallback);

    /// Sets the advertising payload and parameters.
    fn configure_advertising(&mut self, frame: &[u8], params: &AdvParams) -> TransportResult<()>;

    /// Enters advertising mode with the configured payload.
    fn start_advertising(&mut self) -> TransportResult<()>;

    /// Writes an attribute value server-side, notifying a subscribed central
    /// if one is connected.
    fn write_value(&mut self, handle: AttHandle, value: &[u8]) -> TransportResult<()>;
}
