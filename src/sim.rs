//! In-process simulation of the radio link.
//!
//! [`SimTransport`] implements [`BleTransport`] against shared in-memory
//! state and [`SimCentral`] plays the remote end of the link: it connects,
//! writes the characteristic, collects notifications and drops the link.
//! Stack callbacks fire synchronously from the central's calls, standing in
//! for the driver's interrupt context. Subscription bookkeeping is not
//! modeled; a connected central receives every notification.
//!
//! Used by the demo binary and the test suite.

use std::sync::{Arc, Mutex};

use log::debug;

use crate::adv_payload::{AdvParams, ADV_DATA_MAX};
use crate::gatt::{
    props, AttHandle, DisconnectParams, DisconnectReason, GattWriteParams, ServiceDef,
};
use crate::heartbeat::StatusLed;
use crate::transport::{
    BleTransport, DisconnectCallback, InitCallback, InitEvent, TransportError, TransportResult,
    WriteCallback, DEFAULT_INSTANCE,
};

// Attribute layout: service declaration, characteristic declaration,
// characteristic value.
const SERVICE_HANDLE_BASE: u16 = 0x0010;

type SharedWriteCallback = Arc<dyn Fn(GattWriteParams<'_>) + Send + Sync>;
type SharedDisconnectCallback = Arc<dyn Fn(DisconnectParams) + Send + Sync>;

struct RegisteredService {
    def: ServiceDef,
    value_handle: AttHandle,
    value: Vec<u8>,
}

struct SimInner {
    init_script: Vec<InitEvent>,
    init_called: bool,
    initialized: bool,
    service: Option<RegisteredService>,
    write_cb: Option<SharedWriteCallback>,
    disconnect_cb: Option<SharedDisconnectCallback>,
    adv_config: Option<(Vec<u8>, AdvParams)>,
    adv_history: Vec<Vec<u8>>,
    advertising: bool,
    connected: bool,
    notifications: Vec<Vec<u8>>,
}

impl SimInner {
    fn new(init_script: Vec<InitEvent>) -> Self {
        Self {
            init_script,
            init_called: false,
            initialized: false,
            service: None,
            write_cb: None,
            disconnect_cb: None,
            adv_config: None,
            adv_history: Vec::new(),
            advertising: false,
            connected: false,
            notifications: Vec::new(),
        }
    }
}

/// The peripheral-facing side of the simulated link.
pub struct SimTransport {
    inner: Arc<Mutex<SimInner>>,
}

impl SimTransport {
    /// A transport whose stack initializes successfully on the default
    /// radio instance, paired with its central.
    pub fn new() -> (Self, SimCentral) {
        Self::with_init_events(vec![InitEvent {
            status: Ok(()),
            instance: DEFAULT_INSTANCE,
        }])
    }

    /// A transport that reports the given initialization completions, in
    /// order, when [`BleTransport::init`] is called.
    pub fn with_init_events(init_script: Vec<InitEvent>) -> (Self, SimCentral) {
        let inner = Arc::new(Mutex::new(SimInner::new(init_script)));
        (
            Self {
                inner: inner.clone(),
            },
            SimCentral { inner },
        )
    }
}

impl BleTransport for SimTransport {
    fn init(&mut self, on_complete: InitCallback) -> TransportResult<()> {
        let script = {
            let mut inner = self.inner.lock().unwrap();
            if inner.init_called {
                return Err(TransportError::AlreadyInitialized);
            }
            inner.init_called = true;
            inner.initialized = inner.init_script.iter().any(|e| e.status.is_ok());
            std::mem::take(&mut inner.init_script)
        };
        // Completions fire outside the lock, like a driver posting events
        // after the API call returns.
        for event in script {
            on_complete(event);
        }
        Ok(())
    }

    fn register_service(&mut self, service: &ServiceDef) -> TransportResult<AttHandle> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.initialized {
            return Err(TransportError::NotInitialized);
        }
        if inner.service.is_some() {
            return Err(TransportError::ServiceRegistrationFailed);
        }
        let value_handle = AttHandle(SERVICE_HANDLE_BASE + 2);
        inner.service = Some(RegisteredService {
            def: *service,
            value_handle,
            value: Vec::new(),
        });
        debug!("sim: service {} registered, value handle {}", service.uuid, value_handle);
        Ok(value_handle)
    }

    fn on_data_written(&mut self, callback: WriteCallback) {
        self.inner.lock().unwrap().write_cb = Some(Arc::from(callback));
    }

    fn on_disconnect(&mut self, callback: DisconnectCallback) {
        self.inner.lock().unwrap().disconnect_cb = Some(Arc::from(callback));
    }

    fn configure_advertising(&mut self, frame: &[u8], params: &AdvParams) -> TransportResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.initialized {
            return Err(TransportError::NotInitialized);
        }
        if frame.is_empty() || frame.len() > ADV_DATA_MAX {
            return Err(TransportError::AdvertisingConfigFailed);
        }
        inner.adv_config = Some((frame.to_vec(), *params));
        Ok(())
    }

    fn start_advertising(&mut self) -> TransportResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.initialized {
            return Err(TransportError::NotInitialized);
        }
        let frame = match &inner.adv_config {
            Some((frame, _)) => frame.clone(),
            None => return Err(TransportError::AdvertisingNotConfigured),
        };
        if inner.advertising {
            return Ok(());
        }
        inner.advertising = true;
        inner.adv_history.push(frame);
        Ok(())
    }

    fn write_value(&mut self, handle: AttHandle, value: &[u8]) -> TransportResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.initialized {
            return Err(TransportError::NotInitialized);
        }
        let connected = inner.connected;
        let notification = {
            let service = inner.service.as_mut().ok_or(TransportError::InvalidHandle)?;
            if service.value_handle != handle {
                return Err(TransportError::InvalidHandle);
            }
            let take = value.len().min(service.def.characteristic.max_len);
            service.value = value[..take].to_vec();
            let notifies = service.def.characteristic.props & props::NOTIFY != 0;
            if connected && notifies {
                Some(service.value.clone())
            } else {
                None
            }
        };
        if let Some(payload) = notification {
            inner.notifications.push(payload);
        }
        Ok(())
    }
}

/// The remote central on the simulated link.
#[derive(Clone)]
pub struct SimCentral {
    inner: Arc<Mutex<SimInner>>,
}

impl SimCentral {
    /// True while the peripheral is advertising.
    pub fn is_advertising(&self) -> bool {
        self.inner.lock().unwrap().advertising
    }

    /// Every advertising frame submitted so far, in submission order.
    pub fn advertising_frames(&self) -> Vec<Vec<u8>> {
        self.inner.lock().unwrap().adv_history.clone()
    }

    /// Parameters currently configured for advertising.
    pub fn advertising_params(&self) -> Option<AdvParams> {
        self.inner.lock().unwrap().adv_config.as_ref().map(|(_, p)| *p)
    }

    /// Connects to the peripheral. Fails while it is not advertising;
    /// after a disconnection the peripheral must restart advertising before
    /// it can be found again.
    pub fn connect(&self) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if !inner.advertising || inner.connected {
            return false;
        }
        inner.connected = true;
        // Connectable undirected advertising stops on connection.
        inner.advertising = false;
        true
    }

    /// The value handle of the registered characteristic, as service
    /// discovery would find it. `None` when no service was registered.
    pub fn discover_value_handle(&self) -> Option<AttHandle> {
        self.inner.lock().unwrap().service.as_ref().map(|s| s.value_handle)
    }

    /// Performs a GATT write against an attribute handle. The registered
    /// write callback sees the full payload; the attribute store keeps at
    /// most the characteristic's capacity. Returns false when no
    /// connection is up.
    pub fn write_gatt(&self, handle: AttHandle, data: &[u8]) -> bool {
        let callback = {
            let mut inner = self.inner.lock().unwrap();
            if !inner.connected {
                return false;
            }
            if let Some(service) = inner.service.as_mut() {
                if service.value_handle == handle {
                    let take = data.len().min(service.def.characteristic.max_len);
                    service.value = data[..take].to_vec();
                }
            }
            inner.write_cb.clone()
        };
        // The callback runs outside the lock, mirroring a driver invoking
        // the handler from its own context.
        if let Some(callback) = callback {
            (*callback)(GattWriteParams { handle, data });
        }
        true
    }

    /// Drops the link. Returns false when no connection is up.
    pub fn disconnect(&self, reason: DisconnectReason) -> bool {
        let callback = {
            let mut inner = self.inner.lock().unwrap();
            if !inner.connected {
                return false;
            }
            inner.connected = false;
            inner.disconnect_cb.clone()
        };
        if let Some(callback) = callback {
            (*callback)(DisconnectParams { reason });
        }
        true
    }

    /// Reads the characteristic value server-side.
    pub fn read_value(&self) -> Option<Vec<u8>> {
        self.inner.lock().unwrap().service.as_ref().map(|s| s.value.clone())
    }

    /// Takes every notification delivered since the last call.
    pub fn take_notifications(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.inner.lock().unwrap().notifications)
    }
}

/// Status LED for host runs; state lands in the debug log.
#[derive(Debug, Default)]
pub struct SimLed {
    on: bool,
}

impl SimLed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_on(&self) -> bool {
        self.on
    }
}

impl StatusLed for SimLed {
    fn set(&mut self, on: bool) {
        self.on = on;
        debug!("heartbeat led {}", if on { "on" } else { "off" });
    }
}
