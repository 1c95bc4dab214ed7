//! Peripheral lifecycle management.
//!
//! [`LifecycleController`] owns the transport and walks it through the whole
//! life of the peripheral: wait for stack initialization, register the
//! service, hook callbacks, advertise, acknowledge writes and re-arm
//! advertising whenever the central drops the link.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::{error, info, warn};

use crate::adv_payload::{AdvFrame, AdvKind, AdvParams};
use crate::gatt::{props, AttHandle, CharacteristicDef, DisconnectReason, ServiceDef, VALUE_CAPACITY};
use crate::settings::Settings;
use crate::transport::{BleTransport, InitEvent, TransportResult, DEFAULT_INSTANCE};
use crate::write_handler::WriteEventHandler;
use crate::write_slot::{InboundWrite, WriteSlot};

/// Fixed acknowledgment written back after every consumed characteristic
/// write. Readable and notified through the same characteristic.
pub const READ_RECEIPT: &[u8] = b"ready";

/// Capacity of the link event queue. Link events are rare (one per
/// disconnection), so a small queue is plenty.
pub const LINK_EVENT_CAPACITY: usize = 4;

const INIT_EVENT_CAPACITY: usize = 4;

/// Link events queued from driver context for the dispatch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    Disconnected { reason: DisconnectReason },
}

/// Queue carrying [`LinkEvent`]s out of driver callbacks.
pub type LinkEvents = Channel<CriticalSectionRawMutex, LinkEvent, LINK_EVENT_CAPACITY>;

/// Connection state as observed by the dispatch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Stack not brought up yet, or bring-up failed.
    Uninitialized,
    /// Advertising and waiting for a central.
    Advertising,
    /// A central is connected. Entered when the first write is consumed;
    /// the stack does not surface a connect event, the first write is the
    /// first sign of life.
    Connected,
    /// The central dropped the link and advertising has not restarted yet.
    Disconnected,
}

/// Owns the transport and the peripheral's identity.
pub struct LifecycleController<T: BleTransport> {
    transport: T,
    settings: Settings,
    state: ConnectionState,
    value_handle: Option<AttHandle>,
    /// Encoded once at construction. Restarts advertise these exact bytes;
    /// the transport keeps the submitted configuration across connections.
    frame: AdvFrame,
    params: AdvParams,
}

impl<T: BleTransport> LifecycleController<T> {
    /// Validates the settings and pre-encodes the advertising frame.
    pub fn new(transport: T, settings: Settings) -> Result<Self> {
        settings.validate()?;
        let frame = settings
            .advertising_payload()
            .encode()
            .map_err(|e| anyhow!("Failed to encode advertising payload: {}", e))?;
        let params = AdvParams {
            kind: AdvKind::ConnectableUndirected,
            interval: settings.advertising_interval(),
        };
        Ok(Self {
            transport,
            settings,
            state: ConnectionState::Uninitialized,
            value_handle: None,
            frame,
            params,
        })
    }

    /// Brings the peripheral up: stack init, service registration, callback
    /// hookup, advertising start.
    ///
    /// Suspends until the stack reports initialization for the default radio
    /// instance; completion events for other instances are ignored. A
    /// reported initialization error is returned to the caller, leaving the
    /// peripheral idle with nothing registered.
    pub async fn initialize(
        &mut self,
        slot: &Arc<WriteSlot>,
        events: &Arc<LinkEvents>,
    ) -> TransportResult<()> {
        info!(
            "🔧 Initializing BLE peripheral \"{}\"",
            self.settings.broadcast_name
        );

        let completions: Arc<Channel<CriticalSectionRawMutex, InitEvent, INIT_EVENT_CAPACITY>> =
            Arc::new(Channel::new());
        let queue = completions.clone();
        self.transport.init(Box::new(move |event| {
            // Driver context: queue it and get out.
            let _ = queue.try_send(event);
        }))?;

        let status = loop {
            let event = completions.receive().await;
            if event.instance != DEFAULT_INSTANCE {
                continue;
            }
            break event.status;
        };
        if let Err(e) = status {
            error!("❌ BLE stack initialization failed: {}", e);
            return Err(e);
        }
        info!("✅ BLE stack initialized");

        let service = ServiceDef {
            uuid: self.settings.service_uuid,
            characteristic: CharacteristicDef {
                uuid: self.settings.characteristic_uuid,
                props: props::READ | props::WRITE | props::NOTIFY,
                max_len: VALUE_CAPACITY,
            },
        };
        let value_handle = self.transport.register_service(&service)?;
        self.value_handle = Some(value_handle);
        info!(
            "✅ Service {} registered, characteristic {} at handle {}",
            service.uuid, service.characteristic.uuid, value_handle
        );

        let handler = WriteEventHandler::new(value_handle, slot.clone());
        self.transport
            .on_data_written(Box::new(move |params| handler.on_write(params)));

        let queue = events.clone();
        self.transport.on_disconnect(Box::new(move |params| {
            // Driver context: the dispatch loop does the logging.
            let _ = queue.try_send(LinkEvent::Disconnected {
                reason: params.reason,
            });
        }));

        self.transport.configure_advertising(&self.frame, &self.params)?;
        self.transport.start_advertising()?;
        self.state = ConnectionState::Advertising;
        info!(
            "📡 Advertising as \"{}\" every {}ms",
            self.settings.broadcast_name, self.settings.advertising_interval_ms
        );

        Ok(())
    }

    /// Reacts to one consumed characteristic write: marks the connection
    /// established and writes the read receipt back.
    ///
    /// The receipt write is fire-and-forget; a failure is logged and the
    /// loop moves on.
    pub fn handle_write(&mut self, write: &InboundWrite) {
        match std::str::from_utf8(write.as_bytes()) {
            Ok(text) if text.chars().all(|c| !c.is_control()) => {
                info!(
                    "📥 Characteristic written: \"{}\" ({} bytes)",
                    text,
                    write.len()
                );
            }
            _ => {
                info!(
                    "📥 Characteristic written: {:02x?} ({} bytes)",
                    write.as_bytes(),
                    write.len()
                );
            }
        }

        if self.state != ConnectionState::Connected {
            info!("🔗 Central connected");
            self.state = ConnectionState::Connected;
        }

        if let Some(handle) = self.value_handle {
            if let Err(e) = self.transport.write_value(handle, READ_RECEIPT) {
                warn!("⚠️ Read receipt write failed: {}", e);
            }
        }
    }

    /// Reacts to one link event from the driver queue.
    pub fn handle_link_event(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::Disconnected { reason } => {
                info!("🔌 Central disconnected: {}", reason);
                self.state = ConnectionState::Disconnected;
                self.restart_advertising();
            }
        }
    }

    /// Re-arms advertising with the frame and parameters configured at
    /// initialization. On failure the peripheral stays disconnected; there
    /// is no retry.
    fn restart_advertising(&mut self) {
        match self.transport.start_advertising() {
            Ok(()) => {
                self.state = ConnectionState::Advertising;
                info!("📡 Advertising restarted");
            }
            Err(e) => error!("❌ Failed to restart advertising: {}", e),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn value_handle(&self) -> Option<AttHandle> {
        self.value_handle
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The encoded advertising frame submitted to the transport.
    pub fn advertising_frame(&self) -> &[u8] {
        &self.frame
    }
}
