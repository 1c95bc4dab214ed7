// GATT vocabulary shared by the transport seam and the peripheral core:
// 16-bit identifiers, attribute handles, characteristic property bits and
// the parameter types the radio stack hands to registered callbacks.

use std::fmt;

/// Fixed capacity of the writable characteristic value, in bytes.
pub const VALUE_CAPACITY: usize = 20;

/// A 16-bit Bluetooth SIG style UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Uuid16(pub u16);

impl Uuid16 {
    /// Little-endian wire representation, as used in advertising data and
    /// attribute tables.
    pub const fn to_le_bytes(self) -> [u8; 2] {
        self.0.to_le_bytes()
    }
}

impl fmt::Display for Uuid16 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

/// An attribute handle assigned by the radio stack at service registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttHandle(pub u16);

impl fmt::Display for AttHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

/// GATT Characteristic Properties bits (Core spec Vol 3, Part G, 3.3.1.1).
pub mod props {
    pub const READ: u8 = 0x02;
    pub const WRITE: u8 = 0x08;
    pub const NOTIFY: u8 = 0x10;
}

/// Describes one characteristic inside a service descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacteristicDef {
    pub uuid: Uuid16,
    /// Bitwise OR of [`props`] constants.
    pub props: u8,
    /// Maximum value length the server stores for this characteristic.
    pub max_len: usize,
}

/// Service descriptor handed to the transport at registration time.
///
/// The topology is a single service with a single characteristic; the
/// transport returns the characteristic's value handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceDef {
    pub uuid: Uuid16,
    pub characteristic: CharacteristicDef,
}

/// Parameters of a completed GATT write, as delivered by the radio stack to
/// the registered write callback. The payload is borrowed from the stack's
/// receive buffer and is only valid for the duration of the callback.
#[derive(Debug, Clone, Copy)]
pub struct GattWriteParams<'a> {
    /// Attribute handle the central wrote to.
    pub handle: AttHandle,
    /// Written payload, as received over the air.
    pub data: &'a [u8],
}

/// HCI-style disconnection reasons surfaced by the radio stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    RemoteUserTerminated,
    ConnectionTimeout,
    LocalHostTerminated,
    Other(u8),
}

impl DisconnectReason {
    /// The raw HCI error code for this reason.
    pub fn code(self) -> u8 {
        match self {
            DisconnectReason::RemoteUserTerminated => 0x13,
            DisconnectReason::ConnectionTimeout => 0x08,
            DisconnectReason::LocalHostTerminated => 0x16,
            DisconnectReason::Other(code) => code,
        }
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisconnectReason::RemoteUserTerminated => write!(f, "remote user terminated"),
            DisconnectReason::ConnectionTimeout => write!(f, "connection timeout"),
            DisconnectReason::LocalHostTerminated => write!(f, "local host terminated"),
            DisconnectReason::Other(code) => write!(f, "reason {:#04x}", code),
        }
    }
}

/// Parameters of a disconnection event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisconnectParams {
    pub reason: DisconnectReason,
}
