//! Advertising payload assembly.
//!
//! Builds the raw AD structure sequence carried in a legacy advertising PDU:
//! flags, complete local name and the complete list of 16-bit service UUIDs.
//! The encoded frame is built once at startup and goes back on the air
//! verbatim every time advertising restarts.

use std::fmt;

use heapless::Vec;

use crate::gatt::Uuid16;

/// Legacy advertising data payload limit, in bytes.
pub const ADV_DATA_MAX: usize = 31;

/// Most services a single payload will carry in its UUID list.
pub const MAX_ADV_SERVICES: usize = 4;

/// Flags octet: LE General Discoverable Mode.
pub const FLAG_LE_GENERAL_DISCOVERABLE: u8 = 0x02;
/// Flags octet: BR/EDR Not Supported.
pub const FLAG_BR_EDR_NOT_SUPPORTED: u8 = 0x04;

const AD_TYPE_FLAGS: u8 = 0x01;
const AD_TYPE_COMPLETE_UUID16_LIST: u8 = 0x03;
const AD_TYPE_COMPLETE_LOCAL_NAME: u8 = 0x09;

/// An encoded advertising frame, at most [`ADV_DATA_MAX`] bytes.
pub type AdvFrame = Vec<u8, ADV_DATA_MAX>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadError {
    /// The AD structures do not fit in a 31-byte advertising frame.
    Overflow,
}

impl fmt::Display for PayloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadError::Overflow => {
                write!(f, "advertising data exceeds {} bytes", ADV_DATA_MAX)
            }
        }
    }
}

impl std::error::Error for PayloadError {}

/// Advertising PDU kind. Only connectable undirected advertising is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvKind {
    ConnectableUndirected,
}

/// Parameters applied when advertising is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvParams {
    pub kind: AdvKind,
    pub interval: embassy_time::Duration,
}

/// The logical content of the advertising payload, before encoding.
#[derive(Debug, Clone)]
pub struct AdvertisingPayload<'a> {
    pub flags: u8,
    pub local_name: &'a str,
    pub services: Vec<Uuid16, MAX_ADV_SERVICES>,
}

impl AdvertisingPayload<'_> {
    /// Encodes the payload into the on-air AD structure sequence.
    ///
    /// Structure order is fixed: flags, complete local name, complete list
    /// of 16-bit service UUIDs. Encoding the same payload twice yields
    /// identical bytes.
    pub fn encode(&self) -> Result<AdvFrame, PayloadError> {
        let mut frame = AdvFrame::new();

        push_structure(&mut frame, AD_TYPE_FLAGS, &[self.flags])?;
        push_structure(
            &mut frame,
            AD_TYPE_COMPLETE_LOCAL_NAME,
            self.local_name.as_bytes(),
        )?;

        let mut uuid_list: Vec<u8, { 2 * MAX_ADV_SERVICES }> = Vec::new();
        for uuid in &self.services {
            uuid_list
                .extend_from_slice(&uuid.to_le_bytes())
                .map_err(|_| PayloadError::Overflow)?;
        }
        push_structure(&mut frame, AD_TYPE_COMPLETE_UUID16_LIST, &uuid_list)?;

        Ok(frame)
    }
}

/// Appends one AD structure: length octet (type + data), type octet, data.
fn push_structure(frame: &mut AdvFrame, ad_type: u8, data: &[u8]) -> Result<(), PayloadError> {
    let len = data.len() + 1;
    if len > u8::MAX as usize || frame.len() + 1 + len > ADV_DATA_MAX {
        return Err(PayloadError::Overflow);
    }
    frame.push(len as u8).map_err(|_| PayloadError::Overflow)?;
    frame.push(ad_type).map_err(|_| PayloadError::Overflow)?;
    frame
        .extend_from_slice(data)
        .map_err(|_| PayloadError::Overflow)?;
    Ok(())
}
