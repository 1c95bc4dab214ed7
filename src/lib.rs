//! Write-acknowledgment BLE peripheral.
//!
//! Advertises a single service with one writable characteristic, accepts
//! one central at a time, captures every characteristic write and answers
//! each consumed write with the fixed `b"ready"` receipt. When the central
//! drops the link the peripheral immediately advertises again with the
//! identical frame.
//!
//! The crate is split along the driver boundary: [`transport::BleTransport`]
//! abstracts the radio stack, and everything above it is portable. Host
//! runs and tests drive the core through the simulated link in [`sim`].

pub mod adv_payload;
pub mod dispatch;
pub mod gatt;
pub mod heartbeat;
pub mod lifecycle;
pub mod settings;
pub mod sim;
pub mod transport;
pub mod write_handler;
pub mod write_slot;
