//! The peripheral's main loop.
//!
//! One cooperative task multiplexes the two inputs produced from driver
//! context: pending characteristic writes in the [`WriteSlot`] and link
//! events in the [`LinkEvents`] queue. Between inputs the task is suspended
//! by the executor; there is no polling and no busy waiting.

use std::sync::Arc;

use embassy_futures::select::{select, Either};

use crate::lifecycle::{LifecycleController, LinkEvents};
use crate::transport::BleTransport;
use crate::write_slot::WriteSlot;

/// Runs the dispatch loop forever. Call after a successful
/// [`LifecycleController::initialize`].
pub async fn run<T: BleTransport>(
    controller: &mut LifecycleController<T>,
    slot: &Arc<WriteSlot>,
    events: &Arc<LinkEvents>,
) -> ! {
    loop {
        dispatch_next(controller, slot, events).await;
    }
}

/// Waits for the next input and dispatches it.
///
/// A pending write takes priority over a queued link event, so a write
/// followed immediately by a disconnection is acknowledged before the
/// disconnect is handled. Consuming the write resets the slot; each write is
/// dispatched at most once.
pub async fn dispatch_next<T: BleTransport>(
    controller: &mut LifecycleController<T>,
    slot: &Arc<WriteSlot>,
    events: &Arc<LinkEvents>,
) {
    match select(slot.wait(), events.receive()).await {
        Either::First(write) => controller.handle_write(&write),
        Either::Second(event) => controller.handle_link_event(event),
    }
}
