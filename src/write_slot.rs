//! Single-slot handoff buffer between the radio's write callback and the
//! main dispatch loop.
//!
//! The write callback runs in interrupt context and must finish fast, so it
//! only copies the payload into the slot. The dispatch loop consumes the
//! slot from task context. The slot holds exactly one pending write; a new
//! write arriving before the previous one is consumed replaces it whole. A
//! consumer therefore always observes a complete payload from a single
//! write, never a splice of two.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use heapless::Vec;

use crate::gatt::VALUE_CAPACITY;

/// One captured characteristic write, truncated to the value capacity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundWrite {
    data: Vec<u8, VALUE_CAPACITY>,
}

impl InboundWrite {
    /// Copies at most [`VALUE_CAPACITY`] bytes of `payload`. Longer writes
    /// lose their tail.
    pub fn truncated_from(payload: &[u8]) -> Self {
        let take = payload.len().min(VALUE_CAPACITY);
        let mut data = Vec::new();
        data.extend_from_slice(&payload[..take]).ok();
        Self { data }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Recorded length: the written length clamped to the capacity.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// The slot itself. Internally a single-value signal guarded by a critical
/// section, so producing from interrupt context and consuming from task
/// context never observe a half-written payload.
pub struct WriteSlot {
    pending: Signal<CriticalSectionRawMutex, InboundWrite>,
}

impl WriteSlot {
    pub const fn new() -> Self {
        Self {
            pending: Signal::new(),
        }
    }

    /// Records a write, replacing any not-yet-consumed one. Safe to call
    /// from interrupt context.
    pub fn record(&self, payload: &[u8]) {
        self.pending.signal(InboundWrite::truncated_from(payload));
    }

    /// Waits for the next pending write and consumes it. Consuming resets
    /// the slot, so a given write is delivered exactly once.
    pub async fn wait(&self) -> InboundWrite {
        self.pending.wait().await
    }

    /// Consumes the pending write without waiting, if there is one.
    pub fn try_take(&self) -> Option<InboundWrite> {
        self.pending.try_take()
    }

    /// Whether a write is waiting to be consumed.
    pub fn is_pending(&self) -> bool {
        self.pending.signaled()
    }
}

impl Default for WriteSlot {
    fn default() -> Self {
        Self::new()
    }
}
