//! Handler for the radio stack's data-written callback.

use std::sync::Arc;

use crate::gatt::{AttHandle, GattWriteParams};
use crate::write_slot::WriteSlot;

/// Routes completed GATT writes into the handoff slot.
///
/// The stack delivers every attribute write through one callback, so the
/// handler first checks the handle and ignores traffic for any attribute
/// other than the watched characteristic value. Runs in interrupt context:
/// it copies bytes into the slot and returns, nothing else.
pub struct WriteEventHandler {
    value_handle: AttHandle,
    slot: Arc<WriteSlot>,
}

impl WriteEventHandler {
    pub fn new(value_handle: AttHandle, slot: Arc<WriteSlot>) -> Self {
        Self { value_handle, slot }
    }

    /// The stack-facing entry point.
    pub fn on_write(&self, params: GattWriteParams<'_>) {
        if params.handle != self.value_handle {
            return;
        }
        self.slot.record(params.data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn handler_with_slot(handle: AttHandle) -> (WriteEventHandler, Arc<WriteSlot>) {
        let slot = Arc::new(WriteSlot::new());
        (WriteEventHandler::new(handle, slot.clone()), slot)
    }

    #[test]
    fn matching_handle_is_recorded() {
        let (handler, slot) = handler_with_slot(AttHandle(0x0012));
        handler.on_write(GattWriteParams {
            handle: AttHandle(0x0012),
            data: b"hello",
        });
        assert_eq!(slot.try_take().unwrap().as_bytes(), b"hello");
    }

    #[test]
    fn other_handles_are_ignored() {
        let (handler, slot) = handler_with_slot(AttHandle(0x0012));
        handler.on_write(GattWriteParams {
            handle: AttHandle(0x0030),
            data: b"noise",
        });
        assert!(!slot.is_pending());
    }

    #[test]
    fn oversized_write_is_truncated_on_the_way_in() {
        let (handler, slot) = handler_with_slot(AttHandle(0x0012));
        let long = [0x41u8; 30];
        handler.on_write(GattWriteParams {
            handle: AttHandle(0x0012),
            data: &long,
        });
        let write = slot.try_take().unwrap();
        assert_eq!(write.len(), crate::gatt::VALUE_CAPACITY);
        assert_eq!(write.as_bytes(), &long[..crate::gatt::VALUE_CAPACITY]);
    }
}
