//! End-to-end flows over the simulated link: bring-up, write and receipt,
//! truncation, failed bring-up and the disconnect/re-advertise cycle.

use std::sync::Arc;
use std::task::Poll;

use embassy_futures::{block_on, poll_once};
use pretty_assertions::assert_eq;

use ble_receipt::dispatch::dispatch_next;
use ble_receipt::gatt::{AttHandle, DisconnectReason, VALUE_CAPACITY};
use ble_receipt::lifecycle::{ConnectionState, LifecycleController, LinkEvents, READ_RECEIPT};
use ble_receipt::settings::Settings;
use ble_receipt::sim::{SimCentral, SimTransport};
use ble_receipt::transport::{InitEvent, TransportError, DEFAULT_INSTANCE};
use ble_receipt::write_slot::WriteSlot;

struct Rig {
    controller: LifecycleController<SimTransport>,
    central: SimCentral,
    slot: Arc<WriteSlot>,
    events: Arc<LinkEvents>,
}

impl Rig {
    fn with(transport: SimTransport, central: SimCentral) -> Self {
        Self {
            controller: LifecycleController::new(transport, Settings::default()).unwrap(),
            central,
            slot: Arc::new(WriteSlot::new()),
            events: Arc::new(LinkEvents::new()),
        }
    }

    /// A rig whose peripheral finished bring-up and is advertising.
    fn running() -> Self {
        let (transport, central) = SimTransport::new();
        let mut rig = Self::with(transport, central);
        block_on(rig.controller.initialize(&rig.slot, &rig.events)).unwrap();
        rig
    }

    fn dispatch(&mut self) {
        block_on(dispatch_next(
            &mut self.controller,
            &self.slot,
            &self.events,
        ));
    }

    /// Polls the loop once; `Poll::Pending` means nothing was dispatched.
    fn dispatch_is_idle(&mut self) -> bool {
        matches!(
            poll_once(dispatch_next(
                &mut self.controller,
                &self.slot,
                &self.events,
            )),
            Poll::Pending
        )
    }

    fn connect_and_discover(&self) -> AttHandle {
        assert!(self.central.connect());
        self.central.discover_value_handle().unwrap()
    }
}

#[test]
fn first_contact_write_gets_ready_receipt() {
    let mut rig = Rig::running();

    let frames = rig.central.advertising_frames();
    assert_eq!(frames.len(), 1);
    let expected: &[u8] = &[
        0x02, 0x01, 0x06, // flags: LE general discoverable, no BR/EDR
        0x09, 0x09, b'M', b'y', b'D', b'e', b'v', b'i', b'c', b'e',
        0x03, 0x03, 0x0C, 0x18, // complete 16-bit UUID list
    ];
    assert_eq!(frames[0], expected);
    let params = rig.central.advertising_params().unwrap();
    assert_eq!(params.interval, embassy_time::Duration::from_millis(1000));

    let handle = rig.connect_and_discover();
    assert!(rig.central.write_gatt(handle, b"hello"));
    rig.dispatch();

    assert_eq!(rig.controller.state(), ConnectionState::Connected);
    assert_eq!(rig.central.take_notifications(), vec![READ_RECEIPT.to_vec()]);
    assert_eq!(rig.central.read_value().unwrap(), READ_RECEIPT);
}

#[test]
fn oversized_write_is_truncated_to_capacity() {
    let mut rig = Rig::running();
    let handle = rig.connect_and_discover();

    let long: Vec<u8> = (0u8..30).collect();
    assert!(rig.central.write_gatt(handle, &long));
    assert_eq!(rig.central.read_value().unwrap(), &long[..VALUE_CAPACITY]);

    rig.dispatch();
    assert_eq!(rig.central.take_notifications(), vec![READ_RECEIPT.to_vec()]);
}

#[test]
fn failed_bring_up_leaves_the_peripheral_idle() {
    let (transport, central) = SimTransport::with_init_events(vec![InitEvent {
        status: Err(TransportError::InitFailed(133)),
        instance: DEFAULT_INSTANCE,
    }]);
    let mut rig = Rig::with(transport, central);

    let err = block_on(rig.controller.initialize(&rig.slot, &rig.events)).unwrap_err();
    assert_eq!(err, TransportError::InitFailed(133));

    assert_eq!(rig.controller.state(), ConnectionState::Uninitialized);
    assert!(rig.controller.value_handle().is_none());
    assert!(rig.central.discover_value_handle().is_none());
    assert!(!rig.central.is_advertising());
    assert!(rig.central.advertising_frames().is_empty());
    assert!(!rig.central.connect());
}

#[test]
fn completion_for_another_instance_does_not_finish_bring_up() {
    let (transport, central) = SimTransport::with_init_events(vec![
        InitEvent {
            status: Err(TransportError::InitFailed(7)),
            instance: 1,
        },
        InitEvent {
            status: Ok(()),
            instance: DEFAULT_INSTANCE,
        },
    ]);
    let mut rig = Rig::with(transport, central);

    block_on(rig.controller.initialize(&rig.slot, &rig.events)).unwrap();
    assert!(rig.central.is_advertising());
}

#[test]
fn reconnection_cycle_reuses_the_identical_frame() {
    let mut rig = Rig::running();

    for round in 0..2 {
        let handle = rig.connect_and_discover();
        assert!(rig.central.write_gatt(handle, b"ping"));
        rig.dispatch();
        assert_eq!(rig.central.take_notifications(), vec![READ_RECEIPT.to_vec()]);

        assert!(rig
            .central
            .disconnect(DisconnectReason::RemoteUserTerminated));
        rig.dispatch();
        assert_eq!(
            rig.controller.state(),
            ConnectionState::Advertising,
            "round {}",
            round
        );
    }

    let frames = rig.central.advertising_frames();
    assert_eq!(frames.len(), 3);
    assert!(frames.windows(2).all(|pair| pair[0] == pair[1]));
}

#[test]
fn consumed_write_is_acknowledged_once() {
    let mut rig = Rig::running();
    let handle = rig.connect_and_discover();

    assert!(rig.central.write_gatt(handle, b"once"));
    rig.dispatch();
    assert_eq!(rig.central.take_notifications().len(), 1);

    assert!(rig.dispatch_is_idle());
    assert!(rig.central.take_notifications().is_empty());
}

#[test]
fn newer_write_replaces_an_unconsumed_one() {
    let mut rig = Rig::running();
    let handle = rig.connect_and_discover();

    assert!(rig.central.write_gatt(handle, b"first"));
    assert!(rig.central.write_gatt(handle, b"second"));
    rig.dispatch();

    // One receipt, for the surviving write.
    assert_eq!(rig.central.take_notifications(), vec![READ_RECEIPT.to_vec()]);
    assert!(rig.dispatch_is_idle());
}

#[test]
fn writes_to_other_attributes_are_ignored() {
    let mut rig = Rig::running();
    let handle = rig.connect_and_discover();

    assert!(rig.central.write_gatt(AttHandle(handle.0 + 4), b"noise"));
    assert!(rig.dispatch_is_idle());
    assert!(rig.central.take_notifications().is_empty());
    // The peripheral only learns of the connection from the first write to
    // its own characteristic.
    assert_eq!(rig.controller.state(), ConnectionState::Advertising);
}

#[test]
fn write_followed_by_disconnect_is_still_consumed() {
    // The write outranks the queued disconnect. Its receipt lands after the
    // central is gone, so it is stored server-side without a notification,
    // and the loop keeps going.
    let mut rig = Rig::running();
    let handle = rig.connect_and_discover();

    assert!(rig.central.write_gatt(handle, b"parting"));
    assert!(rig
        .central
        .disconnect(DisconnectReason::ConnectionTimeout));

    rig.dispatch(); // consumes the write first
    assert_eq!(rig.controller.state(), ConnectionState::Connected);
    assert!(rig.central.take_notifications().is_empty());

    rig.dispatch(); // then the disconnect
    assert_eq!(rig.controller.state(), ConnectionState::Advertising);
    assert!(rig.central.is_advertising());
}
