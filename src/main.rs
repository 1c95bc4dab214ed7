use std::sync::Arc;

use anyhow::Result;
use embassy_executor::Executor;
use embassy_time::Timer;
use log::{error, info, warn};
use static_cell::StaticCell;

use ble_receipt::dispatch;
use ble_receipt::gatt::DisconnectReason;
use ble_receipt::heartbeat;
use ble_receipt::lifecycle::{LifecycleController, LinkEvents};
use ble_receipt::settings::Settings;
use ble_receipt::sim::{SimCentral, SimLed, SimTransport};
use ble_receipt::write_slot::WriteSlot;

static EXECUTOR: StaticCell<Executor> = StaticCell::new();

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("Starting BLE write-receipt peripheral");

    let settings = Settings::default();
    let (transport, central) = SimTransport::new();
    let controller = LifecycleController::new(transport, settings)?;
    let slot = Arc::new(WriteSlot::new());
    let events = Arc::new(LinkEvents::new());

    let executor = EXECUTOR.init(Executor::new());
    executor.run(move |spawner| {
        spawner
            .spawn(peripheral_task(controller, slot, events))
            .unwrap();
        spawner.spawn(central_task(central)).unwrap();
        spawner.spawn(heartbeat_task(SimLed::new())).unwrap();
    })
}

#[embassy_executor::task]
async fn peripheral_task(
    mut controller: LifecycleController<SimTransport>,
    slot: Arc<WriteSlot>,
    events: Arc<LinkEvents>,
) {
    if let Err(e) = controller.initialize(&slot, &events).await {
        // Nothing was registered; the peripheral stays idle for good.
        error!("❌ Peripheral unusable: {}", e);
        return;
    }
    dispatch::run(&mut controller, &slot, &events).await
}

/// Scripted remote device driving the simulated link: connect, write,
/// collect the receipt, drop the link, reconnect.
#[embassy_executor::task]
async fn central_task(central: SimCentral) {
    Timer::after_millis(100).await;
    while !central.connect() {
        Timer::after_millis(100).await;
    }
    info!("central: connected");

    let handle = match central.discover_value_handle() {
        Some(handle) => handle,
        None => {
            warn!("central: no characteristic to write to");
            return;
        }
    };

    central.write_gatt(handle, b"hello");
    Timer::after_millis(100).await;
    for notification in central.take_notifications() {
        info!("central: notified {:?}", String::from_utf8_lossy(&notification));
    }

    // A 30-byte write; the peripheral keeps the first 20 bytes.
    let long = [0x41u8; 30];
    central.write_gatt(handle, &long);
    Timer::after_millis(100).await;
    for notification in central.take_notifications() {
        info!("central: notified {:?}", String::from_utf8_lossy(&notification));
    }

    central.disconnect(DisconnectReason::RemoteUserTerminated);
    info!("central: disconnected");
    Timer::after_millis(500).await;

    // The peripheral re-advertises after the drop; reconnect to show the
    // cycle holds.
    while !central.connect() {
        Timer::after_millis(100).await;
    }
    info!("central: reconnected");
    central.write_gatt(handle, b"hello again");
    Timer::after_millis(100).await;
    for notification in central.take_notifications() {
        info!("central: notified {:?}", String::from_utf8_lossy(&notification));
    }

    info!("central: script complete");
}

#[embassy_executor::task]
async fn heartbeat_task(led: SimLed) {
    heartbeat::run(led).await
}
