//! End-to-end hub sessions over the mock transport.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use lpf2_hub::command;
use lpf2_hub::{
    ConnectionState, DecodeWarning, DeviceType, Hub, HubError, HubEvent, HubOptions,
    HubPropertyUpdate, HubType, Port,
};
use lpf2_transport::{MockConnection, MockConnector, TransportError};
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::time::timeout;

const BOOST_MOVE_HUB: u8 = 64;
const BATTERY_87: [u8; 6] = [0x06, 0x00, 0x01, 0x06, 0x06, 0x57];

async fn connected_hub(manufacturer_id: u8) -> (Hub, Arc<MockConnector>, Arc<MockConnection>) {
    let connector = Arc::new(MockConnector::new(manufacturer_id));
    let hub = Hub::new(connector.clone());
    hub.connect(None).await.expect("mock connect");
    let link = connector.last_connection().expect("connection opened");
    (hub, connector, link)
}

/// Wait for the next event the pump publishes
async fn next_event(events: &mut broadcast::Receiver<HubEvent>) -> HubEvent {
    timeout(Duration::from_secs(2), events.recv())
        .await
        .expect("event within timeout")
        .expect("event channel open")
}

#[tokio::test]
async fn boost_hub_reports_battery() {
    let (hub, _connector, link) = connected_hub(BOOST_MOVE_HUB).await;
    assert!(hub.is_connected());
    assert_eq!(hub.hub_type(), HubType::BoostMoveHub);

    let mut events = hub.subscribe_events();
    link.notify(&BATTERY_87).await.unwrap();
    assert_eq!(
        next_event(&mut events).await,
        HubEvent::Property(HubPropertyUpdate::BatteryLevel(87))
    );
    assert_eq!(hub.battery_level(), Some(87));
}

#[tokio::test]
async fn connect_sends_update_subscription() {
    let (hub, _connector, link) = connected_hub(0x41).await;
    assert_eq!(link.written(), command::hub_update_subscription());
    assert_eq!(hub.state(), ConnectionState::Connected);

    // Internal sensors report without any further activation
    let mut events = hub.subscribe_events();
    link.notify(&[0x06, 0x00, 0x45, 0x3C, 0x35, 0x0F])
        .await
        .unwrap();
    next_event(&mut events).await;
    let volts = hub.hub_voltage().unwrap();
    assert!((volts - 9.6).abs() < 1e-9);
}

#[tokio::test]
async fn commands_while_idle_write_nothing() {
    let connector = Arc::new(MockConnector::new(BOOST_MOVE_HUB));
    let hub = Hub::new(connector.clone());
    assert_eq!(hub.state(), ConnectionState::Idle);

    assert!(matches!(
        hub.set_led_color(lpf2_hub::Color::Red).await,
        Err(HubError::NotConnected)
    ));
    assert!(matches!(hub.shut_down_hub().await, Err(HubError::NotConnected)));
    assert!(matches!(
        hub.set_motor_speed_for_degrees(Port::A, 50, 90).await,
        Err(HubError::NotConnected)
    ));

    // Connect then disconnect: writes are refused again and nothing new goes out
    hub.connect(None).await.unwrap();
    let link = connector.last_connection().unwrap();
    hub.disconnect().await.unwrap();
    let before = link.written();
    assert!(matches!(
        hub.set_motor_speed(Port::A, 30).await,
        Err(HubError::NotConnected)
    ));
    assert_eq!(link.written(), before);
}

#[tokio::test]
async fn failed_connect_then_retry() {
    let connector = Arc::new(MockConnector::new(BOOST_MOVE_HUB));
    let hub = Hub::new(connector.clone());

    connector.set_fail_connect(true);
    let result = hub.connect(None).await;
    assert!(matches!(
        result,
        Err(HubError::Transport(TransportError::Bluetooth(_)))
    ));
    assert_eq!(hub.state(), ConnectionState::Failed);

    connector.set_fail_connect(false);
    hub.connect(None).await.unwrap();
    assert_eq!(hub.state(), ConnectionState::Connected);
    assert_eq!(connector.connect_attempts(), 2);
}

#[tokio::test]
async fn second_connect_is_rejected() {
    let (hub, connector, _link) = connected_hub(BOOST_MOVE_HUB).await;
    assert!(matches!(
        hub.connect(None).await,
        Err(HubError::InvalidArgument(_))
    ));
    assert_eq!(connector.connect_attempts(), 1);
    assert!(hub.is_connected());
}

#[tokio::test]
async fn button_callback_fires() {
    let (hub, _connector, link) = connected_hub(BOOST_MOVE_HUB).await;
    let presses = Arc::new(Mutex::new(Vec::new()));
    {
        let presses = Arc::clone(&presses);
        hub.register_button_callback(move |pressed| presses.lock().push(pressed));
    }

    link.clear_written();
    hub.activate_button_reports().await.unwrap();
    assert_eq!(link.written(), vec![vec![0x05, 0x00, 0x01, 0x02, 0x02]]);

    let mut events = hub.subscribe_events();
    link.notify(&[0x06, 0x00, 0x01, 0x02, 0x06, 0x01])
        .await
        .unwrap();
    next_event(&mut events).await;
    assert!(hub.is_button_pressed());

    link.notify(&[0x06, 0x00, 0x01, 0x02, 0x06, 0x00])
        .await
        .unwrap();
    next_event(&mut events).await;
    assert!(!hub.is_button_pressed());
    assert_eq!(*presses.lock(), vec![true, false]);
}

#[tokio::test]
async fn registering_twice_replaces() {
    let (hub, _connector, _link) = connected_hub(BOOST_MOVE_HUB).await;
    hub.register_device(Port::C, DeviceType::BasicMotor).unwrap();
    hub.register_device(Port::C, DeviceType::BoostDistance)
        .unwrap();
    assert_eq!(hub.device_type_at(Port::C), Some(DeviceType::BoostDistance));
    assert_eq!(hub.devices().len(), 1);

    assert_eq!(
        hub.deregister_device(Port::C).unwrap(),
        Some(DeviceType::BoostDistance)
    );
    assert_eq!(hub.device_type_at(Port::C), None);
}

#[tokio::test]
async fn sensor_session() {
    let (hub, _connector, link) = connected_hub(BOOST_MOVE_HUB).await;
    let mut events = hub.subscribe_events();

    // Hub announces its internal tilt sensor and an external distance sensor
    link.notify(&[0x0F, 0x00, 0x04, 0x3A, 0x01, 0x28, 0x00, 0, 0, 0, 0, 0, 0, 0, 0])
        .await
        .unwrap();
    link.notify(&[0x0F, 0x00, 0x04, 0x01, 0x01, 0x25, 0x00, 0, 0, 0, 0, 0, 0, 0, 0])
        .await
        .unwrap();
    next_event(&mut events).await;
    next_event(&mut events).await;

    // Values before activation are dropped
    link.notify(&[0x06, 0x00, 0x45, 0x3A, 0x01, 0x02])
        .await
        .unwrap();
    assert_eq!(
        next_event(&mut events).await,
        HubEvent::DecodeWarning(DecodeWarning::PortNotActive(0x3A))
    );
    assert_eq!(hub.tilt_x(), None);

    hub.activate_port_device(Port::TILT, None).await.unwrap();
    hub.activate_port_device(Port::C, None).await.unwrap();

    link.notify(&[0x06, 0x00, 0x45, 0x3A, 0x01, 0x02])
        .await
        .unwrap();
    link.notify(&[0x08, 0x00, 0x45, 0x01, 0x03, 0x02, 0x00, 0x00])
        .await
        .unwrap();
    next_event(&mut events).await;
    next_event(&mut events).await;

    assert_eq!(hub.tilt_x(), Some(1));
    assert_eq!(hub.tilt_y(), Some(2));
    assert_eq!(hub.color(), Some(lpf2_hub::Color::Blue));
    assert_eq!(hub.distance(), Some(3.0));

    // Short frame: warning, nothing changes
    let before = hub.snapshot();
    link.notify(&[0x05, 0x00, 0x45, 0x01, 0x09]).await.unwrap();
    assert!(matches!(
        next_event(&mut events).await,
        HubEvent::DecodeWarning(DecodeWarning::TooShort { .. })
    ));
    assert_eq!(hub.snapshot(), before);
}

#[tokio::test]
async fn remote_sides_update_independently() {
    let (hub, _connector, link) = connected_hub(0x42).await;
    assert_eq!(hub.hub_type(), HubType::PoweredUpRemote);
    let mut events = hub.subscribe_events();

    for port in [0x00, 0x01] {
        link.notify(&[0x0F, 0x00, 0x04, port, 0x01, 0x37, 0x00, 0, 0, 0, 0, 0, 0, 0, 0])
            .await
            .unwrap();
        next_event(&mut events).await;
    }
    hub.activate_port_device(Port::REMOTE_LEFT, None)
        .await
        .unwrap();
    hub.activate_port_device(Port::REMOTE_RIGHT, None)
        .await
        .unwrap();

    link.notify(&[0x05, 0x00, 0x45, 0x00, 0xFF]).await.unwrap();
    next_event(&mut events).await;
    assert!(hub.is_left_remote_down_button_pressed());
    assert!(!hub.is_right_remote_down_button_pressed());
    assert!(!hub.is_right_remote_button_released());

    link.notify(&[0x05, 0x00, 0x45, 0x01, 0x00]).await.unwrap();
    next_event(&mut events).await;
    assert!(hub.is_right_remote_button_released());
    assert!(hub.is_left_remote_down_button_pressed());
}

#[tokio::test]
async fn disconnect_ignores_late_notifications() {
    let (hub, _connector, link) = connected_hub(BOOST_MOVE_HUB).await;
    let mut events = hub.subscribe_events();
    link.notify(&BATTERY_87).await.unwrap();
    next_event(&mut events).await;

    hub.disconnect().await.unwrap();
    assert_eq!(hub.state(), ConnectionState::Idle);
    assert_eq!(next_event(&mut events).await, HubEvent::Disconnected);

    hub.on_notification(&[0x06, 0x00, 0x01, 0x06, 0x06, 0x10]);
    assert_eq!(hub.battery_level(), Some(87));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn store_is_frozen_once_disconnect_returns() {
    let (hub, _connector, _link) = connected_hub(BOOST_MOVE_HUB).await;
    let stop = Arc::new(AtomicBool::new(false));

    let feeder = {
        let hub = hub.clone();
        let stop = stop.clone();
        std::thread::spawn(move || {
            let mut level = 0u8;
            while !stop.load(Ordering::SeqCst) {
                level = (level + 1) % 100;
                hub.on_notification(&[0x06, 0x00, 0x01, 0x06, 0x06, level]);
            }
        })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    hub.disconnect().await.unwrap();
    let frozen = hub.battery_level();

    tokio::time::sleep(Duration::from_millis(20)).await;
    stop.store(true, Ordering::SeqCst);
    feeder.join().unwrap();
    assert_eq!(hub.battery_level(), frozen);
}

#[tokio::test]
async fn reconnect_starts_from_scratch() {
    let connector = Arc::new(MockConnector::new(BOOST_MOVE_HUB));
    let hub = Hub::with_options(connector.clone(), HubOptions { event_capacity: 8 });
    hub.connect(None).await.unwrap();
    hub.register_device(Port::A, DeviceType::BoostTachoMotor)
        .unwrap();
    hub.on_notification(&BATTERY_87);
    assert_eq!(hub.battery_level(), Some(87));

    hub.disconnect().await.unwrap();
    hub.connect(None).await.unwrap();
    assert_eq!(hub.battery_level(), None);
    assert!(hub.devices().is_empty());
}

#[tokio::test]
async fn lost_link_returns_to_idle() {
    let (hub, _connector, link) = connected_hub(BOOST_MOVE_HUB).await;
    let mut events = hub.subscribe_events();
    link.drop_link();
    assert_eq!(next_event(&mut events).await, HubEvent::Disconnected);
    assert_eq!(hub.state(), ConnectionState::Idle);
}

#[tokio::test]
async fn write_failure_is_reported() {
    let (hub, _connector, link) = connected_hub(BOOST_MOVE_HUB).await;
    link.set_fail_writes(true);
    assert!(matches!(
        hub.set_motor_speed(Port::A, 40).await,
        Err(HubError::Transport(TransportError::WriteFailed(_)))
    ));
    assert!(hub.is_connected());
}

#[tokio::test]
async fn failed_port_writes_keep_reporting_state() {
    let (hub, _connector, link) = connected_hub(BOOST_MOVE_HUB).await;
    let mut events = hub.subscribe_events();
    link.notify(&[0x0F, 0x00, 0x04, 0x3A, 0x01, 0x28, 0x00, 0, 0, 0, 0, 0, 0, 0, 0])
        .await
        .unwrap();
    next_event(&mut events).await;
    hub.activate_port_device(Port::TILT, None).await.unwrap();

    link.set_fail_writes(true);

    // The hub never heard the deactivation, so it keeps reporting
    assert!(hub.deactivate_port_device(Port::TILT, None).await.is_err());
    link.notify(&[0x06, 0x00, 0x45, 0x3A, 0x01, 0x02])
        .await
        .unwrap();
    assert!(matches!(next_event(&mut events).await, HubEvent::SensorValue { .. }));
    assert_eq!(hub.tilt_x(), Some(1));

    // A failed re-activation leaves the earlier one in place
    assert!(hub
        .activate_port_device(Port::TILT, Some(DeviceType::BoostTilt))
        .await
        .is_err());
    link.notify(&[0x06, 0x00, 0x45, 0x3A, 0x03, 0x04])
        .await
        .unwrap();
    assert!(matches!(next_event(&mut events).await, HubEvent::SensorValue { .. }));
    assert_eq!(hub.tilt_x(), Some(3));

    // A failed first activation leaves the port inactive
    hub.register_device(Port::C, DeviceType::BoostDistance)
        .unwrap();
    assert!(hub.activate_port_device(Port::C, None).await.is_err());
    link.notify(&[0x08, 0x00, 0x45, 0x01, 0x03, 0x02, 0x00, 0x00])
        .await
        .unwrap();
    assert_eq!(
        next_event(&mut events).await,
        HubEvent::DecodeWarning(DecodeWarning::PortNotActive(0x01))
    );

    link.set_fail_writes(false);
    hub.deactivate_port_device(Port::TILT, None).await.unwrap();
    link.notify(&[0x06, 0x00, 0x45, 0x3A, 0x05, 0x06])
        .await
        .unwrap();
    assert_eq!(
        next_event(&mut events).await,
        HubEvent::DecodeWarning(DecodeWarning::PortNotActive(0x3A))
    );
    assert_eq!(hub.tilt_x(), Some(3));
}

#[tokio::test]
async fn motor_frames() {
    let (hub, _connector, link) = connected_hub(BOOST_MOVE_HUB).await;
    link.clear_written();

    hub.set_motor_speed(Port::A, 250).await.unwrap();
    hub.stop_motor(Port::A).await.unwrap();
    hub.set_motor_speed_for_time(Port::B, -50, 1000).await.unwrap();
    assert!(matches!(
        hub.set_motor_speed_for_time(Port::B, 50, 0).await,
        Err(HubError::InvalidArgument(_))
    ));

    let written = link.written();
    assert_eq!(written.len(), 3);
    assert_eq!(written[0], vec![0x08, 0x00, 0x81, 0x37, 0x11, 0x51, 0x00, 100]);
    assert_eq!(written[1], vec![0x08, 0x00, 0x81, 0x37, 0x11, 0x51, 0x00, 0x00]);
    assert_eq!(
        written[2],
        vec![0x0C, 0x00, 0x81, 0x38, 0x11, 0x09, 0xE8, 0x03, 0xCE, 100, 127, 0x03]
    );
}
