//! The hub client
//!
//! `Hub` ties the connection lifecycle, the decoder and the command encoder
//! together. It is cheap to clone; clones share the same session.

use std::sync::{Arc, Weak};

use lpf2_transport::printer::hex_dump;
use lpf2_transport::protocol::SERVICE_UUID;
use lpf2_transport::{Connection, Connector};
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::color::{Color, Rgb};
use crate::command;
use crate::connection::{ConnectionState, Lifecycle, SessionId};
use crate::decoder::{self, HubPropertyUpdate};
use crate::error::HubError;
use crate::properties::{PropertySnapshot, RemoteButtons, Version};
use crate::protocol::message_type;
use crate::state::{HubEvent, HubState};
use crate::types::{Device, DeviceType, HubType, Port};

/// Default capacity of the event channel
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Hub button callback, called with the new pressed state
pub type ButtonCallback = Arc<dyn Fn(bool) + Send + Sync>;

#[derive(Debug, Clone)]
pub struct HubOptions {
    /// Events buffered per subscriber before the slowest one starts lagging
    pub event_capacity: usize,
}

impl Default for HubOptions {
    fn default() -> Self {
        Self {
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

struct Inner {
    connector: Arc<dyn Connector>,
    lifecycle: Mutex<Lifecycle>,
    state: Mutex<HubState>,
    button_callback: Mutex<Option<ButtonCallback>>,
    events: broadcast::Sender<HubEvent>,
}

/// Client for one LPF2 hub
#[derive(Clone)]
pub struct Hub {
    inner: Arc<Inner>,
}

impl Hub {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self::with_options(connector, HubOptions::default())
    }

    pub fn with_options(connector: Arc<dyn Connector>, options: HubOptions) -> Self {
        let (events, _) = broadcast::channel(options.event_capacity.max(1));
        Self {
            inner: Arc::new(Inner {
                connector,
                lifecycle: Mutex::new(Lifecycle::default()),
                state: Mutex::new(HubState::default()),
                button_callback: Mutex::new(None),
                events,
            }),
        }
    }

    // === Connection ===

    /// Connect to the hub at `address`, or to the first hub found
    ///
    /// Clears all state from a previous connection, then subscribes to hub
    /// property updates and the internal voltage/current sensors.
    pub async fn connect(&self, address: Option<&str>) -> Result<(), HubError> {
        let session = self.inner.lifecycle.lock().begin_connect()?;
        info!(address = address.unwrap_or("any"), "Connecting to hub");

        let connection = match self
            .inner
            .connector
            .scan_and_connect(SERVICE_UUID, address)
            .await
        {
            Ok(connection) => connection,
            Err(e) => {
                warn!("Connect failed: {}", e);
                self.inner.lifecycle.lock().fail(session);
                return Err(e.into());
            }
        };

        let notifications = match connection.subscribe().await {
            Ok(rx) => rx,
            Err(e) => {
                warn!("Subscribing to notifications failed: {}", e);
                self.inner.lifecycle.lock().fail(session);
                close_quietly(connection).await;
                return Err(e.into());
            }
        };

        let hub_type = HubType::from_manufacturer_id(connection.manufacturer_id());
        self.inner.state.lock().reset(hub_type);

        let pump = self.spawn_pump(session, notifications);
        let completed = self
            .inner
            .lifecycle
            .lock()
            .complete(session, Arc::clone(&connection), pump);
        if let Err(connection) = completed {
            debug!("Connect superseded by disconnect");
            close_quietly(connection).await;
            return Err(HubError::NotConnected);
        }

        info!(
            %hub_type,
            address = %connection.device_info().address,
            "Connected"
        );

        if let Err(e) = self.subscribe_hub_updates(connection.as_ref()).await {
            warn!("Hub update subscription failed: {}", e);
            let connection = self.inner.lifecycle.lock().fail(session);
            if let Some(connection) = connection {
                close_quietly(connection).await;
            }
            return Err(e);
        }

        self.publish(HubEvent::Connected { hub_type });
        Ok(())
    }

    async fn subscribe_hub_updates(&self, connection: &dyn Connection) -> Result<(), HubError> {
        {
            let mut state = self.inner.state.lock();
            state
                .registry
                .record_activation(Port::VOLTAGE, DeviceType::Voltage, 0);
            state
                .registry
                .record_activation(Port::CURRENT, DeviceType::Current, 0);
        }
        for frame in command::hub_update_subscription() {
            debug!(frame = %hex_dump(&frame), "Sending");
            connection.write(&frame).await?;
        }
        Ok(())
    }

    /// Close the link and return to `Idle`
    ///
    /// Notifications still in flight for the old session are dropped.
    pub async fn disconnect(&self) -> Result<(), HubError> {
        let connection = self.inner.lifecycle.lock().teardown();
        if let Some(connection) = connection {
            info!("Disconnecting");
            self.publish(HubEvent::Disconnected);
            connection.disconnect().await?;
        }
        Ok(())
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.lifecycle.lock().state()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    pub fn is_connecting(&self) -> bool {
        self.state() == ConnectionState::Connecting
    }

    /// Hub model of the current (or last) connection
    pub fn hub_type(&self) -> HubType {
        self.inner.state.lock().hub_type
    }

    // === Notifications ===

    fn spawn_pump(
        &self,
        session: SessionId,
        mut notifications: mpsc::Receiver<Vec<u8>>,
    ) -> JoinHandle<()> {
        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            while let Some(frame) = notifications.recv().await {
                let Some(inner) = inner.upgrade() else {
                    return;
                };
                Hub { inner }.handle_notification(session, &frame);
            }
            if let Some(inner) = inner.upgrade() {
                let hub = Hub { inner };
                if hub.inner.lifecycle.lock().link_lost(session) {
                    info!("Hub link closed");
                    hub.publish(HubEvent::Disconnected);
                }
            }
        })
    }

    /// Feed one raw notification frame into the decoder
    ///
    /// Frames arriving while not connected are ignored. Malformed or
    /// unexpected frames are logged and published as `DecodeWarning`
    /// events; they never fail the session.
    pub fn on_notification(&self, frame: &[u8]) {
        let session = {
            let lifecycle = self.inner.lifecycle.lock();
            if lifecycle.state() != ConnectionState::Connected {
                debug!("Ignoring notification while {}", lifecycle.state());
                return;
            }
            lifecycle.session()
        };
        self.handle_notification(session, frame);
    }

    fn handle_notification(&self, session: SessionId, frame: &[u8]) {
        let result = {
            // Held through the update; lock order is lifecycle, then state
            let lifecycle = self.inner.lifecycle.lock();
            if lifecycle.session() != session {
                debug!(frame = %hex_dump(frame), "Dropping notification from stale session");
                return;
            }
            debug!(
                frame = %hex_dump(frame),
                kind = frame.get(2).map_or("?", |t| message_type::name(*t)),
                "Received"
            );
            decoder::decode(frame).and_then(|message| self.inner.state.lock().apply(message))
        };

        match result {
            Ok(event) => {
                if let HubEvent::Property(HubPropertyUpdate::Button(pressed)) = event {
                    let callback = self.inner.button_callback.lock().clone();
                    if let Some(callback) = callback {
                        callback(pressed);
                    }
                }
                self.publish(event);
            }
            Err(warning) => {
                warn!(frame = %hex_dump(frame), "Dropping notification: {}", warning);
                self.publish(HubEvent::DecodeWarning(warning));
            }
        }
    }

    /// Receive every event published from now on
    pub fn subscribe_events(&self) -> broadcast::Receiver<HubEvent> {
        self.inner.events.subscribe()
    }

    /// Replace the hub button callback
    pub fn register_button_callback<F>(&self, callback: F)
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        *self.inner.button_callback.lock() = Some(Arc::new(callback));
    }

    fn publish(&self, event: HubEvent) {
        // No subscribers is fine
        let _ = self.inner.events.send(event);
    }

    // === Writes ===

    fn link(&self) -> Result<Arc<dyn Connection>, HubError> {
        self.inner.lifecycle.lock().connected()
    }

    async fn send(&self, connection: &dyn Connection, frame: &[u8]) -> Result<(), HubError> {
        debug!(frame = %hex_dump(frame), "Sending");
        connection.write(frame).await?;
        Ok(())
    }

    async fn send_all(
        &self,
        connection: &dyn Connection,
        frames: Vec<Vec<u8>>,
    ) -> Result<(), HubError> {
        for frame in frames {
            self.send(connection, &frame).await?;
        }
        Ok(())
    }

    // === Hub ===

    /// Change the advertising name (1-14 ASCII characters)
    pub async fn set_hub_name(&self, name: &str) -> Result<(), HubError> {
        let connection = self.link()?;
        let frame = command::set_hub_name(name)?;
        self.send(connection.as_ref(), &frame).await
    }

    /// Switch the hub off
    pub async fn shut_down_hub(&self) -> Result<(), HubError> {
        let connection = self.link()?;
        self.send(connection.as_ref(), &command::shut_down()).await
    }

    /// Ask the hub to report its button
    pub async fn activate_button_reports(&self) -> Result<(), HubError> {
        let connection = self.link()?;
        self.send(connection.as_ref(), &command::activate_button_reports())
            .await
    }

    // === LED ===

    pub async fn set_led_color(&self, color: Color) -> Result<(), HubError> {
        let connection = self.link()?;
        let frames = command::led_color(self.hub_type().led_port(), color)?;
        self.send_all(connection.as_ref(), frames).await
    }

    pub async fn set_led_rgb(&self, red: u8, green: u8, blue: u8) -> Result<(), HubError> {
        let connection = self.link()?;
        let frames = command::led_rgb(self.hub_type().led_port(), Rgb::new(red, green, blue));
        self.send_all(connection.as_ref(), frames).await
    }

    /// Hue in `[0, 360)`, saturation and value in `[0, 1]`
    pub async fn set_led_hsv(
        &self,
        hue: f64,
        saturation: f64,
        value: f64,
    ) -> Result<(), HubError> {
        let connection = self.link()?;
        let frames = command::led_hsv(self.hub_type().led_port(), hue, saturation, value)?;
        self.send_all(connection.as_ref(), frames).await
    }

    // === Motors ===

    /// Run a motor at `speed` percent (clamped to -100..=100)
    pub async fn set_motor_speed(&self, port: Port, speed: i32) -> Result<(), HubError> {
        let connection = self.link()?;
        self.send(connection.as_ref(), &command::motor_speed(port, speed))
            .await
    }

    /// Let a motor float
    pub async fn stop_motor(&self, port: Port) -> Result<(), HubError> {
        let connection = self.link()?;
        self.send(connection.as_ref(), &command::motor_stop(port))
            .await
    }

    /// Run a motor for `time_ms` milliseconds, then brake
    pub async fn set_motor_speed_for_time(
        &self,
        port: Port,
        speed: i32,
        time_ms: i16,
    ) -> Result<(), HubError> {
        let connection = self.link()?;
        let frame = command::motor_speed_for_time(port, speed, time_ms)?;
        self.send(connection.as_ref(), &frame).await
    }

    /// Turn a tacho motor by `degrees`, then brake
    pub async fn set_motor_speed_for_degrees(
        &self,
        port: Port,
        speed: i32,
        degrees: i32,
    ) -> Result<(), HubError> {
        let connection = self.link()?;
        let frame = command::motor_speed_for_degrees(port, speed, degrees)?;
        self.send(connection.as_ref(), &frame).await
    }

    // === Ports & devices ===

    /// Record a device on `port` without waiting for the hub to announce it
    pub fn register_device(&self, port: Port, device_type: DeviceType) -> Result<(), HubError> {
        self.link()?;
        let previous = self.inner.state.lock().registry.register(port, device_type);
        debug!(%port, %device_type, ?previous, "Registered device");
        Ok(())
    }

    pub fn register_devices(&self, devices: &[Device]) -> Result<(), HubError> {
        self.link()?;
        let mut state = self.inner.state.lock();
        for device in devices {
            state.registry.register(device.port, device.device_type);
        }
        Ok(())
    }

    pub fn deregister_device(&self, port: Port) -> Result<Option<DeviceType>, HubError> {
        self.link()?;
        Ok(self.inner.state.lock().registry.deregister(port))
    }

    pub fn device_type_at(&self, port: Port) -> Option<DeviceType> {
        self.inner.state.lock().registry.device_type_at(port)
    }

    /// Attached devices ordered by port
    pub fn devices(&self) -> Vec<Device> {
        self.inner.state.lock().registry.devices()
    }

    /// Start value reports from `port`
    ///
    /// Without an explicit `device_type` the registered device is used.
    pub async fn activate_port_device(
        &self,
        port: Port,
        device_type: Option<DeviceType>,
    ) -> Result<(), HubError> {
        let connection = self.link()?;
        let device_type = self.resolve_device_type(port, device_type)?;
        let mode = device_type.mode();

        // Recorded first so the earliest value report is accepted
        let previous = {
            let mut state = self.inner.state.lock();
            let previous = state.registry.activation(port);
            state.registry.record_activation(port, device_type, mode);
            previous
        };

        let result = self
            .send(connection.as_ref(), &command::activate_port(port, mode))
            .await;
        if result.is_err() {
            // The hub keeps whatever reporting it had before
            self.inner
                .state
                .lock()
                .registry
                .restore_activation(port, previous);
        }
        result
    }

    /// Stop value reports from `port`
    pub async fn deactivate_port_device(
        &self,
        port: Port,
        device_type: Option<DeviceType>,
    ) -> Result<(), HubError> {
        let connection = self.link()?;
        let device_type = match device_type {
            Some(device_type) => device_type,
            None => {
                let activation = self.inner.state.lock().registry.activation(port);
                match activation {
                    Some(activation) => activation.device_type,
                    None => self.resolve_device_type(port, None)?,
                }
            }
        };
        self.send(
            connection.as_ref(),
            &command::deactivate_port(port, device_type.mode()),
        )
        .await?;
        // Only once the hub was told; until then its reports still count
        self.inner.state.lock().registry.record_deactivation(port);
        Ok(())
    }

    fn resolve_device_type(
        &self,
        port: Port,
        device_type: Option<DeviceType>,
    ) -> Result<DeviceType, HubError> {
        device_type
            .or_else(|| self.device_type_at(port))
            .ok_or_else(|| HubError::InvalidArgument(format!("No device registered on port {}", port)))
    }

    // === Properties ===

    pub fn snapshot(&self) -> PropertySnapshot {
        self.inner.state.lock().properties.snapshot()
    }

    /// Battery level in percent
    pub fn battery_level(&self) -> Option<u8> {
        self.inner.state.lock().properties.battery_level()
    }

    /// Battery voltage in volts
    pub fn hub_voltage(&self) -> Option<f64> {
        self.inner.state.lock().properties.voltage()
    }

    /// Current draw in milliamps
    pub fn hub_current(&self) -> Option<f64> {
        self.inner.state.lock().properties.current()
    }

    /// Signal strength in dBm
    pub fn rssi(&self) -> Option<i8> {
        self.inner.state.lock().properties.rssi()
    }

    pub fn firmware_version(&self) -> Option<Version> {
        self.inner.state.lock().properties.firmware_version()
    }

    pub fn hardware_version(&self) -> Option<Version> {
        self.inner.state.lock().properties.hardware_version()
    }

    /// Angle of the external tacho motor in degrees
    pub fn tacho_motor_rotation(&self) -> Option<i32> {
        self.inner.state.lock().properties.tacho_motor_rotation()
    }

    /// Angle of the Boost hub's internal motor in degrees
    pub fn boost_hub_motor_rotation(&self) -> Option<i32> {
        self.inner.state.lock().properties.hub_motor_rotation()
    }

    pub fn tilt_x(&self) -> Option<i8> {
        self.inner.state.lock().properties.tilt().map(|t| t.x)
    }

    pub fn tilt_y(&self) -> Option<i8> {
        self.inner.state.lock().properties.tilt().map(|t| t.y)
    }

    pub fn color(&self) -> Option<Color> {
        self.inner.state.lock().properties.color()
    }

    /// Distance in centimetres
    pub fn distance(&self) -> Option<f64> {
        self.inner.state.lock().properties.distance()
    }

    pub fn is_button_pressed(&self) -> bool {
        self.inner
            .state
            .lock()
            .properties
            .hub_button()
            .unwrap_or(false)
    }

    fn left_remote(&self) -> RemoteButtons {
        self.inner
            .state
            .lock()
            .properties
            .left_remote()
            .unwrap_or_default()
    }

    fn right_remote(&self) -> RemoteButtons {
        self.inner
            .state
            .lock()
            .properties
            .right_remote()
            .unwrap_or_default()
    }

    pub fn is_left_remote_up_button_pressed(&self) -> bool {
        self.left_remote().up
    }

    pub fn is_left_remote_down_button_pressed(&self) -> bool {
        self.left_remote().down
    }

    pub fn is_left_remote_stop_button_pressed(&self) -> bool {
        self.left_remote().stop
    }

    pub fn is_left_remote_button_released(&self) -> bool {
        self.left_remote().released
    }

    pub fn is_right_remote_up_button_pressed(&self) -> bool {
        self.right_remote().up
    }

    pub fn is_right_remote_down_button_pressed(&self) -> bool {
        self.right_remote().down
    }

    pub fn is_right_remote_stop_button_pressed(&self) -> bool {
        self.right_remote().stop
    }

    pub fn is_right_remote_button_released(&self) -> bool {
        self.right_remote().released
    }
}

async fn close_quietly(connection: Arc<dyn Connection>) {
    if let Err(e) = connection.disconnect().await {
        debug!("Ignoring error while closing link: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lpf2_transport::MockConnector;

    fn mock_hub() -> (Hub, Arc<MockConnector>) {
        let connector = Arc::new(MockConnector::new(0x40));
        (Hub::new(connector.clone()), connector)
    }

    #[tokio::test]
    async fn test_commands_require_connection() {
        let (hub, connector) = mock_hub();
        assert!(matches!(
            hub.set_motor_speed(Port::A, 50).await,
            Err(HubError::NotConnected)
        ));
        assert!(matches!(
            hub.register_device(Port::C, DeviceType::BoostDistance),
            Err(HubError::NotConnected)
        ));
        assert!(matches!(
            hub.activate_port_device(Port::C, None).await,
            Err(HubError::NotConnected)
        ));
        assert_eq!(connector.connect_attempts(), 0);
    }

    #[tokio::test]
    async fn test_led_port_follows_hub_type() {
        let connector = Arc::new(MockConnector::new(0x42));
        let hub = Hub::new(connector.clone());
        hub.connect(None).await.unwrap();
        assert_eq!(hub.hub_type(), HubType::PoweredUpRemote);

        let link = connector.last_connection().unwrap();
        link.clear_written();
        hub.set_led_color(Color::Green).await.unwrap();
        let written = link.written();
        assert_eq!(written.len(), 2);
        assert_eq!(written[1], vec![0x08, 0x00, 0x81, 0x34, 0x11, 0x51, 0x00, 0x06]);
    }

    #[tokio::test]
    async fn test_activation_needs_known_type() {
        let (hub, connector) = mock_hub();
        hub.connect(None).await.unwrap();
        let link = connector.last_connection().unwrap();
        link.clear_written();

        assert!(matches!(
            hub.activate_port_device(Port::C, None).await,
            Err(HubError::InvalidArgument(_))
        ));
        assert!(link.written().is_empty());

        hub.register_device(Port::C, DeviceType::BoostDistance)
            .unwrap();
        hub.activate_port_device(Port::C, None).await.unwrap();
        assert_eq!(
            link.written(),
            vec![vec![0x0A, 0x00, 0x41, 0x01, 0x08, 0x01, 0x00, 0x00, 0x00, 0x01]]
        );

        hub.deactivate_port_device(Port::C, None).await.unwrap();
        assert_eq!(
            link.written()[1],
            vec![0x0A, 0x00, 0x41, 0x01, 0x08, 0x01, 0x00, 0x00, 0x00, 0x00]
        );
    }
}
