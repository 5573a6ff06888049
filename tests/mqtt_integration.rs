// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for the rumqttc transport using mockforge-mqtt.

#![cfg(feature = "mqtt")]

use std::sync::Arc;
use std::time::Duration;

use mockforge_mqtt::broker::MqttConfig;
use mockforge_mqtt::start_mqtt_server;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};
use z2m_bridge::{
    Bridge, BridgeConfig, BridgeEvent, ConnectOptions, ConnectionState, MemorySink, Qos,
    RumqttTransport, Transport, TransportEvent, TransportStatus,
};

/// Helper to find an available port for testing.
fn get_test_port() -> u16 {
    use std::sync::atomic::{AtomicU16, Ordering};
    static PORT_COUNTER: AtomicU16 = AtomicU16::new(18950);
    PORT_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Starts a mock MQTT broker on the given port.
async fn start_mock_broker(port: u16) {
    let config = MqttConfig {
        port,
        host: "127.0.0.1".to_string(),
        ..Default::default()
    };

    tokio::spawn(async move {
        let _ = start_mqtt_server(config).await;
    });

    // Give the broker time to bind.
    sleep(Duration::from_millis(500)).await;
}

fn options(port: u16) -> ConnectOptions {
    ConnectOptions {
        host: "127.0.0.1".to_string(),
        port,
        client_id: format!("z2m_bridge_it_{port}"),
        credentials: None,
        keep_alive: Duration::from_secs(30),
    }
}

async fn next_status(rx: &mut mpsc::UnboundedReceiver<TransportEvent>) -> TransportStatus {
    loop {
        let event = timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("no transport event within timeout")
            .expect("transport channel closed");
        if let TransportEvent::Status(status) = event {
            return status;
        }
    }
}

// ============================================================================
// RumqttTransport
// ============================================================================

mod transport {
    use super::*;

    #[tokio::test]
    async fn connects_and_accepts_requests() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let mut transport = RumqttTransport::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        transport.open(&options(port), tx).unwrap();

        assert_eq!(next_status(&mut rx).await, TransportStatus::Connected);
        assert!(transport.is_connected());

        transport.subscribe("zigbee2mqtt/#", Qos::AtMostOnce).unwrap();
        transport
            .publish("zigbee2mqtt/Kitchen Lamp/set", r#"{"state":"ON"}"#, Qos::AtLeastOnce, false)
            .unwrap();

        transport.close();
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn reopen_replaces_connection() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let mut transport = RumqttTransport::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        transport.open(&options(port), tx.clone()).unwrap();
        assert_eq!(next_status(&mut rx).await, TransportStatus::Connected);

        transport.open(&options(port), tx).unwrap();
        assert_eq!(next_status(&mut rx).await, TransportStatus::Connected);
        assert!(transport.is_connected());
    }

    #[tokio::test]
    async fn missing_broker_reports_failure() {
        let port = get_test_port();

        let mut transport = RumqttTransport::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        transport.open(&options(port), tx).unwrap();

        assert!(matches!(
            next_status(&mut rx).await,
            TransportStatus::Failed(_)
        ));
        assert!(!transport.is_connected());
    }
}

// ============================================================================
// Bridge session over a real transport
// ============================================================================

mod session {
    use super::*;

    #[tokio::test]
    async fn bridge_connects_to_broker() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let config = BridgeConfig::builder()
            .host(format!("mqtt://127.0.0.1:{port}"))
            .build()
            .unwrap();
        let bridge = Bridge::new(
            config,
            Box::new(RumqttTransport::new()),
            Arc::new(MemorySink::new()),
        )
        .spawn();
        let mut events = bridge.events();

        let connected = timeout(Duration::from_secs(5), async {
            loop {
                if let Ok(BridgeEvent::ConnectionChanged { state, .. }) = events.recv().await {
                    if state == ConnectionState::Connected {
                        break;
                    }
                }
            }
        })
        .await;
        assert!(connected.is_ok(), "bridge never reported connected");
        assert_eq!(bridge.state().await.unwrap(), ConnectionState::Connected);

        bridge
            .publish("zigbee2mqtt/bridge/request/health_check", "{}", Qos::AtMostOnce, false)
            .await
            .unwrap();
        bridge.shutdown().unwrap();
    }

    #[tokio::test]
    async fn bridge_without_broker_keeps_retrying() {
        let port = get_test_port();

        let config = BridgeConfig::builder()
            .host("127.0.0.1")
            .port(port)
            .build()
            .unwrap();
        let bridge = Bridge::new(
            config,
            Box::new(RumqttTransport::new()),
            Arc::new(MemorySink::new()),
        )
        .spawn();

        sleep(Duration::from_secs(1)).await;
        assert_eq!(
            bridge.state().await.unwrap(),
            ConnectionState::Disconnected
        );
        bridge.shutdown().unwrap();
    }
}
