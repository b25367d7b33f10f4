//! WebSocket streams served on a real listener.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::StreamExt;
use plant_core::{
    AlertEngine, Metrics, PlantMonitor, PlantProfile, PlantRegistry, ReadingStore, SensorReading,
    TopicHub,
};
use plant_monitor::{driver::Driver, router, AppState};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn serve(monitor: Arc<PlantMonitor>, hub: Arc<TopicHub>) -> String {
    let (ingest_tx, _ingest_rx) = mpsc::channel(4);
    let state = Arc::new(AppState {
        monitor,
        hub,
        ingest_tx,
        profiles: None,
    });
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.unwrap();
    });
    format!("ws://{addr}")
}

async fn wait_for_subscribers(hub: &TopicHub, topic: &str, expected: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while hub.subscriber_count(topic) != expected {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("{topic} never reached {expected} subscribers"));
}

async fn next_event(client: &mut Client) -> Value {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .expect("no frame within 5s")
            .expect("stream ended")
            .unwrap();
        if let Message::Text(text) = frame {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

fn dry_reading() -> SensorReading {
    SensorReading::new(
        "plant-1",
        Utc::now(),
        Metrics {
            soil_moisture: 10.0,
            temperature: 22.0,
            light_level: 300.0,
            ph: 6.5,
            humidity: 50.0,
            battery_level: 100.0,
        },
    )
}

#[tokio::test]
async fn plant_stream_delivers_its_own_topic_in_order() {
    let monitor = Arc::new(PlantMonitor::new(
        ReadingStore::default(),
        AlertEngine::default(),
        PlantRegistry::new([PlantProfile::seed()]),
    ));
    let hub = Arc::new(TopicHub::default());
    let base = serve(monitor.clone(), hub.clone()).await;

    let (mut plant_1, _) = connect_async(format!("{base}/ws/plants/plant-1")).await.unwrap();
    let (mut plant_2, _) = connect_async(format!("{base}/ws/plants/plant-2")).await.unwrap();
    wait_for_subscribers(&hub, "plant-1", 1).await;
    wait_for_subscribers(&hub, "plant-2", 1).await;

    let driver = Driver::new(monitor, hub.clone(), Duration::from_secs(3));
    let alerts = driver.cycle(dry_reading());
    assert!(!alerts.is_empty());

    let first = next_event(&mut plant_1).await;
    assert_eq!(first["event"], "sensor-data");
    assert_eq!(first["data"]["plantId"], "plant-1");
    assert_eq!(first["data"]["soilMoisture"], 10.0);

    let second = next_event(&mut plant_1).await;
    assert_eq!(second["event"], "alerts");
    assert_eq!(second["data"].as_array().unwrap().len(), alerts.len());
    assert_eq!(second["data"][0]["plantId"], "plant-1");

    let other = tokio::time::timeout(Duration::from_millis(200), plant_2.next()).await;
    assert!(other.is_err(), "plant-2 received {other:?}");

    plant_1.close(None).await.unwrap();
    wait_for_subscribers(&hub, "plant-1", 0).await;
    assert_eq!(hub.subscriber_count("plant-2"), 1);
}
