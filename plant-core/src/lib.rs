//! Plant telemetry core: reading storage, health scoring, trend analysis,
//! threshold alerting and per-plant broadcast.
//!
//! Everything here is synchronous and in-memory. Transport, persistence and
//! scheduling live in the `plant-monitor` service.

pub mod alerts;
pub mod broadcast;
pub mod error;
pub mod health;
pub mod model;
pub mod monitor;
pub mod registry;
pub mod store;
pub mod trend;
pub mod validate;

pub use alerts::AlertEngine;
pub use broadcast::{Broadcaster, FanOut, Payload, Subscription, TopicHub};
pub use error::{CoreError, FieldError, ValidationErrors};
pub use health::HealthScore;
pub use model::{Alert, AlertType, Metrics, OptimalRanges, PlantProfile, Range, SensorReading};
pub use monitor::{History, PlantHealth, PlantMonitor};
pub use registry::PlantRegistry;
pub use store::{ReadingStore, RetentionPolicy};
pub use trend::{Direction, Trend};
