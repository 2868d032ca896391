//! MQTT 5.0 broker core: wire codec (in [`mqttbroker_codec`]), persistence
//! abstraction, topic matcher, connection registry, dispatcher and
//! per-connection session state machine.

pub mod config;
pub mod constants;
pub mod dispatcher;
pub mod error;
pub mod matcher;
pub mod registry;
pub mod repository;
pub mod server;
pub mod session;
pub mod types;

pub use config::Config;
pub use dispatcher::Dispatcher;
pub use error::{Error, ErrorKind};
pub use registry::Registry;
pub use repository::{MemoryRepository, Repository};
pub use server::Broker;
