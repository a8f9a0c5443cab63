pub mod client;
pub mod envelope;
pub mod stats;
pub mod transmission;

pub use client::{ClientConfig, ClientError, CollectorResponse, HttpClient};
pub use envelope::{DeliveryEnvelope, EncodingError, EnvelopeKind, WireEnvelope};
pub use stats::{DeliverySnapshot, DeliveryStats};
pub use transmission::Deliverer;
