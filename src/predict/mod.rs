pub mod artifacts;
pub mod encoder;
pub mod model;
pub mod regions;
pub mod service;
pub mod train;

pub use artifacts::{PriceArtifacts, YieldArtifacts};
pub use service::{PredictionService, PriceRequest, YieldRequest};
pub use train::train_price_model;
