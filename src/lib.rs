pub mod artifacts;
pub mod builder;
pub mod config;
pub mod engine;
pub mod error;
pub mod extract;
pub mod geo;
pub mod imagesize;
pub mod run;
pub mod scan;
pub mod schema;
pub mod select;
pub mod tile;

pub use engine::{GeocodeEngine, GeocodeOutcome};
pub use error::GeoError;
pub use schema::{FeatureCollection, RunStatus};
