//! polytrace: approximate a raster image with semi-transparent polygons.
//!
//! Each round samples a batch of random shapes, keeps the one whose optimal color
//! lowers the error most, refines it by hill climbing and paints it if it still helps.

pub mod engine;
pub mod engine_thread;
pub mod error;
pub mod export;
pub mod fitness;
pub mod geom;
pub mod loader;
pub mod raster;
pub mod render;
pub mod search_config;
pub mod settings;
pub mod shape;
pub mod state;
pub mod step;

pub use engine::{Engine, Phase, RoundOutcome};
pub use engine_thread::{spawn_engine, EngineCommand, EngineHandle, EngineUpdate};
pub use error::{TraceError, TraceResult};
pub use export::Primitive;
pub use raster::RasterBuffer;
pub use render::{CpuRenderer, Rasterizer};
pub use search_config::SearchConfig;
pub use settings::{Fill, Settings};
pub use shape::{Polygon, ShapeKind};
pub use state::SearchState;
pub use step::Step;
