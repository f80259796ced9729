//! In-Game Survey thumbnail
//!
//! Loads the status badge and active survey count shown on the In-Game Survey
//! gem's dashboard thumbnail from a deployed service.

pub mod api;
pub mod config;
pub mod errors;
pub mod model;
pub mod render;
pub mod thumbnail;

pub use api::{ApiHandler, HandlerOptions, ServiceClient};
pub use config::Config;
pub use errors::{Result, ThumbnailError};
pub use model::{Context, MeasureValue, StyleType, TackableMeasure, TackableStatus};
pub use render::{JsonRenderer, TextRenderer, ThumbnailProps, ThumbnailRenderer};
pub use thumbnail::{GemThumbnail, InGameSurveyThumbnail, ThumbnailInputs};
