pub mod cache;
pub mod config;
pub mod dashboard;
pub mod domain;
pub mod metrics;
pub mod service;
pub mod time;
pub mod view;
pub mod warehouse;

pub use domain::prediction::{DateBounds, PricePoint, Selection};
pub use metrics::{compute_metrics, MetricsSummary};
pub use service::PredictionService;
pub use warehouse::{PredictionSource, QueryError};
