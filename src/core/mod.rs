//! Core business logic abstractions

pub mod catalog;
pub mod config;
pub mod integrity;
pub mod log;
pub mod pipeline;
pub mod price;

// Re-export main types for cleaner imports
pub use catalog::{Category, INSTRUMENTS, InstrumentSpec};
pub use pipeline::{FailureRecord, Outcome, PriceObservation, PriceReport, fetch_all};
pub use price::{BatchHistory, HistoryRequest, MarketDataProvider, PricePoint, PriceSeries};
