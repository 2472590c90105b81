//! # Storage
//!
//! Embedded persistence for observations, stage history and signals.

mod redb_store;

pub use redb_store::{MetricObservation, MetricStore};
