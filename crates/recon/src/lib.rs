//! Target-vs-achieved reconciliation over keyed metric
//! tables, master catalogs and parent/child geographic rollups.
//!
//! Consumes grids through the engine's `GridSource` and goals through a
//! `RelationalSink`; returns report tables. No file IO.

pub mod aggregate;
pub mod apprentices;
pub mod capacity;
pub mod catalog;
pub mod error;
pub mod layout;
pub mod model;
pub mod reconcile;
pub mod sources;

pub use apprentices::{build_apprentices, ApprenticesReport};
pub use capacity::{build_capacity, capacity_targets, CapacityReport, CapacityTargets};
pub use error::ReconError;
pub use layout::{ReportLayout, SheetLayout};
pub use model::{CatalogRecord, DeltaPair, MetricTable, Reconciliation, RollupRow};
pub use reconcile::reconcile;
