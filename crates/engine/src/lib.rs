pub mod coerce;
pub mod columns;
pub mod error;
pub mod formation;
pub mod geocode;
pub mod goals;
pub mod grid;
pub mod header;
pub mod normalize;
pub mod sink;
pub mod value;

pub use columns::{ColumnMap, FieldSpec, FieldWarning};
pub use error::EngineError;
pub use geocode::GeoCode;
pub use grid::{Cell, Grid, GridSet, GridSource};
pub use header::{locate_header, HeaderRow, HeaderRule};
pub use normalize::{load_grid, ImportPlan, ImportSummary, LoadOptions};
pub use sink::{MemorySink, MergePolicy, RelationalSink, TableSchema};
pub use value::{Table, Value};
