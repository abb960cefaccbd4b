// ============================================================
// TABULAR DOMAIN LAYER
// ============================================================
// Scalar kinds, values and the in-memory table produced by loaders
// No I/O, no async

mod table;
mod value;

pub use table::{Column, TabularData};
pub use value::{ScalarKind, Value, TEMPORAL_FORMAT};
