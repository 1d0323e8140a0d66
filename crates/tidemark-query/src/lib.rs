pub mod filter;
pub mod series;

pub use filter::{compile_filters, CompiledFilter, Filter, FilterError, FilterOp};
pub use series::{aggregate_series, SeriesPoint};
