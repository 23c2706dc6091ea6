pub mod artifacts;
pub mod error;
mod executor;
pub mod helpers;
pub mod path;
pub mod simplify;

// Re-export commonly used types
pub use error::AnalyzeError;
pub use executor::adjust_bit_size;
pub use helpers::aggregates::AggregateField;
pub use helpers::pointers::DerefMode;
pub use path::{analyze_path, BranchRecord, Condition, Path, PathAnalyzer};
pub use simplify::simplify;
