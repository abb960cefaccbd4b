pub mod error;
pub mod report;
pub mod tool_results;

// Loader output and scalar kinds
pub mod tabular;
