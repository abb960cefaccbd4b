pub mod analysis;
pub mod catalog;
pub mod export;
pub mod ingestion;
pub mod maintenance;
pub mod query_gateway;
