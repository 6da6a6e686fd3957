pub mod enrich;
pub mod filter;
pub mod intervals;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod rolling;
pub mod utilization;
