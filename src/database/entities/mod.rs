pub mod analyses;
pub mod datasets;
