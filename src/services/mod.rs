pub mod analysis_service;
pub mod dataset_service;

pub use analysis_service::AnalysisService;
pub use dataset_service::DatasetService;
