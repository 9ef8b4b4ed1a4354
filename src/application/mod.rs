// Application layer - Use cases and orchestration
pub mod measurement_source;
pub mod monitoring_service;
