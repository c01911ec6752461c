/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Periodic section position cleanup.
pub mod maintenance;
/// Presentation CRUD logic.
pub mod presentation_service;
/// Viewer WebSocket lifecycle for presentation runs.
pub mod run_service;
/// Section CRUD and ordering logic.
pub mod section_service;
/// Storage connection supervisor with back-off and degraded mode.
pub mod storage_supervisor;
