/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Connection lifecycle handling and liveness-driven status changes.
pub mod liveness_service;
/// Match channel messages and WebSocket send helpers.
pub mod match_events;
/// Match engine operations: create, join, check cells, resume, abandon, lookups.
pub mod match_service;
/// Storage connection supervisor driving degraded mode.
pub mod storage_supervisor;
/// WebSocket connection and message handling service.
pub mod websocket_service;
