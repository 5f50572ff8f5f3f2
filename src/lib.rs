//! Library crate for bingo-duel-back, exposing modules for binaries and integration tests.

/// Application configuration.
pub mod config;
/// Persistence layer.
pub mod dao;
/// Wire types for HTTP and WebSocket.
pub mod dto;
/// Service and HTTP error types.
pub mod error;
/// HTTP and WebSocket routing.
pub mod routes;
/// Match engine and connection handling.
pub mod services;
/// Shared state and the match domain.
pub mod state;
