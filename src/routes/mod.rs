// # Routes Module
//
// HTTP route handlers, grouped by functionality:
// - `health`: liveness check including the credential store
// - `auth`: register, login, and the gated `/auth/*` routes

/// Health check endpoint
pub mod health;

/// Registration, login, logout
pub mod auth;
