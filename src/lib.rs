// Runtime configuration
pub mod config;

// Cognito token and identity operations
pub mod cognito;

// Session records and refresh gating
pub mod session;

// SigV4 request signing
pub mod signing;

// Reservation backend client
pub mod courts;

// HTTP API
pub mod api;
