//! Personality Prediction API Library
//!
//! This library serves a pre-trained introvert/extrovert classifier over HTTP,
//! for single records (JSON) and batches (CSV upload), and provides a typed
//! client for the service.
//!
//! # Modules
//!
//! - `api`: HTTP-facing components.
//! - `core`: Schema, preprocessing and inference.
//! - `integrations`: Clients for the running service.
//! - `app`: Router assembly and request logging.
//! - `batch`: CSV batch prediction.
//! - `classifier`: Model artifact loading and inference.
//! - `client`: HTTP client for the prediction service.
//! - `config`: Configuration management.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers.
//! - `models`: Request and response models.
//! - `openapi`: OpenAPI document and Swagger UI.
//! - `preprocessing`: Raw record to feature row transform.
//! - `schema`: Ordered feature schema and label mapping.

pub mod api;
pub mod core;
pub mod integrations;

// Re-export primary modules for shared use in tests and other binaries
pub mod app;
pub mod batch;
pub mod classifier;
pub mod client;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod openapi;
pub mod preprocessing;
pub mod schema;
