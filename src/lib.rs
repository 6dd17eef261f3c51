//! WooCommerce → Klaviyo order bridge
//!
//! Receives WooCommerce "order created" webhooks, validates and normalizes the
//! order, and forwards a customer profile plus a "Placed Order" event to the
//! Klaviyo API. Event forwarding is deduplicated per order id.
//!
//! # Modules
//!
//! - `api`: HTTP-facing components.
//! - `core`: Validation, normalization, idempotency and shared types.
//! - `integrations`: External service clients.
//! - `config`: Configuration management.
//! - `errors`: Error handling types.
//! - `handlers`: Application state, router and small endpoints.
//! - `idempotency`: Idempotency guard and its key-value store backends.
//! - `klaviyo_client`: Klaviyo API client.
//! - `normalizer`: Order payload → canonical records.
//! - `signature`: WooCommerce webhook signature verification.
//! - `validation`: Inbound payload validation.
//! - `webhook_handler`: WooCommerce order webhook handler.
//! - `webhook_models`: Payload, record and response models.

pub mod api;
pub mod core;
pub mod integrations;

pub mod config;
pub mod errors;
pub mod handlers;
pub mod idempotency;
pub mod klaviyo_client;
pub mod normalizer;
pub mod signature;
pub mod validation;
pub mod webhook_handler;
pub mod webhook_models;
