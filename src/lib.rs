//! Orderwire - inbound-event reconciliation for chat-commerce merchants
//!
//! Turns chat messages into orders and payment-provider notifications into
//! payment and order state. Every inbound call is logged before it is
//! interpreted, and every step is safe to redeliver.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
