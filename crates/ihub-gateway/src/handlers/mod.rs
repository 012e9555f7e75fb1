//! HTTP request handlers.
//!
//! This module contains the endpoint handlers for the gateway.

pub mod gateway;
pub mod health;
