//! Integration tests
//!
//! - `http_provider_test`: the HTTP provider against a wiremock backend
//! - `gateway_test`: whole-gateway scenarios over the in-memory provider

pub mod gateway_test;
