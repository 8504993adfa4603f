//! Throttlegate - Admission Control for Sensitive Endpoints
//!
//! This crate implements an in-process rate limiting gate that sits in front
//! of sensitive HTTP endpoints (one-time-code issuance and verification,
//! contact submission, bulk email triggers). Each request matching a rule is
//! counted per client in a fixed window held in bounded process memory;
//! requests over quota are rejected with a 429.

pub mod config;
pub mod error;
pub mod http;
pub mod ratelimit;
