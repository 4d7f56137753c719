//! Integration tests for the resilient resolver and its providers

pub mod nominatim_test;
pub mod resolver_flow;
