// This code is licensed under Elastic License 2.0
// https://www.elastic.co/licensing/elastic-license

//! Clients of Prometheus compatible backends.

pub mod prometheus;
pub mod registry;
