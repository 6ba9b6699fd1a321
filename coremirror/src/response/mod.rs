// This code is licensed under Elastic License 2.0
// https://www.elastic.co/licensing/elastic-license

//! Interpretation of backend responses and point construction.

pub mod interpreter;
pub mod points;
