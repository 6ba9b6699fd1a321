// This code is licensed under Elastic License 2.0
// https://www.elastic.co/licensing/elastic-license

//! Compilation of structured queries to PromQL.

pub mod aggregation;
pub mod promql;
