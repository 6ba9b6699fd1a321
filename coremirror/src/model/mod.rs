// This code is licensed under Elastic License 2.0
// https://www.elastic.co/licensing/elastic-license

//! Inbound data model of the mirror: connection details, conditions and queries.

pub mod condition;
pub mod connection;
pub mod query;
