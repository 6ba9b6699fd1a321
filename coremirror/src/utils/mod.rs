// This code is licensed under Elastic License 2.0
// https://www.elastic.co/licensing/elastic-license

//! Utilities for managing CoreMirror.

pub mod config;
pub mod environment;
pub mod error;
