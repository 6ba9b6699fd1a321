// This code is licensed under Elastic License 2.0
// https://www.elastic.co/licensing/elastic-license

//! AWS credentials and SigV4 signing for managed Prometheus workspaces.

pub mod credentials;
pub mod signer;
