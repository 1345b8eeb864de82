//! Cloud provider detection for connection endpoints.
//!
//! The registry only brokers credentials for remote managed databases;
//! local endpoints are refused outright.

use crate::core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Known managed-database providers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provider {
    /// Neon
    Neon,
    /// Supabase
    Supabase,
    /// PlanetScale
    PlanetScale,
    /// AWS RDS
    AwsRds,
    /// Google Cloud SQL
    CloudSql,
    /// Azure Database
    AzureDatabase,
    /// Anything else
    Unknown,
}

impl Provider {
    /// Human-readable label stored on sessions.
    pub fn label(&self) -> &'static str {
        match self {
            Provider::Neon => "Neon",
            Provider::Supabase => "Supabase",
            Provider::PlanetScale => "PlanetScale",
            Provider::AwsRds => "AWS RDS",
            Provider::CloudSql => "Google Cloud SQL",
            Provider::AzureDatabase => "Azure Database",
            Provider::Unknown => "Unknown Cloud Provider",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Detect the provider from a connection string's host suffix.
pub fn detect_provider(connection_string: &str) -> Provider {
    let lower = connection_string.to_lowercase();

    if lower.contains(".neon.tech") {
        Provider::Neon
    } else if lower.contains(".supabase.co") {
        Provider::Supabase
    } else if lower.contains(".planetscale.sh") {
        Provider::PlanetScale
    } else if lower.contains(".amazonaws.com") {
        Provider::AwsRds
    } else if lower.contains(".googleapis.com") {
        Provider::CloudSql
    } else if lower.contains(".azure.com") {
        Provider::AzureDatabase
    } else {
        Provider::Unknown
    }
}

const LOCAL_MARKERS: [&str; 4] = ["localhost", "127.0.0.1", "0.0.0.0", "::1"];

/// Reject loopback and wildcard endpoints.
pub fn validate_remote(connection_string: &str) -> Result<()> {
    let lower = connection_string.to_lowercase();
    for marker in LOCAL_MARKERS {
        if lower.contains(marker) {
            return Err(Error::LocalEndpoint(marker.to_string()));
        }
    }
    Ok(())
}
