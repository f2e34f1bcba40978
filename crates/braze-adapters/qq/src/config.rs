//! Configuration for the QQ adapter.
//!
//! Loaded by the outer server from its adapter configuration section:
//!
//! ```yaml
//! adapters:
//!   qq:
//!     uin: 10001000
//!     platform: 2
//!     data_dir: ./data
//!     versions: [V11, V12]
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use braze_core::Version;

/// QQ backend adapter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QqConfig {
    /// Account number the session logs in as.
    pub uin: i64,
    /// Device platform number presented to the backend at login.
    pub platform: u8,
    /// Directory for the backend client's device and session data.
    pub data_dir: PathBuf,
    /// Login password. Password-less logins fall back to the backend's own
    /// credential flow.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Protocol versions to emit normalized events for.
    pub versions: Vec<Version>,
}

impl Default for QqConfig {
    fn default() -> Self {
        Self {
            uin: 0,
            platform: default_platform(),
            data_dir: default_data_dir(),
            password: None,
            versions: default_versions(),
        }
    }
}

fn default_platform() -> u8 {
    2
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_versions() -> Vec<Version> {
    vec![Version::V11, Version::V12]
}
