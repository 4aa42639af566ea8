use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Process-wide metadata merged into every emitted event.
///
/// How these values are discovered is up to the embedding application,
/// the logger only reads them.
///
/// Can be loaded from yaml:
/// ```yaml
/// user: alice
/// host: devbox
/// os: Linux
/// osver: 6.1.0
/// edenver: 20240101-000000
/// logged_by: daemon
/// ```
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default, Serialize, Deserialize)]
pub struct SessionInfo {
    /// Name of the user running the process.
    pub user: String,
    /// Host name of the machine.
    pub host: String,
    /// Operating system name.
    pub os: String,
    /// Operating system version.
    pub osver: String,
    /// Version of the software emitting the events.
    pub edenver: String,
    /// Origin tag of the emitting component.
    pub logged_by: String,
    /// Machine architecture, only reported on macOS where a binary may run
    /// translated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_architecture: Option<String>,
}

impl SessionInfo {
    pub fn from_yaml_str(s: &str) -> Result<Self, Error> {
        Ok(serde_yaml::from_str(s)?)
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let s = fs::read_to_string(path)?;
        Self::from_yaml_str(&s)
    }
}
