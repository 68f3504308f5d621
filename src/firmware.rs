//! FortiOS firmware versions.
//!
//! Some fields are encoded differently depending on the firmware the device
//! runs. The version is reported by the REST client when the provider is
//! configured and handed to the conversion engine with every call.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A FortiOS firmware version such as `v7.2.4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FirmwareVersion {
    /// Major release.
    pub major: u32,
    /// Minor release.
    pub minor: u32,
    /// Patch release.
    pub patch: u32,
}

impl FirmwareVersion {
    /// Create a version from its parts.
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

/// Returned when a firmware string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid firmware version '{0}'")]
pub struct InvalidFirmwareVersion(pub String);

impl FromStr for FirmwareVersion {
    type Err = InvalidFirmwareVersion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);

        let mut parts = digits.split('.');
        let mut next = |required: bool| -> Result<u32, InvalidFirmwareVersion> {
            match parts.next() {
                Some(p) => p
                    .parse::<u32>()
                    .map_err(|_| InvalidFirmwareVersion(s.to_string())),
                None if required => Err(InvalidFirmwareVersion(s.to_string())),
                None => Ok(0),
            }
        };

        let major = next(true)?;
        let minor = next(true)?;
        let patch = next(false)?;
        if parts.next().is_some() {
            return Err(InvalidFirmwareVersion(s.to_string()));
        }

        Ok(Self::new(major, minor, patch))
    }
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{}.{}", self.major, self.minor, self.patch)
    }
}
