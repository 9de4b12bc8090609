//! Kubernetes version parsing.

use crate::error::KucError;

/// Parse a Kubernetes version string into major and minor components.
///
/// Accepts an optional leading `v` and any patch or pre-release suffix,
/// e.g. `v1.14.2`, `1.14`, `v1.15.0-beta.1`.
pub fn parse_k8s_version(version: &str) -> Result<(u32, u32), KucError> {
    let invalid = || KucError::InvalidVersion(version.to_string());

    let trimmed = version.trim().strip_prefix('v').unwrap_or(version.trim());
    let mut parts = trimmed.split('.');

    let major: u32 = parts
        .next()
        .and_then(|p| p.parse().ok())
        .ok_or_else(invalid)?;
    let minor: u32 = parts
        .next()
        .map(|p| p.split('-').next().unwrap_or(p))
        .and_then(|p| p.parse().ok())
        .ok_or_else(invalid)?;

    Ok((major, minor))
}
