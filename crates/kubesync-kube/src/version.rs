//! Server version resolution

use kubesync_core::ServerVersion;

use crate::backend::{Discovery, VersionInfo};
use crate::context::RunContext;
use crate::error::{KubeError, Result};

/// Determine the server version for this run
///
/// Transport and parse failures fall back to [`ServerVersion::DEFAULT`] with a
/// warning. Only cancellation is reported as an error.
pub async fn resolve_version(discovery: &dyn Discovery, ctx: &RunContext) -> Result<ServerVersion> {
    let info = match ctx.guard(discovery.server_version()).await {
        Ok(info) => info,
        Err(KubeError::Cancelled) => return Err(KubeError::Cancelled),
        Err(e) => {
            tracing::warn!(
                error = %e,
                default = %ServerVersion::DEFAULT,
                "unable to fetch server version, assuming default"
            );
            return Ok(ServerVersion::DEFAULT);
        }
    };

    Ok(parse_version_info(&info))
}

/// Parse reported version strings, preferring major/minor over the git version
pub fn parse_version_info(info: &VersionInfo) -> ServerVersion {
    if let Ok(version) = ServerVersion::parse(&info.major, &info.minor) {
        tracing::debug!(%version, "resolved server version");
        return version;
    }

    if let Ok(version) = ServerVersion::parse_git_version(&info.git_version) {
        tracing::debug!(%version, git_version = %info.git_version, "resolved server version from git version");
        return version;
    }

    tracing::warn!(
        major = %info.major,
        minor = %info.minor,
        git_version = %info.git_version,
        default = %ServerVersion::DEFAULT,
        "unable to parse server version, assuming default"
    );
    ServerVersion::DEFAULT
}
