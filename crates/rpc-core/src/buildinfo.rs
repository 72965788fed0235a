//! Build metadata served by the `buildinfo` handler.

use crate::args::ArgsError;
use crate::envelope::Response;
use serde::{Deserialize, Serialize};

/// Version and build metadata, round-tripped through a [`Response`] as
/// individual string fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildInfo {
    pub version: String,
    pub build_date: String,
    pub git_commit: String,
    pub git_branch: String,
    pub git_url: String,
}

impl BuildInfo {
    /// Build metadata for the current binary.
    ///
    /// The version comes from Cargo; the git fields are stamped in by the
    /// build environment and fall back to `unknown` in local builds.
    #[must_use]
    pub fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            build_date: option_env!("BUILD_DATE").unwrap_or("unknown").to_string(),
            git_commit: option_env!("GIT_COMMIT").unwrap_or("unknown").to_string(),
            git_branch: option_env!("GIT_BRANCH").unwrap_or("unknown").to_string(),
            git_url: option_env!("GIT_URL").unwrap_or("unknown").to_string(),
        }
    }

    /// Write the metadata fields into a response.
    pub fn apply_to(&self, response: &mut Response) {
        response.put_string("version", &self.version);
        response.put_string("buildDate", &self.build_date);
        response.put_string("gitCommit", &self.git_commit);
        response.put_string("gitBranch", &self.git_branch);
        response.put_string("gitUrl", &self.git_url);
    }

    /// Read the metadata fields back out of a response.
    pub fn from_response(response: &Response) -> Result<Self, ArgsError> {
        Ok(Self {
            version: response.get_string("version")?.to_string(),
            build_date: response.get_string("buildDate")?.to_string(),
            git_commit: response.get_string("gitCommit")?.to_string(),
            git_branch: response.get_string("gitBranch")?.to_string(),
            git_url: response.get_string("gitUrl")?.to_string(),
        })
    }
}
