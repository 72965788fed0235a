//! Build metadata handler.

use crate::registry::{Handler, Outcome};
use async_trait::async_trait;
use rpc_core::{BuildInfo, Request, Response};
use tracing::debug;

/// Serves the responder's build metadata.
///
/// The metadata is captured once at construction; it cannot change for the
/// lifetime of the process.
pub struct BuildInfoHandler {
    info: BuildInfo,
}

impl BuildInfoHandler {
    #[must_use]
    pub fn new() -> Self {
        Self {
            info: BuildInfo::current(),
        }
    }
}

impl Default for BuildInfoHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Handler for BuildInfoHandler {
    async fn handle(&self, _request: &Request) -> anyhow::Result<Outcome> {
        debug!("buildinfo");
        let mut response = Response::success();
        self.info.apply_to(&mut response);
        Ok(Outcome::reply(response))
    }
}
