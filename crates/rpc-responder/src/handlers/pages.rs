//! Fixed page-list handler.

use crate::registry::{Handler, Outcome};
use async_trait::async_trait;
use rpc_core::{Request, Response};
use tracing::debug;

/// Returns the static page list as a string-encoded `result` field.
pub struct GetPagesHandler;

/// The list is a fixed string, not a JSON array; clients display it as-is.
pub const PAGES: &str = "[ 'one', 'two', 'three' ]";

#[async_trait]
impl Handler for GetPagesHandler {
    async fn handle(&self, _request: &Request) -> anyhow::Result<Outcome> {
        debug!("getPages");
        let mut response = Response::success();
        response.put_string("result", PAGES);
        Ok(Outcome::reply(response))
    }
}
