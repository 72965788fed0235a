//! Remote shutdown handler.

use crate::registry::{Handler, Outcome};
use async_trait::async_trait;
use rpc_core::{Request, Response};
use tracing::debug;

/// Requests responder shutdown when called with `quit: true`.
///
/// The handler only reports the wish; the dispatcher releases the shutdown
/// signal after the reply has been published, so the caller always receives
/// its 200 first.
pub struct QuitHandler;

#[async_trait]
impl Handler for QuitHandler {
    async fn handle(&self, request: &Request) -> anyhow::Result<Outcome> {
        let quit = match request.get_boolean("quit") {
            Ok(v) => v,
            Err(e) => {
                return Ok(Outcome::reply(Response::bad_request(format!(
                    "could not read 'quit' from arguments: {e}"
                ))))
            }
        };
        debug!(quit, "quit");
        Ok(Outcome::reply_and_quit(Response::success(), quit))
    }
}
