//! Integer arithmetic handler.

use crate::registry::{Handler, Outcome};
use async_trait::async_trait;
use rpc_core::{Request, Response};
use tracing::debug;

/// Performs `add`, `sub`, `mul`, or integer `div` on two integer
/// parameters.
///
/// Division by zero and overflow are reported as bad requests, never as
/// faults: arithmetic on caller-supplied numbers is expected to go wrong.
pub struct CalculatorHandler;

#[async_trait]
impl Handler for CalculatorHandler {
    async fn handle(&self, request: &Request) -> anyhow::Result<Outcome> {
        debug!("calculator");

        let operation = match request.get_string("operation") {
            Ok(v) => v,
            Err(e) => {
                return Ok(Outcome::reply(Response::bad_request(format!(
                    "could not read 'operation' from arguments: {e}"
                ))))
            }
        };
        let param1 = match request.get_integer("param1") {
            Ok(v) => v,
            Err(e) => {
                return Ok(Outcome::reply(Response::bad_request(format!(
                    "could not read 'param1' from arguments: {e}"
                ))))
            }
        };
        let param2 = match request.get_integer("param2") {
            Ok(v) => v,
            Err(e) => {
                return Ok(Outcome::reply(Response::bad_request(format!(
                    "could not read 'param2' from arguments: {e}"
                ))))
            }
        };

        let value = match operation {
            "add" => param1.checked_add(param2),
            "sub" => param1.checked_sub(param2),
            "mul" => param1.checked_mul(param2),
            "div" => {
                if param2 == 0 {
                    return Ok(Outcome::reply(Response::bad_request("division by zero")));
                }
                param1.checked_div(param2)
            }
            other => {
                return Ok(Outcome::reply(Response::bad_request(format!(
                    "unknown operation '{other}'"
                ))))
            }
        };

        let Some(value) = value else {
            return Ok(Outcome::reply(Response::bad_request(format!(
                "integer overflow in '{operation}'"
            ))));
        };

        let mut response = Response::success();
        response.put_integer("result", value);
        Ok(Outcome::reply(response))
    }
}
