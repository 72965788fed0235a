//! # RPC Flows
//!
//! End-to-end request/response over the in-memory bus: a real dispatcher
//! with the standard handlers on one side, a real requester on the other,
//! correlation and timeouts doing their actual jobs in between.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use message_bus::{BusMessage, InMemoryBus, MessageProperties, Transport};
    use rpc_core::{Request, Response};
    use rpc_requester::{CallError, Requester};
    use rpc_responder::{Dispatcher, Handler, HandlerRegistry, Outcome, ShutdownSignal};

    const REQUEST_TOPIC: &str = "request";
    const CALL_TIMEOUT: Duration = Duration::from_secs(2);

    /// Echoes the request's integer `marker` argument back as a response
    /// field, making every reply distinguishable.
    struct EchoHandler;

    #[async_trait::async_trait]
    impl Handler for EchoHandler {
        async fn handle(&self, request: &Request) -> anyhow::Result<Outcome> {
            let mut response = Response::success();
            response.put_integer("marker", request.get_integer("marker")?);
            Ok(Outcome::reply(response))
        }
    }

    /// Start a dispatcher with the standard handlers plus `echo`, and wait
    /// until its request subscription is live, so no test publish can race
    /// it.
    async fn start_responder(bus: &Arc<InMemoryBus>) -> ShutdownSignal {
        let before = bus.subscriber_count();
        let registry = Arc::new(
            HandlerRegistry::builder()
                .default_handlers()
                .handler("echo", EchoHandler)
                .build(),
        );
        let shutdown = ShutdownSignal::new();
        let transport: Arc<dyn Transport> = Arc::clone(bus) as Arc<dyn Transport>;
        let dispatcher = Dispatcher::new(registry, transport, shutdown.clone());

        tokio::spawn(async move {
            let _ = dispatcher.serve(REQUEST_TOPIC).await;
        });
        while bus.subscriber_count() <= before {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        shutdown
    }

    async fn connect_requester(bus: &Arc<InMemoryBus>, client_id: &str) -> Requester {
        let transport: Arc<dyn Transport> = Arc::clone(bus) as Arc<dyn Transport>;
        Requester::connect(transport, REQUEST_TOPIC, client_id)
            .await
            .expect("requester connect")
    }

    // =========================================================================
    // HAPPY PATHS
    // =========================================================================

    #[tokio::test]
    async fn test_calculator_round_trip() {
        let bus = Arc::new(InMemoryBus::new());
        let _shutdown = start_responder(&bus).await;
        let requester = connect_requester(&bus, "calc-client").await;

        let response = requester
            .calculator("add", 20, 22, CALL_TIMEOUT)
            .await
            .unwrap();

        assert!(response.ok());
        assert_eq!(response.get_integer("result").unwrap(), 42);
        assert_eq!(requester.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_get_pages_round_trip() {
        let bus = Arc::new(InMemoryBus::new());
        let _shutdown = start_responder(&bus).await;
        let requester = connect_requester(&bus, "pages-client").await;

        let response = requester.get_pages(CALL_TIMEOUT).await.unwrap();

        assert!(response.ok());
        assert_eq!(
            response.get_string("result").unwrap(),
            "[ 'one', 'two', 'three' ]"
        );
    }

    #[tokio::test]
    async fn test_build_info_round_trip() {
        let bus = Arc::new(InMemoryBus::new());
        let _shutdown = start_responder(&bus).await;
        let requester = connect_requester(&bus, "info-client").await;

        let response = requester.build_info(CALL_TIMEOUT).await.unwrap();

        assert!(response.ok());
        let info = rpc_core::BuildInfo::from_response(&response).unwrap();
        assert!(!info.version.is_empty());
    }

    // =========================================================================
    // CORRELATION
    // =========================================================================

    /// Many concurrent calls through one requester, each tagged with a
    /// unique marker; every reply must land on the call that issued it.
    #[tokio::test]
    async fn test_concurrent_calls_get_their_own_replies() {
        let bus = Arc::new(InMemoryBus::new());
        let _shutdown = start_responder(&bus).await;
        let requester = Arc::new(connect_requester(&bus, "many-client").await);

        let mut handles = Vec::new();
        for marker in 0..32_i64 {
            let requester = Arc::clone(&requester);
            handles.push(tokio::spawn(async move {
                let mut request = Request::new("echo");
                request.put_integer("marker", marker);
                let response = requester.call(request, CALL_TIMEOUT).await.unwrap();
                (marker, response.get_integer("marker").unwrap())
            }));
        }

        for handle in handles {
            let (marker, echoed) = handle.await.unwrap();
            assert_eq!(echoed, marker, "call {marker} received the wrong reply");
        }
        assert_eq!(requester.pending_count(), 0);
    }

    /// Two requesters on the same bus must never see each other's replies.
    #[tokio::test]
    async fn test_requesters_are_isolated_by_reply_topic() {
        let bus = Arc::new(InMemoryBus::new());
        let _shutdown = start_responder(&bus).await;
        let first = connect_requester(&bus, "first").await;
        let second = connect_requester(&bus, "second").await;

        let (a, b) = tokio::join!(
            first.calculator("mul", 6, 7, CALL_TIMEOUT),
            second.calculator("mul", 9, 9, CALL_TIMEOUT),
        );

        assert_eq!(a.unwrap().get_integer("result").unwrap(), 42);
        assert_eq!(b.unwrap().get_integer("result").unwrap(), 81);
    }

    // =========================================================================
    // FAILURE PATHS
    // =========================================================================

    #[tokio::test]
    async fn test_unknown_function_is_bad_request_naming_it() {
        let bus = Arc::new(InMemoryBus::new());
        let _shutdown = start_responder(&bus).await;
        let requester = connect_requester(&bus, "unknown-client").await;

        let response = requester
            .call(Request::new("doesNotExist"), CALL_TIMEOUT)
            .await
            .unwrap();

        assert_eq!(response.code().unwrap(), 400);
        assert!(response.message().unwrap().contains("doesNotExist"));
    }

    #[tokio::test]
    async fn test_division_by_zero_returns_and_keeps_serving() {
        let bus = Arc::new(InMemoryBus::new());
        let _shutdown = start_responder(&bus).await;
        let requester = connect_requester(&bus, "div-client").await;

        let response = requester
            .calculator("div", 10, 0, CALL_TIMEOUT)
            .await
            .unwrap();
        assert_eq!(response.code().unwrap(), 400);

        // The dispatcher must still be alive afterwards.
        let response = requester
            .calculator("div", 10, 2, CALL_TIMEOUT)
            .await
            .unwrap();
        assert_eq!(response.get_integer("result").unwrap(), 5);
    }

    #[tokio::test]
    async fn test_mistyped_argument_is_bad_request_end_to_end() {
        let bus = Arc::new(InMemoryBus::new());
        let _shutdown = start_responder(&bus).await;
        let requester = connect_requester(&bus, "mistyped-client").await;

        let mut request = Request::new("calculator");
        request.put_string("operation", "add");
        request.put_string("param1", "one");
        request.put_integer("param2", 2);
        let response = requester.call(request, CALL_TIMEOUT).await.unwrap();

        assert_eq!(response.code().unwrap(), 400);
        assert!(response.message().unwrap().contains("param1"));
    }

    #[tokio::test]
    async fn test_timeout_respects_the_deadline() {
        let bus = Arc::new(InMemoryBus::new());
        // No responder on the bus at all.
        let requester = connect_requester(&bus, "timeout-client").await;

        let timeout = Duration::from_millis(200);
        let started = Instant::now();
        let err = requester
            .call(Request::new("calculator"), timeout)
            .await
            .unwrap_err();
        let elapsed = started.elapsed();

        assert!(matches!(err, CallError::Timeout { .. }));
        assert!(elapsed >= timeout, "timed out early: {elapsed:?}");
        assert!(
            elapsed < timeout + Duration::from_secs(1),
            "timed out late: {elapsed:?}"
        );
        assert_eq!(requester.pending_count(), 0);
    }

    /// Undecodable and non-RPC messages on the request topic are dropped
    /// without disturbing the serving loop.
    #[tokio::test]
    async fn test_garbage_on_request_topic_is_ignored() {
        let bus = Arc::new(InMemoryBus::new());
        let _shutdown = start_responder(&bus).await;
        let requester = connect_requester(&bus, "garbage-client").await;

        // Not JSON, but carries RPC properties.
        bus.publish(
            BusMessage::new(REQUEST_TOPIC, b"not json at all".to_vec()).with_properties(
                MessageProperties::call("bogus-token", "response/garbage-client"),
            ),
        )
        .await
        .unwrap();
        // Valid JSON, but no RPC properties.
        bus.publish(BusMessage::new(REQUEST_TOPIC, b"{}".to_vec()))
            .await
            .unwrap();

        let response = requester
            .calculator("sub", 50, 8, CALL_TIMEOUT)
            .await
            .unwrap();
        assert_eq!(response.get_integer("result").unwrap(), 42);
    }

    // =========================================================================
    // SHUTDOWN
    // =========================================================================

    #[tokio::test]
    async fn test_quit_false_does_not_release_shutdown() {
        let bus = Arc::new(InMemoryBus::new());
        let shutdown = start_responder(&bus).await;
        let requester = connect_requester(&bus, "no-quit-client").await;

        let response = requester.quit(false, CALL_TIMEOUT).await.unwrap();

        assert!(response.ok());
        assert!(!shutdown.released());
    }

    /// Racing quit calls both get their 200, the signal releases once, and
    /// a later call is still served: the loop outlives the release so that
    /// no caller's reply is ever sacrificed to shutdown.
    #[tokio::test]
    async fn test_concurrent_quits_release_once_and_loop_survives() {
        let bus = Arc::new(InMemoryBus::new());
        let shutdown = start_responder(&bus).await;
        let requester = connect_requester(&bus, "quit-client").await;

        let (a, b) = tokio::join!(
            requester.quit(true, CALL_TIMEOUT),
            requester.quit(true, CALL_TIMEOUT),
        );
        assert!(a.unwrap().ok());
        assert!(b.unwrap().ok());
        assert!(shutdown.released());

        let response = requester.quit(true, CALL_TIMEOUT).await.unwrap();
        assert!(response.ok());
        assert!(shutdown.released());
    }
}
