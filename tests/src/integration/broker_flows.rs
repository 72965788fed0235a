//! # Broker Flows
//!
//! The TCP broker and client exercised across real socket connections:
//! cross-process-style pub/sub, authentication, and a full RPC exchange
//! with the broker in the middle.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use message_bus::{Broker, BusMessage, TcpBus, Transport};
    use rpc_requester::Requester;
    use rpc_responder::{Dispatcher, HandlerRegistry, ShutdownSignal};
    use tokio::time::{sleep, timeout};

    const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
    const RECV_TIMEOUT: Duration = Duration::from_secs(2);

    /// Bind a broker on an ephemeral port and serve it in the background.
    async fn start_broker(credentials: Option<(String, String)>) -> String {
        let broker = Broker::bind("127.0.0.1:0", credentials).await.unwrap();
        let addr = broker.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = broker.run().await;
        });
        format!("tcp://{addr}")
    }

    /// Give the broker a moment to process subscribe frames already sent;
    /// subscription registration is asynchronous on its side.
    async fn settle() {
        sleep(Duration::from_millis(100)).await;
    }

    fn creds(user: &str, pass: &str) -> Option<(String, String)> {
        Some((user.to_string(), pass.to_string()))
    }

    #[tokio::test]
    async fn test_publish_crosses_connections() {
        let server = start_broker(None).await;
        let subscriber = TcpBus::connect(&server, None, CONNECT_TIMEOUT).await.unwrap();
        let publisher = TcpBus::connect(&server, None, CONNECT_TIMEOUT).await.unwrap();

        let mut sub = subscriber.subscribe("news").await.unwrap();
        settle().await;
        publisher
            .publish(BusMessage::new("news", b"hello".to_vec()))
            .await
            .unwrap();

        let msg = timeout(RECV_TIMEOUT, sub.recv())
            .await
            .expect("timeout")
            .expect("message");
        assert_eq!(msg.payload, b"hello");
        assert_eq!(msg.topic, "news");
    }

    #[tokio::test]
    async fn test_fan_out_to_all_subscribers() {
        let server = start_broker(None).await;
        let first = TcpBus::connect(&server, None, CONNECT_TIMEOUT).await.unwrap();
        let second = TcpBus::connect(&server, None, CONNECT_TIMEOUT).await.unwrap();
        let publisher = TcpBus::connect(&server, None, CONNECT_TIMEOUT).await.unwrap();

        let mut sub1 = first.subscribe("t").await.unwrap();
        let mut sub2 = second.subscribe("t").await.unwrap();
        settle().await;
        publisher
            .publish(BusMessage::new("t", b"x".to_vec()))
            .await
            .unwrap();

        for sub in [&mut sub1, &mut sub2] {
            let msg = timeout(RECV_TIMEOUT, sub.recv())
                .await
                .expect("timeout")
                .expect("message");
            assert_eq!(msg.payload, b"x");
        }
    }

    #[tokio::test]
    async fn test_topic_isolation_across_broker() {
        let server = start_broker(None).await;
        let subscriber = TcpBus::connect(&server, None, CONNECT_TIMEOUT).await.unwrap();
        let publisher = TcpBus::connect(&server, None, CONNECT_TIMEOUT).await.unwrap();

        let mut sub = subscriber.subscribe("mine").await.unwrap();
        settle().await;
        publisher
            .publish(BusMessage::new("other", b"not mine".to_vec()))
            .await
            .unwrap();
        publisher
            .publish(BusMessage::new("mine", b"mine".to_vec()))
            .await
            .unwrap();

        let msg = timeout(RECV_TIMEOUT, sub.recv())
            .await
            .expect("timeout")
            .expect("message");
        assert_eq!(msg.payload, b"mine");
    }

    // =========================================================================
    // AUTHENTICATION
    // =========================================================================

    #[tokio::test]
    async fn test_authenticated_round_trip() {
        let server = start_broker(creds("svc", "hunter2")).await;
        let subscriber = TcpBus::connect(&server, creds("svc", "hunter2"), CONNECT_TIMEOUT)
            .await
            .unwrap();
        let publisher = TcpBus::connect(&server, creds("svc", "hunter2"), CONNECT_TIMEOUT)
            .await
            .unwrap();

        let mut sub = subscriber.subscribe("secure").await.unwrap();
        settle().await;
        publisher
            .publish(BusMessage::new("secure", b"ok".to_vec()))
            .await
            .unwrap();

        let msg = timeout(RECV_TIMEOUT, sub.recv())
            .await
            .expect("timeout")
            .expect("message");
        assert_eq!(msg.payload, b"ok");
    }

    /// Wrong credentials fail the connect itself; the broker answers with
    /// an error frame before closing, so nothing times out later.
    #[tokio::test]
    async fn test_bad_credentials_fail_connect() {
        let server = start_broker(creds("svc", "hunter2")).await;
        let err = TcpBus::connect(&server, creds("svc", "wrong"), CONNECT_TIMEOUT)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("rejected"), "{err}");
    }

    /// Authenticating against a broker that requires no credentials is
    /// still acknowledged; the client must not hang waiting for the ack.
    #[tokio::test]
    async fn test_auth_against_open_broker_is_accepted() {
        let server = start_broker(None).await;
        let subscriber = TcpBus::connect(&server, creds("svc", "whatever"), CONNECT_TIMEOUT)
            .await
            .unwrap();
        let publisher = TcpBus::connect(&server, None, CONNECT_TIMEOUT).await.unwrap();

        let mut sub = subscriber.subscribe("open").await.unwrap();
        settle().await;
        publisher
            .publish(BusMessage::new("open", b"fine".to_vec()))
            .await
            .unwrap();

        let msg = timeout(RECV_TIMEOUT, sub.recv())
            .await
            .expect("timeout")
            .expect("message");
        assert_eq!(msg.payload, b"fine");
    }

    #[tokio::test]
    async fn test_unauthenticated_subscribe_ends_the_connection() {
        let server = start_broker(creds("svc", "hunter2")).await;
        let client = TcpBus::connect(&server, None, CONNECT_TIMEOUT).await.unwrap();

        let mut sub = client.subscribe("secure").await.unwrap();
        let next = timeout(RECV_TIMEOUT, sub.recv())
            .await
            .expect("connection should close, not hang");
        assert!(next.is_none());
    }

    // =========================================================================
    // RPC OVER THE BROKER
    // =========================================================================

    /// The full stack with real sockets in the middle: requester and
    /// responder on separate broker connections.
    #[tokio::test]
    async fn test_rpc_exchange_through_broker() {
        let server = start_broker(None).await;

        let responder_bus: Arc<dyn Transport> = Arc::new(
            TcpBus::connect(&server, None, CONNECT_TIMEOUT).await.unwrap(),
        );
        let registry = Arc::new(HandlerRegistry::with_default_handlers());
        let shutdown = ShutdownSignal::new();
        let dispatcher = Dispatcher::new(registry, responder_bus, shutdown.clone());
        tokio::spawn(async move {
            let _ = dispatcher.serve("request").await;
        });
        settle().await;

        let requester_bus: Arc<dyn Transport> = Arc::new(
            TcpBus::connect(&server, None, CONNECT_TIMEOUT).await.unwrap(),
        );
        let requester = Requester::connect(requester_bus, "request", "broker-client")
            .await
            .unwrap();
        settle().await;

        let response = requester
            .calculator("mul", 21, 2, Duration::from_secs(5))
            .await
            .unwrap();
        assert!(response.ok());
        assert_eq!(response.get_integer("result").unwrap(), 42);

        let response = requester.quit(true, Duration::from_secs(5)).await.unwrap();
        assert!(response.ok());
        assert!(shutdown.released());
    }
}
