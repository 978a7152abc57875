//! Integration tests for WebSocket client connections.
//!
//! These spin up a real listener and a `tokio-tungstenite` client so the
//! handshake and the frame types are checked on an actual socket.

#[cfg(feature = "websocket")]
mod websocket {
    use std::time::{Duration, Instant};

    use futures_util::{SinkExt, StreamExt};
    use hubcast_transport::{
        BroadcastEnvelope, ClientFanout, Connection, ConnectionSink,
        TransferFormat, TransportError, WebSocketConnection, WebSocketTransport,
    };
    use tokio_tungstenite::tungstenite::Message;

    type ClientWs = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    fn supported() -> Vec<(String, TransferFormat)> {
        vec![
            ("json".to_string(), TransferFormat::Text),
            ("messagepack".to_string(), TransferFormat::Binary),
        ]
    }

    async fn bind() -> (WebSocketTransport, String) {
        let transport = WebSocketTransport::bind("127.0.0.1:0", supported())
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("bound address").to_string();
        (transport, addr)
    }

    /// Accepts one socket and negotiates it.
    async fn accept_one(
        transport: &WebSocketTransport,
    ) -> Result<WebSocketConnection, TransportError> {
        transport.accept().await?.negotiate().await
    }

    /// Upgrades to WebSocket without sending a handshake.
    async fn connect_raw(addr: &str) -> ClientWs {
        let url = format!("ws://{addr}");
        let (ws, _) = tokio_tungstenite::connect_async(&url)
            .await
            .expect("client should connect");
        ws
    }

    /// Upgrades and sends `frame` as the handshake.
    async fn connect_sending(addr: &str, frame: &str) -> ClientWs {
        let mut ws = connect_raw(addr).await;
        ws.send(Message::text(frame.to_string()))
            .await
            .expect("handshake should send");
        ws
    }

    /// Connects and sends a well-formed handshake for `protocol`.
    async fn connect_client(addr: &str, protocol: &str) -> ClientWs {
        let handshake =
            format!("{{\"protocol\":\"{protocol}\",\"version\":1}}\u{1e}");
        connect_sending(addr, &handshake).await
    }

    async fn next_frame(ws: &mut ClientWs) -> Message {
        ws.next()
            .await
            .expect("stream should yield")
            .expect("frame should be valid")
    }

    /// Reads the error reply and the close frame that must follow it.
    async fn expect_rejection(ws: &mut ClientWs) -> String {
        let reply = match next_frame(ws).await {
            Message::Text(text) => text.as_str().to_string(),
            other => panic!("expected text frame, got {other:?}"),
        };
        assert!(reply.starts_with("{\"error\":"), "got {reply}");
        assert!(reply.ends_with('\u{1e}'));
        assert!(matches!(next_frame(ws).await, Message::Close(_)));
        reply
    }

    // =====================================================================
    // Handshake
    // =====================================================================

    #[tokio::test]
    async fn test_handshake_negotiates_protocol() {
        let (transport, addr) = bind().await;
        let (mut client, conn) = tokio::join!(
            connect_client(&addr, "messagepack"),
            accept_one(&transport)
        );
        let conn = conn.expect("handshake should succeed");

        assert_eq!(conn.protocol(), "messagepack");
        assert_eq!(conn.transfer_format(), TransferFormat::Binary);
        assert!(conn.id().into_inner() > 0);

        let ack = next_frame(&mut client).await;
        assert_eq!(ack, Message::text("{}\u{1e}"));
    }

    #[tokio::test]
    async fn test_unsupported_protocol_gets_error_reply_and_close() {
        let (transport, addr) = bind().await;
        let (mut client, result) =
            tokio::join!(connect_client(&addr, "xml"), accept_one(&transport));
        assert!(matches!(result, Err(TransportError::Handshake(_))));

        let reply = expect_rejection(&mut client).await;
        assert!(reply.contains("xml"));
    }

    #[tokio::test]
    async fn test_handshake_without_record_separator_is_rejected() {
        let (transport, addr) = bind().await;
        let (mut client, result) = tokio::join!(
            connect_sending(&addr, r#"{"protocol":"json","version":1}"#),
            accept_one(&transport)
        );
        assert!(matches!(
            result,
            Err(TransportError::Handshake(ref reason)) if reason.contains("record separator")
        ));

        let reply = expect_rejection(&mut client).await;
        assert!(reply.contains("record separator"));
    }

    #[tokio::test]
    async fn test_handshake_with_invalid_json_is_rejected() {
        let (transport, addr) = bind().await;
        let (mut client, result) = tokio::join!(
            connect_sending(&addr, "not json\u{1e}"),
            accept_one(&transport)
        );
        assert!(matches!(
            result,
            Err(TransportError::Handshake(ref reason)) if reason.contains("invalid handshake")
        ));

        expect_rejection(&mut client).await;
    }

    #[tokio::test]
    async fn test_silent_client_times_out() {
        let (transport, addr) = bind().await;
        let transport = transport.with_handshake_timeout(Duration::from_millis(200));

        let (_client, result) = tokio::join!(connect_raw(&addr), accept_one(&transport));
        assert!(matches!(
            result,
            Err(TransportError::Handshake(ref reason)) if reason.contains("timed out")
        ));
    }

    #[tokio::test]
    async fn test_client_that_never_upgrades_times_out() {
        let (transport, addr) = bind().await;
        let transport = transport.with_handshake_timeout(Duration::from_millis(200));

        let (tcp, result) =
            tokio::join!(tokio::net::TcpStream::connect(&addr), accept_one(&transport));
        let _tcp = tcp.expect("tcp connect");
        assert!(matches!(
            result,
            Err(TransportError::Handshake(ref reason)) if reason.contains("timed out")
        ));
    }

    #[tokio::test]
    async fn test_stalled_clients_do_not_hold_up_others() {
        // Default timeout: the stalled clients stay pending for 5 s.
        let (transport, addr) = bind().await;
        let mut incoming = transport.incoming();

        let _tcp_only = tokio::net::TcpStream::connect(&addr)
            .await
            .expect("tcp connect");
        let _no_handshake = connect_raw(&addr).await;

        let started = Instant::now();
        let mut client = connect_client(&addr, "json").await;
        let conn = tokio::time::timeout(Duration::from_secs(1), incoming.recv())
            .await
            .expect("well-behaved client should be accepted right away")
            .expect("accept loop should be running");

        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(conn.protocol(), "json");
        assert_eq!(next_frame(&mut client).await, Message::text("{}\u{1e}"));
    }

    // =====================================================================
    // After the handshake
    // =====================================================================

    #[tokio::test]
    async fn test_client_close_is_noticed_without_a_send() {
        let (transport, addr) = bind().await;
        let (mut client, conn) =
            tokio::join!(connect_client(&addr, "json"), accept_one(&transport));
        let conn = conn.expect("handshake should succeed");
        next_frame(&mut client).await;
        assert!(!conn.is_closed());

        client.close(None).await.expect("client close");
        tokio::time::timeout(Duration::from_secs(2), async {
            while !conn.is_closed() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("server should see the close");

        let err = conn.send(b"late").await.unwrap_err();
        assert!(matches!(err, TransportError::ConnectionClosed(_)));
    }

    #[tokio::test]
    async fn test_fanout_sends_text_and_binary_frames() {
        let (transport, addr) = bind().await;
        let fanout = ClientFanout::new();

        // The upgrade needs both sides running, so connect and accept together.
        let (mut json_client, json_conn) =
            tokio::join!(connect_client(&addr, "json"), accept_one(&transport));
        fanout.add(json_conn.expect("json client")).await;
        let (mut mp_client, mp_conn) = tokio::join!(
            connect_client(&addr, "messagepack"),
            accept_one(&transport)
        );
        fanout.add(mp_conn.expect("msgpack client")).await;

        // Drain handshake acks.
        next_frame(&mut json_client).await;
        next_frame(&mut mp_client).await;

        let envelope: BroadcastEnvelope = vec![
            ("json".to_string(), b"{\"type\":1}\x1e".to_vec()),
            ("messagepack".to_string(), vec![0x02, 0x91, 0x01]),
        ]
        .into_iter()
        .collect();
        fanout.deliver(envelope).await.expect("delivery should succeed");

        assert_eq!(
            next_frame(&mut json_client).await,
            Message::text("{\"type\":1}\u{1e}")
        );
        assert_eq!(
            next_frame(&mut mp_client).await,
            Message::binary(vec![0x02, 0x91, 0x01])
        );
    }
}
