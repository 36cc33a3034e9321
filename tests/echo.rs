//! End-to-end test over a real TCP socket: handshake, echo, close.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use wsframed::protocol::{Frame, OpCode};
use wsframed::{Server, ServerConfig};

const MASK: [u8; 4] = [0x12, 0x34, 0x56, 0x78];

fn masked(frame: Frame) -> Vec<u8> {
    let mut buf = Vec::new();
    frame.encode_into(&mut buf, Some(MASK));
    buf
}

fn unmasked(frame: Frame) -> Vec<u8> {
    let mut buf = Vec::new();
    frame.encode_into(&mut buf, None);
    buf
}

async fn spawn_server() -> std::net::SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let server = Server::new(ServerConfig::default());
        let _ = server.serve(listener).await;
    });
    addr
}

async fn upgrade(addr: std::net::SocketAddr) -> TcpStream {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = "GET /chat HTTP/1.1\r\n\
        Host: localhost\r\n\
        Upgrade: websocket\r\n\
        Connection: Upgrade\r\n\
        Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
        Sec-WebSocket-Version: 13\r\n\
        \r\n";
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = vec![0u8; 1024];
    let n = stream.read(&mut response).await.unwrap();
    let text = String::from_utf8_lossy(&response[..n]);
    assert!(text.starts_with("HTTP/1.1 101 Switching Protocols\r\n"));
    assert!(text.contains("Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n"));
    stream
}

#[tokio::test]
async fn handshake_then_greeting_substitution() {
    let addr = spawn_server().await;
    let mut stream = upgrade(addr).await;

    stream.write_all(&masked(Frame::text(b"hi".to_vec()))).await.unwrap();

    let expected = unmasked(Frame::text(b"hello".to_vec()));
    let mut reply = vec![0u8; expected.len()];
    stream.read_exact(&mut reply).await.unwrap();
    assert_eq!(reply, expected);
}

#[tokio::test]
async fn echo_plain_text_and_fragmented_message() {
    let addr = spawn_server().await;
    let mut stream = upgrade(addr).await;

    stream
        .write_all(&masked(Frame::text(b"anything else".to_vec())))
        .await
        .unwrap();
    let expected = unmasked(Frame::text(b"anything else".to_vec()));
    let mut reply = vec![0u8; expected.len()];
    stream.read_exact(&mut reply).await.unwrap();
    assert_eq!(reply, expected);

    // Fragmented message echoes back as one frame.
    let mut wire = masked(Frame::new(false, OpCode::Text, b"frag".to_vec()));
    wire.extend(masked(Frame::new(true, OpCode::Continuation, b"mented".to_vec())));
    stream.write_all(&wire).await.unwrap();

    let expected = unmasked(Frame::text(b"fragmented".to_vec()));
    let mut reply = vec![0u8; expected.len()];
    stream.read_exact(&mut reply).await.unwrap();
    assert_eq!(reply, expected);
}

#[tokio::test]
async fn ping_gets_pong_and_close_gets_echo() {
    let addr = spawn_server().await;
    let mut stream = upgrade(addr).await;

    stream
        .write_all(&masked(Frame::ping(b"beat".to_vec())))
        .await
        .unwrap();
    let expected = unmasked(Frame::pong(b"beat".to_vec()));
    let mut pong = vec![0u8; expected.len()];
    stream.read_exact(&mut pong).await.unwrap();
    assert_eq!(pong, expected);

    stream
        .write_all(&masked(Frame::close(Some(1000), "bye")))
        .await
        .unwrap();
    let expected = unmasked(Frame::close(Some(1000), "bye"));
    let mut close = vec![0u8; expected.len()];
    stream.read_exact(&mut close).await.unwrap();
    assert_eq!(close, expected);

    // Server closes the transport after the handshake completes.
    let mut rest = Vec::new();
    let n = stream.read_to_end(&mut rest).await.unwrap();
    assert_eq!(n, 0);
}

#[tokio::test]
async fn bad_handshake_rejected_with_400() {
    let addr = spawn_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    let request = "GET / HTTP/1.1\r\n\
        Upgrade: websocket\r\n\
        Connection: keep-alive\r\n\
        Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
        Sec-WebSocket-Version: 13\r\n\
        \r\n";
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    assert!(response.starts_with(b"HTTP/1.1 400 Bad Request\r\n"));
}
