//! Hardware accept loop and per-connection reader

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use super::slots::Admission;
use super::HardwareSettings;
use crate::engine::Engine;
use crate::ws::protocol::ServerMsg;

const READ_BUFFER: usize = 1024;

/// Accept controllers forever.
///
/// Connections that cannot be given a slot are dropped straight away,
/// without a start byte.
pub async fn serve_hardware(listener: TcpListener, engine: Arc<Engine>, settings: Arc<HardwareSettings>) {
    if let Ok(addr) = listener.local_addr() {
        info!(addr = %addr, "Hardware listener ready");
    }

    loop {
        let (socket, addr) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                error!(error = %e, "Hardware accept failed");
                tokio::time::sleep(Duration::from_millis(100)).await;
                continue;
            }
        };

        let admission = match engine.admit_hardware(addr) {
            Ok(admission) => admission,
            Err(e) => {
                warn!(addr = %addr, reason = %e, "Rejecting hardware connection");
                drop(socket);
                continue;
            }
        };

        if let Err(e) = socket.set_nodelay(true) {
            debug!(addr = %addr, error = %e, "Failed to set TCP_NODELAY");
        }

        tokio::spawn(run_link(socket, addr, admission, engine.clone(), settings.clone()));
    }
}

/// Drive one admitted link until EOF, an I/O error, or an engine close.
pub async fn run_link<S>(
    mut stream: S,
    addr: SocketAddr,
    admission: Admission,
    engine: Arc<Engine>,
    settings: Arc<HardwareSettings>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let Admission {
        player,
        link_id,
        mut close_rx,
    } = admission;

    if let Err(e) = stream.write_all(&[settings.start_byte]).await {
        warn!(player, addr = %addr, error = %e, "Failed to send start byte");
        engine.abandon_hardware(player, link_id);
        return;
    }

    info!(player, addr = %addr, "Hardware controller connected");
    engine.clients().broadcast(&ServerMsg::PlayerConnected {
        player,
        name: engine.player_name(player),
        address: addr.to_string(),
    });

    let mut framer = TokenFramer::new();
    loop {
        tokio::select! {
            _ = &mut close_rx => {
                info!(player, "Hardware link closed by server");
                break;
            }
            result = stream.read_buf(&mut framer.buf) => {
                match result {
                    Ok(0) => {
                        if let Some(token) = framer.finish() {
                            engine.hardware_token(player, &token, &settings.tokens);
                        }
                        info!(player, addr = %addr, "Hardware controller disconnected");
                        break;
                    }
                    Ok(_) => {
                        for token in framer.tokens() {
                            engine.hardware_token(player, &token, &settings.tokens);
                        }
                    }
                    Err(e) => {
                        warn!(player, addr = %addr, error = %e, "Hardware read failed");
                        break;
                    }
                }
            }
        }
    }

    if let Err(e) = stream.shutdown().await {
        debug!(player, error = %e, "Hardware shutdown failed");
    }
    engine.release_hardware(player, link_id);
}

/// Splits a controller byte stream into trimmed tokens.
///
/// Firmware that never sends a newline gets one token per read. Once a
/// newline shows up the link is treated as line framed, and a partial last
/// line waits in the buffer for the rest of its bytes.
#[derive(Debug)]
struct TokenFramer {
    buf: BytesMut,
    line_framed: bool,
}

impl TokenFramer {
    fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(READ_BUFFER),
            line_framed: false,
        }
    }

    /// Tokens that are complete after the last read
    fn tokens(&mut self) -> Vec<String> {
        if let Some(last) = self.buf.iter().rposition(|b| *b == b'\n') {
            self.line_framed = true;
            let lines = self.buf.split_to(last + 1);
            return String::from_utf8_lossy(&lines)
                .lines()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect();
        }
        if self.line_framed {
            return Vec::new();
        }

        // keep a multi-byte character cut by the read for the next one
        let ready = match std::str::from_utf8(&self.buf) {
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            _ => self.buf.len(),
        };
        let chunk = self.buf.split_to(ready);
        let token = String::from_utf8_lossy(&chunk).trim().to_string();
        if token.is_empty() {
            Vec::new()
        } else {
            vec![token]
        }
    }

    /// Whatever is left once the peer stops sending
    fn finish(&mut self) -> Option<String> {
        let rest = self.buf.split();
        let token = String::from_utf8_lossy(&rest).trim().to_string();
        (!token.is_empty()).then_some(token)
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use serde_json::Value;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpStream;
    use tokio::sync::mpsc;

    use super::*;
    use crate::engine::EngineSettings;
    use crate::game::GameMode;
    use crate::ws::registry::Frame;

    const START: f64 = 1_000.0;

    fn engine(num_players: i64) -> Arc<Engine> {
        let engine = Arc::new(Engine::new(EngineSettings {
            seed: Some(3),
            ..Default::default()
        }));
        engine.init_session(num_players, vec![]).unwrap();
        engine
    }

    fn addr() -> SocketAddr {
        "127.0.0.1:4000".parse().unwrap()
    }

    fn drain_types(rx: &mut mpsc::Receiver<Frame>) -> Vec<String> {
        let mut types = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            let value: Value = serde_json::from_str(&frame).unwrap();
            types.push(value["type"].as_str().unwrap_or_default().to_string());
        }
        types
    }

    fn feed(framer: &mut TokenFramer, bytes: &[u8]) -> Vec<String> {
        framer.buf.extend_from_slice(bytes);
        framer.tokens()
    }

    #[test]
    fn framer_joins_a_line_split_across_reads() {
        let mut framer = TokenFramer::new();

        assert_eq!(feed(&mut framer, b"J\r\nLE"), vec!["J"]);
        assert_eq!(feed(&mut framer, b"FT\n"), vec!["LEFT"]);
        assert!(framer.finish().is_none());
    }

    #[test]
    fn framer_keeps_a_cut_utf8_character() {
        let mut framer = TokenFramer::new();
        let word = "Ñ1".as_bytes();

        assert!(feed(&mut framer, &word[..1]).is_empty());
        assert_eq!(feed(&mut framer, &word[1..]), vec!["Ñ1"]);
    }

    #[test]
    fn unterminated_firmware_gets_a_token_per_read() {
        let mut framer = TokenFramer::new();

        assert_eq!(feed(&mut framer, b"J"), vec!["J"]);
        assert_eq!(feed(&mut framer, b" L "), vec!["L"]);
        assert!(feed(&mut framer, b"  ").is_empty());
    }

    #[tokio::test]
    async fn link_reassembles_tokens_split_across_reads() {
        let engine = engine(1);
        engine.select_mode(GameMode::DiscoDash, START);
        let (_id, mut rx) = engine.clients().register();
        let admission = engine.admit_hardware(addr()).unwrap();

        let stream = tokio_test::io::Builder::new()
            .write(b"S")
            .read(b"R\nLE")
            .read(b"FT\nJU")
            .read(b"MP")
            .build();
        run_link(stream, addr(), admission, engine.clone(), Arc::new(HardwareSettings::default())).await;

        let tokens: Vec<String> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|frame| serde_json::from_str::<Value>(&frame).unwrap())
            .filter(|v| v["type"] == "data")
            .map(|v| v["data"].as_str().unwrap_or_default().to_string())
            .collect();
        assert_eq!(tokens, vec!["R", "LEFT", "JUMP"]);
    }

    #[tokio::test]
    async fn link_sends_start_byte_and_forwards_tokens() {
        let engine = engine(1);
        engine.select_mode(GameMode::DiscoDash, START);
        let (_id, mut rx) = engine.clients().register();
        let admission = engine.admit_hardware(addr()).unwrap();

        let stream = tokio_test::io::Builder::new()
            .write(b"S")
            .read(b"J\r\nL\n")
            .read(b"A 57")
            .build();
        run_link(stream, addr(), admission, engine.clone(), Arc::new(HardwareSettings::default())).await;

        assert_eq!(
            drain_types(&mut rx),
            vec!["player_connected", "data", "data", "data", "player_disconnected"]
        );
        assert_eq!(engine.hardware_links(), 0);

        // the two known tokens were queued, the unknown one was not
        let report = engine.step(START).unwrap();
        assert_eq!(report.outcome.judgements().count(), 2);
    }

    #[tokio::test]
    async fn failed_handshake_frees_slot_quietly() {
        let engine = engine(1);
        let (_id, mut rx) = engine.clients().register();
        let admission = engine.admit_hardware(addr()).unwrap();

        let stream = tokio_test::io::Builder::new()
            .write_error(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))
            .build();
        run_link(stream, addr(), admission, engine.clone(), Arc::new(HardwareSettings::default())).await;

        assert!(drain_types(&mut rx).is_empty());
        assert_eq!(engine.hardware_links(), 0);
    }

    #[tokio::test]
    async fn engine_can_close_a_live_link() {
        let engine = engine(1);
        let admission = engine.admit_hardware(addr()).unwrap();
        let (mut client, server) = tokio::io::duplex(64);

        let handle = tokio::spawn(run_link(
            server,
            addr(),
            admission,
            engine.clone(),
            Arc::new(HardwareSettings::default()),
        ));

        let mut start = [0u8; 1];
        client.read_exact(&mut start).await.unwrap();
        assert_eq!(&start, b"S");

        assert!(engine.close_hardware(1));
        handle.await.unwrap();

        let mut rest = Vec::new();
        client.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
        assert_eq!(engine.hardware_links(), 0);
    }

    #[tokio::test]
    async fn third_controller_is_turned_away_when_roster_is_two() {
        let engine = engine(2);
        let (_id, mut rx) = engine.clients().register();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let local = listener.local_addr().unwrap();
        tokio::spawn(serve_hardware(
            listener,
            engine.clone(),
            Arc::new(HardwareSettings::default()),
        ));

        let mut first = TcpStream::connect(local).await.unwrap();
        let mut byte = [0u8; 1];
        first.read_exact(&mut byte).await.unwrap();
        let mut second = TcpStream::connect(local).await.unwrap();
        second.read_exact(&mut byte).await.unwrap();

        let mut third = TcpStream::connect(local).await.unwrap();
        let mut rest = Vec::new();
        match third.read_to_end(&mut rest).await {
            Ok(_) => assert!(rest.is_empty()),
            Err(e) => assert_eq!(e.kind(), io::ErrorKind::ConnectionReset),
        }

        tokio::time::sleep(Duration::from_millis(50)).await;
        let connected = drain_types(&mut rx)
            .into_iter()
            .filter(|t| t == "player_connected")
            .count();
        assert_eq!(connected, 2);
        assert_eq!(engine.hardware_links(), 2);
    }
}
