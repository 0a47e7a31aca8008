//! Per-connection task: line reader, writer task and teardown

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::peer::{Outgoing, PeerHandle};
use crate::util::rate_limit::PlayerRateLimiter;

use super::dispatch::{dispatch, Disposition};
use super::protocol::{ClientCommand, ServerMsg};

/// Serve one client until it quits, disconnects or is kicked
pub async fn handle_connection<S>(stream: S, addr: SocketAddr, state: AppState)
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (peer, outgoing) = PeerHandle::new(addr);
    state.connections.insert(peer.id(), peer.clone());
    info!(conn_id = %peer.id(), addr = %addr, "Client connected");

    let (reader, writer) = tokio::io::split(stream);

    // Spawn writer task: outbound channel -> socket
    let writer_task = tokio::spawn(write_loop(writer, outgoing, peer.id()));

    read_loop(reader, &peer, &state).await;
    teardown(&peer, &state);

    // Wait for queued output to be flushed
    if let Err(e) = writer_task.await {
        warn!(conn_id = %peer.id(), error = %e, "Writer task failed");
    }

    state.connections.remove(&peer.id());
    info!(conn_id = %peer.id(), name = ?peer.name(), "Connection closed");
}

async fn read_loop<R>(reader: R, peer: &PeerHandle, state: &AppState)
where
    R: AsyncRead + Unpin,
{
    let rate_limiter = PlayerRateLimiter::new(state.config.input_rate_limit);
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    loop {
        tokio::select! {
            _ = peer.kicked() => {
                debug!(conn_id = %peer.id(), "Connection kicked");
                break;
            }
            read = reader.read_until(b'\n', &mut buf) => match read {
                Ok(0) => {
                    info!(conn_id = %peer.id(), "Client closed connection");
                    break;
                }
                Ok(_) => {
                    let line = decode_line(&mut buf);
                    if handle_line(line, peer, state, &rate_limiter) == Disposition::Close {
                        break;
                    }
                }
                Err(e) => {
                    warn!(conn_id = %peer.id(), error = %e, "Read failed");
                    break;
                }
            }
        }
    }
}

/// Take one line out of `buf`, without its terminator. `None` if it is not UTF-8.
fn decode_line(buf: &mut Vec<u8>) -> Option<String> {
    let mut bytes = std::mem::take(buf);
    if bytes.last() == Some(&b'\n') {
        bytes.pop();
        if bytes.last() == Some(&b'\r') {
            bytes.pop();
        }
    }
    String::from_utf8(bytes).ok()
}

fn handle_line(
    line: Option<String>,
    peer: &PeerHandle,
    state: &AppState,
    rate_limiter: &PlayerRateLimiter,
) -> Disposition {
    let command = line.as_deref().map(str::parse::<ClientCommand>);

    // QUIT is always honoured, even over the rate limit
    let is_quit = matches!(command, Some(Ok(ClientCommand::Quit)));
    if !is_quit && !rate_limiter.check_input() {
        warn!(conn_id = %peer.id(), "Rate limited input line");
        peer.send(&ServerMsg::Failure);
        return Disposition::Continue;
    }

    match command {
        Some(command) => dispatch(command, peer, state),
        None => {
            debug!(conn_id = %peer.id(), "Rejected line that is not UTF-8");
            peer.send(&ServerMsg::Failure);
            Disposition::Continue
        }
    }
}

/// Release everything the connection holds. Runs once per connection no
/// matter how many paths reach it.
fn teardown(peer: &PeerHandle, state: &AppState) {
    if !peer.begin_close() {
        return;
    }

    // Leaving the matchmaker first guarantees any pairing that raced with
    // this disconnect is already visible in the session registry.
    state.matchmaker.unregister(peer.id(), peer.name());

    if let Some(session) = state.sessions.session_for(peer.id()) {
        if let Some(seat) = session.seat_of(peer.id()) {
            // A match that already ended leaves the winner connected
            let notices = session.apply(|s| s.forfeit(seat));
            if !notices.is_empty() {
                session.peer(seat.opponent()).kick();
            }
        }
        state.sessions.remove(&session.id());
        info!(
            conn_id = %peer.id(),
            session_id = %session.id(),
            "Session released on disconnect"
        );
    }

    peer.close_writer();
}

/// Tell every open connection the server is going away, then give their
/// handlers up to `grace` to flush and tear down.
pub async fn close_all(state: &AppState, grace: Duration) {
    let peers: Vec<PeerHandle> = state
        .connections
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    info!(connections = peers.len(), "Closing all client connections");

    for peer in &peers {
        // QUIT is the last line the client sees
        peer.send(&ServerMsg::Quit);
        peer.close_writer();
        peer.kick();
    }

    let drained = tokio::time::timeout(grace, async {
        while !state.connections.is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;

    if drained.is_err() {
        warn!(
            remaining = state.connections.len(),
            "Connections still open after shutdown grace period"
        );
    }
}

async fn write_loop<W>(writer: W, mut outgoing: mpsc::UnboundedReceiver<Outgoing>, conn_id: Uuid)
where
    W: AsyncWrite + Unpin,
{
    let mut writer = BufWriter::new(writer);

    while let Some(item) = outgoing.recv().await {
        match item {
            Outgoing::Line(line) => {
                if let Err(e) = write_line(&mut writer, &line).await {
                    debug!(conn_id = %conn_id, error = %e, "Socket write failed");
                    break;
                }
            }
            Outgoing::Close => break,
        }
    }

    let _ = writer.shutdown().await;
}

async fn write_line<W>(writer: &mut BufWriter<W>, line: &str) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}
