//! TCP accept loop for the game port

use tokio::net::TcpListener;
use tracing::{debug, warn};

use crate::app::AppState;

use super::handler::handle_connection;

/// Accept clients forever, one task per connection
pub async fn serve(listener: TcpListener, state: AppState) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                if let Err(e) = stream.set_nodelay(true) {
                    debug!(addr = %addr, error = %e, "Failed to set TCP_NODELAY");
                }

                let state = state.clone();
                tokio::spawn(async move {
                    handle_connection(stream, addr, state).await;
                });
            }
            Err(e) => {
                warn!(error = %e, "Failed to accept connection");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::net::handler::test_client::TestClient;
    use tokio::net::TcpStream;
    use tokio_test::assert_ok;

    async fn start() -> (std::net::SocketAddr, AppState) {
        let state = AppState::new(Config {
            input_rate_limit: 1000,
            ..Config::default()
        });
        let listener = assert_ok!(TcpListener::bind("127.0.0.1:0").await);
        let addr = assert_ok!(listener.local_addr());
        tokio::spawn(serve(listener, state.clone()));
        (addr, state)
    }

    async fn client(addr: std::net::SocketAddr) -> TestClient<TcpStream> {
        TestClient::new(assert_ok!(TcpStream::connect(addr).await))
    }

    #[tokio::test]
    async fn test_loopback_pairing() {
        let (addr, state) = start().await;

        let mut alice = client(addr).await;
        alice.send("PING").await;
        alice.expect("PONG").await;
        alice.send("USER alice").await;
        alice.expect("SUCCESS").await;

        let mut bob = client(addr).await;
        bob.send("USER bob").await;
        bob.expect("SUCCESS").await;
        alice.expect("READY").await;
        bob.expect("READY").await;
        assert_eq!(state.sessions.active_sessions(), 1);

        alice.send("PLACE 1 1 L_SHAPE 1").await;
        alice.expect("SUCCESS").await;
        alice.send("PLACE 2 1 ONE_SHAPE 0").await;
        alice.expect("FAILURE").await;

        drop(alice);
        bob.expect("WIN").await;
        bob.expect_closed().await;
    }

    #[tokio::test]
    async fn test_connections_are_independent() {
        let (addr, _state) = start().await;

        let mut clients = Vec::new();
        for i in 0..4 {
            let mut c = client(addr).await;
            c.send(&format!("USER player{i}")).await;
            c.expect("SUCCESS").await;
            clients.push(c);
        }

        for c in clients.iter_mut() {
            c.expect("READY").await;
            c.send("PING").await;
            c.expect("PONG").await;
        }
    }
}
