//! Server network layer: WebSocket acceptor and per-session tasks
//!
//! Every accepted connection gets two tasks. The writer drains the session's
//! outbound channel into text frames; the reader feeds inbound frames into
//! the game context. When either side ends, the session is torn down through
//! the same path whether the peer closed cleanly or the transport failed.

use crate::config::ServerConfig;
use crate::game::GameContext;
use crate::sessions::outbound_channel;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

/// Accepts WebSocket connections and wires them into the game context.
pub struct Server {
    listener: TcpListener,
    context: GameContext,
}

impl Server {
    /// Binds to the configured address and builds the game context.
    pub async fn bind(config: ServerConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(config.bind_address()).await?;
        info!("Server listening on {}", listener.local_addr()?);

        Ok(Server {
            listener,
            context: GameContext::new(config),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Handle to the shared state, used to start the tick scheduler.
    pub fn context(&self) -> GameContext {
        self.context.clone()
    }

    /// Accept loop. Only returns if the listener itself fails.
    pub async fn run(self) -> std::io::Result<()> {
        loop {
            let (stream, addr) = self.listener.accept().await?;
            let context = self.context.clone();

            tokio::spawn(async move {
                if let Err(e) = handle_connection(context, stream, addr).await {
                    error!("Connection from {} failed: {}", addr, e);
                }
            });
        }
    }
}

async fn handle_connection(
    context: GameContext,
    stream: TcpStream,
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let ws_stream = accept_async(stream).await?;
    let (mut write, mut read) = ws_stream.split();

    let (tx, mut rx) = outbound_channel();
    let Some(player) = context.connect(tx) else {
        let _ = write.send(Message::Close(None)).await;
        return Ok(());
    };
    debug!("Player {} connected from {}", player, addr);

    let writer_player = player.clone();
    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let text = match message.encode() {
                Ok(text) => text,
                Err(e) => {
                    error!("Failed to encode message for {}: {}", writer_player, e);
                    continue;
                }
            };
            if let Err(e) = write.send(Message::Text(text)).await {
                warn!("Send to {} failed: {}", writer_player, e);
                break;
            }
        }
        let _ = write.close().await;
    });

    while let Some(frame) = read.next().await {
        match frame {
            Ok(Message::Text(text)) => context.handle_client_text(&player, &text).await,
            Ok(Message::Binary(bytes)) => match std::str::from_utf8(&bytes) {
                Ok(text) => context.handle_client_text(&player, text).await,
                Err(_) => warn!("Non UTF-8 binary frame from {}", player),
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                warn!("Receive from {} failed: {}", player, e);
                break;
            }
        }
    }

    context.teardown(&player).await;
    writer.abort();
    Ok(())
}
