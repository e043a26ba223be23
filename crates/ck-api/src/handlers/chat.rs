//! WebSocket chat
//!
//! Every connected client receives every message, including its own and the
//! join/leave notices.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use chrono::Local;
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast;

use crate::extractors::AppState;

/// Messages a slow client may fall behind before it starts missing some
const HUB_CAPACITY: usize = 256;

/// Broadcast hub shared by every chat connection
#[derive(Clone)]
pub struct ChatHub {
    sender: broadcast::Sender<String>,
    next_client_id: Arc<AtomicU64>,
}

impl Default for ChatHub {
    fn default() -> Self {
        Self::new(HUB_CAPACITY)
    }
}

impl ChatHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            next_client_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn next_client_id(&self) -> u64 {
        self.next_client_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.sender.subscribe()
    }

    /// Send to every subscriber; returns how many received it
    pub fn broadcast(&self, message: String) -> usize {
        // Err only means nobody is listening
        self.sender.send(message).unwrap_or(0)
    }

    pub fn connected(&self) -> usize {
        self.sender.receiver_count()
    }
}

pub fn joined_message(client_id: u64) -> String {
    format!("Client #{} joined the chat", client_id)
}

pub fn left_message(client_id: u64) -> String {
    format!("Client #{} left the chat", client_id)
}

pub fn chat_message(client_id: u64, timestamp: &str, text: &str) -> String {
    format!("[{}] Client #{}: {}", timestamp, client_id, text)
}

/// GET /ws/chat
pub async fn chat(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let hub = state.chat.clone();
    ws.on_upgrade(move |socket| chat_session(socket, hub))
}

async fn chat_session(socket: WebSocket, hub: ChatHub) {
    let client_id = hub.next_client_id();
    let mut inbox = hub.subscribe();
    let (mut outgoing, mut incoming) = socket.split();

    hub.broadcast(joined_message(client_id));
    tracing::debug!(client_id, connected = hub.connected(), "Chat client joined");

    let mut forward = tokio::spawn(async move {
        loop {
            match inbox.recv().await {
                Ok(message) => {
                    if outgoing.send(Message::Text(message)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(client_id, skipped, "Chat client lagging");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let relay_hub = hub.clone();
    let mut relay = tokio::spawn(async move {
        while let Some(Ok(message)) = incoming.next().await {
            match message {
                Message::Text(text) => {
                    let timestamp = Local::now().format("%H:%M:%S").to_string();
                    relay_hub.broadcast(chat_message(client_id, &timestamp, &text));
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Whichever side finishes first ends the session
    tokio::select! {
        _ = &mut forward => relay.abort(),
        _ = &mut relay => forward.abort(),
    }

    hub.broadcast(left_message(client_id));
    tracing::debug!(client_id, "Chat client left");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use ck_core::config::AppConfig;
    use ck_db::MemoryItemRepository;
    use ck_files::MemoryStorage;
    use ck_tasks::TaskQueue;
    use tokio::net::TcpStream;
    use tokio_tungstenite::{connect_async, tungstenite, MaybeTlsStream, WebSocketStream};

    type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

    async fn serve() -> String {
        let config = AppConfig::default();
        let items = Arc::new(MemoryItemRepository::new(config.pagination.max_page_size));
        let storage = Arc::new(MemoryStorage::new(1024));
        let (tasks, _receiver) = TaskQueue::bounded(4);
        let app = crate::router(1024).with_state(AppState::new(config, items, storage, tasks));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("ws://{}/ws/chat", addr)
    }

    async fn connect(url: &str) -> Client {
        let (client, _) = connect_async(url).await.unwrap();
        client
    }

    async fn next_text(client: &mut Client) -> String {
        loop {
            let message = tokio::time::timeout(Duration::from_secs(5), client.next())
                .await
                .expect("timed out waiting for a chat message")
                .expect("connection closed")
                .unwrap();
            if let tungstenite::Message::Text(text) = message {
                return text;
            }
        }
    }

    #[test]
    fn test_message_formats() {
        assert_eq!(joined_message(3), "Client #3 joined the chat");
        assert_eq!(left_message(3), "Client #3 left the chat");
        assert_eq!(
            chat_message(3, "12:00:05", "hello"),
            "[12:00:05] Client #3: hello"
        );
    }

    #[test]
    fn test_client_ids_are_unique() {
        let hub = ChatHub::default();
        let other = hub.clone();
        assert_eq!(hub.next_client_id(), 1);
        assert_eq!(other.next_client_id(), 2);
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_subscriber() {
        let hub = ChatHub::new(8);
        assert_eq!(hub.broadcast("nobody".into()), 0);

        let mut first = hub.subscribe();
        let mut second = hub.subscribe();
        assert_eq!(hub.connected(), 2);

        assert_eq!(hub.broadcast(joined_message(1)), 2);
        assert_eq!(first.recv().await.unwrap(), "Client #1 joined the chat");
        assert_eq!(second.recv().await.unwrap(), "Client #1 joined the chat");
    }

    #[tokio::test]
    async fn test_chat_session_over_websocket() {
        let url = serve().await;

        let mut alice = connect(&url).await;
        assert_eq!(next_text(&mut alice).await, "Client #1 joined the chat");

        let mut bob = connect(&url).await;
        assert_eq!(next_text(&mut bob).await, "Client #2 joined the chat");
        assert_eq!(next_text(&mut alice).await, "Client #2 joined the chat");

        alice
            .send(tungstenite::Message::Text("hello".into()))
            .await
            .unwrap();
        for client in [&mut alice, &mut bob] {
            let text = next_text(client).await;
            // [HH:MM:SS] Client #1: hello
            let (timestamp, rest) = text.split_at(10);
            assert_eq!(rest, " Client #1: hello");
            assert!(timestamp.starts_with('[') && timestamp.ends_with(']'));
            let clock: Vec<&str> = timestamp[1..9].split(':').collect();
            assert_eq!(clock.len(), 3);
            assert!(clock
                .iter()
                .all(|part| part.len() == 2 && part.chars().all(|c| c.is_ascii_digit())));
        }

        alice.close(None).await.unwrap();
        assert_eq!(next_text(&mut bob).await, "Client #1 left the chat");
    }
}
