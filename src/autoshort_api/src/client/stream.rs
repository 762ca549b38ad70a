//! Best-effort websocket listener.
//!
//! Inbound text frames are surfaced as they arrive. There is no buffering, no replay and
//! no reconnection: a failed connection or a closed socket ends the listen attempt.

use futures_util::{stream::Stream, StreamExt};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::client::error::ClientError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Connected,
    /// Payload of an inbound text frame
    Frame(String),
    /// The server closed the socket, with its reason if it gave one.
    Closed(Option<String>),
}

pub struct StreamListener {
    endpoint: String,
    cancel: CancellationToken,
}

impl StreamListener {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Connect and yield events until the socket ends, an error occurs or the listener is
    /// cancelled. Errors are yielded once and end the stream.
    pub fn events(&self) -> impl Stream<Item = Result<StreamEvent, ClientError>> + '_ {
        async_stream::stream! {
            let mut socket = match connect_async(self.endpoint.as_str()).await {
                Ok((socket, _response)) => socket,
                Err(e) => {
                    yield Err(e.into());
                    return;
                }
            };
            yield Ok(StreamEvent::Connected);

            loop {
                let next = tokio::select! {
                    () = self.cancel.cancelled() => {
                        debug!(endpoint = %self.endpoint, "Stream listener cancelled");
                        None
                    }
                    message = socket.next() => message,
                };

                match next {
                    Some(Ok(Message::Text(text))) => {
                        yield Ok(StreamEvent::Frame(text.to_string()));
                    }
                    Some(Ok(Message::Close(frame))) => {
                        yield Ok(StreamEvent::Closed(frame.map(|f| f.reason.to_string())));
                        return;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        yield Err(e.into());
                        return;
                    }
                    None => return,
                }
            }
        }
    }

    /// Log every event until the stream ends.
    ///
    /// # Errors
    ///
    /// Connection and socket errors, after logging them.
    pub async fn listen(&self) -> Result<(), ClientError> {
        self.listen_with(|payload| info!(%payload, "Stream message")).await
    }

    /// Hand every inbound frame payload to `on_frame` until the stream ends.
    pub async fn listen_with<F>(&self, mut on_frame: F) -> Result<(), ClientError>
    where
        F: FnMut(&str),
    {
        let events = self.events();
        futures_util::pin_mut!(events);

        while let Some(event) = events.next().await {
            match event {
                Ok(StreamEvent::Connected) => info!(endpoint = %self.endpoint, "Stream connected"),
                Ok(StreamEvent::Frame(payload)) => on_frame(&payload),
                Ok(StreamEvent::Closed(reason)) => {
                    warn!(endpoint = %self.endpoint, ?reason, "Stream closed by server");
                }
                Err(e) => {
                    error!(endpoint = %self.endpoint, error = %e, "Stream error");
                    return Err(e);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures_util::SinkExt;
    use tokio::net::TcpListener;
    use tokio_tungstenite::{
        accept_async,
        tungstenite::protocol::{frame::coding::CloseCode, CloseFrame},
    };

    use super::*;

    /// Local websocket server sending `frames` then closing with `reason`.
    async fn serve(frames: Vec<&'static str>, reason: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut socket = accept_async(tcp).await.unwrap();
            for frame in frames {
                socket.send(Message::Text(frame.into())).await.unwrap();
            }
            socket.send(Message::Binary(vec![1u8, 2, 3].into())).await.unwrap();
            socket
                .close(Some(CloseFrame {
                    code: CloseCode::Normal,
                    reason: reason.into(),
                }))
                .await
                .unwrap();
            // Drain until the client acknowledges the close.
            while let Some(Ok(_)) = socket.next().await {}
        });

        format!("ws://{address}")
    }

    #[tokio::test]
    async fn test_events_in_order() {
        let endpoint = serve(vec!["{\"bid\":1}", "{\"bid\":2}"], "bye").await;
        let listener = StreamListener::new(endpoint);

        let events: Vec<StreamEvent> = listener
            .events()
            .map(|event| event.unwrap())
            .collect()
            .await;

        assert_eq!(
            events,
            vec![
                StreamEvent::Connected,
                StreamEvent::Frame("{\"bid\":1}".to_string()),
                StreamEvent::Frame("{\"bid\":2}".to_string()),
                StreamEvent::Closed(Some("bye".to_string())),
            ]
        );
    }

    #[tokio::test]
    async fn test_listen_with_collects_payloads() {
        let endpoint = serve(vec!["a", "b", "c"], "").await;
        let listener = StreamListener::new(endpoint);

        let mut payloads = Vec::new();
        listener
            .listen_with(|payload| payloads.push(payload.to_string()))
            .await
            .unwrap();

        assert_eq!(payloads, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_connection_failure_ends_listen() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        drop(listener);

        let listener = StreamListener::new(format!("ws://{address}"));
        assert!(matches!(listener.listen().await, Err(ClientError::Stream(_))));
    }

    #[tokio::test]
    async fn test_cancellation_stops_listening() {
        let server = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = server.local_addr().unwrap();
        tokio::spawn(async move {
            let (tcp, _) = server.accept().await.unwrap();
            let mut socket = accept_async(tcp).await.unwrap();
            socket.send(Message::Text("hello".into())).await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let cancel = CancellationToken::new();
        let listener =
            StreamListener::new(format!("ws://{address}")).with_cancellation(cancel.clone());

        let mut payloads = Vec::new();
        let listening = listener.listen_with(|payload| {
            payloads.push(payload.to_string());
            cancel.cancel();
        });
        tokio::time::timeout(Duration::from_secs(5), listening)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(payloads, vec!["hello"]);
    }
}
