//! Message transport
//!
//! A transport yields inbound messages and delivers replies. [`run`] pumps
//! one into the [`CommandRouter`] until shutdown.

use crate::commands::CommandRouter;
use crate::models::InboundMessage;
use crate::Result;
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tracing::{error, info, warn};

pub mod telegram;

pub use telegram::TelegramTransport;

const RECEIVE_BACKOFF: Duration = Duration::from_secs(5);

#[async_trait]
pub trait Transport: Send + Sync {
    /// Wait for the next batch of inbound messages (may be empty).
    async fn receive(&self) -> Result<Vec<InboundMessage>>;

    async fn send(&self, chat_id: i64, text: &str) -> Result<()>;
}

/// Process messages in arrival order until `shutdown` resolves.
pub async fn run<T, F>(transport: &T, router: &CommandRouter, shutdown: F) -> Result<()>
where
    T: Transport + ?Sized,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    info!("Transport loop started");

    loop {
        let batch = tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown requested, leaving transport loop");
                return Ok(());
            }
            batch = transport.receive() => batch,
        };

        let messages = match batch {
            Ok(messages) => messages,
            Err(e) => {
                warn!("Receiving messages failed, retrying in {:?}: {}", RECEIVE_BACKOFF, e);
                tokio::time::sleep(RECEIVE_BACKOFF).await;
                continue;
            }
        };

        for message in messages {
            process(transport, router, &message).await;
        }
    }
}

/// Route one message and deliver its reply, if any.
pub async fn process<T>(transport: &T, router: &CommandRouter, message: &InboundMessage)
where
    T: Transport + ?Sized,
{
    let Some(reply) = router.route(message).await else {
        return;
    };

    if let Err(e) = transport.send(message.chat_id, &reply.text).await {
        error!(user = %message.user_id, kind = ?reply.kind, "Failed to deliver reply: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::Dispatcher;
    use crate::gemini::Generator;
    use crate::models::{GenerationOutcome, UserId};
    use crate::store::InMemoryRecordStore;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    struct Canned;

    #[async_trait]
    impl Generator for Canned {
        async fn complete(&self, _prompt: &str) -> GenerationOutcome {
            GenerationOutcome::Delivered("respuesta".to_string())
        }
    }

    /// Transport replaying a fixed script, then idling.
    struct ScriptedTransport {
        inbox: Mutex<VecDeque<Vec<InboundMessage>>>,
        sent: Mutex<Vec<(i64, String)>>,
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn receive(&self) -> Result<Vec<InboundMessage>> {
            match self.inbox.lock().await.pop_front() {
                Some(batch) => Ok(batch),
                None => {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    Ok(Vec::new())
                }
            }
        }

        async fn send(&self, chat_id: i64, text: &str) -> Result<()> {
            self.sent.lock().await.push((chat_id, text.to_string()));
            Ok(())
        }
    }

    fn msg(text: Option<&str>) -> InboundMessage {
        InboundMessage::direct(UserId(3), "Eva", text.map(str::to_string))
    }

    #[tokio::test]
    async fn test_run_replies_once_per_text_message() {
        let store = Arc::new(InMemoryRecordStore::new());
        let dispatcher = Arc::new(Dispatcher::new(store.clone(), Arc::new(Canned)));
        let router = CommandRouter::new(store, dispatcher);

        let transport = ScriptedTransport {
            inbox: Mutex::new(VecDeque::from(vec![
                vec![msg(Some("/start")), msg(None)],
                vec![msg(Some("hola"))],
            ])),
            sent: Mutex::new(Vec::new()),
        };

        let shutdown = tokio::time::sleep(Duration::from_millis(200));
        run(&transport, &router, shutdown).await.unwrap();

        let sent = transport.sent.lock().await;
        assert_eq!(sent.len(), 2);
        assert!(sent[0].1.contains("¡Hola Eva!"));
        assert_eq!(sent[1], (3, "respuesta".to_string()));
    }

    #[tokio::test]
    async fn test_reply_goes_to_originating_chat() {
        let store = Arc::new(InMemoryRecordStore::new());
        let dispatcher = Arc::new(Dispatcher::new(store.clone(), Arc::new(Canned)));
        let router = CommandRouter::new(store, dispatcher);
        let transport = ScriptedTransport {
            inbox: Mutex::new(VecDeque::new()),
            sent: Mutex::new(Vec::new()),
        };

        let mut message = msg(Some("hola"));
        message.chat_id = -100200300;
        process(&transport, &router, &message).await;

        let sent = transport.sent.lock().await;
        assert_eq!(sent.as_slice(), &[(-100200300, "respuesta".to_string())]);
    }
}
