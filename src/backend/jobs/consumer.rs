/**
 * Queue Consumer
 *
 * Materializes queued AutoMessages as real messages. For each delivery:
 *
 * 1. Skip (and acknowledge) if the AutoMessage is already sent
 * 2. Find or create the two-party conversation
 * 3. Find or create the message sourced from this AutoMessage
 * 4. Point the conversation at the message
 * 5. Push `message_received` to the receiver if they are online
 * 6. Latch `is_sent`, then acknowledge
 *
 * Any failure negatively acknowledges the delivery so it comes back later.
 * Steps 2 and 3 look before they write, so a redelivered item never
 * produces a second conversation or message.
 */

use std::time::Duration;
use uuid::Uuid;

use crate::backend::error::BackendError;
use crate::backend::queue::Delivery;
use crate::backend::realtime::Channel;
use crate::backend::server::state::AppState;
use crate::shared::event::RealtimeEvent;
use crate::shared::messaging::{ChatMessage, Conversation, QueueItem};

/// What processing a queue item did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
    Delivered {
        conversation_id: Uuid,
        message_id: Uuid,
        receiver_online: bool,
    },
    AlreadySent,
    MissingAutoMessage,
}

pub struct Consumer {
    state: AppState,
    backoff: Duration,
}

impl Consumer {
    pub fn new(state: AppState) -> Self {
        let backoff = state.config.consumer_backoff();
        Self { state, backoff }
    }

    /// Apply one queue item to the store and notify the receiver
    pub async fn process(&self, item: &QueueItem) -> Result<ConsumeOutcome, BackendError> {
        let store = &self.state.store;

        let Some(auto_message) = store.find_auto_message(item.auto_message_id).await? else {
            tracing::warn!("[Jobs] Queue item for unknown auto-message {}", item.auto_message_id);
            return Ok(ConsumeOutcome::MissingAutoMessage);
        };
        if auto_message.is_sent {
            tracing::debug!("[Jobs] Auto-message {} already sent", auto_message.id);
            return Ok(ConsumeOutcome::AlreadySent);
        }

        let conversation = match store.find_direct_conversation(item.sender, item.receiver).await? {
            Some(conversation) => conversation,
            None => {
                store
                    .create_conversation(Conversation::new(vec![item.sender, item.receiver]))
                    .await?
            }
        };

        let message = match store.find_message_by_source(auto_message.id).await? {
            Some(message) => message,
            None => {
                let message = ChatMessage::new(conversation.id, item.sender, item.content.clone())
                    .from_auto_message(auto_message.id);
                store.create_message(message).await?
            }
        };
        store.set_last_message(conversation.id, message.id).await?;

        let receiver_online = self.state.presence.is_online(item.receiver).await?;
        if receiver_online {
            let view = store
                .find_message_view(message.id)
                .await?
                .ok_or_else(|| BackendError::not_found("Message not found"))?;
            self.state.hub.emit_to(
                Channel::User(item.receiver),
                &RealtimeEvent::MessageReceived {
                    conversation_id: conversation.id,
                    message: view,
                },
                None,
            );
        }

        store.mark_sent(auto_message.id).await?;
        tracing::info!(
            "[Jobs] Delivered auto-message {} as message {} (receiver online: {})",
            auto_message.id,
            message.id,
            receiver_online
        );
        Ok(ConsumeOutcome::Delivered {
            conversation_id: conversation.id,
            message_id: message.id,
            receiver_online,
        })
    }

    /// Process a delivery and settle it with the queue
    pub async fn handle(&self, delivery: Delivery) -> Result<ConsumeOutcome, BackendError> {
        match self.process(&delivery.item).await {
            Ok(outcome) => {
                self.state.queue.ack(delivery.tag).await?;
                Ok(outcome)
            }
            Err(err) => {
                tracing::warn!(
                    "[Jobs] Delivery {} failed on attempt {}: {}",
                    delivery.tag,
                    delivery.attempts,
                    err
                );
                if let Err(nack_err) = self.state.queue.nack(delivery.tag).await {
                    tracing::error!("[Jobs] Failed to return delivery {}: {}", delivery.tag, nack_err);
                }
                Err(err)
            }
        }
    }

    /// Receive and handle deliveries until the task is aborted
    pub async fn run(self) {
        tracing::info!("[Jobs] Queue consumer started");
        loop {
            let delivery = match self.state.queue.receive().await {
                Ok(delivery) => delivery,
                Err(err) => {
                    tracing::warn!("[Jobs] Queue receive failed: {}", err);
                    tokio::time::sleep(self.backoff).await;
                    continue;
                }
            };
            if self.handle(delivery).await.is_err() {
                tokio::time::sleep(self.backoff).await;
            }
        }
    }
}
