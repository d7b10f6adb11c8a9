use chrono::Utc;
use serde::Serialize;
use tracing::info;

use crate::db::{ChatMessage, ConversationSummary};
use crate::domain::MessageSender;

use super::{required_text, HotelCore, HotelResult};

const MAX_BODY_CHARS: usize = 2000;

#[derive(Debug, Clone, Serialize)]
pub struct Reply {
    pub message: ChatMessage,
    pub message_count: i64,
}

impl HotelCore {
    pub async fn post_customer_message(
        &self,
        customer_id: i64,
        body: &str,
    ) -> HotelResult<ChatMessage> {
        let body = required_text("body", body, MAX_BODY_CHARS)?;
        self.customer(customer_id).await?;
        let mut message = ChatMessage {
            id: 0,
            customer_id,
            sender: MessageSender::Customer,
            staff_user_id: None,
            body,
            is_read: false,
            created_at: Utc::now(),
        };
        message.id = self.db().chat_store().insert_message(&message).await?;
        info!(customer_id, message_id = message.id, "customer chat message");
        Ok(message)
    }

    pub async fn reply(&self, staff_id: i64, customer_id: i64, body: &str) -> HotelResult<Reply> {
        let body = required_text("body", body, MAX_BODY_CHARS)?;
        self.customer(customer_id).await?;
        let mut message = ChatMessage {
            id: 0,
            customer_id,
            sender: MessageSender::Staff,
            staff_user_id: Some(staff_id),
            body,
            is_read: true,
            created_at: Utc::now(),
        };
        let (id, message_count) = self.db().chat_store().insert_reply(&message).await?;
        message.id = id;
        info!(customer_id, staff_id, message_id = id, "staff chat reply");
        Ok(Reply {
            message,
            message_count,
        })
    }

    pub async fn messages(
        &self,
        customer_id: i64,
        after_id: Option<i64>,
        limit: Option<i64>,
    ) -> HotelResult<Vec<ChatMessage>> {
        let page = self.settings().chat_page_size;
        let limit = limit.unwrap_or(page).clamp(1, page);
        Ok(self
            .db()
            .chat_store()
            .list_messages(customer_id, after_id, limit)
            .await?)
    }

    pub async fn mark_conversation_read(&self, customer_id: i64) -> HotelResult<usize> {
        Ok(self.db().chat_store().mark_read(customer_id).await?)
    }

    pub async fn conversations(&self) -> HotelResult<Vec<ConversationSummary>> {
        Ok(self.db().chat_store().list_conversations().await?)
    }
}
