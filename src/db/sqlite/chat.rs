use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Text, TimestamptzSqlite};

use crate::db::manager::Pool;
use crate::db::models::{ChatMessage, ConversationSummary};
use crate::db::schema::chat_messages;
use crate::db::{ChatStore, DatabaseError};
use crate::domain::MessageSender;

use super::{last_insert_id, with_connection};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = chat_messages)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
struct DbChatMessage {
    id: i64,
    customer_id: i64,
    sender: String,
    staff_user_id: Option<i64>,
    body: String,
    is_read: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<DbChatMessage> for ChatMessage {
    type Error = DatabaseError;

    fn try_from(value: DbChatMessage) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.id,
            customer_id: value.customer_id,
            sender: value.sender.parse()?,
            staff_user_id: value.staff_user_id,
            body: value.body,
            is_read: value.is_read,
            created_at: value.created_at,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = chat_messages)]
struct NewChatMessage<'a> {
    customer_id: i64,
    sender: &'a str,
    staff_user_id: Option<i64>,
    body: &'a str,
    is_read: bool,
    created_at: DateTime<Utc>,
}

impl<'a> From<&'a ChatMessage> for NewChatMessage<'a> {
    fn from(message: &'a ChatMessage) -> Self {
        Self {
            customer_id: message.customer_id,
            sender: message.sender.as_str(),
            staff_user_id: message.staff_user_id,
            body: &message.body,
            is_read: message.is_read,
            created_at: message.created_at,
        }
    }
}

#[derive(QueryableByName)]
struct ConversationRow {
    #[diesel(sql_type = BigInt)]
    customer_id: i64,
    #[diesel(sql_type = Text)]
    customer_name: String,
    #[diesel(sql_type = Text)]
    last_message: String,
    #[diesel(sql_type = Text)]
    last_sender: String,
    #[diesel(sql_type = TimestamptzSqlite)]
    last_message_at: DateTime<Utc>,
    #[diesel(sql_type = BigInt)]
    message_count: i64,
    #[diesel(sql_type = BigInt)]
    unread_count: i64,
}

const CONVERSATIONS_QUERY: &str = "\
    SELECT c.id AS customer_id, \
           c.full_name AS customer_name, \
           m.body AS last_message, \
           m.sender AS last_sender, \
           m.created_at AS last_message_at, \
           (SELECT COUNT(*) FROM chat_messages a WHERE a.customer_id = c.id) AS message_count, \
           (SELECT COUNT(*) FROM chat_messages u \
             WHERE u.customer_id = c.id AND u.sender = 'customer' AND u.is_read = 0) AS unread_count \
      FROM customers c \
      JOIN chat_messages m \
        ON m.id = (SELECT MAX(id) FROM chat_messages l WHERE l.customer_id = c.id) \
     ORDER BY m.id DESC";

fn mark_customer_messages_read(
    conn: &mut SqliteConnection,
    customer_id: i64,
) -> Result<usize, DatabaseError> {
    Ok(diesel::update(
        chat_messages::table
            .filter(chat_messages::customer_id.eq(customer_id))
            .filter(chat_messages::sender.eq(MessageSender::Customer.as_str()))
            .filter(chat_messages::is_read.eq(false)),
    )
    .set(chat_messages::is_read.eq(true))
    .execute(conn)?)
}

pub struct SqliteChatStore {
    pool: Pool,
}

impl SqliteChatStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChatStore for SqliteChatStore {
    async fn insert_message(&self, message: &ChatMessage) -> Result<i64, DatabaseError> {
        let message = message.clone();
        with_connection(self.pool.clone(), move |conn| {
            diesel::insert_into(chat_messages::table)
                .values(&NewChatMessage::from(&message))
                .execute(conn)?;
            last_insert_id(conn)
        })
        .await
    }

    async fn insert_reply(&self, message: &ChatMessage) -> Result<(i64, i64), DatabaseError> {
        let message = message.clone();
        with_connection(self.pool.clone(), move |conn| {
            conn.immediate_transaction::<_, DatabaseError, _>(|conn| {
                mark_customer_messages_read(conn, message.customer_id)?;
                diesel::insert_into(chat_messages::table)
                    .values(&NewChatMessage::from(&message))
                    .execute(conn)?;
                let id = last_insert_id(conn)?;
                let count: i64 = chat_messages::table
                    .filter(chat_messages::customer_id.eq(message.customer_id))
                    .count()
                    .get_result(conn)?;
                Ok((id, count))
            })
        })
        .await
    }

    async fn list_messages(
        &self,
        customer_id: i64,
        after_id: Option<i64>,
        limit: i64,
    ) -> Result<Vec<ChatMessage>, DatabaseError> {
        with_connection(self.pool.clone(), move |conn| {
            let mut query = chat_messages::table
                .filter(chat_messages::customer_id.eq(customer_id))
                .into_boxed();
            if let Some(after_id) = after_id {
                query = query.filter(chat_messages::id.gt(after_id));
            }
            query
                .order(chat_messages::id.asc())
                .limit(limit)
                .select(DbChatMessage::as_select())
                .load(conn)?
                .into_iter()
                .map(ChatMessage::try_from)
                .collect()
        })
        .await
    }

    async fn mark_read(&self, customer_id: i64) -> Result<usize, DatabaseError> {
        with_connection(self.pool.clone(), move |conn| {
            mark_customer_messages_read(conn, customer_id)
        })
        .await
    }

    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>, DatabaseError> {
        with_connection(self.pool.clone(), move |conn| {
            let rows = diesel::sql_query(CONVERSATIONS_QUERY).load::<ConversationRow>(conn)?;
            rows.into_iter()
                .map(|row| {
                    Ok(ConversationSummary {
                        customer_id: row.customer_id,
                        customer_name: row.customer_name,
                        last_message: row.last_message,
                        last_sender: row.last_sender.parse()?,
                        last_message_at: row.last_message_at,
                        message_count: row.message_count,
                        unread_count: row.unread_count,
                    })
                })
                .collect()
        })
        .await
    }

    async fn count_unread(&self) -> Result<i64, DatabaseError> {
        with_connection(self.pool.clone(), move |conn| {
            Ok(chat_messages::table
                .filter(chat_messages::sender.eq(MessageSender::Customer.as_str()))
                .filter(chat_messages::is_read.eq(false))
                .count()
                .get_result(conn)?)
        })
        .await
    }
}
