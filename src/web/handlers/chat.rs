use salvo::prelude::*;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::db::{ChatMessage, ConversationSummary};
use crate::domain::Permission;
use crate::web::metrics::Metrics;
use crate::web::{context, ApiError};

use super::{json_body, path_id, query_value};

#[derive(Debug, Deserialize)]
struct MessageBody {
    body: String,
}

#[handler]
pub async fn conversations(depot: &mut Depot) -> Result<Json<Vec<ConversationSummary>>, ApiError> {
    let (core, principal) = context(depot)?;
    principal.require(Permission::HandleChat)?;
    Ok(Json(core.conversations().await?))
}

/// Polled by both sides; `after` returns only messages newer than that id.
#[handler]
pub async fn messages(
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    let (core, principal) = context(depot)?;
    let customer_id = path_id(req, "customer_id")?;
    principal.authorize_customer(customer_id, Permission::HandleChat)?;
    let after = query_value::<i64>(req, "after")?;
    let limit = query_value::<i64>(req, "limit")?;
    Ok(Json(core.messages(customer_id, after, limit).await?))
}

/// Customers post into their own conversation; staff posts are replies.
#[handler]
pub async fn post_message(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> Result<Json<Value>, ApiError> {
    let (core, principal) = context(depot)?;
    let customer_id = path_id(req, "customer_id")?;
    principal.authorize_customer(customer_id, Permission::HandleChat)?;
    let body: MessageBody = json_body(req).await?;

    let payload = if principal.is_customer() {
        let message = core.post_customer_message(customer_id, &body.body).await?;
        json!({ "message": message })
    } else {
        let reply = core.reply(principal.user_id, customer_id, &body.body).await?;
        json!({ "message": reply.message, "message_count": reply.message_count })
    };
    Metrics::chat_message();
    res.status_code(StatusCode::CREATED);
    Ok(Json(payload))
}

#[handler]
pub async fn mark_read(req: &mut Request, depot: &mut Depot) -> Result<Json<Value>, ApiError> {
    let (core, principal) = context(depot)?;
    principal.require(Permission::HandleChat)?;
    let customer_id = path_id(req, "customer_id")?;
    let marked = core.mark_conversation_read(customer_id).await?;
    Ok(Json(json!({ "customer_id": customer_id, "marked_read": marked })))
}
