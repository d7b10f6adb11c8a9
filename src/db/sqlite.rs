use diesel::prelude::*;
use diesel::sql_types::BigInt;
use diesel::sqlite::SqliteConnection;

use crate::db::manager::Pool;

use super::DatabaseError;

mod bookings;
mod chat;
mod complaints;
mod customers;
mod payments;
mod rooms;
mod travel;
mod users;

pub use self::bookings::SqliteBookingStore;
pub use self::chat::SqliteChatStore;
pub use self::complaints::SqliteComplaintStore;
pub use self::customers::SqliteCustomerStore;
pub use self::payments::SqlitePaymentStore;
pub use self::rooms::SqliteRoomStore;
pub use self::travel::SqliteTravelStore;
pub use self::users::SqliteUserStore;

async fn with_connection<T, F>(pool: Pool, operation: F) -> Result<T, DatabaseError>
where
    T: Send + 'static,
    F: FnOnce(&mut SqliteConnection) -> Result<T, DatabaseError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut conn = pool
            .get()
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;
        operation(&mut conn)
    })
    .await
    .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
}

// SQLite has no RETURNING before 3.35; the rowid of the last insert on this
// connection is what we hand back to callers.
fn last_insert_id(conn: &mut SqliteConnection) -> Result<i64, DatabaseError> {
    diesel::select(diesel::dsl::sql::<BigInt>("last_insert_rowid()"))
        .get_result::<i64>(conn)
        .map_err(DatabaseError::from)
}

fn status_strings<S: Copy>(statuses: &[S], as_str: fn(&S) -> &'static str) -> Vec<&'static str> {
    statuses.iter().map(as_str).collect()
}
