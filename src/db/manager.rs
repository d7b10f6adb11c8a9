use std::sync::Arc;
use std::time::Duration;

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager, CustomizeConnection};
use diesel::sqlite::SqliteConnection;
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::db::sqlite::{
    SqliteBookingStore, SqliteChatStore, SqliteComplaintStore, SqliteCustomerStore,
    SqlitePaymentStore, SqliteRoomStore, SqliteTravelStore, SqliteUserStore,
};
use crate::db::{
    BookingStore, ChatStore, ComplaintStore, CustomerStore, DatabaseError, PaymentStore,
    RoomStore, TravelStore, UserStore,
};
use crate::domain::Role;

pub type Pool = r2d2::Pool<ConnectionManager<SqliteConnection>>;

#[derive(Debug)]
struct ConnectionOptions {
    busy_timeout_ms: u64,
}

impl CustomizeConnection<SqliteConnection, r2d2::Error> for ConnectionOptions {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), r2d2::Error> {
        conn.batch_execute(&format!(
            "PRAGMA foreign_keys = ON; PRAGMA busy_timeout = {}; PRAGMA journal_mode = WAL;",
            self.busy_timeout_ms
        ))
        .map_err(r2d2::Error::QueryError)
    }
}

#[derive(Clone)]
pub struct DatabaseManager {
    pool: Pool,
    room_store: Arc<dyn RoomStore>,
    customer_store: Arc<dyn CustomerStore>,
    booking_store: Arc<dyn BookingStore>,
    chat_store: Arc<dyn ChatStore>,
    complaint_store: Arc<dyn ComplaintStore>,
    travel_store: Arc<dyn TravelStore>,
    payment_store: Arc<dyn PaymentStore>,
    user_store: Arc<dyn UserStore>,
}

impl DatabaseManager {
    pub async fn new(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let path = config.sqlite_path().ok_or_else(|| {
            DatabaseError::Connection(format!(
                "unsupported database url {:?}",
                config.connection_string()
            ))
        })?;

        let manager = ConnectionManager::<SqliteConnection>::new(path.clone());
        let max_connections = config.max_connections();
        let busy_timeout_ms = config.busy_timeout_ms;

        let pool = tokio::task::spawn_blocking(move || {
            r2d2::Pool::builder()
                .max_size(max_connections)
                .connection_timeout(Duration::from_millis(busy_timeout_ms.max(1000)))
                .connection_customizer(Box::new(ConnectionOptions { busy_timeout_ms }))
                .build(manager)
        })
        .await
        .map_err(|e| DatabaseError::Connection(format!("pool task failed: {e}")))?
        .map_err(|e| DatabaseError::Connection(e.to_string()))?;

        info!(path = %path, max_connections, "sqlite pool ready");

        Ok(Self {
            room_store: Arc::new(SqliteRoomStore::new(pool.clone())),
            customer_store: Arc::new(SqliteCustomerStore::new(pool.clone())),
            booking_store: Arc::new(SqliteBookingStore::new(pool.clone())),
            chat_store: Arc::new(SqliteChatStore::new(pool.clone())),
            complaint_store: Arc::new(SqliteComplaintStore::new(pool.clone())),
            travel_store: Arc::new(SqliteTravelStore::new(pool.clone())),
            payment_store: Arc::new(SqlitePaymentStore::new(pool.clone())),
            user_store: Arc::new(SqliteUserStore::new(pool.clone())),
            pool,
        })
    }

    pub async fn migrate(&self) -> Result<(), DatabaseError> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|e| DatabaseError::Connection(e.to_string()))?;

            for statement in SCHEMA {
                diesel::sql_query(*statement)
                    .execute(&mut conn)
                    .map_err(|e| DatabaseError::Migration(e.to_string()))?;
            }

            let mut seeded = 0;
            for role in Role::ALL {
                for permission in role.default_permissions() {
                    seeded += diesel::sql_query(
                        "INSERT OR IGNORE INTO role_permissions (role, permission) \
                         SELECT ?, ? WHERE NOT EXISTS \
                         (SELECT 1 FROM role_permissions_seeded WHERE role = ?)",
                    )
                    .bind::<diesel::sql_types::Text, _>(role.as_str())
                    .bind::<diesel::sql_types::Text, _>(permission.as_str())
                    .bind::<diesel::sql_types::Text, _>(role.as_str())
                    .execute(&mut conn)
                    .map_err(|e| DatabaseError::Migration(e.to_string()))?;
                }
                diesel::sql_query("INSERT OR IGNORE INTO role_permissions_seeded (role) VALUES (?)")
                    .bind::<diesel::sql_types::Text, _>(role.as_str())
                    .execute(&mut conn)
                    .map_err(|e| DatabaseError::Migration(e.to_string()))?;
            }
            debug!(seeded, "role defaults applied");

            Ok(())
        })
        .await
        .map_err(|e| DatabaseError::Migration(format!("migration task failed: {e}")))?
    }

    pub fn room_store(&self) -> Arc<dyn RoomStore> {
        self.room_store.clone()
    }

    pub fn customer_store(&self) -> Arc<dyn CustomerStore> {
        self.customer_store.clone()
    }

    pub fn booking_store(&self) -> Arc<dyn BookingStore> {
        self.booking_store.clone()
    }

    pub fn chat_store(&self) -> Arc<dyn ChatStore> {
        self.chat_store.clone()
    }

    pub fn complaint_store(&self) -> Arc<dyn ComplaintStore> {
        self.complaint_store.clone()
    }

    pub fn travel_store(&self) -> Arc<dyn TravelStore> {
        self.travel_store.clone()
    }

    pub fn payment_store(&self) -> Arc<dyn PaymentStore> {
        self.payment_store.clone()
    }

    pub fn user_store(&self) -> Arc<dyn UserStore> {
        self.user_store.clone()
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }
}

// Role defaults are seeded once per role; `role_permissions_seeded`
// remembers which roles were seeded so an admin's later edits survive.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS room_types (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        description TEXT NOT NULL DEFAULT '',
        base_price_cents INTEGER NOT NULL CHECK (base_price_cents > 0),
        capacity INTEGER NOT NULL CHECK (capacity >= 1),
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS rooms (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        number TEXT NOT NULL UNIQUE,
        room_type_id INTEGER NOT NULL REFERENCES room_types(id),
        floor INTEGER NOT NULL DEFAULT 0,
        status TEXT NOT NULL DEFAULT 'available',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS amenities (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        room_type_id INTEGER REFERENCES room_types(id) ON DELETE CASCADE,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        display_name TEXT NOT NULL,
        email TEXT NOT NULL,
        role TEXT NOT NULL,
        active INTEGER NOT NULL DEFAULT 1,
        api_token TEXT NOT NULL UNIQUE,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS customers (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER UNIQUE REFERENCES users(id) ON DELETE SET NULL,
        full_name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        phone TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS bookings (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        customer_id INTEGER NOT NULL REFERENCES customers(id),
        room_id INTEGER NOT NULL REFERENCES rooms(id),
        check_in_date TEXT NOT NULL,
        check_out_date TEXT NOT NULL,
        guests INTEGER NOT NULL,
        total_price_cents INTEGER NOT NULL,
        status TEXT NOT NULL,
        special_requests TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        CHECK (check_in_date < check_out_date)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS stays (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        booking_id INTEGER NOT NULL UNIQUE REFERENCES bookings(id) ON DELETE CASCADE,
        check_in_time TEXT,
        check_out_time TEXT,
        checked_in_by INTEGER,
        checked_out_by INTEGER,
        additional_charges_cents INTEGER NOT NULL DEFAULT 0,
        charge_notes TEXT NOT NULL DEFAULT '',
        late_fee_cents INTEGER NOT NULL DEFAULT 0,
        final_total_cents INTEGER,
        notes TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS chat_messages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        customer_id INTEGER NOT NULL REFERENCES customers(id) ON DELETE CASCADE,
        sender TEXT NOT NULL,
        staff_user_id INTEGER,
        body TEXT NOT NULL,
        is_read INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS complaints (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        customer_id INTEGER NOT NULL REFERENCES customers(id),
        booking_id INTEGER REFERENCES bookings(id),
        subject TEXT NOT NULL,
        description TEXT NOT NULL,
        status TEXT NOT NULL,
        resolution TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS travel_packages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        destination TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        price_per_person_cents INTEGER NOT NULL,
        duration_days INTEGER NOT NULL,
        capacity INTEGER NOT NULL,
        active INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS travel_bookings (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        package_id INTEGER NOT NULL REFERENCES travel_packages(id),
        customer_id INTEGER NOT NULL REFERENCES customers(id),
        travel_date TEXT NOT NULL,
        people INTEGER NOT NULL,
        total_cents INTEGER NOT NULL,
        status TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS payments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        customer_id INTEGER NOT NULL REFERENCES customers(id),
        booking_id INTEGER REFERENCES bookings(id),
        travel_booking_id INTEGER REFERENCES travel_bookings(id),
        amount_cents INTEGER NOT NULL CHECK (amount_cents > 0),
        method TEXT NOT NULL,
        status TEXT NOT NULL,
        reference TEXT NOT NULL UNIQUE,
        refund_reason TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS role_permissions (
        role TEXT NOT NULL,
        permission TEXT NOT NULL,
        PRIMARY KEY (role, permission)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS role_permissions_seeded (
        role TEXT PRIMARY KEY
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS permission_overrides (
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        permission TEXT NOT NULL,
        granted INTEGER NOT NULL,
        updated_at TEXT NOT NULL,
        PRIMARY KEY (user_id, permission)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_rooms_room_type ON rooms(room_type_id)",
    "CREATE INDEX IF NOT EXISTS idx_bookings_room_dates ON bookings(room_id, check_in_date, check_out_date)",
    "CREATE INDEX IF NOT EXISTS idx_bookings_customer ON bookings(customer_id)",
    "CREATE INDEX IF NOT EXISTS idx_bookings_status ON bookings(status)",
    "CREATE INDEX IF NOT EXISTS idx_chat_messages_customer ON chat_messages(customer_id, id)",
    "CREATE INDEX IF NOT EXISTS idx_complaints_status ON complaints(status)",
    "CREATE INDEX IF NOT EXISTS idx_travel_bookings_package_date ON travel_bookings(package_id, travel_date)",
    "CREATE INDEX IF NOT EXISTS idx_payments_customer ON payments(customer_id)",
    "CREATE INDEX IF NOT EXISTS idx_payments_booking ON payments(booking_id)",
    "CREATE INDEX IF NOT EXISTS idx_payments_created ON payments(created_at)",
];

#[cfg(test)]
mod tests {
    use tempfile::NamedTempFile;

    use super::DatabaseManager;
    use crate::config::DatabaseConfig;
    use crate::domain::{Permission, Role};

    #[tokio::test]
    async fn migrate_is_idempotent_and_keeps_role_edits() {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let config = DatabaseConfig::for_sqlite_file(file.path().to_string_lossy());

        let manager = DatabaseManager::new(&config).await.expect("db manager");
        manager.migrate().await.expect("first migrate");

        let users = manager.user_store();
        let receptionist = users
            .role_permissions(Role::Receptionist)
            .await
            .expect("role permissions");
        assert!(receptionist.contains(&Permission::CheckInOut));

        let trimmed = [Permission::ViewDashboard].into_iter().collect();
        users
            .replace_role_permissions(Role::Receptionist, &trimmed)
            .await
            .expect("replace");

        let reopened = DatabaseManager::new(&config).await.expect("db manager reopened");
        reopened.migrate().await.expect("second migrate");

        let after = reopened
            .user_store()
            .role_permissions(Role::Receptionist)
            .await
            .expect("role permissions after reopen");
        assert_eq!(after, trimmed);
    }
}
