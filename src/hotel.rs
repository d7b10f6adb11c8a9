use std::sync::Arc;

use chrono::{Local, NaiveDate};

use crate::config::{Config, HotelConfig};
use crate::db::DatabaseManager;

pub mod auth;
pub mod chat;
pub mod complaints;
pub mod customers;
pub mod dashboard;
pub mod error;
pub mod front_desk;
pub mod payments;
pub mod reservations;
pub mod rooms;
pub mod travel;
pub mod users;

pub use self::auth::Principal;
pub use self::error::HotelError;

pub type HotelResult<T> = Result<T, HotelError>;

/// Application core shared by every HTTP handler and CLI command.
#[derive(Clone)]
pub struct HotelCore {
    db: Arc<DatabaseManager>,
    config: Arc<Config>,
}

impl HotelCore {
    pub fn new(db: Arc<DatabaseManager>, config: Arc<Config>) -> Self {
        Self { db, config }
    }

    pub fn db(&self) -> &DatabaseManager {
        &self.db
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn settings(&self) -> &HotelConfig {
        &self.config.hotel
    }

    /// Business date in the server's local timezone.
    pub fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

pub(crate) fn not_found(entity: &'static str, id: i64) -> HotelError {
    HotelError::NotFound { entity, id }
}

/// Trims `value` and rejects it when empty or longer than `max` characters.
pub(crate) fn required_text(field: &str, value: &str, max: usize) -> HotelResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(HotelError::Validation(format!("{field} is required")));
    }
    if trimmed.chars().count() > max {
        return Err(HotelError::Validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(trimmed.to_string())
}
