use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::info;

use crate::db::Customer;
use crate::domain::Role;

use super::{not_found, required_text, HotelCore, HotelError, HotelResult};

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern compiles")
});

const MAX_PAGE: i64 = 200;

/// Trimmed, lower-cased address or a validation error.
pub(crate) fn normalize_email(value: &str) -> HotelResult<String> {
    let email = value.trim().to_lowercase();
    if email.len() > 254 || !EMAIL.is_match(&email) {
        return Err(HotelError::Validation(format!("invalid email address {value:?}")));
    }
    Ok(email)
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustomerInput {
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    /// Links a customer-role login to this record.
    #[serde(default)]
    pub user_id: Option<i64>,
}

impl CustomerInput {
    fn phone(&self) -> Option<String> {
        self.phone
            .as_deref()
            .map(str::trim)
            .filter(|phone| !phone.is_empty())
            .map(str::to_string)
    }
}

impl HotelCore {
    async fn check_customer_login(&self, user_id: Option<i64>) -> HotelResult<()> {
        let Some(user_id) = user_id else {
            return Ok(());
        };
        let user = self
            .db()
            .user_store()
            .get_user(user_id)
            .await?
            .ok_or_else(|| not_found("user", user_id))?;
        if user.role != Role::Customer {
            return Err(HotelError::Validation(format!(
                "user {user_id} is not a customer login"
            )));
        }
        Ok(())
    }

    pub async fn create_customer(&self, input: CustomerInput) -> HotelResult<Customer> {
        let full_name = required_text("full_name", &input.full_name, 120)?;
        let email = normalize_email(&input.email)?;
        self.check_customer_login(input.user_id).await?;

        let now = Utc::now();
        let mut customer = Customer {
            id: 0,
            user_id: input.user_id,
            full_name,
            email,
            phone: input.phone(),
            created_at: now,
            updated_at: now,
        };
        customer.id = self.db().customer_store().create_customer(&customer).await?;
        info!(customer_id = customer.id, "customer created");
        Ok(customer)
    }

    pub async fn update_customer(&self, id: i64, input: CustomerInput) -> HotelResult<Customer> {
        let full_name = required_text("full_name", &input.full_name, 120)?;
        let email = normalize_email(&input.email)?;
        self.check_customer_login(input.user_id).await?;

        let mut customer = self.customer(id).await?;
        customer.full_name = full_name;
        customer.email = email;
        customer.phone = input.phone();
        customer.user_id = input.user_id;
        self.db().customer_store().update_customer(&customer).await?;
        self.customer(id).await
    }

    pub async fn customer(&self, id: i64) -> HotelResult<Customer> {
        self.db()
            .customer_store()
            .get_customer(id)
            .await?
            .ok_or_else(|| not_found("customer", id))
    }

    pub async fn list_customers(
        &self,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> HotelResult<Vec<Customer>> {
        let search = search.map(str::trim).filter(|term| !term.is_empty());
        Ok(self
            .db()
            .customer_store()
            .list_customers(search, limit.clamp(1, MAX_PAGE), offset.max(0))
            .await?)
    }
}
