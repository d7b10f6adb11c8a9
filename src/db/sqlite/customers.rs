use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::db::manager::Pool;
use crate::db::models::Customer;
use crate::db::schema::customers;
use crate::db::{CustomerStore, DatabaseError};

use super::{last_insert_id, with_connection};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = customers)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
struct DbCustomer {
    id: i64,
    user_id: Option<i64>,
    full_name: String,
    email: String,
    phone: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<DbCustomer> for Customer {
    fn from(value: DbCustomer) -> Self {
        Self {
            id: value.id,
            user_id: value.user_id,
            full_name: value.full_name,
            email: value.email,
            phone: value.phone,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = customers)]
struct NewCustomer<'a> {
    user_id: Option<i64>,
    full_name: &'a str,
    email: &'a str,
    phone: Option<&'a str>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(AsChangeset)]
#[diesel(table_name = customers)]
#[diesel(treat_none_as_null = true)]
struct UpdateCustomer<'a> {
    user_id: Option<i64>,
    full_name: &'a str,
    email: &'a str,
    phone: Option<&'a str>,
    updated_at: DateTime<Utc>,
}

pub struct SqliteCustomerStore {
    pool: Pool,
}

impl SqliteCustomerStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CustomerStore for SqliteCustomerStore {
    async fn create_customer(&self, customer: &Customer) -> Result<i64, DatabaseError> {
        let customer = customer.clone();
        with_connection(self.pool.clone(), move |conn| {
            diesel::insert_into(customers::table)
                .values(&NewCustomer {
                    user_id: customer.user_id,
                    full_name: &customer.full_name,
                    email: &customer.email,
                    phone: customer.phone.as_deref(),
                    created_at: customer.created_at,
                    updated_at: customer.updated_at,
                })
                .execute(conn)?;
            last_insert_id(conn)
        })
        .await
    }

    async fn update_customer(&self, customer: &Customer) -> Result<(), DatabaseError> {
        let customer = customer.clone();
        with_connection(self.pool.clone(), move |conn| {
            diesel::update(customers::table.find(customer.id))
                .set(&UpdateCustomer {
                    user_id: customer.user_id,
                    full_name: &customer.full_name,
                    email: &customer.email,
                    phone: customer.phone.as_deref(),
                    updated_at: Utc::now(),
                })
                .execute(conn)?;
            Ok(())
        })
        .await
    }

    async fn get_customer(&self, id: i64) -> Result<Option<Customer>, DatabaseError> {
        with_connection(self.pool.clone(), move |conn| {
            Ok(customers::table
                .find(id)
                .select(DbCustomer::as_select())
                .first(conn)
                .optional()?
                .map(Into::into))
        })
        .await
    }

    async fn get_customer_by_user(&self, user_id: i64) -> Result<Option<Customer>, DatabaseError> {
        with_connection(self.pool.clone(), move |conn| {
            Ok(customers::table
                .filter(customers::user_id.eq(user_id))
                .select(DbCustomer::as_select())
                .first(conn)
                .optional()?
                .map(Into::into))
        })
        .await
    }

    async fn list_customers(
        &self,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Customer>, DatabaseError> {
        let pattern = search.map(|term| format!("%{}%", term.trim()));
        with_connection(self.pool.clone(), move |conn| {
            let mut query = customers::table.into_boxed();
            if let Some(pattern) = pattern {
                query = query.filter(
                    customers::full_name
                        .like(pattern.clone())
                        .or(customers::email.like(pattern)),
                );
            }
            Ok(query
                .order(customers::full_name.asc())
                .limit(limit)
                .offset(offset)
                .select(DbCustomer::as_select())
                .load(conn)?
                .into_iter()
                .map(Into::into)
                .collect())
        })
        .await
    }
}
