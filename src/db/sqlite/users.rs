use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::db::manager::Pool;
use crate::db::models::{PermissionOverride, User};
use crate::db::schema::{permission_overrides, role_permissions, users};
use crate::db::{DatabaseError, UserStore};
use crate::domain::{Permission, Role};

use super::{last_insert_id, with_connection};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
struct DbUser {
    id: i64,
    username: String,
    display_name: String,
    email: String,
    role: String,
    active: bool,
    api_token: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DbUser> for User {
    type Error = DatabaseError;

    fn try_from(value: DbUser) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.id,
            username: value.username,
            display_name: value.display_name,
            email: value.email,
            role: value.role.parse()?,
            active: value.active,
            api_token: value.api_token,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = users)]
struct NewUser<'a> {
    username: &'a str,
    display_name: &'a str,
    email: &'a str,
    role: &'a str,
    active: bool,
    api_token: &'a str,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(AsChangeset)]
#[diesel(table_name = users)]
struct UpdateUser<'a> {
    display_name: &'a str,
    email: &'a str,
    role: &'a str,
    active: bool,
    updated_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = role_permissions)]
struct RolePermissionRow<'a> {
    role: &'a str,
    permission: &'a str,
}

#[derive(Insertable)]
#[diesel(table_name = permission_overrides)]
struct OverrideRow<'a> {
    user_id: i64,
    permission: &'a str,
    granted: bool,
    updated_at: DateTime<Utc>,
}

pub struct SqliteUserStore {
    pool: Pool,
}

impl SqliteUserStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for SqliteUserStore {
    async fn create_user(&self, user: &User) -> Result<i64, DatabaseError> {
        let user = user.clone();
        with_connection(self.pool.clone(), move |conn| {
            diesel::insert_into(users::table)
                .values(&NewUser {
                    username: &user.username,
                    display_name: &user.display_name,
                    email: &user.email,
                    role: user.role.as_str(),
                    active: user.active,
                    api_token: &user.api_token,
                    created_at: user.created_at,
                    updated_at: user.updated_at,
                })
                .execute(conn)?;
            last_insert_id(conn)
        })
        .await
    }

    async fn update_user(&self, user: &User) -> Result<(), DatabaseError> {
        let user = user.clone();
        with_connection(self.pool.clone(), move |conn| {
            diesel::update(users::table.find(user.id))
                .set(&UpdateUser {
                    display_name: &user.display_name,
                    email: &user.email,
                    role: user.role.as_str(),
                    active: user.active,
                    updated_at: Utc::now(),
                })
                .execute(conn)?;
            Ok(())
        })
        .await
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>, DatabaseError> {
        with_connection(self.pool.clone(), move |conn| {
            users::table
                .find(id)
                .select(DbUser::as_select())
                .first(conn)
                .optional()?
                .map(User::try_from)
                .transpose()
        })
        .await
    }

    async fn get_user_by_token(&self, token: &str) -> Result<Option<User>, DatabaseError> {
        let token = token.to_string();
        with_connection(self.pool.clone(), move |conn| {
            users::table
                .filter(users::api_token.eq(token))
                .select(DbUser::as_select())
                .first(conn)
                .optional()?
                .map(User::try_from)
                .transpose()
        })
        .await
    }

    async fn list_users(&self, role: Option<Role>) -> Result<Vec<User>, DatabaseError> {
        with_connection(self.pool.clone(), move |conn| {
            let mut query = users::table.into_boxed();
            if let Some(role) = role {
                query = query.filter(users::role.eq(role.as_str()));
            }
            query
                .order(users::username.asc())
                .select(DbUser::as_select())
                .load(conn)?
                .into_iter()
                .map(User::try_from)
                .collect()
        })
        .await
    }

    async fn set_user_active(&self, id: i64, active: bool) -> Result<bool, DatabaseError> {
        with_connection(self.pool.clone(), move |conn| {
            let changed = diesel::update(users::table.find(id))
                .set((users::active.eq(active), users::updated_at.eq(Utc::now())))
                .execute(conn)?;
            Ok(changed == 1)
        })
        .await
    }

    async fn set_user_token(&self, id: i64, token: &str) -> Result<bool, DatabaseError> {
        let token = token.to_string();
        with_connection(self.pool.clone(), move |conn| {
            let changed = diesel::update(users::table.find(id))
                .set((users::api_token.eq(token), users::updated_at.eq(Utc::now())))
                .execute(conn)?;
            Ok(changed == 1)
        })
        .await
    }

    async fn role_permissions(&self, role: Role) -> Result<BTreeSet<Permission>, DatabaseError> {
        with_connection(self.pool.clone(), move |conn| {
            let names: Vec<String> = role_permissions::table
                .filter(role_permissions::role.eq(role.as_str()))
                .select(role_permissions::permission)
                .load(conn)?;
            names
                .iter()
                .map(|name| name.parse::<Permission>().map_err(DatabaseError::from))
                .collect()
        })
        .await
    }

    async fn replace_role_permissions(
        &self,
        role: Role,
        permissions: &BTreeSet<Permission>,
    ) -> Result<(), DatabaseError> {
        let permissions = permissions.clone();
        with_connection(self.pool.clone(), move |conn| {
            conn.immediate_transaction::<_, DatabaseError, _>(|conn| {
                diesel::delete(
                    role_permissions::table.filter(role_permissions::role.eq(role.as_str())),
                )
                .execute(conn)?;
                let rows: Vec<RolePermissionRow<'_>> = permissions
                    .iter()
                    .map(|permission| RolePermissionRow {
                        role: role.as_str(),
                        permission: permission.as_str(),
                    })
                    .collect();
                if !rows.is_empty() {
                    diesel::insert_into(role_permissions::table)
                        .values(&rows)
                        .execute(conn)?;
                }
                Ok(())
            })
        })
        .await
    }

    async fn permission_overrides(
        &self,
        user_id: i64,
    ) -> Result<BTreeMap<Permission, bool>, DatabaseError> {
        with_connection(self.pool.clone(), move |conn| {
            let rows: Vec<(String, bool)> = permission_overrides::table
                .filter(permission_overrides::user_id.eq(user_id))
                .select((permission_overrides::permission, permission_overrides::granted))
                .load(conn)?;
            rows.into_iter()
                .map(|(name, granted)| Ok((name.parse::<Permission>()?, granted)))
                .collect()
        })
        .await
    }

    async fn upsert_override(&self, entry: &PermissionOverride) -> Result<(), DatabaseError> {
        let entry = entry.clone();
        with_connection(self.pool.clone(), move |conn| {
            diesel::replace_into(permission_overrides::table)
                .values(&OverrideRow {
                    user_id: entry.user_id,
                    permission: entry.permission.as_str(),
                    granted: entry.granted,
                    updated_at: entry.updated_at,
                })
                .execute(conn)?;
            Ok(())
        })
        .await
    }

    async fn delete_override(
        &self,
        user_id: i64,
        permission: Permission,
    ) -> Result<bool, DatabaseError> {
        with_connection(self.pool.clone(), move |conn| {
            let removed = diesel::delete(
                permission_overrides::table
                    .filter(permission_overrides::user_id.eq(user_id))
                    .filter(permission_overrides::permission.eq(permission.as_str())),
            )
            .execute(conn)?;
            Ok(removed == 1)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use crate::db::sqlite::test_support::{now, seed_user, TestDb};
    use crate::db::{DatabaseError, PermissionOverride};
    use crate::domain::{Permission, Role};

    #[tokio::test]
    async fn seeded_role_defaults_are_readable() {
        let db = TestDb::new().await;
        let store = db.manager.user_store();

        let receptionist = store.role_permissions(Role::Receptionist).await.expect("perms");
        let expected: BTreeSet<Permission> =
            Role::Receptionist.default_permissions().iter().copied().collect();
        assert_eq!(receptionist, expected);
        assert!(store.role_permissions(Role::Customer).await.expect("perms").is_empty());
    }

    #[tokio::test]
    async fn overrides_replace_previous_value() {
        let db = TestDb::new().await;
        let user = seed_user(&db, "frontdesk", Role::Receptionist).await;
        let store = db.manager.user_store();

        let entry = |granted| PermissionOverride {
            user_id: user.id,
            permission: Permission::ManagePayments,
            granted,
            updated_at: now(),
        };
        store.upsert_override(&entry(true)).await.expect("grant");
        store.upsert_override(&entry(false)).await.expect("revoke");

        let overrides = store.permission_overrides(user.id).await.expect("overrides");
        assert_eq!(overrides.len(), 1);
        assert_eq!(overrides.get(&Permission::ManagePayments), Some(&false));

        assert!(store
            .delete_override(user.id, Permission::ManagePayments)
            .await
            .expect("delete"));
        assert!(!store
            .delete_override(user.id, Permission::ManagePayments)
            .await
            .expect("delete again"));
    }

    #[tokio::test]
    async fn token_lookup_and_rotation() {
        let db = TestDb::new().await;
        let user = seed_user(&db, "manager", Role::Manager).await;
        let store = db.manager.user_store();

        let found = store
            .get_user_by_token("token-manager")
            .await
            .expect("lookup")
            .expect("exists");
        assert_eq!(found.id, user.id);

        assert!(store.set_user_token(user.id, "rotated").await.expect("rotate"));
        assert!(store.get_user_by_token("token-manager").await.expect("lookup").is_none());

        let err = seed_duplicate(&db).await;
        assert!(matches!(err, DatabaseError::Conflict(_)));
    }

    async fn seed_duplicate(db: &TestDb) -> DatabaseError {
        let mut user = db
            .manager
            .user_store()
            .get_user_by_token("rotated")
            .await
            .expect("lookup")
            .expect("exists");
        user.api_token = "another".to_string();
        db.manager.user_store().create_user(&user).await.unwrap_err()
    }
}
