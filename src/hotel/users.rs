//! Staff and customer logins, role grants and per-user overrides.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::db::{PermissionOverride, User};
use crate::domain::access::{can_manage_account, resolve_all, ADMIN_LOCKED};
use crate::domain::{Permission, ResolvedPermission, Role};

use super::auth::new_api_token;
use super::customers::normalize_email;
use super::{not_found, required_text, HotelCore, HotelError, HotelResult, Principal};

#[derive(Debug, Clone, Deserialize)]
pub struct NewUserInput {
    pub username: String,
    pub display_name: String,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserUpdate {
    pub display_name: String,
    pub email: String,
    pub role: Role,
}

/// A user together with a freshly issued token. The token is only ever
/// shown in this response.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub user: User,
    pub api_token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoleGrants {
    pub role: Role,
    pub permissions: BTreeSet<Permission>,
}

fn ensure_manageable(actor: &Principal, role: Role) -> HotelResult<()> {
    if can_manage_account(&actor.permissions, role) {
        Ok(())
    } else {
        Err(HotelError::Forbidden(format!("not allowed to manage {role} accounts")))
    }
}

/// Overrides need `manage-roles` and can only grant what the actor holds.
fn ensure_override_rights(
    actor: &Principal,
    user_id: i64,
    permission: Permission,
    granting: bool,
) -> HotelResult<()> {
    actor.require(Permission::ManageRoles)?;
    if actor.user_id == user_id {
        return Err(HotelError::Forbidden(
            "users cannot change their own permissions".to_string(),
        ));
    }
    if granting && !actor.has(permission) {
        return Err(HotelError::Forbidden(format!(
            "cannot grant {permission} without holding it"
        )));
    }
    Ok(())
}

/// Rejects role edits that would strip the admin role of its locked grants.
pub fn check_role_edit(role: Role, permissions: &BTreeSet<Permission>) -> HotelResult<()> {
    if role != Role::Admin {
        return Ok(());
    }
    match ADMIN_LOCKED.iter().find(|locked| !permissions.contains(*locked)) {
        Some(missing) => Err(HotelError::Validation(format!(
            "the admin role must keep {missing}"
        ))),
        None => Ok(()),
    }
}

impl HotelCore {
    pub async fn create_user(
        &self,
        actor: &Principal,
        input: NewUserInput,
    ) -> HotelResult<IssuedToken> {
        ensure_manageable(actor, input.role)?;
        let username = required_text("username", &input.username, 64)?;
        if username.chars().any(char::is_whitespace) {
            return Err(HotelError::Validation("username must not contain spaces".to_string()));
        }
        let display_name = required_text("display_name", &input.display_name, 120)?;
        let email = normalize_email(&input.email)?;

        let now = Utc::now();
        let api_token = new_api_token();
        let mut user = User {
            id: 0,
            username,
            display_name,
            email,
            role: input.role,
            active: true,
            api_token: api_token.clone(),
            created_at: now,
            updated_at: now,
        };
        user.id = self.db().user_store().create_user(&user).await?;
        info!(user_id = user.id, role = %user.role, actor = actor.user_id, "user created");
        Ok(IssuedToken { user, api_token })
    }

    pub async fn user(&self, id: i64) -> HotelResult<User> {
        self.db()
            .user_store()
            .get_user(id)
            .await?
            .ok_or_else(|| not_found("user", id))
    }

    /// Users the actor may manage.
    pub async fn list_users(
        &self,
        actor: &Principal,
        role: Option<Role>,
    ) -> HotelResult<Vec<User>> {
        if !actor.has(Permission::ManageUsers) {
            actor.require(Permission::ManageStaff)?;
            if role.is_some_and(|role| role != Role::Receptionist) {
                return Ok(Vec::new());
            }
            return Ok(self
                .db()
                .user_store()
                .list_users(Some(Role::Receptionist))
                .await?);
        }
        Ok(self.db().user_store().list_users(role).await?)
    }

    pub async fn managed_user(&self, actor: &Principal, id: i64) -> HotelResult<User> {
        let user = self.user(id).await?;
        ensure_manageable(actor, user.role)?;
        Ok(user)
    }

    pub async fn update_user(
        &self,
        actor: &Principal,
        id: i64,
        update: UserUpdate,
    ) -> HotelResult<User> {
        let mut user = self.managed_user(actor, id).await?;
        ensure_manageable(actor, update.role)?;
        if actor.user_id == id && update.role != user.role {
            return Err(HotelError::Forbidden("users cannot change their own role".to_string()));
        }
        user.display_name = required_text("display_name", &update.display_name, 120)?;
        user.email = normalize_email(&update.email)?;
        user.role = update.role;
        self.db().user_store().update_user(&user).await?;
        info!(user_id = id, role = %user.role, actor = actor.user_id, "user updated");
        self.user(id).await
    }

    pub async fn deactivate_user(&self, actor: &Principal, id: i64) -> HotelResult<User> {
        if actor.user_id == id {
            return Err(HotelError::Forbidden("users cannot deactivate themselves".to_string()));
        }
        self.managed_user(actor, id).await?;
        self.db().user_store().set_user_active(id, false).await?;
        info!(user_id = id, actor = actor.user_id, "user deactivated");
        self.user(id).await
    }

    /// Issues a new token; users may always rotate their own.
    pub async fn rotate_token(&self, actor: &Principal, id: i64) -> HotelResult<IssuedToken> {
        let user = if actor.user_id == id {
            self.user(id).await?
        } else {
            self.managed_user(actor, id).await?
        };
        let api_token = new_api_token();
        self.db().user_store().set_user_token(user.id, &api_token).await?;
        info!(user_id = id, actor = actor.user_id, "api token rotated");
        Ok(IssuedToken {
            user: self.user(id).await?,
            api_token,
        })
    }

    pub async fn effective_permissions(
        &self,
        user_id: i64,
    ) -> HotelResult<BTreeMap<Permission, ResolvedPermission>> {
        let user = self.user(user_id).await?;
        let store = self.db().user_store();
        let role_grants = store.role_permissions(user.role).await?;
        let overrides = store.permission_overrides(user.id).await?;
        Ok(resolve_all(&role_grants, &overrides))
    }

    pub async fn set_override(
        &self,
        actor: &Principal,
        user_id: i64,
        permission: Permission,
        granted: bool,
    ) -> HotelResult<BTreeMap<Permission, ResolvedPermission>> {
        ensure_override_rights(actor, user_id, permission, granted)?;
        self.managed_user(actor, user_id).await?;
        self.db()
            .user_store()
            .upsert_override(&PermissionOverride {
                user_id,
                permission,
                granted,
                updated_at: Utc::now(),
            })
            .await?;
        info!(
            user_id,
            permission = %permission,
            granted,
            actor = actor.user_id,
            "permission override set"
        );
        self.effective_permissions(user_id).await
    }

    pub async fn clear_override(
        &self,
        actor: &Principal,
        user_id: i64,
        permission: Permission,
    ) -> HotelResult<BTreeMap<Permission, ResolvedPermission>> {
        ensure_override_rights(actor, user_id, permission, false)?;
        self.managed_user(actor, user_id).await?;
        if self
            .db()
            .user_store()
            .delete_override(user_id, permission)
            .await?
        {
            info!(
                user_id,
                permission = %permission,
                actor = actor.user_id,
                "permission override cleared"
            );
        }
        self.effective_permissions(user_id).await
    }

    pub async fn list_roles(&self) -> HotelResult<Vec<RoleGrants>> {
        let store = self.db().user_store();
        let mut roles = Vec::with_capacity(Role::ALL.len());
        for role in Role::ALL {
            roles.push(RoleGrants {
                role: *role,
                permissions: store.role_permissions(*role).await?,
            });
        }
        Ok(roles)
    }

    pub async fn set_role_permissions(
        &self,
        role: Role,
        permissions: BTreeSet<Permission>,
    ) -> HotelResult<RoleGrants> {
        check_role_edit(role, &permissions)?;
        let store = self.db().user_store();
        store.replace_role_permissions(role, &permissions).await?;
        info!(role = %role, count = permissions.len(), "role permissions replaced");
        Ok(RoleGrants {
            role,
            permissions: store.role_permissions(role).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use crate::domain::{GrantSource, Permission, Role};
    use crate::hotel::test_support::TestHotel;
    use crate::hotel::HotelError;

    use super::{check_role_edit, NewUserInput, UserUpdate};

    fn new_user(username: &str, role: Role) -> NewUserInput {
        NewUserInput {
            username: username.to_string(),
            display_name: username.to_string(),
            email: format!("{username}@hotel.test"),
            role,
        }
    }

    #[test]
    fn admin_keeps_locked_permissions() {
        let mut perms: BTreeSet<Permission> = Permission::ALL.iter().copied().collect();
        assert!(check_role_edit(Role::Admin, &perms).is_ok());
        perms.remove(&Permission::ManageRoles);
        assert!(matches!(
            check_role_edit(Role::Admin, &perms),
            Err(HotelError::Validation(_))
        ));
        assert!(check_role_edit(Role::Manager, &BTreeSet::new()).is_ok());
    }

    #[tokio::test]
    async fn managers_only_manage_receptionists() {
        let hotel = TestHotel::new().await;
        let (_, manager) = hotel.principal(Role::Manager, "manager").await;

        let issued = hotel
            .core
            .create_user(&manager, new_user("desk", Role::Receptionist))
            .await
            .unwrap();
        assert_eq!(issued.api_token.len(), 36);

        let denied = hotel
            .core
            .create_user(&manager, new_user("boss", Role::Admin))
            .await;
        assert!(matches!(denied, Err(HotelError::Forbidden(_))));

        let promote = hotel
            .core
            .update_user(
                &manager,
                issued.user.id,
                UserUpdate {
                    display_name: "Desk".to_string(),
                    email: "desk@hotel.test".to_string(),
                    role: Role::Manager,
                },
            )
            .await;
        assert!(matches!(promote, Err(HotelError::Forbidden(_))));

        let visible = hotel.core.list_users(&manager, None).await.unwrap();
        assert!(visible.iter().all(|user| user.role == Role::Receptionist));
        assert_eq!(visible.len(), 1);
    }

    #[tokio::test]
    async fn overrides_cannot_target_yourself() {
        let hotel = TestHotel::new().await;
        let admin = hotel.admin().await;
        let (desk, desk_principal) = hotel.principal(Role::Receptionist, "desk").await;

        let own = hotel
            .core
            .set_override(&desk_principal, desk.id, Permission::ManagePayments, true)
            .await;
        assert!(matches!(own, Err(HotelError::Forbidden(_))));

        let resolved = hotel
            .core
            .set_override(&admin, desk.id, Permission::ManagePayments, true)
            .await
            .unwrap();
        let entry = resolved[&Permission::ManagePayments];
        assert!(entry.granted);
        assert_eq!(entry.source, GrantSource::Override);

        let resolved = hotel
            .core
            .clear_override(&admin, desk.id, Permission::ManagePayments)
            .await
            .unwrap();
        assert!(!resolved[&Permission::ManagePayments].granted);
        assert_eq!(resolved[&Permission::ManagePayments].source, GrantSource::Role);
    }

    #[tokio::test]
    async fn managers_cannot_grant_overrides() {
        let hotel = TestHotel::new().await;
        let (_, manager) = hotel.principal(Role::Manager, "manager").await;
        let issued = hotel
            .core
            .create_user(&manager, new_user("puppet", Role::Receptionist))
            .await
            .unwrap();

        let grant = hotel
            .core
            .set_override(&manager, issued.user.id, Permission::ManageUsers, true)
            .await;
        assert!(matches!(grant, Err(HotelError::Forbidden(_))));
        let clear = hotel
            .core
            .clear_override(&manager, issued.user.id, Permission::HandleChat)
            .await;
        assert!(matches!(clear, Err(HotelError::Forbidden(_))));

        let puppet = hotel
            .core
            .authenticate(&issued.api_token)
            .await
            .unwrap()
            .unwrap();
        assert!(!puppet.has(Permission::ManageUsers));
        let escalate = hotel
            .core
            .create_user(&puppet, new_user("boss", Role::Admin))
            .await;
        assert!(matches!(escalate, Err(HotelError::Forbidden(_))));
    }

    #[tokio::test]
    async fn overrides_only_grant_what_the_actor_holds() {
        let hotel = TestHotel::new().await;
        let (_, desk_principal) = hotel.principal(Role::Receptionist, "desk").await;
        let (night, _) = hotel.principal(Role::Receptionist, "night").await;
        let mut limited = hotel.admin().await;
        limited.permissions.remove(&Permission::ViewAnalytics);

        let denied = hotel
            .core
            .set_override(&limited, night.id, Permission::ViewAnalytics, true)
            .await;
        assert!(matches!(denied, Err(HotelError::Forbidden(_))));

        let revoked = hotel
            .core
            .set_override(&limited, night.id, Permission::HandleChat, false)
            .await
            .unwrap();
        assert!(!revoked[&Permission::HandleChat].granted);

        let by_receptionist = hotel
            .core
            .clear_override(&desk_principal, night.id, Permission::HandleChat)
            .await;
        assert!(matches!(by_receptionist, Err(HotelError::Forbidden(_))));
    }

    #[tokio::test]
    async fn deactivated_users_lose_access_and_tokens_rotate() {
        let hotel = TestHotel::new().await;
        let admin = hotel.admin().await;
        let issued = hotel
            .core
            .create_user(&admin, new_user("temp", Role::Receptionist))
            .await
            .unwrap();

        let rotated = hotel.core.rotate_token(&admin, issued.user.id).await.unwrap();
        assert_ne!(rotated.api_token, issued.api_token);
        assert!(hotel.core.authenticate(&issued.api_token).await.unwrap().is_none());
        assert!(hotel.core.authenticate(&rotated.api_token).await.unwrap().is_some());

        let user = hotel.core.deactivate_user(&admin, issued.user.id).await.unwrap();
        assert!(!user.active);
        assert!(hotel.core.authenticate(&rotated.api_token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn role_edits_persist() {
        let hotel = TestHotel::new().await;
        let grants: BTreeSet<Permission> = [Permission::ViewDashboard].into_iter().collect();
        let updated = hotel
            .core
            .set_role_permissions(Role::Receptionist, grants.clone())
            .await
            .unwrap();
        assert_eq!(updated.permissions, grants);

        let roles = hotel.core.list_roles().await.unwrap();
        let receptionist = roles
            .iter()
            .find(|entry| entry.role == Role::Receptionist)
            .unwrap();
        assert_eq!(receptionist.permissions, grants);
    }
}
