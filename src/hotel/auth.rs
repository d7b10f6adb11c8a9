use std::collections::BTreeSet;

use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::db::User;
use crate::domain::access::{granted_set, resolve_all};
use crate::domain::{Permission, Role};

use super::{HotelCore, HotelError, HotelResult};

/// Authenticated caller of one request.
#[derive(Debug, Clone, Serialize)]
pub struct Principal {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
    /// Customer record linked to a customer-role login.
    pub customer_id: Option<i64>,
    pub permissions: BTreeSet<Permission>,
}

impl Principal {
    /// Synthetic administrator behind the configured bootstrap token.
    pub fn bootstrap() -> Self {
        Self {
            user_id: 0,
            username: "bootstrap".to_string(),
            role: Role::Admin,
            customer_id: None,
            permissions: Permission::ALL.iter().copied().collect(),
        }
    }

    pub fn has(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    pub fn require(&self, permission: Permission) -> HotelResult<()> {
        if self.has(permission) {
            Ok(())
        } else {
            Err(HotelError::Forbidden(format!("missing permission {permission}")))
        }
    }

    pub fn is_customer(&self) -> bool {
        self.role == Role::Customer
    }

    /// Customers may only touch their own record; staff need `permission`.
    pub fn authorize_customer(&self, customer_id: i64, permission: Permission) -> HotelResult<()> {
        if self.is_customer() {
            return match self.customer_id {
                Some(own) if own == customer_id => Ok(()),
                _ => Err(HotelError::Forbidden(
                    "customers may only access their own records".to_string(),
                )),
            };
        }
        self.require(permission)
    }

    /// The customer id a customer principal acts as, or `requested` for staff.
    pub fn scope_customer(&self, requested: Option<i64>) -> HotelResult<Option<i64>> {
        if !self.is_customer() {
            return Ok(requested);
        }
        match (self.customer_id, requested) {
            (Some(own), None) => Ok(Some(own)),
            (Some(own), Some(requested)) if own == requested => Ok(Some(own)),
            (None, _) => Err(HotelError::Forbidden(
                "login is not linked to a customer record".to_string(),
            )),
            _ => Err(HotelError::Forbidden(
                "customers may only access their own records".to_string(),
            )),
        }
    }
}

pub fn new_api_token() -> String {
    Uuid::new_v4().to_string()
}

impl HotelCore {
    /// Resolves a bearer token. `None` means the token is unknown or its
    /// owner has been deactivated.
    pub async fn authenticate(&self, token: &str) -> HotelResult<Option<Principal>> {
        if self.config().auth.matches_bootstrap(token) {
            return Ok(Some(Principal::bootstrap()));
        }

        let Some(user) = self.db().user_store().get_user_by_token(token).await? else {
            return Ok(None);
        };
        if !user.active {
            debug!(user_id = user.id, "rejected token of inactive user");
            return Ok(None);
        }
        Ok(Some(self.principal_for(&user).await?))
    }

    pub(crate) async fn principal_for(&self, user: &User) -> HotelResult<Principal> {
        let users = self.db().user_store();
        let role_grants = users.role_permissions(user.role).await?;
        let overrides = users.permission_overrides(user.id).await?;
        let customer_id = if user.role == Role::Customer {
            self.db()
                .customer_store()
                .get_customer_by_user(user.id)
                .await?
                .map(|customer| customer.id)
        } else {
            None
        };

        Ok(Principal {
            user_id: user.id,
            username: user.username.clone(),
            role: user.role,
            customer_id,
            permissions: granted_set(&resolve_all(&role_grants, &overrides)),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use crate::db::PermissionOverride;
    use crate::domain::{Permission, Role};
    use crate::hotel::test_support::{TestHotel, BOOTSTRAP_TOKEN};
    use crate::hotel::HotelError;

    use super::Principal;

    fn customer(customer_id: Option<i64>) -> Principal {
        Principal {
            user_id: 9,
            username: "guest".to_string(),
            role: Role::Customer,
            customer_id,
            permissions: BTreeSet::new(),
        }
    }

    #[test]
    fn customers_are_scoped_to_their_own_record() {
        let principal = customer(Some(4));
        assert!(principal.authorize_customer(4, Permission::ViewBookings).is_ok());
        assert!(matches!(
            principal.authorize_customer(5, Permission::ViewBookings),
            Err(HotelError::Forbidden(_))
        ));
        assert_eq!(principal.scope_customer(None).unwrap(), Some(4));
        assert!(principal.scope_customer(Some(5)).is_err());
        assert!(customer(None).scope_customer(None).is_err());
    }

    #[test]
    fn staff_scope_passes_through() {
        let principal = Principal::bootstrap();
        assert_eq!(principal.scope_customer(Some(5)).unwrap(), Some(5));
        assert_eq!(principal.scope_customer(None).unwrap(), None);
        assert!(principal.authorize_customer(5, Permission::HandleChat).is_ok());
    }

    #[tokio::test]
    async fn bootstrap_token_is_a_full_admin() {
        let hotel = TestHotel::new().await;
        let principal = hotel
            .core
            .authenticate(BOOTSTRAP_TOKEN)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(principal.user_id, 0);
        assert_eq!(principal.permissions.len(), Permission::ALL.len());
        assert!(hotel.core.authenticate("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn overrides_shape_the_principal() {
        let hotel = TestHotel::new().await;
        let (user, principal) = hotel.principal(Role::Receptionist, "desk").await;
        assert!(principal.has(Permission::CheckInOut));
        assert!(!principal.has(Permission::ManagePayments));

        let store = hotel.db.manager.user_store();
        store
            .upsert_override(&PermissionOverride {
                user_id: user.id,
                permission: Permission::CheckInOut,
                granted: false,
                updated_at: chrono::Utc::now(),
            })
            .await
            .unwrap();
        let principal = hotel.core.authenticate(&user.api_token).await.unwrap().unwrap();
        assert!(!principal.has(Permission::CheckInOut));

        store.set_user_active(user.id, false).await.unwrap();
        assert!(hotel.core.authenticate(&user.api_token).await.unwrap().is_none());
    }
}
