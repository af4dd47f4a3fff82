//! Shared wiring and the acting-identity helpers every service uses.

use std::sync::Arc;

use uuid::Uuid;

use client::{Cache, Dispatcher};
use common::ServiceError;
use models::Role;
use store::query::TableQuery;
use store::{AuthStore, BlobStore, TableStore};

/// The collaborators one service call needs. Built once by the facade and
/// shared by every service.
pub struct Ctx {
    pub tables: Arc<dyn TableStore>,
    pub auth: Arc<dyn AuthStore>,
    pub blobs: Arc<dyn BlobStore>,
    pub cache: Arc<dyn Cache>,
    pub dispatcher: Dispatcher,
    pub photo_bucket: String,
}

/// The resolved identity plus its typed claims.
#[derive(Clone, Debug)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
    pub omc_id: Option<Uuid>,
    pub station_id: Option<Uuid>,
}

impl Ctx {
    /// Current identity or an authentication-required failure. Unknown role
    /// claims degrade to the least-privileged role.
    pub async fn actor(&self) -> Result<Actor, ServiceError> {
        match self.auth.current_user().await {
            Ok(Some(user)) => {
                let role = user
                    .role
                    .as_deref()
                    .and_then(Role::parse)
                    .unwrap_or(Role::Attendant);
                Ok(Actor { id: user.id, role, omc_id: user.omc_id, station_id: user.station_id })
            }
            Ok(None) => Err(ServiceError::AuthRequired),
            Err(_) => Err(ServiceError::AuthRequired),
        }
    }
}

pub fn require_admin(actor: &Actor) -> Result<(), ServiceError> {
    if actor.role.is_admin() {
        Ok(())
    } else {
        Err(ServiceError::permission("admin role required"))
    }
}

pub fn require_manager(actor: &Actor) -> Result<(), ServiceError> {
    if actor.role.can_manage_station() {
        Ok(())
    } else {
        Err(ServiceError::permission("station management role required"))
    }
}

/// Narrow a station-keyed query to what the actor may see: admins see
/// everything, everyone else only their own station.
pub fn scope_to_station(query: TableQuery, actor: &Actor) -> TableQuery {
    match actor.role {
        Role::Admin | Role::OmcAdmin => query,
        _ => match actor.station_id {
            Some(station) => query.eq("station_id", station.to_string()),
            None => query,
        },
    }
}

/// Narrow an OMC-keyed query: OMC admins only see their own company's rows.
pub fn scope_to_omc(query: TableQuery, actor: &Actor) -> TableQuery {
    match (actor.role, actor.omc_id) {
        (Role::OmcAdmin, Some(omc)) => query.eq("omc_id", omc.to_string()),
        _ => query,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(role: Role) -> Actor {
        Actor { id: Uuid::new_v4(), role, omc_id: Some(Uuid::new_v4()), station_id: Some(Uuid::new_v4()) }
    }

    #[test]
    fn admin_queries_are_unscoped() {
        let q = scope_to_station(TableQuery::new("sales"), &actor(Role::Admin));
        assert!(q.filters.is_empty());
    }

    #[test]
    fn attendant_queries_are_pinned_to_their_station() {
        let a = actor(Role::Attendant);
        let q = scope_to_station(TableQuery::new("sales"), &a);
        assert_eq!(q.filters.len(), 1);
        assert_eq!(q.filters[0].column, "station_id");
    }

    #[test]
    fn omc_admin_sees_only_their_company() {
        let a = actor(Role::OmcAdmin);
        let q = scope_to_omc(TableQuery::new("stations"), &a);
        assert_eq!(q.filters[0].column, "omc_id");
        let unscoped = scope_to_omc(TableQuery::new("stations"), &actor(Role::Admin));
        assert!(unscoped.filters.is_empty());
    }

    #[test]
    fn permission_checks_follow_the_role() {
        assert!(require_admin(&actor(Role::Admin)).is_ok());
        assert!(require_admin(&actor(Role::Manager)).is_err());
        assert!(require_manager(&actor(Role::Manager)).is_ok());
        assert!(require_manager(&actor(Role::Attendant)).is_err());
    }
}
