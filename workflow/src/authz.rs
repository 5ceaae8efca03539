//! # Authorization evaluator
//!
//! Resolves a caller's effective capabilities from role membership plus
//! explicit permission claims, and guards every workflow transition.
//!
//! The effective set is a single union — role-derived capabilities form the
//! default, explicit claims extend it. Claims are purely additive: absence
//! is the only form of restriction, there is no negative override. Role
//! membership itself is resolved through the outbound [`RoleDirectory`]
//! contract; claims live behind the persistence contract.
//!
//! Claim grants and revokes are themselves audited (actor, target,
//! added-list, removed-list, timestamp). The audit log is append-only and is
//! written after the guarded action, independently of it.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::capability::{Capability, Role};
use crate::error::{Result, WorkflowError};
use crate::store::WorkflowStore;

/// One append-only record of a claim update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Admin who performed the update.
    pub actor: Uuid,
    /// User whose claims were changed.
    pub target: Uuid,
    pub added: Vec<Capability>,
    pub removed: Vec<Capability>,
    pub recorded_at: DateTime<Utc>,
}

/// Role-membership lookup, provided by the identity collaborator.
///
/// Also used by the workflow to enumerate notification fan-out targets
/// (all managers on submission, all admins on review).
pub trait RoleDirectory: Send + Sync {
    /// Roles held by `user`. Empty for unknown users.
    fn roles_of(&self, user: Uuid) -> Vec<Role>;

    /// All users holding `role`.
    fn members_of(&self, role: Role) -> Vec<Uuid>;
}

/// In-memory [`RoleDirectory`] for tests and single-process deployments.
#[derive(Default)]
pub struct StaticRoleDirectory {
    assignments: Mutex<HashMap<Uuid, Vec<Role>>>,
}

impl StaticRoleDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign `role` to `user`; a no-op if already held.
    pub fn assign(&self, user: Uuid, role: Role) {
        let mut map = self.assignments.lock();
        let roles = map.entry(user).or_default();
        if !roles.contains(&role) {
            roles.push(role);
        }
    }
}

impl RoleDirectory for StaticRoleDirectory {
    fn roles_of(&self, user: Uuid) -> Vec<Role> {
        self.assignments.lock().get(&user).cloned().unwrap_or_default()
    }

    fn members_of(&self, role: Role) -> Vec<Uuid> {
        self.assignments
            .lock()
            .iter()
            .filter(|(_, roles)| roles.contains(&role))
            .map(|(user, _)| *user)
            .collect()
    }
}

/// Capability-resolution guard consulted by every workflow transition.
pub struct AuthzEvaluator {
    directory: Arc<dyn RoleDirectory>,
    store: Arc<dyn WorkflowStore>,
}

impl AuthzEvaluator {
    pub fn new(directory: Arc<dyn RoleDirectory>, store: Arc<dyn WorkflowStore>) -> Self {
        AuthzEvaluator { directory, store }
    }

    /// `true` when `actor`'s role-derived set or explicit claims contain
    /// `capability`. Side-effect-free.
    pub fn has_capability(&self, actor: Uuid, capability: Capability) -> bool {
        self.directory
            .roles_of(actor)
            .iter()
            .any(|role| role.capabilities().contains(&capability))
            || self.store.claims_for(actor).contains(&capability)
    }

    /// Guard form of [`Self::has_capability`]: fails with `Unauthorized`
    /// without mutating any state.
    pub fn require(&self, actor: Uuid, capability: Capability) -> Result<()> {
        if self.has_capability(actor, capability) {
            Ok(())
        } else {
            debug!(%actor, capability = capability.as_str(), "capability check failed");
            Err(WorkflowError::Unauthorized)
        }
    }

    /// Apply a claim update for `target` and append one audit entry.
    ///
    /// Guarded by `permissions.manage`. Every referenced capability string is
    /// validated against the catalog *before* anything is mutated, so a
    /// request mixing known and unknown strings changes nothing.
    pub fn update_permissions(
        &self,
        actor: Uuid,
        target: Uuid,
        grants: &[String],
        revokes: &[String],
    ) -> Result<AuditEntry> {
        self.require(actor, Capability::PermissionsManage)?;

        let added = grants
            .iter()
            .map(|s| Capability::parse(s))
            .collect::<Result<Vec<_>>>()?;
        let removed = revokes
            .iter()
            .map(|s| Capability::parse(s))
            .collect::<Result<Vec<_>>>()?;

        for capability in &added {
            self.store.grant_claim(target, *capability);
        }
        for capability in &removed {
            self.store.revoke_claim(target, *capability);
        }

        let entry = AuditEntry {
            actor,
            target,
            added,
            removed,
            recorded_at: Utc::now(),
        };
        self.store.append_audit(entry.clone());
        Ok(entry)
    }
}
