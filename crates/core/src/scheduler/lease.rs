//! Per-entity run leases
//!
//! A lease is a token with an expiry, not a held lock: if a run hangs or its
//! task dies without releasing, the lease becomes reclaimable once it
//! expires.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use erpsync_domain::EntityType;
use parking_lot::Mutex;
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Lease {
    token: Uuid,
    acquired_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

/// Map from entity type to its current run lease.
#[derive(Debug)]
pub struct RunLeases {
    ttl: chrono::Duration,
    leases: Mutex<HashMap<EntityType, Lease>>,
}

impl RunLeases {
    pub fn new(ttl: Duration) -> Arc<Self> {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::hours(1));
        Arc::new(Self { ttl, leases: Mutex::new(HashMap::new()) })
    }

    /// Acquire the lease for `entity_type`, or `None` while another
    /// unexpired lease is held.
    pub fn try_acquire(self: &Arc<Self>, entity_type: EntityType, now: DateTime<Utc>) -> Option<LeaseGuard> {
        let mut leases = self.leases.lock();

        if let Some(existing) = leases.get(&entity_type) {
            if existing.expires_at > now {
                return None;
            }
            warn!(
                entity_type = %entity_type,
                acquired_at = %existing.acquired_at,
                "reclaiming expired run lease"
            );
        }

        let lease = Lease { token: Uuid::new_v4(), acquired_at: now, expires_at: now + self.ttl };
        leases.insert(entity_type, lease);

        Some(LeaseGuard { leases: Arc::clone(self), entity_type, token: lease.token })
    }

    /// Entities holding an unexpired lease at `now`.
    pub fn held(&self, now: DateTime<Utc>) -> Vec<EntityType> {
        let mut held: Vec<EntityType> = self
            .leases
            .lock()
            .iter()
            .filter(|(_, lease)| lease.expires_at > now)
            .map(|(entity, _)| *entity)
            .collect();
        held.sort();
        held
    }

    pub fn is_held(&self, entity_type: EntityType, now: DateTime<Utc>) -> bool {
        self.leases.lock().get(&entity_type).is_some_and(|lease| lease.expires_at > now)
    }

    /// Push the expiry of the lease carrying `token` to `now + ttl`. Refused
    /// once the lease was reclaimed by another run.
    pub fn renew(&self, entity_type: EntityType, token: Uuid, now: DateTime<Utc>) -> bool {
        match self.leases.lock().get_mut(&entity_type) {
            Some(lease) if lease.token == token => {
                lease.expires_at = now + self.ttl;
                true
            }
            _ => false,
        }
    }

    /// Release only if the stored lease still carries `token`.
    pub fn release(&self, entity_type: EntityType, token: Uuid) -> bool {
        let mut leases = self.leases.lock();
        match leases.get(&entity_type) {
            Some(lease) if lease.token == token => {
                leases.remove(&entity_type);
                true
            }
            _ => false,
        }
    }
}

/// Releases its lease on drop unless the lease was reclaimed meanwhile.
#[derive(Debug)]
pub struct LeaseGuard {
    leases: Arc<RunLeases>,
    entity_type: EntityType,
    token: Uuid,
}

impl LeaseGuard {
    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    pub fn token(&self) -> Uuid {
        self.token
    }

    /// Keep the lease alive while its run makes progress.
    pub fn renew(&self, now: DateTime<Utc>) -> bool {
        self.leases.renew(self.entity_type, self.token, now)
    }
}

impl Drop for LeaseGuard {
    fn drop(&mut self) {
        self.leases.release(self.entity_type, self.token);
    }
}
