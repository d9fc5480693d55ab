use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// The six cached artifact shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheShape {
    UserPermissions,
    UserRoles,
    UserMenus,
    UserPermissionMatrix,
    UserRoleMatrix,
    RolePermissions,
}

impl CacheShape {
    pub const ALL: [Self; 6] = [
        Self::UserPermissions,
        Self::UserRoles,
        Self::UserMenus,
        Self::UserPermissionMatrix,
        Self::UserRoleMatrix,
        Self::RolePermissions,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UserPermissions => "user_permissions",
            Self::UserRoles => "user_roles",
            Self::UserMenus => "user_menus",
            Self::UserPermissionMatrix => "user_permission_matrix",
            Self::UserRoleMatrix => "user_role_matrix",
            Self::RolePermissions => "role_permissions",
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::UserPermissions => 0,
            Self::UserRoles => 1,
            Self::UserMenus => 2,
            Self::UserPermissionMatrix => 3,
            Self::UserRoleMatrix => 4,
            Self::RolePermissions => 5,
        }
    }
}

/// Hit/miss accounting for one cache instance.
///
/// Injected into `PermissionCache` rather than kept in a module-level
/// static, so side-by-side instances (tests, tenants) do not bleed into
/// each other. A hit is recorded only when the backend returned a
/// decodable value; absent keys, backend faults, timeouts and corrupt
/// payloads all count as misses.
pub struct CacheStatsCollector {
    enabled: bool,
    hits: AtomicU64,
    misses: AtomicU64,
    writes: [AtomicU64; 6],
}

impl CacheStatsCollector {
    #[must_use]
    pub const fn new(enabled: bool) -> Self {
        Self {
            enabled,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            writes: [
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
            ],
        }
    }

    pub fn record_hit(&self) {
        if self.enabled {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_miss(&self) {
        if self.enabled {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_write(&self, shape: CacheShape) {
        if self.enabled {
            self.writes[shape.index()].fetch_add(1, Ordering::Relaxed);
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> CacheStatistics {
        let hit_count = self.hits.load(Ordering::Relaxed);
        let miss_count = self.misses.load(Ordering::Relaxed);
        let total = hit_count + miss_count;
        let hit_ratio = if total == 0 {
            0.0
        } else {
            hit_count as f64 / total as f64
        };

        let mut keys_by_shape = BTreeMap::new();
        for shape in CacheShape::ALL {
            keys_by_shape.insert(
                shape.as_str().to_string(),
                self.writes[shape.index()].load(Ordering::Relaxed),
            );
        }

        CacheStatistics {
            hit_count,
            miss_count,
            hit_ratio,
            keys_by_shape,
        }
    }
}

/// Point-in-time view of cache effectiveness.
///
/// `keys_by_shape` counts entries written per shape since the collector
/// was created; current residency is not observable once TTLs start
/// evicting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStatistics {
    pub hit_count: u64,
    pub miss_count: u64,
    pub hit_ratio: f64,
    pub keys_by_shape: BTreeMap<String, u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_ratio() {
        let stats = CacheStatsCollector::new(true);
        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.hit_count, 3);
        assert_eq!(snapshot.miss_count, 1);
        assert!((snapshot.hit_ratio - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_ratio_is_zero() {
        let snapshot = CacheStatsCollector::new(true).snapshot();
        assert_eq!(snapshot.hit_ratio, 0.0);
    }

    #[test]
    fn test_writes_counted_per_shape() {
        let stats = CacheStatsCollector::new(true);
        stats.record_write(CacheShape::UserPermissions);
        stats.record_write(CacheShape::UserPermissions);
        stats.record_write(CacheShape::RolePermissions);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.keys_by_shape["user_permissions"], 2);
        assert_eq!(snapshot.keys_by_shape["role_permissions"], 1);
        assert_eq!(snapshot.keys_by_shape["user_menus"], 0);
    }

    #[test]
    fn test_disabled_collector_stays_zero() {
        let stats = CacheStatsCollector::new(false);
        stats.record_hit();
        stats.record_miss();
        stats.record_write(CacheShape::UserRoles);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.hit_count, 0);
        assert_eq!(snapshot.miss_count, 0);
        assert_eq!(snapshot.keys_by_shape["user_roles"], 0);
    }
}
