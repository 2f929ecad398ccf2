//! TTL cache in front of a membership store.
//!
//! # Purpose
//! Saves the membership round trip for hot `(user, project)` pairs.
//!
//! # Invalidation
//! Entries expire after the configured TTL. The CRUD layer that mutates
//! memberships, roles, or projects must call one of the `invalidate_*` hooks
//! so changes take effect before the TTL elapses.
//!
//! # Key invariants
//! - Negative results ("not a member") are cached like positive ones.
//! - Store errors are never cached.
//! - A lookup that overlaps an invalidation never leaves its result behind:
//!   every `invalidate_*` bumps a generation counter before dropping entries,
//!   and a lookup that sees the counter move after its insert removes the
//!   entry again.
//! - Expired entries are evicted when looked up and swept every
//!   `PURGE_INTERVAL` inserts, so the map does not grow with dead pairs.
use super::{MembershipStore, StoreResult};
use crate::Membership;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use trellis_common::ids::{ProjectId, UserId};

const PURGE_INTERVAL: usize = 256;

type CacheKey = (UserId, ProjectId);

#[derive(Clone)]
struct CachedMembership {
    membership: Option<Membership>,
    expires_at: Instant,
}

#[derive(Clone)]
pub struct CachedMembershipStore {
    inner: Arc<dyn MembershipStore>,
    cache: Arc<DashMap<CacheKey, CachedMembership>>,
    generation: Arc<AtomicU64>,
    inserts: Arc<AtomicUsize>,
    ttl: Duration,
}

impl CachedMembershipStore {
    pub fn new(inner: Arc<dyn MembershipStore>, ttl: Duration) -> Self {
        Self {
            inner,
            cache: Arc::new(DashMap::new()),
            generation: Arc::new(AtomicU64::new(0)),
            inserts: Arc::new(AtomicUsize::new(0)),
            ttl,
        }
    }

    /// Drop the cached entry for one membership.
    pub fn invalidate_membership(&self, user_id: UserId, project_id: ProjectId) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.cache.remove(&(user_id, project_id));
    }

    /// Drop every cached entry for a project (role or project changes).
    pub fn invalidate_project(&self, project_id: ProjectId) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.cache.retain(|(_, cached_project), _| *cached_project != project_id);
    }

    pub fn invalidate_all(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.cache.clear();
    }

    /// Remove every entry whose TTL has elapsed.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.cache.retain(|_, entry| entry.expires_at > now);
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    fn cached(&self, key: &CacheKey) -> Option<Option<Membership>> {
        let now = Instant::now();
        {
            let entry = self.cache.get(key)?;
            if entry.expires_at > now {
                return Some(entry.membership.clone());
            }
        }
        self.cache.remove_if(key, |_, entry| entry.expires_at <= now);
        None
    }

    fn store(&self, key: CacheKey, membership: Option<Membership>, generation: u64) {
        self.cache.insert(
            key,
            CachedMembership {
                membership,
                expires_at: Instant::now() + self.ttl,
            },
        );
        // An invalidation raced with the inner read; what we just wrote may
        // predate the mutation.
        if self.generation.load(Ordering::SeqCst) != generation {
            self.cache.remove(&key);
        }
        if self.inserts.fetch_add(1, Ordering::Relaxed) % PURGE_INTERVAL == PURGE_INTERVAL - 1 {
            self.purge_expired();
        }
    }
}

#[async_trait]
impl MembershipStore for CachedMembershipStore {
    async fn lookup_membership(
        &self,
        user_id: UserId,
        project_id: ProjectId,
    ) -> StoreResult<Option<Membership>> {
        let key = (user_id, project_id);
        if let Some(membership) = self.cached(&key) {
            metrics::counter!("trellis_authz_membership_cache_total", "result" => "hit")
                .increment(1);
            return Ok(membership);
        }
        metrics::counter!("trellis_authz_membership_cache_total", "result" => "miss").increment(1);

        let generation = self.generation.load(Ordering::SeqCst);
        let membership = self.inner.lookup_membership(user_id, project_id).await?;
        self.store(key, membership.clone(), generation);
        Ok(membership)
    }

    fn backend_name(&self) -> &'static str {
        self.inner.backend_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;
    use crate::store::memory::InMemoryMembershipStore;
    use crate::{Project, Role};
    use std::sync::atomic::AtomicBool;
    use tokio::sync::Notify;

    struct CountingStore {
        inner: InMemoryMembershipStore,
        lookups: AtomicUsize,
        fail: AtomicBool,
    }

    #[async_trait]
    impl MembershipStore for CountingStore {
        async fn lookup_membership(
            &self,
            user_id: UserId,
            project_id: ProjectId,
        ) -> StoreResult<Option<Membership>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("counting store offline".to_string()));
            }
            self.inner.lookup_membership(user_id, project_id).await
        }

        fn backend_name(&self) -> &'static str {
            "counting"
        }
    }

    fn counting(fail: bool) -> Arc<CountingStore> {
        Arc::new(CountingStore {
            inner: InMemoryMembershipStore::new(),
            lookups: AtomicUsize::new(0),
            fail: AtomicBool::new(fail),
        })
    }

    /// Reads the inner store, then parks until released.
    struct PausingStore {
        inner: InMemoryMembershipStore,
        read_done: Notify,
        release: Notify,
    }

    #[async_trait]
    impl MembershipStore for PausingStore {
        async fn lookup_membership(
            &self,
            user_id: UserId,
            project_id: ProjectId,
        ) -> StoreResult<Option<Membership>> {
            let found = self.inner.lookup_membership(user_id, project_id).await;
            self.read_done.notify_one();
            self.release.notified().await;
            found
        }

        fn backend_name(&self) -> &'static str {
            "pausing"
        }
    }

    #[tokio::test]
    async fn repeated_lookups_hit_the_cache() {
        let backing = counting(false);
        let project = Project::new(UserId::new());
        let user = UserId::new();
        backing
            .inner
            .add_membership(Membership::new(user, Role::new(project.id, "dev", ["view_uss"])))
            .await
            .expect("add");
        let cached = CachedMembershipStore::new(backing.clone(), Duration::from_secs(60));

        for _ in 0..3 {
            let found = cached
                .lookup_membership(user, project.id)
                .await
                .expect("lookup");
            assert!(found.is_some());
        }
        assert_eq!(backing.lookups.load(Ordering::SeqCst), 1);
        assert_eq!(cached.backend_name(), "counting");
    }

    #[tokio::test]
    async fn negative_results_are_cached_until_invalidated() {
        let backing = counting(false);
        let project = Project::new(UserId::new());
        let user = UserId::new();
        let cached = CachedMembershipStore::new(backing.clone(), Duration::from_secs(60));

        assert!(
            cached
                .lookup_membership(user, project.id)
                .await
                .expect("lookup")
                .is_none()
        );
        backing
            .inner
            .add_membership(Membership::new(user, Role::new(project.id, "dev", ["view_uss"])))
            .await
            .expect("add");
        assert!(
            cached
                .lookup_membership(user, project.id)
                .await
                .expect("lookup")
                .is_none()
        );

        cached.invalidate_membership(user, project.id);
        assert!(
            cached
                .lookup_membership(user, project.id)
                .await
                .expect("lookup")
                .is_some()
        );
        assert_eq!(backing.lookups.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalidate_project_only_drops_that_project() {
        let backing = counting(false);
        let first = Project::new(UserId::new());
        let second = Project::new(UserId::new());
        let user = UserId::new();
        let cached = CachedMembershipStore::new(backing.clone(), Duration::from_secs(60));

        cached.lookup_membership(user, first.id).await.expect("lookup");
        cached.lookup_membership(user, second.id).await.expect("lookup");
        assert_eq!(cached.len(), 2);

        cached.invalidate_project(first.id);
        assert_eq!(cached.len(), 1);

        cached.invalidate_all();
        assert!(cached.is_empty());
    }

    #[tokio::test]
    async fn expired_entries_are_refetched() {
        let backing = counting(false);
        let project = Project::new(UserId::new());
        let user = UserId::new();
        let cached = CachedMembershipStore::new(backing.clone(), Duration::ZERO);

        cached.lookup_membership(user, project.id).await.expect("lookup");
        cached.lookup_membership(user, project.id).await.expect("lookup");
        assert_eq!(backing.lookups.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn store_errors_are_not_cached() {
        let backing = counting(true);
        let cached = CachedMembershipStore::new(backing.clone(), Duration::from_secs(60));
        let project = Project::new(UserId::new());

        let err = cached
            .lookup_membership(UserId::new(), project.id)
            .await
            .expect_err("offline");
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert!(cached.is_empty());
    }

    #[tokio::test]
    async fn invalidation_during_inflight_read_is_not_undone() {
        let backing = Arc::new(PausingStore {
            inner: InMemoryMembershipStore::new(),
            read_done: Notify::new(),
            release: Notify::new(),
        });
        let project = Project::new(UserId::new());
        let user = UserId::new();
        backing
            .inner
            .add_membership(Membership::new(user, Role::new(project.id, "dev", ["view_uss"])))
            .await
            .expect("add");
        let cached = CachedMembershipStore::new(backing.clone(), Duration::from_secs(60));

        let reader = {
            let cached = cached.clone();
            tokio::spawn(async move { cached.lookup_membership(user, project.id).await })
        };
        backing.read_done.notified().await;
        backing
            .inner
            .remove_membership(user, project.id)
            .await
            .expect("remove");
        cached.invalidate_membership(user, project.id);
        backing.release.notify_one();

        let stale = reader.await.expect("join").expect("lookup");
        assert!(stale.is_some());
        assert!(cached.is_empty());

        let reader = {
            let cached = cached.clone();
            tokio::spawn(async move { cached.lookup_membership(user, project.id).await })
        };
        backing.read_done.notified().await;
        backing.release.notify_one();
        let fresh = reader.await.expect("join").expect("lookup");
        assert!(fresh.is_none());
    }

    #[tokio::test]
    async fn expired_entry_is_evicted_on_lookup() {
        let backing = counting(false);
        let project = Project::new(UserId::new());
        let user = UserId::new();
        let cached = CachedMembershipStore::new(backing.clone(), Duration::from_millis(20));

        cached.lookup_membership(user, project.id).await.expect("lookup");
        assert_eq!(cached.len(), 1);
        tokio::time::sleep(Duration::from_millis(40)).await;

        backing.fail.store(true, Ordering::SeqCst);
        cached
            .lookup_membership(user, project.id)
            .await
            .expect_err("offline");
        assert!(cached.is_empty());
    }

    #[tokio::test]
    async fn purge_drops_only_expired_entries() {
        let backing = counting(false);
        let project = Project::new(UserId::new());
        let short = CachedMembershipStore::new(backing.clone(), Duration::from_millis(20));
        for _ in 0..3 {
            short.lookup_membership(UserId::new(), project.id).await.expect("lookup");
        }
        assert_eq!(short.len(), 3);
        tokio::time::sleep(Duration::from_millis(40)).await;
        short.purge_expired();
        assert!(short.is_empty());

        let long = CachedMembershipStore::new(backing, Duration::from_secs(60));
        long.lookup_membership(UserId::new(), project.id).await.expect("lookup");
        long.purge_expired();
        assert_eq!(long.len(), 1);
    }
}
