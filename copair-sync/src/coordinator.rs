//! Sync coordinator: single-writer synchronization over the stores
//!
//! The coordinator is a long-lived handle constructed once at process start
//! and shared by `Arc`. It owns the sync lifecycle (IDLE / SYNCING /
//! OFFLINE), the trigger queue that serializes sync runs, the cache
//! snapshot concurrent readers fall back to mid-sync, and the write-through
//! path every mutation takes (remote first, then the local mirror).

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use copair_model::{Assignment, ApprovedRelation, Dataset, NewAssignment, User};
use copair_store::{AsyncLocalStore, RemoteStore};

use crate::cache::CacheLayer;
use crate::errors::{Result, SyncError};
use crate::events::SyncEvent;
use crate::queue::{Admission, SyncTrigger, TriggerQueue};

/// Configuration for the sync coordinator
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Period of the background sync timer
    pub sync_interval: Duration,
    /// Upper bound on the connectivity probe
    pub probe_timeout: Duration,
    /// Capacity of the sync-completed broadcast channel
    pub event_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            sync_interval: Duration::from_secs(5),
            probe_timeout: Duration::from_secs(10),
            event_capacity: 64,
        }
    }
}

/// Coordinator lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// No sync in progress, reads come from the local mirror
    Idle,
    /// A pull is in flight, reads come from the cache snapshot
    Syncing,
    /// Remote unreachable, writes degrade to local-only
    Offline,
}

/// Observable sync status for presentation layers
#[derive(Debug, Clone)]
pub struct SyncStatus {
    pub online: bool,
    pub syncing: bool,
    pub last_sync: Option<DateTime<Utc>>,
}

/// Coordinates synchronization between the remote store and the local
/// mirror, and provides the write-through path used by every mutation.
pub struct SyncCoordinator {
    config: SyncConfig,
    remote: Arc<dyn RemoteStore>,
    local: AsyncLocalStore,
    cache: CacheLayer,
    state: RwLock<SyncState>,
    queue: Mutex<TriggerQueue>,
    last_sync: RwLock<Option<DateTime<Utc>>>,
    events: broadcast::Sender<SyncEvent>,
}

impl SyncCoordinator {
    /// Create a coordinator, priming the cache from whatever the local
    /// mirror already holds (warm start after a restart).
    pub async fn new(
        config: SyncConfig,
        remote: Arc<dyn RemoteStore>,
        local: AsyncLocalStore,
    ) -> Result<Self> {
        let (events, _) = broadcast::channel(config.event_capacity);
        let cache = CacheLayer::new();

        let mirrored = local.export_all().await?;
        if !mirrored.is_empty() {
            cache.refresh(mirrored).await;
        }

        Ok(Self {
            config,
            remote,
            local,
            cache,
            state: RwLock::new(SyncState::Idle),
            queue: Mutex::new(TriggerQueue::default()),
            last_sync: RwLock::new(None),
            events,
        })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub async fn state(&self) -> SyncState {
        *self.state.read().await
    }

    /// Subscribe to sync-completed events
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    pub async fn get_sync_status(&self) -> SyncStatus {
        let state = self.state().await;
        SyncStatus {
            online: state != SyncState::Offline,
            syncing: state == SyncState::Syncing,
            last_sync: *self.last_sync.read().await,
        }
    }

    /// Staleness of the cache snapshot
    pub async fn cache_age(&self) -> Option<chrono::Duration> {
        self.cache.age().await
    }

    // --- trigger entry point ---

    /// The single entry point every sync trigger funnels into. If a sync is
    /// already running the request is queued (FIFO, coalesced per kind) and
    /// executed after the current run completes.
    pub async fn enqueue_sync(&self, trigger: SyncTrigger) {
        let admission = self.queue.lock().await.admit(trigger);
        match admission {
            Admission::RunNow => {
                let _ = self.drain_from(trigger).await;
            }
            Admission::Queued => debug!(?trigger, "Sync in flight, trigger queued"),
            Admission::Coalesced => debug!(?trigger, "Trigger coalesced with pending request"),
        }
    }

    /// Probe connectivity and run a full pull, waiting behind an in-flight
    /// sync if necessary. Returns the outcome of this run as a value.
    pub async fn force_sync(&self) -> Result<()> {
        // Subscribe before admitting so a queued run's completion event
        // cannot slip past us.
        let mut events = self.subscribe();
        let admission = self.queue.lock().await.admit(SyncTrigger::Manual);
        match admission {
            Admission::RunNow => self.drain_from(SyncTrigger::Manual).await,
            Admission::Queued | Admission::Coalesced => loop {
                match events.recv().await {
                    Ok(SyncEvent::Completed {
                        trigger: SyncTrigger::Manual,
                        success,
                        ..
                    }) => {
                        return if success { Ok(()) } else { Err(SyncError::Offline) };
                    }
                    Ok(_) => continue,
                    Err(_) => return Err(SyncError::Offline),
                }
            },
        }
    }

    /// React to a host connectivity signal: loss moves any state to
    /// OFFLINE, restoration schedules an immediate resync.
    pub async fn handle_connectivity(&self, online: bool) {
        if online {
            info!("Connectivity restored, resyncing");
            self.enqueue_sync(SyncTrigger::ConnectivityRestored).await;
        } else {
            warn!("Connectivity lost, entering offline mode");
            self.set_state(SyncState::Offline).await;
        }
    }

    /// React to the host window regaining focus
    pub async fn handle_focus(&self) {
        self.enqueue_sync(SyncTrigger::FocusRegained).await;
    }

    // --- reads ---

    /// Users from the live mirror when idle, or from the cache snapshot
    /// while a sync is in flight. Never blocks on network I/O.
    pub async fn get_users(&self) -> Vec<User> {
        if self.state().await == SyncState::Syncing {
            return self.cache.snapshot().await.dataset.users.clone();
        }
        match self.local.list_users().await {
            Ok(users) => users,
            Err(e) => {
                warn!(error = %e, "Local read failed, serving cache snapshot");
                self.cache.snapshot().await.dataset.users.clone()
            }
        }
    }

    pub async fn get_assignments(&self) -> Vec<Assignment> {
        if self.state().await == SyncState::Syncing {
            return self.cache.snapshot().await.dataset.assignments.clone();
        }
        match self.local.list_assignments().await {
            Ok(assignments) => assignments,
            Err(e) => {
                warn!(error = %e, "Local read failed, serving cache snapshot");
                self.cache.snapshot().await.dataset.assignments.clone()
            }
        }
    }

    pub async fn get_relations(&self) -> Vec<ApprovedRelation> {
        if self.state().await == SyncState::Syncing {
            return self.cache.snapshot().await.dataset.relations.clone();
        }
        match self.local.list_relations().await {
            Ok(relations) => relations,
            Err(e) => {
                warn!(error = %e, "Local read failed, serving cache snapshot");
                self.cache.snapshot().await.dataset.relations.clone()
            }
        }
    }

    /// One consistent view of the current data, for batch consumers such as
    /// the matching engine.
    pub async fn current_dataset(&self) -> Dataset {
        if self.state().await == SyncState::Syncing {
            return self.cache.snapshot().await.dataset.clone();
        }
        match self.local.export_all().await {
            Ok(dataset) => dataset,
            Err(e) => {
                warn!(error = %e, "Local read failed, serving cache snapshot");
                self.cache.snapshot().await.dataset.clone()
            }
        }
    }

    // --- user write-through ---

    /// Create a user: remote first, then the local mirror. While OFFLINE
    /// the write lands in the mirror only, flagged for reconciliation.
    pub async fn create_user(&self, user: User) -> Result<User> {
        if self.state().await == SyncState::Offline {
            warn!(user_id = user.id(), "Offline: creating user locally only");
            self.local.upsert_user(&user, true).await?;
            self.refresh_cache_from_local().await;
            return Ok(user);
        }

        let created = self.remote.create_user(user).await?;
        self.local.upsert_user(&created, false).await?;
        self.refresh_cache_from_local().await;
        self.schedule_followup().await;
        Ok(created)
    }

    pub async fn update_user(&self, user: User) -> Result<User> {
        if self.state().await == SyncState::Offline {
            warn!(user_id = user.id(), "Offline: updating user locally only");
            self.local.upsert_user(&user, true).await?;
            self.refresh_cache_from_local().await;
            return Ok(user);
        }

        let updated = self.remote.update_user(user).await?;
        self.local.upsert_user(&updated, false).await?;
        self.refresh_cache_from_local().await;
        self.schedule_followup().await;
        Ok(updated)
    }

    /// Delete a user and transactionally neutralize every reference to it:
    /// messages, notifications, pending assignments, active relations
    /// (dissociated, never deleted) and learner-roster memberships. A
    /// failing cleanup step is logged and does not abort the rest.
    pub async fn delete_user(&self, user_id: &str, actor: &str) -> Result<()> {
        if self.state().await == SyncState::Offline {
            warn!(user_id, "Offline: deleting user locally only");
            self.local.remove_user_references(user_id, actor, true).await?;
            self.refresh_cache_from_local().await;
            return Ok(());
        }

        match self.remote.delete_messages_involving(user_id).await {
            Ok(n) => debug!(user_id, removed = n, "Removed messages for deleted user"),
            Err(e) => warn!(user_id, error = %e, "Failed to remove messages, continuing"),
        }
        match self.remote.delete_notifications_for(user_id).await {
            Ok(n) => debug!(user_id, removed = n, "Removed notifications for deleted user"),
            Err(e) => warn!(user_id, error = %e, "Failed to remove notifications, continuing"),
        }

        match self.remote.list_assignments().await {
            Ok(assignments) => {
                for assignment in assignments.iter().filter(|a| {
                    a.is_pending() && (a.guardian_id == user_id || a.tutor_id == user_id)
                }) {
                    if let Err(e) = self.remote.delete_assignment(&assignment.id).await {
                        warn!(assignment_id = %assignment.id, error = %e,
                              "Failed to remove pending assignment, continuing");
                    }
                }
            }
            Err(e) => warn!(user_id, error = %e, "Failed to list assignments, continuing"),
        }

        match self.remote.list_relations().await {
            Ok(relations) => {
                for relation in relations.iter().filter(|r| {
                    r.is_active() && (r.guardian_id == user_id || r.tutor_id == user_id)
                }) {
                    if let Err(e) = self
                        .remote
                        .dissociate_relation_tx(&relation.guardian_id, &relation.tutor_id, actor)
                        .await
                    {
                        warn!(relation_id = %relation.id, error = %e,
                              "Failed to dissociate relation, continuing");
                    }
                }
            }
            Err(e) => warn!(user_id, error = %e, "Failed to list relations, continuing"),
        }

        // Dangling list-field references without a backing active relation
        match self.remote.list_users().await {
            Ok(users) => {
                for user in users {
                    let patched = match user {
                        User::Guardian(mut g) if g.assigned_tutor.as_deref() == Some(user_id) => {
                            g.assigned_tutor = None;
                            Some(User::Guardian(g))
                        }
                        User::Tutor(mut t)
                            if t.assigned_learners.iter().any(|l| l == user_id) =>
                        {
                            t.assigned_learners.retain(|l| l != user_id);
                            Some(User::Tutor(t))
                        }
                        _ => None,
                    };
                    if let Some(patched) = patched {
                        if let Err(e) = self.remote.update_user(patched).await {
                            warn!(user_id, error = %e,
                                  "Failed to clear dangling reference, continuing");
                        }
                    }
                }
            }
            Err(e) => warn!(user_id, error = %e, "Failed to list users, continuing"),
        }

        self.remote.delete_user(user_id).await?;
        info!(user_id, "Deleted user");

        self.local.remove_user_references(user_id, actor, false).await?;
        self.refresh_cache_from_local().await;
        self.schedule_followup().await;
        Ok(())
    }

    // --- assignment / relation write-through (used by the lifecycle) ---

    /// Create a pending assignment through the authoritative checked
    /// procedure. Refused while OFFLINE: pairings have no local authority.
    pub async fn create_assignment(&self, request: NewAssignment) -> Result<Assignment> {
        self.ensure_online().await?;
        let created = self.remote.create_assignment_checked(request).await?;
        self.local.upsert_assignment(&created, false).await?;
        self.refresh_cache_from_local().await;
        self.schedule_followup().await;
        Ok(created)
    }

    pub async fn remove_assignment(&self, assignment_id: &str) -> Result<()> {
        self.ensure_online().await?;
        self.remote.delete_assignment(assignment_id).await?;
        self.local.delete_assignment(assignment_id).await?;
        self.refresh_cache_from_local().await;
        self.schedule_followup().await;
        Ok(())
    }

    /// Atomically approve a pending assignment into an active relation and
    /// mirror the result.
    pub async fn approve_assignment(
        &self,
        assignment_id: &str,
        approver_id: &str,
    ) -> Result<ApprovedRelation> {
        self.ensure_online().await?;
        let relation = self
            .remote
            .approve_assignment_tx(assignment_id, approver_id)
            .await?;

        self.local.delete_assignment(assignment_id).await?;
        self.local.upsert_relation(&relation, false).await?;
        self.mirror_users(&[&relation.guardian_id, &relation.tutor_id]).await;
        self.refresh_cache_from_local().await;
        self.schedule_followup().await;
        Ok(relation)
    }

    /// Atomically dissociate the active relation for a pair and mirror the
    /// result.
    pub async fn dissociate_relation(
        &self,
        guardian_id: &str,
        tutor_id: &str,
        actor_id: &str,
    ) -> Result<ApprovedRelation> {
        self.ensure_online().await?;
        let relation = self
            .remote
            .dissociate_relation_tx(guardian_id, tutor_id, actor_id)
            .await?;

        self.local.upsert_relation(&relation, false).await?;
        self.mirror_users(&[guardian_id, tutor_id]).await;
        self.refresh_cache_from_local().await;
        self.schedule_followup().await;
        Ok(relation)
    }

    /// Run the authoritative relation repair procedure
    pub async fn repair_relations(&self) -> Result<usize> {
        self.ensure_online().await?;
        let fixed = self.remote.repair_relations().await?;
        if fixed > 0 {
            self.schedule_followup().await;
        }
        Ok(fixed)
    }

    /// Run the authoritative assignment repair procedure
    pub async fn repair_assignments(&self) -> Result<usize> {
        self.ensure_online().await?;
        let fixed = self.remote.repair_assignments().await?;
        if fixed > 0 {
            self.schedule_followup().await;
        }
        Ok(fixed)
    }

    /// Garbage-collect abandoned offline-born rows from the mirror
    pub async fn cleanup_stale(&self, max_age: chrono::Duration) -> Result<usize> {
        Ok(self.local.cleanup_stale(max_age).await?)
    }

    // --- internals ---

    async fn ensure_online(&self) -> Result<()> {
        if self.state().await == SyncState::Offline {
            return Err(SyncError::Offline);
        }
        Ok(())
    }

    async fn set_state(&self, state: SyncState) {
        *self.state.write().await = state;
    }

    /// Park a follow-up pull in the queue. It rides along with the
    /// in-flight sync's drain or the next timer tick, and rapid writes
    /// coalesce into a single extra pull.
    async fn schedule_followup(&self) {
        if self.queue.lock().await.defer(SyncTrigger::WriteFollowUp) {
            debug!("Follow-up sync scheduled");
        }
    }

    async fn refresh_cache_from_local(&self) {
        match self.local.export_all().await {
            Ok(dataset) => self.cache.refresh(dataset).await,
            Err(e) => warn!(error = %e, "Cache refresh from mirror failed"),
        }
    }

    /// Re-fetch users whose cross-reference fields a transactional remote
    /// procedure just rewrote, and mirror them. Best-effort: the deferred
    /// follow-up sync trues the mirror up regardless.
    async fn mirror_users(&self, user_ids: &[&str]) {
        for user_id in user_ids {
            match self.remote.get_user(user_id).await {
                Ok(Some(user)) => {
                    if let Err(e) = self.local.upsert_user(&user, false).await {
                        warn!(user_id, error = %e, "Failed to mirror user");
                    }
                }
                Ok(None) => {}
                Err(e) => warn!(user_id, error = %e, "Failed to fetch user for mirroring"),
            }
        }
    }

    fn emit(&self, trigger: SyncTrigger, success: bool) {
        let _ = self.events.send(SyncEvent::Completed {
            trigger,
            success,
            at: Utc::now(),
        });
    }

    /// Run the caller's sync, then keep draining queued triggers in FIFO
    /// order until the queue hands the slot back. Returns the outcome of
    /// the caller's own run.
    async fn drain_from(&self, first: SyncTrigger) -> Result<()> {
        let mut current = first;
        let mut first_result: Option<Result<()>> = None;
        loop {
            let result = self.perform_sync(current).await;
            if let Err(e) = &result {
                warn!(trigger = ?current, error = %e, "Sync failed");
            }
            if first_result.is_none() {
                first_result = Some(result);
            }
            match self.queue.lock().await.complete() {
                Some(next) => current = next,
                None => break,
            }
        }
        first_result.unwrap_or(Ok(()))
    }

    /// One full sync cycle: bounded probe, pull, mirror replace, cache
    /// refresh. Readers only ever see the state flag, the cache, or the
    /// committed mirror.
    async fn perform_sync(&self, trigger: SyncTrigger) -> Result<()> {
        debug!(?trigger, "Starting sync");

        match timeout(self.config.probe_timeout, self.remote.probe()).await {
            Err(_) => {
                self.set_state(SyncState::Offline).await;
                self.emit(trigger, false);
                return Err(SyncError::ProbeTimeout(self.config.probe_timeout));
            }
            Ok(Err(e)) => {
                self.set_state(SyncState::Offline).await;
                self.emit(trigger, false);
                return Err(e.into());
            }
            Ok(Ok(())) => {}
        }

        self.set_state(SyncState::Syncing).await;

        let dataset = match self.remote.fetch_dataset().await {
            Ok(dataset) => dataset,
            Err(e) => {
                self.set_state(SyncState::Offline).await;
                self.emit(trigger, false);
                return Err(e.into());
            }
        };

        if let Err(e) = self.local.import_all(&dataset).await {
            // Remote is fine, the mirror write failed: stay usable.
            self.set_state(SyncState::Idle).await;
            self.emit(trigger, false);
            return Err(e.into());
        }

        self.cache.refresh(dataset).await;
        self.set_state(SyncState::Idle).await;
        *self.last_sync.write().await = Some(Utc::now());
        self.emit(trigger, true);
        info!(?trigger, "Sync completed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use copair_model::{AssignmentCriteria, Guardian, Message, Notification, Tutor};
    use copair_store::MemoryRemoteStore;
    use std::collections::BTreeSet;

    fn guardian(id: &str, area: &str) -> User {
        User::Guardian(Guardian {
            id: id.to_string(),
            display_name: "Grace".to_string(),
            email: format!("{id}@example.com"),
            service_area: Some(area.to_string()),
            grade_level: Some("5".to_string()),
            needs: BTreeSet::new(),
            assigned_tutor: None,
            created_at: Utc::now(),
        })
    }

    fn tutor(id: &str, area: &str) -> User {
        User::Tutor(Tutor {
            id: id.to_string(),
            display_name: "Ada".to_string(),
            email: format!("{id}@example.com"),
            service_area: Some(area.to_string()),
            subjects: BTreeSet::new(),
            grade_levels: BTreeSet::new(),
            assigned_learners: vec![],
            max_learners: 3,
            created_at: Utc::now(),
        })
    }

    fn criteria() -> AssignmentCriteria {
        AssignmentCriteria {
            area_match: true,
            subject_match: false,
            grade_match: false,
        }
    }

    async fn coordinator_with(remote: Arc<MemoryRemoteStore>) -> SyncCoordinator {
        let local = AsyncLocalStore::open_in_memory().await.unwrap();
        SyncCoordinator::new(SyncConfig::default(), remote, local)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_force_sync_pulls_remote_into_mirror() {
        let remote = Arc::new(MemoryRemoteStore::new());
        remote.create_user(guardian("grd_1", "Zone A")).await.unwrap();

        let coordinator = coordinator_with(remote).await;
        assert_eq!(coordinator.state().await, SyncState::Idle);
        assert!(coordinator.get_users().await.is_empty());

        coordinator.force_sync().await.unwrap();
        assert_eq!(coordinator.state().await, SyncState::Idle);

        let users = coordinator.get_users().await;
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].id(), "grd_1");
        assert!(coordinator.get_sync_status().await.last_sync.is_some());
    }

    #[tokio::test]
    async fn test_unreachable_remote_enters_offline() {
        let remote = Arc::new(MemoryRemoteStore::new());
        remote.set_online(false);

        let coordinator = coordinator_with(remote.clone()).await;
        let err = coordinator.force_sync().await.unwrap_err();
        assert!(err.is_connectivity());
        assert_eq!(coordinator.state().await, SyncState::Offline);

        let status = coordinator.get_sync_status().await;
        assert!(!status.online);
        assert!(status.last_sync.is_none());

        // Restoration resyncs immediately
        remote.set_online(true);
        coordinator.handle_connectivity(true).await;
        assert_eq!(coordinator.state().await, SyncState::Idle);
        assert!(coordinator.get_sync_status().await.last_sync.is_some());
    }

    #[tokio::test]
    async fn test_write_through_failure_leaves_local_untouched() {
        let remote = Arc::new(MemoryRemoteStore::new());
        let coordinator = coordinator_with(remote.clone()).await;

        remote.inject_write_failure(Some("backend rejected"));
        let err = coordinator
            .create_user(guardian("grd_1", "Zone A"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SyncError::Store(copair_store::StoreError::WriteRejected(_))
        ));
        assert!(coordinator.get_users().await.is_empty());
    }

    #[tokio::test]
    async fn test_offline_write_lands_locally_only() {
        let remote = Arc::new(MemoryRemoteStore::new());
        let coordinator = coordinator_with(remote.clone()).await;

        coordinator.handle_connectivity(false).await;
        assert_eq!(coordinator.state().await, SyncState::Offline);

        coordinator.create_user(guardian("grd_1", "Zone A")).await.unwrap();
        assert_eq!(coordinator.get_users().await.len(), 1);
        assert!(remote.dump().await.users.is_empty());

        // Assignment writes have no local authority while offline
        let err = coordinator
            .create_assignment(NewAssignment {
                guardian_id: "grd_1".to_string(),
                tutor_id: "tut_1".to_string(),
                compatibility_score: 0.75,
                criteria: criteria(),
                created_by: "adm_1".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Offline));
    }

    #[tokio::test]
    async fn test_delete_user_cascade() {
        let remote = Arc::new(MemoryRemoteStore::new());
        remote.create_user(guardian("grd_1", "Zone A")).await.unwrap();
        remote.create_user(guardian("grd_2", "Zone A")).await.unwrap();
        remote.create_user(tutor("tut_1", "Zone A")).await.unwrap();
        remote.create_user(tutor("tut_2", "Zone A")).await.unwrap();

        // One pending assignment and one approved relation for grd_1
        remote
            .create_assignment_checked(NewAssignment {
                guardian_id: "grd_1".to_string(),
                tutor_id: "tut_2".to_string(),
                compatibility_score: 0.75,
                criteria: criteria(),
                created_by: "adm_1".to_string(),
            })
            .await
            .unwrap();
        let approved = remote
            .create_assignment_checked(NewAssignment {
                guardian_id: "grd_1".to_string(),
                tutor_id: "tut_1".to_string(),
                compatibility_score: 0.85,
                criteria: criteria(),
                created_by: "adm_1".to_string(),
            })
            .await
            .unwrap();
        remote.approve_assignment_tx(&approved.id, "adm_1").await.unwrap();

        let message = Message {
            id: "msg_1".to_string(),
            sender_id: "grd_1".to_string(),
            recipient_id: "tut_1".to_string(),
            body: "hello".to_string(),
            sent_at: Utc::now(),
        };
        let notification = Notification {
            id: "ntf_1".to_string(),
            user_id: "grd_1".to_string(),
            body: "welcome".to_string(),
            created_at: Utc::now(),
            read: false,
        };
        {
            // Seed ancillary entities directly into the authoritative set
            let mut dataset = remote.dump().await;
            dataset.messages.push(message);
            dataset.notifications.push(notification);
            let reseeded = MemoryRemoteStore::with_dataset(dataset);
            let coordinator = coordinator_with(Arc::new(reseeded)).await;
            coordinator.force_sync().await.unwrap();

            coordinator.delete_user("grd_1", "adm_1").await.unwrap();

            let users = coordinator.get_users().await;
            assert!(users.iter().all(|u| u.id() != "grd_1"));

            // Pending assignment removed, relation dissociated but kept
            assert!(coordinator.get_assignments().await.is_empty());
            let relations = coordinator.get_relations().await;
            assert_eq!(relations.len(), 1);
            assert!(!relations[0].is_active());

            // No dangling references anywhere
            for user in users {
                match user {
                    User::Tutor(t) => {
                        assert!(!t.assigned_learners.iter().any(|l| l == "grd_1"))
                    }
                    User::Guardian(g) => {
                        assert_ne!(g.assigned_tutor.as_deref(), Some("grd_1"))
                    }
                    User::Administrator(_) => {}
                }
            }

            let dataset = coordinator.current_dataset().await;
            assert!(dataset.messages.is_empty());
            assert!(dataset.notifications.is_empty());
        }
    }

    #[tokio::test]
    async fn test_sync_completed_event_emitted() {
        let remote = Arc::new(MemoryRemoteStore::new());
        let coordinator = coordinator_with(remote).await;

        let mut events = coordinator.subscribe();
        coordinator.enqueue_sync(SyncTrigger::Manual).await;

        match events.recv().await.unwrap() {
            SyncEvent::Completed { trigger, success, .. } => {
                assert_eq!(trigger, SyncTrigger::Manual);
                assert!(success);
            }
        }
    }
}
