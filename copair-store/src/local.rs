//! Local mirror of the authoritative store
//!
//! The mirror is overwritten wholesale on each successful sync and has no
//! independent write authority once connectivity exists. Rows written while
//! offline are flagged `dirty` so a later reconciliation (or cleanup) can
//! find them.

use chrono::{Duration, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use copair_model::{
    Assignment, ApprovedRelation, Dataset, Message, Notification, User,
};

use crate::errors::Result;
use crate::schema::{SCHEMA, SCHEMA_VERSION};

fn assignment_status(assignment: &Assignment) -> &'static str {
    use copair_model::AssignmentStatus::*;
    match assignment.status {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
    }
}

fn relation_status(relation: &ApprovedRelation) -> &'static str {
    use copair_model::RelationStatus::*;
    match relation.status {
        Active => "active",
        Dissociated => "dissociated",
    }
}

fn role_name(user: &User) -> &'static str {
    use copair_model::UserRole::*;
    match user.role() {
        Tutor => "tutor",
        Guardian => "guardian",
        Administrator => "administrator",
    }
}

/// SQLite-backed mirror database
pub struct LocalStore {
    conn: Connection,
}

// SQLite connections can be shared across threads as long as access is
// serialized, which the async wrapper's RwLock guarantees.
unsafe impl Send for LocalStore {}
unsafe impl Sync for LocalStore {}

impl LocalStore {
    /// Open or create a mirror database
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        let mut store = Self { conn };
        store.initialize()?;
        Ok(store)
    }

    /// Create an in-memory mirror (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let mut store = Self { conn };
        store.initialize()?;
        Ok(store)
    }

    fn initialize(&mut self) -> Result<()> {
        let version: Option<u32> = self
            .conn
            .query_row(
                "SELECT version FROM schema_version ORDER BY version DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .ok();

        match version {
            None => {
                info!("Initializing new mirror database schema");
                self.conn.execute_batch(SCHEMA)?;
                self.conn.execute(
                    "INSERT INTO schema_version (version) VALUES (?1)",
                    params![SCHEMA_VERSION],
                )?;
            }
            Some(v) => {
                debug!("Mirror database schema present (version {})", v);
            }
        }

        Ok(())
    }

    // --- users ---

    pub fn upsert_user(&mut self, user: &User, dirty: bool) -> Result<()> {
        let doc = serde_json::to_string(user)?;
        self.conn.execute(
            r#"
            INSERT INTO users (id, role, doc, dirty, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                role = excluded.role,
                doc = excluded.doc,
                dirty = excluded.dirty,
                updated_at = excluded.updated_at
            "#,
            params![
                user.id(),
                role_name(user),
                doc,
                dirty as i64,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    pub fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        let doc: Option<String> = self
            .conn
            .query_row(
                "SELECT doc FROM users WHERE id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .ok();

        match doc {
            Some(doc) => Ok(Some(serde_json::from_str(&doc)?)),
            None => Ok(None),
        }
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        self.list_docs("SELECT doc FROM users ORDER BY id")
    }

    pub fn delete_user(&mut self, user_id: &str) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM users WHERE id = ?1", params![user_id])?;
        Ok(changed > 0)
    }

    // --- assignments ---

    pub fn upsert_assignment(&mut self, assignment: &Assignment, dirty: bool) -> Result<()> {
        let doc = serde_json::to_string(assignment)?;
        self.conn.execute(
            r#"
            INSERT INTO assignments (id, guardian_id, tutor_id, status, doc, dirty, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                guardian_id = excluded.guardian_id,
                tutor_id = excluded.tutor_id,
                status = excluded.status,
                doc = excluded.doc,
                dirty = excluded.dirty,
                updated_at = excluded.updated_at
            "#,
            params![
                assignment.id,
                assignment.guardian_id,
                assignment.tutor_id,
                assignment_status(assignment),
                doc,
                dirty as i64,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    pub fn list_assignments(&self) -> Result<Vec<Assignment>> {
        self.list_docs("SELECT doc FROM assignments ORDER BY id")
    }

    pub fn delete_assignment(&mut self, assignment_id: &str) -> Result<bool> {
        let changed = self.conn.execute(
            "DELETE FROM assignments WHERE id = ?1",
            params![assignment_id],
        )?;
        Ok(changed > 0)
    }

    // --- relations ---

    pub fn upsert_relation(&mut self, relation: &ApprovedRelation, dirty: bool) -> Result<()> {
        let doc = serde_json::to_string(relation)?;
        self.conn.execute(
            r#"
            INSERT INTO relations (id, guardian_id, tutor_id, status, doc, dirty, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                guardian_id = excluded.guardian_id,
                tutor_id = excluded.tutor_id,
                status = excluded.status,
                doc = excluded.doc,
                dirty = excluded.dirty,
                updated_at = excluded.updated_at
            "#,
            params![
                relation.id,
                relation.guardian_id,
                relation.tutor_id,
                relation_status(relation),
                doc,
                dirty as i64,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    pub fn list_relations(&self) -> Result<Vec<ApprovedRelation>> {
        self.list_docs("SELECT doc FROM relations ORDER BY id")
    }

    // --- messages and notifications ---

    pub fn upsert_message(&mut self, message: &Message, dirty: bool) -> Result<()> {
        let doc = serde_json::to_string(message)?;
        self.conn.execute(
            r#"
            INSERT INTO messages (id, sender_id, recipient_id, doc, dirty, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                sender_id = excluded.sender_id,
                recipient_id = excluded.recipient_id,
                doc = excluded.doc,
                dirty = excluded.dirty,
                updated_at = excluded.updated_at
            "#,
            params![
                message.id,
                message.sender_id,
                message.recipient_id,
                doc,
                dirty as i64,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    pub fn list_messages(&self) -> Result<Vec<Message>> {
        self.list_docs("SELECT doc FROM messages ORDER BY id")
    }

    pub fn upsert_notification(&mut self, notification: &Notification, dirty: bool) -> Result<()> {
        let doc = serde_json::to_string(notification)?;
        self.conn.execute(
            r#"
            INSERT INTO notifications (id, user_id, doc, dirty, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                user_id = excluded.user_id,
                doc = excluded.doc,
                dirty = excluded.dirty,
                updated_at = excluded.updated_at
            "#,
            params![
                notification.id,
                notification.user_id,
                doc,
                dirty as i64,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    pub fn list_notifications(&self) -> Result<Vec<Notification>> {
        self.list_docs("SELECT doc FROM notifications ORDER BY id")
    }

    // --- bulk operations ---

    /// Replace the entire mirror with a freshly pulled dataset in one
    /// transaction. Readers see the old contents in full or the new ones in
    /// full, never a mix.
    pub fn import_all(&mut self, dataset: &Dataset) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;

        for table in ["users", "assignments", "relations", "messages", "notifications"] {
            tx.execute(&format!("DELETE FROM {table}"), [])?;
        }

        for user in &dataset.users {
            let doc = serde_json::to_string(user)?;
            tx.execute(
                "INSERT INTO users (id, role, doc, dirty, updated_at) VALUES (?1, ?2, ?3, 0, ?4)",
                params![user.id(), role_name(user), doc, now],
            )?;
        }
        for assignment in &dataset.assignments {
            let doc = serde_json::to_string(assignment)?;
            tx.execute(
                "INSERT INTO assignments (id, guardian_id, tutor_id, status, doc, dirty, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
                params![
                    assignment.id,
                    assignment.guardian_id,
                    assignment.tutor_id,
                    assignment_status(assignment),
                    doc,
                    now
                ],
            )?;
        }
        for relation in &dataset.relations {
            let doc = serde_json::to_string(relation)?;
            tx.execute(
                "INSERT INTO relations (id, guardian_id, tutor_id, status, doc, dirty, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
                params![
                    relation.id,
                    relation.guardian_id,
                    relation.tutor_id,
                    relation_status(relation),
                    doc,
                    now
                ],
            )?;
        }
        for message in &dataset.messages {
            let doc = serde_json::to_string(message)?;
            tx.execute(
                "INSERT INTO messages (id, sender_id, recipient_id, doc, dirty, updated_at)
                 VALUES (?1, ?2, ?3, ?4, 0, ?5)",
                params![message.id, message.sender_id, message.recipient_id, doc, now],
            )?;
        }
        for notification in &dataset.notifications {
            let doc = serde_json::to_string(notification)?;
            tx.execute(
                "INSERT INTO notifications (id, user_id, doc, dirty, updated_at)
                 VALUES (?1, ?2, ?3, 0, ?4)",
                params![notification.id, notification.user_id, doc, now],
            )?;
        }

        tx.commit()?;
        debug!(
            users = dataset.users.len(),
            assignments = dataset.assignments.len(),
            relations = dataset.relations.len(),
            "Mirror replaced"
        );
        Ok(())
    }

    /// Read the full mirror contents
    pub fn export_all(&self) -> Result<Dataset> {
        Ok(Dataset {
            users: self.list_users()?,
            assignments: self.list_assignments()?,
            relations: self.list_relations()?,
            messages: self.list_messages()?,
            notifications: self.list_notifications()?,
        })
    }

    /// Local half of the user deletion cascade: remove or neutralize every
    /// reference to the user, then delete the user row itself. Runs in one
    /// transaction.
    pub fn remove_user_references(
        &mut self,
        user_id: &str,
        actor: &str,
        dirty: bool,
    ) -> Result<()> {
        let now = Utc::now();
        let now_text = now.to_rfc3339();

        // Collect the rows that need document rewrites before mutating.
        let relations: Vec<ApprovedRelation> = self
            .list_relations()?
            .into_iter()
            .filter(|r| r.is_active() && (r.guardian_id == user_id || r.tutor_id == user_id))
            .collect();
        let users: Vec<User> = self.list_users()?;

        let tx = self.conn.transaction()?;

        tx.execute(
            "DELETE FROM messages WHERE sender_id = ?1 OR recipient_id = ?1",
            params![user_id],
        )?;
        tx.execute(
            "DELETE FROM notifications WHERE user_id = ?1",
            params![user_id],
        )?;
        tx.execute(
            "DELETE FROM assignments WHERE status = 'pending' AND (guardian_id = ?1 OR tutor_id = ?1)",
            params![user_id],
        )?;

        for mut relation in relations {
            relation.dissociate(actor, now);
            let doc = serde_json::to_string(&relation)?;
            tx.execute(
                "UPDATE relations SET status = 'dissociated', doc = ?2, dirty = ?3, updated_at = ?4 WHERE id = ?1",
                params![relation.id, doc, dirty as i64, now_text],
            )?;
        }

        for user in users {
            let rewritten = match user {
                User::Guardian(mut guardian)
                    if guardian.assigned_tutor.as_deref() == Some(user_id) =>
                {
                    guardian.assigned_tutor = None;
                    Some(User::Guardian(guardian))
                }
                User::Tutor(mut tutor)
                    if tutor.assigned_learners.iter().any(|l| l == user_id) =>
                {
                    tutor.assigned_learners.retain(|l| l != user_id);
                    Some(User::Tutor(tutor))
                }
                _ => None,
            };
            if let Some(user) = rewritten {
                let doc = serde_json::to_string(&user)?;
                tx.execute(
                    "UPDATE users SET doc = ?2, dirty = ?3, updated_at = ?4 WHERE id = ?1",
                    params![user.id(), doc, dirty as i64, now_text],
                )?;
            }
        }

        tx.execute("DELETE FROM users WHERE id = ?1", params![user_id])?;
        tx.commit()?;

        debug!(user_id, "Removed local references to deleted user");
        Ok(())
    }

    /// Drop dirty (offline-born) rows older than the cutoff. Rows written
    /// by a sync are never stale: every pull replaces them wholesale.
    pub fn cleanup_stale(&mut self, max_age: Duration) -> Result<usize> {
        let cutoff = (Utc::now() - max_age).to_rfc3339();
        let mut removed = 0;
        for table in ["users", "assignments", "relations", "messages", "notifications"] {
            removed += self.conn.execute(
                &format!("DELETE FROM {table} WHERE dirty = 1 AND updated_at < ?1"),
                params![cutoff],
            )?;
        }
        if removed > 0 {
            info!(removed, "Cleaned up stale offline rows");
        }
        Ok(removed)
    }

    fn list_docs<T: serde::de::DeserializeOwned>(&self, sql: &str) -> Result<Vec<T>> {
        let mut stmt = self.conn.prepare(sql)?;
        let docs = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;

        let mut items = Vec::with_capacity(docs.len());
        for doc in docs {
            items.push(serde_json::from_str(&doc)?);
        }
        Ok(items)
    }
}

/// Async-safe wrapper around [`LocalStore`] so the mirror can be shared
/// across tasks and await points.
#[derive(Clone)]
pub struct AsyncLocalStore {
    inner: Arc<RwLock<LocalStore>>,
}

impl AsyncLocalStore {
    pub fn new(store: LocalStore) -> Self {
        Self {
            inner: Arc::new(RwLock::new(store)),
        }
    }

    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(LocalStore::open(path)?))
    }

    pub async fn open_in_memory() -> Result<Self> {
        Ok(Self::new(LocalStore::open_in_memory()?))
    }

    pub async fn upsert_user(&self, user: &User, dirty: bool) -> Result<()> {
        self.inner.write().await.upsert_user(user, dirty)
    }

    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        self.inner.read().await.get_user(user_id)
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.inner.read().await.list_users()
    }

    pub async fn upsert_assignment(&self, assignment: &Assignment, dirty: bool) -> Result<()> {
        self.inner.write().await.upsert_assignment(assignment, dirty)
    }

    pub async fn list_assignments(&self) -> Result<Vec<Assignment>> {
        self.inner.read().await.list_assignments()
    }

    pub async fn delete_assignment(&self, assignment_id: &str) -> Result<bool> {
        self.inner.write().await.delete_assignment(assignment_id)
    }

    pub async fn upsert_relation(&self, relation: &ApprovedRelation, dirty: bool) -> Result<()> {
        self.inner.write().await.upsert_relation(relation, dirty)
    }

    pub async fn list_relations(&self) -> Result<Vec<ApprovedRelation>> {
        self.inner.read().await.list_relations()
    }

    pub async fn import_all(&self, dataset: &Dataset) -> Result<()> {
        self.inner.write().await.import_all(dataset)
    }

    pub async fn export_all(&self) -> Result<Dataset> {
        self.inner.read().await.export_all()
    }

    pub async fn remove_user_references(
        &self,
        user_id: &str,
        actor: &str,
        dirty: bool,
    ) -> Result<()> {
        self.inner
            .write()
            .await
            .remove_user_references(user_id, actor, dirty)
    }

    pub async fn cleanup_stale(&self, max_age: Duration) -> Result<usize> {
        self.inner.write().await.cleanup_stale(max_age)
    }
}
