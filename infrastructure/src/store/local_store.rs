//! Local store adapter.
//!
//! Implements both [`KnowledgeStore`] and [`CascadeStore`] over one
//! [`StoreState`]. Without a path the state lives in memory only. With a
//! path, every mutation rewrites the whole snapshot through a temporary
//! file followed by a rename, so a crash leaves either the old or the new
//! snapshot on disk.
//!
//! Mutations run against a copy of the state. The copy only replaces the
//! live state once its snapshot is written, so a failed write leaves
//! nothing behind in memory either.

use super::state::StoreState;
use agora_application::{CascadeStore, KnowledgeStore, StoreError};
use agora_domain::{
    AgentId, CascadeTask, CascadeTransition, Decision, Fact, FactKey, FactWriteOutcome,
    IdempotencyKey, Proposal, ProposalId, ProposalStatus, RosterMember, TraceId,
    TransitionOutcome, Vote,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

pub struct LocalStore {
    state: Mutex<StoreState>,
    path: Option<PathBuf>,
}

impl LocalStore {
    /// Store that forgets everything when dropped
    pub fn in_memory() -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            path: None,
        }
    }

    /// Open (or start) a JSON snapshot at `path`
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let state = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let state: StoreState = serde_json::from_slice(&bytes)
                    .map_err(|e| StoreError::Serialization(format!("{}: {}", path.display(), e)))?;
                info!("Loaded state snapshot {}", path.display());
                state
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No snapshot at {}; starting empty", path.display());
                StoreState::default()
            }
            Err(e) => return Err(io_error(&path, e)),
        };
        Ok(Self {
            state: Mutex::new(state),
            path: Some(path),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Apply `change` to a copy of the state, persist it, then swap it in.
    ///
    /// `change` returns its result and whether the state needs writing.
    async fn commit<T, F>(&self, change: F) -> Result<T, StoreError>
    where
        T: Send,
        F: FnOnce(&mut StoreState) -> Result<(T, bool), StoreError> + Send,
    {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        let (value, dirty) = change(&mut next)?;
        if dirty {
            self.persist(&next).await?;
            *state = next;
        }
        Ok(value)
    }

    async fn persist(&self, state: &StoreState) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let bytes = serde_json::to_vec_pretty(state)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(parent, e))?;
        }
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| io_error(&tmp, e))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| io_error(path, e))?;
        debug!("Wrote snapshot {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }
}

fn io_error(path: &Path, e: std::io::Error) -> StoreError {
    StoreError::Io(format!("{}: {}", path.display(), e))
}

#[async_trait]
impl KnowledgeStore for LocalStore {
    async fn create_proposal(&self, proposal: &Proposal) -> Result<(), StoreError> {
        self.commit(|state| state.create_proposal(proposal).map(|()| ((), true)))
            .await
    }

    async fn get_proposal(&self, id: &ProposalId) -> Result<Proposal, StoreError> {
        self.state.lock().await.get_proposal(id)
    }

    async fn list_proposals(
        &self,
        group: Option<&str>,
        status: Option<ProposalStatus>,
    ) -> Result<Vec<Proposal>, StoreError> {
        Ok(self.state.lock().await.list_proposals(group, status))
    }

    async fn update_proposal_decision(
        &self,
        id: &ProposalId,
        decision: &Decision,
    ) -> Result<bool, StoreError> {
        self.commit(|state| {
            let written = state.update_proposal_decision(id, decision)?;
            Ok((written, written))
        })
        .await
    }

    async fn upsert_vote(&self, vote: &Vote) -> Result<bool, StoreError> {
        self.commit(|state| {
            let stored = state.upsert_vote(vote);
            Ok((stored, stored))
        })
        .await
    }

    async fn list_votes(&self, proposal_id: &ProposalId) -> Result<Vec<Vote>, StoreError> {
        Ok(self.state.lock().await.list_votes(proposal_id))
    }

    async fn get_fact_latest(&self, key: &FactKey) -> Result<Option<Fact>, StoreError> {
        Ok(self.state.lock().await.get_fact_latest(key))
    }

    async fn upsert_fact_latest(&self, fact: &Fact) -> Result<FactWriteOutcome, StoreError> {
        self.commit(|state| {
            let outcome = state.upsert_fact_latest(fact);
            let dirty = outcome.incoming_is_latest();
            Ok((outcome, dirty))
        })
        .await
    }

    async fn list_facts(&self, group: Option<&str>) -> Result<Vec<Fact>, StoreError> {
        Ok(self.state.lock().await.list_facts(group))
    }

    async fn fact_history(&self, key: &FactKey) -> Result<Vec<Fact>, StoreError> {
        Ok(self.state.lock().await.fact_history(key))
    }

    async fn count_facts(&self, group: Option<&str>) -> Result<usize, StoreError> {
        Ok(self.state.lock().await.list_facts(group).len())
    }

    async fn list_group_members(&self, group: &str) -> Result<Vec<RosterMember>, StoreError> {
        Ok(self.state.lock().await.list_group_members(group))
    }

    async fn record_presence(
        &self,
        group: &str,
        agent: &AgentId,
        seen_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.commit(|state| {
            state.record_presence(group, agent, seen_at);
            Ok(((), true))
        })
        .await
    }

    async fn record_capabilities(
        &self,
        group: &str,
        agent: &AgentId,
        capabilities: &[String],
        seen_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.commit(|state| {
            state.record_capabilities(group, agent, capabilities, seen_at);
            Ok(((), true))
        })
        .await
    }

    async fn is_applied(&self, key: &IdempotencyKey) -> Result<bool, StoreError> {
        Ok(self.state.lock().await.is_applied(key))
    }

    async fn mark_applied(&self, key: &IdempotencyKey) -> Result<(), StoreError> {
        self.commit(|state| Ok(((), state.mark_applied(key)))).await
    }
}

#[async_trait]
impl CascadeStore for LocalStore {
    async fn create_cascade_task(&self, task: &CascadeTask) -> Result<(), StoreError> {
        self.commit(|state| state.create_cascade_task(task).map(|()| ((), true)))
            .await
    }

    async fn get_cascade_task(
        &self,
        trace_id: &TraceId,
        task_id: &str,
    ) -> Result<CascadeTask, StoreError> {
        self.state.lock().await.get_cascade_task(trace_id, task_id)
    }

    async fn advance_cascade_task(
        &self,
        transition: CascadeTransition,
    ) -> Result<TransitionOutcome, StoreError> {
        self.commit(|state| {
            let outcome = state.advance_cascade_task(transition)?;
            let dirty = !outcome.replayed;
            Ok((outcome, dirty))
        })
        .await
    }

    async fn list_cascade_tasks(
        &self,
        trace_id: &TraceId,
        include_archived: bool,
    ) -> Result<Vec<CascadeTask>, StoreError> {
        Ok(self
            .state
            .lock()
            .await
            .list_cascade_tasks(trace_id, include_archived))
    }

    async fn list_cascade_transitions(
        &self,
        trace_id: &TraceId,
        task_id: Option<&str>,
    ) -> Result<Vec<CascadeTransition>, StoreError> {
        Ok(self
            .state
            .lock()
            .await
            .list_cascade_transitions(trace_id, task_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_domain::VoteValue;

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[tokio::test]
    async fn test_in_memory_store_has_no_path() {
        let store = LocalStore::in_memory();
        assert!(store.path().is_none());
        let proposal = Proposal::new("ops", "", "s", "lead:1", t0());
        store.create_proposal(&proposal).await.unwrap();
        assert_eq!(store.get_proposal(&proposal.id).await.unwrap(), proposal);
    }

    #[tokio::test]
    async fn test_snapshot_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("agora.json");

        let proposal = Proposal::new("ops", "deploys", "Tuesdays", "lead:1", t0()).with_id("p-1");
        {
            let store = LocalStore::open(&path).await.unwrap();
            store.create_proposal(&proposal).await.unwrap();
            store
                .upsert_vote(&Vote::new("p-1", "scout:2", VoteValue::Yes, ""))
                .await
                .unwrap();
            store
                .mark_applied(&IdempotencyKey::vote("p-1", "scout:2"))
                .await
                .unwrap();
        }
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());

        let reopened = LocalStore::open(&path).await.unwrap();
        assert_eq!(reopened.list_proposals(None, None).await.unwrap().len(), 1);
        assert_eq!(
            reopened.list_votes(&ProposalId::new("p-1")).await.unwrap().len(),
            1
        );
        assert!(
            reopened
                .is_applied(&IdempotencyKey::vote("p-1", "scout:2"))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_failed_write_leaves_no_change_in_memory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agora.json");
        let store = LocalStore::open(&path).await.unwrap();

        // a directory where the temporary snapshot goes makes every write fail
        let blocker = path.with_extension("json.tmp");
        std::fs::create_dir(&blocker).unwrap();

        let proposal = Proposal::new("ops", "deploys", "Tuesdays", "lead:1", t0()).with_id("p-1");
        let first = store.create_proposal(&proposal).await.unwrap_err();
        assert!(matches!(first, StoreError::Io(_)));
        let retry = store.create_proposal(&proposal).await.unwrap_err();
        assert!(matches!(retry, StoreError::Io(_)), "got {:?}", retry);
        assert!(
            store
                .get_proposal(&proposal.id)
                .await
                .unwrap_err()
                .is_not_found()
        );
        assert!(
            store
                .mark_applied(&IdempotencyKey::proposal("p-1"))
                .await
                .is_err()
        );
        assert!(
            !store
                .is_applied(&IdempotencyKey::proposal("p-1"))
                .await
                .unwrap()
        );

        std::fs::remove_dir(&blocker).unwrap();
        store.create_proposal(&proposal).await.unwrap();
        let reopened = LocalStore::open(&path).await.unwrap();
        assert_eq!(reopened.get_proposal(&proposal.id).await.unwrap(), proposal);
    }

    #[tokio::test]
    async fn test_failed_cascade_write_keeps_previous_status() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agora.json");
        let store = LocalStore::open(&path).await.unwrap();
        let task = CascadeTask::new("trace-1", "build", 1, "Build", t0());
        store.create_cascade_task(&task).await.unwrap();

        let blocker = path.with_extension("json.tmp");
        std::fs::create_dir(&blocker).unwrap();
        let start = CascadeTransition::new(
            &task,
            agora_domain::CascadeStatus::Running,
            AgentId::new("ci:1"),
            "",
            serde_json::Value::Null,
            t0(),
        );
        assert!(store.advance_cascade_task(start.clone()).await.is_err());
        let stored = store.get_cascade_task(&task.trace_id, "build").await.unwrap();
        assert_eq!(stored.status, agora_domain::CascadeStatus::Pending);

        std::fs::remove_dir(&blocker).unwrap();
        let outcome = store.advance_cascade_task(start).await.unwrap();
        assert!(!outcome.replayed);
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agora.json");
        std::fs::write(&path, b"{not json").unwrap();
        let err = LocalStore::open(&path).await.err().unwrap();
        assert!(matches!(err, StoreError::Serialization(_)));
    }
}
