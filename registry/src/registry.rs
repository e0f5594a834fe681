//! The voting registry: owns every session and serialises access to each.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use ballot_types::{Clock, SessionId, VoterId};
use tracing::{debug, info};

use crate::error::RegistryError;
use crate::events::{EventBus, RegistryEvent};
use crate::session::{SessionInfo, SessionSummary, VotingSession};

type SessionHandle = Arc<Mutex<VotingSession>>;

/// Shared store of all voting sessions.
///
/// Each mutating call is atomic with respect to its own checks: `create`
/// holds the table write lock across id allocation and insertion, while
/// `vote` and `finalize` hold only the touched session's mutex across
/// check, write and event emission. Calls on different sessions never
/// contend beyond a brief table read lock.
pub struct VotingRegistry {
    sessions: RwLock<Vec<SessionHandle>>,
    clock: Arc<dyn Clock>,
    events: EventBus,
}

impl VotingRegistry {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: RwLock::new(Vec::new()),
            clock,
            events: EventBus::new(),
        }
    }

    /// Rebuild a registry around already-validated sessions.
    pub(crate) fn from_sessions(sessions: Vec<VotingSession>, clock: Arc<dyn Clock>) -> Self {
        let sessions = sessions
            .into_iter()
            .map(|s| Arc::new(Mutex::new(s)))
            .collect();
        Self {
            sessions: RwLock::new(sessions),
            clock,
            events: EventBus::new(),
        }
    }

    /// Register an observer. Call before sharing the registry.
    pub fn subscribe(&mut self, listener: Box<dyn Fn(&RegistryEvent) + Send + Sync>) {
        self.events.subscribe(listener);
    }

    /// Total sessions ever created; also the next id to be assigned.
    pub fn session_count(&self) -> u64 {
        self.table().len() as u64
    }

    /// Open a new session running from now for `duration_secs`.
    ///
    /// Checks, in order: at least two candidates, positive duration, no
    /// repeated candidate name. A refused call allocates no id.
    pub fn create(
        &self,
        title: impl Into<String>,
        candidates: Vec<String>,
        duration_secs: i64,
    ) -> Result<SessionId, RegistryError> {
        let title = title.into();
        if let Err(e) = validate_create(&candidates, duration_secs) {
            debug!(error = e.kind(), "session creation refused");
            return Err(e);
        }

        let mut table = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let start_time = self.clock.now();
        let end_time = start_time
            .checked_add_secs(duration_secs as u64)
            .ok_or(RegistryError::InvalidDuration)?;
        let session_id = SessionId::new(table.len() as u64);

        let session = VotingSession::open(
            session_id,
            title.clone(),
            candidates.clone(),
            start_time,
            end_time,
        );
        table.push(Arc::new(Mutex::new(session)));

        info!(
            session = %session_id,
            title = %title,
            candidates = candidates.len(),
            start = %start_time,
            end = %end_time,
            "voting session created"
        );
        self.events.emit(&RegistryEvent::SessionCreated {
            session_id,
            title,
            candidates,
            start_time,
            end_time,
        });
        Ok(session_id)
    }

    /// Record `voter`'s vote for `candidate_index`.
    ///
    /// An unknown session is refused as `SessionNotActive`, the same as a
    /// finalized one. Remaining checks, in order: window not yet ended,
    /// first vote from this identity, index in range.
    pub fn vote(
        &self,
        session_id: SessionId,
        candidate_index: usize,
        voter: &VoterId,
    ) -> Result<(), RegistryError> {
        let Some(handle) = self.handle(session_id) else {
            debug!(session = %session_id, voter = %voter, "vote refused: unknown session");
            return Err(RegistryError::SessionNotActive);
        };
        let mut session = lock(&handle);
        let now = self.clock.now();

        if let Err(e) = session.admit_vote(candidate_index, voter, now) {
            debug!(session = %session_id, voter = %voter, error = e.kind(), "vote refused");
            return Err(e);
        }

        debug!(
            session = %session_id,
            voter = %voter,
            candidate = candidate_index,
            count = session.tally[candidate_index],
            "vote accepted"
        );
        self.events.emit(&RegistryEvent::VoteCast {
            session_id,
            voter: voter.clone(),
            candidate_index,
        });
        Ok(())
    }

    /// Close a session whose window has elapsed and publish its tally.
    pub fn finalize(&self, session_id: SessionId) -> Result<(), RegistryError> {
        let handle = self
            .handle(session_id)
            .ok_or(RegistryError::UnknownSession(session_id))?;
        let mut session = lock(&handle);
        let now = self.clock.now();

        if let Err(e) = session.finalize(now) {
            debug!(session = %session_id, error = e.kind(), "finalize refused");
            return Err(e);
        }

        info!(
            session = %session_id,
            total_votes = session.total_votes(),
            tally = ?session.tally,
            "voting session finalized"
        );
        self.events.emit(&RegistryEvent::ResultsCalculated {
            session_id,
            tally: session.tally.clone(),
        });
        Ok(())
    }

    /// Winner names of a finalized session, in candidate order.
    pub fn winners(&self, session_id: SessionId) -> Result<Vec<String>, RegistryError> {
        self.read(session_id, |s| s.winners())?
    }

    pub fn session_info(&self, session_id: SessionId) -> Result<SessionInfo, RegistryError> {
        self.read(session_id, VotingSession::info)
    }

    /// Live counts; readable while the session is still open.
    pub fn tally(&self, session_id: SessionId) -> Result<Vec<u64>, RegistryError> {
        self.read(session_id, |s| s.tally.clone())
    }

    pub fn has_voted(&self, session_id: SessionId, voter: &VoterId) -> Result<bool, RegistryError> {
        self.read(session_id, |s| s.has_voted(voter))
    }

    /// Up to `count` session summaries starting at id `offset`.
    pub fn list_sessions(&self, offset: u64, count: usize) -> Vec<SessionSummary> {
        let handles: Vec<SessionHandle> = self
            .table()
            .iter()
            .skip(offset.min(usize::MAX as u64) as usize)
            .take(count)
            .cloned()
            .collect();
        handles.iter().map(|h| lock(h).summary()).collect()
    }

    /// Consistent copies of every session, in id order.
    pub(crate) fn clone_sessions(&self) -> Vec<VotingSession> {
        let table = self.table();
        table.iter().map(|h| lock(h).clone()).collect()
    }

    fn read<T>(
        &self,
        session_id: SessionId,
        f: impl FnOnce(&VotingSession) -> T,
    ) -> Result<T, RegistryError> {
        let handle = self
            .handle(session_id)
            .ok_or(RegistryError::UnknownSession(session_id))?;
        let session = lock(&handle);
        Ok(f(&session))
    }

    fn handle(&self, session_id: SessionId) -> Option<SessionHandle> {
        self.table().get(session_id.index()).cloned()
    }

    fn table(&self) -> std::sync::RwLockReadGuard<'_, Vec<SessionHandle>> {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A panicking event listener must not wedge its session: every write is
/// complete before listeners run, so the data behind a poisoned lock is sound.
fn lock(handle: &SessionHandle) -> MutexGuard<'_, VotingSession> {
    handle.lock().unwrap_or_else(PoisonError::into_inner)
}

fn validate_create(candidates: &[String], duration_secs: i64) -> Result<(), RegistryError> {
    if candidates.len() < 2 {
        return Err(RegistryError::InsufficientCandidates {
            count: candidates.len(),
        });
    }
    if duration_secs <= 0 {
        return Err(RegistryError::InvalidDuration);
    }
    let mut seen = HashSet::with_capacity(candidates.len());
    for candidate in candidates {
        if !seen.insert(candidate.as_str()) {
            return Err(RegistryError::DuplicateCandidate(candidate.clone()));
        }
    }
    Ok(())
}
