//! A single voting session and its local state transitions.

use std::collections::HashSet;

use ballot_types::{SessionId, Timestamp, VoterId};
use serde::{Deserialize, Serialize};

use crate::error::RegistryError;
use crate::tally::winning_indices;

/// One independently configured vote: candidate list, time window and tally.
///
/// Only the registry mutates a session, and only through [`admit_vote`] and
/// [`finalize`]. Every check runs before the first write, so a refused call
/// leaves the session untouched.
///
/// Outside the crate the state is read through [`id`](VotingSession::id),
/// [`tally`](VotingSession::tally), [`info`](VotingSession::info)
/// and [`summary`](VotingSession::summary); it cannot be edited in place:
///
/// ```compile_fail
/// fn tamper(session: &mut ballot_registry::VotingSession) {
///     session.tally[0] = 99;
/// }
/// ```
///
/// [`admit_vote`]: VotingSession::admit_vote
/// [`finalize`]: VotingSession::finalize
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VotingSession {
    pub(crate) id: SessionId,
    pub(crate) title: String,
    /// Canonical candidate order; the index is the candidate's identifier.
    pub(crate) candidates: Vec<String>,
    pub(crate) start_time: Timestamp,
    pub(crate) end_time: Timestamp,
    pub(crate) is_open: bool,
    pub(crate) finalized: bool,
    /// One count per candidate, parallel to `candidates`.
    pub(crate) tally: Vec<u64>,
    /// Identities that have cast an accepted vote. Append-only.
    voters: HashSet<VoterId>,
}

impl VotingSession {
    /// A freshly opened session with an all-zero tally.
    pub(crate) fn open(
        id: SessionId,
        title: String,
        candidates: Vec<String>,
        start_time: Timestamp,
        end_time: Timestamp,
    ) -> Self {
        let tally = vec![0; candidates.len()];
        Self {
            id,
            title,
            candidates,
            start_time,
            end_time,
            is_open: true,
            finalized: false,
            tally,
            voters: HashSet::new(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn tally(&self) -> &[u64] {
        &self.tally
    }

    pub fn has_voted(&self, voter: &VoterId) -> bool {
        self.voters.contains(voter)
    }

    pub fn voter_count(&self) -> usize {
        self.voters.len()
    }

    pub fn total_votes(&self) -> u64 {
        self.tally.iter().sum()
    }

    /// Whether `now` lies past the voting window.
    pub fn has_expired(&self, now: Timestamp) -> bool {
        now > self.end_time
    }

    /// Check and record a vote, in precondition order:
    /// open, within window, first vote for this identity, valid index.
    pub(crate) fn admit_vote(
        &mut self,
        candidate_index: usize,
        voter: &VoterId,
        now: Timestamp,
    ) -> Result<(), RegistryError> {
        if !self.is_open {
            return Err(RegistryError::SessionNotActive);
        }
        if self.has_expired(now) {
            return Err(RegistryError::SessionEnded);
        }
        if self.voters.contains(voter) {
            return Err(RegistryError::AlreadyVoted(voter.to_string()));
        }
        if candidate_index >= self.candidates.len() {
            return Err(RegistryError::InvalidCandidateIndex {
                index: candidate_index,
                candidates: self.candidates.len(),
            });
        }

        self.voters.insert(voter.clone());
        self.tally[candidate_index] += 1;
        Ok(())
    }

    /// Close the session and freeze its tally. Allowed once, after `end_time`.
    pub(crate) fn finalize(&mut self, now: Timestamp) -> Result<(), RegistryError> {
        if !self.is_open {
            return Err(RegistryError::AlreadyFinalized);
        }
        if !self.has_expired(now) {
            return Err(RegistryError::SessionStillActive);
        }
        self.is_open = false;
        self.finalized = true;
        Ok(())
    }

    /// Names of every candidate sharing the top count, in index order.
    pub fn winners(&self) -> Result<Vec<String>, RegistryError> {
        if !self.finalized {
            return Err(RegistryError::ResultsNotReady);
        }
        Ok(winning_indices(&self.tally)
            .into_iter()
            .map(|index| self.candidates[index].clone())
            .collect())
    }

    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            id: self.id,
            title: self.title.clone(),
            candidates: self.candidates.clone(),
            is_open: self.is_open,
            finalized: self.finalized,
            start_time: self.start_time,
            end_time: self.end_time,
        }
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id,
            title: self.title.clone(),
            is_open: self.is_open,
            finalized: self.finalized,
            end_time: self.end_time,
            total_votes: self.total_votes(),
        }
    }

    /// Verify the structural invariants of a session.
    ///
    /// Live sessions uphold these by construction; this is for state coming
    /// from outside the process, such as a decoded snapshot.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.candidates.len() < 2 {
            return Err(format!("session {} has fewer than 2 candidates", self.id));
        }
        if self.candidates.len() != self.tally.len() {
            return Err(format!(
                "session {} has {} candidates but {} tally slots",
                self.id,
                self.candidates.len(),
                self.tally.len()
            ));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = self.candidates.iter().find(|c| !seen.insert(c.as_str())) {
            return Err(format!("session {} lists {dup:?} twice", self.id));
        }
        if self.end_time <= self.start_time {
            return Err(format!("session {} ends before it starts", self.id));
        }
        if self.finalized && self.is_open {
            return Err(format!("session {} is finalized but still open", self.id));
        }
        if !self.finalized && !self.is_open {
            return Err(format!("session {} is closed without results", self.id));
        }
        if self.total_votes() != self.voters.len() as u64 {
            return Err(format!(
                "session {} counts {} votes from {} voters",
                self.id,
                self.total_votes(),
                self.voters.len()
            ));
        }
        Ok(())
    }
}

/// Read-only view returned by `session_info`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: SessionId,
    pub title: String,
    pub candidates: Vec<String>,
    pub is_open: bool,
    pub finalized: bool,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
}

/// One row of a session listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: SessionId,
    pub title: String,
    pub is_open: bool,
    pub finalized: bool,
    pub end_time: Timestamp,
    pub total_votes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voter(name: &str) -> VoterId {
        VoterId::new(name).unwrap()
    }

    fn fruit_session() -> VotingSession {
        VotingSession::open(
            SessionId::FIRST,
            "Best fruit".into(),
            vec!["Banana".into(), "Watermelon".into()],
            Timestamp::new(1_000),
            Timestamp::new(1_060),
        )
    }

    #[test]
    fn new_session_is_open_with_zero_tally() {
        let session = fruit_session();
        assert!(session.is_open);
        assert!(!session.finalized);
        assert_eq!(session.tally, vec![0, 0]);
        assert!(session.check_invariants().is_ok());
    }

    #[test]
    fn vote_on_last_second_is_accepted() {
        let mut session = fruit_session();
        session
            .admit_vote(0, &voter("a"), Timestamp::new(1_060))
            .unwrap();
        assert_eq!(session.tally, vec![1, 0]);
    }

    #[test]
    fn expiry_is_checked_before_double_vote() {
        let mut session = fruit_session();
        session.admit_vote(1, &voter("a"), Timestamp::new(1_010)).unwrap();
        assert_eq!(
            session.admit_vote(1, &voter("a"), Timestamp::new(1_061)),
            Err(RegistryError::SessionEnded)
        );
    }

    #[test]
    fn double_vote_is_checked_before_index() {
        let mut session = fruit_session();
        session.admit_vote(1, &voter("a"), Timestamp::new(1_010)).unwrap();
        assert_eq!(
            session.admit_vote(9, &voter("a"), Timestamp::new(1_011)),
            Err(RegistryError::AlreadyVoted("a".into()))
        );
    }

    #[test]
    fn rejected_vote_does_not_mark_voter() {
        let mut session = fruit_session();
        let err = session
            .admit_vote(2, &voter("a"), Timestamp::new(1_010))
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::InvalidCandidateIndex {
                index: 2,
                candidates: 2
            }
        );
        assert!(!session.has_voted(&voter("a")));
        assert_eq!(session.tally, vec![0, 0]);
    }

    #[test]
    fn finalize_boundary_is_exclusive() {
        let mut session = fruit_session();
        assert_eq!(
            session.finalize(Timestamp::new(1_060)),
            Err(RegistryError::SessionStillActive)
        );
        session.finalize(Timestamp::new(1_061)).unwrap();
        assert!(!session.is_open);
        assert!(session.finalized);
        assert_eq!(
            session.finalize(Timestamp::new(2_000)),
            Err(RegistryError::AlreadyFinalized)
        );
    }

    #[test]
    fn winners_require_finalization() {
        let session = fruit_session();
        assert_eq!(session.winners(), Err(RegistryError::ResultsNotReady));
    }

    #[test]
    fn invariants_catch_tally_mismatch() {
        let mut session = fruit_session();
        session.tally[0] = 3;
        assert!(session.check_invariants().is_err());
    }

    #[test]
    fn invariants_catch_half_closed_session() {
        let mut session = fruit_session();
        session.is_open = false;
        assert!(session.check_invariants().is_err());
    }
}
