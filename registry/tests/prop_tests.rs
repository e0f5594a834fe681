use std::collections::HashSet;
use std::sync::Arc;

use proptest::prelude::*;

use ballot_nullables::NullClock;
use ballot_registry::{winning_indices, RegistryError, VotingRegistry};
use ballot_types::VoterId;

fn candidates(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("candidate-{i}")).collect()
}

proptest! {
    /// sum(tally) equals the number of identities that voted, whatever the
    /// mix of accepted and refused calls.
    #[test]
    fn tally_sum_matches_voter_count(
        n in 2usize..6,
        attempts in prop::collection::vec((0u8..12, 0usize..8), 0..60),
    ) {
        let clock = Arc::new(NullClock::new(0));
        let registry = VotingRegistry::new(clock);
        let id = registry.create("p", candidates(n), 100).unwrap();

        let mut accepted = HashSet::new();
        for (who, index) in attempts {
            let voter = VoterId::new(format!("v{who}")).unwrap();
            let before = registry.tally(id).unwrap();
            match registry.vote(id, index, &voter) {
                Ok(()) => {
                    prop_assert!(accepted.insert(who));
                }
                Err(RegistryError::AlreadyVoted(_)) => {
                    prop_assert!(accepted.contains(&who));
                    prop_assert_eq!(registry.tally(id).unwrap(), before);
                }
                Err(RegistryError::InvalidCandidateIndex { .. }) => {
                    prop_assert!(index >= n);
                    prop_assert_eq!(registry.tally(id).unwrap(), before);
                }
                Err(other) => prop_assert!(false, "unexpected error {other:?}"),
            }
        }

        let sum: u64 = registry.tally(id).unwrap().iter().sum();
        prop_assert_eq!(sum, accepted.len() as u64);
        for who in 0u8..12 {
            let voter = VoterId::new(format!("v{who}")).unwrap();
            prop_assert_eq!(registry.has_voted(id, &voter).unwrap(), accepted.contains(&who));
        }
    }

    /// Winners are exactly the indices holding the maximum, ascending.
    #[test]
    fn winners_hold_the_maximum(tally in prop::collection::vec(0u64..5, 1..10)) {
        let winners = winning_indices(&tally);
        let max = *tally.iter().max().unwrap();

        prop_assert!(!winners.is_empty());
        prop_assert!(winners.windows(2).all(|w| w[0] < w[1]));
        for (i, &votes) in tally.iter().enumerate() {
            prop_assert_eq!(winners.contains(&i), votes == max);
        }
    }

    /// Any candidate list with a repeated entry is refused and allocates no id.
    #[test]
    fn duplicate_candidates_never_create(
        list in prop::collection::vec("[a-c]{1,2}", 2..8),
        dup in 0usize..8,
    ) {
        let mut list = list;
        let copy = list[dup % list.len()].clone();
        list.push(copy);

        let registry = VotingRegistry::new(Arc::new(NullClock::new(0)));
        let result = registry.create("dup", list, 10);
        prop_assert!(matches!(result, Err(RegistryError::DuplicateCandidate(_))));
        prop_assert_eq!(registry.session_count(), 0);
    }

    /// end_time is always start_time + duration for accepted creates.
    #[test]
    fn window_matches_duration(start in 0u64..1_000_000_000, duration in 1i64..10_000_000) {
        let registry = VotingRegistry::new(Arc::new(NullClock::new(start)));
        let id = registry.create("w", candidates(2), duration).unwrap();
        let info = registry.session_info(id).unwrap();
        prop_assert_eq!(info.start_time.as_secs(), start);
        prop_assert_eq!(info.end_time.as_secs(), start + duration as u64);
    }
}
