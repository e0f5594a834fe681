use proptest::prelude::*;

use ballot_types::{SessionId, Timestamp, VoterId};

proptest! {
    /// Timestamp ordering: new(a) <= new(b) iff a <= b.
    #[test]
    fn timestamp_ordering(a in 0u64..u64::MAX, b in 0u64..u64::MAX) {
        let ta = Timestamp::new(a);
        let tb = Timestamp::new(b);
        prop_assert_eq!(ta <= tb, a <= b);
        prop_assert_eq!(ta == tb, a == b);
    }

    /// checked_add_secs agrees with u64::checked_add.
    #[test]
    fn timestamp_checked_add(base in 0u64..u64::MAX, secs in 0u64..u64::MAX) {
        let expected = base.checked_add(secs).map(Timestamp::new);
        prop_assert_eq!(Timestamp::new(base).checked_add_secs(secs), expected);
    }

    /// Timestamp elapsed_since: elapsed_since(now) = now - self.
    #[test]
    fn timestamp_elapsed_since(base in 0u64..1_000_000, offset in 0u64..1_000_000) {
        let t = Timestamp::new(base);
        let now = Timestamp::new(base + offset);
        prop_assert_eq!(t.elapsed_since(now), offset);
    }

    /// Timestamp elapsed_since saturates to 0 when now < self.
    #[test]
    fn timestamp_elapsed_since_saturates(
        base in 1u64..1_000_000,
        deficit in 1u64..1_000_000,
    ) {
        let later = Timestamp::new(base + deficit);
        let earlier = Timestamp::new(base);
        prop_assert_eq!(later.elapsed_since(earlier), 0);
    }

    /// SessionId survives Display -> FromStr.
    #[test]
    fn session_id_display_parse(raw in 0u64..u64::MAX) {
        let id = SessionId::new(raw);
        prop_assert_eq!(id.to_string().parse::<SessionId>().unwrap(), id);
    }

    /// Any identity with a visible character is accepted and kept verbatim.
    #[test]
    fn voter_id_accepts_visible_strings(raw in "[a-zA-Z0-9_]{1,64}") {
        let id = VoterId::new(raw.clone()).unwrap();
        prop_assert_eq!(id.as_str(), raw.as_str());
    }

    /// VoterId bincode serialization roundtrip.
    #[test]
    fn voter_id_bincode_roundtrip(raw in "[a-z0-9]{1,40}") {
        let id = VoterId::new(raw).unwrap();
        let encoded = bincode::serialize(&id).unwrap();
        let decoded: VoterId = bincode::deserialize(&encoded).unwrap();
        prop_assert_eq!(decoded, id);
    }
}
