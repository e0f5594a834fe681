//! Prometheus metrics for the ballot node.
//!
//! The [`RegistryMetrics`] struct owns a dedicated [`Registry`] that the RPC
//! `/metrics` endpoint encodes into the Prometheus text exposition format.
//! Values are driven by registry events, see [`RegistryMetrics::observe`].

use ballot_registry::RegistryEvent;
use prometheus::{
    register_int_counter_with_registry, register_int_gauge_with_registry, IntCounter, IntGauge,
    Opts, Registry,
};

pub struct RegistryMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    pub sessions_created: IntCounter,
    /// Accepted votes only; refused calls emit no event.
    pub votes_cast: IntCounter,
    pub sessions_finalized: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    pub session_count: IntGauge,
}

impl RegistryMetrics {
    /// Create a fresh set of metrics, all registered under a new [`Registry`].
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let sessions_created = register_int_counter_with_registry!(
            Opts::new(
                "ballot_sessions_created_total",
                "Total voting sessions created"
            ),
            registry
        )?;

        let votes_cast = register_int_counter_with_registry!(
            Opts::new("ballot_votes_cast_total", "Total votes accepted"),
            registry
        )?;

        let sessions_finalized = register_int_counter_with_registry!(
            Opts::new(
                "ballot_sessions_finalized_total",
                "Total voting sessions finalized"
            ),
            registry
        )?;

        let session_count = register_int_gauge_with_registry!(
            Opts::new("ballot_session_count", "Sessions held by the registry"),
            registry
        )?;

        Ok(Self {
            registry,
            sessions_created,
            votes_cast,
            sessions_finalized,
            session_count,
        })
    }

    /// Update the metrics for one registry event.
    pub fn observe(&self, event: &RegistryEvent) {
        match event {
            RegistryEvent::SessionCreated { .. } => {
                self.sessions_created.inc();
                self.session_count.inc();
            }
            RegistryEvent::VoteCast { .. } => self.votes_cast.inc(),
            RegistryEvent::ResultsCalculated { .. } => self.sessions_finalized.inc(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ballot_types::{SessionId, Timestamp, VoterId};

    #[test]
    fn events_drive_counters() {
        let metrics = RegistryMetrics::new().unwrap();
        metrics.session_count.set(2);

        metrics.observe(&RegistryEvent::SessionCreated {
            session_id: SessionId::new(2),
            title: "t".into(),
            candidates: vec!["a".into(), "b".into()],
            start_time: Timestamp::new(0),
            end_time: Timestamp::new(10),
        });
        metrics.observe(&RegistryEvent::VoteCast {
            session_id: SessionId::new(2),
            voter: VoterId::new("v").unwrap(),
            candidate_index: 1,
        });
        metrics.observe(&RegistryEvent::ResultsCalculated {
            session_id: SessionId::new(2),
            tally: vec![0, 1],
        });

        assert_eq!(metrics.sessions_created.get(), 1);
        assert_eq!(metrics.votes_cast.get(), 1);
        assert_eq!(metrics.sessions_finalized.get(), 1);
        assert_eq!(metrics.session_count.get(), 3);
    }

    #[test]
    fn registry_gathers_all_families() {
        let metrics = RegistryMetrics::new().unwrap();
        assert_eq!(metrics.registry.gather().len(), 4);
    }
}
