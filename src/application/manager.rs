//! Manager: strategy selection, mutation watching, and the public
//! control surface.
//!
//! The manager is an explicitly constructed, explicitly owned instance;
//! nothing happens at module load and the embedding application
//! controls the lifecycle.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::application::config::{LazyLoadConfig, LazyLoadOverrides};
use crate::application::events::{EventBus, LazyLoadEvent};
use crate::application::load_service::LoadContext;
use crate::application::strategies::{
    IntersectionStrategy, PollingStrategy, StrategyHandle, ViewportStrategy,
};
use crate::domain::ports::{DocumentPort, LazyLoadHost};

/// Which viewport strategy the capability probe selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    /// Host provides the intersection primitive.
    Intersection,
    /// Fallback scroll/resize polling.
    Polling,
}

/// Owns the active strategy and exposes `refresh`/`destroy`.
#[derive(Debug)]
pub struct LazyLoadManager {
    handle: StrategyHandle,
    events: Arc<EventBus>,
    kind: StrategyKind,
}

impl LazyLoadManager {
    /// Builds and activates a manager over the given host.
    ///
    /// The capability probe runs once: an intersection port that exists
    /// and reports support selects the intersection strategy, otherwise
    /// the polling fallback. If activation fails the error is logged
    /// and `None` is returned; callers treat `None` as "lazy loading
    /// disabled" and rely on the direct-load fallback in markup.
    pub async fn init(host: LazyLoadHost, overrides: Option<LazyLoadOverrides>) -> Option<Self> {
        let config = Arc::new(LazyLoadConfig::with_overrides(overrides));
        let events = Arc::new(EventBus::new());
        let ctx = LoadContext {
            document: host.document.clone(),
            probe: host.probe.clone(),
            events: events.clone(),
            config: config.clone(),
        };

        let intersection = host
            .intersection
            .clone()
            .filter(|observer| observer.is_supported());
        let (kind, strategy): (StrategyKind, Box<dyn ViewportStrategy>) = match intersection {
            Some(observer) => (
                StrategyKind::Intersection,
                Box::new(IntersectionStrategy::new(ctx, observer)),
            ),
            None => (
                StrategyKind::Polling,
                Box::new(PollingStrategy::new(ctx, host.signals.viewport_signals())),
            ),
        };

        let handle = match strategy.activate().await {
            Ok(handle) => handle,
            Err(err) => {
                error!(error = %err, "strategy activation failed; lazy loading disabled");
                return None;
            }
        };
        debug!(?kind, "lazy load manager initialized");

        watch_mutations(&host, &config, &handle);

        Some(Self {
            handle,
            events,
            kind,
        })
    }

    /// The strategy selected by the capability probe.
    #[must_use]
    pub const fn strategy_kind(&self) -> StrategyKind {
        self.kind
    }

    /// Registers a lifecycle event subscriber.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<LazyLoadEvent> {
        self.events.subscribe()
    }

    /// Re-scans for newly eligible, not-yet-registered elements.
    pub fn refresh(&self) {
        self.handle.refresh();
    }

    /// Stops observation and clears tracking.
    ///
    /// In-flight attempts already started are not cancelled and may
    /// still mutate their elements; no new attempts begin.
    pub fn destroy(&self) {
        self.handle.destroy();
    }
}

/// Spawns the mutation watcher when the host supports it.
///
/// Inserted subtrees containing a selector match trigger a strategy
/// refresh, so elements injected after initial page construction still
/// participate. A host without the primitive is skipped silently.
fn watch_mutations(host: &LazyLoadHost, config: &Arc<LazyLoadConfig>, handle: &StrategyHandle) {
    if !host.signals.supports_mutation_watching() {
        debug!("mutation watching unavailable; injected elements will not be retrofitted");
        return;
    }
    let Some(mut records) = host.signals.mutation_records() else {
        debug!("mutation watching unavailable; injected elements will not be retrofitted");
        return;
    };

    let document: Arc<dyn DocumentPort> = host.document.clone();
    let selector = config.selector.clone();
    let handle = handle.clone();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                // The watcher lives exactly as long as the worker.
                () = handle.closed() => break,
                record = records.recv() => {
                    let Some(record) = record else { break };
                    let relevant = record.inserted.iter().any(|element| {
                        document.matches(*element, &selector)
                            || document.subtree_matches(*element, &selector)
                    });
                    if relevant {
                        debug!(inserted = record.inserted.len(), "eligible mutation; refreshing");
                        handle.refresh();
                    }
                }
            }
        }
        debug!("mutation watcher stopped");
    });
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::domain::entities::markup;
    use crate::domain::ports::IntersectionObserverPort;
    use crate::infrastructure::sim::{ScriptedProbe, SimDocument, SimIntersectionObserver};

    async fn settle() {
        tokio::time::sleep(Duration::from_secs(10)).await;
    }

    fn sim_host(
        doc: &Arc<SimDocument>,
        probe: &Arc<ScriptedProbe>,
        intersection: Option<Arc<dyn IntersectionObserverPort>>,
    ) -> LazyLoadHost {
        LazyLoadHost {
            document: doc.clone(),
            probe: probe.clone(),
            intersection,
            signals: doc.clone(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_capability_probe_selects_intersection() {
        let doc = SimDocument::new(600.0);
        let probe = Arc::new(ScriptedProbe::succeeding());
        let observer = SimIntersectionObserver::new(doc.clone());

        let manager = LazyLoadManager::init(sim_host(&doc, &probe, Some(observer)), None)
            .await
            .expect("manager");
        assert_eq!(manager.strategy_kind(), StrategyKind::Intersection);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsupported_observer_falls_back_to_polling() {
        let doc = SimDocument::new(600.0);
        let probe = Arc::new(ScriptedProbe::succeeding());
        let observer = SimIntersectionObserver::unsupported(doc.clone());

        let manager = LazyLoadManager::init(sim_host(&doc, &probe, Some(observer)), None)
            .await
            .expect("manager");
        assert_eq!(manager.strategy_kind(), StrategyKind::Polling);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_observer_falls_back_to_polling() {
        let doc = SimDocument::new(600.0);
        let probe = Arc::new(ScriptedProbe::succeeding());

        let manager = LazyLoadManager::init(sim_host(&doc, &probe, None), None)
            .await
            .expect("manager");
        assert_eq!(manager.strategy_kind(), StrategyKind::Polling);
    }

    #[tokio::test(start_paused = true)]
    async fn test_activation_failure_yields_none() {
        let doc = SimDocument::new(600.0);
        let probe = Arc::new(ScriptedProbe::succeeding());
        let observer = SimIntersectionObserver::rejecting_options(doc.clone());

        let manager = LazyLoadManager::init(sim_host(&doc, &probe, Some(observer)), None).await;
        assert!(manager.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_injected_subtree_is_retrofitted() {
        let doc = SimDocument::new(600.0);
        let probe = Arc::new(ScriptedProbe::succeeding());

        let manager = LazyLoadManager::init(sim_host(&doc, &probe, None), None)
            .await
            .expect("manager");
        settle().await;

        // A wrapper div containing an eligible image lands in view.
        let wrapper = doc.inject_element("div", None, 100.0, 200.0, &[]);
        let image = doc.inject_element(
            "img",
            Some(wrapper),
            120.0,
            100.0,
            &[("loading", "lazy"), (markup::DEFERRED_SRC, "late.jpg")],
        );
        settle().await;

        assert!(doc.has_class(image, "lazy-loaded"));
        assert_eq!(probe.calls(), vec!["late.jpg".to_string()]);
        manager.destroy();
    }

    #[tokio::test(start_paused = true)]
    async fn test_irrelevant_mutations_do_not_refresh() {
        let doc = SimDocument::new(600.0);
        let probe = Arc::new(ScriptedProbe::succeeding());

        let manager = LazyLoadManager::init(sim_host(&doc, &probe, None), None)
            .await
            .expect("manager");
        settle().await;

        doc.inject_element("div", None, 100.0, 50.0, &[]);
        settle().await;

        assert!(probe.calls().is_empty());
        manager.destroy();
    }

    #[tokio::test(start_paused = true)]
    async fn test_host_without_mutation_watching_degrades_silently() {
        let doc = SimDocument::without_mutation_watching(600.0);
        let probe = Arc::new(ScriptedProbe::succeeding());

        let manager = LazyLoadManager::init(sim_host(&doc, &probe, None), None)
            .await
            .expect("manager");
        settle().await;

        doc.inject_element(
            "img",
            None,
            100.0,
            100.0,
            &[("loading", "lazy"), (markup::DEFERRED_SRC, "late.jpg")],
        );
        settle().await;

        // Not retrofitted, but nothing failed either.
        assert!(probe.calls().is_empty());
        manager.destroy();
    }

    #[tokio::test(start_paused = true)]
    async fn test_destroy_stops_the_mutation_watcher() {
        let doc = SimDocument::new(600.0);
        let probe = Arc::new(ScriptedProbe::succeeding());

        let manager = LazyLoadManager::init(sim_host(&doc, &probe, None), None)
            .await
            .expect("manager");
        settle().await;
        assert_eq!(doc.mutation_subscriber_count(), 1);

        manager.destroy();
        settle().await;

        // The watcher dropped its receiver with the worker; emitting the
        // next record prunes it and triggers nothing.
        doc.inject_element(
            "img",
            None,
            100.0,
            100.0,
            &[("loading", "lazy"), (markup::DEFERRED_SRC, "late.jpg")],
        );
        settle().await;

        assert_eq!(doc.mutation_subscriber_count(), 0);
        assert!(probe.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_to_end_events_through_subscription() {
        let doc = SimDocument::new(600.0);
        doc.add_element(
            "img",
            None,
            100.0,
            100.0,
            &[("loading", "lazy"), (markup::DEFERRED_SRC, "hero.jpg")],
        );
        let probe = Arc::new(ScriptedProbe::succeeding());
        let observer = SimIntersectionObserver::new(doc.clone());

        let manager = LazyLoadManager::init(sim_host(&doc, &probe, Some(observer)), None)
            .await
            .expect("manager");
        let mut events = manager.subscribe();
        settle().await;

        // Subscribing after init misses nothing here because the load
        // only resolves after the first settle.
        match events.try_recv() {
            Ok(LazyLoadEvent::Loaded { url, .. }) => assert_eq!(url, "hero.jpg"),
            other => panic!("expected Loaded, got {other:?}"),
        }
    }
}
