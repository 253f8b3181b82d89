//! The per-image load flow: source resolution, out-of-band probing,
//! linear-backoff retries, marker-class transitions, and lifecycle
//! notifications.

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::application::config::LazyLoadConfig;
use crate::application::events::{EventBus, LazyLoadEvent};
use crate::domain::entities::{markup, ElementId, ImageLoadTask};
use crate::domain::errors::LoadError;
use crate::domain::ports::{DocumentPort, ImageProbePort};

/// Shared handles every load attempt needs.
#[derive(Clone)]
pub(crate) struct LoadContext {
    pub document: Arc<dyn DocumentPort>,
    pub probe: Arc<dyn ImageProbePort>,
    pub events: Arc<EventBus>,
    pub config: Arc<LazyLoadConfig>,
}

impl std::fmt::Debug for LoadContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Drives `task` to a terminal state and returns true on success.
///
/// Calling this on an already-loaded task is a no-op returning true.
/// Attempts for one element are strictly sequential: the next probe is
/// only scheduled after the previous one resolved to failure and the
/// backoff delay elapsed.
pub(crate) async fn attempt_load(ctx: &LoadContext, task: &mut ImageLoadTask) -> bool {
    if task.is_loaded() {
        return true;
    }

    let element = task.element();
    let doc = ctx.document.as_ref();

    let resolved = doc
        .attribute(element, markup::DEFERRED_SRC)
        .or_else(|| doc.attribute(element, markup::SRC))
        .filter(|url| !url.is_empty());

    let Some(url) = resolved else {
        // Markup issue, not a transient fault: fail without consuming
        // a retry attempt.
        warn!(%element, "no resolvable source; failing without retry");
        task.mark_failed();
        doc.remove_class(element, &ctx.config.pending_class);
        doc.add_class(element, &ctx.config.error_class);
        ctx.events.emit(&LazyLoadEvent::LoadError {
            element,
            error: LoadError::MissingSource { element }.to_string(),
            attempts: 0,
        });
        return false;
    };

    task.begin_attempt();
    doc.remove_class(element, &ctx.config.pending_class);
    doc.add_class(element, &ctx.config.loading_class);

    loop {
        match probe_once(ctx, &url).await {
            Ok(()) => {
                apply_loaded(ctx, element, &url);
                task.mark_loaded();
                debug!(%element, url = %url, attempts = task.attempts(), "image loaded");
                ctx.events.emit(&LazyLoadEvent::Loaded { element, url });
                return true;
            }
            Err(err) => {
                let attempts = task.record_failure();
                if err.is_retryable() && attempts < ctx.config.retry_budget {
                    warn!(%element, attempt = attempts, error = %err, "probe failed; retrying");
                    // Linear backoff: attempt N waits N * base.
                    tokio::time::sleep(ctx.config.retry_base_delay * attempts).await;
                } else {
                    error!(%element, attempts, error = %err, "image load failed permanently");
                    task.mark_failed();
                    doc.remove_class(element, &ctx.config.loading_class);
                    doc.add_class(element, &ctx.config.error_class);
                    ctx.events.emit(&LazyLoadEvent::LoadError {
                        element,
                        error: err.to_string(),
                        attempts,
                    });
                    return false;
                }
            }
        }
    }
}

/// Copies the resolved source onto the element and swaps markers.
fn apply_loaded(ctx: &LoadContext, element: ElementId, url: &str) {
    let doc = ctx.document.as_ref();
    doc.set_attribute(element, markup::SRC, url);
    if let Some(srcset) = doc.attribute(element, markup::DEFERRED_SRCSET) {
        doc.set_attribute(element, markup::SRCSET, &srcset);
    }
    doc.remove_attribute(element, markup::DEFERRED_SRC);
    doc.remove_attribute(element, markup::DEFERRED_SRCSET);
    doc.remove_class(element, &ctx.config.loading_class);
    doc.add_class(element, &ctx.config.loaded_class);
}

/// Runs one probe under the configured per-attempt timeout.
async fn probe_once(ctx: &LoadContext, url: &str) -> Result<(), LoadError> {
    let timeout = ctx.config.probe_timeout;
    match tokio::time::timeout(timeout, ctx.probe.probe(url)).await {
        Ok(result) => result,
        Err(_) => Err(LoadError::Timeout {
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::infrastructure::sim::{ProbeScript, ScriptedProbe, SimDocument};

    fn context(doc: &Arc<SimDocument>, probe: &Arc<ScriptedProbe>) -> LoadContext {
        LoadContext {
            document: doc.clone(),
            probe: probe.clone(),
            events: Arc::new(EventBus::new()),
            config: Arc::new(LazyLoadConfig::default()),
        }
    }

    fn lazy_image(doc: &SimDocument, src: &str) -> ElementId {
        doc.add_element(
            "img",
            None,
            0.0,
            100.0,
            &[("loading", "lazy"), (markup::DEFERRED_SRC, src)],
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_first_probe() {
        let doc = SimDocument::new(600.0);
        let probe = Arc::new(ScriptedProbe::succeeding());
        let ctx = context(&doc, &probe);
        let element = lazy_image(&doc, "a.jpg");
        let mut events = ctx.events.subscribe();

        let mut task = ImageLoadTask::new(element);
        assert!(attempt_load(&ctx, &mut task).await);

        assert!(task.is_loaded());
        assert_eq!(doc.attribute(element, markup::SRC).as_deref(), Some("a.jpg"));
        assert_eq!(doc.attribute(element, markup::DEFERRED_SRC), None);
        assert!(doc.has_class(element, "lazy-loaded"));
        assert!(!doc.has_class(element, "lazy-loading"));
        assert_eq!(
            events.recv().await,
            Some(LazyLoadEvent::Loaded {
                element,
                url: "a.jpg".to_string()
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_deferred_srcset_is_copied() {
        let doc = SimDocument::new(600.0);
        let probe = Arc::new(ScriptedProbe::succeeding());
        let ctx = context(&doc, &probe);
        let element = doc.add_element(
            "img",
            None,
            0.0,
            100.0,
            &[
                ("loading", "lazy"),
                (markup::DEFERRED_SRC, "a.jpg"),
                (markup::DEFERRED_SRCSET, "a-2x.jpg 2x"),
            ],
        );

        let mut task = ImageLoadTask::new(element);
        assert!(attempt_load(&ctx, &mut task).await);

        assert_eq!(
            doc.attribute(element, markup::SRCSET).as_deref(),
            Some("a-2x.jpg 2x")
        );
        assert_eq!(doc.attribute(element, markup::DEFERRED_SRCSET), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_plain_src_fallback_when_no_deferred_source() {
        let doc = SimDocument::new(600.0);
        let probe = Arc::new(ScriptedProbe::succeeding());
        let ctx = context(&doc, &probe);
        let element = doc.add_element(
            "img",
            None,
            0.0,
            100.0,
            &[("loading", "lazy"), (markup::SRC, "direct.jpg")],
        );

        let mut task = ImageLoadTask::new(element);
        assert!(attempt_load(&ctx, &mut task).await);
        assert_eq!(probe.calls(), vec!["direct.jpg".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_source_fails_without_consuming_attempts() {
        let doc = SimDocument::new(600.0);
        let probe = Arc::new(ScriptedProbe::succeeding());
        let ctx = context(&doc, &probe);
        let element = doc.add_element("img", None, 0.0, 100.0, &[("loading", "lazy")]);
        doc.add_class(element, "lazy-placeholder");
        let mut events = ctx.events.subscribe();

        let mut task = ImageLoadTask::new(element);
        assert!(!attempt_load(&ctx, &mut task).await);

        assert!(task.is_terminal());
        assert!(!task.is_loaded());
        assert_eq!(task.attempts(), 0);
        assert!(probe.calls().is_empty());
        assert!(doc.has_class(element, "lazy-error"));
        assert!(!doc.has_class(element, "lazy-placeholder"));
        match events.recv().await {
            Some(LazyLoadEvent::LoadError { attempts, .. }) => assert_eq!(attempts, 0),
            other => panic!("expected LoadError, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_failures_then_success_with_linear_backoff() {
        let doc = SimDocument::new(600.0);
        let probe = Arc::new(ScriptedProbe::scripted(
            "a.jpg",
            vec![
                ProbeScript::Fail("HTTP 503".to_string()),
                ProbeScript::Fail("HTTP 503".to_string()),
                ProbeScript::Succeed,
            ],
        ));
        let ctx = context(&doc, &probe);
        let element = lazy_image(&doc, "a.jpg");
        doc.add_class(element, "lazy-placeholder");
        let mut events = ctx.events.subscribe();

        let started = tokio::time::Instant::now();
        let mut task = ImageLoadTask::new(element);
        assert!(attempt_load(&ctx, &mut task).await);

        // Delay 1*base after the first failure, 2*base after the second.
        assert!(started.elapsed() >= Duration::from_millis(3000));
        assert_eq!(probe.calls().len(), 3);
        assert!(doc.has_class(element, "lazy-loaded"));
        assert!(matches!(
            events.recv().await,
            Some(LazyLoadEvent::Loaded { .. })
        ));
        assert!(events.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_exhaustion_after_exact_attempt_count() {
        let doc = SimDocument::new(600.0);
        let probe = Arc::new(ScriptedProbe::failing("connection reset"));
        let ctx = context(&doc, &probe);
        let element = lazy_image(&doc, "a.jpg");
        let mut events = ctx.events.subscribe();

        let mut task = ImageLoadTask::new(element);
        assert!(!attempt_load(&ctx, &mut task).await);

        assert_eq!(probe.calls().len(), 3);
        assert_eq!(task.attempts(), 3);
        assert!(doc.has_class(element, "lazy-error"));
        assert!(!doc.has_class(element, "lazy-loading"));
        match events.recv().await {
            Some(LazyLoadEvent::LoadError { attempts, error, .. }) => {
                assert_eq!(attempts, 3);
                assert!(error.contains("connection reset"));
            }
            other => panic!("expected LoadError, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_loaded_task_is_idempotent() {
        let doc = SimDocument::new(600.0);
        let probe = Arc::new(ScriptedProbe::succeeding());
        let ctx = context(&doc, &probe);
        let element = lazy_image(&doc, "a.jpg");

        let mut task = ImageLoadTask::new(element);
        assert!(attempt_load(&ctx, &mut task).await);
        assert_eq!(probe.calls().len(), 1);

        // Re-invocation after success probes nothing.
        assert!(attempt_load(&ctx, &mut task).await);
        assert_eq!(probe.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_receives_resolved_url_exactly_once() {
        use crate::domain::ports::probe_port::MockImageProbePort;

        let doc = SimDocument::new(600.0);
        let element = lazy_image(&doc, "hero.jpg");

        let mut probe = MockImageProbePort::new();
        probe
            .expect_probe()
            .withf(|url| url == "hero.jpg")
            .times(1)
            .returning(|_| Ok(()));

        let ctx = LoadContext {
            document: doc.clone(),
            probe: Arc::new(probe),
            events: Arc::new(EventBus::new()),
            config: Arc::new(LazyLoadConfig::default()),
        };
        let mut task = ImageLoadTask::new(element);
        assert!(attempt_load(&ctx, &mut task).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_probe_error_is_not_retried() {
        use crate::domain::ports::probe_port::MockImageProbePort;

        let doc = SimDocument::new(600.0);
        let element = lazy_image(&doc, "gone.jpg");

        // An adapter reporting a markup-level failure ends the chain on
        // the first attempt, budget notwithstanding.
        let mut probe = MockImageProbePort::new();
        probe.expect_probe().times(1).returning(|_| {
            Err(LoadError::MissingSource {
                element: ElementId::new(99),
            })
        });

        let ctx = LoadContext {
            document: doc.clone(),
            probe: Arc::new(probe),
            events: Arc::new(EventBus::new()),
            config: Arc::new(LazyLoadConfig::default()),
        };
        let mut events = ctx.events.subscribe();

        let mut task = ImageLoadTask::new(element);
        assert!(!attempt_load(&ctx, &mut task).await);

        assert!(task.is_terminal());
        assert_eq!(task.attempts(), 1);
        assert!(doc.has_class(element, "lazy-error"));
        match events.recv().await {
            Some(LazyLoadEvent::LoadError { attempts, .. }) => assert_eq!(attempts, 1),
            other => panic!("expected LoadError, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_probe_hits_timeout_and_retries() {
        let doc = SimDocument::new(600.0);
        let probe = Arc::new(ScriptedProbe::scripted(
            "a.jpg",
            vec![ProbeScript::Hang, ProbeScript::Succeed],
        ));
        let ctx = context(&doc, &probe);
        let element = lazy_image(&doc, "a.jpg");

        let mut task = ImageLoadTask::new(element);
        assert!(attempt_load(&ctx, &mut task).await);
        assert_eq!(task.attempts(), 1);
        assert_eq!(probe.calls().len(), 2);
    }
}
