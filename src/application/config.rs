//! Engine configuration.
//!
//! Read-only after construction: the manager takes an optional
//! overrides object at init and merges it over the defaults.

use std::time::Duration;

use serde::Deserialize;

/// Configuration for the lazy loading engine.
#[derive(Debug, Clone)]
pub struct LazyLoadConfig {
    /// Selector identifying eligible elements.
    pub selector: String,
    /// Extra distance beyond the viewport edge within which an element
    /// counts as "about to be visible".
    pub viewport_margin_px: f64,
    /// Minimum visible fraction for an intersection signal.
    pub intersection_threshold: f64,
    /// Marker class while an element is registered but untouched.
    pub pending_class: String,
    /// Marker class while an attempt chain is in progress.
    pub loading_class: String,
    /// Marker class after successful load.
    pub loaded_class: String,
    /// Marker class after terminal failure.
    pub error_class: String,
    /// Number of probe attempts before a task fails permanently.
    pub retry_budget: u32,
    /// Base retry delay; attempt N waits `N * retry_base_delay`.
    pub retry_base_delay: Duration,
    /// Hard per-attempt timeout enforced around every probe.
    pub probe_timeout: Duration,
    /// Throttle interval for the polling strategy's visibility checks.
    pub poll_interval: Duration,
}

impl Default for LazyLoadConfig {
    fn default() -> Self {
        Self {
            selector: "img[loading=lazy]".to_string(),
            viewport_margin_px: 50.0,
            intersection_threshold: 0.01,
            pending_class: "lazy-placeholder".to_string(),
            loading_class: "lazy-loading".to_string(),
            loaded_class: "lazy-loaded".to_string(),
            error_class: "lazy-error".to_string(),
            retry_budget: 3,
            retry_base_delay: Duration::from_millis(1000),
            probe_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(200),
        }
    }
}

impl LazyLoadConfig {
    /// Builds a configuration from defaults with `overrides` merged on top.
    #[must_use]
    pub fn with_overrides(overrides: Option<LazyLoadOverrides>) -> Self {
        let mut config = Self::default();
        let Some(o) = overrides else {
            return config;
        };

        if let Some(selector) = o.selector {
            config.selector = selector;
        }
        if let Some(margin) = o.viewport_margin_px {
            config.viewport_margin_px = margin;
        }
        if let Some(threshold) = o.intersection_threshold {
            config.intersection_threshold = threshold;
        }
        if let Some(class) = o.pending_class {
            config.pending_class = class;
        }
        if let Some(class) = o.loading_class {
            config.loading_class = class;
        }
        if let Some(class) = o.loaded_class {
            config.loaded_class = class;
        }
        if let Some(class) = o.error_class {
            config.error_class = class;
        }
        if let Some(budget) = o.retry_budget {
            config.retry_budget = budget.max(1);
        }
        if let Some(ms) = o.retry_base_delay_ms {
            config.retry_base_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = o.probe_timeout_ms {
            config.probe_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = o.poll_interval_ms {
            config.poll_interval = Duration::from_millis(ms);
        }
        config
    }
}

/// Optional overrides merged over [`LazyLoadConfig::default`].
///
/// Durations are expressed in milliseconds so the struct stays
/// directly deserializable from TOML.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LazyLoadOverrides {
    /// Selector identifying eligible elements.
    pub selector: Option<String>,
    /// Viewport proximity margin in pixels.
    pub viewport_margin_px: Option<f64>,
    /// Intersection ratio threshold.
    pub intersection_threshold: Option<f64>,
    /// Pending marker class.
    pub pending_class: Option<String>,
    /// Loading marker class.
    pub loading_class: Option<String>,
    /// Loaded marker class.
    pub loaded_class: Option<String>,
    /// Error marker class.
    pub error_class: Option<String>,
    /// Retry attempt budget (clamped to at least 1).
    pub retry_budget: Option<u32>,
    /// Base retry delay in milliseconds.
    pub retry_base_delay_ms: Option<u64>,
    /// Per-attempt probe timeout in milliseconds.
    pub probe_timeout_ms: Option<u64>,
    /// Polling throttle interval in milliseconds.
    pub poll_interval_ms: Option<u64>,
}

impl LazyLoadOverrides {
    /// Parses overrides from a TOML document.
    ///
    /// # Errors
    /// Returns a deserialization error for malformed or unknown keys.
    pub fn from_toml_str(input: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_defaults() {
        let config = LazyLoadConfig::default();
        assert_eq!(config.selector, "img[loading=lazy]");
        assert_eq!(config.retry_budget, 3);
        assert_eq!(config.retry_base_delay, Duration::from_millis(1000));
        assert_eq!(config.pending_class, "lazy-placeholder");
    }

    #[test]
    fn test_no_overrides_yields_defaults() {
        let config = LazyLoadConfig::with_overrides(None);
        assert_eq!(config.selector, LazyLoadConfig::default().selector);
    }

    #[test]
    fn test_overrides_merge_over_defaults() {
        let overrides = LazyLoadOverrides {
            selector: Some("img[data-defer]".to_string()),
            retry_budget: Some(5),
            retry_base_delay_ms: Some(250),
            ..LazyLoadOverrides::default()
        };
        let config = LazyLoadConfig::with_overrides(Some(overrides));

        assert_eq!(config.selector, "img[data-defer]");
        assert_eq!(config.retry_budget, 5);
        assert_eq!(config.retry_base_delay, Duration::from_millis(250));
        // Untouched keys keep their defaults.
        assert_eq!(config.loaded_class, "lazy-loaded");
    }

    #[test_case(0, 1 ; "zero budget is clamped")]
    #[test_case(1, 1 ; "one is kept")]
    #[test_case(7, 7 ; "larger budgets pass through")]
    fn test_budget_clamp(given: u32, expected: u32) {
        let overrides = LazyLoadOverrides {
            retry_budget: Some(given),
            ..LazyLoadOverrides::default()
        };
        assert_eq!(
            LazyLoadConfig::with_overrides(Some(overrides)).retry_budget,
            expected
        );
    }

    #[test]
    fn test_toml_parse() {
        let overrides = LazyLoadOverrides::from_toml_str(
            r#"
            selector = "img[loading=lazy]"
            viewport_margin_px = 120.0
            retry_budget = 2
            probe_timeout_ms = 5000
            "#,
        )
        .expect("valid overrides");

        assert_eq!(overrides.viewport_margin_px, Some(120.0));
        assert_eq!(overrides.retry_budget, Some(2));
        assert_eq!(overrides.probe_timeout_ms, Some(5000));
    }

    #[test]
    fn test_toml_rejects_unknown_keys() {
        assert!(LazyLoadOverrides::from_toml_str("not_a_key = 1").is_err());
    }
}
