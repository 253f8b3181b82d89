//! Application layer orchestrating lazy loading.

/// Engine configuration and overrides.
pub mod config;
/// Lifecycle event bus.
pub mod events;
/// Per-image load flow.
pub mod load_service;
/// Manager selecting and driving a viewport strategy.
pub mod manager;
/// Viewport detection strategies.
pub mod strategies;

pub use config::{LazyLoadConfig, LazyLoadOverrides};
pub use events::{EventBus, LazyLoadEvent};
pub use manager::{LazyLoadManager, StrategyKind};
pub use strategies::{StrategyHandle, ViewportStrategy};
