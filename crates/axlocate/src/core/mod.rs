/*!
Core session - owns the provider, the element cache and event broadcasting.

# Module Structure

- `mod.rs` - Session struct, builder, events
- `locate.rs` - `find_elements()`, `page_source()`, `Locator`
- `resolve.rs` - `resolve()` with recency, `refresh()`, `relocate()`, `wait_until_stable()`

# Example

```ignore
use axlocate::{Locator, Recency, Session};

let session = Session::builder()
    .element_cache_size(256)
    .build(provider)?;

let buttons = session.find_elements(&Locator::query("//Button[@label='Login']")?, None)?;
let identity = buttons[0].identity().unwrap();

let handle = session.resolve(&identity, Recency::Any)?;      // From cache
let handle = session.resolve(&identity, Recency::Current)?;  // From provider

let mut events = session.subscribe();
while let Ok(event) = events.recv().await {
    // handle event
}
```
*/

mod locate;
mod resolve;

pub use locate::Locator;

use async_broadcast::{InactiveReceiver, Receiver};
use std::sync::Arc;

use crate::cache::ElementCache;
use crate::config::SessionConfig;
use crate::platform::AccessibilityProvider;
use crate::types::{CacheEvent, LocateError, LocateResult};

const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// One automation session: provider, element cache and settings.
///
/// The cache is emptied when the session is dropped.
pub struct Session {
  provider: Arc<dyn AccessibilityProvider>,
  cache: ElementCache,
  config: SessionConfig,
  events_keepalive: InactiveReceiver<CacheEvent>,
}

impl std::fmt::Debug for Session {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Session")
      .field("config", &self.config)
      .field("cached", &self.cache.len())
      .finish_non_exhaustive()
  }
}

/// Builder for configuring a session.
///
/// # Example
///
/// ```ignore
/// let session = Session::builder()
///     .element_cache_size(256)
///     .snapshot_max_depth(20)
///     .build(provider)?;
/// ```
#[derive(Debug, Default, Clone, Copy)]
#[must_use = "Builder does nothing until .build() is called"]
pub struct SessionBuilder {
  config: SessionConfig,
}

impl SessionBuilder {
  /// Start from a complete config, e.g. one parsed from client settings.
  pub const fn config(mut self, config: SessionConfig) -> Self {
    self.config = config;
    self
  }

  /// Maximum number of cached element handles. Default: 1024.
  pub const fn element_cache_size(mut self, size: usize) -> Self {
    self.config.element_cache_size = size;
    self
  }

  /// Levels below the capture target included in snapshots. Default: 50.
  pub const fn snapshot_max_depth(mut self, depth: usize) -> Self {
    self.config.snapshot_max_depth = depth;
    self
  }

  /// Per-component frame tolerance in points. Default: 0.5.
  pub const fn frame_epsilon(mut self, epsilon: f64) -> Self {
    self.config.frame_epsilon = epsilon;
    self
  }

  /// Delay between stability reads. Default: 50ms.
  pub const fn stability_poll_interval_ms(mut self, ms: u64) -> Self {
    self.config.stability_poll_interval_ms = ms;
    self
  }

  /// Default budget for `wait_until_stable`. Default: 10s.
  pub const fn stability_timeout_ms(mut self, ms: u64) -> Self {
    self.config.stability_timeout_ms = ms;
    self
  }

  /// Budget for each provider call. Default: 10s.
  pub const fn ax_timeout_ms(mut self, ms: u64) -> Self {
    self.config.ax_timeout_ms = ms;
    self
  }

  /// Build the session around `provider`.
  ///
  /// Returns `InvalidArgument` if the configuration is unusable (e.g. a zero
  /// cache size).
  pub fn build<P: AccessibilityProvider>(self, provider: Arc<P>) -> LocateResult<Session> {
    Session::create_with_config(provider, self.config)
  }
}

impl Session {
  /// Create a builder for configuring a new session.
  pub fn builder() -> SessionBuilder {
    SessionBuilder::default()
  }

  /// Create a session with default settings.
  pub fn new<P: AccessibilityProvider>(provider: Arc<P>) -> LocateResult<Self> {
    Self::builder().build(provider)
  }

  fn create_with_config(provider: Arc<dyn AccessibilityProvider>, config: SessionConfig) -> LocateResult<Self> {
    config.validate()?;

    let (mut tx, rx) = async_broadcast::broadcast(EVENT_CHANNEL_CAPACITY);
    tx.set_overflow(true); // Drop oldest events when full

    let cache = ElementCache::new(config.element_cache_size, tx)?;
    log::debug!("session created: {config:?}");

    Ok(Self {
      provider,
      cache,
      config,
      events_keepalive: rx.deactivate(),
    })
  }

  /// Subscribe to cache events from this session.
  pub fn subscribe(&self) -> Receiver<CacheEvent> {
    self.events_keepalive.activate_cloned()
  }

  /// Settings this session was built with.
  pub const fn config(&self) -> &SessionConfig {
    &self.config
  }

  /// The session's element cache.
  pub const fn cache(&self) -> &ElementCache {
    &self.cache
  }

  /// Copies of every cached handle, most recently used first.
  pub fn cached_elements(&self) -> Vec<crate::cache::ElementHandle> {
    self.cache.entries()
  }

  /// Forget every cached element, e.g. when switching to another target app.
  pub fn reset(&self) {
    self.cache.reset();
  }

  fn provider(&self) -> &dyn AccessibilityProvider {
    &*self.provider
  }

  fn no_active_root() -> LocateError {
    LocateError::Provider("no active application".into())
  }
}

impl Drop for Session {
  fn drop(&mut self) {
    self.cache.reset();
  }
}
