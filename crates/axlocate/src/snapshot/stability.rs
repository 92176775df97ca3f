/*!
Waiting for a node to stop moving.

Accessibility frameworks report transient values while animations are in flight.
Two consecutive reads that agree within tolerance are treated as ground truth.
*/

use std::thread;
use std::time::{Duration, Instant};

use super::capture::DEFAULT_AX_TIMEOUT;
use crate::a11y::AttributeSet;
use crate::platform::{AccessibilityProvider, ProviderError, RawNode};
use crate::types::{Frame, LocateResult, NativeRef};

pub(crate) const DEFAULT_POLL_INTERVAL_MS: u64 = 50;
pub(crate) const DEFAULT_FRAME_EPSILON: f64 = 0.5;

/// Polling behaviour for [`wait_until_stable`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StabilityConfig {
  /// Delay between reads.
  pub poll_interval: Duration,
  /// Tolerance on each frame component, in points.
  pub epsilon: f64,
  /// Budget for each individual provider call.
  pub ax_timeout: Duration,
}

impl Default for StabilityConfig {
  fn default() -> Self {
    Self {
      poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
      epsilon: DEFAULT_FRAME_EPSILON,
      ax_timeout: DEFAULT_AX_TIMEOUT,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Reading {
  frame: Option<Frame>,
  enabled: Option<bool>,
  visible: Option<bool>,
}

impl Reading {
  fn from_raw(raw: &RawNode) -> Self {
    Self {
      frame: raw.frame,
      enabled: raw.enabled,
      visible: raw.visible,
    }
  }

  fn agrees_with(&self, other: &Self, epsilon: f64) -> bool {
    let frames_agree = match (self.frame, other.frame) {
      (Some(a), Some(b)) => a.matches(&b, epsilon),
      (None, None) => true,
      _ => false,
    };
    frames_agree && self.enabled == other.enabled && self.visible == other.visible
  }
}

/// Poll `target` until two consecutive reads agree, or `timeout` elapses.
///
/// Returns `Ok(false)` once the deadline passes; there is no other cancellation.
/// A provider timeout counts as an unstable read and polling continues.
///
/// # Errors
///
/// `StaleElement` if the node disappears while waiting, `Provider` on other
/// provider failures.
pub fn wait_until_stable<P: AccessibilityProvider + ?Sized>(
  provider: &P,
  target: &NativeRef,
  timeout: Duration,
  config: &StabilityConfig,
) -> LocateResult<bool> {
  let started = Instant::now();
  let deadline = started + timeout;
  let mut previous: Option<Reading> = None;
  let mut polls = 0_usize;

  loop {
    let budget = config
      .ax_timeout
      .min(deadline.saturating_duration_since(Instant::now()));
    polls += 1;

    match provider.capture_subtree(target, AttributeSet::stability(), 0, budget) {
      Ok(raw) => {
        let reading = Reading::from_raw(&raw);
        if previous.is_some_and(|p| p.agrees_with(&reading, config.epsilon)) {
          log::debug!(
            "element {} stable after {polls} polls ({:?})",
            target.element,
            started.elapsed()
          );
          return Ok(true);
        }
        previous = Some(reading);
      }
      Err(ProviderError::Timeout(_)) => {
        log::warn!("stability poll {polls} for element {} timed out", target.element);
        previous = None;
      }
      Err(e) => return Err(e.for_target(target)),
    }

    let remaining = deadline.saturating_duration_since(Instant::now());
    if remaining.is_zero() {
      break;
    }
    thread::sleep(config.poll_interval.min(remaining));
    if Instant::now() >= deadline {
      break;
    }
  }

  log::warn!(
    "element {} did not settle within {timeout:?} ({polls} polls)",
    target.element
  );
  Ok(false)
}
