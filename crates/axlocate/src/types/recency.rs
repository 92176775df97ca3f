/*!
Recency specifies how much a cached element snapshot may be trusted on resolve.

Staleness is made explicit at the call site instead of hiding it behind a boolean
flag: `Any` never touches the accessibility provider, `Current` always re-validates.
*/

use std::time::Duration;

/// How fresh a cached snapshot must be when an element is resolved.
///
/// # Examples
///
/// ```ignore
/// // Cached snapshot, no provider call, might describe a vanished node
/// let handle = session.resolve(&id, Recency::Any)?;
///
/// // Re-capture; fails with StaleElement if the node is gone
/// let handle = session.resolve(&id, Recency::Current)?;
///
/// // Re-capture only if the cached snapshot is older than 100ms
/// let handle = session.resolve(&id, Recency::max_age_ms(100))?;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recency {
  /// Serve the cached snapshot without calling the provider.
  Any,

  /// Re-capture every time; fails if the node has vanished.
  Current,

  /// Re-capture only when the cached snapshot is older than this.
  MaxAge(Duration),
}

impl Recency {
  /// `MaxAge` from a millisecond count.
  ///
  /// # Example
  ///
  /// ```
  /// use axlocate::Recency;
  /// use std::time::Duration;
  ///
  /// let recency = Recency::max_age_ms(100);
  /// assert!(recency.is_satisfied_by(Duration::from_millis(50)));
  /// assert!(!recency.is_satisfied_by(Duration::from_millis(150)));
  /// ```
  #[inline]
  pub const fn max_age_ms(ms: u32) -> Self {
    Self::MaxAge(Duration::from_millis(ms as u64))
  }

  /// Whether a snapshot captured `age` ago is fresh enough.
  ///
  /// # Example
  ///
  /// ```
  /// use axlocate::Recency;
  /// use std::time::Duration;
  ///
  /// assert!(Recency::Any.is_satisfied_by(Duration::from_secs(1000)));
  /// assert!(!Recency::Current.is_satisfied_by(Duration::ZERO));
  /// ```
  #[inline]
  pub fn is_satisfied_by(&self, age: Duration) -> bool {
    match self {
      Self::Any => true,
      Self::Current => false,
      Self::MaxAge(max) => age <= *max,
    }
  }
}

impl From<bool> for Recency {
  /// Maps a plain "check staleness" flag.
  fn from(check_staleness: bool) -> Self {
    if check_staleness {
      Self::Current
    } else {
      Self::Any
    }
  }
}

impl Default for Recency {
  /// Serve from cache.
  fn default() -> Self {
    Self::Any
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn any_accepts_any_age() {
    let recency = Recency::Any;
    assert!(recency.is_satisfied_by(Duration::ZERO));
    assert!(recency.is_satisfied_by(Duration::from_secs(1000)));
  }

  #[test]
  fn current_rejects_any_age() {
    let recency = Recency::Current;
    assert!(!recency.is_satisfied_by(Duration::ZERO));
    assert!(!recency.is_satisfied_by(Duration::from_secs(1)));
  }

  #[test]
  fn max_age_checks_duration() {
    let recency = Recency::max_age_ms(100);
    assert!(recency.is_satisfied_by(Duration::from_millis(50)));
    assert!(recency.is_satisfied_by(Duration::from_millis(100)));
    assert!(!recency.is_satisfied_by(Duration::from_millis(101)));
  }

  #[test]
  fn staleness_flag_maps_to_recency() {
    assert_eq!(Recency::from(false), Recency::Any);
    assert_eq!(Recency::from(true), Recency::Current);
  }

  #[test]
  fn default_is_any() {
    assert_eq!(Recency::default(), Recency::Any);
  }
}
