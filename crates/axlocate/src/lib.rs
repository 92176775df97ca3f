/*!
Axlocate - element identity, snapshot caching and structural queries over live
accessibility trees.

```ignore
use axlocate::{Locator, Recency, Session};

// Any AccessibilityProvider implementation
let session = Session::new(provider)?;

// Find elements by path query or attribute predicate
let buttons = session.find_elements(&Locator::query("//Button[@enabled='true']")?, None)?;
let cancel = session.find_elements(&Locator::predicate("label == 'Cancel'")?, None)?;

// Resolve cached elements with explicit recency
let identity = buttons[0].identity().unwrap();
let handle = session.resolve(&identity, Recency::Any)?;              // From cache
let handle = session.resolve(&identity, Recency::Current)?;          // From provider
let handle = session.resolve(&identity, Recency::max_age_ms(100))?;  // Refresh if older

// Wait for animations to finish
session.wait_until_stable(&identity, None)?;

// Subscribe to cache events
let mut events = session.subscribe();
while let Ok(event) = events.recv().await {
    // handle event
}

// The cache is emptied when the session is dropped
drop(session);
```
*/

mod config;
mod core;
mod identity;
mod platform;

pub mod a11y;
pub mod cache;
pub mod query;
pub mod snapshot;

mod types;
pub use types::*;

pub use crate::config::SessionConfig;
pub use crate::core::{Locator, Session, SessionBuilder};
pub use crate::identity::identity_of;
pub use crate::platform::{AccessibilityProvider, ProviderError, RawNode};
