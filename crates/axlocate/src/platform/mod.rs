/*!
Platform boundary.

The OS accessibility layer is an external collaborator: this crate only defines
the contract in `traits.rs`. Concrete providers live with the embedding
application.
*/

mod traits;

pub use traits::{AccessibilityProvider, ProviderError, RawNode};

#[cfg(test)]
pub(crate) mod testing;
