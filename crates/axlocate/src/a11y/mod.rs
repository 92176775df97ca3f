/*!
Accessibility vocabulary: the closed attribute table, element types and traits.
*/

mod attribute;
mod element_type;
mod trait_mask;

pub use attribute::{Attribute, AttributeSet, DocumentAttribute, FrameComponent};
pub use element_type::{ElementType, TYPE_NAME_PREFIX};
pub use trait_mask::{format_traits, trait_names};
