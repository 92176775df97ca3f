/*! Accessibility trait bitmask names. */

const TRAIT_NAMES: [(u64, &str); 17] = [
  (1 << 0, "Button"),
  (1 << 1, "Link"),
  (1 << 2, "Image"),
  (1 << 3, "Selected"),
  (1 << 4, "PlaysSound"),
  (1 << 5, "KeyboardKey"),
  (1 << 6, "StaticText"),
  (1 << 7, "SummaryElement"),
  (1 << 8, "NotEnabled"),
  (1 << 9, "UpdatesFrequently"),
  (1 << 10, "SearchField"),
  (1 << 11, "StartsMediaSession"),
  (1 << 12, "Adjustable"),
  (1 << 13, "AllowsDirectInteraction"),
  (1 << 14, "CausesPageTurn"),
  (1 << 15, "TabBar"),
  (1 << 16, "Header"),
];

/// Names of the traits set in `mask`, lowest bit first. Unknown bits are ignored.
///
/// # Example
///
/// ```
/// use axlocate::a11y::trait_names;
///
/// assert_eq!(trait_names(0b1001), vec!["Button", "Selected"]);
/// assert!(trait_names(0).is_empty());
/// ```
pub fn trait_names(mask: u64) -> Vec<&'static str> {
  TRAIT_NAMES
    .iter()
    .filter(|(bit, _)| mask & bit != 0)
    .map(|(_, name)| *name)
    .collect()
}

/// Comma-separated trait names, as written into documents.
pub fn format_traits(mask: u64) -> String {
  trait_names(mask).join(", ")
}
