/*!
Element types.

Types describe what an element *is* in the UI hierarchy. Providers map their
platform type codes onto this closed set; anything unmapped becomes `Other`.
Documents name elements `XCUIElementType<Type>`, and queries accept either form.
*/

#![allow(missing_docs)]

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

/// Prefix of element names in serialized documents.
pub const TYPE_NAME_PREFIX: &str = "XCUIElementType";

macro_rules! element_types {
  ($($variant:ident),+ $(,)?) => {
    /// Element type (closed set).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, Default)]
    #[ts(export)]
    pub enum ElementType {
      #[default]
      Other,
      $($variant),+
    }

    impl ElementType {
      /// Short type name, e.g. `Button`.
      pub const fn as_str(&self) -> &'static str {
        match self {
          Self::Other => "Other",
          $(Self::$variant => stringify!($variant)),+
        }
      }

      /// Look up a short type name. Exact, case-sensitive.
      pub fn from_short_name(name: &str) -> Option<Self> {
        match name {
          "Other" => Some(Self::Other),
          $(stringify!($variant) => Some(Self::$variant),)+
          _ => None,
        }
      }
    }
  };
}

element_types! {
  Any,
  Application,
  Group,
  Window,
  Sheet,
  Drawer,
  Alert,
  Dialog,
  Button,
  RadioButton,
  RadioGroup,
  CheckBox,
  DisclosureTriangle,
  PopUpButton,
  ComboBox,
  MenuButton,
  ToolbarButton,
  Popover,
  Keyboard,
  Key,
  NavigationBar,
  TabBar,
  TabGroup,
  Toolbar,
  StatusBar,
  Table,
  TableRow,
  TableColumn,
  Outline,
  OutlineRow,
  Browser,
  CollectionView,
  Slider,
  PageIndicator,
  ProgressIndicator,
  ActivityIndicator,
  SegmentedControl,
  Picker,
  PickerWheel,
  Switch,
  Toggle,
  Link,
  Image,
  Icon,
  SearchField,
  ScrollView,
  ScrollBar,
  StaticText,
  TextField,
  SecureTextField,
  DatePicker,
  TextView,
  Menu,
  MenuItem,
  MenuBar,
  MenuBarItem,
  Map,
  WebView,
  IncrementArrow,
  DecrementArrow,
  Timeline,
  RatingIndicator,
  ValueIndicator,
  SplitGroup,
  Splitter,
  RelevanceIndicator,
  ColorWell,
  HelpTag,
  Matte,
  DockItem,
  Ruler,
  RulerMarker,
  Grid,
  LevelIndicator,
  Cell,
  LayoutArea,
  LayoutItem,
  Handle,
  Stepper,
  Tab,
  TouchBar,
  StatusItem,
}

impl ElementType {
  /// Look up either a short (`Button`) or document (`XCUIElementTypeButton`) name.
  ///
  /// # Example
  ///
  /// ```
  /// use axlocate::a11y::ElementType;
  ///
  /// assert_eq!(ElementType::from_name("Button"), Some(ElementType::Button));
  /// assert_eq!(ElementType::from_name("XCUIElementTypeButton"), Some(ElementType::Button));
  /// assert_eq!(ElementType::from_name("Gizmo"), None);
  /// ```
  pub fn from_name(name: &str) -> Option<Self> {
    Self::from_short_name(name.strip_prefix(TYPE_NAME_PREFIX).unwrap_or(name))
  }

  /// Name used for this type's elements in serialized documents.
  pub fn document_name(&self) -> String {
    format!("{TYPE_NAME_PREFIX}{}", self.as_str())
  }
}

impl fmt::Display for ElementType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}
