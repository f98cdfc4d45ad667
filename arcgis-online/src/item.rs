//! Item kinds and the definition header format.
//!
//! Definition retrieval emits a one-line header ahead of the compact JSON
//! body, and recreation parses it back. The grammar is strict: exact
//! `" | "` delimiters, fixed field order. Formatting then parsing must
//! recover the original fields.

use crate::error::{ArcGisError, Result};

/// The closed set of item types this bridge knows how to extract and create
///
/// The portal's type tags are an open-ended vendor set; anything outside
/// this enum is an explicit unsupported-type error rather than a silent
/// fallback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ItemKind {
    FeatureService,
    WebMap,
    Dashboard,
    WebApp,
}

impl ItemKind {
    /// Map a portal type tag to a kind, `None` when unsupported
    pub fn from_type_tag(tag: &str) -> Option<Self> {
        match tag {
            "Feature Service" => Some(ItemKind::FeatureService),
            "Web Map" => Some(ItemKind::WebMap),
            "Dashboard" => Some(ItemKind::Dashboard),
            "Web Mapping Application" => Some(ItemKind::WebApp),
            _ => None,
        }
    }

    /// The portal type tag for this kind
    pub fn type_tag(&self) -> &'static str {
        match self {
            ItemKind::FeatureService => "Feature Service",
            ItemKind::WebMap => "Web Map",
            ItemKind::Dashboard => "Dashboard",
            ItemKind::WebApp => "Web Mapping Application",
        }
    }

    /// Whether the item's JSON definition lives behind the item-data
    /// endpoint (web maps, dashboards, apps) rather than the service URL
    pub fn uses_item_data(&self) -> bool {
        !matches!(self, ItemKind::FeatureService)
    }
}

/// Parsed form of the definition header line
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemHeader {
    pub title: String,
    pub type_tag: String,
    pub created: String,
}

impl ItemHeader {
    pub fn new<T, K, C>(title: T, type_tag: K, created: C) -> Self
    where
        T: Into<String>,
        K: Into<String>,
        C: Into<String>,
    {
        Self {
            title: title.into(),
            type_tag: type_tag.into(),
            created: created.into(),
        }
    }

    /// Render the header line: `Item: {title} | Type: {type} | Created: {created}`
    pub fn format(&self) -> String {
        format!(
            "Item: {} | Type: {} | Created: {}",
            self.title, self.type_tag, self.created
        )
    }

    /// Parse a header line produced by [`ItemHeader::format`]
    ///
    /// Malformed headers fail with a descriptive [`ArcGisError::MalformedHeader`].
    pub fn parse(line: &str) -> Result<Self> {
        let rest = line.trim_end().strip_prefix("Item: ").ok_or_else(|| {
            ArcGisError::malformed_header("expected the line to start with 'Item: '")
        })?;
        let (title, rest) = rest
            .split_once(" | Type: ")
            .ok_or_else(|| ArcGisError::malformed_header("missing ' | Type: ' delimiter"))?;
        let (type_tag, created) = rest
            .split_once(" | Created: ")
            .ok_or_else(|| ArcGisError::malformed_header("missing ' | Created: ' delimiter"))?;

        Ok(Self::new(title, type_tag, created))
    }
}
