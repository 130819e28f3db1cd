//! Destination and source field vocabulary for flows.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;
use utoipa::ToSchema;

/// Catalog attribute that can receive generated content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Destination {
    #[serde(rename = "Product Title")]
    ProductTitle,
    #[serde(rename = "Product Description")]
    ProductDescription,
    #[serde(rename = "SEO Title")]
    SeoTitle,
    #[serde(rename = "SEO Description")]
    SeoDescription,
    #[serde(rename = "Tags")]
    Tags,
    #[serde(rename = "Alt Text (Images)", alias = "Alt Text")]
    AltText,
    #[serde(rename = "Metafields")]
    Metafields,
}

impl Destination {
    pub const ALL: [Destination; 7] = [
        Destination::ProductTitle,
        Destination::ProductDescription,
        Destination::SeoTitle,
        Destination::SeoDescription,
        Destination::Tags,
        Destination::AltText,
        Destination::Metafields,
    ];

    /// Label as shown in the admin UI and stored in flows.
    pub fn label(self) -> &'static str {
        match self {
            Destination::ProductTitle => "Product Title",
            Destination::ProductDescription => "Product Description",
            Destination::SeoTitle => "SEO Title",
            Destination::SeoDescription => "SEO Description",
            Destination::Tags => "Tags",
            Destination::AltText => "Alt Text (Images)",
            Destination::Metafields => "Metafields",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "Product Title" => Some(Destination::ProductTitle),
            "Product Description" => Some(Destination::ProductDescription),
            "SEO Title" => Some(Destination::SeoTitle),
            "SEO Description" => Some(Destination::SeoDescription),
            "Tags" => Some(Destination::Tags),
            "Alt Text (Images)" | "Alt Text" => Some(Destination::AltText),
            "Metafields" => Some(Destination::Metafields),
            _ => None,
        }
    }

    /// Whether a generation call writes its text into this destination.
    ///
    /// Tags, alt text and metafields are part of the vocabulary but never
    /// populated by the batch runner.
    pub fn receives_generated_text(self) -> bool {
        matches!(
            self,
            Destination::ProductTitle
                | Destination::ProductDescription
                | Destination::SeoTitle
                | Destination::SeoDescription
        )
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Source field labels offered when building a flow.
pub const SOURCE_FIELDS: [&str; 12] = [
    "Product Title",
    "Product Description",
    "SEO Title",
    "SEO Description",
    "Vendor",
    "Tags",
    "Min Variant Price",
    "Max Variant Price",
    "Options",
    "Total Inventory",
    "Images",
    "Metafield",
];

pub fn is_known_source_field(label: &str) -> bool {
    SOURCE_FIELDS.contains(&label.trim())
}

/// Ordered, de-duplicated set of recognized destinations.
///
/// Built leniently from raw labels: anything outside the vocabulary is dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DestinationSet(Vec<Destination>);

impl DestinationSet {
    pub fn parse<S: AsRef<str>>(labels: &[S]) -> Self {
        let mut destinations = Vec::with_capacity(labels.len());
        for label in labels {
            match Destination::from_label(label.as_ref()) {
                Some(destination) if !destinations.contains(&destination) => {
                    destinations.push(destination)
                }
                Some(_) => {}
                None => debug!(label = label.as_ref(), "Ignoring unknown destination"),
            }
        }
        Self(destinations)
    }

    pub fn contains(&self, destination: Destination) -> bool {
        self.0.contains(&destination)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = Destination> + '_ {
        self.0.iter().copied()
    }

    /// True if at least one destination can hold generated text.
    pub fn accepts_generated_text(&self) -> bool {
        self.iter().any(Destination::receives_generated_text)
    }

    pub fn labels(&self) -> Vec<String> {
        self.iter().map(|d| d.label().to_string()).collect()
    }
}

impl FromIterator<Destination> for DestinationSet {
    fn from_iter<I: IntoIterator<Item = Destination>>(iter: I) -> Self {
        let mut destinations = Vec::new();
        for destination in iter {
            if !destinations.contains(&destination) {
                destinations.push(destination);
            }
        }
        Self(destinations)
    }
}
