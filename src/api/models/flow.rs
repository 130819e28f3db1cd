use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::destination::DestinationSet;

/// Prompt used for a run when the flow's own prompt is blank.
pub const DEFAULT_RUN_PROMPT: &str = "Bitte generiere Content.";

pub const DEFAULT_FLOW_TITLE: &str = "Untitled Flow";
pub const DEFAULT_FLOW_DESCRIPTION: &str = "No description";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SelectionType {
    #[default]
    Products,
    Images,
}

/// User-defined content template: prompt plus source and destination fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Flow {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub selection_type: SelectionType,
    #[serde(default)]
    pub source_fields: Vec<String>,
    #[serde(default)]
    pub destinations: Vec<String>,
    #[serde(default)]
    pub prompt: String,
}

impl Flow {
    pub fn destination_set(&self) -> DestinationSet {
        DestinationSet::parse(&self.destinations)
    }

    pub fn run_prompt(&self) -> &str {
        if self.prompt.trim().is_empty() {
            DEFAULT_RUN_PROMPT
        } else {
            &self.prompt
        }
    }
}

/// Editable part of a flow, as sent by the create and edit forms.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FlowDraft {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub selection_type: SelectionType,
    #[serde(default)]
    pub source_fields: Vec<String>,
    #[serde(default)]
    pub destinations: Vec<String>,
    #[serde(default)]
    pub prompt: String,
}

/// Built-in preset a new flow can start from.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowTemplate {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub selection_type: SelectionType,
    pub source_fields: &'static [&'static str],
    pub destinations: &'static [&'static str],
    pub prompt: &'static str,
}

impl FlowTemplate {
    pub fn find(id: &str) -> Option<&'static FlowTemplate> {
        FLOW_TEMPLATES.iter().find(|t| t.id == id)
    }

    pub fn to_draft(&self) -> FlowDraft {
        FlowDraft {
            title: Some(self.title.to_string()),
            description: Some(self.description.to_string()),
            selection_type: self.selection_type,
            source_fields: self.source_fields.iter().map(|s| s.to_string()).collect(),
            destinations: self.destinations.iter().map(|s| s.to_string()).collect(),
            prompt: self.prompt.to_string(),
        }
    }
}

pub static FLOW_TEMPLATES: [FlowTemplate; 7] = [
    FlowTemplate {
        id: "careInstructions",
        title: "Product Care Instructions",
        description: "Create product care instructions based on attributes.",
        selection_type: SelectionType::Products,
        source_fields: &["Product Description"],
        destinations: &["Product Description"],
        prompt: "Create product care instructions based on the product's attributes.",
    },
    FlowTemplate {
        id: "altText",
        title: "Product Image Alt Text",
        description: "Generate SEO optimized image alt texts.",
        selection_type: SelectionType::Images,
        source_fields: &["Images"],
        destinations: &["Alt Text (Images)"],
        prompt: "Generate SEO optimized image alt texts for the provided product images.",
    },
    FlowTemplate {
        id: "seoDescription",
        title: "Generate SEO Description",
        description: "Generate a SEO optimized product description from product title and description.",
        selection_type: SelectionType::Products,
        source_fields: &["Product Title", "Product Description"],
        destinations: &["SEO Description"],
        prompt: "Generate a SEO optimized product description from the given title and description.",
    },
    FlowTemplate {
        id: "seoTitle",
        title: "Generate SEO Title",
        description: "Generate a SEO optimized product title from product title and description.",
        selection_type: SelectionType::Products,
        source_fields: &["Product Title", "Product Description"],
        destinations: &["SEO Title"],
        prompt: "Generate a SEO optimized product title from the given title and description.",
    },
    FlowTemplate {
        id: "tagsFromImages",
        title: "Generate Tags Based on Product Images",
        description: "Generate tags used for filtering or categorization.",
        selection_type: SelectionType::Images,
        source_fields: &["Images"],
        destinations: &["Tags"],
        prompt: "Generate relevant product tags based on the provided product images.",
    },
    FlowTemplate {
        id: "titleFromImages",
        title: "Product Title Based on Product Images",
        description: "Generate a product title based on product images.",
        selection_type: SelectionType::Images,
        source_fields: &["Images"],
        destinations: &["Product Title"],
        prompt: "Generate a compelling product title based on the provided product images.",
    },
    FlowTemplate {
        id: "descriptionFromImage",
        title: "Description from Image",
        description: "Create a product description from your image.",
        selection_type: SelectionType::Images,
        source_fields: &["Images"],
        destinations: &["Product Description"],
        prompt: "Create a detailed product description from your product image.",
    },
];
