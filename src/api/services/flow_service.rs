//! Flow service: CRUD of flow definitions over the injected key-value store.
//!
//! All flows live in a single record under `flows`, an array in creation
//! order. Writers take a process-local lock so concurrent edits do not lose
//! updates through read-modify-write races.

use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::destination::{Destination, SOURCE_FIELDS, is_known_source_field};
use crate::models::flow::{DEFAULT_FLOW_DESCRIPTION, DEFAULT_FLOW_TITLE, FLOW_TEMPLATES};
use crate::models::{DestinationSet, Flow, FlowDraft, FlowTemplate};
use crate::storage::traits::{get_json, put_json};
use crate::storage::{KeyValueStore, StorageError};

/// Storage key holding every flow.
pub const FLOWS_KEY: &str = "flows";

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("{0}")]
    Validation(String),
    #[error("Flow not found: {0}")]
    NotFound(String),
    #[error("Template not found: {0}")]
    TemplateNotFound(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Source and destination labels offered by the flow editor.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FlowOptions {
    pub source_fields: Vec<String>,
    pub destinations: Vec<String>,
}

impl FlowOptions {
    pub fn vocabulary() -> Self {
        Self {
            source_fields: SOURCE_FIELDS.iter().map(|s| s.to_string()).collect(),
            destinations: Destination::ALL.iter().map(|d| d.label().to_string()).collect(),
        }
    }
}

/// Check a draft and fill in title/description defaults.
fn normalize_draft(draft: FlowDraft) -> Result<FlowDraft, FlowError> {
    let mut source_fields: Vec<String> = Vec::with_capacity(draft.source_fields.len());
    for field in draft.source_fields.iter().map(|s| s.trim()) {
        if !is_known_source_field(field) {
            debug!(field, "Ignoring unknown source field");
        } else if !source_fields.iter().any(|f| f == field) {
            source_fields.push(field.to_string());
        }
    }
    if source_fields.is_empty() {
        return Err(FlowError::Validation(
            "At least one source field is required".to_string(),
        ));
    }

    let destinations = DestinationSet::parse(&draft.destinations);
    if destinations.is_empty() {
        return Err(FlowError::Validation(
            "At least one destination is required".to_string(),
        ));
    }

    let non_blank = |value: Option<String>, default: &str| {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| default.to_string())
    };

    Ok(FlowDraft {
        title: Some(non_blank(draft.title, DEFAULT_FLOW_TITLE)),
        description: Some(non_blank(draft.description, DEFAULT_FLOW_DESCRIPTION)),
        selection_type: draft.selection_type,
        source_fields,
        destinations: destinations.labels(),
        prompt: draft.prompt,
    })
}

fn apply_draft(flow: &mut Flow, draft: FlowDraft) {
    flow.title = draft.title.unwrap_or_else(|| DEFAULT_FLOW_TITLE.to_string());
    flow.description = draft
        .description
        .unwrap_or_else(|| DEFAULT_FLOW_DESCRIPTION.to_string());
    flow.selection_type = draft.selection_type;
    flow.source_fields = draft.source_fields;
    flow.destinations = draft.destinations;
    flow.prompt = draft.prompt;
}

/// Service for managing flow definitions.
pub struct FlowService {
    store: Arc<dyn KeyValueStore>,
    write_lock: Mutex<()>,
}

impl FlowService {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// All flows in creation order.
    pub async fn list_flows(&self) -> Result<Vec<Flow>, FlowError> {
        Ok(get_json(self.store.as_ref(), FLOWS_KEY)
            .await?
            .unwrap_or_default())
    }

    pub async fn get_flow(&self, flow_id: &str) -> Result<Flow, FlowError> {
        self.list_flows()
            .await?
            .into_iter()
            .find(|f| f.id == flow_id)
            .ok_or_else(|| FlowError::NotFound(flow_id.to_string()))
    }

    pub async fn create_flow(&self, draft: FlowDraft) -> Result<Flow, FlowError> {
        let draft = normalize_draft(draft)?;
        let _guard = self.write_lock.lock().await;

        let mut flows = self.list_flows().await?;
        let mut flow = Flow {
            id: Uuid::new_v4().to_string(),
            title: String::new(),
            description: String::new(),
            selection_type: Default::default(),
            source_fields: Vec::new(),
            destinations: Vec::new(),
            prompt: String::new(),
        };
        apply_draft(&mut flow, draft);
        flows.push(flow.clone());
        self.save(&flows).await?;

        info!(flow_id = %flow.id, title = %flow.title, "Created flow");
        Ok(flow)
    }

    pub async fn update_flow(&self, flow_id: &str, draft: FlowDraft) -> Result<Flow, FlowError> {
        let draft = normalize_draft(draft)?;
        let _guard = self.write_lock.lock().await;

        let mut flows = self.list_flows().await?;
        let flow = flows
            .iter_mut()
            .find(|f| f.id == flow_id)
            .ok_or_else(|| FlowError::NotFound(flow_id.to_string()))?;
        apply_draft(flow, draft);
        let updated = flow.clone();
        self.save(&flows).await?;

        info!(flow_id = %updated.id, "Updated flow");
        Ok(updated)
    }

    pub async fn delete_flow(&self, flow_id: &str) -> Result<(), FlowError> {
        let _guard = self.write_lock.lock().await;

        let mut flows = self.list_flows().await?;
        let before = flows.len();
        flows.retain(|f| f.id != flow_id);
        if flows.len() == before {
            warn!(flow_id, "Delete requested for unknown flow");
            return Err(FlowError::NotFound(flow_id.to_string()));
        }
        self.save(&flows).await?;

        info!(flow_id, "Deleted flow");
        Ok(())
    }

    pub fn templates(&self) -> &'static [FlowTemplate] {
        &FLOW_TEMPLATES
    }

    /// Create a new flow from a built-in template.
    pub async fn create_from_template(&self, template_id: &str) -> Result<Flow, FlowError> {
        let template = FlowTemplate::find(template_id)
            .ok_or_else(|| FlowError::TemplateNotFound(template_id.to_string()))?;
        self.create_flow(template.to_draft()).await
    }

    pub fn options(&self) -> FlowOptions {
        FlowOptions::vocabulary()
    }

    async fn save(&self, flows: &[Flow]) -> Result<(), FlowError> {
        put_json(self.store.as_ref(), FLOWS_KEY, &flows).await?;
        Ok(())
    }
}
