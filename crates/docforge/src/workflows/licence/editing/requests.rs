use std::fmt::Debug;
use std::str::FromStr;

use serde_json::{json, Value};

use crate::workflows::licence::identity::DocumentFields;
use crate::workflows::licence::storage::AssetReference;

pub const LAYER_FIRST_NAME: &str = "FIRST NAME";
pub const LAYER_LAST_NAME: &str = "LAST NAME";
pub const LAYER_IDENTIFIER: &str = "DL NUMBER";
pub const LAYER_DATE_OF_BIRTH: &str = "DOB";
pub const LAYER_ADDRESS1: &str = "Address1";
pub const LAYER_ADDRESS2: &str = "Address2";
pub const LAYER_PHOTO: &str = "PHOTO";
pub const LAYER_SIGNATURE: &str = "SIGNATURE";

/// One named-layer replacement in the template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerEdit {
    Text { layer: String, content: String },
    Image { layer: String, source: AssetReference },
}

impl LayerEdit {
    pub fn text(layer: &str, content: impl Into<String>) -> Self {
        Self::Text {
            layer: layer.to_string(),
            content: content.into(),
        }
    }

    pub fn image(layer: &str, source: AssetReference) -> Self {
        Self::Image {
            layer: layer.to_string(),
            source,
        }
    }

    pub fn layer(&self) -> &str {
        match self {
            Self::Text { layer, .. } | Self::Image { layer, .. } => layer,
        }
    }
}

/// Everything a builder needs to describe one edit job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditRequest {
    pub template: AssetReference,
    pub output_target: AssetReference,
    pub output_mime_type: String,
    pub edits: Vec<LayerEdit>,
}

impl EditRequest {
    /// Text layers for the applicant fields plus the photo and signature images.
    pub fn for_document(
        fields: &DocumentFields,
        photo: AssetReference,
        signature: AssetReference,
        template: AssetReference,
        output_target: AssetReference,
        output_mime_type: impl Into<String>,
    ) -> Self {
        let edits = vec![
            LayerEdit::text(LAYER_FIRST_NAME, fields.first_name.clone()),
            LayerEdit::text(LAYER_LAST_NAME, fields.last_name.clone()),
            LayerEdit::text(LAYER_IDENTIFIER, fields.identifier.as_str()),
            LayerEdit::text(LAYER_DATE_OF_BIRTH, fields.date_of_birth.clone()),
            LayerEdit::text(LAYER_ADDRESS1, fields.address1.clone()),
            LayerEdit::text(LAYER_ADDRESS2, fields.address2.clone()),
            LayerEdit::image(LAYER_PHOTO, photo),
            LayerEdit::image(LAYER_SIGNATURE, signature),
        ];

        Self {
            template,
            output_target,
            output_mime_type: output_mime_type.into(),
            edits,
        }
    }
}

/// Endpoint path (relative to the editing API base) plus JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct EditPayload {
    pub path: String,
    pub body: Value,
}

/// Renders an [`EditRequest`] for one endpoint shape of the editing service.
pub trait EditRequestBuilder: Debug + Send + Sync {
    fn build(&self, request: &EditRequest) -> EditPayload;
}

/// Selects which endpoint shape the service talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestVariant {
    TextLayers,
    DocumentOperations,
    LegacyOperations,
}

impl RequestVariant {
    pub fn builder(self) -> Box<dyn EditRequestBuilder> {
        match self {
            Self::TextLayers => Box::new(TextLayerBuilder),
            Self::DocumentOperations => Box::new(DocumentOperationsBuilder),
            Self::LegacyOperations => Box::new(LegacyOperationsBuilder),
        }
    }
}

impl FromStr for RequestVariant {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" | "text-layers" => Ok(Self::TextLayers),
            "document-operations" | "documentoperations" => Ok(Self::DocumentOperations),
            "operations" | "legacy" => Ok(Self::LegacyOperations),
            other => Err(other.to_string()),
        }
    }
}

fn io_blocks(request: &EditRequest) -> (Value, Value) {
    let inputs = json!([{
        "href": request.template.as_str(),
        "storage": "external",
    }]);
    let outputs = json!([{
        "href": request.output_target.as_str(),
        "storage": "external",
        "type": request.output_mime_type,
    }]);
    (inputs, outputs)
}

/// `POST /pie/psdService/text`: text layers by name, images as smart-object inputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextLayerBuilder;

impl EditRequestBuilder for TextLayerBuilder {
    fn build(&self, request: &EditRequest) -> EditPayload {
        let layers: Vec<Value> = request
            .edits
            .iter()
            .map(|edit| match edit {
                LayerEdit::Text { layer, content } => json!({
                    "name": layer,
                    "text": { "content": content },
                }),
                LayerEdit::Image { layer, source } => json!({
                    "name": layer,
                    "input": { "href": source.as_str(), "storage": "external" },
                }),
            })
            .collect();

        let (inputs, outputs) = io_blocks(request);
        EditPayload {
            path: "/pie/psdService/text".to_string(),
            body: json!({
                "inputs": inputs,
                "outputs": outputs,
                "options": { "layers": layers },
            }),
        }
    }
}

/// `POST /pie/psdService/documentOperations`: every layer flagged with `edit`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentOperationsBuilder;

impl EditRequestBuilder for DocumentOperationsBuilder {
    fn build(&self, request: &EditRequest) -> EditPayload {
        let layers: Vec<Value> = request
            .edits
            .iter()
            .map(|edit| match edit {
                LayerEdit::Text { layer, content } => json!({
                    "name": layer,
                    "edit": {},
                    "text": { "content": content },
                }),
                LayerEdit::Image { layer, source } => json!({
                    "name": layer,
                    "edit": {},
                    "input": { "href": source.as_str(), "storage": "external" },
                }),
            })
            .collect();

        let (inputs, outputs) = io_blocks(request);
        EditPayload {
            path: "/pie/psdService/documentOperations".to_string(),
            body: json!({
                "inputs": inputs,
                "outputs": outputs,
                "options": { "layers": layers },
            }),
        }
    }
}

/// `POST /operations`: flat list of named operations without explicit inputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyOperationsBuilder;

impl EditRequestBuilder for LegacyOperationsBuilder {
    fn build(&self, request: &EditRequest) -> EditPayload {
        let operations: Vec<Value> = request
            .edits
            .iter()
            .map(|edit| match edit {
                LayerEdit::Text { layer, content } => json!({
                    "name": "Replace Layer Text",
                    "layerName": layer,
                    "text": content,
                }),
                LayerEdit::Image { layer, source } => json!({
                    "name": "Replace Image",
                    "layerName": layer,
                    "image": source.as_str(),
                }),
            })
            .collect();

        EditPayload {
            path: "/operations".to_string(),
            body: json!({ "operations": operations }),
        }
    }
}
