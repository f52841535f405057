//! HTTP routes for designs, templates and asset uploads.

use crate::error::{ApiError, ApiResult, created, ok, ok_with_message};
use crate::extract::{ApiBytes, ApiJson, ApiPath, ApiQuery};
use crate::state::AppState;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::HeaderMap;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::routing::{get, post};
use axum::Router;
use easel_core::assets::{AssetKind, MAX_UPLOAD_BYTES, UploadedAsset, check_upload, extension_for};
use easel_core::design::{DesignRecord, DesignUpdate, NewDesign, TemplateRecord, now_millis};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tracing::{debug, info};
use uuid::Uuid;

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let uploads = ServeDir::new(&state.upload_dir);
    Router::new()
        .route("/health", get(health))
        .route("/designs", post(create_design))
        .route("/designs/{id}", get(get_design).put(update_design).delete(delete_design))
        .route("/designs/{id}/duplicate", post(duplicate_design))
        .route("/templates", get(list_templates))
        .route("/templates/{id}", get(get_template))
        .route(
            "/assets/upload",
            // Leave headroom so oversized files reach the handler and get the
            // proper rejection message.
            post(upload_asset).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES * 2)),
        )
        .nest_service("/uploads", uploads)
        .with_state(state)
}

/// Health check
pub async fn health() -> &'static str {
    "ok"
}

/// The bearer token, used as the owner key.
fn owner(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .ok_or(ApiError::Unauthorized)
}

pub async fn create_design(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(mut request): ApiJson<NewDesign>,
) -> ApiResult<DesignRecord> {
    let owner = owner(&headers)?;
    request.validate()?;

    // An unknown template id is ignored; the design starts from the request.
    if let Some(template_id) = &request.template_id {
        if let Some(mut template) = state.templates.get_mut(template_id) {
            template.usage_count += 1;
            request.canvas_data = Some(template.canvas_data.clone());
        }
    }

    let design = DesignRecord::create(Uuid::new_v4().to_string(), owner, request, now_millis());
    state.designs.insert(design.id.clone(), design.clone());
    info!("Created design {}", design.id);
    created(design, "Design created")
}

pub async fn get_design(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<DesignRecord> {
    let owner = owner(&headers)?;
    let design = state.owned_design(&id, &owner).ok_or(ApiError::NotFound("Design"))?;
    ok(design)
}

pub async fn update_design(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiPath(id): ApiPath<String>,
    ApiJson(update): ApiJson<DesignUpdate>,
) -> ApiResult<DesignRecord> {
    let owner = owner(&headers)?;
    update.validate()?;

    // The entry guard serializes concurrent writes; the last one wins.
    let mut design = state
        .designs
        .get_mut(&id)
        .filter(|design| design.owner_id == owner)
        .ok_or(ApiError::NotFound("Design"))?;
    design.apply_update(update, now_millis());
    debug!("Saved design {} at version {}", design.id, design.version);
    ok_with_message(design.clone(), "Design saved")
}

pub async fn delete_design(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Option<()>> {
    let owner = owner(&headers)?;
    state
        .designs
        .remove_if(&id, |_, design| design.owner_id == owner)
        .ok_or(ApiError::NotFound("Design"))?;
    info!("Deleted design {id}");
    ok_with_message(None, "Design deleted")
}

pub async fn duplicate_design(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<DesignRecord> {
    let owner = owner(&headers)?;
    let original = state.owned_design(&id, &owner).ok_or(ApiError::NotFound("Design"))?;
    let copy = original.duplicate(Uuid::new_v4().to_string(), now_millis());
    state.designs.insert(copy.id.clone(), copy.clone());
    created(copy, "Design duplicated")
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateFilter {
    pub category: Option<String>,
}

/// Active templates, most used first. Scene payloads are left out.
pub async fn list_templates(
    State(state): State<Arc<AppState>>,
    ApiQuery(filter): ApiQuery<TemplateFilter>,
) -> ApiResult<Vec<TemplateRecord>> {
    let mut templates: Vec<TemplateRecord> = state
        .templates
        .iter()
        .filter(|t| t.is_active)
        .filter(|t| match &filter.category {
            Some(category) => t.category_id.as_deref() == Some(category.as_str()),
            None => true,
        })
        .map(|t| TemplateRecord {
            canvas_data: Value::Null,
            ..t.clone()
        })
        .collect();
    templates.sort_by(|a, b| {
        b.usage_count
            .cmp(&a.usage_count)
            .then(b.created_at.cmp(&a.created_at))
    });
    ok(templates)
}

pub async fn get_template(State(state): State<Arc<AppState>>, ApiPath(id): ApiPath<String>) -> ApiResult<TemplateRecord> {
    let template = state
        .templates
        .get(&id)
        .filter(|t| t.is_active)
        .map(|t| t.clone())
        .ok_or(ApiError::NotFound("Template"))?;
    ok(template)
}

#[derive(Debug, Default, Deserialize)]
pub struct UploadParams {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub name: Option<String>,
}

/// Store a raw upload under `{upload_dir}/{images|icons}/{uuid}.{ext}`.
pub async fn upload_asset(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiQuery(params): ApiQuery<UploadParams>,
    ApiBytes(body): ApiBytes,
) -> ApiResult<UploadedAsset> {
    owner(&headers)?;
    let mime = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    check_upload(&mime, body.len())?;

    let kind = params.kind.as_deref().map(AssetKind::from_name).unwrap_or_default();
    let name = params.name.unwrap_or_else(|| "Untitled".to_string());
    let extension = std::path::Path::new(&name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| extension_for(&mime).to_string());
    let file_name = format!("{}.{extension}", Uuid::new_v4());

    let folder = state.upload_dir.join(kind.folder());
    tokio::fs::create_dir_all(&folder)
        .await
        .map_err(|e| ApiError::Internal(format!("Upload failed: {e}")))?;
    tokio::fs::write(folder.join(&file_name), &body)
        .await
        .map_err(|e| ApiError::Internal(format!("Upload failed: {e}")))?;

    info!("Stored {} upload {file_name} ({} bytes)", kind.folder(), body.len());
    created(
        UploadedAsset {
            url: format!("/uploads/{}/{file_name}", kind.folder()),
            name,
            mime_type: mime,
            size: body.len(),
            kind,
        },
        "Asset uploaded",
    )
}
