//! Axum handlers for the segment, subscriber and invitation endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, Redirect};
use axum::Extension;
use mailport_core::config::InvitationConfig;
use uuid::Uuid;

use crate::error::ApiError;
use crate::extract::{Form, Json, Path};
use crate::invitations::InvitationIssuer;
use crate::mailer::InvitationNotifier;
use crate::models::*;
use crate::segments::SegmentService;
use crate::store::AudienceRepository;
use crate::subscriber_segments::SubscriberSegmentService;
use crate::subscribers::SubscriberService;
use crate::validation;
use crate::views;

/// Shared management state.
#[derive(Clone)]
pub struct ManagementState {
    pub store: Arc<dyn AudienceRepository>,
    pub segments: SegmentService,
    pub subscribers: SubscriberService,
    pub subscriber_segments: SubscriberSegmentService,
    pub invitations: Arc<InvitationIssuer>,
}

impl ManagementState {
    pub fn new(
        store: Arc<dyn AudienceRepository>,
        notifier: Arc<dyn InvitationNotifier>,
        invitations: InvitationConfig,
    ) -> Self {
        Self {
            segments: SegmentService::new(store.clone()),
            subscribers: SubscriberService::new(store.clone()),
            subscriber_segments: SubscriberSegmentService::new(store.clone()),
            invitations: Arc::new(InvitationIssuer::new(store.clone(), notifier, invitations)),
            store,
        }
    }
}

type HtmlResult = Result<Html<String>, ApiError>;
type RedirectResult = Result<Redirect, ApiError>;
type TagsResult = Result<Json<DataResponse<Vec<SegmentResource>>>, ApiError>;

fn segment_resources(segments: Vec<Segment>) -> Json<DataResponse<Vec<SegmentResource>>> {
    Json(DataResponse {
        data: segments.into_iter().map(SegmentResource::from).collect(),
    })
}

// ─── Segments ──────────────────────────────────────────────────────────────

pub async fn list_segments(
    State(state): State<ManagementState>,
    Extension(ctx): Extension<WorkspaceContext>,
) -> HtmlResult {
    let segments = state.segments.list(&ctx)?;
    Ok(Html(views::segment_index(&segments)))
}

pub async fn create_segment_form() -> Html<String> {
    Html(views::segment_form(None))
}

pub async fn store_segment(
    State(state): State<ManagementState>,
    Extension(ctx): Extension<WorkspaceContext>,
    Form(form): Form<SegmentForm>,
) -> RedirectResult {
    state.segments.create(&ctx, &form)?;
    Ok(Redirect::to("/segments"))
}

pub async fn edit_segment_form(
    State(state): State<ManagementState>,
    Extension(ctx): Extension<WorkspaceContext>,
    Path(id): Path<Uuid>,
) -> HtmlResult {
    let segment = state.segments.get(&ctx, id)?;
    Ok(Html(views::segment_form(Some(&segment))))
}

pub async fn update_segment(
    State(state): State<ManagementState>,
    Extension(ctx): Extension<WorkspaceContext>,
    Path(id): Path<Uuid>,
    Form(form): Form<SegmentForm>,
) -> RedirectResult {
    state.segments.update(&ctx, id, &form)?;
    Ok(Redirect::to("/segments"))
}

pub async fn destroy_segment(
    State(state): State<ManagementState>,
    Extension(ctx): Extension<WorkspaceContext>,
    Path(id): Path<Uuid>,
) -> RedirectResult {
    state.segments.delete(&ctx, id)?;
    Ok(Redirect::to("/segments"))
}

/// POST /segments/{id} from an HTML form; `_method` picks update or delete.
pub async fn segment_form_action(
    State(state): State<ManagementState>,
    Extension(ctx): Extension<WorkspaceContext>,
    Path(id): Path<Uuid>,
    Form(form): Form<SegmentForm>,
) -> RedirectResult {
    match form.method.as_deref() {
        Some(m) if m.eq_ignore_ascii_case("DELETE") => state.segments.delete(&ctx, id)?,
        _ => {
            state.segments.update(&ctx, id, &form)?;
        }
    }
    Ok(Redirect::to("/segments"))
}

// ─── Subscribers ───────────────────────────────────────────────────────────

pub async fn list_subscribers(
    State(state): State<ManagementState>,
    Extension(ctx): Extension<WorkspaceContext>,
) -> Result<Json<DataResponse<Vec<Subscriber>>>, ApiError> {
    let data = state.subscribers.list(&ctx)?;
    Ok(Json(DataResponse { data }))
}

pub async fn store_subscriber(
    State(state): State<ManagementState>,
    Extension(ctx): Extension<WorkspaceContext>,
    Json(req): Json<CreateSubscriberRequest>,
) -> Result<(StatusCode, Json<DataResponse<Subscriber>>), ApiError> {
    let data = state.subscribers.create(&ctx, &req)?;
    Ok((StatusCode::CREATED, Json(DataResponse { data })))
}

pub async fn show_subscriber(
    State(state): State<ManagementState>,
    Extension(ctx): Extension<WorkspaceContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<DataResponse<Subscriber>>, ApiError> {
    let data = state.subscribers.get(&ctx, id)?;
    Ok(Json(DataResponse { data }))
}

pub async fn destroy_subscriber(
    State(state): State<ManagementState>,
    Extension(ctx): Extension<WorkspaceContext>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.subscribers.delete(&ctx, id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ─── Subscriber tags ───────────────────────────────────────────────────────

pub async fn list_subscriber_tags(
    State(state): State<ManagementState>,
    Extension(ctx): Extension<WorkspaceContext>,
    Path(id): Path<Uuid>,
) -> TagsResult {
    Ok(segment_resources(state.subscriber_segments.list(&ctx, id)?))
}

pub async fn store_subscriber_tags(
    State(state): State<ManagementState>,
    Extension(ctx): Extension<WorkspaceContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<SubscriberTagsRequest>,
) -> TagsResult {
    let tags = validation::parse_tag_ids(&req.tags)?;
    Ok(segment_resources(
        state.subscriber_segments.add(&ctx, id, &tags)?,
    ))
}

pub async fn update_subscriber_tags(
    State(state): State<ManagementState>,
    Extension(ctx): Extension<WorkspaceContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<SubscriberTagsRequest>,
) -> TagsResult {
    let tags = validation::parse_tag_ids(&req.tags)?;
    Ok(segment_resources(
        state.subscriber_segments.replace(&ctx, id, &tags)?,
    ))
}

pub async fn destroy_subscriber_tags(
    State(state): State<ManagementState>,
    Extension(ctx): Extension<WorkspaceContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<SubscriberTagsRequest>,
) -> TagsResult {
    let tags = validation::parse_tag_ids(&req.tags)?;
    Ok(segment_resources(
        state.subscriber_segments.remove(&ctx, id, &tags)?,
    ))
}

// ─── Invitations ───────────────────────────────────────────────────────────

pub async fn list_invitations(
    State(state): State<ManagementState>,
    Extension(ctx): Extension<WorkspaceContext>,
) -> HtmlResult {
    let invitations = state.invitations.list(&ctx)?;
    Ok(Html(views::invitation_index(&invitations)))
}

pub async fn store_invitation(
    State(state): State<ManagementState>,
    Extension(ctx): Extension<WorkspaceContext>,
    Form(form): Form<InvitationForm>,
) -> RedirectResult {
    state.invitations.issue(&ctx, form.email.as_deref()).await?;
    Ok(Redirect::to("/workspaces/invitations"))
}

pub async fn destroy_invitation(
    State(state): State<ManagementState>,
    Extension(ctx): Extension<WorkspaceContext>,
    Path(id): Path<Uuid>,
) -> RedirectResult {
    state.invitations.revoke(&ctx, id)?;
    Ok(Redirect::to("/workspaces/invitations"))
}
