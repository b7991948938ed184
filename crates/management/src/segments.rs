//! Segment (tag) lifecycle within a workspace.

use std::sync::Arc;

use chrono::Utc;
use mailport_core::{MailportError, MailportResult};
use tracing::info;
use uuid::Uuid;

use crate::models::*;
use crate::store::AudienceRepository;
use crate::validation;

#[derive(Clone)]
pub struct SegmentService {
    repo: Arc<dyn AudienceRepository>,
}

impl SegmentService {
    pub fn new(repo: Arc<dyn AudienceRepository>) -> Self {
        Self { repo }
    }

    /// Segments of the workspace with their subscriber counts, sorted by name.
    pub fn list(&self, ctx: &WorkspaceContext) -> MailportResult<Vec<SegmentSummary>> {
        self.repo
            .list_segments(ctx.workspace_id)?
            .into_iter()
            .map(|segment| -> MailportResult<SegmentSummary> {
                let subscriber_count = self.repo.list_subscriber_ids_for_segment(segment.id)?.len();
                Ok(SegmentSummary {
                    segment,
                    subscriber_count,
                })
            })
            .collect()
    }

    pub fn get(&self, ctx: &WorkspaceContext, id: Uuid) -> MailportResult<Segment> {
        self.repo
            .get_segment(ctx.workspace_id, id)?
            .ok_or_else(|| MailportError::not_found("segment", id))
    }

    pub fn create(&self, ctx: &WorkspaceContext, form: &SegmentForm) -> MailportResult<Segment> {
        let name = validation::validate_segment_name(
            self.repo.as_ref(),
            ctx.workspace_id,
            form.name.as_deref(),
            None,
        )?;
        let now = Utc::now();
        let segment = self.repo.insert_segment(Segment {
            id: Uuid::new_v4(),
            workspace_id: ctx.workspace_id,
            name,
            created_at: now,
            updated_at: now,
        })?;
        info!(
            workspace_id = %ctx.workspace_id,
            segment_id = %segment.id,
            name = %segment.name,
            "Segment created"
        );
        metrics::counter!("segments.created").increment(1);
        Ok(segment)
    }

    /// Rename a segment. Its subscriber associations are left as they are.
    pub fn update(
        &self,
        ctx: &WorkspaceContext,
        id: Uuid,
        form: &SegmentForm,
    ) -> MailportResult<Segment> {
        self.get(ctx, id)?;
        let name = validation::validate_segment_name(
            self.repo.as_ref(),
            ctx.workspace_id,
            form.name.as_deref(),
            Some(id),
        )?;
        let segment = self
            .repo
            .rename_segment(ctx.workspace_id, id, name)?
            .ok_or_else(|| MailportError::not_found("segment", id))?;
        info!(segment_id = %id, name = %segment.name, "Segment renamed");
        Ok(segment)
    }

    pub fn delete(&self, ctx: &WorkspaceContext, id: Uuid) -> MailportResult<()> {
        if !self.repo.delete_segment(ctx.workspace_id, id)? {
            return Err(MailportError::not_found("segment", id));
        }
        info!(workspace_id = %ctx.workspace_id, segment_id = %id, "Segment deleted");
        metrics::counter!("segments.deleted").increment(1);
        Ok(())
    }
}
