//! Links between one subscriber and the workspace's segments.

use std::collections::BTreeSet;
use std::sync::Arc;

use mailport_core::{MailportError, MailportResult};
use tracing::info;
use uuid::Uuid;

use crate::models::*;
use crate::store::{AssociationChange, AudienceRepository};
use crate::validation;

#[derive(Clone)]
pub struct SubscriberSegmentService {
    repo: Arc<dyn AudienceRepository>,
}

impl SubscriberSegmentService {
    pub fn new(repo: Arc<dyn AudienceRepository>) -> Self {
        Self { repo }
    }

    fn subscriber(&self, ctx: &WorkspaceContext, subscriber_id: Uuid) -> MailportResult<Subscriber> {
        self.repo
            .get_subscriber(ctx.workspace_id, subscriber_id)?
            .ok_or_else(|| MailportError::not_found("subscriber", subscriber_id))
    }

    pub fn list(&self, ctx: &WorkspaceContext, subscriber_id: Uuid) -> MailportResult<Vec<Segment>> {
        let subscriber = self.subscriber(ctx, subscriber_id)?;
        self.repo.list_segments_for_subscriber(subscriber.id)
    }

    /// Link the given segments; already linked ones are left alone.
    pub fn add(
        &self,
        ctx: &WorkspaceContext,
        subscriber_id: Uuid,
        tags: &[Uuid],
    ) -> MailportResult<Vec<Segment>> {
        self.apply(ctx, subscriber_id, tags, AssociationChange::Attach)
    }

    /// Make the subscriber's segments exactly `tags`.
    pub fn replace(
        &self,
        ctx: &WorkspaceContext,
        subscriber_id: Uuid,
        tags: &[Uuid],
    ) -> MailportResult<Vec<Segment>> {
        self.apply(ctx, subscriber_id, tags, AssociationChange::Replace)
    }

    /// Unlink the given segments; ids that are not linked are ignored.
    pub fn remove(
        &self,
        ctx: &WorkspaceContext,
        subscriber_id: Uuid,
        tags: &[Uuid],
    ) -> MailportResult<Vec<Segment>> {
        self.apply(ctx, subscriber_id, tags, AssociationChange::Detach)
    }

    fn apply(
        &self,
        ctx: &WorkspaceContext,
        subscriber_id: Uuid,
        tags: &[Uuid],
        change: fn(BTreeSet<Uuid>) -> AssociationChange,
    ) -> MailportResult<Vec<Segment>> {
        let subscriber = self.subscriber(ctx, subscriber_id)?;
        let ids = validation::validate_tags(self.repo.as_ref(), ctx.workspace_id, tags)?;
        let change = change(ids);
        let kind = match &change {
            AssociationChange::Attach(_) => "attach",
            AssociationChange::Detach(_) => "detach",
            AssociationChange::Replace(_) => "replace",
        };
        let segments = self.repo.sync_associations(subscriber.id, change)?;
        info!(
            subscriber_id = %subscriber.id,
            change = kind,
            segments = segments.len(),
            "Subscriber segments synced"
        );
        metrics::counter!("subscriber_segments.synced", "change" => kind).increment(1);
        Ok(segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segments::SegmentService;
    use crate::store::ManagementStore;
    use crate::subscribers::SubscriberService;

    struct Fixture {
        ctx: WorkspaceContext,
        segments: SegmentService,
        subscribers: SubscriberService,
        service: SubscriberSegmentService,
    }

    impl Fixture {
        fn new() -> Self {
            let store: Arc<dyn AudienceRepository> = Arc::new(ManagementStore::new());
            Self {
                ctx: WorkspaceContext {
                    workspace_id: Uuid::new_v4(),
                    user_id: Uuid::new_v4(),
                },
                segments: SegmentService::new(store.clone()),
                subscribers: SubscriberService::new(store.clone()),
                service: SubscriberSegmentService::new(store),
            }
        }

        fn segment(&self, name: &str) -> Segment {
            self.segments
                .create(&self.ctx, &SegmentForm::named(name))
                .unwrap()
        }

        fn subscriber(&self) -> Subscriber {
            self.subscribers
                .create(
                    &self.ctx,
                    &CreateSubscriberRequest {
                        email: Some(format!("{}@example.com", Uuid::new_v4())),
                        ..Default::default()
                    },
                )
                .unwrap()
        }
    }

    fn ids(segments: &[Segment]) -> Vec<Uuid> {
        segments.iter().map(|s| s.id).collect()
    }

    #[test]
    fn test_add_is_idempotent() {
        let f = Fixture::new();
        let vip = f.segment("VIP");
        let sub = f.subscriber();

        assert_eq!(ids(&f.service.add(&f.ctx, sub.id, &[vip.id]).unwrap()), vec![vip.id]);
        assert_eq!(ids(&f.service.add(&f.ctx, sub.id, &[vip.id]).unwrap()), vec![vip.id]);
        assert_eq!(ids(&f.service.list(&f.ctx, sub.id).unwrap()), vec![vip.id]);
    }

    #[test]
    fn test_replace_swaps_the_set() {
        let f = Fixture::new();
        let old = f.segment("Old");
        let new = f.segment("New");
        let sub = f.subscriber();
        f.service.add(&f.ctx, sub.id, &[old.id]).unwrap();

        let result = f.service.replace(&f.ctx, sub.id, &[new.id]).unwrap();
        assert_eq!(ids(&result), vec![new.id]);
        assert_eq!(ids(&f.service.list(&f.ctx, sub.id).unwrap()), vec![new.id]);
    }

    #[test]
    fn test_remove_unlinked_is_noop() {
        let f = Fixture::new();
        let a = f.segment("A");
        let b = f.segment("B");
        let sub = f.subscriber();
        f.service.add(&f.ctx, sub.id, &[a.id]).unwrap();

        let result = f.service.remove(&f.ctx, sub.id, &[b.id]).unwrap();
        assert_eq!(ids(&result), vec![a.id]);

        let result = f.service.remove(&f.ctx, sub.id, &[a.id]).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_results_sorted_by_name() {
        let f = Fixture::new();
        let zeta = f.segment("Zeta");
        let alpha = f.segment("Alpha");
        let sub = f.subscriber();

        let result = f.service.add(&f.ctx, sub.id, &[zeta.id, alpha.id]).unwrap();
        assert_eq!(ids(&result), vec![alpha.id, zeta.id]);
    }

    #[test]
    fn test_unknown_subscriber_is_not_found() {
        let f = Fixture::new();
        let vip = f.segment("VIP");
        let err = f.service.add(&f.ctx, Uuid::new_v4(), &[vip.id]).unwrap_err();
        assert!(matches!(err, MailportError::NotFound { entity: "subscriber", .. }));
    }

    #[test]
    fn test_foreign_segment_rejected() {
        let f = Fixture::new();
        let sub = f.subscriber();
        let foreign_ctx = WorkspaceContext {
            workspace_id: Uuid::new_v4(),
            ..f.ctx
        };
        let foreign = f
            .segments
            .create(&foreign_ctx, &SegmentForm::named("Foreign"))
            .unwrap();

        let err = f.service.add(&f.ctx, sub.id, &[foreign.id]).unwrap_err();
        assert!(matches!(err, MailportError::Validation(ref e) if e.has("tags.0")));
        assert!(f.service.list(&f.ctx, sub.id).unwrap().is_empty());
    }
}
