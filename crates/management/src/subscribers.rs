//! Subscriber records of a workspace.

use std::sync::Arc;

use chrono::Utc;
use mailport_core::{MailportError, MailportResult};
use tracing::info;
use uuid::Uuid;

use crate::models::*;
use crate::store::AudienceRepository;
use crate::validation::{self, EMAIL_TAKEN};

#[derive(Clone)]
pub struct SubscriberService {
    repo: Arc<dyn AudienceRepository>,
}

impl SubscriberService {
    pub fn new(repo: Arc<dyn AudienceRepository>) -> Self {
        Self { repo }
    }

    pub fn list(&self, ctx: &WorkspaceContext) -> MailportResult<Vec<Subscriber>> {
        self.repo.list_subscribers(ctx.workspace_id)
    }

    pub fn get(&self, ctx: &WorkspaceContext, id: Uuid) -> MailportResult<Subscriber> {
        self.repo
            .get_subscriber(ctx.workspace_id, id)?
            .ok_or_else(|| MailportError::not_found("subscriber", id))
    }

    /// E-mail addresses are unique per workspace.
    pub fn create(
        &self,
        ctx: &WorkspaceContext,
        req: &CreateSubscriberRequest,
    ) -> MailportResult<Subscriber> {
        let email = validation::validate_email("email", req.email.as_deref())?;
        if self
            .repo
            .find_subscriber_by_email(ctx.workspace_id, &email)?
            .is_some()
        {
            return Err(MailportError::validation("email", EMAIL_TAKEN));
        }
        let now = Utc::now();
        let subscriber = self.repo.insert_subscriber(Subscriber {
            id: Uuid::new_v4(),
            workspace_id: ctx.workspace_id,
            email,
            first_name: validation::normalize(req.first_name.as_deref()),
            last_name: validation::normalize(req.last_name.as_deref()),
            created_at: now,
            updated_at: now,
        })?;
        info!(workspace_id = %ctx.workspace_id, subscriber_id = %subscriber.id, "Subscriber created");
        Ok(subscriber)
    }

    pub fn delete(&self, ctx: &WorkspaceContext, id: Uuid) -> MailportResult<()> {
        if !self.repo.delete_subscriber(ctx.workspace_id, id)? {
            return Err(MailportError::not_found("subscriber", id));
        }
        info!(workspace_id = %ctx.workspace_id, subscriber_id = %id, "Subscriber deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ManagementStore;

    fn ctx() -> WorkspaceContext {
        WorkspaceContext {
            workspace_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
        }
    }

    fn request(email: &str) -> CreateSubscriberRequest {
        CreateSubscriberRequest {
            email: Some(email.to_string()),
            first_name: Some(" Jane ".to_string()),
            last_name: Some("".to_string()),
        }
    }

    #[test]
    fn test_create_normalizes_fields() {
        let service = SubscriberService::new(Arc::new(ManagementStore::new()));
        let ctx = ctx();
        let sub = service.create(&ctx, &request("jane@example.com")).unwrap();
        assert_eq!(sub.first_name.as_deref(), Some("Jane"));
        assert_eq!(sub.last_name, None);
        assert_eq!(service.get(&ctx, sub.id).unwrap(), sub);
    }

    #[test]
    fn test_email_unique_per_workspace() {
        let service = SubscriberService::new(Arc::new(ManagementStore::new()));
        let ctx = ctx();
        service.create(&ctx, &request("jane@example.com")).unwrap();
        assert!(service.create(&ctx, &request("jane@example.com")).is_err());

        let other = WorkspaceContext {
            workspace_id: Uuid::new_v4(),
            ..ctx
        };
        assert!(service.create(&other, &request("jane@example.com")).is_ok());
    }

    #[test]
    fn test_subscriber_hidden_from_other_workspace() {
        let service = SubscriberService::new(Arc::new(ManagementStore::new()));
        let ctx = ctx();
        let sub = service.create(&ctx, &request("jane@example.com")).unwrap();
        let other = WorkspaceContext {
            workspace_id: Uuid::new_v4(),
            ..ctx
        };
        assert!(matches!(
            service.get(&other, sub.id),
            Err(MailportError::NotFound { .. })
        ));
        assert!(service.delete(&other, sub.id).is_err());
        service.delete(&ctx, sub.id).unwrap();
    }
}
