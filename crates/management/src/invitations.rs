//! Workspace invitations: token issuance and the invitation e-mail.

use std::sync::Arc;

use chrono::Utc;
use mailport_core::config::InvitationConfig;
use mailport_core::token::random_token;
use mailport_core::{MailportError, MailportResult};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::mailer::{InvitationNotifier, InvitationTemplate};
use crate::models::*;
use crate::store::AudienceRepository;
use crate::validation;

pub struct InvitationIssuer {
    repo: Arc<dyn AudienceRepository>,
    notifier: Arc<dyn InvitationNotifier>,
    config: InvitationConfig,
}

impl InvitationIssuer {
    pub fn new(
        repo: Arc<dyn AudienceRepository>,
        notifier: Arc<dyn InvitationNotifier>,
        config: InvitationConfig,
    ) -> Self {
        Self {
            repo,
            notifier,
            config,
        }
    }

    /// Invite `email` into the acting workspace.
    ///
    /// The invitation is stored before the e-mail goes out. If sending fails
    /// and `rollback_on_mail_failure` is set, the stored row is deleted again
    /// before the error is returned.
    pub async fn issue(&self, ctx: &WorkspaceContext, email: Option<&str>) -> MailportResult<Invitation> {
        let email = validation::validate_email("email", email)?;
        let existing_user = self.repo.find_user_by_email(&email)?;

        let now = Utc::now();
        let invitation = self.repo.insert_invitation(Invitation {
            id: Uuid::new_v4(),
            workspace_id: ctx.workspace_id,
            user_id: existing_user.map(|u| u.id),
            role: self.config.default_role.clone(),
            email,
            token: random_token(self.config.effective_token_length()),
            created_at: now,
            updated_at: now,
        })?;

        let template = InvitationTemplate::for_invitation(&invitation);
        if let Err(e) = self
            .notifier
            .send_invitation_email(&invitation.email, template, &invitation)
            .await
        {
            error!(
                error = %e,
                invitation_id = %invitation.id,
                "Invitation email failed"
            );
            metrics::counter!("mail.invitation_failures").increment(1);
            if self.config.rollback_on_mail_failure {
                match self.repo.delete_invitation(ctx.workspace_id, invitation.id) {
                    Ok(_) => warn!(invitation_id = %invitation.id, "Invitation rolled back"),
                    Err(rollback) => error!(
                        error = %rollback,
                        invitation_id = %invitation.id,
                        "Invitation rollback failed"
                    ),
                }
            }
            return Err(e);
        }

        info!(
            workspace_id = %ctx.workspace_id,
            invitation_id = %invitation.id,
            existing_user = invitation.user_id.is_some(),
            invited_by = %ctx.user_id,
            "Invitation issued"
        );
        metrics::counter!("invitations.issued").increment(1);
        Ok(invitation)
    }

    pub fn list(&self, ctx: &WorkspaceContext) -> MailportResult<Vec<Invitation>> {
        self.repo.list_invitations(ctx.workspace_id)
    }

    pub fn revoke(&self, ctx: &WorkspaceContext, id: Uuid) -> MailportResult<()> {
        if !self.repo.delete_invitation(ctx.workspace_id, id)? {
            return Err(MailportError::not_found("invitation", id));
        }
        info!(workspace_id = %ctx.workspace_id, invitation_id = %id, "Invitation revoked");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{AssociationChange, ManagementStore};
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Records every dispatch; fails them all when `fail` is set.
    #[derive(Default)]
    struct RecordingNotifier {
        fail: bool,
        sent: Mutex<Vec<(String, InvitationTemplate, Uuid)>>,
    }

    #[async_trait]
    impl InvitationNotifier for RecordingNotifier {
        async fn send_invitation_email(
            &self,
            recipient: &str,
            template: InvitationTemplate,
            invitation: &Invitation,
        ) -> MailportResult<()> {
            if self.fail {
                return Err(MailportError::Mail("connection refused".into()));
            }
            self.sent
                .lock()
                .push((recipient.to_string(), template, invitation.id));
            Ok(())
        }
    }

    struct Fixture {
        store: Arc<ManagementStore>,
        notifier: Arc<RecordingNotifier>,
        issuer: InvitationIssuer,
        ctx: WorkspaceContext,
    }

    fn fixture(fail: bool, config: InvitationConfig) -> Fixture {
        let store = Arc::new(ManagementStore::new());
        let notifier = Arc::new(RecordingNotifier {
            fail,
            ..Default::default()
        });
        let issuer = InvitationIssuer::new(store.clone(), notifier.clone(), config);
        Fixture {
            store,
            notifier,
            issuer,
            ctx: WorkspaceContext {
                workspace_id: Uuid::new_v4(),
                user_id: Uuid::new_v4(),
            },
        }
    }

    #[tokio::test]
    async fn test_existing_user_is_linked() {
        let f = fixture(false, InvitationConfig::default());
        let user = f
            .store
            .insert_user(User {
                id: Uuid::new_v4(),
                name: "Jane".into(),
                email: "jane@example.com".into(),
                created_at: Utc::now(),
            })
            .unwrap();

        let invitation = f.issuer.issue(&f.ctx, Some("jane@example.com")).await.unwrap();
        assert_eq!(invitation.user_id, Some(user.id));
        assert_eq!(invitation.role, "member");
        assert_eq!(invitation.workspace_id, f.ctx.workspace_id);

        let sent = f.notifier.sent.lock();
        assert_eq!(
            *sent,
            vec![(
                "jane@example.com".to_string(),
                InvitationTemplate::ExistingUser,
                invitation.id
            )]
        );
    }

    #[tokio::test]
    async fn test_new_user_gets_registration_template() {
        let f = fixture(false, InvitationConfig::default());
        let invitation = f.issuer.issue(&f.ctx, Some("new@example.com")).await.unwrap();

        assert_eq!(invitation.user_id, None);
        assert_eq!(f.notifier.sent.lock()[0].1, InvitationTemplate::NewUser);
        assert_eq!(f.issuer.list(&f.ctx).unwrap(), vec![invitation]);
    }

    #[tokio::test]
    async fn test_tokens_are_long_and_distinct() {
        let f = fixture(false, InvitationConfig::default());
        let a = f.issuer.issue(&f.ctx, Some("a@example.com")).await.unwrap();
        let b = f.issuer.issue(&f.ctx, Some("b@example.com")).await.unwrap();

        assert_eq!(a.token.len(), 40);
        assert!(a.token.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a.token, b.token);
    }

    #[tokio::test]
    async fn test_invalid_email_creates_nothing() {
        let f = fixture(false, InvitationConfig::default());
        let err = f.issuer.issue(&f.ctx, Some("not-an-email")).await.unwrap_err();
        assert!(matches!(err, MailportError::Validation(ref e) if e.has("email")));
        assert!(f.issuer.list(&f.ctx).unwrap().is_empty());
        assert!(f.notifier.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn test_mail_failure_rolls_back_by_default() {
        let f = fixture(true, InvitationConfig::default());
        let err = f.issuer.issue(&f.ctx, Some("a@example.com")).await.unwrap_err();
        assert!(matches!(err, MailportError::Mail(_)));
        assert!(f.issuer.list(&f.ctx).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mail_failure_can_keep_invitation() {
        let f = fixture(
            true,
            InvitationConfig {
                rollback_on_mail_failure: false,
                ..InvitationConfig::default()
            },
        );
        assert!(f.issuer.issue(&f.ctx, Some("a@example.com")).await.is_err());
        assert_eq!(f.issuer.list(&f.ctx).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_revoke_is_workspace_scoped() {
        let f = fixture(false, InvitationConfig::default());
        let invitation = f.issuer.issue(&f.ctx, Some("a@example.com")).await.unwrap();
        let other = WorkspaceContext {
            workspace_id: Uuid::new_v4(),
            ..f.ctx
        };

        assert!(matches!(
            f.issuer.revoke(&other, invitation.id),
            Err(MailportError::NotFound { .. })
        ));
        f.issuer.revoke(&f.ctx, invitation.id).unwrap();
        assert!(f.issuer.list(&f.ctx).unwrap().is_empty());
    }

    /// Delegates to the in-memory store but refuses to delete invitations.
    struct UndeletableInvitations(ManagementStore);

    macro_rules! delegate {
        ($($name:ident($($arg:ident: $ty:ty),*) -> $ret:ty;)*) => {
            $(fn $name(&self, $($arg: $ty),*) -> $ret {
                self.0.$name($($arg),*)
            })*
        };
    }

    impl AudienceRepository for UndeletableInvitations {
        delegate! {
            insert_workspace(workspace: Workspace) -> MailportResult<Workspace>;
            get_workspace(id: Uuid) -> MailportResult<Option<Workspace>>;
            insert_user(user: User) -> MailportResult<User>;
            find_user_by_email(email: &str) -> MailportResult<Option<User>>;
            insert_api_token(token: ApiToken) -> MailportResult<()>;
            find_api_token(token: &str) -> MailportResult<Option<ApiToken>>;
            list_segments(workspace_id: Uuid) -> MailportResult<Vec<Segment>>;
            get_segment(workspace_id: Uuid, id: Uuid) -> MailportResult<Option<Segment>>;
            find_segment_by_workspace_and_name(workspace_id: Uuid, name: &str) -> MailportResult<Option<Segment>>;
            insert_segment(segment: Segment) -> MailportResult<Segment>;
            rename_segment(workspace_id: Uuid, id: Uuid, name: String) -> MailportResult<Option<Segment>>;
            delete_segment(workspace_id: Uuid, id: Uuid) -> MailportResult<bool>;
            list_subscriber_ids_for_segment(segment_id: Uuid) -> MailportResult<Vec<Uuid>>;
            insert_subscriber(subscriber: Subscriber) -> MailportResult<Subscriber>;
            get_subscriber(workspace_id: Uuid, id: Uuid) -> MailportResult<Option<Subscriber>>;
            find_subscriber_by_email(workspace_id: Uuid, email: &str) -> MailportResult<Option<Subscriber>>;
            list_subscribers(workspace_id: Uuid) -> MailportResult<Vec<Subscriber>>;
            delete_subscriber(workspace_id: Uuid, id: Uuid) -> MailportResult<bool>;
            list_segments_for_subscriber(subscriber_id: Uuid) -> MailportResult<Vec<Segment>>;
            sync_associations(subscriber_id: Uuid, change: AssociationChange) -> MailportResult<Vec<Segment>>;
            insert_invitation(invitation: Invitation) -> MailportResult<Invitation>;
            list_invitations(workspace_id: Uuid) -> MailportResult<Vec<Invitation>>;
        }

        fn delete_invitation(&self, _workspace_id: Uuid, id: Uuid) -> MailportResult<bool> {
            Err(MailportError::not_found("invitation", id))
        }
    }

    #[tokio::test]
    async fn test_failed_rollback_keeps_mail_error() {
        let store = Arc::new(UndeletableInvitations(ManagementStore::new()));
        let notifier = Arc::new(RecordingNotifier {
            fail: true,
            ..Default::default()
        });
        let issuer = InvitationIssuer::new(store.clone(), notifier, InvitationConfig::default());
        let ctx = WorkspaceContext {
            workspace_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
        };

        let err = issuer.issue(&ctx, Some("a@example.com")).await.unwrap_err();
        assert!(matches!(err, MailportError::Mail(_)), "got {err:?}");
        assert_eq!(store.list_invitations(ctx.workspace_id).unwrap().len(), 1);
    }
}
