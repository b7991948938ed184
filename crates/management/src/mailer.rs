//! Invitation e-mail dispatch.
//!
//! The issuer only sees [`InvitationNotifier`]. [`OutboxMailer`] renders the
//! message and keeps it in an in-memory outbox; a real transport plugs in
//! behind the same trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use mailport_core::config::MailConfig;
use mailport_core::MailportResult;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::Invitation;

pub const INVITATION_SUBJECT: &str = "New Invitation!";

/// Which invitation body to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationTemplate {
    /// The address already belongs to an account; it only needs to accept.
    ExistingUser,
    /// No account yet; the link leads to registration.
    NewUser,
}

impl InvitationTemplate {
    pub fn for_invitation(invitation: &Invitation) -> Self {
        if invitation.user_id.is_some() {
            Self::ExistingUser
        } else {
            Self::NewUser
        }
    }

    pub fn view_name(self) -> &'static str {
        match self {
            Self::ExistingUser => "workspaces.emails.invitation-to-existing-user",
            Self::NewUser => "workspaces.emails.invitation-to-new-user",
        }
    }
}

#[async_trait]
pub trait InvitationNotifier: Send + Sync {
    async fn send_invitation_email(
        &self,
        recipient: &str,
        template: InvitationTemplate,
        invitation: &Invitation,
    ) -> MailportResult<()>;
}

/// A rendered message as handed to the transport.
#[derive(Debug, Clone, Serialize)]
pub struct OutgoingMail {
    pub id: Uuid,
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
    pub template: InvitationTemplate,
    pub invitation_id: Uuid,
    pub sent_at: DateTime<Utc>,
}

pub struct OutboxMailer {
    config: MailConfig,
    outbox: DashMap<Uuid, OutgoingMail>,
}

impl OutboxMailer {
    pub fn new(config: MailConfig) -> Self {
        info!(from = %config.from_email, "Outbox mailer initialized");
        Self {
            config,
            outbox: DashMap::new(),
        }
    }

    /// Messages sent so far, oldest first.
    pub fn sent(&self) -> Vec<OutgoingMail> {
        let mut mails: Vec<OutgoingMail> = self.outbox.iter().map(|r| r.value().clone()).collect();
        mails.sort_by(|a, b| a.sent_at.cmp(&b.sent_at));
        mails
    }

    pub fn render(&self, template: InvitationTemplate, invitation: &Invitation) -> String {
        let base = self.config.app_url.trim_end_matches('/');
        match template {
            InvitationTemplate::ExistingUser => format!(
                "You have been invited to join a workspace on {app}.\n\n\
                 Accept the invitation: {base}/workspaces/invitations/{token}/accept\n",
                app = self.config.from_name,
                token = invitation.token,
            ),
            InvitationTemplate::NewUser => format!(
                "You have been invited to join a workspace on {app}.\n\n\
                 Create your account to accept: {base}/register?invitation={token}\n",
                app = self.config.from_name,
                token = invitation.token,
            ),
        }
    }
}

#[async_trait]
impl InvitationNotifier for OutboxMailer {
    async fn send_invitation_email(
        &self,
        recipient: &str,
        template: InvitationTemplate,
        invitation: &Invitation,
    ) -> MailportResult<()> {
        debug!(
            to = %recipient,
            view = template.view_name(),
            invitation_id = %invitation.id,
            "Sending invitation email"
        );

        let mail = OutgoingMail {
            id: Uuid::new_v4(),
            from: format!("{} <{}>", self.config.from_name, self.config.from_email),
            to: recipient.to_string(),
            subject: INVITATION_SUBJECT.to_string(),
            body: self.render(template, invitation),
            template,
            invitation_id: invitation.id,
            sent_at: Utc::now(),
        };
        self.outbox.insert(mail.id, mail);

        metrics::counter!("mail.invitations_sent").increment(1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invitation(user_id: Option<Uuid>) -> Invitation {
        let now = Utc::now();
        Invitation {
            id: Uuid::new_v4(),
            workspace_id: Uuid::new_v4(),
            user_id,
            role: "member".into(),
            email: "jane@example.com".into(),
            token: "t".repeat(40),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_template_follows_user_link() {
        assert_eq!(
            InvitationTemplate::for_invitation(&invitation(Some(Uuid::new_v4()))),
            InvitationTemplate::ExistingUser
        );
        assert_eq!(
            InvitationTemplate::for_invitation(&invitation(None)),
            InvitationTemplate::NewUser
        );
    }

    #[tokio::test]
    async fn test_outbox_records_rendered_mail() {
        let mailer = OutboxMailer::new(MailConfig {
            app_url: "https://app.example.com/".into(),
            ..MailConfig::default()
        });
        let inv = invitation(None);
        mailer
            .send_invitation_email(&inv.email, InvitationTemplate::NewUser, &inv)
            .await
            .unwrap();

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "jane@example.com");
        assert_eq!(sent[0].subject, INVITATION_SUBJECT);
        assert!(sent[0]
            .body
            .contains(&format!("https://app.example.com/register?invitation={}", inv.token)));
    }
}
