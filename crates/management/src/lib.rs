//! Workspace audience management: segments, subscribers, subscriber tags
//! and invitations.
//!
//! Provides the HTTP endpoints and the services behind them. Data is stored
//! through [`AudienceRepository`]; [`ManagementStore`] keeps it in DashMap.

pub mod auth;
pub mod bootstrap;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod invitations;
pub mod mailer;
pub mod models;
pub mod router;
pub mod segments;
pub mod store;
pub mod subscriber_segments;
pub mod subscribers;
pub mod validation;
pub mod views;

pub use bootstrap::{bootstrap_workspace, Bootstrap};
pub use handlers::ManagementState;
pub use invitations::InvitationIssuer;
pub use mailer::{InvitationNotifier, InvitationTemplate, OutboxMailer};
pub use router::management_router;
pub use store::{AudienceRepository, ManagementStore};
