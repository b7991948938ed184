//! Repository interface and its in-memory implementation backed by DashMap.
//!
//! Services only talk to [`AudienceRepository`]; a relational backend can be
//! slotted in behind the same trait.

use std::collections::BTreeSet;

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use mailport_core::{MailportError, MailportResult};
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::*;
use crate::validation::SEGMENT_NAME_UNIQUE;

/// How a subscriber's segment set changes in [`AudienceRepository::sync_associations`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssociationChange {
    /// Link the given segments, keeping existing links.
    Attach(BTreeSet<Uuid>),
    /// Unlink the given segments; missing links are ignored.
    Detach(BTreeSet<Uuid>),
    /// Make the linked set exactly the given one.
    Replace(BTreeSet<Uuid>),
}

pub trait AudienceRepository: Send + Sync {
    // ─── Workspaces / users / tokens ───────────────────────────────────
    fn insert_workspace(&self, workspace: Workspace) -> MailportResult<Workspace>;
    fn get_workspace(&self, id: Uuid) -> MailportResult<Option<Workspace>>;
    fn insert_user(&self, user: User) -> MailportResult<User>;
    fn find_user_by_email(&self, email: &str) -> MailportResult<Option<User>>;
    fn insert_api_token(&self, token: ApiToken) -> MailportResult<()>;
    fn find_api_token(&self, token: &str) -> MailportResult<Option<ApiToken>>;

    // ─── Segments ──────────────────────────────────────────────────────
    fn list_segments(&self, workspace_id: Uuid) -> MailportResult<Vec<Segment>>;
    fn get_segment(&self, workspace_id: Uuid, id: Uuid) -> MailportResult<Option<Segment>>;
    fn find_segment_by_workspace_and_name(
        &self,
        workspace_id: Uuid,
        name: &str,
    ) -> MailportResult<Option<Segment>>;
    /// Fails with a `name` validation error if the workspace already has the name.
    fn insert_segment(&self, segment: Segment) -> MailportResult<Segment>;
    /// Changes only the name; associations are untouched.
    fn rename_segment(
        &self,
        workspace_id: Uuid,
        id: Uuid,
        name: String,
    ) -> MailportResult<Option<Segment>>;
    /// Removes the segment and every association row pointing at it.
    fn delete_segment(&self, workspace_id: Uuid, id: Uuid) -> MailportResult<bool>;
    fn list_subscriber_ids_for_segment(&self, segment_id: Uuid) -> MailportResult<Vec<Uuid>>;

    // ─── Subscribers ───────────────────────────────────────────────────
    fn insert_subscriber(&self, subscriber: Subscriber) -> MailportResult<Subscriber>;
    fn get_subscriber(&self, workspace_id: Uuid, id: Uuid) -> MailportResult<Option<Subscriber>>;
    fn find_subscriber_by_email(
        &self,
        workspace_id: Uuid,
        email: &str,
    ) -> MailportResult<Option<Subscriber>>;
    fn list_subscribers(&self, workspace_id: Uuid) -> MailportResult<Vec<Subscriber>>;
    fn delete_subscriber(&self, workspace_id: Uuid, id: Uuid) -> MailportResult<bool>;

    // ─── Associations ──────────────────────────────────────────────────
    fn list_segments_for_subscriber(&self, subscriber_id: Uuid) -> MailportResult<Vec<Segment>>;
    /// Applies `change` atomically for one subscriber and returns the resulting set.
    /// Fails with `NotFound` if the subscriber does not exist.
    fn sync_associations(
        &self,
        subscriber_id: Uuid,
        change: AssociationChange,
    ) -> MailportResult<Vec<Segment>>;

    // ─── Invitations ───────────────────────────────────────────────────
    fn insert_invitation(&self, invitation: Invitation) -> MailportResult<Invitation>;
    fn list_invitations(&self, workspace_id: Uuid) -> MailportResult<Vec<Invitation>>;
    fn delete_invitation(&self, workspace_id: Uuid, id: Uuid) -> MailportResult<bool>;
}

/// Thread-safe in-memory store.
pub struct ManagementStore {
    workspaces: DashMap<Uuid, Workspace>,
    users: DashMap<Uuid, User>,
    api_tokens: DashMap<String, ApiToken>,
    segments: DashMap<Uuid, Segment>,
    /// Unique index over `(workspace_id, name)`.
    segment_names: DashMap<(Uuid, String), Uuid>,
    subscribers: DashMap<Uuid, Subscriber>,
    /// `segment_subscriber` rows grouped by subscriber.
    segment_subscriber: DashMap<Uuid, BTreeSet<Uuid>>,
    invitations: DashMap<Uuid, Invitation>,
}

impl Default for ManagementStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ManagementStore {
    pub fn new() -> Self {
        info!("Management store initialized (in-memory)");
        Self {
            workspaces: DashMap::new(),
            users: DashMap::new(),
            api_tokens: DashMap::new(),
            segments: DashMap::new(),
            segment_names: DashMap::new(),
            subscribers: DashMap::new(),
            segment_subscriber: DashMap::new(),
            invitations: DashMap::new(),
        }
    }

    fn resolve_segments(&self, ids: &BTreeSet<Uuid>) -> Vec<Segment> {
        let mut segments: Vec<Segment> = ids
            .iter()
            .filter_map(|id| self.segments.get(id).map(|r| r.value().clone()))
            .collect();
        segments.sort_by(|a, b| a.name.cmp(&b.name));
        segments
    }
}

fn name_conflict() -> MailportError {
    MailportError::validation("name", SEGMENT_NAME_UNIQUE)
}

impl AudienceRepository for ManagementStore {
    // ─── Workspaces / users / tokens ───────────────────────────────────

    fn insert_workspace(&self, workspace: Workspace) -> MailportResult<Workspace> {
        self.workspaces.insert(workspace.id, workspace.clone());
        Ok(workspace)
    }

    fn get_workspace(&self, id: Uuid) -> MailportResult<Option<Workspace>> {
        Ok(self.workspaces.get(&id).map(|r| r.value().clone()))
    }

    fn insert_user(&self, user: User) -> MailportResult<User> {
        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    fn find_user_by_email(&self, email: &str) -> MailportResult<Option<User>> {
        Ok(self
            .users
            .iter()
            .find(|r| r.value().email == email)
            .map(|r| r.value().clone()))
    }

    fn insert_api_token(&self, token: ApiToken) -> MailportResult<()> {
        self.api_tokens.insert(token.token.clone(), token);
        Ok(())
    }

    fn find_api_token(&self, token: &str) -> MailportResult<Option<ApiToken>> {
        Ok(self.api_tokens.get(token).map(|r| r.value().clone()))
    }

    // ─── Segments ──────────────────────────────────────────────────────

    fn list_segments(&self, workspace_id: Uuid) -> MailportResult<Vec<Segment>> {
        let mut segments: Vec<Segment> = self
            .segments
            .iter()
            .filter(|r| r.value().workspace_id == workspace_id)
            .map(|r| r.value().clone())
            .collect();
        segments.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(segments)
    }

    fn get_segment(&self, workspace_id: Uuid, id: Uuid) -> MailportResult<Option<Segment>> {
        Ok(self
            .segments
            .get(&id)
            .filter(|r| r.value().workspace_id == workspace_id)
            .map(|r| r.value().clone()))
    }

    fn find_segment_by_workspace_and_name(
        &self,
        workspace_id: Uuid,
        name: &str,
    ) -> MailportResult<Option<Segment>> {
        let id = match self.segment_names.get(&(workspace_id, name.to_string())) {
            Some(r) => *r.value(),
            None => return Ok(None),
        };
        self.get_segment(workspace_id, id)
    }

    fn insert_segment(&self, segment: Segment) -> MailportResult<Segment> {
        match self
            .segment_names
            .entry((segment.workspace_id, segment.name.clone()))
        {
            Entry::Occupied(_) => return Err(name_conflict()),
            Entry::Vacant(slot) => {
                slot.insert(segment.id);
            }
        }
        // The index guard is released before touching `segments`; rename
        // takes the two maps in the opposite order.
        self.segments.insert(segment.id, segment.clone());
        Ok(segment)
    }

    fn rename_segment(
        &self,
        workspace_id: Uuid,
        id: Uuid,
        name: String,
    ) -> MailportResult<Option<Segment>> {
        // The segment's write guard is held for the whole rename, so renames
        // of one segment are serialized and the index always follows the row.
        let Some(mut segment) = self.segments.get_mut(&id) else {
            return Ok(None);
        };
        if segment.workspace_id != workspace_id {
            return Ok(None);
        }

        if segment.name != name {
            match self.segment_names.entry((workspace_id, name.clone())) {
                Entry::Occupied(existing) if *existing.get() != id => return Err(name_conflict()),
                Entry::Occupied(_) => {}
                Entry::Vacant(slot) => {
                    slot.insert(id);
                }
            }
            let previous = std::mem::replace(&mut segment.name, name);
            self.segment_names
                .remove_if(&(workspace_id, previous), |_, owner| *owner == id);
        }
        segment.updated_at = Utc::now();
        Ok(Some(segment.clone()))
    }

    fn delete_segment(&self, workspace_id: Uuid, id: Uuid) -> MailportResult<bool> {
        let removed = self
            .segments
            .remove_if(&id, |_, s| s.workspace_id == workspace_id);
        let Some((_, segment)) = removed else {
            return Ok(false);
        };
        self.segment_names
            .remove_if(&(workspace_id, segment.name), |_, owner| *owner == id);
        for mut links in self.segment_subscriber.iter_mut() {
            links.value_mut().remove(&id);
        }
        debug!(segment_id = %id, "Segment associations detached");
        Ok(true)
    }

    fn list_subscriber_ids_for_segment(&self, segment_id: Uuid) -> MailportResult<Vec<Uuid>> {
        Ok(self
            .segment_subscriber
            .iter()
            .filter(|r| r.value().contains(&segment_id))
            .map(|r| *r.key())
            .collect())
    }

    // ─── Subscribers ───────────────────────────────────────────────────

    fn insert_subscriber(&self, subscriber: Subscriber) -> MailportResult<Subscriber> {
        self.subscribers.insert(subscriber.id, subscriber.clone());
        Ok(subscriber)
    }

    fn get_subscriber(&self, workspace_id: Uuid, id: Uuid) -> MailportResult<Option<Subscriber>> {
        Ok(self
            .subscribers
            .get(&id)
            .filter(|r| r.value().workspace_id == workspace_id)
            .map(|r| r.value().clone()))
    }

    fn find_subscriber_by_email(
        &self,
        workspace_id: Uuid,
        email: &str,
    ) -> MailportResult<Option<Subscriber>> {
        Ok(self
            .subscribers
            .iter()
            .find(|r| r.value().workspace_id == workspace_id && r.value().email == email)
            .map(|r| r.value().clone()))
    }

    fn list_subscribers(&self, workspace_id: Uuid) -> MailportResult<Vec<Subscriber>> {
        let mut subscribers: Vec<Subscriber> = self
            .subscribers
            .iter()
            .filter(|r| r.value().workspace_id == workspace_id)
            .map(|r| r.value().clone())
            .collect();
        subscribers.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(subscribers)
    }

    fn delete_subscriber(&self, workspace_id: Uuid, id: Uuid) -> MailportResult<bool> {
        let removed = self
            .subscribers
            .remove_if(&id, |_, s| s.workspace_id == workspace_id)
            .is_some();
        if removed {
            self.segment_subscriber.remove(&id);
        }
        Ok(removed)
    }

    // ─── Associations ──────────────────────────────────────────────────

    fn list_segments_for_subscriber(&self, subscriber_id: Uuid) -> MailportResult<Vec<Segment>> {
        let ids = self
            .segment_subscriber
            .get(&subscriber_id)
            .map(|r| r.value().clone())
            .unwrap_or_default();
        Ok(self.resolve_segments(&ids))
    }

    fn sync_associations(
        &self,
        subscriber_id: Uuid,
        change: AssociationChange,
    ) -> MailportResult<Vec<Segment>> {
        // Holding the subscriber's read guard keeps a concurrent delete from
        // removing it between the check and the write.
        let Some(_subscriber) = self.subscribers.get(&subscriber_id) else {
            return Err(MailportError::not_found("subscriber", subscriber_id));
        };
        let ids = {
            let mut links = self.segment_subscriber.entry(subscriber_id).or_default();
            match change {
                AssociationChange::Attach(ids) => links.extend(ids),
                AssociationChange::Detach(ids) => links.retain(|id| !ids.contains(id)),
                AssociationChange::Replace(ids) => *links = ids,
            }
            links.clone()
        };
        Ok(self.resolve_segments(&ids))
    }

    // ─── Invitations ───────────────────────────────────────────────────

    fn insert_invitation(&self, invitation: Invitation) -> MailportResult<Invitation> {
        self.invitations.insert(invitation.id, invitation.clone());
        Ok(invitation)
    }

    fn list_invitations(&self, workspace_id: Uuid) -> MailportResult<Vec<Invitation>> {
        let mut invitations: Vec<Invitation> = self
            .invitations
            .iter()
            .filter(|r| r.value().workspace_id == workspace_id)
            .map(|r| r.value().clone())
            .collect();
        invitations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(invitations)
    }

    fn delete_invitation(&self, workspace_id: Uuid, id: Uuid) -> MailportResult<bool> {
        Ok(self
            .invitations
            .remove_if(&id, |_, i| i.workspace_id == workspace_id)
            .is_some())
    }
}
