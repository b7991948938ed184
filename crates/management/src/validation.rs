//! Input rules for segment names, e-mail addresses and tag lists.

use std::collections::BTreeSet;

use mailport_core::{FieldErrors, MailportError, MailportResult};
use uuid::Uuid;

use crate::store::AudienceRepository;

pub const SEGMENT_NAME_MAX: usize = 255;
pub const EMAIL_MAX: usize = 255;

pub const SEGMENT_NAME_REQUIRED: &str = "The name field is required.";
pub const SEGMENT_NAME_TOO_LONG: &str = "The name may not be greater than 255 characters.";
pub const SEGMENT_NAME_UNIQUE: &str = "The segment name must be unique.";
pub const EMAIL_REQUIRED: &str = "The email field is required.";
pub const EMAIL_TOO_LONG: &str = "The email may not be greater than 255 characters.";
pub const EMAIL_INVALID: &str = "The email must be a valid email address.";
pub const EMAIL_TAKEN: &str = "The email has already been taken.";
pub const TAGS_REQUIRED: &str = "The tags field is required.";
pub const TAGS_INVALID: &str = "The selected tags are invalid.";

/// Trim and drop empty input, the way form fields are normalized.
pub fn normalize(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Validate a segment name for `workspace_id`, returning the trimmed name.
///
/// `ignore_id` is the segment being updated; its own row does not count as
/// a duplicate.
pub fn validate_segment_name(
    repo: &dyn AudienceRepository,
    workspace_id: Uuid,
    name: Option<&str>,
    ignore_id: Option<Uuid>,
) -> MailportResult<String> {
    let Some(name) = normalize(name) else {
        return Err(MailportError::validation("name", SEGMENT_NAME_REQUIRED));
    };
    if name.chars().count() > SEGMENT_NAME_MAX {
        return Err(MailportError::validation("name", SEGMENT_NAME_TOO_LONG));
    }
    if let Some(existing) = repo.find_segment_by_workspace_and_name(workspace_id, &name)? {
        if Some(existing.id) != ignore_id {
            return Err(MailportError::validation("name", SEGMENT_NAME_UNIQUE));
        }
    }
    Ok(name)
}

/// Validate a required e-mail field, returning the trimmed address.
pub fn validate_email(field: &str, value: Option<&str>) -> MailportResult<String> {
    let Some(email) = normalize(value) else {
        return Err(MailportError::validation(field, EMAIL_REQUIRED));
    };
    if email.chars().count() > EMAIL_MAX {
        return Err(MailportError::validation(field, EMAIL_TOO_LONG));
    }
    if !looks_like_email(&email) {
        return Err(MailportError::validation(field, EMAIL_INVALID));
    }
    Ok(email)
}

fn looks_like_email(value: &str) -> bool {
    let Some((local, domain)) = value.rsplit_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !value.chars().any(char::is_whitespace)
}

/// Parse raw tag entries into segment ids. Entries that are not UUID strings
/// are reported as `tags.N`.
pub fn parse_tag_ids(tags: &[serde_json::Value]) -> MailportResult<Vec<Uuid>> {
    let mut errors = FieldErrors::new();
    let mut ids = Vec::with_capacity(tags.len());
    for (index, tag) in tags.iter().enumerate() {
        match tag.as_str().and_then(|raw| Uuid::parse_str(raw).ok()) {
            Some(id) => ids.push(id),
            None => errors.add(&format!("tags.{index}"), TAGS_INVALID),
        }
    }
    errors.into_result()?;
    Ok(ids)
}

/// Validate a tag id list against the workspace's segments.
pub fn validate_tags(
    repo: &dyn AudienceRepository,
    workspace_id: Uuid,
    tags: &[Uuid],
) -> MailportResult<BTreeSet<Uuid>> {
    if tags.is_empty() {
        return Err(MailportError::validation("tags", TAGS_REQUIRED));
    }
    let mut errors = FieldErrors::new();
    for (index, id) in tags.iter().enumerate() {
        if repo.get_segment(workspace_id, *id)?.is_none() {
            errors.add(&format!("tags.{index}"), TAGS_INVALID);
        }
    }
    errors.into_result()?;
    Ok(tags.iter().copied().collect())
}
