//! Access decision engine
//! ----------------------
//! Composes the resolvers into one ordered, short-circuiting decision:
//! filename equality, org existence, ownership binding, visibility, then
//! membership. The membership probe is the engine's only I/O and runs only
//! for private objects with a principal present.

use crate::directory::{AttachmentRecord, Directory, OrgRecord};
use crate::error::AppResult;

/// The authenticated caller, as attached to the inbound request by the
/// external authenticator. Absent means anonymous.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub account_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    /// Object absent, filename mismatch, or path org does not own the
    /// object. All collapse to the same outward response.
    NotFound,
    InvalidOrg,
    Unauthenticated,
    Unauthorized,
}

/// Ephemeral per-request decision; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessDecision {
    pub allow: bool,
    pub reason: Option<DenialReason>,
}

impl AccessDecision {
    pub fn allowed() -> Self {
        Self { allow: true, reason: None }
    }

    pub fn denied(reason: DenialReason) -> Self {
        Self { allow: false, reason: Some(reason) }
    }
}

/// Decide whether `principal` may retrieve `attachment` under `org`.
///
/// Steps, each short-circuiting:
/// 1. attachment absent or stored filename differs from the requested one
///    (exact, case-sensitive) -> NotFound. Prevents serving content under a
///    caller-chosen label.
/// 2. org absent -> InvalidOrg.
/// 3. org does not own the attachment -> NotFound. Authorization binds to
///    the owning org; the path segment is routing only.
/// 4. public objects are readable by anyone, no principal required.
/// 5. no principal -> Unauthenticated.
/// 6. principal not a member of the owning org -> Unauthorized.
pub async fn decide<D: Directory + ?Sized>(
    directory: &D,
    attachment: Option<&AttachmentRecord>,
    org: Option<&OrgRecord>,
    requested_filename: &str,
    principal: Option<&Principal>,
) -> AppResult<AccessDecision> {
    let Some(attachment) = attachment else {
        return Ok(AccessDecision::denied(DenialReason::NotFound));
    };
    if attachment.file_name != requested_filename {
        return Ok(AccessDecision::denied(DenialReason::NotFound));
    }

    let Some(org) = org else {
        return Ok(AccessDecision::denied(DenialReason::InvalidOrg));
    };
    if org.id != attachment.org_id {
        return Ok(AccessDecision::denied(DenialReason::NotFound));
    }

    if attachment.is_public {
        return Ok(AccessDecision::allowed());
    }

    let Some(principal) = principal else {
        return Ok(AccessDecision::denied(DenialReason::Unauthenticated));
    };
    if !directory.is_member(org.id, &principal.account_id).await? {
        return Ok(AccessDecision::denied(DenialReason::Unauthorized));
    }

    Ok(AccessDecision::allowed())
}
