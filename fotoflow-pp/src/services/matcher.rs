//! Payload-to-registration matching
//!
//! Three tiers, strongest first: the unique QR token, then the numeric
//! registration id, then the (first, last, email) identity triple. The tier
//! that matched is reported so the processing log can show how confident the
//! attribution was.

use fotoflow_common::Result;
use sqlx::SqlitePool;

use crate::db::registrations;
use crate::models::{IdentityPayload, Registration};

/// Which lookup tier produced the match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    Token,
    NumericId,
    NameEmail,
}

impl MatchTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchTier::Token => "token",
            MatchTier::NumericId => "numeric_id",
            MatchTier::NameEmail => "name_email",
        }
    }
}

/// Resolve an identity payload to a registration, or `None` when no tier hits
pub async fn match_payload(
    pool: &SqlitePool,
    payload: &IdentityPayload,
) -> Result<Option<(Registration, MatchTier)>> {
    if let Some(reg) = registrations::find_by_token(pool, &payload.token).await? {
        tracing::debug!(registration_id = reg.id, "matched by token");
        return Ok(Some((reg, MatchTier::Token)));
    }

    if let Some(reg) = registrations::find_by_id(pool, payload.registration_id).await? {
        tracing::debug!(registration_id = reg.id, "matched by numeric id");
        return Ok(Some((reg, MatchTier::NumericId)));
    }

    if let Some(reg) = registrations::find_by_identity(
        pool,
        &payload.first_name,
        &payload.last_name,
        &payload.email,
    )
    .await?
    {
        tracing::debug!(registration_id = reg.id, "matched by name and email");
        return Ok(Some((reg, MatchTier::NameEmail)));
    }

    tracing::debug!(
        registration_id = payload.registration_id,
        "payload matched no registration"
    );
    Ok(None)
}
