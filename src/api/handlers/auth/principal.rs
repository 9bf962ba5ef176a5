//! Authenticated identity forwarded by the route guard.

use uuid::Uuid;

/// Verified administrator identity derived from the session token.
///
/// The guard inserts it into request extensions; protected handlers take it as
/// `Extension<Principal>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    pub admin_id: Uuid,
    pub issued_at: i64,
    pub expires_at: i64,
}
