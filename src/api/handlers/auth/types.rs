//! Request/response types for auth endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Login and registration body. Missing fields deserialize as empty strings
/// so the handlers can answer with the same validation message.
#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
pub struct Credentials {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginResponse {
    pub message: String,
    pub user: AuthUser,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct CheckResponse {
    pub authenticated: bool,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MessageResponse {
    pub message: String,
}
