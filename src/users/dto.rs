use serde::Deserialize;

/// Request body for `PUT /users/{id}`.
///
/// Missing fields default to empty so validation can name them.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateUserRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub password: Option<String>, // plain text, hashed before persistence
}
