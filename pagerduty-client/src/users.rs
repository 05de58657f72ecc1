use serde::{
    Deserialize,
    Serialize,
};

/// Largest page the users endpoint hands out.
pub const MAX_USERS_PAGE_LIMIT: u32 = 100;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize)]
pub struct User {
    #[serde(default, deserialize_with = "crate::serde_ext::null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "crate::serde_ext::null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "crate::serde_ext::null_as_default")]
    pub email: String,
    #[serde(default, deserialize_with = "crate::serde_ext::null_as_default")]
    pub avatar_url: String,
    #[serde(default, deserialize_with = "crate::serde_ext::null_as_default")]
    pub color: String,
    #[serde(default, deserialize_with = "crate::serde_ext::null_as_default")]
    pub job_title: String,
    #[serde(default, deserialize_with = "crate::serde_ext::null_as_default")]
    pub role: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ListUsersOptions {
    pub limit: u32,
    pub offset: u32,
}

impl Default for ListUsersOptions {
    fn default() -> Self {
        Self {
            limit: MAX_USERS_PAGE_LIMIT,
            offset: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ListUsersResponse {
    #[serde(default, deserialize_with = "crate::serde_ext::null_as_default")]
    pub users: Vec<User>,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub more: bool,
    #[serde(default)]
    pub total: Option<u32>,
}
