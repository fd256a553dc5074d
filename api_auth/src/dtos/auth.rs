use serde::{Deserialize, Serialize};

/// Identity behind a valid session cookie.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionStatus {
    pub uid: String,
    pub email: Option<String>,
}
