use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub app_metadata: Option<serde_json::Value>,
    pub user_metadata: Option<serde_json::Value>,
    pub aud: Option<String>,
    pub iat: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    /// Supabase issues UUID subjects; anything else cannot own store rows.
    pub fn uuid(&self) -> Result<Uuid, String> {
        Uuid::parse_str(&self.id).map_err(|_| format!("User id '{}' is not a UUID", self.id))
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.role.as_deref().map(|r| r.eq_ignore_ascii_case(role)).unwrap_or(false)
    }

    pub fn is_doctor(&self) -> bool {
        self.has_role("doctor")
    }
}
