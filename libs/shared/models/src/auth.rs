use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

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
    /// Role claim, falling back to `app_metadata.role` style metadata when the
    /// top-level claim is absent or is one of Supabase's generic roles.
    pub fn effective_role(&self) -> Option<&str> {
        let claim = self
            .role
            .as_deref()
            .filter(|role| !matches!(*role, "authenticated" | "anon"));
        claim.or_else(|| {
            self.metadata
                .as_ref()
                .and_then(|meta| meta.get("role"))
                .and_then(|role| role.as_str())
        })
    }
}
