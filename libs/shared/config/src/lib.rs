use std::env;
use std::str::FromStr;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub scheduling_store: String,
    pub patient_min_lead_minutes: i64,
    pub clinic_min_lead_minutes: i64,
    pub slot_granularity_minutes: i64,
    pub max_recurring_occurrences: u32,
    pub block_overlap_policy: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            scheduling_store: env::var("SCHEDULING_STORE")
                .unwrap_or_else(|_| "supabase".to_string()),
            patient_min_lead_minutes: parse_or_default("SCHEDULING_PATIENT_MIN_LEAD_MINUTES", 120),
            clinic_min_lead_minutes: parse_or_default("SCHEDULING_CLINIC_MIN_LEAD_MINUTES", 0),
            slot_granularity_minutes: parse_or_default("SCHEDULING_SLOT_GRANULARITY_MINUTES", 30),
            max_recurring_occurrences: parse_or_default("SCHEDULING_MAX_RECURRING_OCCURRENCES", 366),
            block_overlap_policy: env::var("SCHEDULING_BLOCK_OVERLAP_POLICY")
                .unwrap_or_else(|_| "reject".to_string()),
        };

        if config.uses_supabase_store() && !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }

    pub fn uses_supabase_store(&self) -> bool {
        !self.scheduling_store.eq_ignore_ascii_case("memory")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            supabase_jwt_secret: String::new(),
            scheduling_store: "memory".to_string(),
            patient_min_lead_minutes: 120,
            clinic_min_lead_minutes: 0,
            slot_granularity_minutes: 30,
            max_recurring_occurrences: 366,
            block_overlap_policy: "reject".to_string(),
        }
    }
}

fn parse_or_default<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display + Copy,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}
