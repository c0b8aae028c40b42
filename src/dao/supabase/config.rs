use super::error::{SupabaseDaoError, SupabaseResult};

/// Table holding one profile row per user, keyed by the user's id.
const DEFAULT_PROFILE_TABLE: &str = "user_profiles";

/// Runtime configuration describing how to reach the hosted Supabase project.
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    pub base_url: String,
    /// Public (anon) API key sent as `apikey` on every request.
    pub anon_key: String,
    pub profile_table: String,
}

impl SupabaseConfig {
    /// Construct a configuration from explicit project URL and anon key.
    pub fn new(base_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            anon_key: anon_key.into(),
            profile_table: DEFAULT_PROFILE_TABLE.to_string(),
        }
    }

    /// Query a different profile table.
    pub fn with_profile_table(mut self, table: impl Into<String>) -> Self {
        self.profile_table = table.into();
        self
    }

    /// Build a configuration by reading the expected environment variables.
    pub fn from_env() -> SupabaseResult<Self> {
        let base_url = std::env::var("SUPABASE_URL").map_err(|_| SupabaseDaoError::MissingEnvVar {
            var: "SUPABASE_URL",
        })?;
        let anon_key =
            std::env::var("SUPABASE_ANON_KEY").map_err(|_| SupabaseDaoError::MissingEnvVar {
                var: "SUPABASE_ANON_KEY",
            })?;

        let mut config = Self::new(base_url, anon_key);
        if let Some(table) = std::env::var("SUPABASE_PROFILE_TABLE")
            .ok()
            .filter(|table| !table.trim().is_empty())
        {
            config = config.with_profile_table(table);
        }

        Ok(config)
    }
}
