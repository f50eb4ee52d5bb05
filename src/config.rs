use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SupabaseConfig {
    /// Base URL of the Supabase project, e.g. `https://xyz.supabase.co`.
    pub url: String,
    /// Anon (publishable) key used for standard client access.
    pub anon_key: String,
    /// Service-role key for elevated access (account lifecycle). Falls back
    /// to the anon key when empty.
    pub service_key: String,
    /// Storage bucket holding archive files.
    pub bucket: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub supabase: SupabaseConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        // Fallback: parse the embedded default TOML
        let defaults: &str = include_str!("../config/default.toml");
        match ::config::Config::builder()
            .add_source(::config::File::from_str(defaults, ::config::FileFormat::Toml))
            .build()
        {
            Ok(cfg) => match cfg.try_deserialize() {
                Ok(app_cfg) => app_cfg,
                Err(e) => {
                    eprintln!("FATAL: Failed to deserialize default config: {}", e);
                    panic!("Failed to deserialize default config: {}", e);
                }
            },
            Err(e) => {
                eprintln!("FATAL: Failed to parse default config: {}", e);
                panic!("Failed to parse default config: {}", e);
            }
        }
    }
}

pub fn load() -> anyhow::Result<AppConfig> {
    // Load .env first (optional)
    let _ = dotenvy::dotenv();

    let defaults: &str = include_str!("../config/default.toml");
    let mut builder = ::config::Config::builder()
        .add_source(::config::File::from_str(defaults, ::config::FileFormat::Toml))
        // Optional local file: archivgut.toml (in CWD)
        .add_source(::config::File::with_name("archivgut").required(false));

    if let Ok(custom_path) = std::env::var("ARCHIVGUT_CONFIG") {
        builder = builder.add_source(::config::File::with_name(&custom_path).required(false));
    }
    builder = builder.add_source(::config::Environment::with_prefix("ARCHIVGUT").separator("__"));

    // Conventional Supabase variable names win over everything else, so an
    // unmodified Supabase .env works as-is.
    builder = builder
        .set_override_option("supabase.url", std::env::var("SUPABASE_URL").ok())?
        .set_override_option("supabase.anon_key", std::env::var("SUPABASE_KEY").ok())?
        .set_override_option("supabase.service_key", std::env::var("SUPABASE_SERVICE_KEY").ok())?
        .set_override_option("server.port", std::env::var("PORT").ok())?;

    let cfg = builder.build()?;
    let mut app_cfg: AppConfig = cfg.try_deserialize()?;
    if app_cfg.supabase.service_key.is_empty() {
        app_cfg.supabase.service_key = app_cfg.supabase.anon_key.clone();
    }
    validate(&app_cfg)?;
    Ok(app_cfg)
}

fn validate(cfg: &AppConfig) -> anyhow::Result<()> {
    if cfg.server.port == 0 {
        return Err(anyhow::anyhow!("invalid server.port: {}", cfg.server.port));
    }

    if cfg.supabase.url.is_empty() {
        return Err(anyhow::anyhow!(
            "SUPABASE_URL is required. Please check your environment variables."
        ));
    }
    if url::Url::parse(&cfg.supabase.url).is_err() {
        return Err(anyhow::anyhow!("invalid supabase.url: {}", cfg.supabase.url));
    }
    if cfg.supabase.anon_key.is_empty() {
        return Err(anyhow::anyhow!(
            "SUPABASE_KEY is required. Please check your environment variables."
        ));
    }
    if cfg.supabase.bucket.is_empty() {
        return Err(anyhow::anyhow!("supabase.bucket must not be empty"));
    }

    Ok(())
}
