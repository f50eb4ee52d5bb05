use crate::config::AppConfig;

#[test]
fn embedded_defaults_parse() {
    let cfg = AppConfig::default();
    assert_eq!(cfg.server.host, "0.0.0.0");
    assert_eq!(cfg.server.port, 8000);
    assert_eq!(cfg.supabase.bucket, "archive-files");
    // Credentials are never embedded; they must come from the environment
    assert!(cfg.supabase.url.is_empty());
    assert!(cfg.supabase.anon_key.is_empty());
    assert!(cfg.supabase.service_key.is_empty());
}
