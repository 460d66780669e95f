use super::data::Config;
use tempfile::TempDir;

#[test]
fn missing_file_yields_defaults() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("does_not_exist.toml");

    let config = Config::load_from_path(&config_path).expect("Failed to load config");
    assert!(config.default_model.is_none());
    assert!(config.base_url.is_none());
}

#[test]
fn config_round_trips_through_toml() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("config.toml");

    let mut config = Config::default();
    config.set_default_model("gpt-4o");
    config.base_url = Some("https://openrouter.ai/api/v1".to_string());

    config
        .save_to_path(&config_path)
        .expect("Failed to save config");
    let loaded = Config::load_from_path(&config_path).expect("Failed to load config");

    assert_eq!(loaded.default_model.as_deref(), Some("gpt-4o"));
    assert_eq!(
        loaded.base_url.as_deref(),
        Some("https://openrouter.ai/api/v1")
    );
}

#[test]
fn saving_creates_missing_parent_directories() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("nested").join("dir").join("config.toml");

    Config::default()
        .save_to_path(&config_path)
        .expect("Failed to save config");
    assert!(config_path.exists());
}

#[test]
fn unknown_fields_do_not_break_parsing() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(
        &config_path,
        "default_model = \"gpt-4o-mini\"\nfuture_option = true\n",
    )
    .expect("Failed to write config");

    let loaded = Config::load_from_path(&config_path).expect("Failed to load config");
    assert_eq!(loaded.default_model.as_deref(), Some("gpt-4o-mini"));
}
