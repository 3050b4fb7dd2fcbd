use rowpeek::config::{AppConfig, CloudConfig, ColorConfig, ConfigManager, DisplayConfig};
use std::fs;
use tempfile::TempDir;

// Helper to create a temporary config directory for testing
fn setup_test_config_dir() -> (TempDir, ConfigManager) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_manager = ConfigManager::with_dir(temp_dir.path().to_path_buf());
    (temp_dir, config_manager)
}

#[test]
fn test_default_config() {
    let config = AppConfig::default();

    assert_eq!(config.version, "0.1");

    assert_eq!(config.display.row_height, 35.0);
    assert_eq!(config.display.preload_margin, 10);
    assert_eq!(config.display.hysteresis_fraction, 0.5);
    assert!(!config.display.row_numbers);
    assert_eq!(config.display.row_start_index, 0);
    assert_eq!(config.display.max_cell_width, 30);

    assert_eq!(config.performance.event_poll_interval_ms, 25);
    assert_eq!(config.performance.scroll_step, 40.0);

    assert_eq!(config.theme.color_mode, "auto");
    assert_eq!(config.theme.colors.scrollbar, "cyan");
    assert_eq!(config.cloud, CloudConfig::default());
    assert!(!config.debug.enabled);
}

#[test]
fn test_generate_default_config() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    let template = config_manager.generate_default_config();

    for section in ["[display]", "[performance]", "[theme.colors]", "[cloud]", "[debug]"] {
        assert!(template.contains(section), "missing {}", section);
    }
    assert!(template.contains("version = \"0.1\""));
}

#[test]
fn test_write_default_config() {
    let (_temp_dir, config_manager) = setup_test_config_dir();

    let config_path = config_manager
        .write_default_config(false)
        .expect("Failed to write config");
    assert!(config_path.exists());

    let content = fs::read_to_string(&config_path).expect("Failed to read config");
    assert!(content.contains("preload_margin = 10"));
}

#[test]
fn test_write_config_without_force_fails_if_exists() {
    let (_temp_dir, config_manager) = setup_test_config_dir();

    config_manager
        .write_default_config(false)
        .expect("First write should succeed");

    let result = config_manager.write_default_config(false);
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("already exists"));

    assert!(config_manager.write_default_config(true).is_ok());
}

#[test]
fn test_load_from_missing_file_gives_defaults() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    let config = AppConfig::load_from(&config_manager).expect("Should load default config");
    assert_eq!(config.version, "0.1");
    assert_eq!(config.display.preload_margin, 10);
}

#[test]
fn test_load_minimal_config_layers_over_defaults() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    config_manager
        .ensure_config_dir()
        .expect("Failed to create config dir");

    let minimal_config = r#"
version = "0.1"

[display]
preload_margin = 50
row_numbers = true

[cloud]
s3_region = "eu-central-1"
"#;
    fs::write(config_manager.config_path("config.toml"), minimal_config)
        .expect("Failed to write minimal config");

    let config = AppConfig::load_from(&config_manager).expect("Failed to load config");
    assert_eq!(config.display.preload_margin, 50);
    assert!(config.display.row_numbers);
    assert_eq!(config.cloud.s3_region.as_deref(), Some("eu-central-1"));
    // unspecified values keep their defaults
    assert_eq!(config.display.row_height, 35.0);
    assert_eq!(config.performance.scroll_step, 40.0);
}

#[test]
fn test_load_rejects_invalid_file() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    config_manager.ensure_config_dir().unwrap();
    let path = config_manager.config_path("config.toml");

    fs::write(&path, "[display]\nrow_height = \"tall\"\n").unwrap();
    let err = AppConfig::load_from(&config_manager).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config file"));

    fs::write(&path, "[display]\nrow_height = -1.0\n").unwrap();
    let err = AppConfig::load_from(&config_manager).unwrap_err();
    assert!(err.to_string().contains("row_height"));
}

#[test]
fn test_merge_configs() {
    let mut base = AppConfig::default();
    let mut override_config = AppConfig::default();
    override_config.display.preload_margin = 40;
    override_config.display.hysteresis_fraction = 0.25;
    override_config.performance.scroll_step = 70.0;
    override_config.theme.colors.scrollbar = "blue".to_string();
    override_config.debug.enabled = true;

    base.merge(override_config);

    assert_eq!(base.display.preload_margin, 40);
    assert_eq!(base.display.hysteresis_fraction, 0.25);
    assert_eq!(base.performance.scroll_step, 70.0);
    assert_eq!(base.theme.colors.scrollbar, "blue");
    assert!(base.debug.enabled);
    assert_eq!(base.display.row_height, 35.0);
}

#[test]
fn test_merge_does_not_override_with_defaults() {
    let mut base = DisplayConfig {
        row_height: 20.0,
        preload_margin: 5,
        hysteresis_fraction: 1.0,
        row_numbers: true,
        row_start_index: 1,
        max_cell_width: 50,
    };

    base.merge(DisplayConfig::default());

    assert_eq!(base.row_height, 20.0);
    assert_eq!(base.preload_margin, 5);
    assert_eq!(base.hysteresis_fraction, 1.0);
    assert!(base.row_numbers);
    assert_eq!(base.row_start_index, 1);
    assert_eq!(base.max_cell_width, 50);
}

#[test]
fn test_cloud_merge_keeps_unset_fields() {
    let mut base = CloudConfig {
        s3_endpoint_url: Some("http://localhost:9000".into()),
        ..Default::default()
    };
    base.merge(CloudConfig {
        s3_region: Some("us-west-2".into()),
        ..Default::default()
    });
    assert_eq!(base.s3_endpoint_url.as_deref(), Some("http://localhost:9000"));
    assert_eq!(base.s3_region.as_deref(), Some("us-west-2"));
}

#[test]
fn test_color_config_merge() {
    let mut base = ColorConfig::default();
    base.merge(ColorConfig {
        keybind_hints: "blue".to_string(),
        error: "bright_red".to_string(),
        ..Default::default()
    });

    assert_eq!(base.keybind_hints, "blue");
    assert_eq!(base.error, "bright_red");
    assert_eq!(base.keybind_labels, "white");
}

#[test]
fn test_validate() {
    assert!(AppConfig::default().validate().is_ok());

    let config = AppConfig {
        version: "1.0".to_string(),
        ..Default::default()
    };
    assert!(config
        .validate()
        .unwrap_err()
        .to_string()
        .contains("Unsupported config version"));

    let mut config = AppConfig::default();
    config.performance.event_poll_interval_ms = 0;
    assert!(config.validate().is_err());

    let mut config = AppConfig::default();
    config.display.hysteresis_fraction = f64::NAN;
    assert!(config.validate().is_err());

    let mut config = AppConfig::default();
    config.performance.scroll_step = 0.0;
    assert!(config.validate().is_err());

    let mut config = AppConfig::default();
    config.theme.color_mode = "neon".to_string();
    assert!(config.validate().is_err());
}
