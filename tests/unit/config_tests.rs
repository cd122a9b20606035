// Configuration module unit tests

use shutterline::config::*;

#[test]
fn test_can_deserialize_minimal_valid_yaml_config() {
    let yaml = r#"
service:
  source_bucket: "originals"
"#;
    let config: Config = serde_yaml::from_str(yaml).expect("Failed to deserialize YAML");
    assert_eq!(config.service.source_bucket, "originals");
    assert_eq!(config.service.region, None);
    assert_eq!(config.service.endpoint, None);
    assert_eq!(config.service.default_quality, 75);
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.logging.format, LogFormat::Json);
}

#[test]
fn test_rejects_config_without_source_bucket() {
    let yaml = r#"
service:
  region: "us-east-1"
"#;
    assert!(Config::from_yaml_with_env(yaml).is_err());
}

#[test]
fn test_rejects_unknown_log_format() {
    let yaml = r#"
service:
  source_bucket: "originals"
logging:
  format: "xml"
"#;
    assert!(Config::from_yaml_with_env(yaml).is_err());
}

#[test]
fn test_substitutes_every_referenced_variable() {
    std::env::set_var("SHUTTERLINE_UNIT_BUCKET", "media");
    std::env::set_var("SHUTTERLINE_UNIT_ENDPOINT", "http://localhost:4566");
    let yaml = r#"
service:
  source_bucket: "${SHUTTERLINE_UNIT_BUCKET}"
  endpoint: "${SHUTTERLINE_UNIT_ENDPOINT}"
"#;
    let config = Config::from_yaml_with_env(yaml).unwrap();
    assert_eq!(config.service.source_bucket, "media");
    assert_eq!(
        config.service.endpoint.as_deref(),
        Some("http://localhost:4566")
    );
}

#[test]
fn test_from_env_reads_service_settings() {
    std::env::set_var("SOURCE_BUCKET", "env-bucket");
    std::env::set_var("DEFAULT_QUALITY", "82");
    std::env::set_var("MAX_IMAGE_WIDTH", "2048");
    std::env::set_var("LOG_FORMAT", "pretty");

    let config = Config::from_env().unwrap();
    assert_eq!(config.service.source_bucket, "env-bucket");
    assert_eq!(config.service.default_quality, 82);
    assert_eq!(config.service.max_image_width, Some(2048));
    assert_eq!(config.logging.format, LogFormat::Pretty);
    assert!(config.validate().is_ok());

    std::env::set_var("DEFAULT_QUALITY", "very high");
    let err = Config::from_env().unwrap_err();
    assert!(err.contains("DEFAULT_QUALITY"));

    for name in ["SOURCE_BUCKET", "DEFAULT_QUALITY", "MAX_IMAGE_WIDTH", "LOG_FORMAT"] {
        std::env::remove_var(name);
    }
}

#[test]
fn test_quality_above_range_fails_validation() {
    let mut config = Config {
        service: ServiceConfig::new("originals"),
        logging: LoggingConfig::default(),
    };
    config.service.default_quality = 101;
    let err = config.validate().unwrap_err();
    assert!(err.contains("default_quality"));
}
