use std::io::Write;

use super::*;

#[test]
fn defaults_resolve_without_any_source() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.addr.to_string(), "127.0.0.1:3000");
    assert_eq!(settings.logging.level, LevelFilter::INFO);
    assert!(matches!(settings.logging.format, LogFormat::Compact));
    assert_eq!(settings.content_api.base_url.as_str(), "http://localhost:3001/");
    assert_eq!(settings.content_api.timeout, Duration::from_secs(10));
    assert_eq!(settings.cache.content_limit, 256);
    assert_eq!(settings.cache.default_revalidate.as_secs(), 60);
    assert!(settings.revalidation.secret.is_none());
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn zero_port_is_rejected() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(0);

    let err = Settings::from_raw(raw).expect_err("zero port");
    assert!(matches!(err, LoadError::Invalid { key: "server.port", .. }));
}

#[test]
fn zero_default_window_is_rejected() {
    let mut raw = RawSettings::default();
    raw.cache.default_revalidate_seconds = Some(0);

    let err = Settings::from_raw(raw).expect_err("zero window");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "cache.default_revalidate_seconds",
            ..
        }
    ));
}

#[test]
fn content_api_url_must_be_http() {
    let mut raw = RawSettings::default();
    raw.content_api.base_url = Some("ftp://content.example".to_string());
    assert!(Settings::from_raw(raw).is_err());

    let mut raw = RawSettings::default();
    raw.content_api.base_url = Some("not a url".to_string());
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn blank_secret_counts_as_unset() {
    let mut raw = RawSettings::default();
    raw.apply_secret_override(Some("   "));
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.revalidation.secret.is_none());
}

#[test]
fn secret_override_replaces_file_value() {
    let mut raw = RawSettings::default();
    raw.revalidation.secret = Some("from-file".to_string());
    raw.apply_secret_override(Some("from-cli"));

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.revalidation.secret.as_deref(), Some("from-cli"));
}

#[test]
fn secret_is_redacted_in_debug_output() {
    let settings = RevalidationSettings {
        secret: Some(Arc::from("hunter2")),
    };
    let rendered = format!("{settings:?}");
    assert!(!rendered.contains("hunter2"));
    assert!(rendered.contains("<redacted>"));
}

#[test]
fn config_file_is_layered_under_cli() {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp file");
    writeln!(
        file,
        "[server]\nport = 8080\n\n[cache]\ncontent_limit = 32\n\n[revalidation]\nsecret = \"file-secret\""
    )
    .expect("write config");

    let args = CliArgs::parse_from([
        "vitrine",
        "--config-file",
        file.path().to_str().expect("utf-8 path"),
        "serve",
        "--server-port",
        "9090",
    ]);
    let settings = load(&args).expect("settings load");

    assert_eq!(settings.server.addr.port(), 9090);
    assert_eq!(settings.cache.content_limit, 32);
    assert!(settings.revalidation.secret.is_some());
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["vitrine"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_serve_arguments() {
    let args = CliArgs::parse_from([
        "vitrine",
        "serve",
        "--server-host",
        "0.0.0.0",
        "--content-api-url",
        "https://content.example",
        "--revalidate-secret",
        "s3cret",
    ]);

    assert_eq!(args.revalidate_secret.as_deref(), Some("s3cret"));
    match args.command {
        Some(Command::Serve(serve)) => {
            assert_eq!(serve.overrides.server_host.as_deref(), Some("0.0.0.0"));
            assert_eq!(
                serve.overrides.content_api_url.as_deref(),
                Some("https://content.example")
            );
        }
        _ => panic!("wrong command parsed"),
    }
}
