use super::*;

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
fn defaults_match_feed_conventions() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.feed.page_size.get(), 10);
    assert!(settings.cache.enabled);
    assert_eq!(settings.cache.feed_ttl, Duration::from_secs(20));
    assert_eq!(settings.auth.user_header, "x-remote-user");
    assert_eq!(settings.auth.login_url, "/auth/login/");
    assert_eq!(settings.media.base_url, "/media/");
    assert_eq!(settings.server.addr.port(), DEFAULT_PORT);
    assert_eq!(settings.server.site_title, "Yatube");
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

    assert_eq!(settings.logging.format, LogFormat::Json);
}

#[test]
fn zero_ttl_is_rejected() {
    let mut raw = RawSettings::default();
    raw.cache.feed_ttl_seconds = Some(0);

    let err = Settings::from_raw(raw).expect_err("zero ttl must fail");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "cache.feed_ttl_seconds",
            ..
        }
    ));
}

#[test]
fn zero_page_size_is_rejected() {
    let mut raw = RawSettings::default();
    raw.feed.page_size = Some(0);

    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn relative_login_url_is_rejected() {
    let mut raw = RawSettings::default();
    raw.auth.login_url = Some("https://example.com/login".to_string());

    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn user_header_is_normalised() {
    let mut raw = RawSettings::default();
    raw.auth.user_header = Some(" X-Forwarded-User ".to_string());

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.auth.user_header, "x-forwarded-user");
}

#[test]
fn media_base_url_gains_trailing_slash() {
    let mut raw = RawSettings::default();
    raw.media.base_url = Some("/uploads".to_string());

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.media.base_url, "/uploads/");
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["yatube"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_serve_overrides() {
    let args = CliArgs::parse_from([
        "yatube",
        "serve",
        "--server-host",
        "0.0.0.0",
        "--database-url",
        "postgres://override",
        "--cache-ttl-seconds",
        "5",
        "--cache-enabled=false",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(serve.overrides.server_host.as_deref(), Some("0.0.0.0"));
            assert_eq!(
                serve.overrides.database_url.as_deref(),
                Some("postgres://override")
            );
            assert_eq!(serve.overrides.cache_ttl_seconds, Some(5));
            assert_eq!(serve.overrides.cache_enabled, Some(false));
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_group_create_arguments() {
    let args = CliArgs::parse_from([
        "yatube",
        "groups",
        "create",
        "--title",
        "Cats",
        "--description",
        "All about cats",
        "--database-url",
        "postgres://example",
    ]);

    match args.command.expect("groups command") {
        Command::Groups(GroupsCommand::Create(create)) => {
            assert_eq!(create.title, "Cats");
            assert_eq!(create.slug, None);
            assert_eq!(create.description, "All about cats");
            assert_eq!(
                create.database.database_url.as_deref(),
                Some("postgres://example")
            );
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_post_delete_arguments() {
    let args = CliArgs::parse_from(["yatube", "posts", "delete", "42"]);

    match args.command.expect("posts command") {
        Command::Posts(PostsCommand::Delete(delete)) => assert_eq!(delete.id, 42),
        _ => panic!("wrong command parsed"),
    }
}
