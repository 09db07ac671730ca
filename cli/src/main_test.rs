use super::*;

#[test]
fn parses_nested_event_filters() {
    let cli = Cli::try_parse_from(["resolve", "events", "list", "--organizer", "org", "--limit", "5"]).unwrap();
    let Command::Events(EventsCommand { command: EventsSubcommand::List { organizer, location, skip, limit } }) =
        cli.command
    else {
        panic!("expected events list");
    };
    assert_eq!(organizer.as_deref(), Some("org"));
    assert_eq!((location, skip, limit), (None, None, Some(5)));
}

#[test]
fn payment_amount_accepts_negative_values() {
    let cli = Cli::try_parse_from(["resolve", "participants", "pay", "e1", "u1", "-5"]).unwrap();
    let Command::Participants(ParticipantsCommand { command: ParticipantsSubcommand::Pay { amount, .. } }) =
        cli.command
    else {
        panic!("expected participants pay");
    };
    assert!((amount + 5.0).abs() < f64::EPSILON);
}

#[test]
fn event_create_requires_dates() {
    let result = Cli::try_parse_from([
        "resolve", "events", "create", "--description", "party", "--organizer", "org", "--location", "hall",
    ]);
    assert!(result.is_err());
}

#[test]
fn event_update_leaves_unset_lists_alone() {
    let lists = EventLists { locations: vec!["hall".to_owned()], ..EventLists::default() };
    let patch = event_update(None, lists);
    assert_eq!(patch.locations, Some(vec!["hall".to_owned()]));
    assert_eq!(patch.organizers, None);
    assert_eq!(patch.dates, None);
    assert_eq!(serde_json::to_value(&patch).unwrap(), json!({ "locations": ["hall"] }));
}

#[test]
fn event_update_accepts_images() {
    let cli = Cli::try_parse_from(["resolve", "events", "update", "e1", "--image", "a.png", "--image", "b.png"]).unwrap();
    let Command::Events(EventsCommand {
        command: EventsSubcommand::Update { description, organizers, locations, dates, images, notes, .. },
    }) = cli.command
    else {
        panic!("expected events update");
    };
    let patch = event_update(description, EventLists { organizers, locations, dates, images, notes });
    assert_eq!(serde_json::to_value(&patch).unwrap(), json!({ "images": ["a.png", "b.png"] }));
}

#[test]
fn parse_role_is_case_insensitive() {
    assert_eq!(parse_role("Admin").unwrap(), Role::Admin);
    assert_eq!(parse_role(" organizer ").unwrap(), Role::Organizer);
    assert!(matches!(parse_role("root"), Err(CliError::InvalidRole(r)) if r == "root"));
    assert!(matches!(parse_role("unauthenticated"), Err(CliError::InvalidRole(_))));
}

#[test]
fn flags_override_environment_config() {
    let config = resolve_config(
        ClientConfig::default(),
        Some("http://api.test/".to_owned()),
        Some(PathBuf::from("/tmp/token")),
    );
    assert_eq!(config.api_base_url, "http://api.test");
    assert_eq!(config.token_path, PathBuf::from("/tmp/token"));

    let untouched = resolve_config(ClientConfig::default(), None, None);
    assert_eq!(untouched, ClientConfig::default());
}
