#[cfg(test)]
#[path = "main_test.rs"]
mod main_test;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use resolve_client::app::AppContext;
use resolve_client::config::ClientConfig;
use resolve_client::net::api::UserAdminApi;
use resolve_client::net::error::ApiError;
use resolve_client::net::types::{
    EventCreate, EventQuery, EventUpdate, Participant, ResolutionCreate, Role, UserUpdate,
};
use resolve_client::router::RouteError;
use serde::Serialize;
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Route(#[from] RouteError),
    #[error("not logged in; run `resolve login` first")]
    NotLoggedIn,
    #[error("no cached resolution with id {0}")]
    UnknownResolution(String),
    #[error("invalid role `{0}`; expected user, organizer, or admin")]
    InvalidRole(String),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "resolve", about = "Resolution and event tracking client")]
struct Cli {
    /// Service base URL (overrides RESOLVE_API_URL).
    #[arg(long)]
    api_url: Option<String>,

    /// Credential file (overrides RESOLVE_TOKEN_FILE).
    #[arg(long)]
    token_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        username: String,
        #[arg(long, env = "RESOLVE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Logout,
    Register {
        username: String,
        email: String,
        #[arg(long, env = "RESOLVE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Whoami,
    /// Run the navigation guard for a path and print where it lands.
    Navigate {
        path: String,
    },
    Events(EventsCommand),
    Participants(ParticipantsCommand),
    Resolutions(ResolutionsCommand),
    Users(UsersCommand),
}

#[derive(Args, Debug)]
struct EventsCommand {
    #[command(subcommand)]
    command: EventsSubcommand,
}

#[derive(Subcommand, Debug)]
enum EventsSubcommand {
    List {
        #[arg(long)]
        organizer: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        skip: Option<u32>,
        #[arg(long)]
        limit: Option<u32>,
    },
    Show {
        event_id: String,
    },
    Create {
        #[arg(long)]
        description: String,
        #[arg(long = "organizer", required = true)]
        organizers: Vec<String>,
        #[arg(long = "location", required = true)]
        locations: Vec<String>,
        #[arg(long = "date", required = true)]
        dates: Vec<String>,
        #[arg(long = "image")]
        images: Vec<String>,
        #[arg(long = "note")]
        notes: Vec<String>,
    },
    Update {
        event_id: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long = "organizer")]
        organizers: Vec<String>,
        #[arg(long = "location")]
        locations: Vec<String>,
        #[arg(long = "date")]
        dates: Vec<String>,
        #[arg(long = "image")]
        images: Vec<String>,
        #[arg(long = "note")]
        notes: Vec<String>,
    },
    Delete {
        event_id: String,
    },
}

#[derive(Args, Debug)]
struct ParticipantsCommand {
    #[command(subcommand)]
    command: ParticipantsSubcommand,
}

#[derive(Subcommand, Debug)]
enum ParticipantsSubcommand {
    Add {
        event_id: String,
        user_id: String,
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long, default_value_t = 0.0)]
        due: f64,
    },
    Remove {
        event_id: String,
        user_id: String,
    },
    Pay {
        event_id: String,
        user_id: String,
        #[arg(allow_negative_numbers = true)]
        amount: f64,
    },
}

#[derive(Args, Debug)]
struct ResolutionsCommand {
    #[command(subcommand)]
    command: ResolutionsSubcommand,
}

#[derive(Subcommand, Debug)]
enum ResolutionsSubcommand {
    List {
        /// Every user's resolutions (admin only).
        #[arg(long, default_value_t = false)]
        all: bool,
    },
    Create {
        title: String,
        #[arg(long)]
        description: Option<String>,
    },
    Toggle {
        resolution_id: String,
    },
    Delete {
        resolution_id: String,
    },
}

#[derive(Args, Debug)]
struct UsersCommand {
    #[command(subcommand)]
    command: UsersSubcommand,
}

#[derive(Subcommand, Debug)]
enum UsersSubcommand {
    List,
    Update {
        user_id: String,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        role: Option<String>,
    },
    Delete {
        user_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = resolve_config(ClientConfig::from_env(), cli.api_url, cli.token_file);
    tracing::debug!(api_url = %config.api_base_url, token_file = %config.token_path.display(), "client configured");
    let app = AppContext::with_file_tokens(&config)?;
    app.initialize().await;

    let result = run(&app, cli.command).await;
    if let Err(e) = &result {
        tracing::error!(error = %e, "command failed");
    }
    result
}

async fn run(app: &AppContext, command: Command) -> Result<(), CliError> {
    match command {
        Command::Login { username, password } => {
            let user = app.session.login(&username, &password).await?;
            print_json(&user)
        }
        Command::Logout => {
            app.session.logout();
            print_json(&json!({ "logged_out": true }))
        }
        Command::Register { username, email, password } => {
            let user = app.session.register(&username, &email, &password).await?;
            print_json(&user)
        }
        Command::Whoami => {
            let user = app.session.user().ok_or(CliError::NotLoggedIn)?;
            let caps = app.session.capabilities();
            print_json(&json!({
                "user": user,
                "is_admin": caps.admin,
                "is_organizer": caps.organizer,
                "can_create_events": caps.can_create_events(),
            }))
        }
        Command::Navigate { path } => {
            let route = app.router.push(&path).await?;
            print_json(&json!({ "requested": path, "path": route.path(), "name": route.name() }))
        }
        Command::Events(events) => run_events(app, events.command).await,
        Command::Participants(participants) => run_participants(app, participants.command).await,
        Command::Resolutions(resolutions) => run_resolutions(app, resolutions.command).await,
        Command::Users(users) => run_users(app, users.command).await,
    }
}

fn resolve_config(mut config: ClientConfig, api_url: Option<String>, token_file: Option<PathBuf>) -> ClientConfig {
    if let Some(url) = api_url {
        config.api_base_url = url.trim_end_matches('/').to_owned();
    }
    if let Some(path) = token_file {
        config.token_path = path;
    }
    config
}

async fn run_events(app: &AppContext, command: EventsSubcommand) -> Result<(), CliError> {
    match command {
        EventsSubcommand::List { organizer, location, skip, limit } => {
            let events = app.events.fetch(&EventQuery { organizer, location, skip, limit }).await?;
            print_json(&events)
        }
        EventsSubcommand::Show { event_id } => print_json(&app.events.fetch_one(&event_id).await?),
        EventsSubcommand::Create { description, organizers, locations, dates, images, notes } => {
            let body =
                EventCreate { organizers, locations, description, dates, images, notes, participants: Vec::new() };
            print_json(&app.events.create(&body).await?)
        }
        EventsSubcommand::Update { event_id, description, organizers, locations, dates, images, notes } => {
            let patch = event_update(description, EventLists { organizers, locations, dates, images, notes });
            print_json(&app.events.update(&event_id, &patch).await?)
        }
        EventsSubcommand::Delete { event_id } => {
            app.events.delete(&event_id).await?;
            print_json(&json!({ "deleted": event_id }))
        }
    }
}

/// Repeatable list flags of `events update`.
#[derive(Debug, Default)]
struct EventLists {
    organizers: Vec<String>,
    locations: Vec<String>,
    dates: Vec<String>,
    images: Vec<String>,
    notes: Vec<String>,
}

/// Repeated flags left empty mean "unchanged", not "clear the list".
fn event_update(description: Option<String>, lists: EventLists) -> EventUpdate {
    let non_empty = |values: Vec<String>| if values.is_empty() { None } else { Some(values) };
    EventUpdate {
        description,
        organizers: non_empty(lists.organizers),
        locations: non_empty(lists.locations),
        dates: non_empty(lists.dates),
        images: non_empty(lists.images),
        notes: non_empty(lists.notes),
        participants: None,
    }
}

async fn run_participants(app: &AppContext, command: ParticipantsSubcommand) -> Result<(), CliError> {
    let event = match command {
        ParticipantsSubcommand::Add { event_id, user_id, tags, due } => {
            let participant = Participant { tags, due_payment: due, ..Participant::new(user_id) };
            app.events.add_participant(&event_id, &participant).await?
        }
        ParticipantsSubcommand::Remove { event_id, user_id } => {
            app.events.remove_participant(&event_id, &user_id).await?
        }
        ParticipantsSubcommand::Pay { event_id, user_id, amount } => {
            app.events.update_participant_payment(&event_id, &user_id, amount).await?
        }
    };
    print_json(&event)
}

async fn run_resolutions(app: &AppContext, command: ResolutionsSubcommand) -> Result<(), CliError> {
    match command {
        ResolutionsSubcommand::List { all } => {
            let items = if all { app.resolutions.fetch_all().await? } else { app.resolutions.fetch(&()).await? };
            print_json(&items)
        }
        ResolutionsSubcommand::Create { title, description } => {
            print_json(&app.resolutions.create(&ResolutionCreate { title, description }).await?)
        }
        ResolutionsSubcommand::Toggle { resolution_id } => {
            // Toggling reads the cached flag, so load the caller's collection first.
            app.resolutions.fetch(&()).await?;
            let toggled = app
                .resolutions
                .toggle_complete(&resolution_id)
                .await?
                .ok_or(CliError::UnknownResolution(resolution_id))?;
            print_json(&toggled)
        }
        ResolutionsSubcommand::Delete { resolution_id } => {
            app.resolutions.delete(&resolution_id).await?;
            print_json(&json!({ "deleted": resolution_id }))
        }
    }
}

async fn run_users(app: &AppContext, command: UsersSubcommand) -> Result<(), CliError> {
    match command {
        UsersSubcommand::List => print_json(&app.api.list_users().await?),
        UsersSubcommand::Update { user_id, username, email, role } => {
            let role = role.as_deref().map(parse_role).transpose()?;
            let patch = UserUpdate { email, username, role };
            print_json(&app.api.update_user(&user_id, &patch).await?)
        }
        UsersSubcommand::Delete { user_id } => {
            app.api.delete_user(&user_id).await?;
            print_json(&json!({ "deleted": user_id }))
        }
    }
}

fn parse_role(raw: &str) -> Result<Role, CliError> {
    match serde_json::from_value(serde_json::Value::String(raw.trim().to_lowercase())) {
        Ok(Role::Unauthenticated) | Err(_) => Err(CliError::InvalidRole(raw.to_owned())),
        Ok(role) => Ok(role),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
