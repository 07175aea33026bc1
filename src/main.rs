use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::collections::BTreeSet;
use std::path::PathBuf;

use quotefeed::config::Config;
use quotefeed::engagement::EngagementStore;
use quotefeed::model::{FeedFilter, Quote, QuoteId};
use quotefeed::remote::QuoteApi;
use quotefeed::session::{FeedKind, FeedSession, SessionEvent};
use quotefeed::storage::{Database, DatabaseError, LANGUAGE_KEY};

type Session = FeedSession<QuoteApi, QuoteApi, Database>;

/// Get the config directory path (~/.config/quotefeed/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("quotefeed"))
}

#[derive(Parser, Debug)]
#[command(name = "quotefeed", about = "Quote feed with likes and dislikes")]
struct Args {
    /// Config file (default: ~/.config/quotefeed/config.toml)
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Language code for quote text, overrides the saved preference
    #[arg(long, value_name = "CODE", global = true)]
    language: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the main feed
    Feed {
        /// Number of pages to load
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
    /// Print liked quotes
    Liked {
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
    /// Like a quote
    Like { id: QuoteId },
    /// Dislike a quote
    Dislike { id: QuoteId },
    /// Print a quote's share payload as JSON
    Share { id: QuoteId },
    /// Show engagement counts and the active language
    Status,
    /// Save the default language
    SetLanguage { code: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_dir = get_config_dir()?;
    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o700);
        if let Err(e) = std::fs::set_permissions(&config_dir, perms) {
            tracing::warn!(
                path = %config_dir.display(),
                error = %e,
                "Failed to set config directory permissions to 0700"
            );
        }
    }

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    let base_url = config.base_url()?;

    let db_path = config
        .database_path
        .clone()
        .unwrap_or_else(|| config_dir.join("quotefeed.db"));
    let db_path_str = db_path
        .to_str()
        .context("Database path contains invalid UTF-8")?;
    let db = match Database::open(db_path_str).await {
        Ok(db) => db,
        Err(DatabaseError::InstanceLocked) => {
            eprintln!(
                "Error: Another instance of quotefeed appears to be running. Please close it and try again."
            );
            std::process::exit(1);
        }
        Err(e) => {
            return Err(anyhow::anyhow!("Failed to open database: {}", e));
        }
    };

    if let Command::SetLanguage { code } = &args.command {
        let code = code.trim().to_uppercase();
        if code.is_empty() {
            anyhow::bail!("Language code must not be empty");
        }
        db.set_preference(LANGUAGE_KEY, &code).await?;
        println!("Language set to {}", code);
        return Ok(());
    }

    let language = resolve_language(&args, &db, &config).await;

    let client = reqwest::Client::builder()
        .timeout(config.request_timeout())
        .user_agent(concat!("quotefeed/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;
    let api = QuoteApi::new(client, base_url, config.request_timeout());

    let kind = match args.command {
        Command::Liked { .. } => FeedKind::Liked,
        _ => FeedKind::All,
    };
    let mut session: Session = FeedSession::new(
        kind,
        api.clone(),
        api,
        EngagementStore::new(db.clone()),
        language.clone(),
    );

    match args.command {
        Command::Feed { pages } => {
            session.start(FeedFilter::All).await;
            load_pages(&mut session, pages).await;
            print_feed(&session);
        }
        Command::Liked { pages } => {
            session.refresh().await;
            load_pages(&mut session, pages).await;
            print_feed(&session);
        }
        Command::Like { id } => {
            open_single(&mut session, id).await?;
            if session.on_like_tapped(id).await {
                session.settle().await;
                report(&mut session);
            } else {
                println!("Quote {} is already liked", id);
            }
        }
        Command::Dislike { id } => {
            open_single(&mut session, id).await?;
            if session.on_dislike_tapped(id).await {
                session.settle().await;
                report(&mut session);
            } else {
                println!("Quote {} is already disliked", id);
            }
        }
        Command::Share { id } => {
            open_single(&mut session, id).await?;
            let payload = session
                .on_share_tapped(id)
                .with_context(|| format!("Quote {} not found", id))?;
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
        Command::Status => {
            let mut store = EngagementStore::new(db.clone());
            store
                .ensure_loaded()
                .await
                .context("Failed to load engagement sets")?;
            println!("Language:  {}", language);
            println!("Liked:     {}", store.liked_count());
            println!("Disliked:  {}", store.disliked_count());
        }
        Command::SetLanguage { .. } => {}
    }

    Ok(())
}

/// CLI flag first, then the saved preference, then the config file.
async fn resolve_language(args: &Args, db: &Database, config: &Config) -> String {
    if let Some(code) = &args.language {
        return code.trim().to_uppercase();
    }
    match db.get_preference(LANGUAGE_KEY).await {
        Ok(Some(code)) if !code.trim().is_empty() => return code,
        Ok(_) => {}
        Err(e) => tracing::warn!(error = %e, "Failed to read language preference"),
    }
    config.language.clone()
}

/// Wait for the first page, then scroll to the end until `pages` pages have
/// been requested or the feed runs out.
async fn load_pages(session: &mut Session, pages: u32) {
    session.settle().await;
    report(session);
    for _ in 1..pages {
        let feed = session.feed();
        if feed.is_exhausted() || feed.is_empty() {
            break;
        }
        let len = feed.len();
        session.on_scroll_position_changed(len - 1, len);
        if !session.has_outstanding() {
            break;
        }
        session.settle().await;
        report(session);
    }
}

/// Load a feed holding just `id`.
async fn open_single(session: &mut Session, id: QuoteId) -> Result<()> {
    session.start(FeedFilter::Ids(BTreeSet::from([id]))).await;
    session.settle().await;
    report(session);
    if session.feed().quote(id).is_none() {
        anyhow::bail!("Quote {} not found", id);
    }
    Ok(())
}

fn report(session: &mut Session) {
    for event in session.drain_events() {
        match event {
            SessionEvent::FeedChanged(change) => tracing::trace!(?change, "Feed changed"),
            SessionEvent::FetchFailed { page, error } => {
                eprintln!("Failed to load page {}: {}", page, error)
            }
            SessionEvent::Exhausted => tracing::debug!("Feed exhausted"),
            SessionEvent::EngageConfirmed { quote_id, kind } => {
                println!("Quote {}: {} confirmed", quote_id, kind)
            }
            SessionEvent::EngageFailed {
                quote_id,
                kind,
                error,
            } => eprintln!("Quote {}: {} failed, reverted ({})", quote_id, kind, error),
            SessionEvent::PersistenceFailed { error } => {
                eprintln!("Warning: engagement state not saved: {}", error)
            }
            SessionEvent::LikedCountChanged(count) => tracing::debug!(count, "Liked count"),
            SessionEvent::TaskPanicked { task, error } => {
                eprintln!("Internal error in {}: {}", task, error)
            }
        }
    }
}

fn print_feed(session: &Session) {
    let quotes: Vec<&Quote> = session.feed().quotes().collect();
    if quotes.is_empty() {
        println!("No quotes.");
        return;
    }
    for quote in quotes {
        let mark = if quote.is_liked() {
            " [liked]"
        } else if quote.is_disliked() {
            " [disliked]"
        } else {
            ""
        };
        println!(
            "#{} \"{}\" - {}  (+{} / -{}){}",
            quote.id,
            quote.content.message.as_deref().unwrap_or(""),
            quote.content.author.as_deref().unwrap_or("Unknown"),
            quote.like_count,
            quote.dislike_count,
            mark
        );
    }
}
