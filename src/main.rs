use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ilmos::config::session::{Session, User};
use ilmos::dashboard::load_dashboard;
use ilmos::reader::{Position, progress};
use ilmos::sync::{
    BackendKeyManager, FileCache, LocalCache, ProgressSync, RemoteStore, SupabaseStore,
    SyncError, SyncSettings,
};
use ilmos::{App, Config, Curriculum, app::view};
use tokio::io::BufReader;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "ilmos")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Read the course from where you left off
    Read,
    /// Show your current position and progress
    Status,
    /// Show progress, exam average and badges
    Dashboard,
    /// Show the table of contents
    Toc,
    /// Sign in so progress follows you between devices
    Login {
        /// Your name
        #[arg(long)]
        name: String,
        /// Your email address
        #[arg(long)]
        email: String,
        /// Existing user id to resume (a new one is generated otherwise)
        #[arg(long)]
        id: Option<String>,
    },
    /// Sign out and continue as a guest
    Logout,
    /// Store or clear the backend API key
    BackendKey {
        /// Key to store in the system keyring
        key: Option<String>,
        /// Remove the stored key
        #[arg(long)]
        clear: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ilmos=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command.unwrap_or(Commands::Read) {
        Commands::Read => {
            let curriculum = load_curriculum(&config)?;
            let ctx = Session::load()?.context(config.course_id.clone());
            let sync = ProgressSync::new(
                ctx,
                connect_remote(&config),
                open_cache()?,
                SyncSettings::from(&config),
            );

            let mut app = App::start(config, curriculum, sync).await;
            let result = app.run(BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await;
            if let Err(e) = &result {
                tracing::error!("Reader stopped: {:#}", e);
            }
            app.shutdown().await;
            result?;
        }
        Commands::Status => {
            let curriculum = load_curriculum(&config)?;
            let ctx = Session::load()?.context(config.course_id.clone());
            let sync = ProgressSync::new(
                ctx,
                connect_remote(&config),
                open_cache()?,
                SyncSettings::from(&config),
            );

            let restored = sync.restore(&curriculum).await;
            println!(
                "{}",
                view::render_status(&curriculum, restored.position, sync.context().display_name())
            );
            println!("Restored from: {:?}", restored.source);
        }
        Commands::Dashboard => {
            let curriculum = load_curriculum(&config)?;
            let ctx = Session::load()?.context(config.course_id.clone());
            let remote = connect_remote(&config);
            let local = open_cache()?;

            let stats = load_dashboard(
                &ctx,
                &curriculum,
                remote.as_deref(),
                &*local,
                config.restore_policy,
            )
            .await;

            println!("Welcome, {}", ctx.display_name());
            println!(
                "{}: {}% ({} sections) [{}]",
                curriculum.book_title,
                stats.progress,
                progress::total_sections(&curriculum),
                stats.course_action()
            );
            println!("Completed courses: {}", stats.completed_courses);
            println!("Average exam score: {}% over {} exams", stats.average_score, stats.exams_taken);
            if stats.badges.is_empty() {
                println!("Badges: none yet");
            } else {
                let labels: Vec<_> = stats.badges.iter().map(|b| b.label()).collect();
                println!("Badges: {}", labels.join(", "));
            }
        }
        Commands::Toc => {
            let curriculum = load_curriculum(&config)?;
            let ctx = Session::load()?.context(config.course_id.clone());
            let sync =
                ProgressSync::new(ctx, None, open_cache()?, SyncSettings::from(&config));
            let position = sync
                .local_snapshot()
                .map(|s| {
                    Position::restore(
                        &curriculum,
                        s.chapter,
                        s.section,
                        config.restore_policy,
                    )
                    .position
                })
                .unwrap_or_default();
            print!("{}", view::render_toc(&curriculum, position));
        }
        Commands::Login { name, email, id } => {
            let user = User::new(id, &name, &email)?;
            let mut session = Session::load()?;
            println!("Signed in as {} <{}> (id {})", user.name, user.email, user.id);
            session.current_user = Some(user);
            session.save()?;
        }
        Commands::Logout => {
            let mut session = Session::load()?;
            match session.current_user.take() {
                Some(user) => {
                    session.save()?;
                    println!("Signed out {}", user.name);
                }
                None => println!("Not signed in"),
            }
        }
        Commands::BackendKey { key, clear } => {
            if clear {
                BackendKeyManager::delete_key()?;
                println!("Backend key removed");
            } else if let Some(key) = key {
                BackendKeyManager::set_key(&key)?;
                println!("Stored backend key {}", BackendKeyManager::mask_key(key.trim()));
            } else {
                match BackendKeyManager::get_key() {
                    Ok(key) => println!("Backend key: {}", BackendKeyManager::mask_key(&key)),
                    Err(SyncError::KeyNotFound) => println!("No backend key stored"),
                    Err(e) => return Err(e.into()),
                }
            }
        }
    }

    Ok(())
}

fn load_curriculum(config: &Config) -> Result<Curriculum> {
    Curriculum::load_or_bundled(config.curriculum_path.as_deref())
        .with_context(|| "Failed to load curriculum")
}

fn open_cache() -> Result<Arc<dyn LocalCache>> {
    Ok(Arc::new(FileCache::open(Config::cache_path()?)))
}

/// Connect to the backend when both URL and key are available
fn connect_remote(config: &Config) -> Option<Arc<dyn RemoteStore>> {
    match SupabaseStore::connect(config.resolved_backend_url()) {
        Ok(store) => Some(Arc::new(store)),
        Err(SyncError::NotConfigured) => {
            tracing::info!("Progress stays local: {}", SyncError::NotConfigured);
            None
        }
        Err(e) => {
            tracing::warn!("Backend unavailable, progress stays local: {}", e);
            None
        }
    }
}
