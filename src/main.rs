use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use prep101_client::admin::{pagination, AdminDashboard, AdminTab, PageQuery, DEFAULT_PAGE_SIZE};
use prep101_client::api::ApiClient;
use prep101_client::config::{self, Config};
use prep101_client::delivery::FileDocumentOpener;
use prep101_client::guide::GuideRequestCoordinator;
use prep101_client::model::{CandidateFile, FileType, GuideForm};
use prep101_client::notify::TracingNotifier;
use prep101_client::session::{Session, SessionStore};
use prep101_client::upload::UploadCoordinator;
use prep101_client::usage::{UsageGate, UsageView};
use prep101_client::{auth, promo};

#[derive(Debug, Parser)]
#[command(author, version, about = "Upload audition sides and get a coaching guide")]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Write an example config file
    Init,
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Logout,
    /// Show this month's guide usage
    Usage,
    /// Upload scripts and print the extraction summary
    Upload {
        #[arg(long = "file", required = true)]
        files: Vec<PathBuf>,
        #[arg(long, default_value = "sides")]
        file_type: FileType,
    },
    /// Upload scripts and generate a guide
    Generate {
        #[arg(long = "file", required = true)]
        files: Vec<PathBuf>,
        #[arg(long, default_value = "sides")]
        file_type: FileType,
        #[arg(long)]
        character: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        production_type: String,
        #[arg(long)]
        role_size: String,
        #[arg(long)]
        genre: String,
        #[arg(long)]
        storyline: Option<String>,
        #[arg(long)]
        breakdown: Option<String>,
        #[arg(long)]
        callback_notes: Option<String>,
        #[arg(long)]
        focus_area: Option<String>,
        /// Also request the simplified child guide
        #[arg(long)]
        child_guide: bool,
    },
    /// Redeem a promo code
    Redeem { code: String },
    /// Admin dashboard data
    Admin {
        /// One tab; all tabs when omitted
        #[arg(long)]
        tab: Option<AdminTab>,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        limit: u32,
        #[arg(long)]
        search: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    if let Command::Init = args.command {
        std::fs::write(&args.config, config::example())
            .with_context(|| format!("failed to write {}", args.config.display()))?;
        info!(path = %args.config.display(), "wrote example config");
        return Ok(());
    }

    let cfg = config::load(Some(&args.config))?;
    cfg.ensure_dirs()?;
    let api = ApiClient::from_config(&cfg)?;
    let store = SessionStore::in_dir(&cfg.app.data_dir);
    let notifier = TracingNotifier;

    match args.command {
        // Written before the config was loaded.
        Command::Init => {}
        Command::Login { email, password } => {
            auth::login(&api, &store, &email, &password).await?;
        }
        Command::Register {
            name,
            email,
            password,
        } => {
            auth::register(&api, &store, &name, &email, &password).await?;
        }
        Command::Logout => auth::logout(&store)?,
        Command::Usage => {
            let session = require_session(&store)?;
            let mut usage = UsageGate::new();
            let view = usage.sync_identity(&api, Some(&session)).await;
            print_usage(&view);
        }
        Command::Upload { files, file_type } => {
            let session = require_session(&store)?;
            let candidates = read_files(&files).await?;
            let mut uploader = UploadCoordinator::new(&api, &notifier, cfg.upload.max_file_bytes);
            uploader
                .run(&session, &candidates, file_type, |batch| {
                    println!(
                        "{} file(s), {} words, characters: {}",
                        batch.file_count,
                        batch.total_word_count,
                        batch
                            .character_names
                            .iter()
                            .cloned()
                            .collect::<Vec<_>>()
                            .join(", ")
                    );
                    for id in &batch.upload_ids {
                        println!("upload id: {id}");
                    }
                })
                .await?;
        }
        Command::Generate {
            files,
            file_type,
            character,
            title,
            production_type,
            role_size,
            genre,
            storyline,
            breakdown,
            callback_notes,
            focus_area,
            child_guide,
        } => {
            let session = require_session(&store)?;
            let mut usage = UsageGate::new();
            usage.sync_identity(&api, Some(&session)).await;

            let candidates = read_files(&files).await?;
            let mut uploader = UploadCoordinator::new(&api, &notifier, cfg.upload.max_file_bytes);
            let form = GuideForm {
                character_name: character,
                production_title: title,
                production_type,
                role_size,
                genre,
                storyline,
                character_breakdown: breakdown,
                callback_notes,
                focus_area,
                child_guide_requested: child_guide,
            };
            let opener = FileDocumentOpener::new(&cfg.app.output_dir, cfg.app.launch_viewer);
            let coordinator = guide_coordinator(&api, &opener, &notifier, &cfg);
            let (_, delivery) = coordinator
                .upload_and_submit(
                    &mut uploader,
                    &session,
                    &candidates,
                    file_type,
                    &form,
                    &mut usage,
                )
                .await?;
            info!(
                primary_opened = delivery.primary_opened,
                child_opened = ?delivery.child_opened,
                output_dir = %cfg.app.output_dir,
                "guide delivered"
            );
            print_usage(&usage.view());
        }
        Command::Redeem { code } => {
            let session = require_session(&store)?;
            let mut usage = UsageGate::new();
            promo::redeem(&api, &notifier, &session, &code, &mut usage).await?;
            print_usage(&usage.view());
        }
        Command::Admin {
            tab,
            page,
            limit,
            search,
        } => {
            let session = require_session(&store)?;
            let query = PageQuery::new(page, limit, search);
            let mut dashboard = AdminDashboard::new(&api);
            let results = match tab {
                Some(tab) => vec![(tab, dashboard.fetch(&session, tab, &query).await)],
                None => dashboard.fetch_all(&session, &query).await,
            };
            if dashboard.is_forbidden() {
                return Err(anyhow!("Admin Access Required"));
            }
            for (tab, result) in results {
                match result {
                    Ok(payload) => {
                        if let Some((page, pages)) = pagination(&payload) {
                            println!("== {tab} (page {page}/{pages})");
                        } else {
                            println!("== {tab}");
                        }
                        println!("{}", serde_json::to_string_pretty(&payload)?);
                    }
                    Err(err) => println!("== {tab}: {}", err.user_message()),
                }
            }
        }
    }

    Ok(())
}

fn guide_coordinator<'a>(
    api: &'a ApiClient,
    opener: &'a FileDocumentOpener,
    notifier: &'a TracingNotifier,
    cfg: &Config,
) -> GuideRequestCoordinator<'a> {
    GuideRequestCoordinator::new(api, opener, notifier)
        .with_timeout(cfg.generate_timeout())
        .with_child_delay(cfg.child_guide_delay())
}

fn require_session(store: &SessionStore) -> Result<Session> {
    store
        .load()?
        .ok_or_else(|| anyhow!("not logged in; run `prep101 login` first"))
}

async fn read_files(paths: &[PathBuf]) -> Result<Vec<CandidateFile>> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let file = CandidateFile::from_path(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        files.push(file);
    }
    Ok(files)
}

fn print_usage(view: &UsageView) {
    let limit = view
        .limit
        .map(|l| l.to_string())
        .unwrap_or_else(|| "unlimited".to_string());
    let mut line = format!(
        "{} plan: {} / {} guides used",
        view.plan.display_name(),
        view.used,
        limit
    );
    if let Some(renews) = view.renews_at {
        line.push_str(&format!(", renews {}", renews.format("%Y-%m-%d")));
    }
    if view.degraded {
        line.push_str(" (offline estimate)");
    }
    println!("{line}");
}
