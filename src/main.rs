use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use folio::config::Config;
use folio::contact::{ContactForm, RelayClient, SubmitStatus};
use folio::filter::Facet;
use folio::model::{Entity, Post, Project, Tip};
use folio::page::{load_post, Page};
use folio::render::{render_facet, render_page, render_post_detail, Card, RenderOptions};
use folio::store::{DocumentSource, FirestoreStore, MemoryStore};

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

const DEFAULT_WIDTH: usize = 80;

/// Get the config directory path (~/.config/folio/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("folio"))
}

/// Output width from $COLUMNS, falling back to 80.
fn output_width() -> usize {
    std::env::var("COLUMNS")
        .ok()
        .and_then(|c| c.trim().parse::<usize>().ok())
        .filter(|w| *w >= 20)
        .unwrap_or(DEFAULT_WIDTH)
}

#[derive(Parser, Debug)]
#[command(name = "folio", about = "Live, filterable reader for a portfolio's posts, projects and tips")]
struct Args {
    /// Config file (default: ~/.config/folio/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Serve collections from a local JSON fixture instead of the live store
    #[arg(long, global = true, value_name = "FILE")]
    fixture: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// Flags shared by every list page.
#[derive(clap::Args, Debug)]
struct ListArgs {
    /// Case-insensitive text to look for in titles and descriptions
    #[arg(long, value_name = "Q")]
    search: Option<String>,

    /// Keep the page open and reprint it whenever the collection changes
    #[arg(long)]
    watch: bool,

    /// Also list the values each filter can take
    #[arg(long)]
    facets: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Blog posts, newest first
    Posts {
        #[command(flatten)]
        list: ListArgs,
        #[arg(long)]
        category: Option<String>,
    },
    /// Projects
    Projects {
        #[command(flatten)]
        list: ListArgs,
        #[arg(long)]
        tag: Option<String>,
        /// En Desarrollo, Completado or En Pausa
        #[arg(long)]
        status: Option<String>,
    },
    /// Coding tips
    Tips {
        #[command(flatten)]
        list: ListArgs,
        #[arg(long)]
        language: Option<String>,
        #[arg(long)]
        date: Option<String>,
        /// Print each tip's snippet
        #[arg(long)]
        code: bool,
    },
    /// A single post in full
    Post { id: String },
    /// Send a message through the contact form
    Contact {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        message: String,
    },
}

/// Where documents come from for this run.
enum Source {
    Remote(Arc<FirestoreStore>),
    Fixture(Arc<MemoryStore>),
}

/// Everything a list page needs from the command line.
struct PageRequest {
    list: ListArgs,
    selections: Vec<(Facet, Option<String>)>,
    opts: RenderOptions,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => get_config_dir()?.join("config.toml"),
    };
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let client = reqwest::Client::builder()
        .user_agent(concat!("folio/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;

    let fixture = args.fixture.as_ref();
    let ok = match args.command {
        Command::Contact {
            name,
            email,
            message,
        } => send_contact(&config, client, ContactForm::new(name, email, message)).await?,
        Command::Post { id } => {
            let source = open_source(&config, client, fixture)?;
            show_post(&source, &id).await
        }
        Command::Posts { list, category } => {
            let source = open_source(&config, client, fixture)?;
            let request = PageRequest {
                list,
                selections: vec![(Facet::Category, category)],
                opts: RenderOptions::default(),
            };
            show_page::<Post>(&source, request).await?
        }
        Command::Projects { list, tag, status } => {
            let source = open_source(&config, client, fixture)?;
            let request = PageRequest {
                list,
                selections: vec![(Facet::Tag, tag), (Facet::Status, status)],
                opts: RenderOptions::default(),
            };
            show_page::<Project>(&source, request).await?
        }
        Command::Tips {
            list,
            language,
            date,
            code,
        } => {
            let source = open_source(&config, client, fixture)?;
            let request = PageRequest {
                list,
                selections: vec![(Facet::Language, language), (Facet::Date, date)],
                opts: RenderOptions { show_code: code },
            };
            show_page::<Tip>(&source, request).await?
        }
    };

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}

fn open_source(
    config: &Config,
    client: reqwest::Client,
    fixture: Option<&PathBuf>,
) -> Result<Source> {
    if let Some(path) = fixture {
        let store = MemoryStore::load_fixture(path)
            .with_context(|| format!("Failed to load fixture {}", path.display()))?;
        tracing::info!(path = %path.display(), "Serving collections from fixture");
        return Ok(Source::Fixture(Arc::new(store)));
    }

    let project_id = config.require_project_id()?;
    let store = FirestoreStore::new(
        client,
        &config.firestore_base_url,
        project_id,
        &config.database,
    )
    .context("Invalid document store settings")?
    .with_api_key(config.api_key())
    .with_poll_interval(config.poll_interval())
    .with_timeout(config.request_timeout());
    tracing::debug!(store = ?store, "Using remote document store");
    Ok(Source::Remote(Arc::new(store)))
}

async fn show_page<T: Entity + Card>(source: &Source, request: PageRequest) -> Result<bool> {
    match source {
        Source::Remote(store) => run_page::<T, _>(Arc::clone(store), request).await,
        Source::Fixture(store) => run_page::<T, _>(Arc::clone(store), request).await,
    }
}

async fn run_page<T, S>(source: Arc<S>, request: PageRequest) -> Result<bool>
where
    T: Entity + Card,
    S: DocumentSource,
{
    let width = output_width();
    let mut page = Page::<T>::mount(source);

    if let Some(query) = &request.list.search {
        page.set_search(query.as_str());
    }
    for (facet, value) in &request.selections {
        if let Some(value) = value {
            page.select(*facet, value.as_str())?;
        }
    }

    page.next_update().await;
    print_page(&page, width, &request);

    if request.list.watch && page.is_mounted() {
        watch_page(&mut page, width, &request).await?;
    }
    page.unmount();

    Ok(!page.state().is_error())
}

fn print_page<T: Entity + Card>(page: &Page<T>, width: usize, request: &PageRequest) {
    println!("{}", render_page(page, width, &request.opts));
    if request.list.facets {
        for facet in T::FACETS {
            if let Ok(options) = page.facet_options(*facet) {
                println!();
                println!("{}", render_facet(*facet, &options, width));
            }
        }
    }
}

/// Reprints the page on every snapshot until Ctrl-C, SIGTERM, or the
/// subscription ends.
async fn watch_page<T: Entity + Card>(
    page: &mut Page<T>,
    width: usize,
    request: &PageRequest,
) -> Result<()> {
    #[cfg(unix)]
    let mut sigterm = signal(SignalKind::terminate())?;

    loop {
        #[cfg(unix)]
        let sigterm_fut = sigterm.recv();
        #[cfg(not(unix))]
        let sigterm_fut = std::future::pending::<Option<()>>();

        tokio::select! {
            biased;

            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received SIGINT, shutting down gracefully");
                break;
            }
            _ = sigterm_fut => {
                tracing::info!("Received SIGTERM, shutting down gracefully");
                break;
            }
            updated = page.next_update() => {
                if !updated {
                    break;
                }
                println!();
                println!("{}", "─".repeat(width.min(40)));
                print_page(page, width, request);
            }
        }
    }
    Ok(())
}

async fn show_post(source: &Source, id: &str) -> bool {
    let detail = match source {
        Source::Remote(store) => load_post(store.as_ref(), id).await,
        Source::Fixture(store) => load_post(store.as_ref(), id).await,
    };
    println!("{}", render_post_detail(&detail, output_width()));
    detail.message().is_none()
}

async fn send_contact(config: &Config, client: reqwest::Client, form: ContactForm) -> Result<bool> {
    // Field errors are shown before anything else is required of the config
    if let Err(errors) = form.validate() {
        for (field, message) in errors.iter() {
            eprintln!("{field}: {message}");
        }
        return Ok(false);
    }

    let relay = RelayClient::new(client, &config.functions_url()?)
        .context("Invalid functions base URL")?
        .with_timeout(config.request_timeout());

    let status = relay.submit(&form).await;
    match status {
        SubmitStatus::Success => println!("{}", status.notice()),
        SubmitStatus::Failed => eprintln!("{}", status.notice()),
    }
    Ok(status == SubmitStatus::Success)
}
