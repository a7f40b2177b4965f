use clap::{Args, Parser, Subcommand, ValueEnum};
use letzview::auth::{AdminCredentialsProvider, AuthProvider, Credentials};
use letzview::backend::{
    CatalogBackend, DocumentCatalogBackend, FileDocumentStore, KvCatalogBackend, StorageLayout,
};
use letzview::catalog::CatalogClient;
use letzview::config::ServerConfig;
use letzview::localized::{DEFAULT_LANGUAGE, LocalizedText, SUPPORTED_LANGUAGES};
use letzview::storage::{JsonFileStore, default_data_dir};
use letzview::translate::TranslateClient;
use letzview::{EpisodeDraft, LetzViewError, NewSeries, Series, server};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// LetzView catalog service and admin tool
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the catalog and translation endpoints
    Serve(ServerConfig),

    /// Print the catalog
    List {
        #[command(flatten)]
        source: SourceArgs,

        /// Language to show titles in
        #[arg(long, default_value = DEFAULT_LANGUAGE)]
        lang: String,
    },

    /// Change the catalog
    Admin {
        #[command(flatten)]
        source: SourceArgs,

        /// Translation service used to pre-fill the other languages
        #[arg(long, value_name = "URL")]
        translate_via: Option<String>,

        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Debug, Args)]
struct SourceArgs {
    /// Catalog directory [default: <data dir>/catalog]
    #[arg(long, conflicts_with = "remote")]
    store: Option<PathBuf>,

    /// Base URL of a running LetzView service
    #[arg(long, value_name = "URL")]
    remote: Option<String>,

    /// Document layout of the catalog directory
    #[arg(long, value_enum, default_value_t = Layout::Embedded)]
    layout: Layout,

    /// Admin password for writes to a remote service; unused for local stores
    #[arg(long, env = "ADMIN_PASSWORD", default_value = "admin", hide_env_values = true)]
    password: String,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Layout {
    /// One document per series
    Embedded,
    /// Separate season and episode documents
    SubDocuments,
}

impl From<Layout> for StorageLayout {
    fn from(layout: Layout) -> Self {
        match layout {
            Layout::Embedded => StorageLayout::Embedded,
            Layout::SubDocuments => StorageLayout::SubDocuments,
        }
    }
}

#[derive(Debug, Subcommand)]
enum AdminAction {
    /// Create a series and print its id
    CreateSeries {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        poster: String,
        #[arg(long, default_value = "")]
        backdrop: String,
    },

    /// Add a season to a series
    AddSeason {
        #[arg(long)]
        series: String,
        /// Season number [default: one past the highest]
        #[arg(long)]
        number: Option<u32>,
    },

    /// Add an episode to a season
    AddEpisode {
        #[arg(long)]
        series: String,
        #[arg(long)]
        season: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        video: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Episode number [default: one past the highest]
        #[arg(long)]
        number: Option<u32>,
    },

    /// Delete a series with all of its seasons and episodes
    DeleteSeries {
        #[arg(long)]
        series: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "letzview=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), LetzViewError> {
    match cli.command {
        Command::Serve(config) => server::run_server(config).await?,
        Command::List { source, lang } => match source.remote.as_deref() {
            Some(url) => list(kv_client(url, &source.password), &lang).await?,
            None => list(file_client(&source)?, &lang).await?,
        },
        Command::Admin {
            source,
            translate_via,
            action,
        } => {
            let translator = translate_via
                .as_deref()
                .map(|url| TranslateClient::new(reqwest::Client::new(), url));
            match source.remote.as_deref() {
                Some(url) => admin(kv_client(url, &source.password), translator, action).await?,
                None => admin(file_client(&source)?, translator, action).await?,
            }
        }
    }
    Ok(())
}

fn kv_client(url: &str, password: &str) -> CatalogClient<KvCatalogBackend> {
    CatalogClient::new(KvCatalogBackend::new(reqwest::Client::new(), url, password))
}

fn file_client(
    source: &SourceArgs,
) -> Result<CatalogClient<DocumentCatalogBackend<FileDocumentStore>>, LetzViewError> {
    let directory = match &source.store {
        Some(dir) => dir.clone(),
        None => default_data_dir()?.join("catalog"),
    };
    let store = FileDocumentStore::new(JsonFileStore::open(directory)?);
    Ok(CatalogClient::new(DocumentCatalogBackend::new(
        store,
        source.layout.into(),
    )))
}

async fn list<B: CatalogBackend>(
    client: CatalogClient<B>,
    lang: &str,
) -> Result<(), LetzViewError> {
    let catalog = client.fetch_catalog().await?;
    if catalog.is_empty() {
        println!("The catalog is empty.");
        return Ok(());
    }

    for series in catalog.iter() {
        print_series(series, lang);
    }
    Ok(())
}

fn print_series(series: &Series, lang: &str) {
    println!("{} [{}]", series.title.resolve(lang), series.id);
    for season in &series.seasons {
        println!("  Season {} [{}]", season.number, season.id);
        for episode in &season.episodes {
            println!(
                "    E{:02} {} [{}]",
                episode.number,
                episode.title.resolve(lang),
                episode.id
            );
        }
    }
}

/// Identity the CLI signs in with
const CLI_OPERATOR: &str = "cli@letzview.local";

/// Signs in the local operator
///
/// The CLI is trusted: writing a catalog directory needs nothing beyond file
/// access, and a remote service checks the admin password itself on every
/// write. This session only opens the admin handle and names the operator in
/// the logs.
async fn local_operator() -> Result<AdminCredentialsProvider, LetzViewError> {
    let auth = AdminCredentialsProvider::new(CLI_OPERATOR, "");
    auth.login(&Credentials::new(CLI_OPERATOR, "")).await?;
    Ok(auth)
}

async fn admin<B: CatalogBackend>(
    client: CatalogClient<B>,
    translator: Option<TranslateClient>,
    action: AdminAction,
) -> Result<(), LetzViewError> {
    let auth = local_operator().await?;

    client.fetch_catalog().await?;
    let admin = client.admin(&auth)?;

    match action {
        AdminAction::CreateSeries {
            title,
            description,
            poster,
            backdrop,
        } => {
            let id = admin
                .create_series(NewSeries {
                    title: localize(translator.as_ref(), title).await,
                    description: localize(translator.as_ref(), description).await,
                    poster_url: poster,
                    backdrop_url: backdrop,
                })
                .await?;
            println!("{}", id);
        }
        AdminAction::AddSeason { series, number } => {
            match admin.add_season(&series, number).await? {
                Some(season) => println!("Season {} [{}]", season.number, season.id),
                None => println!("No series with id {}", series),
            }
        }
        AdminAction::AddEpisode {
            series,
            season,
            title,
            video,
            description,
            number,
        } => {
            let draft = EpisodeDraft {
                number,
                title: localize(translator.as_ref(), title).await,
                description: localize(translator.as_ref(), description).await,
                video_url: video,
                ..Default::default()
            };
            match admin.add_episode(&series, &season, draft).await? {
                Some(episode) => println!("E{:02} [{}]", episode.number, episode.id),
                None => println!("No season {} in series {}", season, series),
            }
        }
        AdminAction::DeleteSeries { series } => {
            if admin.delete_series(&series).await? {
                println!("Deleted {}", series);
            } else {
                println!("No series with id {}", series);
            }
        }
    }
    Ok(())
}

/// Turns CLI text into a localized value, pre-filling other languages if possible
async fn localize(translator: Option<&TranslateClient>, text: String) -> LocalizedText {
    let text = LocalizedText::localized([(DEFAULT_LANGUAGE, text)]);
    match translator {
        Some(translator) => {
            translator
                .prefill(&text, DEFAULT_LANGUAGE, SUPPORTED_LANGUAGES)
                .await
        }
        None => text,
    }
}
