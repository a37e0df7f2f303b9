use {
    std::path::PathBuf,
    clap::Parser as _,
    futures::future::{
        self,
        FutureExt as _,
    },
    rocket::Rocket,
    sqlx::{
        ConnectOptions as _,
        postgres::{
            PgConnectOptions,
            PgPoolOptions,
        },
    },
    crate::{
        metadata::Clients,
        model::NewStream,
        prelude::*,
        reconcile::Reconciler,
        sheets::GoogleSheets,
    },
};

mod bot;
mod config;
mod http;
mod metadata;
mod model;
mod prelude;
mod reconcile;
mod rowmap;
mod sheets;
mod stats;

#[derive(clap::Subcommand)]
enum Subcommand {
    /// Run a full spreadsheet-to-database sync and exit.
    Sync,
}

#[derive(clap::Parser)]
#[clap(version)]
struct Args {
    #[clap(long)]
    port: Option<u16>,
    #[clap(long, default_value = "cfg/podcast-admin.json")]
    config: PathBuf,
    #[clap(subcommand)]
    subcommand: Option<Subcommand>,
}

#[derive(Debug, thiserror::Error)]
enum Error {
    #[error(transparent)] Bot(#[from] bot::Error),
    #[error(transparent)] Config(#[from] config::Error),
    #[error(transparent)] Json(#[from] serde_json::Error),
    #[error(transparent)] Migrate(#[from] sqlx::migrate::MigrateError),
    #[error(transparent)] Reconcile(#[from] reconcile::Error),
    #[error(transparent)] Reqwest(#[from] reqwest::Error),
    #[error(transparent)] Rocket(#[from] rocket::Error),
    #[error(transparent)] Sql(#[from] sqlx::Error),
    #[error(transparent)] Task(#[from] tokio::task::JoinError),
}

/// Periodically pulls the livestream playlist and records any video not yet in
/// the streams table, appending it to the sheet as well.
async fn poll_streams(youtube: metadata::YouTube, reconciler: Arc<Reconciler<GoogleSheets>>, poll_interval: Duration, shutdown: rocket::Shutdown) -> Result<(), Error> {
    let mut interval = tokio::time::interval(poll_interval);
    loop {
        tokio::select! {
            _ = interval.tick() => {
                let videos = match youtube.playlist_videos().await {
                    Ok(videos) => videos,
                    Err(e) => {
                        warn!("listing livestream playlist: {e}");
                        continue
                    }
                };
                for video in videos {
                    let data = NewStream {
                        date: video.published,
                        title: video.title,
                        link: video.link,
                        length_ms: video.length_ms,
                    };
                    match reconciler.add_stream(data).await {
                        Ok(Some(stream)) => info!("recorded new stream: {}", stream.link),
                        Ok(None) => {}
                        Err(e) => warn!("recording stream: {e}"),
                    }
                }
            }
            _ = shutdown.clone() => break,
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let Args { port, config, subcommand } = Args::parse();
    // Initialize logging to systemd journal via stderr
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
    let default_panic_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        log::error!("Thread panic: {info:?}");
        default_panic_hook(info)
    }));
    let config = Config::load(&config).await?;
    let http_client = reqwest::Client::builder()
        .user_agent(concat!("PodcastAdmin/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(30))
        .use_rustls_tls()
        .https_only(true)
        .build()?;
    let mut db_options = PgConnectOptions::default()
        .database("podcast_admin")
        .application_name("podcast-admin")
        .log_slow_statements(log::LevelFilter::Warn, Duration::from_secs(10));
    if let Some(ref host) = config.database.host {
        db_options = db_options.host(host);
    }
    if let Some(port) = config.database.port {
        db_options = db_options.port(port);
    }
    if let Some(ref username) = config.database.username {
        db_options = db_options.username(username);
    }
    if let Some(ref password) = config.database.password {
        db_options = db_options.password(password);
    }
    if let Some(ref database) = config.database.database {
        db_options = db_options.database(database);
    }
    let db_pool = PgPoolOptions::default()
        .max_connections(16)
        .connect_with(db_options)
        .await?;
    sqlx::migrate!("./migrations").run(&db_pool).await?;
    let sheets = GoogleSheets::new(http_client.clone(), config.google.sheet_id.clone(), config.google.service_account_path.clone());
    let reconciler = Arc::new(Reconciler::new(sheets, db_pool, config.invalid_date_fallback));
    reconciler.validate_headers().await?;
    if let Some(Subcommand::Sync) = subcommand {
        let report = reconciler.full_sync().await?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(())
    }
    let mut metadata_clients = Clients::new(&http_client, &config);
    let youtube = metadata_clients.youtube.take();
    let rocket = http::rocket(reconciler.clone(), metadata_clients, port.unwrap_or(24080)).await?;
    let bot_task = if config.telegram.bot_token.is_empty() {
        warn!("no Telegram bot token configured, running without the bot");
        future::ok::<(), Error>(()).boxed()
    } else {
        let state = bot::BotState {
            reconciler: reconciler.clone(),
            default_admin: config.telegram.default_admin_id,
            web_app_url: config.telegram.web_app_url.clone(),
        };
        tokio::spawn(bot::run(config.telegram.bot_token.clone(), state, rocket.shutdown())).map(|res| match res {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(Error::from(e)),
            Err(e) => Err(Error::Task(e)),
        }).boxed()
    };
    let poll_task = if let Some(youtube) = youtube {
        let poll_interval = Duration::from_secs(config.youtube.as_ref().map_or(360, |youtube| youtube.poll_interval_minutes) * 60);
        tokio::spawn(poll_streams(youtube, reconciler, poll_interval, rocket.shutdown())).map(|res| match res {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e),
            Err(e) => Err(Error::Task(e)),
        }).boxed()
    } else {
        future::ok::<(), Error>(()).boxed()
    };
    let rocket_task = tokio::spawn(rocket.launch()).map(|res| match res {
        Ok(Ok(Rocket { .. })) => Ok(()),
        Ok(Err(e)) => Err(Error::from(e)),
        Err(e) => Err(Error::Task(e)),
    });
    let ((), (), ()) = tokio::try_join!(rocket_task, bot_task, poll_task)?;
    Ok(())
}
