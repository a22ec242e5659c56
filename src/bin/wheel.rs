use async_trait::async_trait;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wheelplex::config::ClientConfig;
use wheelplex::models::Item;
use wheelplex::wheel::{
    FileStore, Filter, LibraryCache, Navigation, Presenter, RemoteLibrary, Spin, WheelApp,
    WheelSettings,
};

/// Pick something to watch from your Plex library.
#[derive(Debug, Parser)]
#[command(name = "wheel", version)]
struct Args {
    /// Only items you have never watched
    #[arg(long)]
    unwatched: bool,
    /// Only items critics rated below 4
    #[arg(long)]
    bad_critic: bool,
    /// Only items audiences rated below 4
    #[arg(long)]
    bad_audience: bool,
    /// Only items critics hated and audiences loved
    #[arg(long)]
    disparity: bool,
    /// How many times to spin
    #[arg(long, default_value_t = 1)]
    spins: u32,
    /// Ignore the cached library and fetch a fresh one
    #[arg(long)]
    refresh: bool,
}

impl Args {
    fn filters(&self) -> impl Iterator<Item = Filter> + '_ {
        [
            (Filter::Unwatched, self.unwatched),
            (Filter::BadCritic, self.bad_critic),
            (Filter::BadAudience, self.bad_audience),
            (Filter::Disparity, self.disparity),
        ]
        .into_iter()
        .filter_map(|(filter, on)| on.then_some(filter))
    }
}

struct TerminalPresenter;

#[async_trait]
impl Presenter for TerminalPresenter {
    async fn present(&self, spin: &Spin, duration: Duration) -> Item {
        println!("Spinning...");
        for segment in &spin.segments {
            let mut lines = segment.label.lines();
            println!("  {}  {}", segment.color, lines.next().unwrap_or_default());
            for line in lines {
                println!("           {}", line.trim_start());
            }
        }

        tokio::time::sleep(duration).await;
        spin.winner().clone()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,wheelplex=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let config = ClientConfig::from_env();

    let remote = Arc::new(RemoteLibrary::new(&config.base_url, config.session.clone()));
    let store = Arc::new(FileStore::new(&config.state_dir));
    let cache = LibraryCache::new(store, remote.clone());
    let mut app = WheelApp::new(
        remote.clone(),
        cache,
        Arc::new(TerminalPresenter),
        WheelSettings::default(),
    );

    if args.refresh {
        app.clear_cache()?;
    }

    if let Navigation::Redirect(route) = app.load().await {
        eprintln!(
            "The session can't reach a library yet. Open {}{} in a browser to pair and \
             pick a library, then set WHEELPLEX_SESSION to that browser's session cookie.",
            remote.base_url(),
            route
        );
        std::process::exit(1);
    }

    for filter in args.filters() {
        app.set_filter(filter, true);
    }

    let eligible = app.eligible().len();
    println!("{} of {} items eligible", eligible, app.items().len());
    if !app.can_spin() {
        anyhow::bail!("Nothing to spin: no items match the selected filters");
    }

    for _ in 0..args.spins {
        let winner = app.spin().await?;
        println!("\nWinner: {}", winner.title);
        if !winner.genres.is_empty() {
            println!("  {}", winner.genres.join(", "));
        }
        if let Some(summary) = &winner.summary {
            println!("  {}", summary);
        }
        println!();
    }

    Ok(())
}
