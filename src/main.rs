use std::io::{self, BufRead, Write};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use confess::api;
use confess::client::ConfessionClient;
use confess::config::{self, ServerConfig};
use confess::flow::{
    share_link, AcceptOutcome, Bounds, Effects, FlowMode, FlowSession, FlowView, LogNotifier,
    Navigator, Point, SessionOptions, ShareDisplay, ShareView,
};
use confess::models::CreateConfessionInput;
use confess::store::ConfessionStore;

#[derive(Parser)]
#[command(name = "confess")]
#[command(about = "Write a love confession and share it as a link")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve {
        /// Port for HTTP API (defaults to CONFESS_PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Create a confession on a running server and print its link
    Create {
        /// Recipient name
        #[arg(long)]
        to: String,
        /// Sender name
        #[arg(long)]
        from: String,
        #[arg(short, long)]
        message: String,
        /// API base URL (defaults to CONFESS_SERVER_URL)
        #[arg(long)]
        server: Option<String>,
    },
    /// Show a stored confession
    Show {
        id: String,
        #[arg(long)]
        server: Option<String>,
    },
    /// Play the confession flow in the terminal
    Play {
        /// Flow configuration file (JSON)
        #[arg(long)]
        flow: Option<PathBuf>,
        /// Compose mode: recipient name
        #[arg(long, requires_all = ["from", "message"])]
        to: Option<String>,
        /// Compose mode: sender name
        #[arg(long, requires_all = ["to", "message"])]
        from: Option<String>,
        /// Compose mode: message
        #[arg(short, long, requires_all = ["to", "from"])]
        message: Option<String>,
        #[arg(long)]
        server: Option<String>,
    },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "confess=debug,tower_http=debug".into()),
    );

    // Logs go to stderr so command output on stdout stays clean.
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn client(server: Option<String>) -> ConfessionClient {
    match server {
        Some(url) => ConfessionClient::new(url),
        None => ConfessionClient::from_env(),
    }
}

/// Share links point at the site, not the API.
fn public_url() -> String {
    ServerConfig::from_env().public_url
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => {
            let mut config = ServerConfig::from_env();
            if let Some(port) = port {
                config = config.with_port(port);
            }
            serve(config).await?;
        }
        Commands::Create {
            to,
            from,
            message,
            server,
        } => {
            let client = client(server);
            let record = client
                .create(CreateConfessionInput::new(to, from, message))
                .await?;
            println!("{}", share_link(&public_url(), &record.id.to_string()));
        }
        Commands::Show { id, server } => {
            let client = client(server);
            let mut view = ShareView::new(&public_url(), id);
            view.load(&client, &LogNotifier).await;
            print_share(&view);
        }
        Commands::Play {
            flow,
            to,
            from,
            message,
            server,
        } => {
            let config = config::load_flow_config(flow.as_deref())?;
            let mode = match (to, from, message) {
                (Some(to), Some(from), Some(message)) => {
                    FlowMode::Compose(CreateConfessionInput::new(to, from, message))
                }
                _ => FlowMode::Playback,
            };
            play(config, mode, client(server)).await?;
        }
    }

    Ok(())
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    tracing::info!("Starting confession server on {}", config.addr());

    let db = config.open_database()?;
    let app = api::create_router(db);

    let listener = tokio::net::TcpListener::bind(config.addr()).await?;
    tracing::info!("Confession server listening on http://{}", config.addr());
    tracing::info!("Share links use {}", config.public_url);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

fn print_share(view: &ShareView) {
    match view.display() {
        ShareDisplay::Loading => println!("Loading..."),
        ShareDisplay::NotFound { message } => println!("{}", message),
        ShareDisplay::Confession {
            heading,
            to,
            message,
            from,
        } => {
            println!("{}\n", heading);
            println!("To: {}\n", to);
            println!("{}\n", message);
            println!("From: {}", from);
            println!("\n{}", view.link());
        }
    }
}

struct PrintNavigator;

impl Navigator for PrintNavigator {
    fn navigate(&self, url: &str) {
        println!("-> {}", url);
    }
}

/// The terminal stands in for a 400x300 card with the decline button resting
/// right of centre.
const CARD: Bounds = Bounds::new(400.0, 300.0);
const DECLINE_REST: Point = Point::new(260.0, 200.0);

async fn play(
    config: confess::models::FlowConfig,
    mode: FlowMode,
    store: ConfessionClient,
) -> anyhow::Result<()> {
    let effects = Effects {
        notifier: Arc::new(LogNotifier),
        navigator: Arc::new(PrintNavigator),
        media: None,
    };
    let options = SessionOptions {
        public_url: public_url(),
        ..SessionOptions::default()
    };
    let mut session = FlowSession::new(config, mode, effects, options);

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        match session.view() {
            FlowView::Narrating { step, index, total } => {
                println!("\n[{}/{}] {}\n{}", index + 1, total, step.title, step.body);
                prompt("(enter to continue) ")?;
                if lines.next().transpose()?.is_none() {
                    return Ok(());
                }
                session.advance()?;
            }
            FlowView::Deciding {
                decision,
                decline_offset,
            } => {
                println!("\n{}", decision.question);
                println!(
                    "[{}]   [{} @ {:+}, {:+}]",
                    decision.accept_label,
                    decision.decline_label,
                    decline_offset.dx,
                    decline_offset.dy
                );
                let accept_label = decision.accept_label.to_lowercase();
                let decline_label = decision.decline_label.clone();
                prompt("> ")?;
                let Some(line) = lines.next().transpose()? else {
                    return Ok(());
                };
                let answer = line.trim().to_lowercase();

                if answer == accept_label || answer == "y" {
                    match session.accept(&store).await {
                        Ok(AcceptOutcome::Persisted { link, .. }) => {
                            println!("Saved! Your link: {}", link);
                        }
                        Ok(_) => {}
                        // Notified already; stay on the decision screen.
                        Err(e) => tracing::debug!("Accept failed: {}", e),
                    }
                } else if answer == decline_label.to_lowercase() || answer == "n" {
                    let pointer = Point::new(
                        DECLINE_REST.x + decline_offset.dx,
                        DECLINE_REST.y + decline_offset.dy,
                    );
                    session.report_pointer_move(pointer, CARD);
                    session.decline();
                    println!("The \"{}\" button ran away!", decline_label);
                }
            }
            FlowView::Accepted { success } => {
                println!("\n{}\n{}", success.title, success.body);
                for promise in &success.promises {
                    println!("  {}", promise);
                }
                break;
            }
        }
    }

    session.wait_for_navigation().await;
    Ok(())
}

fn prompt(text: &str) -> io::Result<()> {
    print!("{}", text);
    io::stdout().flush()
}
