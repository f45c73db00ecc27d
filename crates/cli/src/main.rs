use anyhow::Context;
use clap::{Parser, Subcommand};
use lib::analysis::{AnalysisRequest, AnalysisResult};
use lib::client::RelayClient;
use lib::exchange::RenderSurface;
use lib::session::{Role, SessionStore, GREETING};
use std::io::Read;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "lynn")]
#[command(about = "Lynn — chat assistant and SEO competitor analysis", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Run the HTTP relay (streamed chat + competitor analysis). Requires an
    /// API credential via API_KEY or model.apiKey in the config file.
    Serve {
        /// Config file path (default: LYNN_CONFIG_PATH or ~/.lynn/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// HTTP port (default from config, PORT env, or 8080)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Chat with Lynn from the terminal (streams the reply, keeps local history).
    Chat {
        /// Config file path (default: LYNN_CONFIG_PATH or ~/.lynn/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Relay base URL (default: http://127.0.0.1:<port>)
        #[arg(long, value_name = "URL")]
        server: Option<String>,

        /// Clear the persisted conversation and exit.
        #[arg(long)]
        reset: bool,
    },

    /// Analyze a competitor page for a subject and print the structured result.
    Analyze {
        /// Config file path (default: LYNN_CONFIG_PATH or ~/.lynn/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Relay base URL (default: http://127.0.0.1:<port>)
        #[arg(long, value_name = "URL")]
        server: Option<String>,

        /// Subject the competitor page targets.
        #[arg(long, value_name = "TEXT")]
        subject: String,

        /// File with the competitor page content (stdin when omitted).
        #[arg(long, value_name = "PATH")]
        content_file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("lynn {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Serve { config, port }) => {
            if let Err(e) = run_serve(config, port).await {
                log::error!("serve failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Chat {
            config,
            server,
            reset,
        }) => {
            if let Err(e) = run_chat(config, server, reset).await {
                log::error!("chat failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Analyze {
            config,
            server,
            subject,
            content_file,
        }) => {
            if let Err(e) = run_analyze(config, server, subject, content_file).await {
                log::error!("analyze failed: {}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

async fn run_serve(config_path: Option<PathBuf>, port: Option<u16>) -> anyhow::Result<()> {
    let (mut config, _path) = lib::config::load_config(config_path)?;
    config.server.port = port.unwrap_or_else(|| lib::config::resolve_port(&config));
    log::info!("starting relay on {}:{}", config.server.bind, config.server.port);
    lib::relay::run_relay(config).await
}

fn server_url(config: &lib::config::Config, flag: Option<String>) -> String {
    flag.unwrap_or_else(|| format!("http://127.0.0.1:{}", lib::config::resolve_port(config)))
}

/// Renders an in-flight reply by clearing and redrawing its lines, so each
/// increment replaces the previous render in place.
struct TerminalSurface {
    drawn_lines: usize,
}

impl TerminalSurface {
    fn new() -> Self {
        Self { drawn_lines: 0 }
    }

    fn redraw(&mut self, text: &str) {
        use std::io::Write;
        let mut stdout = std::io::stdout();
        if self.drawn_lines > 0 {
            let _ = write!(stdout, "\x1b[{}A\x1b[J", self.drawn_lines);
        }
        let _ = writeln!(stdout, "{}", text);
        let _ = stdout.flush();
        // Line counting ignores terminal wrapping; long wrapped lines redraw
        // slightly short, which only leaves the older render above.
        self.drawn_lines = text.lines().count().max(1);
    }

    fn finish(&mut self) {
        println!();
        self.drawn_lines = 0;
    }
}

impl RenderSurface for TerminalSurface {
    fn user_turn(&mut self, _text: &str) {
        // The user just typed the line; it is already on screen.
    }

    fn pending(&mut self) {
        self.drawn_lines = 0;
        self.redraw("…");
    }

    fn partial(&mut self, rendered: &str) {
        self.redraw(rendered);
    }

    fn settled(&mut self, rendered: &str) {
        self.redraw(rendered);
        self.finish();
    }

    fn failed(&mut self, message: &str) {
        self.redraw(message);
        self.finish();
    }
}

async fn run_chat(
    config_path: Option<PathBuf>,
    server: Option<String>,
    reset: bool,
) -> anyhow::Result<()> {
    use std::io::{self, Write};

    let (config, _path) = lib::config::load_config(config_path)?;
    let mut store = SessionStore::load(lib::config::default_history_path());

    if reset {
        store.reset().context("clearing chat history")?;
        println!("{}", lib::markdown::render(GREETING));
        return Ok(());
    }

    for turn in store.display_turns() {
        match turn.role {
            Role::User => println!("> {}", turn.text),
            Role::Model => {
                println!("{}", lib::markdown::render(&turn.text));
                println!();
            }
        }
    }

    let client = RelayClient::new(server_url(&config, server));
    let mut surface = TerminalSurface::new();
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;
        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input == "/quit" {
            break;
        }
        lib::exchange::run_exchange(&client, &mut store, &mut surface, input).await?;
    }
    Ok(())
}

async fn run_analyze(
    config_path: Option<PathBuf>,
    server: Option<String>,
    subject: String,
    content_file: Option<PathBuf>,
) -> anyhow::Result<()> {
    let (config, _path) = lib::config::load_config(config_path)?;
    let competitor_content = match content_file {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => {
            let mut s = String::new();
            std::io::stdin()
                .read_to_string(&mut s)
                .context("reading competitor content from stdin")?;
            s
        }
    };
    let request = AnalysisRequest {
        competitor_content: competitor_content.trim().to_string(),
        subject,
    };
    request.validate().map_err(anyhow::Error::msg)?;

    let client = RelayClient::new(server_url(&config, server));
    let result = client.analyze(&request).await?;
    print_analysis(&result);
    Ok(())
}

fn print_analysis(result: &AnalysisResult) {
    println!("Analyse SEO");
    println!("  H1: {}", result.seo_analysis.h1);
    println!("  Méta-titre: {}", result.seo_analysis.meta_title);
    println!("  Méta-description: {}", result.seo_analysis.meta_description);
    println!();
    println!("Angle du contenu");
    println!("  {}", result.content_angle);
    println!();
    println!("Points forts");
    for strength in &result.strengths {
        println!("  • {}", strength);
    }
    println!();
    println!("Points faibles");
    for weakness in &result.weaknesses {
        println!("  • {}", weakness);
    }
    println!();
    println!("Opportunité stratégique");
    println!("  {}", result.strategic_opportunity);
}
