use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use taskdeck::{
    assistant::{Assistant, GenerateParams, Generator, OllamaGenerator},
    client::ApiClient,
    config::AppConfig,
    rest, ui, AppContext,
};
use tracing::info;

#[derive(Parser)]
#[command(
    name = "taskdeck",
    about = "Personal task tracker — API server, terminal UI, and embedded AI assistant",
    version
)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// REST API server port
    #[arg(long, env = "TASKDECK_PORT")]
    port: Option<u16>,

    /// Data directory for config and the SQLite database
    #[arg(long, env = "TASKDECK_DATA_DIR")]
    data_dir: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "TASKDECK_LOG")]
    log: Option<String>,

    /// Bind address for the API server (default: 127.0.0.1; use 0.0.0.0 for LAN access)
    #[arg(long, env = "TASKDECK_BIND")]
    bind_address: Option<String>,

    /// Write logs to this file path (rotated daily). Optional.
    #[arg(long, env = "TASKDECK_LOG_FILE")]
    log_file: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the API server (default when no subcommand given).
    ///
    /// Examples:
    ///   taskdeck serve
    ///   taskdeck
    Serve,
    /// Open the terminal UI (task board + assistant panel).
    ///
    /// Connects to a running server. Logs go to a file so they do not tear
    /// the alternate screen.
    ///
    /// Examples:
    ///   taskdeck ui
    ///   TASKDECK_API_URL=http://10.0.0.5:4400 taskdeck ui
    Ui,
    /// Ask the assistant a single question and print the reply.
    ///
    /// Pulls the model first if the backend does not have it yet.
    ///
    /// Examples:
    ///   taskdeck ask "draft a plan for tomorrow"
    Ask {
        /// The question to send.
        prompt: String,
    },
    /// Manage tasks from the command line.
    ///
    /// Scripting surface over the same REST API the UI uses.
    ///
    /// Examples:
    ///   taskdeck tasks list
    ///   taskdeck tasks add "Buy milk" --date 2024-06-01
    ///   taskdeck tasks toggle 3
    ///   taskdeck tasks rm 3
    Tasks {
        #[command(subcommand)]
        action: TasksAction,
    },
}

#[derive(Subcommand)]
enum TasksAction {
    /// List all tasks, newest first.
    List {
        /// Print raw JSON instead of one task per line.
        #[arg(long)]
        json: bool,
    },
    /// Add a task for a date (default: today).
    Add {
        title: String,
        /// Task date in YYYY-MM-DD form.
        #[arg(long)]
        date: Option<String>,
    },
    /// Flip a task's completion flag.
    Toggle { id: i64 },
    /// Delete a task.
    Rm { id: i64 },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = AppConfig::new(args.port, args.data_dir, args.log, args.bind_address);

    match args.command {
        Some(Command::Ui) => {
            // Default UI logs to a file — stderr output would tear the TUI.
            let log_file = args
                .log_file
                .or_else(|| Some(config.data_dir.join("taskdeck-ui.log")));
            let _guard = setup_logging(&config.log, log_file.as_deref(), &config.log_format);
            run_ui(&config).await?;
        }
        Some(Command::Ask { prompt }) => {
            let _guard = setup_logging("warn", args.log_file.as_deref(), &config.log_format);
            run_ask(&prompt, &config).await?;
        }
        Some(Command::Tasks { action }) => {
            let _guard = setup_logging("warn", args.log_file.as_deref(), &config.log_format);
            run_tasks(action, &config).await?;
        }
        None | Some(Command::Serve) => {
            let _guard = setup_logging(&config.log, args.log_file.as_deref(), &config.log_format);
            run_server(config).await?;
        }
    }

    Ok(())
}

// ── serve ─────────────────────────────────────────────────────────────────────

async fn run_server(config: AppConfig) -> Result<()> {
    info!(
        data_dir = %config.data_dir.display(),
        port = config.port,
        "starting taskdeck server"
    );
    let ctx = Arc::new(AppContext::init(config).await?);
    rest::start_rest_server(ctx).await
}

// ── ui ────────────────────────────────────────────────────────────────────────

async fn run_ui(config: &AppConfig) -> Result<()> {
    let client = ApiClient::new(config.api_url.clone());
    if !client.is_reachable().await {
        anyhow::bail!(
            "no server reachable at {} — start one with `taskdeck serve`",
            config.api_url
        );
    }

    let generator: Arc<dyn Generator> = Arc::new(OllamaGenerator::new(&config.assistant));
    let assistant = Assistant::new(generator, GenerateParams::from(&config.assistant));
    ui::run(client, assistant).await
}

// ── ask ───────────────────────────────────────────────────────────────────────

/// One-shot assistant query: pull the model with a progress bar, generate,
/// print the reply.
async fn run_ask(prompt: &str, config: &AppConfig) -> Result<()> {
    use indicatif::{ProgressBar, ProgressStyle};

    let generator = OllamaGenerator::new(&config.assistant);

    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:30.cyan}] {pos}%")
            .unwrap(),
    );
    bar.set_message("Preparing model");
    let cb = {
        let bar = bar.clone();
        move |pct: u8| bar.set_position(u64::from(pct))
    };
    generator.acquire(&cb).await?;
    bar.finish_and_clear();

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap(),
    );
    spinner.set_message("Thinking…");
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));

    let reply = generator
        .generate(prompt, &GenerateParams::from(&config.assistant))
        .await?;

    spinner.finish_and_clear();
    println!("{reply}");
    Ok(())
}

// ── tasks ─────────────────────────────────────────────────────────────────────

async fn run_tasks(action: TasksAction, config: &AppConfig) -> Result<()> {
    let client = ApiClient::new(config.api_url.clone());

    match action {
        TasksAction::List { json } => {
            let tasks = client.list_tasks().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&tasks)?);
            } else {
                for t in &tasks {
                    let mark = if t.completed { "x" } else { " " };
                    println!("[{mark}] #{id:<4} {date}  {title}", id = t.id, date = t.task_date, title = t.title);
                }
            }
        }
        TasksAction::Add { title, date } => {
            let date = date
                .unwrap_or_else(|| chrono::Local::now().date_naive().format("%Y-%m-%d").to_string());
            let task = client.add_task(&title, &date).await?;
            println!("created #{} {} ({})", task.id, task.title, task.task_date);
        }
        TasksAction::Toggle { id } => match client.toggle_task(id).await? {
            Some(task) => {
                let state = if task.completed { "done" } else { "open" };
                println!("#{} {} — {state}", task.id, task.title);
            }
            None => println!("no task with id {id}"),
        },
        TasksAction::Rm { id } => {
            let resp = client.delete_task(id).await?;
            println!("{}", resp.message);
        }
    }
    Ok(())
}

// ── logging ───────────────────────────────────────────────────────────────────

/// Initialize the tracing subscriber.
/// If `log_file` is set, logs go to a daily-rolling file only.
/// Returns a `WorkerGuard` that must stay alive for the process lifetime.
///
/// `log_format` may be `"pretty"` (default, human-readable compact format) or
/// `"json"` (structured JSON for log aggregators).
fn setup_logging(
    log_level: &str,
    log_file: Option<&std::path::Path>,
    log_format: &str,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let use_json = log_format == "json";

    if let Some(path) = log_file {
        let dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
        let filename = path
            .file_name()
            .unwrap_or_else(|| std::ffi::OsStr::new("taskdeck.log"));

        // Ensure the directory exists before tracing-appender tries to open it.
        if let Err(e) = std::fs::create_dir_all(dir) {
            // Fall back to stdout-only — don't panic on a bad log path.
            eprintln!(
                "warn: could not create log directory '{}': {e} — falling back to stdout",
                dir.display()
            );
            if use_json {
                tracing_subscriber::fmt().json().with_env_filter(log_level).init();
            } else {
                tracing_subscriber::fmt().with_env_filter(log_level).compact().init();
            }
            return None;
        }

        let appender = tracing_appender::rolling::daily(dir, filename);
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);

        if use_json {
            tracing_subscriber::registry()
                .with(EnvFilter::new(log_level))
                .with(fmt::layer().json().with_writer(non_blocking))
                .init();
        } else {
            tracing_subscriber::registry()
                .with(EnvFilter::new(log_level))
                .with(fmt::layer().with_writer(non_blocking))
                .init();
        }

        Some(guard)
    } else if use_json {
        tracing_subscriber::fmt().json().with_env_filter(log_level).init();
        None
    } else {
        tracing_subscriber::fmt().with_env_filter(log_level).compact().init();
        None
    }
}
