mod config;
mod demo;
mod error;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use capability::{Actor, Behavior, Value};
use chrono::Local;
use clap::{Parser, Subcommand};
use marshal::{Domain, Router};
use parking_lot::Mutex;
use sandbox::SandboxFactory;
use stepping::{EventLoop, Stepping};
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Config;
use error::{Error, Result};

const CONFIG_FILE: &str = "stepbox.toml";

#[derive(Parser)]
#[command(name = "stepbox")]
#[command(about = "Remotely controlled stepping sandboxes", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a sandbox, run a demo module inside it, then destroy it
    Run {
        /// Demo module to sponsor
        #[arg(short, long, default_value = "ping")]
        module: String,
        /// Dispatch at most N sandbox events
        #[arg(short, long)]
        count: Option<usize>,
        /// Configuration file
        #[arg(long, default_value = CONFIG_FILE)]
        config: PathBuf,
    },
    /// List the built-in demo modules
    Modules,
}

fn main() {
    // RUST_LOG=debug shows capability traffic
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("cli=info,sandbox=info")),
        )
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run {
            module,
            count,
            config,
        }) => cmd_run(&module, count, &config),
        Some(Commands::Modules) => {
            cmd_modules();
            Ok(())
        }
        None => cmd_run("ping", None, Path::new(CONFIG_FILE)),
    }
}

fn cmd_modules() {
    println!("{:<10}  DESCRIPTION", "MODULE");
    println!("{}", "-".repeat(60));
    for (name, description) in demo::MODULES {
        println!("{name:<10}  {description}");
    }
}

fn cmd_run(module: &str, count: Option<usize>, config_path: &Path) -> Result<()> {
    println!("stepbox v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load_or_default(config_path)?;
    println!(
        "Config: {}",
        if config_path.exists() {
            config_path.display().to_string()
        } else {
            "default".to_string()
        }
    );

    let modules = demo::registry();
    if !modules.specifiers().iter().any(|name| name == module) {
        return Err(Error::UnknownModule {
            name: module.to_string(),
        });
    }

    // Host side: one engine, one router, one domain of our own.
    let host = Stepping::new();
    let router = Router::new(Arc::new(host.clone()));
    let domain = router.domain(&config.host.domain)?;

    let factory = SandboxFactory::new(config.sandbox, Arc::new(modules))?;
    let bundle = factory.create(Arc::new(host.clone()), router.transport())?;
    bundle.install_routes(&router)?;
    println!("Control domain: {}", bundle.control_prefix());
    println!("Sandbox domain: {}", bundle.domain_prefix());
    println!();

    // Load the module.
    let exports = Arc::new(Mutex::new(None));
    let slot = exports.clone();
    let sponsored = domain.sponsor(Behavior::new("sponsored", move |_, message| {
        *slot.lock() = Some(message);
        Ok(())
    }));
    domain.remote_to_local(&bundle.sponsor)?.send(Value::map([
        ("module", Value::from(module)),
        ("ok", sponsored.into()),
        ("fail", printer(&domain, "sponsor failed").into()),
    ]));
    drive(&host)?;
    let exports = exports.lock().take().ok_or_else(|| Error::NoExports {
        module: module.to_string(),
    })?;

    // Seed every export with a reply address.
    let reply = printer(&domain, "reply");
    for (name, actor) in demo::exported_actors(&exports) {
        info!(module, export = %name, "seeding");
        actor.send(Value::map([("customer", &reply)]));
    }
    drive(&host)?;

    // Run the sandbox, logging every effect.
    let mut options = Value::map([
        ("log", printer(&domain, "effect")),
        ("fail", printer(&domain, "fault")),
    ]);
    if let Some(count) = count {
        options.insert("count", count);
    }
    domain.remote_to_local(&bundle.event_loop)?.send(Value::map([
        ("arguments", Value::List(vec![options])),
        ("ok", printer(&domain, "drained").into()),
        ("fail", printer(&domain, "eventLoop failed").into()),
    ]));
    drive(&host)?;

    domain
        .remote_to_local(&bundle.destroy)?
        .send(Value::map([("ok", printer(&domain, "destroyed"))]));
    drive(&host)?;
    Ok(())
}

/// Run the host engine until nothing is pending.
fn drive(host: &Stepping) -> Result<()> {
    host.event_loop(EventLoop::new())?;
    Ok(())
}

/// An actor in the host domain that prints whatever it receives.
fn printer(domain: &Domain, label: &'static str) -> Actor {
    domain.sponsor(Behavior::new(label, move |_, message| {
        let time = Local::now().format("%H:%M:%S%.3f");
        println!("[{time}] {label}: {}", render(&message));
        Ok(())
    }))
}

fn render(value: &Value) -> String {
    let json = marshal::to_wire(value, &mut |actor| format!("actor:{}", actor.id()));
    match json.map(|json| serde_json::to_string(&json)) {
        Ok(Ok(text)) => text,
        _ => format!("{value:?}"),
    }
}
