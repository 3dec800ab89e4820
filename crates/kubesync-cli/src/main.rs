//! kubesync CLI - Reconcile Kubernetes manifests against a cluster

use clap::{Args, Parser, Subcommand, ValueEnum};
use kubesync_core::GcTag;
use kubesync_kube::{DeleteCommandOptions, UpdateOptions, ValidateOptions};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod display;
mod error;
mod exit_codes;

use commands::Session;
use error::{CliError, Result};

#[derive(Parser)]
#[command(name = "kubesync")]
#[command(author = "kubesync Contributors")]
#[command(version)]
#[command(about = "Reconcile Kubernetes manifests against a cluster", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,

    /// Kubeconfig context to use
    #[arg(long, global = true)]
    context: Option<String>,

    /// Namespace for namespaced objects that do not set one
    #[arg(
        short,
        long,
        global = true,
        env = "KUBESYNC_NAMESPACE",
        default_value = "default"
    )]
    namespace: String,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or update objects, then garbage collect stale tagged ones
    Update(UpdateArgs),

    /// Delete objects in reverse dependency order
    Delete(DeleteArgs),

    /// Validate objects against the server's schemas
    Validate(ValidateArgs),
}

#[derive(Args)]
struct UpdateArgs {
    /// Manifest files or directories
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Create objects that do not exist yet
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    create: bool,

    /// Do not garbage collect after updating
    #[arg(long)]
    skip_gc: bool,

    /// Tag written objects and garbage collect stale ones carrying it
    #[arg(long, env = "KUBESYNC_GC_TAG", default_value = "")]
    gc_tag: String,

    /// Perform only read-only operations
    #[arg(long)]
    dry_run: bool,

    /// Validate objects against server schemas before writing
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    validate: bool,

    /// Do not fail validation for kinds without a schema
    #[arg(long)]
    ignore_unknown: bool,
}

impl UpdateArgs {
    fn options(&self) -> Result<UpdateOptions> {
        let gc_tag = GcTag::parse(&self.gc_tag).map_err(|e| CliError::usage(e.to_string()))?;

        Ok(UpdateOptions {
            create: self.create,
            skip_gc: self.skip_gc,
            gc_tag,
            dry_run: self.dry_run,
            validate: self.validate,
            ignore_unknown: self.ignore_unknown,
        })
    }
}

#[derive(Args)]
struct DeleteArgs {
    /// Manifest files or directories
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Seconds given to objects to terminate; negative keeps the server default
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    grace_period: i64,

    /// Report what would be deleted
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args)]
struct ValidateArgs {
    /// Manifest files or directories
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Do not fail for kinds without a schema
    #[arg(long)]
    ignore_unknown: bool,
}

fn main() {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.debug);

    let code = match run(cli) {
        Ok(()) => exit_codes::SUCCESS,
        Err(err) => {
            let code = err.exit_code();
            eprintln!("{:?}", miette::Report::new(err));
            code
        }
    };
    std::process::exit(code);
}

/// Initialize tracing subscriber with environment filter
///
/// `RUST_LOG` wins; otherwise warnings only, or debug for kubesync with `--debug`.
fn init_tracing(debug: bool) {
    let default = if debug {
        "warn,kubesync=debug,kubesync_core=debug,kubesync_kube=debug"
    } else {
        "warn"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new().map_err(|e| CliError::internal(e.to_string()))?;

    runtime.block_on(async {
        let session = Session {
            context: cli.context,
            namespace: cli.namespace,
            json: cli.output == OutputFormat::Json,
            cancel: CancellationToken::new(),
        };

        let cancel = session.cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, stopping after the current call");
                cancel.cancel();
            }
        });

        match cli.command {
            Commands::Update(args) => {
                let options = args.options()?;
                commands::update::run(&session, &args.paths, options).await
            }
            Commands::Delete(args) => {
                let options = DeleteCommandOptions {
                    grace_period: args.grace_period,
                    dry_run: args.dry_run,
                };
                commands::delete::run(&session, &args.paths, options).await
            }
            Commands::Validate(args) => {
                let options = ValidateOptions {
                    ignore_unknown: args.ignore_unknown,
                };
                commands::validate::run(&session, &args.paths, options).await
            }
        }
    })
}
