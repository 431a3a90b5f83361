use clap::{Parser as ClapParser, Subcommand};
use influxql_transpiler::cli::{
    self, CheckOptions, CheckResult, CliError, ConfigOptions, TranspileOptions,
};
use std::io::{self, Read};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(ClapParser)]
#[command(name = "influxql-transpile")]
#[command(about = "Compile InfluxQL SELECT statements into dataflow query specs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Transpile a query and print its spec as JSON
    Transpile {
        /// The InfluxQL query (reads from stdin if not provided)
        query: Option<String>,

        #[command(flatten)]
        config: ConfigOptions,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,
    },

    /// Validate a query without printing its spec
    Check {
        /// The InfluxQL query (reads from stdin if not provided)
        query: Option<String>,

        #[command(flatten)]
        config: ConfigOptions,

        /// Only validate syntax, don't compile
        #[arg(long)]
        syntax_only: bool,
    },
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Transpile {
            query,
            config,
            pretty,
        } => run_transpile(query, config, pretty),
        Commands::Check {
            query,
            config,
            syntax_only,
        } => run_check(query, config, syntax_only),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(e.exit_code());
    }
}

/// Log to stderr so stdout carries only the spec. Filtered by `RUST_LOG`.
fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn read_query(query: Option<String>) -> Result<String, CliError> {
    match query {
        Some(query) => Ok(query),
        None if !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
        None => Err(CliError::NoInput),
    }
}

fn run_transpile(
    query: Option<String>,
    config: ConfigOptions,
    pretty: bool,
) -> Result<(), CliError> {
    let options = TranspileOptions {
        query: read_query(query)?,
        config,
        pretty,
    };
    println!("{}", cli::execute_transpile(&options)?);
    Ok(())
}

fn run_check(
    query: Option<String>,
    config: ConfigOptions,
    syntax_only: bool,
) -> Result<(), CliError> {
    let options = CheckOptions {
        query: read_query(query)?,
        config,
        syntax_only,
    };

    match cli::execute_check(&options)? {
        CheckResult::SyntaxValid { statements } => {
            println!("Syntax is valid ({} statement(s))", statements)
        }
        CheckResult::Valid {
            statements,
            operations,
        } => println!(
            "Query is valid ({} statement(s), {} operation(s))",
            statements, operations
        ),
    }
    Ok(())
}
