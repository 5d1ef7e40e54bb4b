use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use covid_series::app::{App, PlotOptions, RestoreSource};
use covid_series::config::{ConfigLoader, ResolvedConfig};
use covid_series::domain::DatasetKind;
use covid_series::error::CovidError;
use covid_series::output::{OutputMode, print_session};
use covid_series::snapshot::SnapshotStore;
use covid_series::source::SeriesHttpClient;
use covid_series::tui::TerminalChart;

#[derive(Parser)]
#[command(name = "covid-series")]
#[command(about = "Download, snapshot and plot the JHU CSSE COVID-19 time series")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<String>,

    #[arg(long, global = true)]
    data_dir: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Download a dataset and print its summary")]
    Fetch(FetchArgs),
    #[command(about = "Print the summary of a saved snapshot")]
    Show(ShowArgs),
    #[command(about = "Plot per-country series")]
    Plot(PlotArgs),
}

#[derive(Args)]
struct FetchArgs {
    #[arg(long, default_value = "confirmed")]
    kind: String,

    #[arg(long)]
    save: bool,

    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ShowArgs {
    #[arg(long, default_value = "confirmed")]
    kind: String,

    #[arg(long)]
    from_text: bool,

    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct PlotArgs {
    #[arg(long, default_value = "confirmed")]
    kind: String,

    #[arg(long, value_delimiter = ',')]
    countries: Vec<String>,

    #[arg(long)]
    from_snapshot: bool,

    #[arg(long)]
    save_figure: bool,

    #[arg(long)]
    no_view: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<CovidError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &CovidError) -> u8 {
    match error {
        CovidError::SnapshotNotFound(_)
        | CovidError::UnknownCountry(_)
        | CovidError::InvalidDatasetKind(_) => 2,
        CovidError::Network(_) | CovidError::NetworkStatus { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = ConfigLoader::resolve(cli.config.as_deref())?;
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir.into();
    }

    match cli.command {
        Some(Commands::Fetch(args)) => run_fetch(args, &config),
        Some(Commands::Show(args)) => run_show(args, &config),
        Some(Commands::Plot(args)) => run_plot(args, &config),
        None => run_default(&config),
    }
}

fn build_app(config: &ResolvedConfig) -> Result<App<SeriesHttpClient>, CovidError> {
    let client = SeriesHttpClient::new(config)?;
    let store = SnapshotStore::new(config.data_dir.clone());
    Ok(App::new(store, client))
}

/// Fetch confirmed cases, print the summary and save a chart of the
/// configured countries.
fn run_default(config: &ResolvedConfig) -> miette::Result<()> {
    let app = build_app(config)?;
    let session = app.acquire(DatasetKind::Confirmed, false)?;
    print_session(&session, OutputMode::Human).into_diagnostic()?;
    let result = app.plot(
        &session,
        &config.countries,
        PlotOptions { save_figure: true },
    )?;
    if let Some(path) = result.figure_path {
        println!("Figure saved to {path}");
    }
    Ok(())
}

fn run_fetch(args: FetchArgs, config: &ResolvedConfig) -> miette::Result<()> {
    let app = build_app(config)?;
    let session = app.acquire_by_name(&args.kind, args.save)?;
    print_session(&session, output_mode(args.json)).into_diagnostic()?;
    Ok(())
}

fn run_show(args: ShowArgs, config: &ResolvedConfig) -> miette::Result<()> {
    let kind: DatasetKind = args.kind.parse()?;
    let app = build_app(config)?;
    let source = if args.from_text {
        RestoreSource::Text
    } else {
        RestoreSource::Binary
    };
    let session = app.restore(kind, source)?;
    print_session(&session, output_mode(args.json)).into_diagnostic()?;
    Ok(())
}

fn run_plot(args: PlotArgs, config: &ResolvedConfig) -> miette::Result<()> {
    let kind: DatasetKind = args.kind.parse()?;
    let app = build_app(config)?;
    let session = if args.from_snapshot {
        app.restore(kind, RestoreSource::Binary)?
    } else {
        app.acquire(kind, false)?
    };
    let countries = if args.countries.is_empty() {
        config.countries.clone()
    } else {
        args.countries
    };

    let result = app.plot(
        &session,
        &countries,
        PlotOptions {
            save_figure: args.save_figure,
        },
    )?;
    if !args.no_view {
        TerminalChart::new(&result.plan).show()?;
    }
    if let Some(path) = result.figure_path {
        println!("Figure saved to {path}");
    }
    Ok(())
}

fn output_mode(json: bool) -> OutputMode {
    if json {
        OutputMode::Json
    } else {
        OutputMode::Human
    }
}
