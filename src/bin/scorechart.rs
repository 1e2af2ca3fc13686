use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use log::{debug, error, LevelFilter};

use scorechart::{parse_file, ChartOptions, ChartUrl};

/// Output form of the chart URL
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum OutputFormat {
    /// Unencoded `irealbook://` URL
    Raw,
    /// Percent-encoded URL
    #[default]
    Encoded,
    /// HTML anchor linking to the encoded URL
    Html,
}

#[derive(Parser, Debug)]
#[command(name = "scorechart")]
#[command(version)]
#[command(about = "Convert a MusicXML lead sheet into a chord-chart URL")]
struct Cli {
    /// Score file (.musicxml, .xml or .mxl)
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Style field of the chart, e.g. "Medium Swing"
    #[arg(short, long)]
    style: Option<String>,

    /// Output form
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Encoded)]
    format: OutputFormat,

    /// Also dump the parsed score as JSON to stderr
    #[arg(long)]
    part_json: bool,

    /// Log encoding decisions
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { LevelFilter::Debug } else { LevelFilter::Warn };
    env_logger::Builder::new().filter_level(level).init();

    let score = match parse_file(&cli.file) {
        Ok(score) => score,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    debug!(
        "parsed '{}': {} parts, {} measures",
        cli.file.display(),
        score.parts.len(),
        score.measure_count()
    );

    if cli.part_json {
        match scorechart::score_to_json(&score) {
            Ok(json) => eprintln!("{json}"),
            Err(e) => error!("{e}"),
        }
    }

    let options = ChartOptions { style: cli.style };
    match ChartUrl::from_score(&score, &options) {
        Ok(chart) => {
            let out = match cli.format {
                OutputFormat::Raw => chart.raw(),
                OutputFormat::Encoded => chart.encoded(),
                OutputFormat::Html => chart.html_anchor(),
            };
            println!("{out}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
