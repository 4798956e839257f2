//! `opentrep` command line: search travel points of reference, index the
//! travel database, or decode a stored engine answer.
use std::{
    io::Read,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{Context, Result, bail};
use clap::Parser;
use opentrep_wrapper::{
    CommandEngine, DEFAULT_INDEX_PATH, DEFAULT_LOG_PATH, OutputFormat, ParseResult, ReplayEngine,
    ResultParser, SearchOutcome, TrepConfig, TrepEngine, TrepSession, init_logging,
};
use tracing::{info, level_filters::LevelFilter};

#[derive(Parser, Debug)]
#[command(
    name = "opentrep",
    version,
    about = "Search travel points of reference (airports, cities) with OpenTrep.",
    after_help = "Example: opentrep --engine-cmd opentrep-searcher rio de janero lso angles reykyavki"
)]
struct Cli {
    /// Main argument, free text
    keys: Vec<String>,

    /// Output format: S (compact), F (full), J (JSON), I (interpreted JSON) or P (protobuf)
    #[arg(short, long, default_value = "S", value_parser = OutputFormat::from_str)]
    format: OutputFormat,

    /// Location of the Xapian index
    #[arg(short = 'x', long = "xapiandb", default_value = DEFAULT_INDEX_PATH)]
    xapian_db: PathBuf,

    /// Log file handed to the engine
    #[arg(short, long, default_value = DEFAULT_LOG_PATH)]
    log: PathBuf,

    /// Turn off verbose output
    #[arg(short, long)]
    quiet: bool,

    /// Index the travel database, then exit
    #[arg(short, long)]
    index: bool,

    /// Decode a stored engine answer instead of searching ('-' reads stdin)
    #[arg(long, value_name = "FILE", conflicts_with_all = ["index", "replay", "engine_cmd"])]
    parse: Option<PathBuf>,

    /// Answer from recorded payloads (DIR/S.out, DIR/J.out, DIR/P.out, DIR/F.out)
    #[arg(long, value_name = "DIR", conflicts_with = "engine_cmd")]
    replay: Option<PathBuf>,

    /// Program run for every engine call
    #[arg(long, value_name = "PROGRAM")]
    engine_cmd: Option<PathBuf>,

    /// Print decoded results as JSON
    #[arg(long)]
    json: bool,

    /// Fail instead of reporting an empty answer when a protobuf payload is malformed
    #[arg(long)]
    strict: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(if cli.quiet {
        LevelFilter::WARN
    } else {
        LevelFilter::INFO
    })?;

    if let Some(path) = &cli.parse {
        return decode_stored_answer(path, &cli);
    }

    let config = TrepConfig::builder()
        .xapian_index_path(&cli.xapian_db)
        .log_path(&cli.log)
        .output_format(cli.format.to_string())
        .log_level(if cli.quiet { 2 } else { 4 })
        .build()?;

    if let Some(dir) = &cli.replay {
        run(ReplayEngine::from_dir(dir)?, config, &cli)
    } else if let Some(program) = &cli.engine_cmd {
        run(CommandEngine::new(program), config, &cli)
    } else {
        bail!("No engine available: pass --engine-cmd PROGRAM, --replay DIR or --parse FILE")
    }
}

fn run<E: TrepEngine>(engine: E, config: TrepConfig, cli: &Cli) -> Result<()> {
    let mut session = TrepSession::initialize(engine, config)?;

    if cli.index {
        let count = session.index()?;
        println!("Done. Indexed {count} POR (points of reference)");
        session.finalize();
        return Ok(());
    }

    let query = cli.keys.join(" ");
    info!(search_string = %query, "Searching");
    let outcome = session.search(&query, cli.format)?;
    if let Some(result) = &outcome.result {
        check_strict(result, cli)?;
    }
    print_outcome(&outcome, cli)?;
    session.finalize();
    Ok(())
}

fn decode_stored_answer(path: &Path, cli: &Cli) -> Result<()> {
    let payload = if path == Path::new("-") {
        let mut buf = Vec::new();
        std::io::stdin().read_to_end(&mut buf)?;
        buf
    } else {
        std::fs::read(path).with_context(|| format!("reading {}", path.display()))?
    };
    // Text answers usually come with a trailing newline the engine never wrote
    let payload = if cli.format.wire_format().is_binary() {
        payload.as_slice()
    } else {
        payload.trim_ascii_end()
    };

    let result = ResultParser::parse(payload, cli.format)?;
    check_strict(&result, cli)?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", render(&result, cli.format));
    }
    Ok(())
}

fn check_strict(result: &ParseResult, cli: &Cli) -> Result<()> {
    if cli.strict {
        result.clone().require_complete()?;
    }
    Ok(())
}

fn render(result: &ParseResult, format: OutputFormat) -> String {
    match format {
        OutputFormat::Compact => result.to_string(),
        _ => result.render_interpreted(),
    }
}

fn print_outcome(outcome: &SearchOutcome, cli: &Cli) -> Result<()> {
    match (&outcome.result, cli.json) {
        (Some(result), true) => println!("{}", serde_json::to_string_pretty(result)?),
        _ => println!("{outcome}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_and_defaults() {
        let cli = Cli::try_parse_from(["opentrep", "rio", "de", "janero"]).unwrap();
        assert_eq!(cli.keys.join(" "), "rio de janero");
        assert_eq!(cli.format, OutputFormat::Compact);
        assert_eq!(cli.xapian_db, PathBuf::from(DEFAULT_INDEX_PATH));
        assert!(!cli.index);
    }

    #[test]
    fn test_format_letters() {
        let cli = Cli::try_parse_from(["opentrep", "-f", "I", "nce"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Interpreted);
        assert!(Cli::try_parse_from(["opentrep", "-f", "X", "nce"]).is_err());
    }

    #[test]
    fn test_parse_conflicts_with_index() {
        assert!(Cli::try_parse_from(["opentrep", "--parse", "answer.txt", "-i"]).is_err());
    }

    #[test]
    fn test_render_per_format() {
        let result = ResultParser::parse(b"nce/100;foo", OutputFormat::Compact).unwrap();
        assert_eq!(render(&result, OutputFormat::Compact), "([(1, 'NCE')], 'foo')");
        assert_eq!(render(&result, OutputFormat::Json), "NCE---100.00%---");
    }
}
