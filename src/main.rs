use clap::{ArgAction, Parser};
use tracing_subscriber::EnvFilter;

use refmove::diagnostics::{LoadError, RelocateError, SyntaxError, render_error};
use refmove::loader::LoadOptions;
use refmove::relocate::{BufferedSink, MemorySink, PrintSink, Report, RewriteRequest, Sink, SymbolRef};

#[derive(Parser)]
#[command(
    name = "refmove",
    version,
    about = "Relocate every reference to a package-level symbol to another symbol"
)]
struct Cli {
    /// Symbol to move references away from, as import/path.Name
    #[arg(long, value_parser = parse_symbol)]
    from: SymbolRef,

    /// Symbol references should point to, as import/path.Name
    #[arg(long, value_parser = parse_symbol)]
    to: SymbolRef,

    /// Package name used when the destination's name conflicts with another import
    #[arg(long)]
    to_pkg_name: Option<String>,

    /// Overwrite the source files instead of printing them
    #[arg(short = 'w', long = "write")]
    write: bool,

    /// Include _test.go files (default unless refmove.toml says otherwise)
    #[arg(long, conflicts_with = "no_tests")]
    tests: bool,

    /// Leave _test.go files alone
    #[arg(long)]
    no_tests: bool,

    /// Print the edit report as JSON instead of file contents
    #[arg(long)]
    json: bool,

    /// More logging on stderr (-v info, -vv debug). RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Package directory, or dir/... for it and every package beneath it
    #[arg(default_value = ".")]
    pattern: String,
}

fn parse_symbol(s: &str) -> Result<SymbolRef, String> {
    SymbolRef::parse(s).ok_or_else(|| format!("'{s}' is not of the form import/path.Name"))
}

fn init_tracing(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(format!("refmove={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn print_header(cli: &Cli) {
    let path = |r: &SymbolRef| r.path().unwrap_or_default().to_string();
    println!("dir:{}", cli.pattern);
    println!("from package: {:?}, symbol:{:?}", path(&cli.from), cli.from.name);
    print!("to   package: {:?}, symbol:{:?}", path(&cli.to), cli.to.name);
    if let Some(name) = &cli.to_pkg_name {
        print!(" (package name if duplication: {name:?})");
    }
    println!("\n");
}

/// Render the error on stderr; syntax errors get a source excerpt.
fn report_error(err: &RelocateError) {
    if let RelocateError::Load(LoadError::Syntax { path, msg, span, .. }) = err {
        if let Ok(source) = std::fs::read_to_string(path) {
            render_error(&source, &path.display().to_string(), &SyntaxError::new(msg.clone(), *span));
        }
    }
    eprintln!("error: {err}");
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let request = RewriteRequest {
        from: cli.from.clone(),
        to: cli.to.clone(),
        to_alias_override: cli.to_pkg_name.clone(),
    };
    let mut options = LoadOptions::new(cli.pattern.clone());
    if cli.tests {
        options.tests = Some(true);
    } else if cli.no_tests {
        options.tests = Some(false);
    }

    if !cli.json {
        print_header(&cli);
    }

    let stdout = std::io::stdout();
    let mut sink: Box<dyn Sink> = match (cli.write, cli.json) {
        (true, _) => Box::new(BufferedSink::new()),
        (false, true) => Box::new(MemorySink::new()),
        (false, false) => Box::new(PrintSink::new(stdout.lock())),
    };

    let report: Report = match refmove::run(&options, &request, sink.as_mut()) {
        Ok(report) => report,
        Err(err) => {
            report_error(&err);
            std::process::exit(1);
        }
    };
    drop(sink);

    if cli.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(err) => {
                eprintln!("error: could not serialize report: {err}");
                std::process::exit(1);
            }
        }
    } else if cli.write {
        for edit in &report.edits {
            println!("{edit}");
        }
    }
}
