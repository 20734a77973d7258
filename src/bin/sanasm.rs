use std::{error::Error, io, path::PathBuf, process::ExitCode};

use clap::Parser;
use sanasm::{
    analyzer::{Analyzer, Literal},
    config::Config,
    diag::Diagnostics,
    lexer::{FsLoader, Lexer},
    parser, Mpu, Notation,
};
use tracing::Level;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Assembly source file
    source: PathBuf,

    /// Target processor: `6502`, `65c02`, or `65816` (default: 65c02)
    #[arg(short, long)]
    mpu: Option<Mpu>,

    /// Mnemonic notation: `san` or `wdc` (default: san)
    #[arg(short, long)]
    notation: Option<Notation>,

    /// Search directories for included files
    #[arg(short = 'I', long)]
    include: Vec<PathBuf>,

    /// Pre-defined symbols (repeatable)
    #[arg(short = 'D', long, value_name="KEY1=val", value_parser = sanasm::parse_defines::<String, Literal>)]
    define: Vec<(String, Literal)>,

    /// TOML file with project settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the token list
    #[arg(long)]
    tokens: bool,

    /// Print the analyzed syntax tree
    #[arg(long)]
    ast: bool,

    /// One of `TRACE`, `DEBUG`, `INFO`, `WARN`, or `ERROR`
    #[arg(short, long, default_value_t = Level::INFO)]
    log_level: Level,
}

fn main() -> ExitCode {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .with_writer(io::stderr)
        .init();

    if let Err(e) = main_real(args) {
        tracing::error!("{e}");
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn main_real(args: Args) -> Result<(), Box<dyn Error>> {
    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let config = config.overlay(
        args.mpu,
        args.notation,
        args.include,
        args.define
            .into_iter()
            .map(|(name, Literal(value))| (name, value)),
    );
    let mpu = config.mpu.unwrap_or_default();
    let notation = config.notation.unwrap_or_default();
    let source = args
        .source
        .to_str()
        .ok_or_else(|| format!("file name is not valid UTF-8: {}", args.source.display()))?;
    tracing::debug!("assembling {source} for the {mpu} in {notation} notation");

    let loader = FsLoader::new(config.include);
    let mut diag = Diagnostics::new();

    tracing::trace!("starting tokenizer");
    let tokens = Lexer::new(mpu, notation, &loader, &mut diag).run(source)?;
    if args.tokens {
        for tok in &tokens {
            println!("{tok}");
        }
    }

    tracing::trace!("starting parser");
    let mut program = parser::Parser::new(tokens)?.parse()?;

    tracing::trace!("starting analyzer");
    let mut analyzer = Analyzer::new(mpu, notation, &mut diag);
    for (name, value) in &config.defines {
        analyzer.define(name, *value);
    }
    analyzer.analyze(&mut program)?;
    if args.ast {
        print!("{program}");
    }
    for (name, sym) in analyzer.symbols().iter() {
        tracing::debug!("{name}: {:?} at {}", sym.kind, sym.pos);
    }
    Ok(())
}
