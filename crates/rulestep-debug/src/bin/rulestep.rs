//! `rulestep`: line-oriented debug console for rule files
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use rulestep_debug::{logging, DebugConfig, DebugSession, MessageKind};
use rulestep_engine::{FixedRecord, RuleKind};
use rulestep_lang::DynamicValue;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "rulestep", version, about = "Step through rule-language sources")]
struct Args {
    /// Rule source to debug
    rules: PathBuf,

    /// Code compiled from the rules, for line translation
    generated: Option<PathBuf>,

    /// YAML session config
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON record injected as `record` (record rules)
    #[arg(long)]
    record: Option<PathBuf>,

    /// Rule kind
    #[arg(long, value_enum, default_value_t = Kind::Standard)]
    kind: Kind,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Kind {
    /// Plain rule, no injected data
    Standard,
    /// Rule evaluated against the `--record` JSON
    Record,
}

impl From<Kind> for RuleKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Standard => RuleKind::Standard,
            Kind::Record => RuleKind::Record,
        }
    }
}

fn main() -> Result<()> {
    logging::init_tracing();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => DebugConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => DebugConfig::default(),
    };

    let source = std::fs::read_to_string(&args.rules)
        .with_context(|| format!("reading rules {}", args.rules.display()))?;

    let mut session = DebugSession::new(config);
    if let Some(path) = &args.record {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading record {}", path.display()))?;
        let record = DynamicValue::parse_json(&json)
            .with_context(|| format!("parsing record {}", path.display()))?;
        session = session.with_mock_provider(Box::new(FixedRecord(record)));
    }

    session.initialize(&source, None, args.kind.into());

    if let Some(path) = &args.generated {
        let generated = std::fs::read_to_string(path)
            .with_context(|| format!("reading generated code {}", path.display()))?;
        session.attach_generated_code(&generated);
    }

    let mut stdout = io::stdout();
    for message in session.terminal().messages() {
        writeln!(stdout, "{message}")?;
    }
    writeln!(stdout, "Type `help` for commands, `exit` to quit.")?;

    let stdin = io::stdin();
    loop {
        write!(stdout, "(rulestep) ")?;
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if matches!(input, "exit" | "quit") {
            break;
        }

        // the echoed command is a debug message
        for message in session.execute_command(input) {
            if message.kind != MessageKind::Debug {
                writeln!(stdout, "{message}")?;
            }
        }
    }
    Ok(())
}
