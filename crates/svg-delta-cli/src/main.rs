use serde::Serialize;
use std::io::Read;
use svg_delta::{DeltaComputer, DeltaConfig};

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Delta(svg_delta::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Delta(err) => write!(f, "{err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<svg_delta::Error> for CliError {
    fn from(value: svg_delta::Error) -> Self {
        Self::Delta(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Clone, Copy, Default)]
enum Command {
    #[default]
    Compute,
    Prepare,
}

#[derive(Debug, Default)]
struct Args {
    command: Command,
    inputs: Vec<String>,
    pretty: bool,
    config: Option<String>,
    out_dir: Option<String>,
    out: Option<String>,
}

fn usage() -> &'static str {
    "svg-delta\n\
\n\
USAGE:\n\
  svg-delta [compute] [--pretty] [--config <json>] [--out-dir <dir>] <frame.svg>...\n\
  svg-delta prepare [--config <json>] [--out <path>] [<path>|-]\n\
\n\
NOTES:\n\
  - compute prints {\"base\": ..., \"deltas\": [...]} by default.\n\
  - compute --out-dir writes base.svg, deltas.json and metadata.json, then prints the metadata.\n\
  - Frames are diffed against the first frame, in the order given.\n\
  - prepare reads stdin when <path> is omitted or '-', and prints the prepared SVG.\n\
  - Set RUST_LOG=debug to see why frames fall back to full SVG.\n\
"
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args::default();

    let mut it = argv.iter().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "compute" if args.inputs.is_empty() => args.command = Command::Compute,
            "prepare" if args.inputs.is_empty() => args.command = Command::Prepare,
            "--pretty" => args.pretty = true,
            "--config" => {
                let Some(path) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.config = Some(path.clone());
            }
            "--out-dir" => {
                let Some(dir) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.out_dir = Some(dir.clone());
            }
            "--out" => {
                let Some(out) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.out = Some(out.clone());
            }
            "--" => args.inputs.extend(it.by_ref().cloned()),
            "-" => args.inputs.push(a.clone()),
            other if other.starts_with('-') => return Err(CliError::Usage(usage())),
            path => args.inputs.push(path.to_string()),
        }
    }

    match args.command {
        Command::Compute if args.inputs.is_empty() || args.out.is_some() => {
            Err(CliError::Usage(usage()))
        }
        Command::Prepare if args.inputs.len() > 1 || args.out_dir.is_some() || args.pretty => {
            Err(CliError::Usage(usage()))
        }
        _ => Ok(args),
    }
}

fn read_input(input: Option<&str>) -> Result<String, CliError> {
    match input {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
        Some(path) => Ok(std::fs::read_to_string(path)?),
    }
}

fn write_json(value: &impl Serialize, pretty: bool) -> Result<(), CliError> {
    if pretty {
        serde_json::to_writer_pretty(std::io::stdout().lock(), value)?;
    } else {
        serde_json::to_writer(std::io::stdout().lock(), value)?;
    }
    println!();
    Ok(())
}

fn write_text(text: &str, out: Option<&str>) -> Result<(), CliError> {
    match out {
        None => {
            print!("{text}");
            Ok(())
        }
        Some(path) => {
            std::fs::write(path, text)?;
            Ok(())
        }
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: Args) -> Result<(), CliError> {
    let config = match args.config.as_deref() {
        Some(path) => DeltaConfig::from_path(path)?,
        None => DeltaConfig::default(),
    };
    let computer = DeltaComputer::new(config)?;

    match args.command {
        Command::Prepare => {
            let input = args.inputs.first().map(String::as_str);
            let text = read_input(input)?;
            let svg = computer.prepare(&text)?;
            write_text(&svg, args.out.as_deref())
        }
        Command::Compute => {
            let frames = args
                .inputs
                .iter()
                .map(|path| read_input(Some(path.as_str())))
                .collect::<Result<Vec<_>, _>>()?;
            let set = computer.compute(&frames)?;
            if set.fallback_count() > 0 {
                tracing::info!(
                    fallbacks = set.fallback_count(),
                    frames = set.frame_count(),
                    "some frames ship as full SVG"
                );
            }
            match args.out_dir.as_deref() {
                Some(dir) => {
                    set.write_to_dir(dir)?;
                    write_json(&set.metadata(), args.pretty)
                }
                None => write_json(&set, args.pretty),
            }
        }
    }
}

fn main() {
    init_tracing();

    let args = match parse_args(&std::env::args().collect::<Vec<_>>()) {
        Ok(v) => v,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = run(args) {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
