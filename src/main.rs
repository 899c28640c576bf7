//! ipfc - IPF help compiler

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use ipfc::util::decode_text;
use ipfc::{CompileOptions, FileOpener, IpfExtHeader, IpfHeader, OutputKind, Scanner};

#[derive(Parser)]
#[command(name = "ipfc")]
#[command(version, about = "IPF help compiler", long_about = None)]
#[command(after_help = "EXAMPLES:
    ipfc guide.ipf              Compile to guide.hlp
    ipfc -i -s guide.ipf        Compile a searchable guide.inf
    ipfc --info guide.hlp       Show the header of a compiled file

ENVIRONMENT:
    IPFCIMBED      Directories searched for .im files
    IPFCARTWORK    Directories searched for :artwork images
    LANG           Default locale")]
struct Cli {
    /// IPF source file, or a compiled file with --info
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output file (defaults to INPUT with .hlp or .inf)
    #[arg(value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Produce an INF book instead of a help file
    #[arg(short, long)]
    inf: bool,

    /// Build the full-text search section
    #[arg(short, long)]
    search: bool,

    /// Locale, such as en_US or de_DE
    #[arg(short, long, value_name = "LOCALE")]
    locale: Option<String>,

    /// Print the header of a compiled file as JSON
    #[arg(long)]
    info: bool,

    /// Only report errors
    #[arg(short, long)]
    quiet: bool,

    /// Report progress
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    let result = if cli.info {
        show_info(&cli.input)
    } else {
        compile(&cli)
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(cli: &Cli) {
    let default = if cli.quiet {
        "error"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn compile(cli: &Cli) -> Result<(), String> {
    let mut options = CompileOptions::from_env().with_searchable(cli.search);
    if cli.inf {
        options = options.with_output_kind(OutputKind::Inf);
    }
    if let Some(locale) = &cli.locale {
        options = options.with_locale(locale.as_str());
    }
    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| cli.input.with_extension(options.output_kind.extension()));

    let bytes = fs::read(&cli.input).map_err(|e| format!("{}: {e}", cli.input.display()))?;
    let text = decode_text(&bytes, None).into_owned();
    let source = Scanner::new(cli.input.display().to_string(), text);

    let file = File::create(&output).map_err(|e| format!("{}: {e}", output.display()))?;
    let mut out = BufWriter::new(file);
    let doc = match ipfc::compile(Box::new(source), &FileOpener, options, &mut out) {
        Ok(doc) => doc,
        Err(e) => {
            drop(out);
            // a partial file is never valid
            let _ = fs::remove_file(&output);
            return Err(e.to_string());
        }
    };

    tracing::info!(
        "{} -> {}: {} pages, {} words, {} diagnostics",
        cli.input.display(),
        output.display(),
        doc.pages().len(),
        doc.dictionary().size(),
        doc.diagnostics().len()
    );
    Ok(())
}

#[derive(Serialize)]
struct Info<'a> {
    file: &'a Path,
    header: IpfHeader,
    extended: Option<IpfExtHeader>,
}

fn show_info(path: &Path) -> Result<(), String> {
    let bytes = fs::read(path).map_err(|e| format!("{}: {e}", path.display()))?;
    let header = IpfHeader::parse(&bytes).map_err(|e| e.to_string())?;
    let extended = bytes
        .get(header.ext_offset as usize..)
        .filter(|_| header.ext_offset != 0)
        .map(IpfExtHeader::parse)
        .transpose()
        .map_err(|e| e.to_string())?;
    let info = Info {
        file: path,
        header,
        extended,
    };
    let json = serde_json::to_string_pretty(&info).map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(())
}
