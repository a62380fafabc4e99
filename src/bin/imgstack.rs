use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::Context as _;
use clap::{ArgGroup, Parser};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const USAGE_EXAMPLES: &str = r"Examples:
  imgstack --d=.\source --o=result.png
  imgstack --d=.\source
  imgstack --f=.\source\01.jpg;.\source\02.jpg --o=result.jpg
  imgstack --s=.\source\*.jpg --o=result.jpg --line";

#[derive(Parser, Debug)]
#[command(name = "imgstack", version, about = "Stack images vertically into one image.")]
#[command(after_help = USAGE_EXAMPLES)]
#[command(group(ArgGroup::new("input").required(true).args(["dir", "files", "search"])))]
struct Cli {
    /// Stack every supported image in a directory (non-recursive).
    #[arg(long = "d", value_name = "DIR")]
    dir: Option<PathBuf>,

    /// Stack an explicit `;`-separated list of files; missing entries are skipped.
    #[arg(long = "f", value_name = "PATHS")]
    files: Option<String>,

    /// Stack files in a directory matching a wildcard, e.g. `.\source\*.jpg`.
    #[arg(long = "s", value_name = "DIR\\PATTERN")]
    search: Option<String>,

    /// Output path; the extension selects the encoder.
    #[arg(long = "o", value_name = "PATH", default_value = imgstack::encode::DEFAULT_OUTPUT)]
    out: PathBuf,

    /// Draw a dashed separator between adjacent images.
    #[arg(short = 'l', long = "line", overrides_with = "no_line")]
    line: bool,

    /// Do not draw separators (default).
    #[arg(long = "no-line", overrides_with = "line")]
    no_line: bool,

    /// Canvas memory ceiling in bytes (`K`/`M`/`G` suffixes allowed).
    /// Overrides `IMGSTACK_MEMORY_CEILING`.
    #[arg(long = "max-memory", value_name = "BYTES", value_parser = parse_memory)]
    max_memory: Option<u64>,
}

impl Cli {
    fn selector(&self) -> anyhow::Result<imgstack::InputSelector> {
        match (&self.dir, &self.files, &self.search) {
            (Some(d), None, None) => Ok(imgstack::InputSelector::Dir(d.clone())),
            (None, Some(f), None) => Ok(imgstack::InputSelector::List(f.clone())),
            (None, None, Some(s)) => Ok(imgstack::InputSelector::Pattern(s.clone())),
            _ => Err(
                imgstack::StackError::argument("exactly one of --d, --f, --s is required").into(),
            ),
        }
    }
}

fn parse_memory(raw: &str) -> Result<u64, String> {
    imgstack::config::parse_ceiling(raw)
        .ok_or_else(|| format!("'{raw}' is not a positive byte count"))
}

// `-nl` and `/?` predate the long-flag spellings and are kept as aliases.
fn normalize_args(args: impl IntoIterator<Item = OsString>) -> Vec<OsString> {
    args.into_iter()
        .map(|a| match a.to_str() {
            Some("-nl") => OsString::from("--no-line"),
            Some("/?") => OsString::from("--help"),
            _ => a,
        })
        .collect()
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> ExitCode {
    init_tracing();

    let cli = match Cli::try_parse_from(normalize_args(std::env::args_os())) {
        Ok(cli) => cli,
        Err(e) => {
            use clap::error::ErrorKind;
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                    print!("{}", e.render());
                    ExitCode::SUCCESS
                }
                _ => {
                    println!("{}", e.render());
                    ExitCode::from(2)
                }
            };
        }
    };

    match run(&cli) {
        Ok(summary) => {
            summary.print();
            ExitCode::SUCCESS
        }
        Err(err) => {
            println!("error: {err:#}");
            if let Some(imgstack::StackError::Argument(_)) =
                err.downcast_ref::<imgstack::StackError>()
            {
                println!();
                println!("{USAGE_EXAMPLES}");
            }
            ExitCode::FAILURE
        }
    }
}

struct Summary {
    inputs: usize,
    width: u32,
    height: u32,
    out: PathBuf,
    canvas_bytes: usize,
}

impl Summary {
    fn print(&self) {
        println!(
            "merged {} image(s) into {}x{} -> {}",
            self.inputs,
            self.width,
            self.height,
            self.out.display()
        );
        println!(
            "canvas memory used: {:.1} MiB ({} bytes)",
            self.canvas_bytes as f64 / (1024.0 * 1024.0),
            self.canvas_bytes
        );
    }
}

fn run(cli: &Cli) -> anyhow::Result<Summary> {
    let target = imgstack::OutputTarget::from_path(&cli.out)?;
    if target.fell_back_from_webp {
        println!(
            "note: webp output is not supported, writing png to '{}'",
            target.path.display()
        );
    }

    let files = cli.selector()?.resolve()?;
    if files.is_empty() {
        return Err(imgstack::StackError::argument("no input images found").into());
    }

    let mut config = imgstack::MergeConfig::from_env().with_separator(cli.line && !cli.no_line);
    if let Some(bytes) = cli.max_memory {
        config = config.with_memory_ceiling(bytes);
    }

    let cache = imgstack::ConversionCache::new(config.memory_ceiling_bytes)
        .context("create conversion cache")?;
    let merged = {
        let mut report = |ev: imgstack::ProgressEvent| report_progress(&files, ev);
        imgstack::merge(&files, &config, &cache, Some(&mut report))
    };
    if let Err(e) = cache.close() {
        tracing::warn!(error = %e, "failed to remove conversion cache");
    }
    let canvas = merged?;

    imgstack::write_canvas(&canvas, &target)
        .with_context(|| format!("write output '{}'", target.path.display()))?;

    Ok(Summary {
        inputs: files.len(),
        width: canvas.width(),
        height: canvas.height(),
        out: target.path,
        canvas_bytes: canvas.byte_len(),
    })
}

fn report_progress(files: &[PathBuf], ev: imgstack::ProgressEvent) {
    match ev.step {
        imgstack::ProgressEvent::PROBE_STARTED => {
            println!("reading sizes of {} images...", ev.total)
        }
        imgstack::ProgressEvent::PROBE_DONE => println!("sizes read, compositing..."),
        _ => {
            if let Some(path) = ev.composited_index().and_then(|i| files.get(i)) {
                println!("[{}/{}] {}", ev.step - 1, ev.total, display_name(path));
            }
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
