use std::path::PathBuf;
use std::process;
use std::thread;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use docxide_split::config::{DEFAULT_HEADING_LEVEL, DEFAULT_MAX_TITLE_LEN};
use docxide_split::{
    CancelToken, Error, OutputMode, SplitEvent, SplitOptions, SplitOutcome, Splitter,
};

/// Split a DOCX document into one document per heading.
#[derive(Parser)]
#[command(name = "docxide-split")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Document to split
    input: PathBuf,

    /// Document whose styles and page setup the output documents use
    #[arg(short, long)]
    template: Option<PathBuf>,

    /// Heading level that starts a new section
    #[arg(short, long, default_value_t = DEFAULT_HEADING_LEVEL)]
    level: u32,

    /// Output directory (default: the input's directory)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write one .docx per section instead of a single archive
    #[arg(long)]
    files: bool,

    /// Longest file name stem, in characters
    #[arg(long, default_value_t = DEFAULT_MAX_TITLE_LEN)]
    max_title_len: usize,

    /// List the sections that would be written and exit
    #[arg(long)]
    dry_run: bool,
}

fn progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(100);
    let style = ProgressStyle::with_template("{bar:40.cyan/blue} {pos:>3}% {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb
}

/// Turns the first Ctrl-C into a cancel request. The split stops at its next
/// checkpoint and cleans up its scratch archive before reporting.
fn cancel_on_ctrl_c(cancel: CancelToken) {
    let spawned = thread::Builder::new()
        .name("ctrl-c".into())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    log::warn!("Ctrl-C handling unavailable: {e}");
                    return;
                }
            };
            if runtime.block_on(tokio::signal::ctrl_c()).is_ok() {
                log::info!("Received Ctrl-C, canceling");
                cancel.cancel();
            }
        });
    if let Err(e) = spawned {
        log::warn!("Ctrl-C handling unavailable: {e}");
    }
}

fn run(cli: Cli) -> Result<(), Error> {
    let options = SplitOptions {
        heading_level: cli.level,
        output: if cli.files {
            OutputMode::Files
        } else {
            OutputMode::Archive
        },
        output_dir: cli.output,
        max_title_len: cli.max_title_len,
    };
    let splitter = Splitter::open(&cli.input, cli.template.as_deref())?;

    if cli.dry_run {
        let Some(plan) = splitter.plan(&options)? else {
            return Ok(());
        };
        for section in &plan {
            println!(
                "{:>6}  {:>4} paragraphs  {}",
                section.start_index, section.paragraphs, section.safe_title
            );
        }
        println!("{} sections at heading level {}", plan.len(), cli.level);
        return Ok(());
    }

    let pb = progress_bar();
    let handle = splitter.spawn(options)?;
    cancel_on_ctrl_c(handle.cancel_token());
    let outcome = handle.wait(|event| match event {
        SplitEvent::Progress(p) => pb.set_position(u64::from(*p)),
        SplitEvent::Status(message) if message.starts_with("Processed section") => {
            pb.set_message(message.clone())
        }
        SplitEvent::Status(message) => pb.println(message),
        SplitEvent::Finished(_) => {}
    });
    pb.finish_and_clear();

    match outcome? {
        SplitOutcome::Archive(path) => println!("Created archive at: {}", path.display()),
        SplitOutcome::Directory(dir) => println!("Saved documents to: {}", dir.display()),
        SplitOutcome::Canceled => println!("Canceled"),
        SplitOutcome::NoSections => {
            println!("No sections found at heading level {}", cli.level)
        }
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
