//! pixcon - render text through a pixel console
//!
//! Reads standard input, writes it into a console session bound to an
//! in-memory window, then shows the result.
//!
//! ```text
//! ls -l | pixcon                  # draw, then show the pixels on this terminal
//! ls -l | pixcon --text           # print the console's text grid instead
//! pixcon --truncate < notes.txt   # cut long lines instead of wrapping
//! ```

use std::env;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use pixcon::ui::{BindingKind, Font8x8, Framebuffer, Presenter, Surface, Window};
use pixcon::{ConsoleConfig, Session, Size, WrapMode};

/// Frame decoration of the demo window in framed and toolbar modes
const FRAME_BORDER: u32 = 2;
const TOOLBAR_HEIGHT: u32 = 16;

/// Command line options
struct Options {
    /// Configuration file (default: ~/.pixcon/config.toml if present)
    config: Option<PathBuf>,
    /// Print text instead of pixels
    text: bool,
    /// Wrap-mode override
    wrap: Option<WrapMode>,
    /// Console size override
    size: Option<Size>,
    /// Which part of the demo window the console binds to
    binding: BindingKind,
    /// Presenter downsampling
    step: u32,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            config: None,
            text: false,
            wrap: None,
            size: None,
            binding: BindingKind::Raw,
            step: 1,
        }
    }
}

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_help() {
    eprintln!("pixcon {} - text console on a pixel surface", VERSION);
    eprintln!();
    eprintln!("Usage: pixcon [OPTIONS] < input");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -c, --config <FILE>   Configuration file (TOML)");
    eprintln!("  -t, --text            Print the text grid instead of pixels");
    eprintln!("      --wrap            Wrap long lines (default)");
    eprintln!("      --truncate        Drop characters past the right edge");
    eprintln!("  -s, --size <WxH>      Console size in pixels");
    eprintln!("      --framed          Bind to the client area of a framed window");
    eprintln!("      --toolbar         Bind to the toolbar of a framed window");
    eprintln!("      --step <N>        Show every Nth pixel");
    eprintln!("  -v, --version         Show version");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("Configuration: ~/.pixcon/config.toml");
    eprintln!("Log file:      ~/.pixcon/pixcon.log (filter with RUST_LOG)");
}

fn parse_size(value: &str) -> Result<Size, String> {
    let (w, h) = value
        .split_once('x')
        .ok_or_else(|| format!("Invalid size: {} (expected WxH)", value))?;
    let width = w.parse().map_err(|_| format!("Invalid width: {}", w))?;
    let height = h.parse().map_err(|_| format!("Invalid height: {}", h))?;
    Ok(Size::new(width, height))
}

fn parse_args() -> Result<Options, String> {
    let args: Vec<String> = env::args().collect();
    let mut options = Options::default();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-v" | "--version" => {
                eprintln!("pixcon {}", VERSION);
                std::process::exit(0);
            }
            "-c" | "--config" => {
                i += 1;
                let path = args.get(i).ok_or("Missing config file argument")?;
                options.config = Some(PathBuf::from(path));
            }
            "-t" | "--text" => options.text = true,
            "--wrap" => options.wrap = Some(WrapMode::Wrap),
            "--truncate" => options.wrap = Some(WrapMode::Truncate),
            "-s" | "--size" => {
                i += 1;
                let value = args.get(i).ok_or("Missing size argument")?;
                options.size = Some(parse_size(value)?);
            }
            "--framed" => options.binding = BindingKind::Framed,
            "--toolbar" => options.binding = BindingKind::Toolbar,
            "--step" => {
                i += 1;
                let value = args.get(i).ok_or("Missing step argument")?;
                options.step = value
                    .parse()
                    .map_err(|_| format!("Invalid step: {}", value))?;
            }
            arg => {
                return Err(format!("Unknown argument: {}. Use -h for help.", arg));
            }
        }
        i += 1;
    }

    Ok(options)
}

fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME")
        .or_else(|| env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}

fn init_logging() {
    let log_path = home_dir()
        .map(|h| h.join(".pixcon").join("pixcon.log"))
        .unwrap_or_else(|| PathBuf::from("pixcon.log"));

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok();

    if let Some(file) = log_file {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

fn load_config(options: &Options) -> anyhow::Result<ConsoleConfig> {
    let mut config = match &options.config {
        Some(path) => ConsoleConfig::load(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => home_dir()
            .map(|h| ConsoleConfig::load_or_default(&h.join(".pixcon").join("config.toml")))
            .unwrap_or_default(),
    };
    if let Some(wrap) = options.wrap {
        config.wrap = wrap;
    }
    if let Some(size) = options.size {
        config.size = size;
    }
    config.validate()?;
    Ok(config)
}

/// Build a demo window whose chosen region is exactly the console size
fn make_window(binding: BindingKind, size: Size) -> Framebuffer {
    match binding {
        BindingKind::Raw => Framebuffer::new(size.width, size.height),
        BindingKind::Framed => Framebuffer::new(
            size.width + 2 * FRAME_BORDER,
            size.height + 2 * FRAME_BORDER + TOOLBAR_HEIGHT,
        )
        .with_frame(FRAME_BORDER, TOOLBAR_HEIGHT),
        BindingKind::Toolbar => Framebuffer::new(
            size.width + 2 * FRAME_BORDER,
            2 * FRAME_BORDER + TOOLBAR_HEIGHT,
        )
        .with_frame(FRAME_BORDER, TOOLBAR_HEIGHT),
    }
}

fn run(options: Options) -> anyhow::Result<()> {
    let config = load_config(&options)?;

    let window = Arc::new(make_window(options.binding, config.size));
    let surface = match options.binding {
        BindingKind::Raw => Surface::raw(window.clone()),
        BindingKind::Framed => Surface::framed(window.clone()),
        BindingKind::Toolbar => Surface::toolbar(window.clone())?,
    };

    let session = Session::create(surface, Arc::new(Font8x8), &config)?;
    session.handle_repaint(window.bounds(), false)?;

    let mut input = io::stdin().lock();
    let mut buffer = [0u8; 4096];
    let mut total = 0;
    loop {
        let n = input.read(&mut buffer).context("Failed to read stdin")?;
        if n == 0 {
            break;
        }
        total += session.write(&buffer[..n])?;
    }
    info!("Wrote {} bytes, cache {:?}", total, session.cache().stats());

    let mut stdout = io::stdout().lock();
    if options.text {
        let screen = session.snapshot();
        for row in 0..screen.rows.len() {
            writeln!(stdout, "{}", screen.row_text(row))?;
        }
        stdout.flush()?;
    } else {
        Presenter::new(options.step).present(&mut stdout, &window)?;
    }

    session.destroy();
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let options = match parse_args() {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    init_logging();
    info!("pixcon {} starting...", VERSION);

    run(options)
}
