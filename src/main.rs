use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use tracing_subscriber::EnvFilter;

use vimcode_modes::core::editor::UserInterfaceService;
use vimcode_modes::core::register::LAST_INSERT;
use vimcode_modes::{Engine, Settings};

const USAGE: &str = "usage: vcm [--settings PATH] [--set OPTION]... [--text TEXT] [--cursor N] KEYS...";

struct Args {
    settings: Option<PathBuf>,
    set: Vec<String>,
    text: String,
    cursor: usize,
    keys: Vec<String>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        settings: None,
        set: Vec::new(),
        text: String::new(),
        cursor: 0,
        keys: Vec::new(),
    };
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| iter.next().ok_or_else(|| anyhow!("{flag} needs a value"));
        match arg.as_str() {
            "--settings" => args.settings = Some(PathBuf::from(value("--settings")?)),
            "--set" => args.set.push(value("--set")?),
            "--text" => args.text = value("--text")?,
            "--cursor" => {
                let n = value("--cursor")?;
                args.cursor = n.parse().with_context(|| format!("bad cursor offset {n:?}"))?;
            }
            "-h" | "--help" => {
                println!("{USAGE}");
                std::process::exit(0);
            }
            _ if arg.starts_with("--") => bail!("unknown option {arg}\n{USAGE}"),
            _ => args.keys.push(arg),
        }
    }
    Ok(args)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args()?;
    let mut settings = match &args.settings {
        Some(path) => Settings::load_from(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => Settings::load(),
    };
    for option in &args.set {
        settings
            .parse_set_option(option)
            .map_err(|e| anyhow!("--set {option}: {e}"))?;
    }

    let mut engine = Engine::with_text(&args.text, settings);
    engine.editor_mut().move_to(args.cursor, true);
    for keys in &args.keys {
        engine
            .feed_keys(keys)
            .with_context(|| format!("bad key notation {keys:?}"))?;
    }
    engine.flush_pending_keys();

    println!("{}", engine.text());
    println!("cursor: {}", engine.cursor_offset());
    println!("mode: {}", engine.mode_name());
    if let Ok(last) = engine.registers().get(LAST_INSERT) {
        println!("last insert: {:?}", last.text);
    }
    if let Some(error) = engine.status().error_message() {
        println!("error: {error}");
    }
    Ok(())
}
