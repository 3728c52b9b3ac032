// Copyright (C) 2025  Tom Waddington
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use std::cell::RefCell;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use codetyper::actions::{set_instant_mode, task_list};
use codetyper::block::type_indented_block;
use codetyper::parser::parse_script;
use codetyper::playback::PlaybackEngine;
use codetyper::terminal::TerminalView;
use codetyper::{Action, Callbacks, Capabilities, CodeTyper, TyperConfig};

#[derive(Parser, Debug)]
#[command(name = "codetyper", version, about = "Replay code being typed in the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Milliseconds between keystrokes
    #[arg(long, global = true)]
    speed: Option<u64>,

    /// Keystroke jitter as a fraction of the speed (0.0 to 1.0)
    #[arg(long, global = true)]
    jitter: Option<f64>,

    /// Skip all animation and show the end result
    #[arg(long, global = true)]
    instant: bool,

    /// Print the flattened action list instead of playing it
    #[arg(long, global = true)]
    dump: bool,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play a codetyper script
    Play { script: PathBuf },
    /// Type out a source file, nested blocks shell first
    Type {
        source: PathBuf,
        /// Extra indentation levels for every line
        #[arg(long, default_value_t = 0)]
        level: usize,
        /// One indentation unit of the source
        #[arg(long, default_value = "  ")]
        indent: String,
    },
}

fn init_logging(path: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let result = match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };
    result.map_err(|e| anyhow!(e))
}

fn renderer(view: Rc<RefCell<TerminalView>>) -> impl FnMut(&str) {
    move |text: &str| {
        if let Err(e) = view.borrow_mut().render(text) {
            warn!(error = %e, "render failed");
        }
    }
}

fn load_actions(command: &Commands) -> Result<Vec<Action>> {
    match command {
        Commands::Play { script } => {
            let source = fs::read_to_string(script)
                .with_context(|| format!("Failed to read script {}", script.display()))?;
            let script = parse_script(&source).map_err(|e| anyhow!(e))?;
            Ok(script.actions)
        }
        Commands::Type {
            source,
            level,
            indent,
        } => {
            let text = fs::read_to_string(source)
                .with_context(|| format!("Failed to read source {}", source.display()))?;
            Ok(type_indented_block(&text, *level, indent))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log.as_deref())?;

    let mut actions = load_actions(&cli.command)?;
    if cli.instant {
        actions.insert(0, set_instant_mode(true));
    }

    if cli.dump {
        for (i, action) in task_list(actions).iter().enumerate() {
            println!("{:4} {:?}", i, action);
        }
        return Ok(());
    }

    let mut config = TyperConfig::default();
    if let Some(ms) = cli.speed {
        config.keystroke = Duration::from_millis(ms);
    }
    if let Some(jitter) = cli.jitter {
        config.jitter = jitter.clamp(0.0, 1.0);
    }

    let view = Rc::new(RefCell::new(TerminalView::new()?));

    let scroll_view = Rc::clone(&view);
    let set_view = Rc::clone(&view);
    let capabilities = Capabilities::new()
        .with_get_scroll_y(move || scroll_view.borrow().scroll_y())
        .with_set_scroll_y(move |y| {
            if let Err(e) = set_view.borrow_mut().set_scroll_y(y) {
                warn!(error = %e, "scroll failed");
            }
        });
    let callbacks = Callbacks::new()
        .on_step_complete(renderer(Rc::clone(&view)))
        .on_task_complete(renderer(Rc::clone(&view)));

    let mut typer = CodeTyper::new(actions)
        .with_config(config)
        .with_capabilities(capabilities)
        .with_callbacks(callbacks);

    info!(tasks = typer.tasks().len(), "starting playback");
    let mut engine = PlaybackEngine::with_interrupt()?;
    let result = engine.execute(&mut typer).await;

    // Restore the terminal before printing anything
    drop(typer);
    drop(view);

    let text = result?;
    println!("{}", text);
    Ok(())
}
