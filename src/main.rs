//! Application entry point: headless translate toolbar.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Create the [`tokio`] runtime (multi-thread, 2 workers).
//! 4. Build the LLM backend, dictionary client and TTS client from config.
//! 5. Spawn the session controller and the window size planner.
//! 6. Read stdin: plain lines are queries, `:`-prefixed lines are toolbar
//!    actions.
//!
//! The "surface" is the terminal: [`ConsoleHost`] prints the session on
//! every render and reports the printed height to the planner.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use translate_toolbar::{
    audio::{LingvaTts, Notifier, PlaybackController, RodioSink},
    backend::{LlmBackend, TranslateBackend},
    clipboard::{CopyAction, SystemClipboard},
    config::{AppConfig, AppPaths},
    dictionary::{entry_key, DictionaryEnrichment, FreeDictionaryClient},
    history::{HistoryStore, RecordKind},
    session::{self, Mode, Session, SessionController, SharedSession},
    surface::{ConfigPinStore, HostError, PinState, SurfaceHost, WindowSizePlanner},
};

/// Pixel height of one printed line, used to fake a layout measurement.
const LINE_HEIGHT: u32 = 20;

const HELP: &str = "\
commands:
  <text>            translate / explain <text>
  :translate        switch to translate mode
  :explain          switch to explain mode
  :template <id>    pick an explain template
  :pin              toggle always-on-top
  :copy             copy the result
  :speak            pronounce the result (language from its script)
  :speak-word       pronounce the query in English
  :speak-result     pronounce the result in Chinese
  :speak-example <m>-<d>
                    pronounce a dictionary example, e.g. :speak-example 0-0
  :history          list today's records for the current mode
  :help             show this help
  :quit             exit";

// ---------------------------------------------------------------------------
// Console surface
// ---------------------------------------------------------------------------

/// Renders the session to stdout in place of a toolbar window.
struct ConsoleHost {
    state: SharedSession,
}

impl ConsoleHost {
    fn render(session: &Session) -> String {
        let mut out = String::new();

        if let Some(details) = &session.word_details {
            out.push_str(session.query_text.trim());
            if let Some(phonetic) = &details.phonetic {
                out.push_str(&format!("  {phonetic}"));
            }
            out.push('\n');

            for (mi, meaning) in details.meanings.iter().enumerate() {
                out.push_str(&format!("  [{}]\n", meaning.part_of_speech));
                for (di, def) in meaning.definitions.iter().enumerate() {
                    let key = entry_key(mi, di);
                    out.push_str(&format!("   {}. {}\n", di + 1, def.definition));
                    let translated = session
                        .translated_definitions
                        .get(&key)
                        .map(String::as_str)
                        .unwrap_or("…");
                    out.push_str(&format!("      {translated}\n"));
                    if let Some(example) = &def.example {
                        out.push_str(&format!("      e.g. {example}\n"));
                        if let Some(t) = session.translated_examples.get(&key) {
                            out.push_str(&format!("           {t}\n"));
                        }
                    }
                }
            }
        }

        let text = session.display_text();
        if !text.is_empty() {
            out.push_str(text);
            out.push('\n');
        }
        if !session.stream.meanings().is_empty() {
            out.push_str(session.stream.meanings());
            out.push('\n');
        }
        out
    }
}

#[async_trait]
impl SurfaceHost for ConsoleHost {
    async fn show(&self, height: u32) -> Result<(), HostError> {
        log::debug!("surface: show {height}px");
        Ok(())
    }

    async fn hide(&self) -> Result<(), HostError> {
        log::debug!("surface: hide");
        Ok(())
    }

    async fn set_always_on_top(&self, on_top: bool) -> Result<(), HostError> {
        println!("[always on top: {on_top}]");
        Ok(())
    }

    async fn wait_for_render(&self) {
        let rendered = {
            let st = self.state.lock().unwrap();
            Self::render(&st)
        };
        if !rendered.is_empty() {
            println!("────────\n{rendered}────────");
        }
    }

    async fn wait_for_layout(&self) {
        tokio::task::yield_now().await;
    }

    async fn content_height(&self) -> Result<u32, HostError> {
        let st = self.state.lock().unwrap();
        let lines = Self::render(&st).lines().count() as u32;
        Ok(lines.max(1) * LINE_HEIGHT)
    }
}

// ---------------------------------------------------------------------------
// Console helpers
// ---------------------------------------------------------------------------

struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, message: &str) {
        eprintln!("! {message}");
    }
}

fn print_history(history: &HistoryStore, mode: Mode) {
    let kind = match mode {
        Mode::Translate => RecordKind::Translate,
        Mode::Explain => RecordKind::Explain,
    };
    if !history.is_enabled() {
        println!("history is disabled, set [history] enabled = true");
        return;
    }
    match history.load_day(kind, chrono::Local::now().date_naive()) {
        Ok(records) if records.is_empty() => println!("no {} history today", mode.as_str()),
        Ok(records) => {
            for r in records {
                println!("{}  {}  →  {}", r.timestamp.format("%H:%M:%S"), r.source_text, r.result);
            }
        }
        Err(e) => eprintln!("! {e}"),
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("translate toolbar starting up");

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });

    // 3. Tokio runtime
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    let result = rt.block_on(run(config));
    rt.shutdown_timeout(Duration::from_secs(1));
    result
}

async fn run(config: AppConfig) -> anyhow::Result<()> {
    // 4. Collaborators
    let (handle, inbox) = session::channel(config.toolbar.event_capacity);

    let backend: Arc<dyn TranslateBackend> = Arc::new(LlmBackend::from_config(&config, &handle));
    let dictionary = Arc::new(FreeDictionaryClient::from_config(&config.dictionary));
    let enrichment = Arc::new(DictionaryEnrichment::new(
        dictionary,
        Arc::clone(&backend),
        &config.translate,
    ));

    // 5. Controller + planner
    let controller =
        SessionController::new(&config, Arc::clone(&backend), enrichment, &handle, inbox);
    let state = controller.state();
    let layout = controller.subscribe_layout();

    let mut modes = controller.subscribe_mode();
    tokio::spawn(async move {
        while let Ok(mode) = modes.recv().await {
            println!("[mode: {}]", mode.as_str());
        }
    });

    let host = Arc::new(ConsoleHost {
        state: Arc::clone(&state),
    });
    let planner = WindowSizePlanner::new(host.clone(), &config.toolbar);

    let controller_task = tokio::spawn(controller.run());
    tokio::spawn(planner.run(layout));

    let mut pin = PinState::load(host.clone(), Arc::new(ConfigPinStore::default_location())).await;
    let copy = CopyAction::new(
        Arc::new(SystemClipboard),
        Duration::from_millis(config.toolbar.copy_reset_ms),
    );
    let playback = PlaybackController::new(
        Arc::new(LingvaTts::from_config(&config.tts)),
        Arc::new(RodioSink::spawn()?),
        Arc::new(ConsoleNotifier),
        Duration::from_millis(config.toolbar.playing_reset_ms),
    );

    let history = HistoryStore::from_config(&config.history);

    log::info!("settings: {}", AppPaths::new().settings_file.display());
    println!("{HELP}");

    // 6. Input loop
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (command, arg) = line.split_once(' ').unwrap_or((line, ""));
        match command {
            ":quit" | ":q" => break,
            ":help" => println!("{HELP}"),
            ":translate" => handle.set_mode(Mode::Translate).await?,
            ":explain" => handle.set_mode(Mode::Explain).await?,
            ":template" if !arg.trim().is_empty() => handle.set_template(arg.trim()).await?,
            ":pin" => {
                if let Err(e) = pin.toggle().await {
                    eprintln!("! {e}");
                }
            }
            ":copy" => match copy.copy(&state).await {
                Ok(true) => println!("[copied]"),
                Ok(false) => println!("[nothing to copy]"),
                Err(e) => eprintln!("! {e}"),
            },
            // Playback failures are already reported through the notifier.
            ":speak" => {
                let text = state.lock().unwrap().display_text().to_string();
                let _ = playback.speak(&text).await;
            }
            ":speak-word" => {
                let text = state.lock().unwrap().query_text.trim().to_string();
                let _ = playback.speak_query(&text).await;
            }
            ":speak-result" => {
                let text = state.lock().unwrap().display_text().to_string();
                let _ = playback.speak_result(&text).await;
            }
            ":speak-example" => {
                let example = {
                    let st = state.lock().unwrap();
                    st.word_details
                        .as_ref()
                        .and_then(|d| d.definition(arg.trim()))
                        .and_then(|def| def.example.clone())
                };
                match example {
                    Some(example) => playback.speak_example(&example).await,
                    None => println!("no example at {:?}", arg.trim()),
                }
            }
            ":history" => {
                let mode = state.lock().unwrap().mode;
                print_history(&history, mode);
            }
            _ if command.starts_with(':') => println!("unknown command, try :help"),
            _ => {
                handle.submit(line).await?;
            }
        }
    }

    drop(handle);
    if tokio::time::timeout(Duration::from_secs(1), controller_task)
        .await
        .is_err()
    {
        log::debug!("requests still in flight at exit");
    }

    log::info!("translate toolbar shutting down");
    Ok(())
}
