use std::path::PathBuf;

use anyhow::Result;
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind};
use futures_util::StreamExt;
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time;

use crate::error::IngestError;
use crate::ingest::{self, SourceDocument};
use crate::logging::{log, obj, v_str, Domain, Level};
use crate::state::{AppState, InputMode};
use crate::tui;

type LoadResult = (String, Result<SourceDocument, IngestError>);

enum Flow {
    Continue,
    Quit,
}

/// Runs the terminal UI until the user quits. File reads run as background
/// tasks; their results are merged on this loop, one at a time.
pub async fn run(mut state: AppState) -> Result<AppState> {
    let mut terminal = tui::init()?;
    let (load_tx, mut load_rx) = mpsc::channel::<LoadResult>(1);

    log(
        Level::Info,
        Domain::Ui,
        "start",
        obj(&[("year", json!(state.year)), ("robots", json!(state.calendar.robots().len()))]),
    );

    let app_result = async {
        let mut tick = time::interval(time::Duration::from_millis(state.config.tick_ms));
        let mut events = EventStream::new();

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    terminal.draw(|f| tui::ui(f, &state))?;
                }

                Some(Ok(event)) = events.next() => {
                    if let Event::Key(key) = event {
                        if key.kind != KeyEventKind::Press {
                            continue;
                        }
                        let flow = match state.input_mode {
                            InputMode::Normal => handle_normal_key(&mut state, key),
                            InputMode::Editing => handle_editing_key(&mut state, key, &load_tx),
                        };
                        if let Flow::Quit = flow {
                            break;
                        }
                        terminal.draw(|f| tui::ui(f, &state))?;
                    }
                }

                Some((source, result)) = load_rx.recv() => {
                    state.finish_load(&source, result);
                    terminal.draw(|f| tui::ui(f, &state))?;
                }
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    tui::restore()?;
    log(Level::Info, Domain::Ui, "stop", obj(&[]));

    app_result.map(|_| state)
}

fn handle_normal_key(state: &mut AppState, key: KeyEvent) -> Flow {
    match key.code {
        KeyCode::Char('q') => return Flow::Quit,
        KeyCode::Left | KeyCode::Char('h') => state.move_cursor(-1),
        KeyCode::Right | KeyCode::Char('l') => state.move_cursor(1),
        KeyCode::Up | KeyCode::Char('k') => state.move_cursor(-7),
        KeyCode::Down | KeyCode::Char('j') => state.move_cursor(7),
        KeyCode::Char('n') => state.jump_flagged(true),
        KeyCode::Char('p') => state.jump_flagged(false),
        KeyCode::Enter | KeyCode::Char(' ') => state.select_cursor_day(),
        KeyCode::Esc => state.clear_day(),
        KeyCode::Char('r') => state.cycle_robot(1),
        KeyCode::Char('R') => state.cycle_robot(-1),
        KeyCode::Char('y') => state.change_year(-1),
        KeyCode::Char('Y') => state.change_year(1),
        KeyCode::Char('m') => state.cycle_month(1),
        KeyCode::Char('M') => state.cycle_month(-1),
        KeyCode::Char('o') => state.start_editing(),
        _ => {}
    }
    Flow::Continue
}

fn handle_editing_key(state: &mut AppState, key: KeyEvent, load_tx: &mpsc::Sender<LoadResult>) -> Flow {
    match key.code {
        KeyCode::Esc => state.cancel_editing(),
        KeyCode::Backspace => {
            state.editing_text.pop();
        }
        KeyCode::Char(c) => state.editing_text.push(c),
        KeyCode::Enter => {
            if let Some(path) = state.submit_editing() {
                spawn_load(path, load_tx.clone());
            }
        }
        _ => {}
    }
    Flow::Continue
}

fn spawn_load(path: PathBuf, tx: mpsc::Sender<LoadResult>) {
    let source = path.display().to_string();
    log(Level::Info, Domain::Ui, "load", obj(&[("path", v_str(&source))]));
    tokio::spawn(async move {
        let result = ingest::read_source(&path).await;
        let _ = tx.send((source, result)).await;
    });
}
