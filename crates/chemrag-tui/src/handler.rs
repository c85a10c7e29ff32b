use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use tracing::{debug, warn};

use crate::app::{App, FocusPane, InputMode};
use crate::tui::AppEvent;

pub async fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => {
            app.tick_animation();
        }
    }
    // Any event is a chance to pick up a finished query
    app.poll_query().await;
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    app.status = None;
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        KeyCode::Char('i') => {
            app.focus = FocusPane::Input;
            app.input_mode = InputMode::Editing;
        }
        KeyCode::Tab => {
            app.cycle_focus();
            if app.focus == FocusPane::Input {
                app.input_mode = InputMode::Editing;
            }
        }

        KeyCode::Char('j') | KeyCode::Down => match app.focus {
            FocusPane::Sources => app.sources_nav_down(),
            _ => app.scroll_chat_down(1),
        },
        KeyCode::Char('k') | KeyCode::Up => match app.focus {
            FocusPane::Sources => app.sources_nav_up(),
            _ => app.scroll_chat_up(1),
        },
        KeyCode::Char('g') => app.chat_scroll = 0,
        KeyCode::Char('G') => app.scroll_chat_to_bottom(),

        // Half-page scroll
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_chat_down(app.half_page());
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_chat_up(app.half_page());
        }

        KeyCode::Enter => match app.focus {
            FocusPane::Sources => open_selected_source(app),
            FocusPane::Input => app.input_mode = InputMode::Editing,
            FocusPane::Chat => {}
        },

        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    // Scrolling the transcript stays available while typing or waiting
    match key.code {
        KeyCode::Esc => app.input_mode = InputMode::Normal,
        KeyCode::Up => app.scroll_chat_up(1),
        KeyCode::Down => app.scroll_chat_down(1),
        KeyCode::PageUp => app.scroll_chat_up(app.half_page()),
        KeyCode::PageDown => app.scroll_chat_down(app.half_page()),
        _ if !app.input_enabled() => {}
        KeyCode::Enter => app.submit_query(),
        code => edit_input(app, code),
    }
}

fn edit_input(app: &mut App, code: KeyCode) {
    let pending = app.conversation.pending_mut();
    match code {
        KeyCode::Backspace => pending.backspace(),
        KeyCode::Delete => pending.delete(),
        KeyCode::Left => pending.move_left(),
        KeyCode::Right => pending.move_right(),
        KeyCode::Home => pending.move_home(),
        KeyCode::End => pending.move_end(),
        KeyCode::Char(c) => pending.insert_char(c),
        _ => {}
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let x = mouse.column;
    let y = mouse.row;

    let in_chat = app.chat_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);
    let in_sources = app.sources_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);

    match mouse.kind {
        MouseEventKind::ScrollDown => {
            if in_chat {
                app.scroll_chat_down(3);
            } else if in_sources {
                app.sources_nav_down();
            }
        }
        MouseEventKind::ScrollUp => {
            if in_chat {
                app.scroll_chat_up(3);
            } else if in_sources {
                app.sources_nav_up();
            }
        }
        _ => {}
    }
}

fn open_selected_source(app: &mut App) {
    let Some(source) = app.selected_source() else {
        return;
    };
    if source.trim().is_empty() {
        app.status = Some("Source has no location to open".to_string());
        return;
    }

    match open_url(&source) {
        Ok(()) => {
            debug!(url = %source, "opened source");
            app.status = Some(format!("Opened {}", source));
        }
        Err(e) => {
            warn!(url = %source, error = %e, "failed to open source");
            app.status = Some(format!("Could not open {}: {}", source, e));
        }
    }
}

/// Hand a URL to the platform's default opener.
fn open_url(url: &str) -> std::io::Result<()> {
    use std::process::{Command, Stdio};

    let mut command = if cfg!(target_os = "macos") {
        let mut c = Command::new("open");
        c.arg(url);
        c
    } else if cfg!(target_os = "windows") {
        let mut c = Command::new("cmd");
        c.args(["/C", "start", "", url]);
        c
    } else {
        let mut c = Command::new("xdg-open");
        c.arg(url);
        c
    };

    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map(|_| ())
}
