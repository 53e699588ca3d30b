use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};

use crate::app::{App, InputMode, Screen};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub async fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Paste(text) => handle_paste(app, &text),
        AppEvent::Resize => app.scroll_to_bottom(),
        AppEvent::Tick => {
            app.tick_animation();
            app.poll_reply().await;
        }
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    if app.confirm_reset {
        handle_reset_confirm(app, key);
        return;
    }

    match (app.screen, app.input_mode) {
        (Screen::Intake, _) => handle_intake(app, key),
        (Screen::Chat, InputMode::Normal) => handle_chat_normal(app, key),
        (Screen::Chat, InputMode::Editing) => handle_chat_editing(app, key),
    }
}

fn handle_reset_confirm(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char(c) if app.language().is_yes(c) => app.reset(),
        _ => app.confirm_reset = false,
    }
}

fn handle_intake(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.should_quit = true,
        KeyCode::Tab | KeyCode::Down => app.form_field = app.form_field.next(),
        KeyCode::BackTab | KeyCode::Up => app.form_field = app.form_field.prev(),
        KeyCode::Enter => app.submit_form(),
        KeyCode::Backspace => {
            app.form_value_mut().pop();
        }
        KeyCode::Char(c) => app.form_value_mut().push(c),
        _ => {}
    }
}

fn handle_chat_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('i') | KeyCode::Enter => app.input_mode = InputMode::Editing,
        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(),
        KeyCode::Char('G') | KeyCode::End => app.scroll_to_bottom(),
        KeyCode::Char('g') | KeyCode::Home => app.chat_scroll = 0,
        // No reset while a reply is on its way
        KeyCode::Char('r') if !app.is_loading() => app.confirm_reset = true,
        _ => {}
    }
}

fn handle_chat_editing(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Esc {
        app.input_mode = InputMode::Normal;
        return;
    }
    if app.is_loading() {
        return;
    }

    match key.code {
        KeyCode::Enter => app.send_input(),
        KeyCode::Backspace => {
            if app.cursor > 0 {
                app.cursor -= 1;
                let byte_pos = char_to_byte_index(&app.input, app.cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            if app.cursor < app.input.chars().count() {
                let byte_pos = char_to_byte_index(&app.input, app.cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Left => app.cursor = app.cursor.saturating_sub(1),
        KeyCode::Right => app.cursor = (app.cursor + 1).min(app.input.chars().count()),
        KeyCode::Home => app.cursor = 0,
        KeyCode::End => app.cursor = app.input.chars().count(),
        KeyCode::Up => app.scroll_up(),
        KeyCode::Down => app.scroll_down(),
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.input, app.cursor);
            app.input.insert(byte_pos, c);
            app.cursor += 1;
        }
        _ => {}
    }
}

fn handle_paste(app: &mut App, text: &str) {
    // Newlines would submit half a message
    let text: String = text.chars().map(|c| if c == '\n' { ' ' } else { c }).collect();
    match app.screen {
        Screen::Intake => app.form_value_mut().push_str(text.trim()),
        Screen::Chat if app.input_mode == InputMode::Editing && !app.is_loading() => {
            let byte_pos = char_to_byte_index(&app.input, app.cursor);
            app.input.insert_str(byte_pos, &text);
            app.cursor += text.chars().count();
        }
        Screen::Chat => {}
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    if app.screen != Screen::Chat {
        return;
    }
    match mouse.kind {
        MouseEventKind::ScrollDown => app.chat_scroll = app.chat_scroll.saturating_add(3),
        MouseEventKind::ScrollUp => app.chat_scroll = app.chat_scroll.saturating_sub(3),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::FormField;
    use crossterm::event::KeyEventKind;
    use fitconnect_core::{ChatSession, FileStore, Language};

    fn press(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn new_app(dir: &std::path::Path) -> App {
        App::new(ChatSession::new(FileStore::new(dir), Language::Portuguese), None)
    }

    #[test]
    fn char_index_handles_multibyte() {
        assert_eq!(char_to_byte_index("ação", 2), 3);
        assert_eq!(char_to_byte_index("abc", 10), 3);
    }

    #[tokio::test]
    async fn typing_fills_the_focused_field() {
        let tmp = tempfile::tempdir().unwrap();
        let mut app = new_app(tmp.path());

        for c in "Ana".chars() {
            handle_event(&mut app, press(KeyCode::Char(c))).await;
        }
        handle_event(&mut app, press(KeyCode::Tab)).await;
        handle_event(&mut app, press(KeyCode::Char('1'))).await;

        assert_eq!(app.form.name, "Ana");
        assert_eq!(app.form.birth_date, "1");
        assert_eq!(app.form_field, FormField::BirthDate);
    }

    #[tokio::test]
    async fn chat_input_edits_at_cursor() {
        let tmp = tempfile::tempdir().unwrap();
        let mut app = new_app(tmp.path());
        app.screen = Screen::Chat;
        app.input_mode = InputMode::Editing;

        for c in "olá".chars() {
            handle_event(&mut app, press(KeyCode::Char(c))).await;
        }
        handle_event(&mut app, press(KeyCode::Left)).await;
        handle_event(&mut app, press(KeyCode::Backspace)).await;
        assert_eq!(app.input, "oá");
        assert_eq!(app.cursor, 1);

        handle_event(&mut app, AppEvent::Paste("x\ny".into())).await;
        assert_eq!(app.input, "ox yá");
    }

    #[tokio::test]
    async fn reset_needs_confirmation() {
        let tmp = tempfile::tempdir().unwrap();
        let mut app = new_app(tmp.path());
        app.screen = Screen::Chat;
        app.input_mode = InputMode::Normal;

        handle_event(&mut app, press(KeyCode::Char('r'))).await;
        assert!(app.confirm_reset);
        handle_event(&mut app, press(KeyCode::Char('n'))).await;
        assert!(!app.confirm_reset);
        assert_eq!(app.screen, Screen::Chat);

        handle_event(&mut app, press(KeyCode::Char('r'))).await;
        handle_event(&mut app, press(KeyCode::Char('s'))).await;
        assert_eq!(app.screen, Screen::Intake);
    }

    #[tokio::test]
    async fn ctrl_c_quits_anywhere() {
        let tmp = tempfile::tempdir().unwrap();
        let mut app = new_app(tmp.path());
        let mut key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        key.kind = KeyEventKind::Press;
        handle_event(&mut app, AppEvent::Key(key)).await;
        assert!(app.should_quit);
    }
}
