use std::time::Duration;
use tracing::trace;

use crate::domain::{Message, SVConfig, SVError};
use crate::model::{Model, UIData};
use ratatui::crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind,
};

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &SVConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, SVError> {
        if !event::poll(Duration::from_millis(self.event_poll_time))? {
            return Ok(None);
        }
        Ok(self.map_event(event::read()?, model))
    }

    fn map_event(&self, event: Event, model: &Model) -> Option<Message> {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                if model.raw_keyevents() {
                    Some(Message::RawKey(key))
                } else {
                    self.handle_key(key)
                }
            }
            Event::Mouse(mouse) if !model.raw_keyevents() => {
                self.handle_mouse(mouse, model.get_uidata())
            }
            Event::Resize(width, height) => Some(Message::Resize(width as usize, height as usize)),
            _ => None,
        }
    }

    fn handle_key(&self, key: KeyEvent) -> Option<Message> {
        let message = match key.code {
            KeyCode::Char('q') => Some(Message::Quit),
            KeyCode::Down | KeyCode::Char('j') => Some(Message::MoveDown),
            KeyCode::Up | KeyCode::Char('k') => Some(Message::MoveUp),
            KeyCode::Left | KeyCode::Char('h') => Some(Message::MoveLeft),
            KeyCode::Right | KeyCode::Char('l') => Some(Message::MoveRight),
            KeyCode::PageDown => Some(Message::MovePageDown),
            KeyCode::PageUp => Some(Message::MovePageUp),
            KeyCode::Home | KeyCode::Char('g') => Some(Message::MoveBeginning),
            KeyCode::End | KeyCode::Char('G') => Some(Message::MoveEnd),
            KeyCode::Char(' ') => Some(Message::ToggleRow),
            KeyCode::Enter | KeyCode::Char('s') => Some(Message::SortColumn),
            KeyCode::Char('o') => Some(Message::FollowLink),
            KeyCode::Char('#') => Some(Message::EditFragment),
            KeyCode::Char('y') => Some(Message::CopyLocation),
            KeyCode::Char('?') => Some(Message::Help),
            KeyCode::Esc => Some(Message::Exit),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }

    // Header clicks sort, clicks on link cells follow the link, any other
    // click on a body row toggles it.
    fn handle_mouse(&self, mouse: MouseEvent, uidata: &UIData) -> Option<Message> {
        let message = match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                let layout = &uidata.layout;
                let column = uidata
                    .headers
                    .iter()
                    .position(|h| mouse.column >= h.x && mouse.column < h.x + h.width as u16);

                if mouse.row == layout.header_y {
                    column.map(|c| Message::ClickHeader(uidata.headers[c].column))
                } else if mouse.row >= layout.body_y() {
                    let row = uidata.rows.get((mouse.row - layout.body_y()) as usize)?;
                    match column {
                        Some(c) if row.links.get(c).copied().unwrap_or(false) => {
                            Some(Message::ClickLink(row.row, uidata.headers[c].column))
                        }
                        _ => Some(Message::ClickRow(row.row)),
                    }
                } else {
                    None
                }
            }
            MouseEventKind::ScrollDown => Some(Message::MoveDown),
            MouseEventKind::ScrollUp => Some(Message::MoveUp),
            _ => None,
        };
        trace!("Mapped: {mouse:?} => {message:?}");
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::Location;
    use crate::listing::{Cell, Listing, Row};
    use ratatui::crossterm::event::KeyModifiers;

    fn model() -> Model {
        let listing = Listing::new(
            vec!["Name".into(), "Provider".into()],
            vec![
                Row::new(vec![
                    Cell::plain("#\u{a0}1"),
                    Cell::plain("Alpha").with_link("Alpha", "https://alpha.example"),
                ]),
                Row::new(vec![Cell::plain("#\u{a0}2"), Cell::plain("Beta")]),
            ],
        );
        let config = SVConfig::default().with_clipboard(false);
        Model::init(&config, listing, Location::parse("servers.html"), 80, 10)
    }

    fn click(column: u16, row: u16) -> Event {
        Event::Mouse(MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column,
            row,
            modifiers: KeyModifiers::NONE,
        })
    }

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn keys_map_to_messages() {
        let controller = Controller::new(&SVConfig::default());
        let model = model();
        assert_eq!(controller.map_event(key(KeyCode::Char(' ')), &model), Some(Message::ToggleRow));
        assert_eq!(controller.map_event(key(KeyCode::Char('s')), &model), Some(Message::SortColumn));
        assert_eq!(controller.map_event(key(KeyCode::Char('#')), &model), Some(Message::EditFragment));
        assert_eq!(controller.map_event(key(KeyCode::Char('x')), &model), None);
    }

    #[test]
    fn fragment_input_gets_raw_keys() {
        let controller = Controller::new(&SVConfig::default());
        let mut model = model();
        model.update(Some(Message::EditFragment));
        assert!(matches!(
            controller.map_event(key(KeyCode::Char('q')), &model),
            Some(Message::RawKey(_))
        ));
        assert_eq!(controller.map_event(click(0, 2), &model), None);
    }

    #[test]
    fn header_click_sorts_that_column() {
        let controller = Controller::new(&SVConfig::default());
        let model = model();
        let provider = &model.get_uidata().headers[1];
        let message = controller.map_event(click(provider.x + 1, 1), &model);
        assert_eq!(message, Some(Message::ClickHeader(1)));
    }

    #[test]
    fn body_clicks_toggle_or_follow_links() {
        let controller = Controller::new(&SVConfig::default());
        let model = model();
        let provider_x = model.get_uidata().headers[1].x;

        assert_eq!(controller.map_event(click(0, 2), &model), Some(Message::ClickRow(0)));
        assert_eq!(
            controller.map_event(click(provider_x, 2), &model),
            Some(Message::ClickLink(0, 1))
        );
        // Second row has no link in that column.
        assert_eq!(controller.map_event(click(provider_x, 3), &model), Some(Message::ClickRow(1)));
        // Below the last row.
        assert_eq!(controller.map_event(click(0, 6), &model), None);
        // Location bar.
        assert_eq!(controller.map_event(click(0, 0), &model), None);
    }

    #[test]
    fn resize_is_forwarded() {
        let controller = Controller::new(&SVConfig::default());
        let model = model();
        assert_eq!(
            controller.map_event(Event::Resize(100, 40), &model),
            Some(Message::Resize(100, 40))
        );
    }
}
