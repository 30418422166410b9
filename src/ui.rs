use ratatui::{
    Frame,
    layout::{Constraint, Layout, Position, Rect},
    style::{Color, Modifier, Style, Stylize},
    symbols::border,
    text::{Line, Span, Text},
    widgets::{Block, Clear, Paragraph, Wrap},
};

use crate::model::{HeaderView, Model, RowView, SortMarker, UIData};

pub const LOCATION_HEIGHT: usize = 1;
pub const TABLE_HEADER_HEIGHT: usize = 1;
pub const STATUSLINE_HEIGHT: usize = 1;
pub const COLUMN_WIDTH_MARGIN: usize = 1;
pub const COLUMN_SPACER: usize = 1;
/// Room reserved in every header for " ▲".
pub const SORT_MARKER_WIDTH: usize = 2;

const POPUP_WIDTH: u16 = 60;

#[derive(Debug)]
pub struct TableUI {
    header: Style,
    sorted_header: Style,
    selected: Style,
    cursor: Style,
    link: Style,
}

impl Default for TableUI {
    fn default() -> Self {
        Self {
            header: Style::default().add_modifier(Modifier::BOLD),
            sorted_header: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
            selected: Style::default().fg(Color::Black).bg(Color::Yellow),
            cursor: Style::default().add_modifier(Modifier::REVERSED),
            link: Style::default().fg(Color::Blue).add_modifier(Modifier::UNDERLINED),
        }
    }
}

impl TableUI {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draw(&mut self, model: &Model, frame: &mut Frame) {
        let uidata = model.get_uidata();
        let [location_area, table_area, status_area] = Layout::vertical([
            Constraint::Length(LOCATION_HEIGHT as u16),
            Constraint::Min(1),
            Constraint::Length(uidata.layout.statusline_height as u16),
        ])
        .areas(frame.area());

        frame.render_widget(Self::location_line(uidata), location_area);
        frame.render_widget(self.table(uidata), table_area);
        self.draw_statusline(uidata, status_area, frame);

        if uidata.show_popup {
            Self::draw_popup(&uidata.popup_message, frame);
        }
    }

    fn location_line(uidata: &UIData) -> Paragraph<'_> {
        Paragraph::new(Line::from(vec![
            " sv ".bold().reversed(),
            " ".into(),
            uidata.location.as_str().yellow(),
            Span::styled(
                format!(
                    "  {} of {} selected  row {}",
                    uidata.nselected,
                    uidata.nrows,
                    uidata.abs_selected_row + 1
                ),
                Style::default().fg(Color::DarkGray),
            ),
        ]))
    }

    fn table(&self, uidata: &UIData) -> Paragraph<'_> {
        let mut lines = Vec::with_capacity(uidata.rows.len() + 1);
        lines.push(Line::from(
            uidata
                .headers
                .iter()
                .flat_map(|header| self.header_cell(header))
                .collect::<Vec<Span>>(),
        ));
        for (i, row) in uidata.rows.iter().enumerate() {
            lines.push(self.body_line(uidata, row, i == uidata.selected_row));
        }
        Paragraph::new(Text::from(lines))
    }

    fn header_cell(&self, header: &HeaderView) -> [Span<'static>; 2] {
        let label = match header.sorted {
            Some(SortMarker::Ascending) => format!("{} ▲", header.name),
            Some(SortMarker::Descending) => format!("{} ▼", header.name),
            None => header.name.clone(),
        };
        let style = if header.sorted.is_some() {
            self.sorted_header
        } else {
            self.header
        };
        [
            Span::styled(fit(&label, header.width), style),
            Span::raw(" ".repeat(COLUMN_SPACER)),
        ]
    }

    fn body_line(&self, uidata: &UIData, row: &RowView, is_cursor_row: bool) -> Line<'static> {
        let row_style = if row.selected {
            self.selected
        } else {
            Style::default()
        };
        let mut spans = Vec::with_capacity(row.cells.len() * 2);
        for (cidx, (cell, header)) in row.cells.iter().zip(uidata.headers.iter()).enumerate() {
            let mut style = row_style;
            if row.links.get(cidx).copied().unwrap_or(false) {
                style = style.patch(self.link);
            }
            if is_cursor_row && cidx == uidata.selected_column {
                style = style.patch(self.cursor);
            }
            spans.push(Span::styled(fit(cell, header.width), style));
            spans.push(Span::styled(" ".repeat(COLUMN_SPACER), row_style));
        }
        let line = Line::from(spans);
        if is_cursor_row {
            line.bold()
        } else {
            line
        }
    }

    fn draw_statusline(&self, uidata: &UIData, area: Rect, frame: &mut Frame) {
        if uidata.active_cmdinput {
            let prompt = "fragment: ";
            let input = &uidata.cmdinput;
            frame.render_widget(
                Paragraph::new(Line::from(vec![
                    prompt.bold(),
                    Span::raw(input.input.clone()),
                ])),
                area,
            );
            let x = area.x + (prompt.len() + input.cursor_pos) as u16;
            frame.set_cursor_position(Position::new(x.min(area.right().saturating_sub(1)), area.y));
        } else {
            frame.render_widget(
                Paragraph::new(Line::from(vec![
                    Span::raw(uidata.status_message.clone()),
                    "  ? help".dark_gray(),
                ])),
                area,
            );
        }
    }

    fn draw_popup(message: &str, frame: &mut Frame) {
        let area = frame.area();
        let height = (message.lines().count() as u16 + 2).min(area.height);
        let width = POPUP_WIDTH.min(area.width);
        let popup = Rect {
            x: area.x + (area.width - width) / 2,
            y: area.y + (area.height - height) / 2,
            width,
            height,
        };
        let block = Block::bordered()
            .title(Line::from(" Help ".bold()).centered())
            .title_bottom(Line::from(vec![" Close ".into(), "<Esc> ".blue().bold()]).centered())
            .border_set(border::THICK);
        frame.render_widget(Clear, popup);
        frame.render_widget(
            Paragraph::new(message.to_string())
                .block(block)
                .wrap(Wrap { trim: false }),
            popup,
        );
    }
}

/// Pads or cuts `text` to exactly `width` chars.
fn fit(text: &str, width: usize) -> String {
    let count = text.chars().count();
    if count <= width {
        format!("{text:<width$}")
    } else if width == 0 {
        String::new()
    } else {
        let mut cut: String = text.chars().take(width - 1).collect();
        cut.push('…');
        cut
    }
}
