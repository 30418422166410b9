use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use ratatui::text::Span;
use rayon::prelude::*;
use std::collections::VecDeque;
use std::time::Instant;
use tracing::{debug, error, info, trace, warn};

use crate::comparator::{self, ColumnKind};
use crate::domain::{HELP_TEXT, Message, SVConfig};
use crate::fragment::Location;
use crate::inputter::{FragmentInput, InputResult};
use crate::listing::{Cell, Listing};
use crate::ui::{
    COLUMN_SPACER, COLUMN_WIDTH_MARGIN, LOCATION_HEIGHT, SORT_MARKER_WIDTH, STATUSLINE_HEIGHT,
    TABLE_HEADER_HEIGHT,
};

#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    TABLE,
    POPUP,
    CMDINPUT,
}

/// Direction shown next to the sorted header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortMarker {
    /// Sorted ascending, clicking again reverses.
    Ascending,
    /// Reversed, clicking again starts ascending.
    Descending,
}

#[derive(Clone, Debug)]
pub struct HeaderView {
    pub name: String,
    pub column: usize, // Index in Listing.headers
    pub x: u16,
    pub width: usize,
    pub sorted: Option<SortMarker>,
}

#[derive(Clone, Debug)]
pub struct RowView {
    pub row: usize, // Position in the render order
    pub cells: Vec<String>,
    pub links: Vec<bool>,
    pub selected: bool,
}

pub struct UIData {
    pub location: String,
    pub headers: Vec<HeaderView>,
    pub rows: Vec<RowView>,
    pub nrows: usize,
    pub nselected: usize,
    pub selected_row: usize,    // Cursor, relative to the first rendered row
    pub selected_column: usize, // Cursor, index into headers
    pub abs_selected_row: usize,
    pub show_popup: bool,
    pub popup_message: String,
    pub layout: UILayout,
    pub cmdinput: InputResult,
    pub active_cmdinput: bool,
    pub status_message: String,
}

impl UIData {
    pub fn empty() -> Self {
        UIData {
            location: String::new(),
            headers: Vec::new(),
            rows: Vec::new(),
            nrows: 0,
            nselected: 0,
            selected_row: 0,
            selected_column: 0,
            abs_selected_row: 0,
            show_popup: false,
            popup_message: String::new(),
            layout: UILayout::default(),
            cmdinput: InputResult::default(),
            active_cmdinput: false,
            status_message: String::new(),
        }
    }
}

#[derive(Default, Clone, Debug)]
pub struct UILayout {
    pub width: usize,
    pub height: usize,
    pub table_width: usize,
    pub table_height: usize, // Body rows, without the header
    pub header_y: u16,
    pub statusline_height: usize,
}

impl UILayout {
    pub fn from_values(ui_width: usize, ui_height: usize) -> Self {
        let table_height = ui_height
            .saturating_sub(LOCATION_HEIGHT + TABLE_HEADER_HEIGHT + STATUSLINE_HEIGHT)
            .max(1);
        let layout = UILayout {
            width: ui_width,
            height: ui_height,
            table_width: ui_width,
            table_height,
            header_y: LOCATION_HEIGHT as u16,
            statusline_height: STATUSLINE_HEIGHT,
        };
        trace!("Build UILayout: {:?}", layout);
        layout
    }

    pub fn body_y(&self) -> u16 {
        self.header_y + TABLE_HEADER_HEIGHT as u16
    }
}

/// The table controller.
///
/// Owns the loaded rows, their render order and the sort memory. All input
/// arrives as [`Message`]s through [`Model::update`]; fragment changes caused
/// by a row toggle are queued and handled within the same update.
pub struct Model {
    config: SVConfig,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    listing: Listing,
    column_widths: Vec<usize>,
    order: Vec<usize>, // Render order, indices into listing.rows
    last_column: Option<String>,
    sorted_header: Option<usize>,
    location: Location,
    pending: VecDeque<Message>,
    curser_row: usize,
    curser_column: usize,
    offset_row: usize,
    offset_column: usize,
    visible_columns: Vec<usize>,
    uilayout: UILayout,
    uidata: UIData,
    clipboard: Option<Clipboard>,
    input: FragmentInput,
    last_input: InputResult,
    active_cmdinput: bool,
    status_message: String,
}

impl Model {
    pub fn init(
        config: &SVConfig,
        listing: Listing,
        location: Location,
        ui_width: usize,
        ui_height: usize,
    ) -> Self {
        let start_time = Instant::now();
        let column_widths: Vec<usize> = (0..listing.ncolumns())
            .into_par_iter()
            .map(|cidx| Self::calculate_column_width(&listing, cidx, config.max_column_width))
            .collect();
        debug!(
            "Column widths {:?} in {}ms",
            column_widths,
            start_time.elapsed().as_millis()
        );

        let sorted_header = listing
            .sorted_header
            .or_else(|| listing.column_index(&config.presorted_column));

        let mut model = Self {
            config: config.clone(),
            status: Status::READY,
            modus: Modus::TABLE,
            previous_modus: Modus::TABLE,
            order: (0..listing.nrows()).collect(),
            listing,
            column_widths,
            // Listings arrive sorted by this column, so the first click on it reverses.
            last_column: Some(config.presorted_column.clone()),
            sorted_header,
            location,
            pending: VecDeque::new(),
            curser_row: 0,
            curser_column: 0,
            offset_row: 0,
            offset_column: 0,
            visible_columns: Vec::new(),
            uilayout: UILayout::from_values(ui_width, ui_height),
            uidata: UIData::empty(),
            clipboard: None,
            input: FragmentInput::default(),
            last_input: InputResult::default(),
            active_cmdinput: false,
            status_message: String::new(),
        };
        model.apply_fragment();
        let (nrows, nselected) = (model.listing.nrows(), model.nselected());
        model.set_status_message(format!("{nrows} servers, {nselected} selected"));
        model
    }

    fn calculate_column_width(listing: &Listing, cidx: usize, max_column_width: usize) -> usize {
        let header = Span::raw(listing.headers[cidx].as_str()).width() + SORT_MARKER_WIDTH;
        let cells = listing
            .rows
            .iter()
            .filter_map(|row| row.cell(cidx))
            .map(|cell| Span::raw(cell.display()).width())
            .max()
            .unwrap_or(0);
        std::cmp::min(
            std::cmp::max(header, cells) + COLUMN_WIDTH_MARGIN,
            max_column_width,
        )
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn last_column(&self) -> Option<&str> {
        self.last_column.as_deref()
    }

    pub fn sorted_header(&self) -> Option<usize> {
        self.sorted_header
    }

    /// Display names in render order.
    pub fn names_in_order(&self) -> Vec<&str> {
        self.order
            .iter()
            .map(|&ridx| self.listing.rows[ridx].display_name())
            .collect()
    }

    pub fn nselected(&self) -> usize {
        self.listing.rows.iter().filter(|r| r.selected).count()
    }

    pub fn raw_keyevents(&self) -> bool {
        self.active_cmdinput
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.uidata.status_message = self.status_message.clone();
    }

    pub fn update(&mut self, message: Option<Message>) {
        if let Some(msg) = message {
            self.dispatch(msg);
        }
        // Fragment changes queued by the handlers above.
        while let Some(msg) = self.pending.pop_front() {
            self.dispatch(msg);
        }
    }

    fn dispatch(&mut self, msg: Message) {
        trace!("Update: Modus {:?}, Message {:?}", self.modus, msg);
        // Handled the same way whatever is on screen.
        let msg = match msg {
            Message::FragmentChanged(fragment) => {
                self.fragment_changed(&fragment);
                return;
            }
            Message::Resize(width, height) => {
                self.ui_resize(width, height);
                return;
            }
            other => other,
        };

        match self.modus {
            Modus::TABLE => match msg {
                Message::Quit => self.quit(),
                Message::MoveDown => self.move_selection_down(1),
                Message::MoveUp => self.move_selection_up(1),
                Message::MoveLeft => self.move_selection_left(),
                Message::MoveRight => self.move_selection_right(),
                Message::MovePageUp => self.move_selection_up(self.uilayout.table_height),
                Message::MovePageDown => self.move_selection_down(self.uilayout.table_height),
                Message::MoveBeginning => self.move_selection_up(self.order.len()),
                Message::MoveEnd => self.move_selection_down(self.order.len()),
                Message::ToggleRow => self.toggle_row(self.curser_row),
                Message::SortColumn => self.sort_by_column(self.curser_column),
                Message::FollowLink => self.follow_link(self.curser_row, self.curser_column),
                Message::ClickHeader(column) => {
                    self.curser_column = column;
                    self.sort_by_column(column);
                }
                Message::ClickRow(row) => {
                    self.curser_row = row;
                    self.toggle_row(row);
                }
                Message::ClickLink(row, column) => {
                    self.curser_row = row;
                    self.curser_column = column;
                    self.follow_link(row, column);
                }
                Message::EditFragment => self.enter_cmd_mode(),
                Message::CopyLocation => {
                    let location = self.location.to_string();
                    self.copy_to_clipboard(location.clone(), format!("Copied {location}"));
                }
                Message::Help => self.show_help(),
                _ => (),
            },
            Modus::POPUP => match msg {
                Message::Quit => self.quit(),
                Message::Exit => self.exit(),
                _ => (),
            },
            Modus::CMDINPUT => {
                if let Message::RawKey(key) = msg {
                    self.raw_input(key)
                }
            }
        }
    }

    // -------------------- Selection ---------------------- //

    fn fragment_changed(&mut self, fragment: &str) {
        self.location.set_fragment(fragment);
        self.apply_fragment();
    }

    /// Marks exactly the rows named in the fragment and moves them to the top.
    /// Both the fragment edits and the row toggles end up here.
    pub fn apply_fragment(&mut self) {
        let selection = self.location.selection();
        let set = selection.as_set();
        for row in self.listing.rows.iter_mut() {
            row.selected = set.contains(row.display_name());
        }
        debug!(
            "Applied fragment {:?} ({} ids)",
            self.location.fragment(),
            selection.ids().len()
        );
        self.resort_selected();
        self.update_table_data();
    }

    /// Toggles the row at `view_row` and writes the new selection back into
    /// the fragment.
    pub fn toggle_row(&mut self, view_row: usize) {
        let Some(&ridx) = self.order.get(view_row) else {
            return;
        };
        let row = &mut self.listing.rows[ridx];
        row.selected = !row.selected;
        let selected = row.selected;
        let name = row.display_name().to_string();

        let mut selection = self.location.selection();
        if selected {
            selection.push(&name);
        } else {
            selection.remove_first(&name);
        }
        let fragment = selection.to_fragment();
        debug!("Toggled {name} to {selected}, fragment {fragment}");

        if self.location.set_fragment(&fragment) {
            self.pending.push_back(Message::FragmentChanged(fragment));
        }

        self.resort_selected();
        // Keep the cursor on the row that just moved.
        if let Some(pos) = self.order.iter().position(|&i| i == ridx) {
            self.curser_row = pos;
        }
        let nselected = self.nselected();
        self.set_status_message(format!(
            "{} {name}, {nselected} selected",
            if selected { "Selected" } else { "Deselected" }
        ));
        self.update_table_data();
    }

    // Stable, so order inside both groups is kept.
    fn resort_selected(&mut self) {
        let rows = &self.listing.rows;
        self.order.sort_by_key(|&ridx| !rows[ridx].selected);
    }

    // -------------------- Sorting ---------------------- //

    /// Sorts by the header at `column`. Sorting the same column twice in a row
    /// gives the exact reverse, a third time starts ascending again.
    pub fn sort_by_column(&mut self, column: usize) {
        let Some(name) = self.listing.headers.get(column).cloned() else {
            return;
        };
        let repeated = self.last_column.as_deref() == Some(name.as_str());
        let kind = ColumnKind::for_header(&name);
        let start_time = Instant::now();

        if repeated {
            // Lets the stable sort keep the previous order of ties reversed.
            self.order.reverse();
        }
        comparator::sort_by_column(&mut self.order, &self.listing.rows, column, kind);
        if repeated {
            self.order.reverse();
            self.last_column = None;
        } else {
            self.last_column = Some(name.clone());
        }

        self.resort_selected();
        self.sorted_header = Some(column);

        debug!(
            "Sorted by {name:?} ({kind:?}, reversed: {repeated}) in {}ms",
            start_time.elapsed().as_millis()
        );
        trace!("Order {:?}", self.names_in_order());
        self.set_status_message(format!(
            "Sorted by {name}{}",
            if repeated { ", reversed" } else { "" }
        ));
        self.update_table_data();
    }

    // -------------------- Links ---------------------- //

    /// Copies the first link of the cell. Never touches the selection.
    pub fn follow_link(&mut self, view_row: usize, column: usize) {
        let link = self
            .order
            .get(view_row)
            .and_then(|&ridx| self.listing.rows[ridx].cell(column))
            .and_then(|cell| cell.links.first())
            .cloned();
        match link {
            Some(link) => {
                info!("Following link {:?} -> {}", link.text, link.href);
                let message = format!("Link {}", link.href);
                self.copy_to_clipboard(link.href, message);
            }
            None => self.set_status_message("No link in this cell"),
        }
    }

    fn copy_to_clipboard(&mut self, text: String, message: String) {
        if !self.config.clipboard {
            self.set_status_message(message);
            return;
        }
        if self.clipboard.is_none() {
            match Clipboard::new() {
                Ok(clipboard) => self.clipboard = Some(clipboard),
                Err(e) => {
                    error!("Clipboard unavailable: {:?}", e);
                    self.set_status_message(format!("{message} (clipboard unavailable)"));
                    return;
                }
            }
        }
        if let Some(clipboard) = self.clipboard.as_mut() {
            match clipboard.set_text(text) {
                Ok(_) => {
                    trace!("Copied to clipboard.");
                    self.set_status_message(message);
                }
                Err(e) => {
                    warn!("Error copying to clipboard: {:?}", e);
                    self.set_status_message(format!("{message} (copy failed)"));
                }
            }
        }
    }

    // -------------------- Modes ---------------------- //

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
        self.uidata.popup_message = HELP_TEXT.to_string();
        self.uidata.show_popup = true;
    }

    fn exit(&mut self) {
        if self.modus == Modus::POPUP {
            trace!("Close popup ...");
            self.modus = self.previous_modus;
            self.previous_modus = Modus::POPUP;
            self.uidata.show_popup = false;
        }
    }

    fn enter_cmd_mode(&mut self) {
        trace!("Entering fragment input ...");
        self.previous_modus = self.modus;
        self.modus = Modus::CMDINPUT;
        self.active_cmdinput = true;
        self.last_input = self.input.start(&format!("#{}", self.location.fragment()));

        self.uidata.cmdinput = self.last_input.clone();
        self.uidata.active_cmdinput = self.active_cmdinput;
    }

    fn raw_input(&mut self, key: KeyEvent) {
        if self.active_cmdinput {
            self.last_input = self.input.read(key);
            if self.last_input.finished {
                self.handle_cmd_input();
            }
            self.uidata.cmdinput = self.last_input.clone();
        }
    }

    fn handle_cmd_input(&mut self) {
        trace!("Handle fragment input {:?}", self.last_input.input);
        self.active_cmdinput = false;
        self.modus = self.previous_modus;
        self.previous_modus = Modus::CMDINPUT;
        self.uidata.active_cmdinput = false;

        if let Some(fragment) = self.last_input.fragment() {
            let fragment = fragment.to_string();
            if self.location.set_fragment(&fragment) {
                self.pending.push_back(Message::FragmentChanged(fragment));
            }
        }
    }

    // -------------------- Cursor ---------------------- //

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!(
            "UI was resized! w:{}->{}, h:{}->{}",
            self.uilayout.width, width, self.uilayout.height, height
        );
        self.uilayout = UILayout::from_values(width, height);
        self.update_table_data();
    }

    fn move_selection_up(&mut self, size: usize) {
        self.curser_row = self.curser_row.saturating_sub(size);
        self.update_table_data();
    }

    fn move_selection_down(&mut self, size: usize) {
        let last = self.order.len().saturating_sub(1);
        self.curser_row = std::cmp::min(self.curser_row + size, last);
        self.update_table_data();
    }

    fn move_selection_left(&mut self) {
        self.curser_column = self.curser_column.saturating_sub(1);
        self.update_table_data();
    }

    fn move_selection_right(&mut self) {
        let last = self.listing.ncolumns().saturating_sub(1);
        self.curser_column = std::cmp::min(self.curser_column + 1, last);
        self.update_table_data();
    }

    fn columns_from(&self, offset: usize) -> Vec<usize> {
        let mut visible = Vec::new();
        let mut used = 0;
        for (cidx, width) in self.column_widths.iter().enumerate().skip(offset) {
            if !visible.is_empty() && used + width > self.uilayout.table_width {
                break;
            }
            visible.push(cidx);
            used += width + COLUMN_SPACER;
        }
        visible
    }

    // Scroll so the cursor is on screen, then rebuild what the ui renders.
    fn update_table_data(&mut self) {
        let nrows = self.order.len();
        self.curser_row = std::cmp::min(self.curser_row, nrows.saturating_sub(1));
        let height = self.uilayout.table_height;
        if self.curser_row < self.offset_row {
            self.offset_row = self.curser_row;
        } else if self.curser_row >= self.offset_row + height {
            self.offset_row = self.curser_row + 1 - height;
        }

        self.curser_column = std::cmp::min(
            self.curser_column,
            self.listing.ncolumns().saturating_sub(1),
        );
        if self.curser_column < self.offset_column {
            self.offset_column = self.curser_column;
        }
        self.visible_columns = self.columns_from(self.offset_column);
        while !self.visible_columns.contains(&self.curser_column)
            && self.offset_column < self.curser_column
        {
            self.offset_column += 1;
            self.visible_columns = self.columns_from(self.offset_column);
        }

        let mut x = 0u16;
        let headers = self
            .visible_columns
            .iter()
            .map(|&cidx| {
                let name = self.listing.headers[cidx].clone();
                let sorted = (self.sorted_header == Some(cidx)).then(|| match self.last_column {
                    Some(_) => SortMarker::Ascending,
                    None => SortMarker::Descending,
                });
                let view = HeaderView {
                    name,
                    column: cidx,
                    x,
                    width: self.column_widths[cidx],
                    sorted,
                };
                x = x.saturating_add((self.column_widths[cidx] + COLUMN_SPACER) as u16);
                view
            })
            .collect::<Vec<HeaderView>>();

        let rbegin = self.offset_row;
        let rend = std::cmp::min(rbegin + height, nrows);
        let rows = self.order[rbegin..rend]
            .iter()
            .enumerate()
            .map(|(i, &ridx)| {
                let row = &self.listing.rows[ridx];
                let cells: Vec<Option<&Cell>> =
                    self.visible_columns.iter().map(|&c| row.cell(c)).collect();
                RowView {
                    row: rbegin + i,
                    cells: cells
                        .iter()
                        .map(|c| c.map(Cell::display).unwrap_or_default())
                        .collect(),
                    links: cells.iter().map(|c| c.is_some_and(Cell::has_links)).collect(),
                    selected: row.selected,
                }
            })
            .collect::<Vec<RowView>>();

        let selected_column = self
            .visible_columns
            .iter()
            .position(|&c| c == self.curser_column)
            .unwrap_or(0);

        self.uidata = UIData {
            location: self.location.to_string(),
            headers,
            rows,
            nrows,
            nselected: self.nselected(),
            selected_row: self.curser_row - self.offset_row,
            selected_column,
            abs_selected_row: self.curser_row,
            show_popup: self.uidata.show_popup,
            popup_message: self.uidata.popup_message.clone(),
            layout: self.uilayout.clone(),
            cmdinput: self.last_input.clone(),
            active_cmdinput: self.active_cmdinput,
            status_message: self.status_message.clone(),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::Row;
    use crate::loader;
    use ratatui::crossterm::event::{KeyCode, KeyModifiers};
    use std::path::PathBuf;

    fn config() -> SVConfig {
        SVConfig::default().with_clipboard(false)
    }

    fn fixture_model(fragment: &str) -> Model {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/servers.html");
        let listing = loader::load(&path, &config()).unwrap();
        let location = Location::parse(&format!("servers.html#{fragment}"));
        Model::init(&config(), listing, location, 120, 30)
    }

    fn model_with(headers: &[&str], rows: &[&[&str]], fragment: &str) -> Model {
        let listing = Listing::new(
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|cells| Row::new(cells.iter().map(|c| Cell::plain(c)).collect()))
                .collect(),
        );
        let location = Location::parse(&format!("servers.html#{fragment}"));
        Model::init(&config(), listing, location, 120, 30)
    }

    fn click_header(model: &mut Model, name: &str) {
        let column = model.listing.column_index(name).unwrap();
        model.update(Some(Message::ClickHeader(column)));
    }

    fn view_row_of(model: &Model, name: &str) -> usize {
        model.names_in_order().iter().position(|n| *n == name).unwrap()
    }

    fn selected_prefix_holds(model: &Model) -> bool {
        let flags: Vec<bool> = model
            .order
            .iter()
            .map(|&r| model.listing.rows[r].selected)
            .collect();
        flags.windows(2).all(|w| w[0] || !w[1])
    }

    #[test]
    fn startup_applies_fragment() {
        let model = fixture_model("12,x,41");
        assert_eq!(model.names_in_order(), ["12", "41", "3", "7", "20"]);
        assert_eq!(model.nselected(), 2);
        assert!(selected_prefix_holds(&model));
    }

    #[test]
    fn fragment_change_reselects() {
        let mut model = fixture_model("12");
        model.update(Some(Message::FragmentChanged("#20,3".into())));
        assert_eq!(model.names_in_order(), ["3", "20", "12", "7", "41"]);
        assert_eq!(model.location().fragment(), "20,3");

        model.update(Some(Message::FragmentChanged("#".into())));
        assert_eq!(model.nselected(), 0);
        assert_eq!(model.names_in_order(), ["3", "20", "12", "7", "41"]);
    }

    #[test]
    fn toggling_a_row_writes_sorted_fragment() {
        let mut model = fixture_model("41");
        let row = view_row_of(&model, "7");
        model.update(Some(Message::ClickRow(row)));
        assert_eq!(model.location().fragment(), "7,41");
        assert_eq!(model.names_in_order(), ["41", "7", "3", "12", "20"]);
        assert!(selected_prefix_holds(&model));
    }

    #[test]
    fn double_toggle_restores_state() {
        let mut model = fixture_model("20,3");
        let before_ids = model.location().selection();
        let before: Vec<bool> = model.listing.rows.iter().map(|r| r.selected).collect();

        let row = view_row_of(&model, "12");
        model.update(Some(Message::ClickRow(row)));
        assert_eq!(model.location().fragment(), "3,12,20");
        let row = view_row_of(&model, "12");
        model.update(Some(Message::ClickRow(row)));

        let after: Vec<bool> = model.listing.rows.iter().map(|r| r.selected).collect();
        assert_eq!(before, after);
        // Same ids, written back in numeric order.
        assert_eq!(model.location().selection().as_set(), before_ids.as_set());
        assert_eq!(model.location().fragment(), "3,20");
    }

    #[test]
    fn toggle_and_fragment_round_trip_converge() {
        // Local toggle without the queued fragment event...
        let mut local = fixture_model("3");
        let row = view_row_of(&local, "20");
        local.toggle_row(row);

        // ...and the same fragment applied from scratch.
        let mut remote = fixture_model("3");
        remote.update(Some(Message::FragmentChanged("#3,20".into())));

        assert_eq!(local.names_in_order(), remote.names_in_order());
        assert_eq!(local.location(), remote.location());

        // Draining the queue changes nothing.
        local.update(None);
        assert_eq!(local.names_in_order(), remote.names_in_order());
    }

    #[test]
    fn non_numeric_names_cannot_stay_selected() {
        let mut model = model_with(&["Name"], &[&["#\u{a0}web"], &["#\u{a0}5"]], "");
        model.update(Some(Message::ClickRow(0)));
        assert_eq!(model.nselected(), 0);
        assert_eq!(model.location().selection().ids().len(), 0);
    }

    #[test]
    fn deselecting_an_absent_id_keeps_fragment() {
        let mut model = model_with(&["Name"], &[&["#\u{a0}5"], &["#\u{a0}6"]], "6");
        // Marker set locally while the fragment does not name the row.
        model.listing.rows[0].selected = true;
        model.toggle_row(view_row_of(&model, "5"));
        assert_eq!(model.location().fragment(), "6");
    }

    #[test]
    fn sorting_by_quantity_puts_biggest_first() {
        let mut model = fixture_model("");
        click_header(&mut model, "Disk space");
        // ∞, 2 TB, 1.5 TB, 500 GB, 50 GB
        assert_eq!(model.names_in_order(), ["12", "7", "41", "3", "20"]);
        assert_eq!(model.last_column(), Some("Disk space"));
        assert_eq!(model.sorted_header(), Some(2));
    }

    #[test]
    fn second_click_reverses_third_restarts() {
        let mut model = fixture_model("");
        click_header(&mut model, "Disk space");
        let ascending: Vec<String> = model.names_in_order().iter().map(|s| s.to_string()).collect();

        click_header(&mut model, "Disk space");
        let mut reversed = ascending.clone();
        reversed.reverse();
        assert_eq!(model.names_in_order(), reversed);
        assert_eq!(model.last_column(), None);

        click_header(&mut model, "Disk space");
        assert_eq!(model.names_in_order(), ascending);
        assert_eq!(model.last_column(), Some("Disk space"));
    }

    #[test]
    fn presorted_column_reverses_on_first_click() {
        let mut model = fixture_model("");
        assert_eq!(model.last_column(), Some("Name"));
        click_header(&mut model, "Name");
        assert_eq!(model.names_in_order(), ["41", "20", "12", "7", "3"]);
        assert_eq!(model.last_column(), None);
    }

    #[test]
    fn sorting_without_initial_marker() {
        let mut model = model_with(
            &["Server", "RAM"],
            &[&["a", "1 GB"], &["b", "4 GB"], &["c", "512 MB"]],
            "",
        );
        assert_eq!(model.sorted_header(), None);
        assert!(model.get_uidata().headers.iter().all(|h| h.sorted.is_none()));

        click_header(&mut model, "RAM");
        assert_eq!(model.names_in_order(), ["b", "a", "c"]);
        assert_eq!(model.sorted_header(), Some(1));
        let marked: Vec<&HeaderView> = model
            .get_uidata()
            .headers
            .iter()
            .filter(|h| h.sorted.is_some())
            .collect();
        assert_eq!(marked.len(), 1);
        assert_eq!(marked[0].name, "RAM");
        assert_eq!(marked[0].sorted, Some(SortMarker::Ascending));
    }

    #[test]
    fn ties_keep_previous_order() {
        let mut model = model_with(
            &["Name", "IRC usage"],
            &[&["1", "No"], &["2", "Yes"], &["3", "No"], &["4", "Yes"]],
            "",
        );
        click_header(&mut model, "IRC usage");
        assert_eq!(model.names_in_order(), ["2", "4", "1", "3"]);
    }

    #[test]
    fn location_sorts_united_states_last() {
        let mut model = fixture_model("");
        click_header(&mut model, "Location");
        assert_eq!(model.names_in_order(), ["41", "7", "12", "3", "20"]);
    }

    #[test]
    fn sorting_keeps_selected_rows_on_top() {
        let mut model = fixture_model("20,7");
        click_header(&mut model, "Disk space");
        assert_eq!(model.names_in_order(), ["7", "20", "12", "41", "3"]);
        assert!(selected_prefix_holds(&model));

        click_header(&mut model, "Disk space");
        assert_eq!(model.names_in_order(), ["20", "7", "3", "41", "12"]);
        assert!(selected_prefix_holds(&model));
    }

    #[test]
    fn link_click_leaves_selection_alone() {
        let mut model = fixture_model("3");
        let provider = model.listing.column_index("Provider").unwrap();
        let row = view_row_of(&model, "7");
        let before = model.location().clone();
        model.update(Some(Message::ClickLink(row, provider)));
        assert_eq!(model.location(), &before);
        assert_eq!(model.nselected(), 1);
        assert_eq!(model.get_uidata().status_message, "Link https://beta.example/");
    }

    #[test]
    fn header_marker_tracks_direction() {
        let mut model = fixture_model("");
        let marker = |m: &Model| {
            m.get_uidata()
                .headers
                .iter()
                .find_map(|h| h.sorted.map(|s| (h.name.clone(), s)))
        };
        assert_eq!(marker(&model), Some(("Name".to_string(), SortMarker::Ascending)));
        click_header(&mut model, "RAM");
        assert_eq!(marker(&model), Some(("RAM".to_string(), SortMarker::Ascending)));
        click_header(&mut model, "RAM");
        assert_eq!(marker(&model), Some(("RAM".to_string(), SortMarker::Descending)));
        let marked = model.get_uidata().headers.iter().filter(|h| h.sorted.is_some()).count();
        assert_eq!(marked, 1);
    }

    #[test]
    fn fragment_can_be_typed() {
        let mut model = fixture_model("");
        model.update(Some(Message::EditFragment));
        assert!(model.raw_keyevents());
        for c in "41,3".chars() {
            model.update(Some(Message::RawKey(KeyEvent::new(
                KeyCode::Char(c),
                KeyModifiers::NONE,
            ))));
        }
        model.update(Some(Message::RawKey(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE))));
        assert!(!model.raw_keyevents());
        assert_eq!(model.location().fragment(), "41,3");
        assert_eq!(model.names_in_order(), ["3", "41", "7", "12", "20"]);
    }

    #[test]
    fn keyboard_toggle_follows_cursor() {
        let mut model = fixture_model("");
        model.update(Some(Message::MoveDown));
        model.update(Some(Message::MoveDown));
        model.update(Some(Message::ToggleRow));
        assert_eq!(model.location().fragment(), "12");
        // The cursor moved with the row to the top.
        assert_eq!(model.get_uidata().abs_selected_row, 0);
    }

    #[test]
    fn help_popup_blocks_table_messages() {
        let mut model = fixture_model("");
        model.update(Some(Message::Help));
        assert!(model.get_uidata().show_popup);
        model.update(Some(Message::ClickRow(0)));
        assert_eq!(model.nselected(), 0);
        model.update(Some(Message::Exit));
        assert!(!model.get_uidata().show_popup);
        model.update(Some(Message::Quit));
        assert_eq!(model.status, Status::QUITTING);
    }

    #[test]
    fn narrow_screen_scrolls_columns() {
        let mut model = fixture_model("");
        model.update(Some(Message::Resize(30, 10)));
        for _ in 0..6 {
            model.update(Some(Message::MoveRight));
        }
        let ui = model.get_uidata();
        assert_eq!(ui.headers[ui.selected_column].name, "Provider");
        assert!(ui.headers.iter().all(|h| h.name != "Name"));
    }

    #[test]
    fn empty_listing_is_harmless() {
        let mut model = model_with(&["Name"], &[], "1,2");
        model.update(Some(Message::ToggleRow));
        model.update(Some(Message::SortColumn));
        model.update(Some(Message::MoveDown));
        assert_eq!(model.nselected(), 0);
        assert_eq!(model.location().fragment(), "1,2");
    }
}
