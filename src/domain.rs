use std::io::Error;

use derive_setters::Setters;
use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;
use thiserror::Error;

// Everything that can go wrong before the table is on screen.
#[derive(Debug, Error)]
pub enum SVError {
    #[error("io error: {0}")]
    IoError(#[from] Error),
    #[error("polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("loading failed: {0}")]
    LoadingFailed(String),
    #[error("file not found")]
    FileNotFound,
    #[error("permission denied")]
    PermissionDenied,
    #[error("unknown file type")]
    UnknownFileType,
    #[error("no table matching `{0}` in document")]
    NoTable(String),
    #[error("invalid table selector `{0}`")]
    InvalidSelector(String),
    #[error("could not set up logging: {0}")]
    Logging(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    MovePageUp,
    MovePageDown,
    MoveBeginning,
    MoveEnd,
    // Keyboard equivalents of the clicks, acting on the cursor position
    ToggleRow,
    SortColumn,
    FollowLink,
    // Mouse clicks, in view coordinates
    ClickHeader(usize),
    ClickRow(usize),
    ClickLink(usize, usize),
    FragmentChanged(String),
    EditFragment,
    CopyLocation,
    Help,
    Exit,
    Resize(usize, usize),
    RawKey(KeyEvent),
}

#[derive(Debug, Clone, Setters)]
#[setters(prefix = "with_")]
pub struct SVConfig {
    pub event_poll_time: u64,
    pub max_column_width: usize,
    pub table_selector: String,
    pub presorted_column: String,
    pub clipboard: bool,
}

impl Default for SVConfig {
    fn default() -> Self {
        Self {
            event_poll_time: 100,
            max_column_width: 32,
            table_selector: "table".to_string(),
            presorted_column: "Name".to_string(),
            clipboard: true,
        }
    }
}

pub const HELP_TEXT: &str = "\
Navigation
  ←↓↑→ / hjkl     move cursor
  PgUp / PgDn     move a page
  g / G           first / last row

Listing
  space           toggle selection of the row (row click)
  s / enter       sort by the cursor column (header click)
                  sorting the same column again reverses it
  o               follow the link in the cursor cell
  #               edit the selection fragment
  y               copy the location to the clipboard

Mouse
  click header    sort by that column
  click row       toggle selection
  click link      follow link, selection is untouched

  ?               this help
  esc             close popup / cancel input
  q               quit and print the location";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_setters_chain() {
        let cfg = SVConfig::default()
            .with_presorted_column("Location".to_string())
            .with_clipboard(false)
            .with_max_column_width(12);
        assert_eq!(cfg.presorted_column, "Location");
        assert!(!cfg.clipboard);
        assert_eq!(cfg.max_column_width, 12);
        assert_eq!(cfg.event_poll_time, 100);
    }

    #[test]
    fn io_errors_convert() {
        let err: SVError = Error::other("boom").into();
        assert!(matches!(err, SVError::IoError(_)));
        assert_eq!(err.to_string(), "io error: boom");
    }
}
