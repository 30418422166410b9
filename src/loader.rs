use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Instant;

use polars::prelude::*;
use rayon::prelude::*;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, instrument};

use crate::domain::{SVConfig, SVError};
use crate::listing::{Cell, Link, Listing, Row};

static SUPERSCRIPT: LazyLock<Selector> = LazyLock::new(|| Selector::parse("sup").unwrap());
static LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

const SORTED_CLASS: &str = "sorted";

#[derive(Debug, PartialEq)]
enum FileType {
    HTML,
    CSV,
    PARQUET,
    ARROW,
}

#[derive(Debug)]
struct FileInfo {
    path: PathBuf,
    file_size: u64,
    file_type: FileType,
}

/// Reads the listing at `path`, picking the reader from the file extension.
#[instrument(skip(config), fields(selector = %config.table_selector))]
pub fn load(path: &Path, config: &SVConfig) -> Result<Listing, SVError> {
    let file_info = get_file_info(path)?;
    debug!("Loading {:?}", file_info);
    let start_time = Instant::now();

    let listing = match file_info.file_type {
        FileType::HTML => {
            let document = fs::read_to_string(&file_info.path)?;
            load_html(&document, &config.table_selector)?
        }
        FileType::CSV => load_frame(load_csv(&file_info.path)?)?,
        FileType::PARQUET => load_frame(load_parquet(&file_info.path)?)?,
        FileType::ARROW => load_frame(load_arrow(&file_info.path)?)?,
    };

    info!(
        "Loaded {} rows x {} columns ({} bytes) in {}ms",
        listing.nrows(),
        listing.ncolumns(),
        file_info.file_size,
        start_time.elapsed().as_millis()
    );
    Ok(listing)
}

fn detect_file_type(path: &Path) -> Result<FileType, SVError> {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_uppercase())
        .as_deref()
    {
        Some("HTML") | Some("HTM") => Ok(FileType::HTML),
        Some("CSV") => Ok(FileType::CSV),
        Some("PARQUET") | Some("PQ") => Ok(FileType::PARQUET),
        Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileType::ARROW),
        _ => Err(SVError::UnknownFileType),
    }
}

fn get_file_info(path: &Path) -> Result<FileInfo, SVError> {
    let metadata = fs::metadata(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => SVError::FileNotFound,
        ErrorKind::PermissionDenied => SVError::PermissionDenied,
        _ => SVError::IoError(e),
    })?;
    if !metadata.is_file() {
        return Err(SVError::LoadingFailed("Not a file!".into()));
    }

    Ok(FileInfo {
        path: path.to_path_buf(),
        file_size: metadata.len(),
        file_type: detect_file_type(path)?,
    })
}

/// Reads the first table matching `table_selector`.
///
/// Rows are the `tr` children of the table's first `tbody` (or of the table
/// itself when it has none) that carry `td` cells, so footers and nested
/// tables stay out. Headers are the `th` cells of the first row with any,
/// looking in `thead` first. A header with the `sorted` class becomes the
/// initially sorted header.
pub fn load_html(document: &str, table_selector: &str) -> Result<Listing, SVError> {
    let selector = Selector::parse(table_selector).map_err(|e| {
        debug!("Selector error: {e:?}");
        SVError::InvalidSelector(table_selector.to_string())
    })?;
    let document = Html::parse_document(document);
    let table = document
        .select(&selector)
        .next()
        .ok_or_else(|| SVError::NoTable(table_selector.to_string()))?;
    let body = child_elements(table, "tbody").next().unwrap_or(table);

    let header_row = child_elements(table, "thead")
        .flat_map(|head| child_elements(head, "tr"))
        .chain(child_elements(body, "tr"))
        .find(|tr| child_elements(*tr, "th").next().is_some());

    let mut headers = Vec::new();
    let mut sorted_header = None;
    if let Some(tr) = header_row {
        for (idx, th) in child_elements(tr, "th").enumerate() {
            if th.value().classes().any(|c| c == SORTED_CLASS) {
                sorted_header = Some(idx);
            }
            headers.push(th.text().collect::<String>().trim().to_string());
        }
    }

    let rows: Vec<Row> = child_elements(body, "tr")
        .map(|tr| child_elements(tr, "td").map(read_cell).collect::<Vec<Cell>>())
        .filter(|cells| !cells.is_empty())
        .map(Row::new)
        .collect();

    if headers.is_empty() && rows.is_empty() {
        return Err(SVError::LoadingFailed("table has neither headers nor rows".into()));
    }

    Ok(Listing {
        headers,
        rows,
        sorted_header,
    })
}

fn child_elements<'a>(parent: ElementRef<'a>, name: &'static str) -> impl Iterator<Item = ElementRef<'a>> {
    parent
        .children()
        .filter_map(ElementRef::wrap)
        .filter(move |el| el.value().name() == name)
}

fn read_cell(td: ElementRef) -> Cell {
    let full_text = td.text().collect::<String>().trim().to_string();

    // First child carrying content; the superscript lives after it.
    let text = td
        .children()
        .find_map(|node| match node.value().as_text() {
            Some(text) => {
                let text = text.trim();
                (!text.is_empty()).then(|| text.to_string())
            }
            None => ElementRef::wrap(node).map(|el| el.text().collect::<String>().trim().to_string()),
        })
        .unwrap_or_default();

    let superscript = td
        .select(&SUPERSCRIPT)
        .next()
        .map(|sup| sup.text().collect::<String>().trim().to_string());

    let links = td
        .select(&LINK)
        .filter_map(|a| {
            a.value().attr("href").map(|href| Link {
                text: a.text().collect::<String>().trim().to_string(),
                href: href.to_string(),
            })
        })
        .collect();

    Cell {
        text,
        full_text,
        superscript,
        links,
    }
}

// Load dataframe columns using rayon with data parallelism, every value is
// kept as text.
fn load_frame(frame: LazyFrame) -> Result<Listing, SVError> {
    let df = frame.collect()?;
    let headers: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();

    let columns: Result<Vec<Vec<String>>, PolarsError> = headers
        .par_iter()
        .map(|name| load_column(&df, name))
        .collect();
    let columns = columns?;

    let rows = (0..df.height())
        .map(|ridx| {
            Row::new(
                columns
                    .iter()
                    .map(|column| Cell::plain(&column[ridx]))
                    .collect(),
            )
        })
        .collect();

    Ok(Listing::new(headers, rows))
}

fn load_column(df: &DataFrame, col_name: &str) -> Result<Vec<String>, PolarsError> {
    let col = df.column(col_name)?.cast(&DataType::String)?;
    let series = col.str()?;
    Ok(series
        .into_iter()
        .map(|value| value.map(|s| s.replace("\r\n", " ").replace('\n', " ")).unwrap_or_default())
        .collect())
}

fn load_csv(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyCsvReader::new(PlPath::Local(path.into()))
        .with_has_header(true)
        .finish()
}

fn load_parquet(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_parquet(PlPath::Local(path.into()), ScanArgsParquet::default())
}

fn load_arrow(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_ipc(
        PlPath::Local(path.into()),
        polars::io::ipc::IpcScanOptions,
        UnifiedScanArgs::default(),
    )
}
