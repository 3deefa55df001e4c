//! Input parsing.
//!
//! Turns uploads (delimited text or JSON records) into a polars
//! [`DataFrame`](polars::prelude::DataFrame) and defines the tagged
//! [`CellValue`] model used wherever cells leave the frame.

mod loader;
mod value;

pub use loader::{
    CleanRequest, load_csv_bytes, load_csv_path, parse_clean_request, records_from_json,
};
pub use value::{
    CellValue, TIMESTAMP_FORMAT, cells_to_series, format_timestamp, frame_to_records,
    series_to_cells,
};
