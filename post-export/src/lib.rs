//! Spreadsheet export of crawled posts.
//!
//! Every export rewrites the whole workbook, so the file on disk always
//! matches the record set passed in the latest call.

use crawler_core::{CoreError, ExportError, Post, PostSink, TimelinePost};
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[cfg(test)]
mod tests;

pub const POST_COLUMNS: [&str; 10] = [
    "wid",
    "user_name",
    "user_id",
    "gender",
    "publish_time",
    "text",
    "like_count",
    "comment_count",
    "forward_count",
    "origin_publish_time",
];

pub const TIMELINE_COLUMNS: [&str; 7] = [
    "user_id",
    "id",
    "text",
    "publish_time",
    "like_count",
    "comment_count",
    "forward_count",
];

const PUBLISH_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Longest string Excel stores in one cell, in characters.
pub const MAX_CELL_CHARS: usize = 32_767;

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(u64),
}

/// One spreadsheet row per record, in column order.
pub trait ToRow {
    fn to_row(&self) -> Vec<Cell>;
}

impl ToRow for Post {
    fn to_row(&self) -> Vec<Cell> {
        vec![
            Cell::Text(self.id.clone()),
            Cell::Text(self.user_name.clone()),
            Cell::Number(self.user_id),
            Cell::Text(self.gender.clone()),
            // wall-clock time as published, offset dropped
            Cell::Text(self.publish_time.format(PUBLISH_TIME_FORMAT).to_string()),
            Cell::Text(self.text.clone()),
            Cell::Number(self.like_count),
            Cell::Number(self.comment_count),
            Cell::Number(self.forward_count),
            Cell::Text(self.origin_publish_time.clone()),
        ]
    }
}

impl ToRow for TimelinePost {
    fn to_row(&self) -> Vec<Cell> {
        vec![
            Cell::Number(self.user_id),
            Cell::Text(self.id.clone()),
            Cell::Text(self.text.clone()),
            Cell::Text(self.publish_time.format(PUBLISH_TIME_FORMAT).to_string()),
            Cell::Number(self.like_count),
            Cell::Number(self.comment_count),
            Cell::Number(self.forward_count),
        ]
    }
}

/// Writes `<output_dir>/<name>.xlsx` workbooks.
#[derive(Debug, Clone)]
pub struct XlsxExporter {
    output_dir: PathBuf,
}

impl XlsxExporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn path_for(&self, name: &str) -> Result<PathBuf, CoreError> {
        let file_stem = sanitize_file_stem(name);
        if file_stem.is_empty() {
            return Err(ExportError::InvalidPath {
                path: name.to_string(),
            }
            .into());
        }
        Ok(self.output_dir.join(format!("{}.xlsx", file_stem)))
    }

    /// Replace the workbook for `name` with `columns` and one row per record.
    pub fn export<R: ToRow>(
        &self,
        name: &str,
        columns: &[&str],
        records: &[R],
    ) -> Result<PathBuf, CoreError> {
        let path = self.path_for(name)?;
        std::fs::create_dir_all(&self.output_dir)?;

        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        write_sheet(worksheet, columns, records).map_err(ExportError::from)?;
        workbook.save(&path).map_err(ExportError::from)?;

        debug!("Wrote {} rows to {}", records.len(), path.display());
        Ok(path)
    }
}

fn write_sheet<R: ToRow>(
    worksheet: &mut Worksheet,
    columns: &[&str],
    records: &[R],
) -> Result<(), XlsxError> {
    let header = Format::new().set_bold();
    for (col, name) in columns.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *name, &header)?;
    }

    for (index, record) in records.iter().enumerate() {
        let row = index as u32 + 1;
        for (col, cell) in record.to_row().into_iter().enumerate() {
            match cell {
                Cell::Text(value) => {
                    worksheet.write_string(row, col as u16, fit_cell_text(value, row, col))?
                }
                Cell::Number(value) => worksheet.write_number(row, col as u16, value as f64)?,
            };
        }
    }
    Ok(())
}

/// Cut `value` to [`MAX_CELL_CHARS`] on a char boundary. Expanded long
/// texts carry markup for every emoji and link and can run past the limit.
fn fit_cell_text(mut value: String, row: u32, col: usize) -> String {
    if let Some((cut, _)) = value.char_indices().nth(MAX_CELL_CHARS) {
        warn!(
            "Truncating cell at row {} column {} from {} to {} characters",
            row,
            col,
            value.chars().count(),
            MAX_CELL_CHARS
        );
        value.truncate(cut);
    }
    value
}

impl PostSink for XlsxExporter {
    fn write_posts(&mut self, keyword: &str, posts: &[Post]) -> Result<(), CoreError> {
        let path = self.export(keyword, &POST_COLUMNS, posts)?;
        info!("Exported {} posts to {}", posts.len(), path.display());
        Ok(())
    }

    fn write_timeline(&mut self, uid: u64, posts: &[TimelinePost]) -> Result<(), CoreError> {
        let path = self.export(&uid.to_string(), &TIMELINE_COLUMNS, posts)?;
        info!("Exported {} timeline posts to {}", posts.len(), path.display());
        Ok(())
    }
}

/// Keyword as a file name: path separators and characters that common
/// filesystems reject become `_`.
pub fn sanitize_file_stem(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if cleaned.chars().all(|c| c == '.') {
        String::new()
    } else {
        cleaned
    }
}
