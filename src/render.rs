//! ASCII rendering of tables for the terminal.
//!
//! Numeric columns are right-aligned; everything else is left-aligned.
//! Control characters inside cells are flattened to spaces and ANSI colour
//! sequences do not count towards column widths.

use std::borrow::Cow;
use std::fmt::Write as _;

use crate::{error::Result, table::Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Left,
    Right,
}

/// Renders `table` with a `name (type)` header, up to `limit` rows.
pub fn render(table: &Table, limit: Option<usize>) -> Result<String> {
    let headers = table
        .columns()
        .iter()
        .map(|column| format!("{} ({})", column.name(), column.datatype()))
        .collect::<Vec<_>>();
    let aligns = table
        .columns()
        .iter()
        .map(|column| {
            if column.datatype().is_numeric() {
                Align::Right
            } else {
                Align::Left
            }
        })
        .collect::<Vec<_>>();
    let mut rows = table.to_string_rows()?;
    if let Some(limit) = limit {
        rows.truncate(limit);
    }
    Ok(render_rows(&headers, &rows, &aligns))
}

pub fn render_rows(headers: &[String], rows: &[Vec<String>], aligns: &[Align]) -> String {
    let column_count = headers.len();
    let mut widths = headers.iter().map(|h| display_width(h)).collect::<Vec<_>>();
    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(display_width(cell));
        }
    }
    for width in &mut widths {
        *width = (*width).max(1);
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(headers, &widths, &[]));
    let separator = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&separator, &widths, &[]));
    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, &widths, aligns));
    }
    output
}

pub fn print_rows(headers: &[String], rows: &[Vec<String>]) {
    print!("{}", render_rows(headers, rows, &[]));
}

fn format_row(values: &[String], widths: &[usize], aligns: &[Align]) -> String {
    let cells = values
        .iter()
        .zip(widths)
        .enumerate()
        .map(|(idx, (value, width))| {
            let sanitized = sanitize_cell(value);
            let padding = " ".repeat(width.saturating_sub(display_width(&sanitized)));
            match aligns.get(idx).copied().unwrap_or_default() {
                Align::Left => format!("{sanitized}{padding}"),
                Align::Right => format!("{padding}{sanitized}"),
            }
        })
        .collect::<Vec<_>>();
    cells.join("  ").trim_end().to_string()
}

fn display_width(value: &str) -> usize {
    let mut width = 0usize;
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch == '\u{1b}' {
            for next in chars.by_ref() {
                if next == 'm' {
                    break;
                }
            }
        } else {
            width += 1;
        }
    }
    width
}

fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_columns_are_right_aligned() {
        let mut table = Table::new();
        table.set_columns([("name", "string"), ("qty", "int")]).unwrap();
        table.add_raw_row([("name", "bolt"), ("qty", "7")]).unwrap();
        table.add_raw_row([("name", "nut"), ("qty", "120")]).unwrap();
        let rendered = render(&table, None).unwrap();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(
            lines,
            vec![
                "name (string)  qty (int)",
                "-------------  ---------",
                "bolt                   7",
                "nut                  120",
            ]
        );
    }

    #[test]
    fn limit_truncates_rows() {
        let mut table = Table::new();
        table.set_columns([("n", "int")]).unwrap();
        for value in ["1", "2", "3"] {
            table.add_raw_row([("n", value)]).unwrap();
        }
        assert_eq!(render(&table, Some(1)).unwrap().lines().count(), 3);
    }

    #[test]
    fn control_characters_and_ansi_sequences_do_not_break_layout() {
        let headers = vec!["note".to_string(), "status".to_string()];
        let rows = vec![vec![
            "line1\nline2".to_string(),
            "\u{1b}[31mERR\u{1b}[0m".to_string(),
        ]];
        let rendered = render_rows(&headers, &rows, &[]);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[2], "line1 line2  \u{1b}[31mERR\u{1b}[0m");
    }
}
