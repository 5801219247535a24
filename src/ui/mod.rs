//! Plain-text rendering of presenter output for the terminal.

use std::fmt::Write as _;

use unicode_width::UnicodeWidthStr;

use crate::app::state::{Notice, NoticeLevel};
use crate::model::Tag;
use crate::present::{Affordances, ContactRow, GridView, ListView, TagEntry, TagLegend};

const COLUMN_GAP: &str = "  ";
const EMPTY_CELL: &str = "-";

pub fn render_list(view: &ListView, tags: &[Tag]) -> String {
    let mut out = String::new();
    let heading = match view.active_filter {
        Some(id) => {
            let label = tags
                .iter()
                .find(|tag| tag.id == id)
                .map(|tag| tag.name.as_str())
                .unwrap_or("unknown tag");
            format!(
                "Contacts tagged {label} ({} of {})",
                view.rows.len(),
                view.total
            )
        }
        None => format!("Contacts ({})", view.total),
    };
    let _ = writeln!(out, "{heading}  {}", affordance_line(&view.affordances));
    if view.rows.is_empty() {
        out.push_str("No contacts found.\n");
        return out;
    }
    let date_header = format!("Date {}", view.sort_indicator);
    let rows: Vec<Vec<String>> = view.rows.iter().map(contact_cells).collect();
    out.push_str(&table(&["Name", &date_header, "Tag", "Color"], &rows));
    out
}

pub fn render_grid(view: &GridView) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Contacts by tag ({})  {}",
        view.total,
        affordance_line(&view.affordances)
    );
    if view.groups.is_empty() {
        out.push_str("No contacts found.\n");
        return out;
    }
    let date_header = format!("Date {}", view.sort_indicator);
    for group in &view.groups {
        let _ = writeln!(
            out,
            "\n{} ({}) {}",
            group.label,
            group.count(),
            group.color
        );
        let rows: Vec<Vec<String>> = group
            .rows
            .iter()
            .map(|row| vec![row.name.clone(), row.date.clone()])
            .collect();
        out.push_str(&table(&["Name", &date_header], &rows));
    }
    out
}

pub fn render_legend(legend: &TagLegend) -> String {
    let mut out = String::from("Tags\n");
    let rows: Vec<Vec<String>> = legend
        .entries
        .iter()
        .map(|entry| match entry {
            TagEntry::All { active } => vec![
                marker(*active).to_owned(),
                String::new(),
                entry.label().to_owned(),
                String::new(),
            ],
            TagEntry::Tag(item) => vec![
                marker(item.active).to_owned(),
                item.id.to_string(),
                item.name.clone(),
                item.color.clone(),
            ],
        })
        .collect();
    out.push_str(&table(&["", "Id", "Name", "Color"], &rows));
    if let Some(placeholder) = legend.placeholder {
        let _ = writeln!(out, "{placeholder}");
    }
    if legend.add_enabled {
        let _ = writeln!(out, "[{}]", legend.add_label);
    } else {
        let _ = writeln!(out, "[{}] unavailable", legend.add_label);
    }
    out
}

pub fn render_notice(notice: &Notice) -> String {
    match (notice.level, notice.kind) {
        (NoticeLevel::Error, Some(kind)) => format!("error ({kind}): {}", notice.message),
        (NoticeLevel::Error, None) => format!("error: {}", notice.message),
        (NoticeLevel::Info, _) => notice.message.clone(),
    }
}

fn marker(active: bool) -> &'static str {
    if active {
        "*"
    } else {
        ""
    }
}

fn affordance_line(affordances: &Affordances) -> String {
    if affordances.add_enabled {
        format!("[{}]", affordances.add_label)
    } else {
        format!("[{}] unavailable", affordances.add_label)
    }
}

fn contact_cells(row: &ContactRow) -> Vec<String> {
    vec![
        row.name.clone(),
        row.date.clone(),
        row.tag_label
            .clone()
            .unwrap_or_else(|| EMPTY_CELL.to_owned()),
        row.tag_color.clone(),
    ]
}

/// Left-aligned columns padded by display width, so wide glyphs line up.
fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.width()).collect();
    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(idx) {
                *width = (*width).max(cell.width());
            }
        }
    }
    let mut out = String::new();
    let header_cells: Vec<String> = headers.iter().map(|h| (*h).to_owned()).collect();
    push_row(&mut out, &header_cells, &widths);
    for row in rows {
        push_row(&mut out, row, &widths);
    }
    out
}

fn push_row(out: &mut String, cells: &[String], widths: &[usize]) {
    let mut line = String::new();
    for (idx, cell) in cells.iter().enumerate() {
        if idx > 0 {
            line.push_str(COLUMN_GAP);
        }
        line.push_str(cell);
        let width = widths.get(idx).copied().unwrap_or(0);
        line.extend(std::iter::repeat(' ').take(width.saturating_sub(cell.width())));
    }
    out.push_str(line.trim_end());
    out.push('\n');
}
