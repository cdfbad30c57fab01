use crate::error::ScrapeError;
use scraper::{ElementRef, Html};
use std::collections::BTreeMap;

use super::parse_selector;

/// Body rows of one table with `colspan`/`rowspan` expanded, so a column
/// index means the same thing in every row. Header rows are dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableGrid {
    pub rows: Vec<Vec<String>>,
}

// Upper bound on spans; protects against `rowspan="100000"`.
const MAX_SPAN: usize = 256;

/// Parse the outer HTML of a single `<table>` into a grid of cell texts.
pub fn parse_table(table_html: &str) -> Result<TableGrid, ScrapeError> {
    let doc = Html::parse_fragment(table_html);
    let table_sel = parse_selector("table")?;
    let tr_sel = parse_selector("tr")?;

    let table = doc
        .select(&table_sel)
        .next()
        .ok_or_else(|| ScrapeError::parse("markup contains no <table>"))?;

    // column → (text, rows still covered)
    let mut pending: BTreeMap<usize, (String, usize)> = BTreeMap::new();
    let mut rows = Vec::new();

    for tr in table.select(&tr_sel) {
        if !owned_by(&tr, &table) {
            continue;
        }

        let cells: Vec<ElementRef> = tr
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|c| matches!(c.value().name(), "td" | "th"))
            .collect();

        let is_header = in_thead(&tr) || (!cells.is_empty() && cells.iter().all(|c| c.value().name() == "th"));

        let mut row: Vec<String> = Vec::new();
        let mut col = 0usize;

        for cell in &cells {
            fill_spanned(&mut pending, &mut row, &mut col);

            let text = cell_text(cell);
            let colspan = span_attr(cell, "colspan");
            let rowspan = span_attr(cell, "rowspan");

            for _ in 0..colspan {
                row.push(text.clone());
                if rowspan > 1 {
                    pending.insert(col, (text.clone(), rowspan - 1));
                }
                col += 1;
            }
        }

        // Spans reaching past the last explicit cell of this row.
        if let Some(&last) = pending.keys().next_back() {
            while col <= last {
                if pending.contains_key(&col) {
                    fill_spanned(&mut pending, &mut row, &mut col);
                } else {
                    row.push(String::new());
                    col += 1;
                }
            }
        }

        if !is_header && !row.is_empty() {
            rows.push(row);
        }
    }

    Ok(TableGrid { rows })
}

fn fill_spanned(pending: &mut BTreeMap<usize, (String, usize)>, row: &mut Vec<String>, col: &mut usize) {
    while let Some((text, left)) = pending.get_mut(col) {
        row.push(text.clone());
        *left -= 1;
        if *left == 0 {
            pending.remove(col);
        }
        *col += 1;
    }
}

fn cell_text(cell: &ElementRef) -> String {
    cell.text()
        .flat_map(|t| t.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

fn span_attr(cell: &ElementRef, name: &str) -> usize {
    cell.value()
        .attr(name)
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(1)
        .clamp(1, MAX_SPAN)
}

/// True when `table` is the nearest enclosing table of `tr`.
fn owned_by(tr: &ElementRef, table: &ElementRef) -> bool {
    tr.ancestors()
        .find(|n| n.value().as_element().is_some_and(|e| e.name() == "table"))
        .is_some_and(|n| n.id() == table.id())
}

fn in_thead(tr: &ElementRef) -> bool {
    tr.ancestors()
        .filter_map(|n| n.value().as_element())
        .take_while(|e| e.name() != "table")
        .any(|e| e.name() == "thead")
}
