use crate::error::ScrapeError;
use crate::models::{PageContext, PriceRow};
use tracing::debug;

use super::parsers::parse_table;

/// Rows denominated in roubles per tonne carry this literal in some cell.
pub const CURRENCY_MARKER: &str = "руб/т";

/// Price column of each grade block. A wide table lays the blocks side by
/// side after `{city, currency}`: price, change, change %, trend.
const GRADE_PRICE_OFFSETS: [(u8, usize); 3] = [(3, 2), (4, 6), (5, 10)];

/// Ungraded crops use the first block.
pub const DEFAULT_PRICE_OFFSET: usize = 2;

// ── Parsers ───────────────────────────────────────────────────────────────────

/// Parse a number written with a decimal comma and space thousands groups.
/// "12 345,67" → 12345.67 | "—" → None
pub fn parse_locale_number(s: &str) -> Option<f64> {
    let cleaned: String = s
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == '−' { '-' } else { c })
        .collect();

    if cleaned.is_empty() || (cleaned.contains(',') && cleaned.contains('.')) {
        return None;
    }
    if !cleaned
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-' | '+'))
    {
        return None;
    }

    let v: f64 = cleaned.replacen(',', ".", 1).parse().ok()?;
    v.is_finite().then_some(v)
}

/// Column holding the price for `grade`. `None` for a grade the table layout
/// has no block for.
pub fn price_offset(grade: Option<u8>) -> Option<usize> {
    match grade {
        None => Some(DEFAULT_PRICE_OFFSET),
        Some(g) => GRADE_PRICE_OFFSETS
            .iter()
            .find(|(grade, _)| *grade == g)
            .map(|(_, offset)| *offset),
    }
}

// ── Table → PriceRow ──────────────────────────────────────────────────────────

/// Turn one located table into price rows for the page context.
///
/// Only rows marked with [`CURRENCY_MARKER`] survive. The city comes from the
/// first column and the price from the grade's block; an unparsable price
/// cell yields a row with `price: None`.
pub fn normalize_table(table_html: &str, ctx: &PageContext) -> Result<Vec<PriceRow>, ScrapeError> {
    let offset = price_offset(ctx.grade).ok_or_else(|| {
        ScrapeError::parse(format!("no price column known for grade {:?}", ctx.grade))
    })?;

    let grid = parse_table(table_html)?;

    let priced: Vec<&Vec<String>> = grid
        .rows
        .iter()
        .filter(|row| row.iter().any(|cell| cell.contains(CURRENCY_MARKER)))
        .collect();

    if priced.is_empty() {
        return Err(ScrapeError::parse(format!("no rows marked {}", CURRENCY_MARKER)));
    }

    let width = priced.iter().map(|r| r.len()).max().unwrap_or(0);
    if width <= offset {
        return Err(ScrapeError::parse(format!(
            "table has {} columns, price column {} out of range",
            width, offset
        )));
    }

    let mut out = Vec::with_capacity(priced.len());
    for row in priced {
        let Some(cell) = row.get(offset) else {
            debug!("{}: short row skipped: {:?}", ctx.source_url, row);
            continue;
        };
        out.push(PriceRow {
            city: row[0].trim().to_string(),
            price: parse_locale_number(cell),
            date: ctx.date,
            year: ctx.year,
            crop_name: ctx.crop_name.clone(),
            crop_code: ctx.crop_code.clone(),
            grade: ctx.grade,
            currency_marked: true,
            source_url: ctx.source_url.clone(),
        });
    }

    Ok(out)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ctx(grade: Option<u8>) -> PageContext {
        PageContext {
            date: NaiveDate::from_ymd_opt(2020, 1, 9).unwrap(),
            year: 2020,
            crop_code: "wheat".into(),
            crop_name: "Пшеница".into(),
            grade,
            source_url: "https://www.zerno.ru/cerealspricesdate/2020-01-09/wheat/3".into(),
        }
    }

    /// `[City, Currency, G3, _, _, _, G4, _, _, _, G5]` plus a dollar row.
    const WIDE: &str = r#"<table>
        <tr><th>Город</th><th>Валюта</th><th colspan="4">Класс 3</th>
            <th colspan="4">Класс 4</th><th colspan="4">Класс 5</th></tr>
        <tr><td rowspan="2">Краснодар</td><td>руб/т</td>
            <td>12 345,67</td><td>+50</td><td>0,4</td><td>↑</td>
            <td>11 900</td><td>0</td><td>0</td><td>=</td>
            <td>11 100</td><td>-20</td><td>-0,2</td><td>↓</td></tr>
        <tr><td>$/т</td>
            <td>200</td><td>1</td><td>0,5</td><td>↑</td>
            <td>193</td><td>0</td><td>0</td><td>=</td>
            <td>180</td><td>0</td><td>0</td><td>=</td></tr>
        <tr><td>Ростов-на-Дону</td><td>руб/т</td>
            <td>—</td><td></td><td></td><td></td>
            <td>12&nbsp;050</td><td>0</td><td>0</td><td>=</td>
            <td>11 300</td><td>0</td><td>0</td><td>=</td></tr>
        </table>"#;

    #[test]
    fn test_parse_locale_number() {
        assert_eq!(parse_locale_number("12 345,67"), Some(12345.67));
        assert_eq!(parse_locale_number("12\u{a0}050"), Some(12050.0));
        assert_eq!(parse_locale_number("-0,2"), Some(-0.2));
        assert_eq!(parse_locale_number("−15"), Some(-15.0));
        assert_eq!(parse_locale_number("—"), None);
        assert_eq!(parse_locale_number("н/д"), None);
        assert_eq!(parse_locale_number(""), None);
        assert_eq!(parse_locale_number("NaN"), None);
        assert_eq!(parse_locale_number("1.234,5"), None);
    }

    #[test]
    fn test_price_offset_lookup() {
        assert_eq!(price_offset(Some(3)), Some(2));
        assert_eq!(price_offset(Some(4)), Some(6));
        assert_eq!(price_offset(Some(5)), Some(10));
        assert_eq!(price_offset(None), Some(2));
        assert_eq!(price_offset(Some(1)), None);
    }

    #[test]
    fn grade_selects_its_block() {
        let g3 = normalize_table(WIDE, &ctx(Some(3))).unwrap();
        assert_eq!(g3.len(), 2);
        assert_eq!(g3[0].city, "Краснодар");
        assert_eq!(g3[0].price, Some(12345.67));
        assert_eq!(g3[1].city, "Ростов-на-Дону");
        assert_eq!(g3[1].price, None);

        let g4 = normalize_table(WIDE, &ctx(Some(4))).unwrap();
        assert_eq!(g4[0].price, Some(11900.0));
        assert_eq!(g4[1].price, Some(12050.0));

        let g5 = normalize_table(WIDE, &ctx(Some(5))).unwrap();
        assert_eq!(g5[0].price, Some(11100.0));
        assert_eq!(g5[0].grade, Some(5));
    }

    #[test]
    fn no_grade_uses_first_block() {
        let rows = normalize_table(WIDE, &ctx(None)).unwrap();
        assert_eq!(rows[0].price, Some(12345.67));
        assert_eq!(rows[0].grade, None);
    }

    #[test]
    fn rows_carry_page_metadata() {
        let rows = normalize_table(WIDE, &ctx(Some(3))).unwrap();
        let r = &rows[0];
        assert_eq!(r.date.to_string(), "2020-01-09");
        assert_eq!(r.year, 2020);
        assert_eq!(r.crop_code, "wheat");
        assert_eq!(r.crop_name, "Пшеница");
        assert!(r.currency_marked);
        assert!(r.source_url.contains("cerealspricesdate"));
    }

    #[test]
    fn narrow_table_is_rejected() {
        let narrow = "<table><tr><td>Курск</td><td>руб/т</td><td>11 000</td></tr></table>";
        assert!(normalize_table(narrow, &ctx(Some(3))).is_ok());
        assert!(matches!(
            normalize_table(narrow, &ctx(Some(5))),
            Err(ScrapeError::Parse(_))
        ));
    }

    #[test]
    fn unknown_grade_is_rejected() {
        assert!(normalize_table(WIDE, &ctx(Some(2))).is_err());
    }

    #[test]
    fn table_without_rouble_rows_is_rejected() {
        let usd = "<table><tr><td>Курск</td><td>$/т</td><td>180</td></tr></table>";
        assert!(normalize_table(usd, &ctx(None)).is_err());
    }
}
