//! Twice-monthly thinning of calendar dates for long crawls.

use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;

use super::calendar::date_from_url;

const MID_MONTH: u32 = 15;

/// Per `(year, month)`, keep the latest date on or before the 15th and the
/// latest date after it. Output is chronological.
#[cfg(test)]
pub fn sample_dates(dates: &[NaiveDate]) -> Vec<NaiveDate> {
    let tagged: Vec<(NaiveDate, NaiveDate)> = dates.iter().map(|d| (*d, *d)).collect();
    sample_by_date(tagged)
}

/// Same policy applied to detail URLs. URLs without a readable date are dropped.
pub fn sample_urls(urls: &[String]) -> Vec<String> {
    let tagged: Vec<(NaiveDate, String)> = urls
        .iter()
        .filter_map(|u| date_from_url(u).map(|d| (d, u.clone())))
        .collect();
    sample_by_date(tagged)
}

fn sample_by_date<T: Clone + Ord>(items: Vec<(NaiveDate, T)>) -> Vec<T> {
    let mut by_month: BTreeMap<(i32, u32), Vec<(NaiveDate, T)>> = BTreeMap::new();
    for (date, item) in items {
        by_month
            .entry((date.year(), date.month()))
            .or_default()
            .push((date, item));
    }

    let mut out = Vec::new();
    for (_, mut entries) in by_month {
        entries.sort();
        if let Some((_, item)) = entries.iter().filter(|(d, _)| d.day() <= MID_MONTH).last() {
            out.push(item.clone());
        }
        if let Some((_, item)) = entries.iter().filter(|(d, _)| d.day() > MID_MONTH).last() {
            out.push(item.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn keeps_latest_per_half_month() {
        let dates: Vec<_> = [3, 7, 12, 18, 25].iter().map(|&x| d(2020, 1, x)).collect();
        assert_eq!(sample_dates(&dates), vec![d(2020, 1, 12), d(2020, 1, 25)]);
    }

    #[test]
    fn lone_early_date_has_no_second_half() {
        assert_eq!(sample_dates(&[d(2020, 2, 3)]), vec![d(2020, 2, 3)]);
    }

    #[test]
    fn fifteenth_belongs_to_first_half() {
        let dates = vec![d(2020, 3, 15), d(2020, 3, 16)];
        assert_eq!(sample_dates(&dates), dates);
    }

    #[test]
    fn months_are_bucketed_independently_and_sorted() {
        let dates = vec![d(2021, 1, 20), d(2020, 12, 10), d(2020, 12, 1), d(2021, 1, 28)];
        assert_eq!(sample_dates(&dates), vec![d(2020, 12, 10), d(2021, 1, 28)]);
    }

    #[test]
    fn urls_are_sampled_by_embedded_date() {
        let urls: Vec<String> = ["2020-01-03", "2020-01-12", "2020-01-25", "bogus"]
            .iter()
            .map(|s| format!("https://www.zerno.ru/cerealspricesdate/{}/wheat/3", s))
            .collect();
        let kept = sample_urls(&urls);
        assert_eq!(kept, vec![urls[1].clone(), urls[2].clone()]);
    }
}
