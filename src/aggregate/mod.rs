//! Grouped mean prices over a finalized dataset.

use crate::config::GroupBy;
use crate::models::{CityMean, PriceRow};
use std::collections::BTreeMap;
use tracing::info;

type GroupKey = (Option<String>, String, Option<u8>);

/// Arithmetic mean price per group, highest first (ties by city name).
/// Rows without a numeric price are left out of the statistics only.
pub fn group_means(rows: &[PriceRow], group_by: GroupBy) -> Vec<CityMean> {
    let mut acc: BTreeMap<GroupKey, (f64, usize)> = BTreeMap::new();

    for row in rows {
        let Some(price) = row.price.filter(|p| p.is_finite()) else {
            continue;
        };
        let key = match group_by {
            GroupBy::City => (None, row.city.clone(), None),
            GroupBy::CityGrade => (None, row.city.clone(), row.grade),
            GroupBy::CropCityGrade => (Some(row.crop_code.clone()), row.city.clone(), row.grade),
        };
        let slot = acc.entry(key).or_insert((0.0, 0));
        slot.0 += price;
        slot.1 += 1;
    }

    let mut means: Vec<CityMean> = acc
        .into_iter()
        .map(|((crop_code, city, grade), (sum, n))| CityMean {
            crop_code,
            city,
            grade,
            mean_price: sum / n as f64,
            observations: n,
        })
        .collect();

    means.sort_by(|a, b| {
        b.mean_price
            .total_cmp(&a.mean_price)
            .then_with(|| a.city.cmp(&b.city))
    });
    means
}

/// Log the top `n` groups the way the run summary shows them.
pub fn log_top(means: &[CityMean], n: usize) {
    info!("Top {} by mean price (руб/т):", n.min(means.len()));
    for m in means.iter().take(n) {
        let grade = m.grade.map(|g| format!(" класс {}", g)).unwrap_or_default();
        let crop = m.crop_code.as_deref().map(|c| format!("[{}] ", c)).unwrap_or_default();
        info!("  {}{}{}: {:.2} ({} obs)", crop, m.city, grade, m.mean_price, m.observations);
    }
}
