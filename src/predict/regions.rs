/// Region assigned to cities missing from [`CITY_REGIONS`].
pub const OTHER_REGION: &str = "Другой регион";

/// Price-report cities and the federal subject they belong to.
pub const CITY_REGIONS: &[(&str, &str)] = &[
    ("Волгоград", "Волгоградская область"),
    ("Воронеж", "Воронежская область"),
    ("Краснодар", "Краснодарский край"),
    ("Новороссийск", "Краснодарский край"),
    ("Тамань", "Краснодарский край"),
    ("Курск", "Курская область"),
    ("Липецк", "Липецкая область"),
    ("Орел", "Орловская область"),
    ("Ростов-на-Дону", "Ростовская область"),
    ("Азов", "Ростовская область"),
    ("Таганрог", "Ростовская область"),
    ("Ставрополь", "Ставропольский край"),
];

pub fn region_for(city: &str) -> &'static str {
    let city = city.trim();
    CITY_REGIONS
        .iter()
        .find(|(c, _)| *c == city)
        .map(|(_, r)| *r)
        .unwrap_or(OTHER_REGION)
}
