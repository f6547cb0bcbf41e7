use std::cmp::Ordering;

use crate::models::Provider;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    PriceLowToHigh,
    Rating,
    Area,
    Service,
}

impl SortKey {
    pub const ALL: [SortKey; 4] = [
        SortKey::PriceLowToHigh,
        SortKey::Rating,
        SortKey::Area,
        SortKey::Service,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SortKey::PriceLowToHigh => "Price: Low to High",
            SortKey::Rating => "Rating",
            SortKey::Area => "Area",
            SortKey::Service => "Service",
        }
    }

    pub fn from_label(label: &str) -> Option<SortKey> {
        SortKey::ALL.into_iter().find(|key| key.label() == label)
    }

    /// Cycle through "no sort" and every key, in label order
    pub fn cycle(current: Option<SortKey>) -> Option<SortKey> {
        match current {
            None => Some(SortKey::PriceLowToHigh),
            Some(SortKey::PriceLowToHigh) => Some(SortKey::Rating),
            Some(SortKey::Rating) => Some(SortKey::Area),
            Some(SortKey::Area) => Some(SortKey::Service),
            Some(SortKey::Service) => None,
        }
    }
}

impl std::str::FromStr for SortKey {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "price" => Ok(SortKey::PriceLowToHigh),
            "rating" => Ok(SortKey::Rating),
            "area" => Ok(SortKey::Area),
            "service" => Ok(SortKey::Service),
            other => SortKey::from_label(value).ok_or_else(|| format!("unknown sort key: {other}")),
        }
    }
}

// Missing values sort after present ones
fn compare_present<T>(a: Option<T>, b: Option<T>, cmp: impl Fn(T, T) -> Ordering) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => cmp(a, b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn price_of(provider: &Provider) -> Option<f64> {
    provider.price.filter(|p| !p.is_nan())
}

/// Stable sort on the chosen key only; ties keep their prior order
pub fn sort_providers(providers: &mut [&Provider], key: SortKey) {
    match key {
        SortKey::PriceLowToHigh => providers.sort_by(|a, b| {
            compare_present(price_of(a), price_of(b), |a, b| a.total_cmp(&b))
        }),
        SortKey::Rating => providers.sort_by(|a, b| {
            compare_present(a.effective_rating(), b.effective_rating(), |a, b| b.total_cmp(&a))
        }),
        SortKey::Area => providers.sort_by_cached_key(|p| {
            p.city.as_deref().unwrap_or_default().to_lowercase()
        }),
        SortKey::Service => providers.sort_by_cached_key(|p| p.first_category_name().to_lowercase()),
    }
}
