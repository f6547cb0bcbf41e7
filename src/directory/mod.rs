//! Client-side narrowing and ordering of the provider directory.

pub mod area;
mod filter;
mod sort;

pub use filter::ProviderFilter;
pub use sort::{sort_providers, SortKey};

use crate::models::{Category, Provider};

const FEATURED_LIMIT: usize = 8;

/// Filter then optionally sort. Without a sort key the input order is kept.
pub fn arrange<'a>(
    providers: &'a [Provider],
    filter: &ProviderFilter,
    sort: Option<SortKey>,
) -> Vec<&'a Provider> {
    let mut visible = filter.apply(providers);
    if let Some(key) = sort {
        sort_providers(&mut visible, key);
    }
    visible
}

/// Category chips for the directory header: backend categories first, then
/// any category only seen on providers, deduplicated by label
pub fn featured_categories(categories: &[Category], providers: &[Provider]) -> Vec<Category> {
    let mut featured: Vec<Category> = Vec::new();
    let provider_categories = providers.iter().flat_map(|p| p.categories.iter());

    for category in categories.iter().chain(provider_categories) {
        if featured.len() == FEATURED_LIMIT {
            break;
        }
        if !featured.iter().any(|c| c.label() == category.label()) {
            featured.push(category.clone());
        }
    }

    featured
}

/// Categories sorted by label for pickers
pub fn sorted_categories(categories: &[Category]) -> Vec<Category> {
    let mut sorted = categories.to_vec();
    sorted.sort_by_cached_key(|c| c.label().to_lowercase());
    sorted
}

/// Providers owned by the given user
pub fn owned_by(providers: &[Provider], user_id: i64) -> Vec<Provider> {
    providers
        .iter()
        .filter(|p| p.is_owned_by(user_id))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(id: i64, name: &str) -> Category {
        Category {
            id,
            name: name.into(),
            slug: name.to_lowercase(),
        }
    }

    #[test]
    fn test_arrange_filters_then_sorts() {
        let providers = vec![
            Provider {
                id: 1,
                price: Some(30.0),
                categories: vec![category(5, "Cleaning")],
                ..Default::default()
            },
            Provider {
                id: 2,
                price: Some(10.0),
                ..Default::default()
            },
            Provider {
                id: 3,
                price: Some(20.0),
                categories: vec![category(5, "Cleaning")],
                ..Default::default()
            },
        ];
        let mut filter = ProviderFilter::default();
        filter.toggle_category(5);

        let ids: Vec<i64> = arrange(&providers, &filter, Some(SortKey::PriceLowToHigh))
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![3, 1]);

        let unsorted: Vec<i64> = arrange(&providers, &ProviderFilter::default(), None)
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(unsorted, vec![1, 2, 3]);
    }

    #[test]
    fn test_featured_prefers_backend_categories_and_caps_at_eight() {
        let categories: Vec<Category> = (1..=6).map(|i| category(i, &format!("C{i}"))).collect();
        let providers = vec![Provider {
            categories: vec![category(2, "C2"), category(20, "Extra"), category(21, "More"), category(22, "Overflow")],
            ..Default::default()
        }];

        let labels: Vec<String> = featured_categories(&categories, &providers)
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(labels, vec!["C1", "C2", "C3", "C4", "C5", "C6", "Extra", "More"]);
    }

    #[test]
    fn test_sorted_categories_and_ownership() {
        let sorted = sorted_categories(&[category(1, "plumber"), category(2, "Electrician")]);
        assert_eq!(sorted[0].id, 2);

        let providers = vec![
            Provider {
                id: 1,
                user_id: Some(7),
                ..Default::default()
            },
            Provider {
                id: 2,
                user_id: None,
                ..Default::default()
            },
        ];
        assert_eq!(owned_by(&providers, 7).len(), 1);
        assert!(owned_by(&providers, 8).is_empty());
    }
}
