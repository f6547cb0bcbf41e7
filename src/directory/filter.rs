use std::collections::BTreeSet;

use super::area::{normalize_area, split_service_areas, ISLAND_WIDE};
use crate::models::Provider;

/// Active directory filters. Dimensions are ANDed together; ids or areas
/// inside one dimension are ORed. An empty dimension does not filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderFilter {
    pub category_ids: BTreeSet<i64>,
    pub subcategory_ids: BTreeSet<i64>,
    pub areas: Vec<String>,
}

impl ProviderFilter {
    pub fn is_empty(&self) -> bool {
        self.category_ids.is_empty() && self.subcategory_ids.is_empty() && self.areas.is_empty()
    }

    pub fn clear(&mut self) {
        self.category_ids.clear();
        self.subcategory_ids.clear();
        self.areas.clear();
    }

    pub fn toggle_category(&mut self, id: i64) {
        if !self.category_ids.remove(&id) {
            self.category_ids.insert(id);
        }
    }

    pub fn toggle_subcategory(&mut self, id: i64) {
        if !self.subcategory_ids.remove(&id) {
            self.subcategory_ids.insert(id);
        }
    }

    pub fn toggle_area(&mut self, area: &str) {
        let wanted = normalize_area(area);
        if let Some(pos) = self.areas.iter().position(|a| normalize_area(a) == wanted) {
            self.areas.remove(pos);
        } else {
            self.areas.push(area.trim().to_string());
        }
    }

    pub fn matches(&self, provider: &Provider) -> bool {
        self.matches_categories(provider)
            && self.matches_subcategories(provider)
            && self.matches_areas(provider)
    }

    fn matches_categories(&self, provider: &Provider) -> bool {
        self.category_ids.is_empty()
            || provider
                .categories
                .iter()
                .any(|c| self.category_ids.contains(&c.id))
    }

    fn matches_subcategories(&self, provider: &Provider) -> bool {
        self.subcategory_ids.is_empty()
            || provider
                .subcategories
                .iter()
                .any(|s| self.subcategory_ids.contains(&s.id))
    }

    fn matches_areas(&self, provider: &Provider) -> bool {
        if self.areas.is_empty() {
            return true;
        }

        let tokens: Vec<String> = split_service_areas(provider.city.as_deref())
            .iter()
            .map(|t| normalize_area(t))
            .collect();
        if tokens.iter().any(|t| *t == normalize_area(ISLAND_WIDE)) {
            return true;
        }

        self.areas.iter().map(|a| normalize_area(a)).any(|wanted| {
            !wanted.is_empty() && tokens.iter().any(|token| token.contains(&wanted))
        })
    }

    /// Providers passing every active dimension, in their original order
    pub fn apply<'a>(&self, providers: &'a [Provider]) -> Vec<&'a Provider> {
        providers.iter().filter(|p| self.matches(p)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Subcategory};

    fn category(id: i64) -> Category {
        Category {
            id,
            name: format!("cat-{id}"),
            slug: format!("cat-{id}"),
        }
    }

    fn provider(id: i64, categories: &[i64], city: Option<&str>) -> Provider {
        Provider {
            id,
            name: format!("provider-{id}"),
            city: city.map(String::from),
            categories: categories.iter().map(|c| category(*c)).collect(),
            ..Default::default()
        }
    }

    fn ids(result: &[&Provider]) -> Vec<i64> {
        result.iter().map(|p| p.id).collect()
    }

    #[test]
    fn test_empty_filter_returns_everything_in_order() {
        let providers = vec![
            provider(3, &[1], None),
            provider(1, &[], Some("North")),
            provider(2, &[2], Some("South")),
        ];
        let filter = ProviderFilter::default();
        assert!(filter.is_empty());
        assert_eq!(ids(&filter.apply(&providers)), vec![3, 1, 2]);
    }

    #[test]
    fn test_category_filter_selects_matching_provider() {
        let providers = vec![
            provider(1, &[1], None),
            provider(2, &[2, 3], None),
            provider(3, &[4, 5], None),
        ];
        let mut filter = ProviderFilter::default();
        filter.toggle_category(5);
        assert_eq!(ids(&filter.apply(&providers)), vec![3]);
    }

    #[test]
    fn test_categories_are_ored() {
        let providers = vec![
            provider(1, &[1], None),
            provider(2, &[2], None),
            provider(3, &[3], None),
        ];
        let mut filter = ProviderFilter::default();
        filter.toggle_category(1);
        filter.toggle_category(3);
        assert_eq!(ids(&filter.apply(&providers)), vec![1, 3]);

        filter.toggle_category(3);
        assert_eq!(ids(&filter.apply(&providers)), vec![1]);
    }

    #[test]
    fn test_areas_match_tokens_case_insensitively() {
        let providers = vec![
            provider(1, &[], Some("North, Metro")),
            provider(2, &[], Some("south/centro")),
            provider(3, &[], None),
        ];
        let mut filter = ProviderFilter::default();
        filter.toggle_area("metro");
        assert_eq!(ids(&filter.apply(&providers)), vec![1]);

        filter.toggle_area("CENTRO");
        assert_eq!(ids(&filter.apply(&providers)), vec![1, 2]);
    }

    #[test]
    fn test_island_wide_provider_matches_any_area() {
        let providers = vec![provider(1, &[], Some("Isla")), provider(2, &[], Some("West"))];
        let mut filter = ProviderFilter::default();
        filter.toggle_area("East");
        assert_eq!(ids(&filter.apply(&providers)), vec![1]);
    }

    #[test]
    fn test_dimensions_are_anded() {
        let providers = vec![
            provider(1, &[5], Some("North")),
            provider(2, &[5], Some("South")),
            provider(3, &[6], Some("North")),
        ];
        let mut filter = ProviderFilter::default();
        filter.toggle_category(5);
        filter.toggle_area("North");
        assert_eq!(ids(&filter.apply(&providers)), vec![1]);
    }

    #[test]
    fn test_subcategory_dimension() {
        let mut with_sub = provider(1, &[5], None);
        with_sub.subcategories = vec![Subcategory {
            id: 50,
            category_id: 5,
            name: "Deep cleaning".into(),
            slug: "deep-cleaning".into(),
        }];
        let providers = vec![with_sub, provider(2, &[5], None)];

        let mut filter = ProviderFilter::default();
        filter.toggle_subcategory(50);
        assert_eq!(ids(&filter.apply(&providers)), vec![1]);
    }

    #[test]
    fn test_membership_matches_every_dimension_exhaustively() {
        let cities = [None, Some("North"), Some("South/Metro"), Some("Isla")];
        let mut providers = Vec::new();
        let mut next_id = 0;
        for cats in [&[][..], &[1][..], &[2][..], &[1, 2][..]] {
            for city in cities {
                next_id += 1;
                providers.push(provider(next_id, cats, city));
            }
        }

        let mut filter = ProviderFilter::default();
        filter.toggle_category(2);
        filter.toggle_area("metro");
        let kept = ids(&filter.apply(&providers));

        for p in &providers {
            let has_cat = p.categories.iter().any(|c| c.id == 2);
            let city = p.city.as_deref().unwrap_or_default().to_lowercase();
            let in_area = city.contains("metro") || city.contains("isla");
            assert_eq!(kept.contains(&p.id), has_cat && in_area, "provider {}", p.id);
        }
    }
}
