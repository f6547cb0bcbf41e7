/// Service areas a provider can pick from. `Isla` covers the whole island.
pub const AREA_OPTIONS: [&str; 7] = ["North", "South", "East", "West", "Centro", "Metro", "Isla"];

pub const ISLAND_WIDE: &str = "Isla";

pub fn split_service_areas(value: Option<&str>) -> Vec<String> {
    value
        .unwrap_or_default()
        .split([',', '/'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(String::from)
        .collect()
}

pub fn normalize_area(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Map stored area tokens back onto the canonical option spelling
pub fn canonical_areas(value: Option<&str>) -> Vec<String> {
    split_service_areas(value)
        .into_iter()
        .map(|area| {
            AREA_OPTIONS
                .iter()
                .find(|option| normalize_area(option) == normalize_area(&area))
                .map(|option| option.to_string())
                .unwrap_or(area)
        })
        .collect()
}

/// Toggle one area in a selection.
///
/// Picking `Isla` replaces the whole selection (or clears it when it was
/// already picked). Picking a regional area drops `Isla`, and a selection that
/// ends up holding every regional area collapses back to `Isla`.
pub fn toggle_area(selected: &[String], area: &str) -> Vec<String> {
    if area == ISLAND_WIDE {
        return if selected.iter().any(|a| a == ISLAND_WIDE) {
            Vec::new()
        } else {
            vec![ISLAND_WIDE.to_string()]
        };
    }

    let mut updated: Vec<String> = selected
        .iter()
        .filter(|a| a.as_str() != ISLAND_WIDE)
        .cloned()
        .collect();

    if let Some(pos) = updated.iter().position(|a| a == area) {
        updated.remove(pos);
    } else {
        updated.push(area.to_string());
    }

    let regional: Vec<&str> = AREA_OPTIONS
        .iter()
        .copied()
        .filter(|opt| *opt != ISLAND_WIDE)
        .collect();
    let covers_all = regional.len() == updated.len()
        && regional.iter().all(|opt| updated.iter().any(|a| a == opt));
    if covers_all {
        return vec![ISLAND_WIDE.to_string()];
    }

    updated
}

pub fn join_areas(areas: &[String]) -> Option<String> {
    if areas.is_empty() {
        None
    } else {
        Some(areas.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_split_on_commas_and_slashes() {
        assert_eq!(
            split_service_areas(Some("North, Metro/ Centro ,,")),
            owned(&["North", "Metro", "Centro"])
        );
        assert!(split_service_areas(None).is_empty());
    }

    #[test]
    fn test_canonical_areas_fix_case() {
        assert_eq!(
            canonical_areas(Some("north / METRO, Dorado")),
            owned(&["North", "Metro", "Dorado"])
        );
    }

    #[test]
    fn test_isla_replaces_selection() {
        assert_eq!(toggle_area(&owned(&["North"]), "Isla"), owned(&["Isla"]));
        assert!(toggle_area(&owned(&["Isla"]), "Isla").is_empty());
    }

    #[test]
    fn test_regional_area_drops_isla() {
        assert_eq!(toggle_area(&owned(&["Isla"]), "South"), owned(&["South"]));
        assert_eq!(toggle_area(&owned(&["South", "East"]), "South"), owned(&["East"]));
    }

    #[test]
    fn test_every_region_collapses_to_isla() {
        let almost = owned(&["North", "South", "East", "West", "Centro"]);
        assert_eq!(toggle_area(&almost, "Metro"), owned(&["Isla"]));
    }

    #[test]
    fn test_join_areas() {
        assert_eq!(join_areas(&owned(&["North", "Metro"])).as_deref(), Some("North, Metro"));
        assert_eq!(join_areas(&[]), None);
    }
}
