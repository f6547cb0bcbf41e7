use std::path::PathBuf;

use super::{is_blank, optional, FormError};
use crate::directory::area::{canonical_areas, join_areas, toggle_area};
use crate::models::Provider;

pub const MAX_PHOTOS: usize = 3;

const CONTACT_REQUIRED: &str = "Name, company name, and phone are required.";
const CATEGORY_REQUIRED: &str = "Please pick at least one category.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitMode {
    Create,
    Edit,
}

/// Editable listing fields for the register and edit flows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderForm {
    pub name: String,
    pub company_name: String,
    pub phone: String,
    pub bio: String,
    pub price: String,
    pub areas: Vec<String>,
    pub category_ids: Vec<i64>,
    pub subcategory_ids: Vec<i64>,
    pub photos: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSubmission {
    pub mode: SubmitMode,
    pub name: String,
    pub company_name: String,
    pub phone: String,
    pub bio: Option<String>,
    pub city: Option<String>,
    pub price: Option<String>,
    pub category_ids: Vec<i64>,
    pub subcategory_ids: Vec<i64>,
    pub photos: Vec<PathBuf>,
}

impl ProviderForm {
    pub fn from_provider(provider: &Provider) -> Self {
        Self {
            name: provider.name.clone(),
            company_name: provider.company_name.clone(),
            phone: provider.phone.clone(),
            bio: provider.bio.clone().unwrap_or_default(),
            price: provider
                .price
                .filter(|p| !p.is_nan())
                .map(|p| p.to_string())
                .unwrap_or_default(),
            areas: canonical_areas(provider.city.as_deref()),
            category_ids: provider.categories.iter().map(|c| c.id).collect(),
            subcategory_ids: provider.subcategories.iter().map(|s| s.id).collect(),
            photos: Vec::new(),
        }
    }

    pub fn toggle_category(&mut self, id: i64) {
        toggle_id(&mut self.category_ids, id);
    }

    pub fn toggle_subcategory(&mut self, id: i64) {
        toggle_id(&mut self.subcategory_ids, id);
    }

    pub fn toggle_area(&mut self, area: &str) {
        self.areas = toggle_area(&self.areas, area);
    }

    /// Attach a photo; false once the limit is reached
    pub fn add_photo(&mut self, path: PathBuf) -> bool {
        if self.photos.len() >= MAX_PHOTOS {
            return false;
        }
        self.photos.push(path);
        true
    }

    pub fn remove_last_photo(&mut self) {
        self.photos.pop();
    }

    pub fn validate(&self, mode: SubmitMode) -> Result<ProviderSubmission, FormError> {
        let contact = [
            ("name", &self.name),
            ("company_name", &self.company_name),
            ("phone", &self.phone),
        ];
        if let Some((field, _)) = contact.iter().find(|(_, value)| is_blank(value)) {
            return Err(FormError::new(*field, CONTACT_REQUIRED));
        }

        if self.category_ids.is_empty() {
            return Err(FormError::new("categories", CATEGORY_REQUIRED));
        }

        let bio = match mode {
            SubmitMode::Create => optional(&self.bio),
            SubmitMode::Edit => Some(self.bio.clone()),
        };

        Ok(ProviderSubmission {
            mode,
            name: self.name.trim().to_string(),
            company_name: self.company_name.trim().to_string(),
            phone: self.phone.trim().to_string(),
            bio,
            city: join_areas(&self.areas),
            price: normalize_price(&self.price),
            category_ids: self.category_ids.clone(),
            subcategory_ids: self.subcategory_ids.clone(),
            photos: self.photos.iter().take(MAX_PHOTOS).cloned().collect(),
        })
    }
}

impl ProviderSubmission {
    /// Text parts of the multipart body, in send order
    pub fn text_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = Vec::new();
        if self.mode == SubmitMode::Edit {
            fields.push(("_method", "PUT".to_string()));
        }
        fields.push(("name", self.name.clone()));
        fields.push(("company_name", self.company_name.clone()));
        fields.push(("phone", self.phone.clone()));
        if let Some(bio) = &self.bio {
            fields.push(("bio", bio.clone()));
        }
        if let Some(city) = &self.city {
            fields.push(("city", city.clone()));
        }
        if let Some(price) = &self.price {
            fields.push(("price", price.clone()));
        }
        for id in &self.category_ids {
            fields.push(("category_ids[]", id.to_string()));
        }
        for id in &self.subcategory_ids {
            fields.push(("subcategory_ids[]", id.to_string()));
        }
        fields
    }
}

fn toggle_id(ids: &mut Vec<i64>, id: i64) {
    if let Some(pos) = ids.iter().position(|existing| *existing == id) {
        ids.remove(pos);
    } else {
        ids.push(id);
    }
}

/// Two-decimal price string, or None when the input does not start with a number
fn normalize_price(raw: &str) -> Option<String> {
    let value = leading_number(raw)?;
    if !value.is_finite() {
        return None;
    }
    let rounded = (value * 100.0).round() / 100.0;
    Some(rounded.to_string())
}

/// The longest numeric prefix, read the way a browser's `parseFloat` does:
/// "12abc" is 12, "$40" is not a number
fn leading_number(raw: &str) -> Option<f64> {
    let text = raw.trim_start();
    let bytes = text.as_bytes();
    let digits_from = |mut i: usize| {
        while bytes.get(i).is_some_and(u8::is_ascii_digit) {
            i += 1;
        }
        i
    };

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let int_end = digits_from(end);
    let mut mantissa = int_end > end;
    end = int_end;
    if bytes.get(end) == Some(&b'.') {
        let frac_end = digits_from(end + 1);
        if mantissa || frac_end > end + 1 {
            mantissa = true;
            end = frac_end;
        }
    }
    if !mantissa {
        return None;
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_end = digits_from(exp);
        if exp_end > exp {
            end = exp_end;
        }
    }
    text[..end].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;

    fn filled() -> ProviderForm {
        ProviderForm {
            name: "Jane Doe".into(),
            company_name: "Doe Repairs".into(),
            phone: "+1 (555) 123-4567".into(),
            category_ids: vec![5],
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_company_name_blocks_submission() {
        let form = ProviderForm {
            company_name: String::new(),
            ..filled()
        };
        let err = form.validate(SubmitMode::Create).unwrap_err();
        assert_eq!(err.field, "company_name");
        assert_eq!(err.to_string(), "Name, company name, and phone are required.");
    }

    #[test]
    fn test_whitespace_only_phone_counts_as_empty() {
        let form = ProviderForm {
            phone: "   ".into(),
            ..filled()
        };
        assert_eq!(form.validate(SubmitMode::Edit).unwrap_err().field, "phone");
    }

    #[test]
    fn test_category_required() {
        let form = ProviderForm {
            category_ids: vec![],
            ..filled()
        };
        let err = form.validate(SubmitMode::Create).unwrap_err();
        assert_eq!(err.message, "Please pick at least one category.");
    }

    #[test]
    fn test_create_fields_skip_empty_optionals() {
        let submission = filled().validate(SubmitMode::Create).unwrap();
        let fields = submission.text_fields();
        let names: Vec<&str> = fields.iter().map(|(k, _)| *k).collect();
        assert_eq!(names, vec!["name", "company_name", "phone", "category_ids[]"]);
    }

    #[test]
    fn test_edit_fields_carry_method_override_and_bio() {
        let mut form = filled();
        form.price = "25.499".into();
        form.toggle_area("North");
        form.toggle_area("Metro");
        form.toggle_category(9);

        let fields = form.validate(SubmitMode::Edit).unwrap().text_fields();
        assert_eq!(fields[0], ("_method", "PUT".to_string()));
        assert!(fields.contains(&("bio", String::new())));
        assert!(fields.contains(&("city", "North, Metro".to_string())));
        assert!(fields.contains(&("price", "25.5".to_string())));
        let categories: Vec<&String> = fields
            .iter()
            .filter(|(k, _)| *k == "category_ids[]")
            .map(|(_, v)| v)
            .collect();
        assert_eq!(categories, vec!["5", "9"]);
    }

    #[test]
    fn test_non_numeric_price_is_dropped() {
        let form = ProviderForm {
            price: "call me".into(),
            ..filled()
        };
        assert_eq!(form.validate(SubmitMode::Create).unwrap().price, None);
        assert_eq!(normalize_price("$40"), None);
    }

    #[test]
    fn test_price_reads_leading_number() {
        assert_eq!(normalize_price("12abc"), Some("12".to_string()));
        assert_eq!(normalize_price("  7.5 per hour"), Some("7.5".to_string()));
        assert_eq!(normalize_price(".25"), Some("0.25".to_string()));
        assert_eq!(normalize_price("1e2"), Some("100".to_string()));
        assert_eq!(normalize_price("3e"), Some("3".to_string()));
        assert_eq!(normalize_price("-."), None);
        assert_eq!(normalize_price(""), None);
    }

    #[test]
    fn test_photo_limit() {
        let mut form = filled();
        for i in 0..MAX_PHOTOS {
            assert!(form.add_photo(PathBuf::from(format!("p{i}.jpg"))));
        }
        assert!(!form.add_photo(PathBuf::from("extra.jpg")));
        assert_eq!(form.validate(SubmitMode::Create).unwrap().photos.len(), MAX_PHOTOS);
    }

    #[test]
    fn test_prefill_from_existing_listing() {
        let provider = Provider {
            id: 4,
            name: "Luis".into(),
            company_name: "Luis Plumbing".into(),
            phone: "787".into(),
            city: Some("north / metro".into()),
            price: Some(30.0),
            categories: vec![Category {
                id: 2,
                name: "Plumber".into(),
                slug: "plumber".into(),
            }],
            ..Default::default()
        };
        let form = ProviderForm::from_provider(&provider);
        assert_eq!(form.areas, vec!["North", "Metro"]);
        assert_eq!(form.price, "30");
        assert_eq!(form.category_ids, vec![2]);
        assert!(form.validate(SubmitMode::Edit).is_ok());
    }
}
