use serde::{Deserialize, Serialize};

use super::{Category, Review, Subcategory};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderStatus {
    #[default]
    Pending,
    Approved,
    Inactive,
    #[serde(other)]
    Unknown,
}

impl ProviderStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ProviderStatus::Pending => "pending",
            ProviderStatus::Approved => "approved",
            ProviderStatus::Inactive => "inactive",
            ProviderStatus::Unknown => "unknown",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Provider {
    pub id: i64,
    #[serde(default)]
    pub user_id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub status: ProviderStatus,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub photo1: Option<String>,
    #[serde(default)]
    pub photo2: Option<String>,
    #[serde(default)]
    pub photo3: Option<String>,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub subcategories: Vec<Subcategory>,
    #[serde(default)]
    pub reviews: Vec<Review>,
}

impl Provider {
    /// `Name • Company`, or just the name when the company is blank
    pub fn title(&self) -> String {
        if self.company_name.is_empty() {
            self.name.clone()
        } else {
            format!("{} • {}", self.name, self.company_name)
        }
    }

    pub fn display_price(&self) -> String {
        match self.price {
            Some(price) if !price.is_nan() => format!("${:.2}", price),
            _ => "Contact for quote".to_string(),
        }
    }

    pub fn display_area(&self) -> &str {
        match self.city.as_deref() {
            Some(city) if !city.trim().is_empty() => city,
            _ => "Service area",
        }
    }

    /// Stored rating, or the mean of the attached reviews
    pub fn effective_rating(&self) -> Option<f64> {
        if let Some(rating) = self.rating.filter(|r| !r.is_nan()) {
            return Some(rating);
        }
        if self.reviews.is_empty() {
            return None;
        }
        let total: f64 = self.reviews.iter().map(|r| f64::from(r.rating)).sum();
        Some(total / self.reviews.len() as f64)
    }

    pub fn tag_list(&self) -> Vec<String> {
        self.tags
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(String::from)
            .collect()
    }

    pub fn photos(&self) -> Vec<&str> {
        [&self.photo1, &self.photo2, &self.photo3]
            .into_iter()
            .filter_map(|photo| photo.as_deref())
            .filter(|photo| !photo.is_empty())
            .collect()
    }

    pub fn first_category_name(&self) -> &str {
        self.categories.first().map(|c| c.name.as_str()).unwrap_or("")
    }

    pub fn is_owned_by(&self, user_id: i64) -> bool {
        self.user_id == Some(user_id)
    }
}
