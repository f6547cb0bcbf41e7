use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Category {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
}

impl Category {
    /// Name shown in chips and pickers, falling back to the slug
    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            &self.slug
        } else {
            &self.name
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Subcategory {
    pub id: i64,
    pub category_id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
}
