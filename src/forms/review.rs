use serde::Serialize;

use super::{optional, FormError};

#[derive(Debug, Clone, Default)]
pub struct ReviewForm {
    pub rating: u8,
    pub comment: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReviewSubmission {
    pub rating: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl ReviewForm {
    pub fn set_rating(&mut self, rating: u8) {
        self.rating = rating.min(5);
    }

    pub fn validate(&self) -> Result<ReviewSubmission, FormError> {
        if !(1..=5).contains(&self.rating) {
            return Err(FormError::new("rating", "Rating must be between 1 and 5."));
        }

        Ok(ReviewSubmission {
            rating: self.rating,
            comment: optional(&self.comment),
        })
    }
}
