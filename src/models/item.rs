use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry of the media library.
///
/// Items carry no stable id; two items are the same item when they compare
/// equal field by field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Item {
    pub title: String,
    /// `None` means the item has never been watched.
    #[serde(default)]
    pub viewed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub critic_rating: Option<f64>,
    #[serde(default)]
    pub audience_rating: Option<f64>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

impl Item {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            viewed_at: None,
            critic_rating: None,
            audience_rating: None,
            summary: None,
            genres: Vec::new(),
            thumbnail_url: None,
        }
    }

    pub fn with_critic_rating(mut self, rating: f64) -> Self {
        self.critic_rating = Some(rating);
        self
    }

    pub fn with_audience_rating(mut self, rating: f64) -> Self {
        self.audience_rating = Some(rating);
        self
    }

    pub fn with_viewed_at(mut self, viewed_at: DateTime<Utc>) -> Self {
        self.viewed_at = Some(viewed_at);
        self
    }
}
