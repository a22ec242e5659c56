//! Toggleable item filters.
//!
//! Every enabled filter must match for an item to be eligible; with nothing
//! enabled the whole library is eligible. Rating filters never match an item
//! that lacks the rating they look at.

use crate::models::Item;
use serde::{Deserialize, Serialize};

/// Ratings strictly below this are "bad".
const BAD_RATING: f64 = 4.0;
/// Audience ratings strictly above this are "good".
const GOOD_RATING: f64 = 6.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    Unwatched,
    BadCritic,
    BadAudience,
    /// Critics hated it, audiences loved it.
    Disparity,
}

impl Filter {
    pub const ALL: [Filter; 4] = [
        Filter::Unwatched,
        Filter::BadCritic,
        Filter::BadAudience,
        Filter::Disparity,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Filter::Unwatched => "unwatched",
            Filter::BadCritic => "bad_critic",
            Filter::BadAudience => "bad_audience",
            Filter::Disparity => "disparity",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    pub fn matches(self, item: &Item) -> bool {
        match self {
            Filter::Unwatched => item.viewed_at.is_none(),
            Filter::BadCritic => item.critic_rating.is_some_and(|r| r < BAD_RATING),
            Filter::BadAudience => item.audience_rating.is_some_and(|r| r < BAD_RATING),
            Filter::Disparity => match (item.critic_rating, item.audience_rating) {
                (Some(critic), Some(audience)) => critic < BAD_RATING && audience > GOOD_RATING,
                _ => false,
            },
        }
    }

    fn index(self) -> usize {
        match self {
            Filter::Unwatched => 0,
            Filter::BadCritic => 1,
            Filter::BadAudience => 2,
            Filter::Disparity => 3,
        }
    }
}

/// Enabled state for each filter. Everything starts disabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterSet {
    enabled: [bool; Filter::ALL.len()],
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self, filter: Filter) -> bool {
        self.enabled[filter.index()]
    }

    pub fn set(&mut self, filter: Filter, enabled: bool) {
        self.enabled[filter.index()] = enabled;
    }

    /// Flip a filter, returning its new state.
    pub fn toggle(&mut self, filter: Filter) -> bool {
        let slot = &mut self.enabled[filter.index()];
        *slot = !*slot;
        *slot
    }

    pub fn enabled(&self) -> impl Iterator<Item = Filter> + '_ {
        Filter::ALL.into_iter().filter(|f| self.is_enabled(*f))
    }

    pub fn matches(&self, item: &Item) -> bool {
        self.enabled().all(|f| f.matches(item))
    }
}

impl FromIterator<Filter> for FilterSet {
    fn from_iter<I: IntoIterator<Item = Filter>>(iter: I) -> Self {
        let mut set = FilterSet::new();
        for filter in iter {
            set.set(filter, true);
        }
        set
    }
}

/// Items passing every enabled filter, in library order.
pub fn eligible(items: &[Item], filters: &FilterSet) -> Vec<Item> {
    items.iter().filter(|item| filters.matches(item)).cloned().collect()
}
