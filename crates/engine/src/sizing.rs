use std::sync::Arc;

use tracing::warn;

use shelfwise_core::domain::activity::UserId;
use shelfwise_core::domain::product::{CategoryId, ProductId};
use shelfwise_core::sizing::{closest_size, SizeRecommendation};
use shelfwise_db::repositories::{
    ActivityRepository, CatalogRepository, SizePreferenceRepository,
};

const PREFERENCE_CONFIDENCE: f64 = 0.9;
const HISTORY_CONFIDENCE: f64 = 0.8;
const MIDDLE_CONFIDENCE: f64 = 0.3;

/// Size recommendations over a strict priority ladder: explicit preference,
/// then purchase history, then the middle of the product's own size range.
/// Store failures degrade to the next rung; the shopper never sees an error.
pub struct SizeRecommender {
    catalog: Arc<dyn CatalogRepository>,
    preferences: Arc<dyn SizePreferenceRepository>,
    activity: Arc<dyn ActivityRepository>,
}

impl SizeRecommender {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        preferences: Arc<dyn SizePreferenceRepository>,
        activity: Arc<dyn ActivityRepository>,
    ) -> Self {
        Self { catalog, preferences, activity }
    }

    pub async fn recommend(
        &self,
        user_id: Option<&UserId>,
        product_id: &ProductId,
        category: Option<&CategoryId>,
    ) -> SizeRecommendation {
        let Some(user_id) = user_id else {
            return SizeRecommendation::none(
                "Sign in to get a size recommendation based on your preferences.",
            );
        };

        let product = match self.catalog.find_by_id(product_id).await {
            Ok(Some(product)) => product,
            Ok(None) => {
                return SizeRecommendation::none("We could not find this product.");
            }
            Err(error) => {
                warn!(
                    event_name = "sizing.catalog_read_failed",
                    product_id = %product_id,
                    error = %error,
                    "catalog read failed during size recommendation"
                );
                return SizeRecommendation::none("Size information is unavailable right now.");
            }
        };

        let available = product.available_sizes();
        if available.is_empty() {
            return SizeRecommendation::none("This product does not have size options.");
        }

        let category = category.cloned().unwrap_or_else(|| product.category_id.clone());

        match self.preferences.find(user_id, &category).await {
            Ok(Some(preference)) => {
                if let Some(size) = closest_size(&preference.size, &available) {
                    return SizeRecommendation {
                        recommended_size: Some(size),
                        confidence: PREFERENCE_CONFIDENCE,
                        message: "Based on your saved size preference.".to_string(),
                    };
                }
            }
            Ok(None) => {}
            Err(error) => {
                warn!(
                    event_name = "sizing.preference_read_failed",
                    user_id = %user_id,
                    error = %error,
                    "size preference read failed; falling back to purchase history"
                );
            }
        }

        match self.activity.purchased_sizes(user_id, &category).await {
            Ok(sizes) if !sizes.is_empty() => {
                if let Some(frequent) = most_frequent(&sizes) {
                    if let Some(size) = closest_size(&frequent, &available) {
                        return SizeRecommendation {
                            recommended_size: Some(size),
                            confidence: HISTORY_CONFIDENCE,
                            message: "Based on sizes you have purchased before.".to_string(),
                        };
                    }
                }
            }
            Ok(_) => {}
            Err(error) => {
                warn!(
                    event_name = "sizing.history_read_failed",
                    user_id = %user_id,
                    error = %error,
                    "purchase history read failed; falling back to size range"
                );
            }
        }

        let middle = available[available.len() / 2].clone();
        SizeRecommendation {
            recommended_size: Some(middle),
            confidence: MIDDLE_CONFIDENCE,
            message: "A middle-of-range suggestion; we do not know your size yet.".to_string(),
        }
    }
}

/// Most frequent entry; ties resolve to the earliest-seen value, and the
/// input arrives most-recent-first.
fn most_frequent(values: &[String]) -> Option<String> {
    let mut best: Option<(&String, usize)> = None;
    for value in values {
        let count = values.iter().filter(|other| *other == value).count();
        match best {
            Some((_, best_count)) if best_count >= count => {}
            _ => best = Some((value, count)),
        }
    }
    best.map(|(value, _)| value.clone())
}
