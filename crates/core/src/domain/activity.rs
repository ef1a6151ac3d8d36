use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::product::{CategoryId, ProductId};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    View,
    AddToCart,
    Purchase,
    ProductQa,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::View => "view",
            Self::AddToCart => "add_to_cart",
            Self::Purchase => "purchase",
            Self::ProductQa => "product_qa",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "view" => Some(Self::View),
            "add_to_cart" => Some(Self::AddToCart),
            "purchase" => Some(Self::Purchase),
            "product_qa" => Some(Self::ProductQa),
            _ => None,
        }
    }
}

/// One append-only behavioral event. Produced by out-of-scope collaborators;
/// this core only reads them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserActivity {
    pub user_id: Option<UserId>,
    pub session_id: String,
    pub activity_type: ActivityType,
    pub product_id: Option<ProductId>,
    pub category_id: Option<CategoryId>,
    pub search_query: Option<String>,
    /// Freeform event payload; purchase events may carry a `size` key.
    pub payload: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
}

impl UserActivity {
    pub fn purchased_size(&self) -> Option<&str> {
        if self.activity_type != ActivityType::Purchase {
            return None;
        }
        self.payload.get("size").and_then(serde_json::Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use super::{ActivityType, UserActivity, UserId};

    #[test]
    fn activity_type_round_trips() {
        let all = [
            ActivityType::View,
            ActivityType::AddToCart,
            ActivityType::Purchase,
            ActivityType::ProductQa,
        ];

        for activity_type in all {
            assert_eq!(ActivityType::parse(activity_type.as_str()), Some(activity_type));
        }
    }

    #[test]
    fn purchased_size_reads_only_purchase_payloads() {
        let mut activity = UserActivity {
            user_id: Some(UserId("U-1".to_string())),
            session_id: "sess-1".to_string(),
            activity_type: ActivityType::Purchase,
            product_id: None,
            category_id: None,
            search_query: None,
            payload: json!({ "size": "M", "quantity": 1 }),
            occurred_at: Utc::now(),
        };
        assert_eq!(activity.purchased_size(), Some("M"));

        activity.activity_type = ActivityType::View;
        assert_eq!(activity.purchased_size(), None);
    }
}
