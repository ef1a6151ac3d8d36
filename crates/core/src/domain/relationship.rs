use serde::{Deserialize, Serialize};

use crate::domain::product::ProductId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    Complementary,
}

impl RelationshipKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Complementary => "complementary",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "complementary" => Some(Self::Complementary),
            _ => None,
        }
    }
}

/// Curated product edge. Read-only to this core.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductRelationship {
    pub source_product_id: ProductId,
    pub related_product_id: ProductId,
    pub kind: RelationshipKind,
    pub strength: f64,
}
