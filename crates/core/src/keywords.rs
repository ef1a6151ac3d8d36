use serde::Deserialize;
use thiserror::Error;

use crate::domain::product::CategoryId;

/// Embedded default keyword table. Kept as data so taxonomy changes never
/// touch the matching logic.
const DEFAULT_TABLE: &str = include_str!("keywords.toml");

#[derive(Debug, Error)]
pub enum KeywordTableError {
    #[error("could not parse keyword table: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("keyword table is empty")]
    Empty,
}

#[derive(Debug, Deserialize)]
struct KeywordTable {
    #[serde(default, rename = "category")]
    categories: Vec<CategoryEntry>,
}

#[derive(Debug, Deserialize)]
struct CategoryEntry {
    id: String,
    #[serde(default)]
    keywords: Vec<String>,
}

#[derive(Clone, Debug)]
struct KeywordEntry {
    keyword: String,
    category: CategoryId,
}

/// Many-to-one keyword → category mapping with case-insensitive substring
/// matching over a user utterance.
#[derive(Clone, Debug)]
pub struct KeywordCategoryMap {
    entries: Vec<KeywordEntry>,
}

impl KeywordCategoryMap {
    pub fn from_toml_str(raw: &str) -> Result<Self, KeywordTableError> {
        let table: KeywordTable = toml::from_str(raw)?;

        let mut entries = Vec::new();
        for category in table.categories {
            let category_id = CategoryId(category.id);
            for keyword in category.keywords {
                let keyword = keyword.trim().to_ascii_lowercase();
                if keyword.is_empty() {
                    continue;
                }
                entries.push(KeywordEntry { keyword, category: category_id.clone() });
            }
        }

        if entries.is_empty() {
            return Err(KeywordTableError::Empty);
        }
        Ok(Self { entries })
    }

    /// Distinct categories whose keywords occur in `text`, in first-hit
    /// order.
    pub fn categories_for(&self, text: &str) -> Vec<CategoryId> {
        let normalized = text.to_ascii_lowercase();
        let mut categories = Vec::new();
        for entry in &self.entries {
            if normalized.contains(&entry.keyword) && !categories.contains(&entry.category) {
                categories.push(entry.category.clone());
            }
        }
        categories
    }

    /// Keywords that occur in `text`, deduplicated, in table order. Used for
    /// the substring-search fallback when category lookups come up empty.
    pub fn matched_keywords(&self, text: &str) -> Vec<String> {
        let normalized = text.to_ascii_lowercase();
        let mut keywords = Vec::new();
        for entry in &self.entries {
            if normalized.contains(&entry.keyword) && !keywords.contains(&entry.keyword) {
                keywords.push(entry.keyword.clone());
            }
        }
        keywords
    }
}

impl Default for KeywordCategoryMap {
    fn default() -> Self {
        Self::from_toml_str(DEFAULT_TABLE).expect("embedded keyword table is valid")
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::product::CategoryId;

    use super::KeywordCategoryMap;

    #[test]
    fn embedded_table_loads() {
        let map = KeywordCategoryMap::default();
        assert!(!map.categories_for("looking for running shoes").is_empty());
    }

    #[test]
    fn matching_is_case_insensitive_and_distinct() {
        let map = KeywordCategoryMap::from_toml_str(
            r#"
[[category]]
id = "footwear"
keywords = ["sneaker", "boot"]
"#,
        )
        .expect("parse");

        let categories = map.categories_for("Need SNEAKERS or maybe boots");
        assert_eq!(categories, vec![CategoryId("footwear".to_string())]);
    }

    #[test]
    fn multiple_categories_preserve_first_hit_order() {
        let map = KeywordCategoryMap::from_toml_str(
            r#"
[[category]]
id = "apparel"
keywords = ["jacket"]

[[category]]
id = "footwear"
keywords = ["boot"]
"#,
        )
        .expect("parse");

        let categories = map.categories_for("a jacket to go with these boots");
        assert_eq!(
            categories,
            vec![CategoryId("apparel".to_string()), CategoryId("footwear".to_string())]
        );
    }

    #[test]
    fn matched_keywords_deduplicate() {
        let map = KeywordCategoryMap::default();
        let keywords = map.matched_keywords("shoes, shoes, and more shoes");
        let shoe_hits = keywords.iter().filter(|keyword| keyword.as_str() == "shoes").count();
        assert_eq!(shoe_hits, 1);
    }

    #[test]
    fn empty_table_is_rejected() {
        assert!(KeywordCategoryMap::from_toml_str("").is_err());
    }

    #[test]
    fn unmatched_text_maps_to_no_categories() {
        let map = KeywordCategoryMap::default();
        assert!(map.categories_for("tell me about your return policy").is_empty());
    }
}
