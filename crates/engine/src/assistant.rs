use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{info, warn};

use shelfwise_core::domain::conversation::{ChatMessage, Conversation, ConversationKey};
use shelfwise_core::domain::product::Product;
use shelfwise_core::errors::EngineError;
use shelfwise_core::keywords::KeywordCategoryMap;
use shelfwise_db::repositories::{
    ActivityRepository, CatalogRepository, ConversationRepository, RepositoryError,
};

use crate::gateway::{GatewayError, ModelGateway};

/// Hard cap on products injected into the system prompt.
const MAX_RELEVANT_PRODUCTS: usize = 5;
/// Substring-search fallback pulls this many products per matched keyword.
const SEARCH_RESULTS_PER_KEYWORD: u32 = 2;
const PERSONALIZATION_WINDOW_DAYS: i64 = 30;
const MAX_PERSONALIZATION_CATEGORIES: usize = 5;

pub struct AssistantRequest {
    pub key: ConversationKey,
    pub message: String,
}

/// Conversational shopping assistant. The composed system prompt front-loads
/// concrete products so the model answers on the first turn instead of
/// opening with clarifying questions.
pub struct ShoppingAssistant {
    catalog: Arc<dyn CatalogRepository>,
    activity: Arc<dyn ActivityRepository>,
    conversations: Arc<dyn ConversationRepository>,
    keywords: KeywordCategoryMap,
    gateway: Arc<dyn ModelGateway>,
}

impl ShoppingAssistant {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        activity: Arc<dyn ActivityRepository>,
        conversations: Arc<dyn ConversationRepository>,
        keywords: KeywordCategoryMap,
        gateway: Arc<dyn ModelGateway>,
    ) -> Self {
        Self { catalog, activity, conversations, keywords, gateway }
    }

    /// Answer one user turn and persist the updated exchange under the
    /// conversation key (upsert).
    pub async fn reply(&self, request: AssistantRequest) -> Result<String, EngineError> {
        let mut conversation = match self.conversations.find_by_key(&request.key).await {
            Ok(Some(existing)) => existing,
            Ok(None) => {
                let now = Utc::now();
                Conversation {
                    key: request.key.clone(),
                    messages: Vec::new(),
                    created_at: now,
                    updated_at: now,
                }
            }
            Err(error) => return Err(persistence(error)),
        };

        conversation.messages.push(ChatMessage::user(request.message.clone()));

        let system_context = self.compose_system_context(&request).await;

        let reply = self
            .gateway
            .converse(&conversation.messages, &system_context)
            .await
            .map_err(|error| match error {
                GatewayError::Unavailable(detail) => EngineError::ModelUnavailable(detail),
                GatewayError::Generation(detail) => EngineError::Generation(detail),
            })?;

        conversation.messages.push(ChatMessage::assistant(reply.clone()));
        conversation.updated_at = Utc::now();
        self.conversations.upsert(conversation).await.map_err(persistence)?;

        info!(
            event_name = "assistant.replied",
            session_id = %request.key.session_id,
            "assistant reply persisted"
        );
        Ok(reply)
    }

    async fn compose_system_context(&self, request: &AssistantRequest) -> String {
        let mut sections = vec![
            "You are a shopping assistant for an online marketplace. Be concise and \
             concrete. When relevant products are listed below, recommend them \
             immediately in your first reply instead of asking clarifying questions."
                .to_string(),
        ];

        let relevant = self.relevant_products(&request.message).await;
        if !relevant.is_empty() {
            let mut block = String::from("RELEVANT PRODUCTS (recommend these first):\n");
            for product in &relevant {
                block.push_str(&format!(
                    "- {} | category: {} | price: {} | in stock: {}\n",
                    product.name, product.category_id, product.price, product.stock
                ));
            }
            sections.push(block.trim_end().to_string());
        }

        if let Some(product_id) = &request.key.product_id {
            match self.catalog.find_by_id(product_id).await {
                Ok(Some(product)) => {
                    sections.push(format!(
                        "CURRENT PRODUCT:\nname: {}\nprice: {}\nstock: {}\ndescription: {}",
                        product.name, product.price, product.stock, product.description
                    ));
                }
                Ok(None) => {}
                Err(error) => log_context_failure("product_context", &error),
            }
        }

        if let Some(user_id) = &request.key.user_id {
            let mut personalization = Vec::new();

            match self
                .activity
                .purchased_category_ids(user_id, MAX_PERSONALIZATION_CATEGORIES as u32)
                .await
            {
                Ok(categories) if !categories.is_empty() => {
                    personalization.push(format!(
                        "has purchased from: {}",
                        categories
                            .iter()
                            .map(|category| category.0.as_str())
                            .collect::<Vec<_>>()
                            .join(", ")
                    ));
                }
                Ok(_) => {}
                Err(error) => log_context_failure("purchase_history", &error),
            }

            let since = Utc::now() - Duration::days(PERSONALIZATION_WINDOW_DAYS);
            match self.activity.category_touches_since(user_id, since).await {
                Ok(touches) if !touches.is_empty() => {
                    personalization.push(format!(
                        "recently browsing: {}",
                        touches
                            .iter()
                            .take(MAX_PERSONALIZATION_CATEGORIES)
                            .map(|(category, _)| category.0.as_str())
                            .collect::<Vec<_>>()
                            .join(", ")
                    ));
                }
                Ok(_) => {}
                Err(error) => log_context_failure("browsing_interest", &error),
            }

            if !personalization.is_empty() {
                sections.push(format!("SHOPPER CONTEXT:\n{}", personalization.join("\n")));
            }
        }

        sections.join("\n\n")
    }

    /// Keyword-mapped category lookup with a substring-search fallback;
    /// failures degrade to an empty block rather than aborting the reply.
    async fn relevant_products(&self, utterance: &str) -> Vec<Product> {
        let categories = self.keywords.categories_for(utterance);

        let mut products: Vec<Product> = Vec::new();
        let mut seen = BTreeSet::new();

        if !categories.is_empty() {
            let quota =
                (MAX_RELEVANT_PRODUCTS as u32).div_ceil(categories.len() as u32);
            for category in &categories {
                match self.catalog.newest_approved_in_category(category, quota).await {
                    Ok(batch) => {
                        for product in batch {
                            if seen.insert(product.id.0.clone()) {
                                products.push(product);
                            }
                        }
                    }
                    Err(error) => log_context_failure("category_products", &error),
                }
            }
        }

        if products.is_empty() {
            for keyword in self.keywords.matched_keywords(utterance) {
                match self
                    .catalog
                    .search_approved(&keyword, SEARCH_RESULTS_PER_KEYWORD)
                    .await
                {
                    Ok(batch) => {
                        for product in batch {
                            if seen.insert(product.id.0.clone()) {
                                products.push(product);
                            }
                        }
                    }
                    Err(error) => log_context_failure("keyword_search", &error),
                }
            }
        }

        products.truncate(MAX_RELEVANT_PRODUCTS);
        products
    }
}

fn persistence(error: RepositoryError) -> EngineError {
    EngineError::Persistence(error.to_string())
}

fn log_context_failure(block: &'static str, error: &RepositoryError) {
    warn!(
        event_name = "assistant.context_block_failed",
        block,
        error = %error,
        "context block unavailable; composing prompt without it"
    );
}
