use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::info;

use shelfwise_core::content::{render_structured, strip_to_plain_text};
use shelfwise_core::decode::{decode_json, strip_code_fence};
use shelfwise_core::domain::artifact::{
    ArtifactPayload, ContentType, GeneratedContent, OptimizationArtifact,
};
use shelfwise_core::domain::product::{Product, ProductId};
use shelfwise_core::errors::EngineError;
use shelfwise_db::repositories::{ArtifactRepository, CatalogRepository};

use crate::gateway::ModelGateway;

use super::{from_gateway, persistence, require_product};

pub struct ContentGenerator {
    catalog: Arc<dyn CatalogRepository>,
    artifacts: Arc<dyn ArtifactRepository>,
    gateway: Arc<dyn ModelGateway>,
}

impl ContentGenerator {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        artifacts: Arc<dyn ArtifactRepository>,
        gateway: Arc<dyn ModelGateway>,
    ) -> Self {
        Self { catalog, artifacts, gateway }
    }

    pub async fn generate(
        &self,
        product_id: &ProductId,
        content_type: ContentType,
        original_data: &str,
    ) -> Result<OptimizationArtifact, EngineError> {
        let product = require_product(&self.catalog, product_id).await?;

        let prompt = build_prompt(&product, content_type, original_data);
        let raw = self.gateway.generate(&prompt).await.map_err(from_gateway)?;

        let generated_content = match content_type {
            ContentType::Description => {
                let plain = strip_to_plain_text(strip_code_fence(&raw));
                if plain.is_empty() {
                    return Err(EngineError::Validation(
                        "model produced an empty description".to_string(),
                    ));
                }
                plain
            }
            ContentType::Features | ContentType::Specifications => {
                let value: Value = decode_json(&raw)
                    .map_err(|error| EngineError::Validation(error.to_string()))?;
                if !value.is_array() && !value.is_object() {
                    return Err(EngineError::Validation(format!(
                        "{} output must be a JSON array or object",
                        content_type.as_str()
                    )));
                }
                let rendered = render_structured(&value);
                if rendered.is_empty() {
                    return Err(EngineError::Validation(format!(
                        "{} output contained no usable entries",
                        content_type.as_str()
                    )));
                }
                rendered
            }
        };

        let artifact = OptimizationArtifact::new_pending(
            product.id.clone(),
            product.seller_id.clone(),
            ArtifactPayload::Content(GeneratedContent {
                content_type,
                original_data: original_data.to_string(),
                generated_content,
                prompt_used: prompt,
            }),
            Utc::now(),
        );
        self.artifacts.insert(artifact.clone()).await.map_err(persistence)?;

        info!(
            event_name = "content.generated",
            product_id = %product_id,
            artifact_id = %artifact.id,
            content_type = content_type.as_str(),
            "generated content stored as pending"
        );
        Ok(artifact)
    }
}

fn build_prompt(product: &Product, content_type: ContentType, original_data: &str) -> String {
    let base = format!(
        "Product: \"{}\" in category \"{}\", priced at {}.\nSeller-provided notes: {}\n\n",
        product.name, product.category_id, product.price, original_data
    );

    match content_type {
        ContentType::Description => format!(
            "{base}Write a compelling product description of 2-4 sentences. \
             Respond with plain prose only: no markdown, no HTML, no headings."
        ),
        ContentType::Features => format!(
            "{base}List the product's key selling features. \
             Respond with ONLY a JSON array of short feature strings, \
             no prose and no code fences."
        ),
        ContentType::Specifications => format!(
            "{base}Produce the product's technical specifications. \
             Respond with ONLY a JSON object mapping specification names to \
             values, no prose and no code fences. Omit anything you do not know."
        ),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use chrono::Utc;
    use rust_decimal::Decimal;

    use shelfwise_core::domain::artifact::{ArtifactPayload, ArtifactStatus, ContentType};
    use shelfwise_core::domain::conversation::ChatMessage;
    use shelfwise_core::domain::product::{CategoryId, Product, ProductId, SellerId};
    use shelfwise_core::errors::EngineError;
    use shelfwise_db::repositories::{
        ArtifactRepository, CatalogRepository, InMemoryArtifactRepository,
        InMemoryCatalogRepository,
    };

    use crate::gateway::{GatewayError, ModelGateway};

    use super::ContentGenerator;

    struct ScriptedGateway {
        response: String,
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl ModelGateway for ScriptedGateway {
        async fn generate(&self, _prompt: &str) -> Result<String, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.response.clone())
        }

        async fn converse(
            &self,
            _messages: &[ChatMessage],
            _system_context: &str,
        ) -> Result<String, GatewayError> {
            self.generate("").await
        }
    }

    fn product() -> Product {
        let now = Utc::now();
        Product {
            id: ProductId("P-1".to_string()),
            seller_id: SellerId("S-1".to_string()),
            name: "Trail Runner".to_string(),
            category_id: CategoryId("footwear".to_string()),
            price: Decimal::new(12_900, 2),
            stock: 8,
            size_range: None,
            description: String::new(),
            specifications: String::new(),
            approved: true,
            created_at: now,
            updated_at: now,
        }
    }

    async fn generator(response: &str) -> (ContentGenerator, Arc<InMemoryArtifactRepository>) {
        let catalog = Arc::new(InMemoryCatalogRepository::default());
        catalog.save(product()).await.expect("save");
        let artifacts = Arc::new(InMemoryArtifactRepository::default());
        let gateway =
            Arc::new(ScriptedGateway { response: response.to_string(), calls: AtomicUsize::new(0) });
        (ContentGenerator::new(catalog, artifacts.clone(), gateway), artifacts)
    }

    #[tokio::test]
    async fn description_output_is_flattened_to_plain_text() {
        let (generator, _) =
            generator("# Trail Runner\n\nThe **best** shoe for <em>wet</em> trails.").await;

        let artifact = generator
            .generate(&ProductId("P-1".to_string()), ContentType::Description, "waterproof")
            .await
            .expect("generate");

        match &artifact.payload {
            ArtifactPayload::Content(content) => {
                assert_eq!(
                    content.generated_content,
                    "Trail Runner The best shoe for wet trails."
                );
                assert_eq!(content.content_type, ContentType::Description);
                assert_eq!(content.original_data, "waterproof");
                assert!(content.prompt_used.contains("Trail Runner"));
            }
            other => panic!("unexpected payload {other:?}"),
        }
        assert_eq!(artifact.status, ArtifactStatus::Pending);
    }

    #[tokio::test]
    async fn features_render_as_filtered_list() {
        let (generator, _) = generator(
            r#"["Waterproof membrane", "n/a", "Vibram outsole", "unknown"]"#,
        )
        .await;

        let artifact = generator
            .generate(&ProductId("P-1".to_string()), ContentType::Features, "")
            .await
            .expect("generate");

        match &artifact.payload {
            ArtifactPayload::Content(content) => {
                assert_eq!(
                    content.generated_content,
                    "- Waterproof membrane\n- Vibram outsole"
                );
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[tokio::test]
    async fn specifications_render_as_key_value_lines() {
        let (generator, _) = generator(
            "```json\n{\"Weight\": \"310g\", \"Drop\": \"8mm\", \"Warranty\": \"unspecified\"}\n```",
        )
        .await;

        let artifact = generator
            .generate(&ProductId("P-1".to_string()), ContentType::Specifications, "")
            .await
            .expect("generate");

        match &artifact.payload {
            ArtifactPayload::Content(content) => {
                assert_eq!(content.generated_content, "Weight: 310g\nDrop: 8mm");
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[tokio::test]
    async fn prose_where_json_was_required_is_a_validation_error() {
        let (generator, artifacts) = generator("It has many nice features!").await;

        let error = generator
            .generate(&ProductId("P-1".to_string()), ContentType::Features, "")
            .await
            .err()
            .expect("should fail");
        assert!(matches!(error, EngineError::Validation(_)));

        let stored = artifacts
            .list_for_product(&ProductId("P-1".to_string()), None)
            .await
            .expect("list");
        assert!(stored.is_empty());
    }

    #[tokio::test]
    async fn all_placeholder_output_is_rejected() {
        let (generator, _) = generator(r#"["n/a", "unknown", ""]"#).await;

        let error = generator
            .generate(&ProductId("P-1".to_string()), ContentType::Features, "")
            .await
            .err()
            .expect("should fail");
        assert!(matches!(error, EngineError::Validation(ref detail) if detail.contains("no usable entries")));
    }
}
