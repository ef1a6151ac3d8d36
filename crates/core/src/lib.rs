pub mod config;
pub mod content;
pub mod decode;
pub mod domain;
pub mod errors;
pub mod keywords;
pub mod sizing;

pub use decode::{decode_json, strip_code_fence, DecodeError};
pub use domain::activity::{ActivityType, UserActivity, UserId};
pub use domain::artifact::{
    ArtifactId, ArtifactPayload, ArtifactStatus, ArtifactType, ContentType, DemandForecast,
    ForecastFactors, GeneratedContent, InventoryOptimization, OptimizationArtifact,
    PriceOptimization,
};
pub use domain::conversation::{ChatMessage, ChatRole, Conversation, ConversationKey};
pub use domain::product::{CategoryId, Product, ProductId, SellerId};
pub use domain::relationship::{ProductRelationship, RelationshipKind};
pub use domain::sales::SalesHistoryRecord;
pub use errors::EngineError;
pub use keywords::KeywordCategoryMap;
pub use sizing::{closest_size, SizePreference, SizeRecommendation, ORDINAL_SIZES};
