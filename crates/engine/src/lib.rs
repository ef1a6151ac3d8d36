//! Merchandising intelligence engines.
//!
//! Two cooperating halves share this crate:
//!
//! - **Recommendation side** (buyer-facing, read-only): personalized and
//!   complementary product recommendations, the size recommender, and the
//!   conversational shopping assistant. Every path is a fallback chain that
//!   degrades to a more generic tier instead of failing.
//! - **Optimization side** (seller-facing, write-capable): the four
//!   artifact generators (forecast, price, inventory, content) and the
//!   lifecycle manager. Generators turn untrusted model text into validated
//!   pending artifacts; only the lifecycle manager's `apply` ever mutates a
//!   product record.
//!
//! # Safety principle
//!
//! The model is strictly a drafting tool. It never writes to the catalog:
//! its output must survive the decode/validate boundary, land as a pending
//! artifact, and be explicitly applied by the owning seller.

pub mod assistant;
pub mod gateway;
pub mod generators;
pub mod lifecycle;
pub mod recommend;
pub mod sizing;

pub use assistant::{AssistantRequest, ShoppingAssistant};
pub use gateway::{GatewayError, HttpModelGateway, ModelGateway};
pub use generators::{
    ContentGenerator, ForecastGenerator, InventoryOptimizer, PriceOptimizer,
};
pub use lifecycle::OptimizationLifecycle;
pub use recommend::RecommendationEngine;
pub use sizing::SizeRecommender;
