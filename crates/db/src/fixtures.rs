//! Small demo dataset for local development: a handful of approved
//! products, curated complementary edges, recent shopper activity, and a
//! short sales history for the optimization generators to chew on.

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde_json::json;

use shelfwise_core::domain::activity::{ActivityType, UserActivity, UserId};
use shelfwise_core::domain::product::{CategoryId, Product, ProductId, SellerId};
use shelfwise_core::domain::relationship::{ProductRelationship, RelationshipKind};
use shelfwise_core::domain::sales::SalesHistoryRecord;

use crate::repositories::{
    ActivityRepository, CatalogRepository, RelationshipRepository, RepositoryError,
    SalesHistoryRepository, SqlActivityRepository, SqlCatalogRepository,
    SqlRelationshipRepository, SqlSalesHistoryRepository,
};
use crate::DbPool;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub products: usize,
    pub relationships: usize,
    pub activities: usize,
    pub sales_records: usize,
}

struct ProductSeed {
    id: &'static str,
    name: &'static str,
    category: &'static str,
    price_cents: i64,
    stock: i64,
    sizes: Option<&'static str>,
    description: &'static str,
}

const PRODUCT_SEEDS: &[ProductSeed] = &[
    ProductSeed {
        id: "prod_trail_runner",
        name: "Trail Runner GTX",
        category: "footwear",
        price_cents: 12_900,
        stock: 34,
        sizes: Some("40,41,42,43,44"),
        description: "Waterproof trail running shoe with aggressive grip",
    },
    ProductSeed {
        id: "prod_wool_socks",
        name: "Merino Hiking Socks",
        category: "footwear",
        price_cents: 1_800,
        stock: 120,
        sizes: Some("S,M,L"),
        description: "Cushioned merino socks for long hikes",
    },
    ProductSeed {
        id: "prod_rain_shell",
        name: "Packable Rain Shell",
        category: "apparel",
        price_cents: 9_400,
        stock: 18,
        sizes: Some("XS,S,M,L,XL"),
        description: "Ultralight shell that packs into its own pocket",
    },
    ProductSeed {
        id: "prod_daypack",
        name: "22L Daypack",
        category: "accessories",
        price_cents: 7_200,
        stock: 25,
        sizes: None,
        description: "Streamlined pack with hydration sleeve",
    },
    ProductSeed {
        id: "prod_headlamp",
        name: "Rechargeable Headlamp",
        category: "electronics",
        price_cents: 4_500,
        stock: 40,
        sizes: None,
        description: "400 lumen USB-C headlamp with red mode",
    },
];

pub async fn seed_demo_data(pool: &DbPool) -> Result<SeedSummary, RepositoryError> {
    let catalog = SqlCatalogRepository::new(pool.clone());
    let relationships = SqlRelationshipRepository::new(pool.clone());
    let activity = SqlActivityRepository::new(pool.clone());
    let sales = SqlSalesHistoryRepository::new(pool.clone());

    let mut summary = SeedSummary::default();
    let now = Utc::now();
    let seller = SellerId("seller_basecamp".to_string());

    for (index, seed) in PRODUCT_SEEDS.iter().enumerate() {
        let created_at = now - Duration::days(index as i64);
        catalog
            .save(Product {
                id: ProductId(seed.id.to_string()),
                seller_id: seller.clone(),
                name: seed.name.to_string(),
                category_id: CategoryId(seed.category.to_string()),
                price: Decimal::new(seed.price_cents, 2),
                stock: seed.stock,
                size_range: seed.sizes.map(str::to_string),
                description: seed.description.to_string(),
                specifications: String::new(),
                approved: true,
                created_at,
                updated_at: created_at,
            })
            .await?;
        summary.products += 1;
    }

    let edges = [
        ("prod_trail_runner", "prod_wool_socks", 0.9),
        ("prod_trail_runner", "prod_daypack", 0.6),
        ("prod_rain_shell", "prod_daypack", 0.7),
    ];
    for (source, related, strength) in edges {
        relationships
            .save(ProductRelationship {
                source_product_id: ProductId(source.to_string()),
                related_product_id: ProductId(related.to_string()),
                kind: RelationshipKind::Complementary,
                strength,
            })
            .await?;
        summary.relationships += 1;
    }

    let shopper = UserId("user_demo".to_string());
    let events = [
        (ActivityType::View, "prod_trail_runner", "footwear", 3, json!({})),
        (ActivityType::AddToCart, "prod_trail_runner", "footwear", 2, json!({})),
        (
            ActivityType::Purchase,
            "prod_trail_runner",
            "footwear",
            1,
            json!({ "size": "42", "quantity": 1 }),
        ),
        (
            ActivityType::Purchase,
            "prod_wool_socks",
            "footwear",
            1,
            json!({ "size": "M", "quantity": 2 }),
        ),
        (ActivityType::View, "prod_headlamp", "electronics", 0, json!({})),
    ];
    for (activity_type, product, category, age_days, payload) in events {
        activity
            .record(UserActivity {
                user_id: Some(shopper.clone()),
                session_id: "session_demo".to_string(),
                activity_type,
                product_id: Some(ProductId(product.to_string())),
                category_id: Some(CategoryId(category.to_string())),
                search_query: None,
                payload,
                occurred_at: now - Duration::days(age_days),
            })
            .await?;
        summary.activities += 1;
    }

    let today = now.date_naive();
    for week in 0..8i64 {
        let date = today - Duration::weeks(week);
        sales
            .record(SalesHistoryRecord {
                product_id: ProductId("prod_trail_runner".to_string()),
                seller_id: seller.clone(),
                date,
                quantity: 6 + (week % 3),
                revenue: Decimal::new(12_900 * (6 + (week % 3)), 2),
                cost_price: Decimal::new(6_400, 2),
                profit_margin: 0.48,
                channel: "web".to_string(),
                promotion_applied: week % 4 == 0,
                seasonality: Some(if week < 4 { "summer" } else { "spring" }.to_string()),
            })
            .await?;
        summary.sales_records += 1;
    }

    Ok(summary)
}
