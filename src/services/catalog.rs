use crate::entities::product;
use sea_orm::{DatabaseConnection, EntityTrait, QueryOrder};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, instrument};

/// Product as served to the storefront.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: String,
    pub rating: f64,
    pub image: String,
    pub features: Vec<String>,
}

impl From<product::Model> for Product {
    fn from(model: product::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            price: model.price,
            rating: model.rating,
            image: model.image,
            features: serde_json::from_value(model.features).unwrap_or_default(),
        }
    }
}

/// Read-only catalog; falls back to the built-in list when the table is
/// empty or unreachable.
#[derive(Clone)]
pub struct CatalogService {
    db: Option<Arc<DatabaseConnection>>,
}

impl CatalogService {
    pub fn new(db: Option<Arc<DatabaseConnection>>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Vec<Product> {
        let Some(db) = &self.db else {
            return static_products();
        };

        match product::Entity::find()
            .order_by_asc(product::Column::Id)
            .all(db.as_ref())
            .await
        {
            Ok(rows) if !rows.is_empty() => rows.into_iter().map(Product::from).collect(),
            Ok(_) => {
                debug!("products table is empty; serving built-in catalog");
                static_products()
            }
            Err(e) => {
                error!(error = %e, "failed to fetch products; serving built-in catalog");
                static_products()
            }
        }
    }
}

fn coffee(
    id: &str,
    name: &str,
    description: &str,
    price: &str,
    rating: f64,
    features: &[&str],
) -> Product {
    Product {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        price: price.to_string(),
        rating,
        image: format!("/images/{}.jpg", id),
        features: features.iter().map(|f| f.to_string()).collect(),
    }
}

pub fn static_products() -> Vec<Product> {
    vec![
        coffee(
            "ethiopian-yirgacheffe",
            "Ethiopian Yirgacheffe",
            "Bright and floral with notes of bergamot, lemon and jasmine.",
            "$24.99",
            4.9,
            &["Light Roast", "Single Origin", "Washed Process"],
        ),
        coffee(
            "colombian-supremo",
            "Colombian Supremo",
            "Balanced and smooth with caramel sweetness and a nutty finish.",
            "$19.99",
            4.7,
            &["Medium Roast", "Single Origin", "Huila Region"],
        ),
        coffee(
            "sumatra-mandheling",
            "Sumatra Mandheling",
            "Earthy and full-bodied with hints of dark chocolate and cedar.",
            "$22.99",
            4.6,
            &["Dark Roast", "Wet-Hulled", "Low Acidity"],
        ),
        coffee(
            "guatemala-antigua",
            "Guatemala Antigua",
            "Rich cocoa and spice grown in volcanic soil.",
            "$21.99",
            4.8,
            &["Medium-Dark Roast", "Volcanic Soil", "Shade Grown"],
        ),
        coffee(
            "kenya-aa",
            "Kenya AA",
            "Juicy blackcurrant acidity with a wine-like body.",
            "$26.99",
            4.8,
            &["Light-Medium Roast", "AA Grade", "Bold Acidity"],
        ),
        coffee(
            "house-espresso",
            "House Espresso Blend",
            "Our signature blend for a syrupy shot with crema to spare.",
            "$18.99",
            4.7,
            &["Espresso Roast", "Blend", "Chocolate Notes"],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::cart::parse_price;
    use sea_orm::{ActiveModelTrait, Set};

    #[test]
    fn static_prices_parse() {
        for product in static_products() {
            assert!(parse_price(&product.price).is_ok(), "{}", product.price);
        }
    }

    #[tokio::test]
    async fn without_database_serves_static_list() {
        let products = CatalogService::new(None).list_products().await;
        assert_eq!(products, static_products());
    }

    #[tokio::test]
    async fn empty_table_serves_static_list() {
        let pool = crate::db::test_pool().await;
        let products = CatalogService::new(Some(Arc::new(pool)))
            .list_products()
            .await;
        assert_eq!(products.len(), static_products().len());
    }

    #[tokio::test]
    async fn stored_products_take_precedence() {
        let pool = crate::db::test_pool().await;
        product::ActiveModel {
            id: Set("seasonal-panama".into()),
            name: Set("Panama Geisha".into()),
            description: Set("Tea-like and delicate.".into()),
            price: Set("$49.00".into()),
            rating: Set(5.0),
            image: Set("/images/seasonal-panama.jpg".into()),
            features: Set(serde_json::json!(["Limited"])),
        }
        .insert(&pool)
        .await
        .unwrap();

        let products = CatalogService::new(Some(Arc::new(pool)))
            .list_products()
            .await;
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].name, "Panama Geisha");
        assert_eq!(products[0].features, vec!["Limited".to_string()]);
    }
}
