//! SurrealDB implementation of [`ProductRepository`] (the catalog).

use chrono::{DateTime, Utc};
use pirho_core::error::{PirhoError, PirhoResult};
use pirho_core::models::product::{CreateProduct, Product};
use pirho_core::repository::ProductRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::{DbError, parse_uuid};

#[derive(Debug, SurrealValue)]
struct ProductRow {
    record_id: String,
    name: String,
    image_url: Option<String>,
    price: f64,
    created_at: DateTime<Utc>,
}

impl ProductRow {
    fn try_into_product(self) -> Result<Product, DbError> {
        Ok(Product {
            id: parse_uuid(&self.record_id, "product")?,
            name: self.name,
            image_url: self.image_url,
            price: self.price,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct PriceRow {
    price: f64,
}

/// SurrealDB implementation of the Product repository.
#[derive(Clone)]
pub struct SurrealProductRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealProductRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> ProductRepository for SurrealProductRepository<C> {
    async fn create(&self, input: CreateProduct) -> PirhoResult<Product> {
        if !input.price.is_finite() || input.price < 0.0 {
            return Err(PirhoError::validation("price", "price must be a non-negative number"));
        }

        let id = Uuid::new_v4();

        let result = self
            .db
            .query(
                "CREATE type::record('product', $id) SET \
                 name = $name, image_url = $image_url, price = $price",
            )
            .bind(("id", id.to_string()))
            .bind(("name", input.name))
            .bind(("image_url", input.image_url))
            .bind(("price", input.price))
            .await
            .map_err(DbError::from)?;

        result.check().map_err(|e| DbError::Query(e.to_string()))?;

        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: Uuid) -> PirhoResult<Product> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM type::record('product', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ProductRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "product".into(),
            id: id_str,
        })?;

        row.try_into_product().map_err(Into::into)
    }

    async fn pick_random(&self, n: usize) -> PirhoResult<Vec<Product>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM product \
                 ORDER BY rand() LIMIT $limit",
            )
            .bind(("limit", n as u64))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ProductRow> = result.take(0).map_err(DbError::from)?;

        let products = rows
            .into_iter()
            .map(ProductRow::try_into_product)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(products)
    }

    async fn get_price(&self, id: Uuid) -> PirhoResult<f64> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT price FROM type::record('product', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PriceRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "product".into(),
            id: id_str,
        })?;

        Ok(row.price)
    }
}
