use crate::errors::{DbError, DomainError, DomainResult};
use crate::domains::place::types::{Place, PlaceRow, PlaceType, NewPlace};
use crate::domains::core::repository::FindById;
use crate::types::{timestamp_now, PaginatedResult, PaginationParams};
use sqlx::{SqlitePool, query, query_as, query_scalar, Transaction, Sqlite};
use async_trait::async_trait;

#[async_trait]
pub trait PlaceRepository: Send + Sync + FindById<Place> {
    async fn create(&self, place: &NewPlace) -> DomainResult<Place>;

    /// Page through places, optionally restricted to one type
    async fn find_all(
        &self,
        params: PaginationParams,
        place_type: Option<PlaceType>,
    ) -> DomainResult<PaginatedResult<Place>>;
}

pub struct SqlitePlaceRepository {
    pool: SqlitePool,
}

impl SqlitePlaceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FindById<Place> for SqlitePlaceRepository {
    async fn find_by_id(&self, id: i64) -> DomainResult<Place> {
        query_as::<_, PlaceRow>("SELECT * FROM places WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::Database(DbError::from(e)))?
            .ok_or_else(|| DomainError::EntityNotFound("Place".to_string(), id))?
            .into_entity()
    }

    async fn find_by_id_with_tx(
        &self,
        id: i64,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> DomainResult<Place> {
        query_as::<_, PlaceRow>("SELECT * FROM places WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| DomainError::Database(DbError::from(e)))?
            .ok_or_else(|| DomainError::EntityNotFound("Place".to_string(), id))?
            .into_entity()
    }
}

#[async_trait]
impl PlaceRepository for SqlitePlaceRepository {
    async fn create(&self, place: &NewPlace) -> DomainResult<Place> {
        let now = timestamp_now();
        let result = query(
            "INSERT INTO places (name, place_type, city, description, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)"
        )
        .bind(place.name.trim())
        .bind(&place.place_type)
        .bind(place.city.trim())
        .bind(&place.description)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;

        self.find_by_id(result.last_insert_rowid()).await
    }

    async fn find_all(
        &self,
        params: PaginationParams,
        place_type: Option<PlaceType>,
    ) -> DomainResult<PaginatedResult<Place>> {
        let type_filter = place_type.map(|t| t.as_str());

        let total: i64 = query_scalar(
            "SELECT COUNT(*) FROM places WHERE (?1 IS NULL OR place_type = ?1)"
        )
        .bind(type_filter)
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::from)?;

        let rows = query_as::<_, PlaceRow>(
            "SELECT * FROM places WHERE (?1 IS NULL OR place_type = ?1)
             ORDER BY name, id LIMIT ?2 OFFSET ?3"
        )
        .bind(type_filter)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(PlaceRow::into_entity)
            .collect::<DomainResult<Vec<_>>>()?;

        Ok(PaginatedResult::new(items, total as u64, params))
    }
}
