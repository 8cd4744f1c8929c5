#![allow(dead_code)]

use hospitality_core::auth::AuthContext;
use hospitality_core::types::{timestamp_now, UserRole};
use hospitality_core::{initialize, CoreConfig, CoreServices};
use sqlx::SqlitePool;

/// Fresh in-memory database with the schema applied
pub async fn setup() -> CoreServices {
    initialize(&CoreConfig::in_memory())
        .await
        .expect("in-memory core should initialize")
}

pub fn admin() -> AuthContext {
    AuthContext::new(1, UserRole::Admin)
}

pub fn owner(user_id: i64) -> AuthContext {
    AuthContext::new(user_id, UserRole::Owner)
}

pub fn staff(user_id: i64) -> AuthContext {
    AuthContext::new(user_id, UserRole::Staff)
}

/// Insert a user with a fixed id so tests can refer to it directly
pub async fn insert_user(pool: &SqlitePool, id: i64, role: &str) {
    let now = timestamp_now();
    sqlx::query(
        "INSERT INTO users (id, name, email, role, active, created_at, updated_at) VALUES (?, ?, ?, ?, 1, ?, ?)"
    )
    .bind(id)
    .bind(format!("User {}", id))
    .bind(format!("user{}@example.com", id))
    .bind(role)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await
    .expect("insert user");
}

pub async fn insert_place(pool: &SqlitePool, id: i64, name: &str) {
    let now = timestamp_now();
    sqlx::query(
        "INSERT INTO places (id, name, place_type, city, description, created_at, updated_at)
         VALUES (?, ?, 'hotel', 'Lisbon', NULL, ?, ?)"
    )
    .bind(id)
    .bind(name)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await
    .expect("insert place");
}

/// Insert into `facilities` or `amenities` with a fixed id
pub async fn insert_catalog(pool: &SqlitePool, table: &str, id: i64, name: &str) {
    let now = timestamp_now();
    sqlx::query(&format!(
        "INSERT INTO {} (id, name, created_at, updated_at) VALUES (?, ?, ?, ?)",
        table
    ))
    .bind(id)
    .bind(name)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await
    .expect("insert catalog entry");
}

/// Admin user 1, owners 5 and 6, staff 7, places 42-44, facilities 1-3 and amenities 3-5
pub async fn seed(services: &CoreServices) {
    let pool = services.pool();
    insert_user(pool, 1, "admin").await;
    insert_user(pool, 5, "owner").await;
    insert_user(pool, 6, "owner").await;
    insert_user(pool, 7, "staff").await;

    insert_place(pool, 42, "Harbor View").await;
    insert_place(pool, 43, "Old Town Inn").await;
    insert_place(pool, 44, "Beach House").await;

    insert_catalog(pool, "facilities", 1, "Parking").await;
    insert_catalog(pool, "facilities", 2, "Pool").await;
    insert_catalog(pool, "facilities", 3, "Gym").await;
    insert_catalog(pool, "amenities", 3, "Minibar").await;
    insert_catalog(pool, "amenities", 4, "Balcony").await;
    insert_catalog(pool, "amenities", 5, "Bathtub").await;
}

pub async fn count(pool: &SqlitePool, sql: &str) -> i64 {
    sqlx::query_scalar(sql).fetch_one(pool).await.expect("count query")
}
