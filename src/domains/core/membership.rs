use std::collections::BTreeSet;
use serde::Serialize;
use sqlx::{query, query_scalar, Sqlite, Transaction};
use crate::errors::{DbError, DomainResult};

/// Difference between the persisted and the desired membership set of one parent
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MembershipDiff {
    pub to_attach: Vec<i64>,
    pub to_detach: Vec<i64>,
}

impl MembershipDiff {
    pub fn compute(current: &BTreeSet<i64>, desired: &BTreeSet<i64>) -> Self {
        Self {
            to_attach: desired.difference(current).copied().collect(),
            to_detach: current.difference(desired).copied().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to_attach.is_empty() && self.to_detach.is_empty()
    }

    /// The set that results from applying this diff to `current`
    pub fn apply_to(&self, current: &BTreeSet<i64>) -> BTreeSet<i64> {
        let mut next = current.clone();
        for id in &self.to_detach {
            next.remove(id);
        }
        next.extend(self.to_attach.iter().copied());
        next
    }
}

/// A many-to-many join table with exactly two foreign keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MembershipTable {
    pub table: &'static str,
    pub parent_column: &'static str,
    pub child_column: &'static str,
}

pub const PROPERTY_FACILITIES: MembershipTable = MembershipTable {
    table: "property_facilities",
    parent_column: "property_id",
    child_column: "facility_id",
};

pub const ROOM_AMENITIES: MembershipTable = MembershipTable {
    table: "room_property_amenities",
    parent_column: "room_property_id",
    child_column: "amenity_id",
};

impl MembershipTable {
    pub async fn load_with_tx(
        &self,
        parent_id: i64,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> DomainResult<BTreeSet<i64>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ?",
            self.child_column, self.table, self.parent_column
        );
        let ids: Vec<i64> = query_scalar(&sql)
            .bind(parent_id)
            .fetch_all(&mut **tx)
            .await
            .map_err(DbError::from)?;
        Ok(ids.into_iter().collect())
    }

    /// Make the parent's membership set equal `desired`. An unchanged set issues no writes.
    pub async fn sync_with_tx(
        &self,
        parent_id: i64,
        desired: &BTreeSet<i64>,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> DomainResult<MembershipDiff> {
        let current = self.load_with_tx(parent_id, tx).await?;
        let diff = MembershipDiff::compute(&current, desired);
        if diff.is_empty() {
            return Ok(diff);
        }

        let delete_sql = format!(
            "DELETE FROM {} WHERE {} = ? AND {} = ?",
            self.table, self.parent_column, self.child_column
        );
        for child_id in &diff.to_detach {
            query(&delete_sql)
                .bind(parent_id)
                .bind(*child_id)
                .execute(&mut **tx)
                .await
                .map_err(DbError::from)?;
        }

        let insert_sql = format!(
            "INSERT INTO {} ({}, {}) VALUES (?, ?)",
            self.table, self.parent_column, self.child_column
        );
        for child_id in &diff.to_attach {
            query(&insert_sql)
                .bind(parent_id)
                .bind(*child_id)
                .execute(&mut **tx)
                .await
                .map_err(DbError::from)?;
        }

        Ok(diff)
    }

    /// Remove every membership row of the parent; returns the number of rows removed
    pub async fn clear_with_tx(
        &self,
        parent_id: i64,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> DomainResult<u64> {
        let sql = format!("DELETE FROM {} WHERE {} = ?", self.table, self.parent_column);
        let result = query(&sql)
            .bind(parent_id)
            .execute(&mut **tx)
            .await
            .map_err(DbError::from)?;
        Ok(result.rows_affected())
    }

    /// Remove every membership row pointing at a catalog entry
    pub async fn clear_child_with_tx(
        &self,
        child_id: i64,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> DomainResult<u64> {
        let sql = format!("DELETE FROM {} WHERE {} = ?", self.table, self.child_column);
        let result = query(&sql)
            .bind(child_id)
            .execute(&mut **tx)
            .await
            .map_err(DbError::from)?;
        Ok(result.rows_affected())
    }
}
