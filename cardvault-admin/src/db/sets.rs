//! Set catalog database operations

use crate::pagination::{calculate_pagination, Page};
use cardvault_common::db::MtgSet;
use cardvault_common::Result;
use cardvault_common::time;
use serde::Serialize;
use sqlx::{SqliteExecutor, SqlitePool};
use std::collections::HashSet;

/// Set library ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SetSort {
    NameAsc,
    NameDesc,
    DateAsc,
    #[default]
    DateDesc,
}

impl SetSort {
    /// Unknown values fall back to newest release first
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("name_asc") => SetSort::NameAsc,
            Some("name_desc") => SetSort::NameDesc,
            Some("date_asc") => SetSort::DateAsc,
            _ => SetSort::DateDesc,
        }
    }

    fn order_by(&self) -> &'static str {
        match self {
            SetSort::NameAsc => "set_name ASC",
            SetSort::NameDesc => "set_name DESC",
            SetSort::DateAsc => "set_release_date ASC",
            SetSort::DateDesc => "set_release_date DESC",
        }
    }
}

/// New set row
#[derive(Debug, Clone)]
pub struct NewSet<'a> {
    pub code: &'a str,
    pub name: &'a str,
    pub svg_path: Option<&'a str>,
    pub release_date: Option<&'a str>,
    pub set_type: Option<&'a str>,
}

pub async fn existing_codes<'e, E: SqliteExecutor<'e>>(ex: E) -> Result<HashSet<String>> {
    let codes: Vec<String> = sqlx::query_scalar("SELECT set_code FROM sets")
        .fetch_all(ex)
        .await?;
    Ok(codes.into_iter().collect())
}

/// Insert a set unless its code is already known
///
/// Returns true when a row was created. Existing rows are never touched.
pub async fn insert_set<'e, E: SqliteExecutor<'e>>(ex: E, set: &NewSet<'_>) -> Result<bool> {
    let now = time::now();
    let result = sqlx::query(
        r#"
        INSERT INTO sets (set_code, set_name, set_svg_url, set_release_date, set_type, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(set_code) DO NOTHING
        "#,
    )
    .bind(set.code)
    .bind(set.name)
    .bind(set.svg_path)
    .bind(set.release_date)
    .bind(set.set_type)
    .bind(now)
    .bind(now)
    .execute(ex)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn find_by_code<'e, E: SqliteExecutor<'e>>(ex: E, code: &str) -> Result<Option<MtgSet>> {
    let set = sqlx::query_as::<_, MtgSet>("SELECT * FROM sets WHERE set_code = ?")
        .bind(code)
        .fetch_optional(ex)
        .await?;
    Ok(set)
}

/// Filtered, sorted, paginated set library
pub async fn list_sets(
    pool: &SqlitePool,
    search: Option<&str>,
    sort: SetSort,
    requested_page: i64,
    per_page: i64,
) -> Result<Page<MtgSet>> {
    let pattern = search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", s));

    let total: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM sets WHERE (? IS NULL OR set_name LIKE ?)")
            .bind(&pattern)
            .bind(&pattern)
            .fetch_one(pool)
            .await?;

    let pagination = calculate_pagination(total, requested_page, per_page);

    // order_by() only yields fixed column/direction pairs
    let sql = format!(
        "SELECT * FROM sets WHERE (? IS NULL OR set_name LIKE ?) \
         ORDER BY {}, id LIMIT ? OFFSET ?",
        sort.order_by()
    );
    let data = sqlx::query_as::<_, MtgSet>(&sql)
        .bind(&pattern)
        .bind(&pattern)
        .bind(pagination.per_page)
        .bind(pagination.offset)
        .fetch_all(pool)
        .await?;

    Ok(Page { data, pagination })
}
