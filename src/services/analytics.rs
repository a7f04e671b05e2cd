//! Monthly spending summaries: income/expense totals plus per-category and
//! per-member breakdowns, computed with SQL aggregation rather than by
//! loading rows.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Utc};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect, Select,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::models::group::{self, Entity as Group};
use crate::models::transaction::{self, Entity as Transaction, TransactionKind};
use crate::models::user::{self, Entity as User};

/// A closed-open month window, `[start, end)`.
#[derive(Debug, Clone)]
pub struct Period {
    pub label: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// Parse an optional `YYYY-MM` period. `None` means the current month.
pub fn parse_period(input: Option<&str>) -> Result<Period, AppError> {
    let (year, month) = match input {
        None | Some("") => {
            let today = Utc::now().date_naive();
            (today.year(), today.month())
        }
        Some(raw) => {
            let parsed = raw
                .split_once('-')
                .and_then(|(y, m)| Some((y.parse::<i32>().ok()?, m.parse::<u32>().ok()?)))
                .filter(|&(y, m)| (1970..=9999).contains(&y) && (1..=12).contains(&m));
            parsed.ok_or_else(|| {
                AppError::Validation("Period must be in YYYY-MM format".to_string())
            })?
        }
    };

    let start = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| AppError::Validation("Period must be in YYYY-MM format".to_string()))?;
    let end = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(|| AppError::Validation("Period must be in YYYY-MM format".to_string()))?;

    Ok(Period {
        label: format!("{year:04}-{month:02}"),
        start: start.and_hms_opt(0, 0, 0).unwrap_or_default(),
        end: end.and_hms_opt(0, 0, 0).unwrap_or_default(),
    })
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AnalyticsSummary {
    pub period: String,
    pub total_income: f64,
    pub total_expense: f64,
    pub net: f64,
    /// Expense totals keyed by category; rows without a category land under
    /// "uncategorized".
    pub by_category: BTreeMap<String, f64>,
    /// Expense totals keyed by group name, over the user's group-tagged
    /// transactions. Untagged spending is not represented here.
    pub by_group: BTreeMap<String, f64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GroupAnalyticsSummary {
    pub period: String,
    pub total_income: f64,
    pub total_expense: f64,
    pub net: f64,
    pub by_category: BTreeMap<String, f64>,
    /// Expense totals keyed by member username.
    pub by_member: BTreeMap<String, f64>,
}

fn in_period(query: Select<Transaction>, period: &Period) -> Select<Transaction> {
    query
        .filter(transaction::Column::CreatedAt.gte(period.start))
        .filter(transaction::Column::CreatedAt.lt(period.end))
}

/// Income and expense totals for a pre-filtered query.
async fn totals(
    db: &DatabaseConnection,
    query: Select<Transaction>,
) -> Result<(f64, f64), AppError> {
    let rows: Vec<(TransactionKind, Option<f64>)> = query
        .select_only()
        .column(transaction::Column::Kind)
        .column_as(transaction::Column::Amount.sum(), "total")
        .group_by(transaction::Column::Kind)
        .into_tuple()
        .all(db)
        .await?;

    let mut income = 0.0;
    let mut expense = 0.0;
    for (kind, total) in rows {
        match kind {
            TransactionKind::Income => income = total.unwrap_or(0.0),
            TransactionKind::Expense => expense = total.unwrap_or(0.0),
        }
    }
    Ok((income, expense))
}

/// Expense totals per category for a pre-filtered query.
async fn expense_by_category(
    db: &DatabaseConnection,
    query: Select<Transaction>,
) -> Result<BTreeMap<String, f64>, AppError> {
    let rows: Vec<(Option<String>, Option<f64>)> = query
        .filter(transaction::Column::Kind.eq(TransactionKind::Expense))
        .select_only()
        .column(transaction::Column::Category)
        .column_as(transaction::Column::Amount.sum(), "total")
        .group_by(transaction::Column::Category)
        .into_tuple()
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(category, total)| {
            (
                category.unwrap_or_else(|| "uncategorized".to_string()),
                total.unwrap_or(0.0),
            )
        })
        .collect())
}

/// Expense totals per group for a pre-filtered query, keyed by group name.
async fn expense_by_group(
    db: &DatabaseConnection,
    query: Select<Transaction>,
) -> Result<BTreeMap<String, f64>, AppError> {
    let rows: Vec<(Option<i32>, Option<f64>)> = query
        .filter(transaction::Column::Kind.eq(TransactionKind::Expense))
        .filter(transaction::Column::GroupId.is_not_null())
        .select_only()
        .column(transaction::Column::GroupId)
        .column_as(transaction::Column::Amount.sum(), "total")
        .group_by(transaction::Column::GroupId)
        .into_tuple()
        .all(db)
        .await?;

    let group_ids: Vec<i32> = rows.iter().filter_map(|(id, _)| *id).collect();
    let names: BTreeMap<i32, String> = Group::find()
        .filter(group::Column::Id.is_in(group_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|g| (g.id, g.name))
        .collect();

    Ok(rows
        .into_iter()
        .filter_map(|(id, total)| {
            let id = id?;
            let name = names
                .get(&id)
                .cloned()
                .unwrap_or_else(|| format!("group-{id}"));
            Some((name, total.unwrap_or(0.0)))
        })
        .collect())
}

/// One user's summary for a month.
pub async fn user_summary(
    db: &DatabaseConnection,
    user_id: i32,
    period: &Period,
) -> Result<AnalyticsSummary, AppError> {
    let base =
        in_period(Transaction::find(), period).filter(transaction::Column::UserId.eq(user_id));

    let (total_income, total_expense) = totals(db, base.clone()).await?;
    let by_category = expense_by_category(db, base.clone()).await?;
    let by_group = expense_by_group(db, base).await?;

    Ok(AnalyticsSummary {
        period: period.label.clone(),
        total_income,
        total_expense,
        net: total_income - total_expense,
        by_category,
        by_group,
    })
}

/// A group's summary for a month, including who spent what.
pub async fn group_summary(
    db: &DatabaseConnection,
    group_id: i32,
    period: &Period,
) -> Result<GroupAnalyticsSummary, AppError> {
    let base =
        in_period(Transaction::find(), period).filter(transaction::Column::GroupId.eq(group_id));

    let (total_income, total_expense) = totals(db, base.clone()).await?;
    let by_category = expense_by_category(db, base.clone()).await?;

    let member_rows: Vec<(i32, Option<f64>)> = base
        .filter(transaction::Column::Kind.eq(TransactionKind::Expense))
        .select_only()
        .column(transaction::Column::UserId)
        .column_as(transaction::Column::Amount.sum(), "total")
        .group_by(transaction::Column::UserId)
        .into_tuple()
        .all(db)
        .await?;

    let user_ids: Vec<i32> = member_rows.iter().map(|(id, _)| *id).collect();
    let names: BTreeMap<i32, String> = User::find()
        .filter(user::Column::Id.is_in(user_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u.username))
        .collect();

    let by_member = member_rows
        .into_iter()
        .map(|(id, total)| {
            (
                names
                    .get(&id)
                    .cloned()
                    .unwrap_or_else(|| format!("user-{id}")),
                total.unwrap_or(0.0),
            )
        })
        .collect();

    Ok(GroupAnalyticsSummary {
        period: period.label.clone(),
        total_income,
        total_expense,
        net: total_income - total_expense,
        by_category,
        by_member,
    })
}

#[cfg(test)]
mod tests {
    use super::parse_period;

    #[test]
    fn parses_a_valid_period() {
        let p = parse_period(Some("2025-03")).unwrap();
        assert_eq!(p.label, "2025-03");
        assert_eq!(p.start.to_string(), "2025-03-01 00:00:00");
        assert_eq!(p.end.to_string(), "2025-04-01 00:00:00");
    }

    #[test]
    fn december_rolls_into_the_next_year() {
        let p = parse_period(Some("2024-12")).unwrap();
        assert_eq!(p.end.to_string(), "2025-01-01 00:00:00");
    }

    #[test]
    fn missing_period_defaults_to_the_current_month() {
        let p = parse_period(None).unwrap();
        assert!(p.start < p.end);
        assert_eq!(p.label.len(), 7);
    }

    #[test]
    fn rejects_malformed_periods() {
        for bad in ["2025", "2025-13", "2025-00", "march", "2025-3x", "20a5-03"] {
            assert!(parse_period(Some(bad)).is_err(), "accepted {bad:?}");
        }
    }
}
