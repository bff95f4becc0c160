//! Item list filtering.
//!
//! Query parameters are parsed into an [`ItemFilter`], which then produces a
//! single SeaORM [`Condition`] (every present parameter ANDed together) and an
//! ordering. Absent or empty parameters contribute nothing.

use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr, Query as SeaQuery};
use sea_orm::{ColumnTrait, Condition, ExprTrait, Order};
use serde::Deserialize;

use crate::entity::{item, item_tag};
use crate::error::AppError;
use crate::models::shared::escape_like;

/// Raw list query string. Values are kept as text so that empty parameters
/// (`?location=`) can be treated as absent rather than as parse errors.
#[derive(Deserialize, Default, Debug, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ItemListQuery {
    /// Case-insensitive substring matched against name or description.
    pub name: Option<String>,
    /// Same matching as `name`; kept for clients using a generic search box.
    pub search: Option<String>,
    /// Location ID.
    pub location: Option<String>,
    /// Tag ID the item must carry.
    pub tag: Option<String>,
    /// Group ID.
    pub group: Option<String>,
    /// `true` to list only the caller's items.
    pub mine: Option<String>,
    /// `id`, `name` or `created_at`, prefixed with `-` for descending.
    pub ordering: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOrdering {
    Id,
    Name,
    CreatedAt,
}

impl ItemOrdering {
    fn column(self) -> item::Column {
        match self {
            ItemOrdering::Id => item::Column::Id,
            ItemOrdering::Name => item::Column::Name,
            ItemOrdering::CreatedAt => item::Column::CreatedAt,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemFilter {
    pub text: Vec<String>,
    pub location: Option<i32>,
    pub tag: Option<i32>,
    pub group: Option<i32>,
    pub owner: Option<i32>,
    pub order_by: ItemOrdering,
    pub descending: bool,
}

impl Default for ItemFilter {
    fn default() -> Self {
        Self {
            text: Vec::new(),
            location: None,
            tag: None,
            group: None,
            owner: None,
            order_by: ItemOrdering::Id,
            descending: false,
        }
    }
}

impl ItemFilter {
    /// Resolve a raw query for `caller_id`; `mine=true` becomes an owner constraint.
    pub fn from_query(query: ItemListQuery, caller_id: i32) -> Result<Self, AppError> {
        let mut filter = ItemFilter::default();

        for term in [query.name, query.search].into_iter().flatten() {
            let term = term.trim();
            if !term.is_empty() {
                filter.text.push(term.to_string());
            }
        }

        filter.location = parse_id("location", query.location.as_deref())?;
        filter.tag = parse_id("tag", query.tag.as_deref())?;
        filter.group = parse_id("group", query.group.as_deref())?;

        if parse_bool("mine", query.mine.as_deref())? == Some(true) {
            filter.owner = Some(caller_id);
        }

        if let Some(raw) = non_empty(query.ordering.as_deref()) {
            let (descending, field) = match raw.strip_prefix('-') {
                Some(field) => (true, field),
                None => (false, raw),
            };
            filter.order_by = match field {
                "id" => ItemOrdering::Id,
                "name" => ItemOrdering::Name,
                "created_at" => ItemOrdering::CreatedAt,
                _ => {
                    return Err(AppError::Validation(
                        "ordering must be one of: id, name, created_at (optionally prefixed with '-')"
                            .into(),
                    ));
                }
            };
            filter.descending = descending;
        }

        Ok(filter)
    }

    /// All constraints ANDed together.
    pub fn condition(&self) -> Condition {
        let mut cond = Condition::all();
        for term in &self.text {
            cond = cond.add(text_match(term));
        }
        cond.add_option(self.location.map(|id| item::Column::LocationId.eq(id)))
            .add_option(self.group.map(|id| item::Column::GroupId.eq(id)))
            .add_option(self.owner.map(|id| item::Column::OwnerId.eq(id)))
            .add_option(self.tag.map(has_tag))
    }

    pub fn ordering(&self) -> (item::Column, Order) {
        let order = if self.descending {
            Order::Desc
        } else {
            Order::Asc
        };
        (self.order_by.column(), order)
    }
}

/// Substring match on name OR description.
///
/// Each column is compared both through `LOWER()` against the lowercased term
/// and verbatim against the term as typed. SQLite's `LOWER()` folds ASCII
/// only, so the verbatim arm is what lets exact-case non-ASCII terms match.
fn text_match(term: &str) -> Condition {
    let folded = format!("%{}%", escape_like(&term.to_lowercase()));
    let verbatim = format!("%{}%", escape_like(term));

    [item::Column::Name, item::Column::Description]
        .into_iter()
        .fold(Condition::any(), |cond, column| {
            cond.add(
                Expr::expr(Func::lower(Expr::col(column)))
                    .like(LikeExpr::new(folded.clone()).escape('\\')),
            )
            .add(Expr::col(column).like(LikeExpr::new(verbatim.clone()).escape('\\')))
        })
}

fn has_tag(tag_id: i32) -> Condition {
    Condition::all().add(
        item::Column::Id.in_subquery(
            SeaQuery::select()
                .column(item_tag::Column::ItemId)
                .from(item_tag::Entity)
                .and_where(item_tag::Column::TagId.eq(tag_id))
                .to_owned(),
        ),
    )
}

fn non_empty(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

fn parse_id(param: &str, raw: Option<&str>) -> Result<Option<i32>, AppError> {
    non_empty(raw)
        .map(|s| {
            s.parse::<i32>()
                .map_err(|_| AppError::Validation(format!("{param} must be an integer ID")))
        })
        .transpose()
}

fn parse_bool(param: &str, raw: Option<&str>) -> Result<Option<bool>, AppError> {
    let Some(s) = non_empty(raw) else {
        return Ok(None);
    };
    match s.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(Some(true)),
        "false" | "0" | "no" | "off" => Ok(Some(false)),
        _ => Err(AppError::Validation(format!("{param} must be a boolean"))),
    }
}
