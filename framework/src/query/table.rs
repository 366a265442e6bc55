use sea_orm::sea_query::{
    Alias, Asterisk, Expr, Func, IntoColumnRef, LikeExpr, Order, Query, SimpleExpr,
};
use sea_orm::{
    ConnectionTrait, EntityTrait, JoinType, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    RelationDef, Select,
};
use serde::Serialize;
use std::collections::HashMap;

use super::params::{SortDirection, TableQuery};
use crate::database::Trashed;
use crate::error::FrameworkError;

/// How a filter value is parsed before comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Text,
    Integer,
    Boolean,
}

impl FilterKind {
    /// Values that do not parse for the kind yield `None` and are ignored
    fn parse(self, raw: &str) -> Option<sea_orm::Value> {
        match self {
            FilterKind::Text => Some(raw.to_string().into()),
            FilterKind::Integer => raw.trim().parse::<i64>().ok().map(Into::into),
            FilterKind::Boolean => match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => Some(true.into()),
                "0" | "false" | "no" => Some(false.into()),
                _ => None,
            },
        }
    }
}

/// Pagination block of a listing response
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PageMeta {
    pub current_page: u64,
    pub per_page: u64,
    pub total: u64,
    pub last_page: u64,
    pub from: Option<u64>,
    pub to: Option<u64>,
}

impl PageMeta {
    pub fn new(query: &TableQuery, total: u64, rows: u64) -> Self {
        let last_page = total.div_ceil(query.per_page).max(1);
        let (from, to) = if rows == 0 {
            (None, None)
        } else {
            (Some(query.offset() + 1), Some(query.offset() + rows))
        };
        Self {
            current_page: query.page,
            per_page: query.per_page,
            total,
            last_page,
            from,
            to,
        }
    }
}

/// One page of presented rows plus the parameters that produced it
#[derive(Debug, Clone, Serialize)]
pub struct Paginated {
    pub data: Vec<serde_json::Value>,
    pub meta: PageMeta,
    pub query: serde_json::Value,
}

type Presenter = Box<dyn Fn(&mut serde_json::Value) + Send + Sync>;

/// Declares how one listing may be searched, filtered and sorted
///
/// Related columns are reached through LEFT JOINs aliased by relation
/// name, so `search_related("class_section", "name")` reads
/// `"class_section"."name"`. Joins are added once however many clauses use
/// them.
///
/// Aggregates declared with `count_as` are sortable and come back as JSON
/// integers on every backend.
///
/// ```rust,ignore
/// let spec = TableSpec::<students::Entity>::new(students::Column::Id)
///     .join("class_section", || students::Relation::ClassSection.def())
///     .search(students::Column::FirstName)
///     .search_related("class_section", "name")
///     .sort("admission_no", students::Column::AdmissionNo)
///     .filter("status", students::Column::Status, FilterKind::Text)
///     .filter_related("grade_level", "class_section", "grade_level", FilterKind::Integer)
///     .column_as("class_section_name", TableSpec::<students::Entity>::related("class_section", "name"))
///     .soft_deletes(students::Column::DeletedAt)
///     .default_sort("admission_no", SortDirection::Asc);
///
/// let page = spec.paginate(students::Entity::scoped(school_id), &query, db).await?;
/// ```
pub struct TableSpec<E: EntityTrait> {
    key: E::Column,
    joins: Vec<(String, fn() -> RelationDef)>,
    search: Vec<SimpleExpr>,
    sorts: HashMap<String, SimpleExpr>,
    filters: HashMap<String, (SimpleExpr, FilterKind)>,
    columns: Vec<(String, SimpleExpr)>,
    counts: Vec<String>,
    deleted_at: Option<E::Column>,
    default_sort: Option<(String, SortDirection)>,
    presenter: Option<Presenter>,
}

impl<E: EntityTrait> TableSpec<E> {
    /// `key` is the primary key, used as the final tie-break when sorting
    pub fn new(key: E::Column) -> Self {
        Self {
            key,
            joins: Vec::new(),
            search: Vec::new(),
            sorts: HashMap::new(),
            filters: HashMap::new(),
            columns: Vec::new(),
            counts: Vec::new(),
            deleted_at: None,
            default_sort: None,
            presenter: None,
        }
    }

    /// Column of the base table
    pub fn own(column: E::Column) -> SimpleExpr {
        Expr::col((E::default(), column)).into()
    }

    /// Column of a joined relation, addressed by its alias
    pub fn related(relation: &str, column: &str) -> SimpleExpr {
        Expr::col((Alias::new(relation), Alias::new(column))).into()
    }

    /// LEFT JOIN a relation under `name`; repeated names are ignored
    pub fn join(mut self, name: &str, relation: fn() -> RelationDef) -> Self {
        if !self.joins.iter().any(|(existing, _)| existing == name) {
            self.joins.push((name.to_string(), relation));
        }
        self
    }

    pub fn search(mut self, column: E::Column) -> Self {
        self.search.push(Self::own(column));
        self
    }

    pub fn search_related(mut self, relation: &str, column: &str) -> Self {
        self.search.push(Self::related(relation, column));
        self
    }

    pub fn sort(mut self, key: &str, column: E::Column) -> Self {
        self.sorts.insert(key.to_string(), Self::own(column));
        self
    }

    pub fn sort_related(mut self, key: &str, relation: &str, column: &str) -> Self {
        self.sorts
            .insert(key.to_string(), Self::related(relation, column));
        self
    }

    /// Sort by a computed expression such as an aggregate subquery
    pub fn sort_expr(mut self, key: &str, expr: SimpleExpr) -> Self {
        self.sorts.insert(key.to_string(), expr);
        self
    }

    pub fn filter(mut self, key: &str, column: E::Column, kind: FilterKind) -> Self {
        self.filters
            .insert(key.to_string(), (Self::own(column), kind));
        self
    }

    /// Filter on a column of a joined relation
    pub fn filter_related(
        mut self,
        key: &str,
        relation: &str,
        column: &str,
        kind: FilterKind,
    ) -> Self {
        self.filters
            .insert(key.to_string(), (Self::related(relation, column), kind));
        self
    }

    /// Sortable integer aggregate, presented under `alias`
    ///
    /// SQLite reports no type for subquery columns, so the value is read as
    /// text and turned back into a number after fetching.
    pub fn count_as(mut self, alias: &str, expr: SimpleExpr) -> Self {
        self.sorts.insert(alias.to_string(), expr.clone());
        self.columns
            .push((alias.to_string(), expr.cast_as(Alias::new("TEXT"))));
        self.counts.push(alias.to_string());
        self
    }

    /// Extra presented column
    pub fn column_as(mut self, alias: &str, expr: SimpleExpr) -> Self {
        self.columns.push((alias.to_string(), expr));
        self
    }

    pub fn soft_deletes(mut self, column: E::Column) -> Self {
        self.deleted_at = Some(column);
        self
    }

    pub fn default_sort(mut self, key: &str, direction: SortDirection) -> Self {
        self.default_sort = Some((key.to_string(), direction));
        self
    }

    /// Final touch applied to every presented row
    pub fn present(mut self, f: impl Fn(&mut serde_json::Value) + Send + Sync + 'static) -> Self {
        self.presenter = Some(Box::new(f));
        self
    }

    /// Shape `select` according to the query (everything except paging)
    pub fn apply(&self, select: Select<E>, query: &TableQuery) -> Select<E> {
        let mut select = select;

        for (name, relation) in &self.joins {
            select = select.join_as(JoinType::LeftJoin, relation(), Alias::new(name));
        }
        for (alias, expr) in &self.columns {
            select = select.column_as(expr.clone(), alias.as_str());
        }

        if let Some(column) = self.deleted_at {
            let deleted_at = Expr::col((E::default(), column));
            select = match query.trashed {
                Trashed::Without => select.filter(deleted_at.is_null()),
                Trashed::Only => select.filter(deleted_at.is_not_null()),
                Trashed::With => select,
            };
        }

        if let Some(term) = &query.search {
            if !self.search.is_empty() {
                let pattern = format!("%{}%", escape_like(&term.to_lowercase()));
                let mut any = sea_orm::Condition::any();
                for expr in &self.search {
                    any = any.add(
                        Expr::expr(Func::lower(expr.clone()))
                            .like(LikeExpr::new(pattern.clone()).escape('\\')),
                    );
                }
                select = select.filter(any);
            }
        }

        for (key, raw) in &query.filters {
            let Some((expr, kind)) = self.filters.get(key) else {
                continue;
            };
            if let Some(value) = kind.parse(raw) {
                select = select.filter(Expr::expr(expr.clone()).eq(value));
            }
        }

        let requested = query
            .sort
            .as_ref()
            .and_then(|key| self.sorts.get(key).map(|expr| (expr, query.direction)));
        let fallback = self.default_sort.as_ref().and_then(|(key, direction)| {
            self.sorts.get(key).map(|expr| (expr, *direction))
        });
        if let Some((expr, direction)) = requested.or(fallback) {
            select = select.order_by(expr.clone(), order(direction));
        }

        select.order_by(Self::own(self.key), Order::Asc)
    }

    /// Shape, count and fetch one page as presented JSON rows
    ///
    /// A page past the end yields empty `data` with correct totals.
    pub async fn paginate<C>(
        &self,
        select: Select<E>,
        query: &TableQuery,
        db: &C,
    ) -> Result<Paginated, FrameworkError>
    where
        C: ConnectionTrait,
        E::Model: Sync,
    {
        let shaped = self.apply(select, query);
        let total = shaped.clone().count(db).await?;

        let mut data = shaped
            .offset(query.offset())
            .limit(query.per_page)
            .into_json()
            .all(db)
            .await?;

        for row in data.iter_mut() {
            for alias in &self.counts {
                let count = row[alias.as_str()].as_str().and_then(|raw| raw.parse::<i64>().ok());
                row[alias.as_str()] = serde_json::json!(count.unwrap_or(0));
            }
            if let Some(present) = &self.presenter {
                present(row);
            }
        }

        let meta = PageMeta::new(query, total, data.len() as u64);
        Ok(Paginated {
            data,
            meta,
            query: query.to_json(),
        })
    }
}

fn order(direction: SortDirection) -> Order {
    match direction {
        SortDirection::Asc => Order::Asc,
        SortDirection::Desc => Order::Desc,
    }
}

/// Escape `\`, `%` and `_` so the term matches literally
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// `(SELECT COUNT(*) FROM child WHERE child.fk = parent [AND child.deleted_at IS NULL])`
pub fn related_count<R: EntityTrait>(
    foreign_key: R::Column,
    parent: impl IntoColumnRef,
    deleted_at: Option<R::Column>,
) -> SimpleExpr {
    let mut sub = Query::select();
    sub.expr(Expr::col(Asterisk).count())
        .from(R::default())
        .and_where(Expr::col((R::default(), foreign_key)).equals(parent));
    if let Some(column) = deleted_at {
        sub.and_where(Expr::col((R::default(), column)).is_null());
    }
    SimpleExpr::SubQuery(None, Box::new(sub.into_sub_query_statement()))
}
