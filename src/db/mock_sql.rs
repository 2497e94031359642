//! Statement planning for the mock engine.
//!
//! Uses sqlparser-rs with the generic dialect to accept the small SQL subset
//! the in-memory engine can answer. Every rejection is reported the way a
//! remote engine would report it: as a query error.

use sqlparser::ast::{Expr, Query, SelectItem, SetExpr, Statement, TableFactor};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

use crate::error::{ProbeError, Result};

/// What the mock engine should do for a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Plan {
    /// `SHOW TABLES`: one `tab_name` row per table.
    ShowTables,

    /// `SELECT <projection> FROM <table> [LIMIT n]`.
    Select {
        table: String,
        projection: Projection,
        limit: Option<usize>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Projection {
    /// `*`
    All,

    /// Source column and output name, in select-list order.
    Columns(Vec<(String, String)>),
}

/// Parses and plans a single statement.
pub(super) fn plan(sql: &str) -> Result<Plan> {
    let dialect = GenericDialect {};
    let mut statements = Parser::parse_sql(&dialect, sql)
        .map_err(|e| ProbeError::query(format!("Syntax error: {e}")))?;

    if statements.len() != 1 {
        return Err(ProbeError::query(format!(
            "Expected exactly one statement, got {}",
            statements.len()
        )));
    }

    match statements.remove(0) {
        Statement::ShowTables { .. } => Ok(Plan::ShowTables),
        Statement::Query(query) => plan_query(&query),
        other => Err(ProbeError::query(format!(
            "Statement not supported by the mock engine: {other}"
        ))),
    }
}

fn plan_query(query: &Query) -> Result<Plan> {
    let SetExpr::Select(select) = query.body.as_ref() else {
        return Err(ProbeError::query(
            "Only simple SELECT queries are supported by the mock engine",
        ));
    };

    if select.selection.is_some() {
        return Err(ProbeError::query(
            "WHERE clauses are not supported by the mock engine",
        ));
    }

    let table = match select.from.as_slice() {
        [from] if from.joins.is_empty() => match &from.relation {
            TableFactor::Table { name, .. } => name
                .0
                .iter()
                .map(|ident| ident.value.clone())
                .collect::<Vec<_>>()
                .join("."),
            other => {
                return Err(ProbeError::query(format!(
                    "Unsupported table reference: {other}"
                )))
            }
        },
        [] => return Err(ProbeError::query("SELECT without FROM is not supported")),
        _ => {
            return Err(ProbeError::query(
                "Joins are not supported by the mock engine",
            ))
        }
    };

    let projection = plan_projection(&select.projection)?;
    let limit = query.limit.as_ref().map(plan_limit).transpose()?;

    Ok(Plan::Select {
        table,
        projection,
        limit,
    })
}

fn plan_projection(items: &[SelectItem]) -> Result<Projection> {
    if let [SelectItem::Wildcard(_)] = items {
        return Ok(Projection::All);
    }

    let mut columns = Vec::with_capacity(items.len());
    for item in items {
        match item {
            SelectItem::UnnamedExpr(expr) => {
                let name = column_name(expr)?;
                columns.push((name.clone(), name));
            }
            SelectItem::ExprWithAlias { expr, alias } => {
                columns.push((column_name(expr)?, alias.value.clone()));
            }
            other => {
                return Err(ProbeError::query(format!(
                    "Unsupported select item: {other}"
                )))
            }
        }
    }
    Ok(Projection::Columns(columns))
}

fn column_name(expr: &Expr) -> Result<String> {
    match expr {
        Expr::Identifier(ident) => Ok(ident.value.clone()),
        Expr::CompoundIdentifier(parts) => parts
            .last()
            .map(|ident| ident.value.clone())
            .ok_or_else(|| ProbeError::query("Empty column reference")),
        other => Err(ProbeError::query(format!(
            "Only column references are supported by the mock engine, got: {other}"
        ))),
    }
}

fn plan_limit(expr: &Expr) -> Result<usize> {
    match expr {
        Expr::Value(sqlparser::ast::Value::Number(n, _)) => n
            .parse()
            .map_err(|_| ProbeError::query(format!("Invalid LIMIT value: {n}"))),
        other => Err(ProbeError::query(format!("Invalid LIMIT value: {other}"))),
    }
}
