//! Boolean expression tree for WHERE/HAVING clauses.
//!
//! `Expr::build()` assigns `$n` placeholders while it walks the tree, so
//! nested groups never need string rewriting afterwards.

use crate::qb::param::ParamList;
use crate::types::{Param, ToParam};

/// Expression node for building WHERE/HAVING clauses.
#[derive(Clone, Debug)]
pub enum Expr {
    /// All conditions must hold.
    And(Vec<Expr>),
    /// At least one condition must hold.
    Or(Vec<Expr>),
    Not(Box<Expr>),
    /// `column op $n`
    Compare {
        column: String,
        op: &'static str,
        value: Param,
    },
    /// `column IS [NOT] NULL`
    NullCheck { column: String, is_null: bool },
    /// `column [NOT] IN ($n, ...)`
    InList {
        column: String,
        values: Vec<Param>,
        negated: bool,
    },
    /// `column [NOT] BETWEEN $n AND $m`
    Between {
        column: String,
        from: Param,
        to: Param,
        negated: bool,
    },
    /// SQL with `?` placeholders, numbered at build time.
    Template { sql: String, params: Vec<Param> },
    /// SQL fragment without parameters.
    Raw(String),
    True,
    False,
}

impl Expr {
    pub fn and(exprs: Vec<Expr>) -> Self {
        Expr::And(exprs)
    }

    pub fn or(exprs: Vec<Expr>) -> Self {
        Expr::Or(exprs)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(expr: Expr) -> Self {
        Expr::Not(Box::new(expr))
    }

    /// `column <op> value` for an arbitrary comparison operator.
    pub fn compare<T: ToParam>(column: impl Into<String>, op: &'static str, value: T) -> Self {
        Expr::Compare {
            column: column.into(),
            op,
            value: Param::new(&value),
        }
    }

    pub fn eq<T: ToParam>(column: impl Into<String>, value: T) -> Self {
        Self::compare(column, "=", value)
    }

    pub fn ne<T: ToParam>(column: impl Into<String>, value: T) -> Self {
        Self::compare(column, "!=", value)
    }

    pub fn gt<T: ToParam>(column: impl Into<String>, value: T) -> Self {
        Self::compare(column, ">", value)
    }

    pub fn gte<T: ToParam>(column: impl Into<String>, value: T) -> Self {
        Self::compare(column, ">=", value)
    }

    pub fn lt<T: ToParam>(column: impl Into<String>, value: T) -> Self {
        Self::compare(column, "<", value)
    }

    pub fn lte<T: ToParam>(column: impl Into<String>, value: T) -> Self {
        Self::compare(column, "<=", value)
    }

    pub fn like<T: ToParam>(column: impl Into<String>, pattern: T) -> Self {
        Self::compare(column, "LIKE", pattern)
    }

    /// Case-insensitive LIKE.
    pub fn ilike<T: ToParam>(column: impl Into<String>, pattern: T) -> Self {
        Self::compare(column, "ILIKE", pattern)
    }

    pub fn not_like<T: ToParam>(column: impl Into<String>, pattern: T) -> Self {
        Self::compare(column, "NOT LIKE", pattern)
    }

    pub fn not_ilike<T: ToParam>(column: impl Into<String>, pattern: T) -> Self {
        Self::compare(column, "NOT ILIKE", pattern)
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Expr::NullCheck {
            column: column.into(),
            is_null: true,
        }
    }

    pub fn is_not_null(column: impl Into<String>) -> Self {
        Expr::NullCheck {
            column: column.into(),
            is_null: false,
        }
    }

    /// `column IN (...)`. An empty list matches nothing.
    pub fn in_list<T: ToParam>(
        column: impl Into<String>,
        values: impl IntoIterator<Item = T>,
    ) -> Self {
        Self::membership(column.into(), values, false)
    }

    /// `column NOT IN (...)`. An empty list matches everything.
    pub fn not_in<T: ToParam>(
        column: impl Into<String>,
        values: impl IntoIterator<Item = T>,
    ) -> Self {
        Self::membership(column.into(), values, true)
    }

    fn membership<T: ToParam>(
        column: String,
        values: impl IntoIterator<Item = T>,
        negated: bool,
    ) -> Self {
        let values: Vec<Param> = values.into_iter().map(|v| Param::new(&v)).collect();
        match (values.is_empty(), negated) {
            (true, false) => Expr::False,
            (true, true) => Expr::True,
            (false, _) => Expr::InList {
                column,
                values,
                negated,
            },
        }
    }

    pub fn between<T: ToParam>(column: impl Into<String>, from: T, to: T) -> Self {
        Expr::Between {
            column: column.into(),
            from: Param::new(&from),
            to: Param::new(&to),
            negated: false,
        }
    }

    pub fn not_between<T: ToParam>(column: impl Into<String>, from: T, to: T) -> Self {
        Expr::Between {
            column: column.into(),
            from: Param::new(&from),
            to: Param::new(&to),
            negated: true,
        }
    }

    /// SQL with `?` placeholders and pre-encoded params.
    ///
    /// ```ignore
    /// Expr::template("a = ? OR b = ?", vec![Param::new(&1), Param::new(&2)])
    /// ```
    pub fn template(sql: impl Into<String>, params: Vec<Param>) -> Self {
        Expr::Template {
            sql: sql.into(),
            params,
        }
    }

    /// SQL with `?` placeholders, encoding each value.
    pub fn template_values<T: ToParam>(
        sql: impl Into<String>,
        values: impl IntoIterator<Item = T>,
    ) -> Self {
        Expr::Template {
            sql: sql.into(),
            params: values.into_iter().map(|v| Param::new(&v)).collect(),
        }
    }

    pub fn raw(sql: impl Into<String>) -> Self {
        Expr::Raw(sql.into())
    }

    /// True when the expression renders to nothing.
    pub fn is_empty(&self) -> bool {
        match self {
            Expr::And(exprs) | Expr::Or(exprs) => exprs.iter().all(Expr::is_empty),
            Expr::Not(inner) => inner.is_empty(),
            _ => false,
        }
    }

    /// Render the fragment, pushing its params into `params`.
    pub fn build(&self, params: &mut ParamList) -> String {
        match self {
            Expr::And(exprs) => join_group(exprs, " AND ", params),
            Expr::Or(exprs) => join_group(exprs, " OR ", params),
            Expr::Not(inner) => {
                let sql = inner.build(params);
                if sql.is_empty() {
                    sql
                } else {
                    format!("NOT ({})", sql)
                }
            }
            Expr::Compare { column, op, value } => {
                let idx = params.push_param(value.clone());
                format!("{} {} ${}", column, op, idx)
            }
            Expr::NullCheck { column, is_null } => {
                let check = if *is_null { "IS NULL" } else { "IS NOT NULL" };
                format!("{} {}", column, check)
            }
            Expr::InList {
                column,
                values,
                negated,
            } => {
                if values.is_empty() {
                    return if *negated { "1=1" } else { "1=0" }.to_string();
                }
                let placeholders: Vec<String> = values
                    .iter()
                    .map(|v| format!("${}", params.push_param(v.clone())))
                    .collect();
                let op = if *negated { "NOT IN" } else { "IN" };
                format!("{} {} ({})", column, op, placeholders.join(", "))
            }
            Expr::Between {
                column,
                from,
                to,
                negated,
            } => {
                let lo = params.push_param(from.clone());
                let hi = params.push_param(to.clone());
                let op = if *negated { "NOT BETWEEN" } else { "BETWEEN" };
                format!("{} {} ${} AND ${}", column, op, lo, hi)
            }
            Expr::Template {
                sql,
                params: values,
            } => {
                // Extra `?` beyond the supplied values stay literal.
                let mut out = String::with_capacity(sql.len());
                let mut values = values.iter().peekable();
                for ch in sql.chars() {
                    match values.next_if(|_| ch == '?') {
                        Some(v) => {
                            out.push('$');
                            out.push_str(&params.push_param(v.clone()).to_string());
                        }
                        None => out.push(ch),
                    }
                }
                out
            }
            Expr::Raw(sql) => sql.clone(),
            Expr::True => "1=1".to_string(),
            Expr::False => "1=0".to_string(),
        }
    }
}

/// Join the non-empty members of a group, parenthesising nested groups of the
/// other kind.
fn join_group(exprs: &[Expr], sep: &str, params: &mut ParamList) -> String {
    exprs
        .iter()
        .filter(|e| !e.is_empty())
        .map(|e| {
            let sql = e.build(params);
            let nested = match e {
                Expr::Or(_) => sep == " AND ",
                Expr::And(_) => sep == " OR ",
                _ => false,
            };
            if nested { format!("({})", sql) } else { sql }
        })
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(sep)
}

/// A list of conditions ANDed together; the WHERE/HAVING state of a builder.
#[derive(Clone, Debug, Default)]
pub struct ExprGroup {
    exprs: Vec<Expr>,
}

impl ExprGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.exprs.iter().all(Expr::is_empty)
    }

    pub fn and_expr(&mut self, expr: Expr) {
        self.exprs.push(expr);
    }

    pub fn eq<T: ToParam>(&mut self, column: &str, value: T) {
        self.exprs.push(Expr::eq(column, value));
    }

    pub fn ne<T: ToParam>(&mut self, column: &str, value: T) {
        self.exprs.push(Expr::ne(column, value));
    }

    pub fn gt<T: ToParam>(&mut self, column: &str, value: T) {
        self.exprs.push(Expr::gt(column, value));
    }

    pub fn gte<T: ToParam>(&mut self, column: &str, value: T) {
        self.exprs.push(Expr::gte(column, value));
    }

    pub fn lt<T: ToParam>(&mut self, column: &str, value: T) {
        self.exprs.push(Expr::lt(column, value));
    }

    pub fn lte<T: ToParam>(&mut self, column: &str, value: T) {
        self.exprs.push(Expr::lte(column, value));
    }

    pub fn like<T: ToParam>(&mut self, column: &str, pattern: T) {
        self.exprs.push(Expr::like(column, pattern));
    }

    pub fn ilike<T: ToParam>(&mut self, column: &str, pattern: T) {
        self.exprs.push(Expr::ilike(column, pattern));
    }

    pub fn not_like<T: ToParam>(&mut self, column: &str, pattern: T) {
        self.exprs.push(Expr::not_like(column, pattern));
    }

    pub fn not_ilike<T: ToParam>(&mut self, column: &str, pattern: T) {
        self.exprs.push(Expr::not_ilike(column, pattern));
    }

    pub fn is_null(&mut self, column: &str) {
        self.exprs.push(Expr::is_null(column));
    }

    pub fn is_not_null(&mut self, column: &str) {
        self.exprs.push(Expr::is_not_null(column));
    }

    pub fn in_list<T: ToParam>(&mut self, column: &str, values: impl IntoIterator<Item = T>) {
        self.exprs.push(Expr::in_list(column, values));
    }

    pub fn not_in<T: ToParam>(&mut self, column: &str, values: impl IntoIterator<Item = T>) {
        self.exprs.push(Expr::not_in(column, values));
    }

    pub fn between<T: ToParam>(&mut self, column: &str, from: T, to: T) {
        self.exprs.push(Expr::between(column, from, to));
    }

    pub fn not_between<T: ToParam>(&mut self, column: &str, from: T, to: T) {
        self.exprs.push(Expr::not_between(column, from, to));
    }

    pub fn raw(&mut self, sql: &str) {
        self.exprs.push(Expr::raw(sql));
    }

    pub fn template<T: ToParam>(&mut self, sql: &str, values: impl IntoIterator<Item = T>) {
        self.exprs.push(Expr::template_values(sql, values));
    }

    /// `(col1 ILIKE $n OR col2 ILIKE $m ...)` with the same pattern for each column.
    pub fn multi_ilike<T: ToParam>(&mut self, columns: &[&str], pattern: T) {
        if columns.is_empty() {
            return;
        }
        let param = Param::new(&pattern);
        let any: Vec<Expr> = columns
            .iter()
            .map(|col| Expr::Compare {
                column: col.to_string(),
                op: "ILIKE",
                value: param.clone(),
            })
            .collect();
        self.exprs.push(Expr::Or(any));
    }

    // Optional-value variants: `None` adds nothing.

    pub fn eq_opt<T: ToParam>(&mut self, column: &str, value: Option<T>) {
        if let Some(v) = value {
            self.eq(column, v);
        }
    }

    pub fn like_opt<T: ToParam>(&mut self, column: &str, pattern: Option<T>) {
        if let Some(v) = pattern {
            self.like(column, v);
        }
    }

    pub fn ilike_opt<T: ToParam>(&mut self, column: &str, pattern: Option<T>) {
        if let Some(v) = pattern {
            self.ilike(column, v);
        }
    }

    pub fn gt_opt<T: ToParam>(&mut self, column: &str, value: Option<T>) {
        if let Some(v) = value {
            self.gt(column, v);
        }
    }

    pub fn gte_opt<T: ToParam>(&mut self, column: &str, value: Option<T>) {
        if let Some(v) = value {
            self.gte(column, v);
        }
    }

    pub fn lt_opt<T: ToParam>(&mut self, column: &str, value: Option<T>) {
        if let Some(v) = value {
            self.lt(column, v);
        }
    }

    pub fn lte_opt<T: ToParam>(&mut self, column: &str, value: Option<T>) {
        if let Some(v) = value {
            self.lte(column, v);
        }
    }

    /// Adds `column IN (...)` only when `values` is `Some` and non-empty.
    pub fn in_opt<T: ToParam>(&mut self, column: &str, values: Option<Vec<T>>) {
        if let Some(v) = values.filter(|v| !v.is_empty()) {
            self.in_list(column, v);
        }
    }

    pub fn multi_ilike_opt<T: ToParam>(&mut self, columns: &[&str], pattern: Option<T>) {
        if let Some(p) = pattern {
            self.multi_ilike(columns, p);
        }
    }

    /// Render into an existing list, continuing its placeholder numbering.
    pub fn build_into(&self, params: &mut ParamList) -> String {
        if self.exprs.is_empty() {
            return String::new();
        }
        join_group(&self.exprs, " AND ", params)
    }

    /// Render without the `WHERE` keyword, numbering from `$1`.
    pub fn build(&self) -> (String, ParamList) {
        self.build_with_offset(0)
    }

    /// Render with numbering starting at `$offset + 1`.
    pub fn build_with_offset(&self, offset: usize) -> (String, ParamList) {
        let mut params = ParamList::with_offset(offset);
        let sql = self.build_into(&mut params);
        (sql, params)
    }

    pub fn exprs(&self) -> &[Expr] {
        &self.exprs
    }

    pub fn into_exprs(self) -> Vec<Expr> {
        self.exprs
    }
}

/// Consuming WHERE-condition methods for builders holding a `where_group: ExprGroup`.
macro_rules! where_methods {
    () => {
        /// Add WHERE: column = value
        pub fn eq<T: $crate::types::ToParam>(mut self, column: &str, value: T) -> Self {
            self.where_group.eq(column, value);
            self
        }

        /// Add WHERE: column != value
        pub fn ne<T: $crate::types::ToParam>(mut self, column: &str, value: T) -> Self {
            self.where_group.ne(column, value);
            self
        }

        /// Add WHERE: column > value
        pub fn gt<T: $crate::types::ToParam>(mut self, column: &str, value: T) -> Self {
            self.where_group.gt(column, value);
            self
        }

        /// Add WHERE: column >= value
        pub fn gte<T: $crate::types::ToParam>(mut self, column: &str, value: T) -> Self {
            self.where_group.gte(column, value);
            self
        }

        /// Add WHERE: column < value
        pub fn lt<T: $crate::types::ToParam>(mut self, column: &str, value: T) -> Self {
            self.where_group.lt(column, value);
            self
        }

        /// Add WHERE: column <= value
        pub fn lte<T: $crate::types::ToParam>(mut self, column: &str, value: T) -> Self {
            self.where_group.lte(column, value);
            self
        }

        /// Add WHERE: column IN (values...)
        pub fn in_list<T: $crate::types::ToParam>(
            mut self,
            column: &str,
            values: impl IntoIterator<Item = T>,
        ) -> Self {
            self.where_group.in_list(column, values);
            self
        }

        /// Add WHERE: column NOT IN (values...)
        pub fn not_in<T: $crate::types::ToParam>(
            mut self,
            column: &str,
            values: impl IntoIterator<Item = T>,
        ) -> Self {
            self.where_group.not_in(column, values);
            self
        }

        /// Add WHERE: column IS NULL
        pub fn is_null(mut self, column: &str) -> Self {
            self.where_group.is_null(column);
            self
        }

        /// Add WHERE: column IS NOT NULL
        pub fn is_not_null(mut self, column: &str) -> Self {
            self.where_group.is_not_null(column);
            self
        }

        /// Add a raw WHERE condition without params.
        pub fn raw(mut self, sql: &str) -> Self {
            self.where_group.raw(sql);
            self
        }

        /// Add a WHERE condition with `?` placeholders.
        pub fn where_template<T: $crate::types::ToParam>(
            mut self,
            sql: &str,
            values: impl IntoIterator<Item = T>,
        ) -> Self {
            self.where_group.template(sql, values);
            self
        }

        /// Add a custom expression.
        pub fn and_expr(mut self, expr: $crate::qb::Expr) -> Self {
            self.where_group.and_expr(expr);
            self
        }
    };
}

pub(crate) use where_methods;
