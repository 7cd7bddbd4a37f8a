//! Query Builder
//!
//! Assembles SQL text from caller-written fragments while keeping the bound
//! values in a separate, ordered parameter list. Fragments mark parameter
//! slots with `?`; the builder rewrites every marker into the token the
//! target [`Dialect`] expects and records the matching value.
//!
//! ```
//! use bindery::args;
//! use bindery::query_builder::{Builder, Dialect, Value};
//!
//! let mut builder = Builder::new(Dialect::Postgres, "SELECT * FROM users", args![])?;
//! builder
//!     .append_bound("WHERE status = ?", args!["active"])?
//!     .append_bound("AND age > ?", args![18])?
//!     .append_raw("ORDER BY id");
//!
//! assert_eq!(
//!     builder.sql(),
//!     "SELECT * FROM users WHERE status = $1 AND age > $2 ORDER BY id"
//! );
//! assert_eq!(builder.params(), &[Value::from("active"), Value::Int(18)]);
//! # Ok::<(), bindery::query_builder::QueryBuildError>(())
//! ```

use std::str::FromStr;

/// The parameter slot character callers write into fragments.
pub const MARKER: char = '?';

pub type Result<T> = std::result::Result<T, QueryBuildError>;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum QueryBuildError {
    #[error("QueryBuildError::PlaceholderCountMismatch: fragment has {markers} marker(s) but {values} value(s) were supplied")]
    PlaceholderCountMismatch { markers: usize, values: usize },
    #[error("QueryBuildError::DialectMismatch: driver expects {expected} placeholders, builder uses {actual}")]
    DialectMismatch { expected: Dialect, actual: Dialect },
    #[error("QueryBuildError::UnsignedOutOfRange: {0} does not fit the driver's signed integer")]
    UnsignedOutOfRange(u64),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown sql dialect: {0:?}")]
pub struct ParseDialectError(String);

/// Placeholder convention of the statement being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum Dialect {
    /// `$1, $2, ...`
    #[display(fmt = "postgres")]
    Postgres,
    /// `?, ?, ...` (MySQL, MariaDB, SQLite)
    #[display(fmt = "mysql")]
    MySql,
}

impl Dialect {
    /// Write the token for the 1-based parameter position `index`.
    pub fn write_placeholder(self, index: usize, out: &mut String) {
        match self {
            Dialect::Postgres => {
                out.push('$');
                out.push_str(&index.to_string());
            }
            // The driver binds by position, the marker already is the token.
            Dialect::MySql => out.push(MARKER),
        }
    }
}

impl FromStr for Dialect {
    type Err = ParseDialectError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Dialect::Postgres),
            "mysql" | "mariadb" | "sqlite" => Ok(Dialect::MySql),
            _ => Err(ParseDialectError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    String(String),
    Int(i64),
    Uint(u64),
    Float(f64),
    Bool(bool),
    Bytes(Vec<u8>),
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Value::String(value.clone())
    }
}

macro_rules! impl_from_int {
    ( $($t:ty),* ) => {
        $(
            impl From<$t> for Value {
                fn from(value: $t) -> Self {
                    Value::Int(i64::from(value))
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::Uint(value)
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::Uint(value as u64)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(f64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(value)
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Value::Bytes(value.to_vec())
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Build a `Vec<Value>` from heterogeneous literals.
///
/// `args![]` is the empty list for fragments without markers.
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::query_builder::Value>::new()
    };
    ( $($value:expr),+ $(,)? ) => {
        ::std::vec![$($crate::query_builder::Value::from($value)),+]
    };
}

/// One `key = value` equality term.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    key: String,
    value: Value,
}

impl Param {
    pub fn new<K, V>(key: K, value: V) -> Param
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Param {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }
}

/// Result of rewriting one fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bound {
    sql: String,
    positions: Vec<usize>,
    markers: usize,
}

impl Bound {
    /// The rewritten fragment.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Byte offsets in [`Bound::sql`] where each bound token starts, in
    /// binding order.
    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    /// Number of markers found in the fragment, bound or not.
    pub fn markers(&self) -> usize {
        self.markers
    }

    pub fn bound(&self) -> usize {
        self.positions.len()
    }

    pub fn into_sql(self) -> String {
        self.sql
    }
}

/// Rewrite the first `value_count` markers of `fragment` into `dialect`
/// tokens in one left-to-right pass.
///
/// `counter` is the number of parameters bound before this fragment and is
/// advanced once per bound marker. Markers past `value_count` are copied
/// through unchanged.
pub fn bind_fragment(
    fragment: &str,
    value_count: usize,
    dialect: Dialect,
    counter: &mut usize,
) -> Bound {
    let mut sql = String::with_capacity(fragment.len() + value_count * 2);
    let mut positions = Vec::with_capacity(value_count);
    let mut markers = 0;
    let mut rest = fragment;

    while let Some(idx) = rest.find(MARKER) {
        sql.push_str(&rest[..idx]);
        markers += 1;
        if positions.len() < value_count {
            positions.push(sql.len());
            *counter += 1;
            dialect.write_placeholder(*counter, &mut sql);
        } else {
            sql.push(MARKER);
        }
        rest = &rest[idx + MARKER.len_utf8()..];
    }
    sql.push_str(rest);

    Bound {
        sql,
        positions,
        markers,
    }
}

/// `count` comma separated tokens numbered from 1.
///
/// The numbering is independent of any [`Builder`]; use
/// [`placeholder_list_from`] or [`Builder::append_in`] when the list is
/// spliced after other bound parameters.
pub fn placeholder_list(count: usize, dialect: Dialect) -> String {
    placeholder_list_from(0, count, dialect)
}

/// Like [`placeholder_list`], numbering from `offset + 1`.
pub fn placeholder_list_from(offset: usize, count: usize, dialect: Dialect) -> String {
    let mut out = String::with_capacity(count * 4);
    for i in 0..count {
        if i != 0 {
            out.push_str(", ");
        }
        dialect.write_placeholder(offset + i + 1, &mut out);
    }
    out
}

#[derive(Debug, Clone, Copy)]
struct Checkpoint {
    sql_len: usize,
    params_len: usize,
    counter: usize,
}

/// Incrementally assembled statement.
///
/// Every mutating method takes `&mut self`: a builder has one writer at a
/// time. Share it across threads only behind your own lock.
#[derive(Debug, Clone)]
pub struct Builder {
    sql: String,
    params: Vec<Value>,
    counter: usize,
    dialect: Dialect,
}

impl Builder {
    /// Start a statement with `seed`, binding `values` to its markers.
    pub fn new<S, I>(dialect: Dialect, seed: S, values: I) -> Result<Builder>
    where
        S: AsRef<str>,
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let mut builder = Builder {
            sql: String::with_capacity(128),
            params: Vec::new(),
            counter: 0,
            dialect,
        };
        builder.push_bound(seed.as_ref(), values.into_iter().map(Into::into).collect())?;
        Ok(builder)
    }

    /// Append ` <fragment>` with its markers bound to `values`.
    ///
    /// Fails with [`QueryBuildError::PlaceholderCountMismatch`] when the
    /// fragment's marker count differs from the number of values; the
    /// builder is unchanged in that case.
    pub fn append_bound<S, I>(&mut self, fragment: S, values: I) -> Result<&mut Self>
    where
        S: AsRef<str>,
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        let checkpoint = self.checkpoint();
        self.sql.push(' ');
        if let Err(e) = self.push_bound(fragment.as_ref(), values) {
            self.rollback(checkpoint);
            return Err(e);
        }
        Ok(self)
    }

    /// Append ` <fragment>` tolerating a marker/value count mismatch.
    ///
    /// Excess values are still recorded as parameters and still consume a
    /// position, so later tokens keep pointing at their own values. Excess
    /// markers stay as literal `?` in the text. Either way the statement no longer lines
    /// up with its parameters; prefer [`Builder::append_bound`].
    pub fn append_bound_unchecked<S, I>(&mut self, fragment: S, values: I) -> &mut Self
    where
        S: AsRef<str>,
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let fragment = fragment.as_ref();
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        let bound = bind_fragment(fragment, values.len(), self.dialect, &mut self.counter);
        // Every recorded value owns a position, marker or not.
        self.counter += values.len() - bound.bound();
        if bound.markers() != values.len() {
            tracing::warn!(
                fragment,
                markers = bound.markers(),
                values = values.len(),
                "placeholder count mismatch, statement and parameters are out of step"
            );
        }
        self.sql.push(' ');
        self.sql.push_str(bound.sql());
        self.params.extend(values);
        self
    }

    /// Append ` <text>` verbatim.
    ///
    /// `text` gets no placeholder processing and no escaping. Only pass
    /// trusted SQL here (keywords, validated identifiers), never user input.
    pub fn append_raw<S>(&mut self, text: S) -> &mut Self
    where
        S: AsRef<str>,
    {
        self.sql.push(' ');
        self.sql.push_str(text.as_ref());
        self
    }

    /// Append ` <column> IN (...)` with one token per value, numbered after
    /// the parameters already bound. An empty list renders `IN (NULL)`.
    pub fn append_in<I>(&mut self, column: &str, values: I) -> Result<&mut Self>
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            return self.append_bound(format!("{} IN (NULL)", column), args![]);
        }
        let markers = placeholder_list(values.len(), Dialect::MySql);
        self.append_bound(format!("{} IN ({})", column, markers), values)
    }

    /// Write `UPDATE <table> SET ` followed by `key = ?` assignments joined
    /// with `, `.
    pub fn update<I>(&mut self, table: &str, data: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = Param>,
    {
        let checkpoint = self.checkpoint();
        self.sql.push_str("UPDATE ");
        self.sql.push_str(table);
        self.sql.push_str(" SET ");
        for (i, param) in data.into_iter().enumerate() {
            if i != 0 {
                self.sql.push_str(", ");
            }
            let fragment = format!("{} = {}", param.key, MARKER);
            if let Err(e) = self.push_bound(&fragment, vec![param.value]) {
                self.rollback(checkpoint);
                return Err(e);
            }
        }
        Ok(self)
    }

    /// Write `DELETE FROM <table> `. `table` is trusted text.
    pub fn delete(&mut self, table: &str) -> &mut Self {
        self.sql.push_str("DELETE FROM ");
        self.sql.push_str(table);
        self.sql.push(' ');
        self
    }

    /// Write `SELECT <columns> FROM <table> `. Both are trusted text.
    pub fn select(&mut self, columns: &str, table: &str) -> &mut Self {
        self.sql.push_str("SELECT ");
        self.sql.push_str(columns);
        self.sql.push_str(" FROM ");
        self.sql.push_str(table);
        self.sql.push(' ');
        self
    }

    pub fn sql(&self) -> &str {
        self.sql.as_str()
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Number of parameter tokens emitted so far. The next `$N` token is
    /// `counter() + 1`.
    pub fn counter(&self) -> usize {
        self.counter
    }

    pub fn into_parts(self) -> (String, Vec<Value>) {
        (self.sql, self.params)
    }

    fn push_bound(&mut self, fragment: &str, values: Vec<Value>) -> Result<()> {
        let mut counter = self.counter;
        let bound = bind_fragment(fragment, values.len(), self.dialect, &mut counter);
        if bound.markers() != values.len() {
            return Err(QueryBuildError::PlaceholderCountMismatch {
                markers: bound.markers(),
                values: values.len(),
            });
        }
        tracing::trace!(
            fragment,
            bound = bound.bound(),
            counter,
            dialect = %self.dialect,
            "bound sql fragment"
        );
        self.counter = counter;
        self.sql.push_str(bound.sql());
        self.params.extend(values);
        Ok(())
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            sql_len: self.sql.len(),
            params_len: self.params.len(),
            counter: self.counter,
        }
    }

    fn rollback(&mut self, checkpoint: Checkpoint) {
        self.sql.truncate(checkpoint.sql_len);
        self.params.truncate(checkpoint.params_len);
        self.counter = checkpoint.counter;
    }
}

/// Build `<base> WHERE k1 = ? AND k2 = ? ...` from the conditions `producer`
/// returns, in order. No conditions leaves `base` untouched.
pub fn dynamic_where<F, I>(base: &str, producer: F, dialect: Dialect) -> Result<Builder>
where
    F: FnOnce() -> I,
    I: IntoIterator<Item = Param>,
{
    let mut builder = Builder::new(dialect, base, args![])?;
    for (i, param) in producer().into_iter().enumerate() {
        let keyword = if i == 0 { "WHERE" } else { "AND" };
        let fragment = format!("{} {} = {}", keyword, param.key, MARKER);
        builder.append_bound(fragment, vec![param.value])?;
    }
    Ok(builder)
}
