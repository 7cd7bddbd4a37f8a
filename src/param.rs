//! Hand a finished [`Builder`] to a `sqlx` driver.
//!
//! Each function checks that the builder was created for the driver's
//! placeholder convention and binds every parameter in order. Nothing here
//! talks to a database.

#[cfg(any(feature = "postgres", feature = "mysql"))]
use crate::query_builder::{Builder, Dialect, QueryBuildError, Result, Value};

#[cfg(any(feature = "postgres", feature = "mysql"))]
fn expect_dialect(builder: &Builder, expected: Dialect) -> Result<()> {
    if builder.dialect() == expected {
        Ok(())
    } else {
        Err(QueryBuildError::DialectMismatch {
            expected,
            actual: builder.dialect(),
        })
    }
}

#[cfg(feature = "postgres")]
fn signed(value: u64) -> Result<i64> {
    use std::convert::TryFrom;
    i64::try_from(value).map_err(|_| QueryBuildError::UnsignedOutOfRange(value))
}

#[cfg(feature = "mysql")]
fn unsigned(value: u64) -> Result<u64> {
    Ok(value)
}

#[cfg(any(feature = "postgres", feature = "mysql"))]
macro_rules! define_driver_query {
    ( $fn_name:ident, $db:ty, $arguments:ty, $dialect:expr, $uint:ident ) => {
        pub fn $fn_name(builder: &Builder) -> Result<sqlx::query::Query<'_, $db, $arguments>> {
            expect_dialect(builder, $dialect)?;
            tracing::debug!(
                sql = builder.sql(),
                params = ?builder.params(),
                dialect = %builder.dialect(),
                "query"
            );
            let mut query = sqlx::query::<$db>(builder.sql());
            for value in builder.params() {
                query = match value.clone() {
                    Value::Null => query.bind(None::<String>),
                    Value::String(s) => query.bind(s),
                    Value::Int(n) => query.bind(n),
                    Value::Uint(n) => query.bind($uint(n)?),
                    Value::Float(n) => query.bind(n),
                    Value::Bool(b) => query.bind(b),
                    Value::Bytes(bytes) => query.bind(bytes),
                };
            }
            Ok(query)
        }
    };
}

#[cfg(feature = "postgres")]
define_driver_query!(
    postgres_query,
    sqlx::postgres::Postgres,
    sqlx::postgres::PgArguments,
    Dialect::Postgres,
    signed
);

#[cfg(feature = "mysql")]
define_driver_query!(
    mysql_query,
    sqlx::mysql::MySql,
    sqlx::mysql::MySqlArguments,
    Dialect::MySql,
    unsigned
);
