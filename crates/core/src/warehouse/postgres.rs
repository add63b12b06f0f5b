use crate::config::WarehouseConfig;
use crate::domain::prediction::{
    DateBounds, PricePoint, COL_ACTUAL_CLOSE, COL_DATE, COL_PREDICTED_CLOSE, COL_SYMBOL,
};
use crate::warehouse::PredictionSource;
use anyhow::Context;
use chrono::NaiveDate;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use std::time::Duration;

const MAX_CONNECTIONS: u32 = 5;
const ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Opens the session pool. Called once at startup; the pool lives for the whole process.
pub async fn connect(cfg: &WarehouseConfig) -> anyhow::Result<sqlx::PgPool> {
    let opts = PgConnectOptions::new()
        .host(&cfg.account)
        .port(cfg.port)
        .username(&cfg.user)
        .password(&cfg.password)
        .database(&cfg.database)
        .application_name(&cfg.warehouse);

    PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .acquire_timeout(Duration::from_secs(ACQUIRE_TIMEOUT_SECS))
        .connect_with(opts)
        .await
        .with_context(|| {
            format!(
                "connect to warehouse failed (host={}, database={})",
                cfg.account, cfg.database
            )
        })
}

/// Schema-qualified table name with validated identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    schema: String,
    table: String,
}

impl TableRef {
    pub fn new(schema: &str, table: &str) -> anyhow::Result<Self> {
        Ok(Self {
            schema: validate_ident(schema).context("invalid schema name")?,
            table: validate_ident(table).context("invalid table name")?,
        })
    }

    pub fn from_config(cfg: &WarehouseConfig) -> anyhow::Result<Self> {
        Self::new(&cfg.schema, &cfg.table)
    }

    pub fn qualified(&self) -> String {
        format!("{}.{}", quote_ident(&self.schema), quote_ident(&self.table))
    }
}

#[derive(Debug, Clone)]
pub struct PgWarehouse {
    pool: sqlx::PgPool,
    table: TableRef,
}

impl PgWarehouse {
    pub fn new(pool: sqlx::PgPool, table: TableRef) -> Self {
        Self { pool, table }
    }
}

#[async_trait::async_trait]
impl PredictionSource for PgWarehouse {
    fn source_name(&self) -> &'static str {
        "postgres"
    }

    async fn fetch_range(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> anyhow::Result<Vec<PricePoint>> {
        let sql = range_query(&self.table);
        let rows = sqlx::query_as::<_, (NaiveDate, String, Option<f64>, Option<f64>)>(&sql)
            .persistent(false)
            .bind(symbol)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("select {} failed (symbol={symbol})", self.table.qualified()))?;

        let total = rows.len();
        let out: Vec<PricePoint> = rows
            .into_iter()
            .filter_map(|(date, symbol, actual_close, predicted_close)| {
                Some(PricePoint {
                    date,
                    symbol,
                    actual_close,
                    predicted_close: predicted_close?,
                })
            })
            .collect();

        if out.len() != total {
            tracing::warn!(
                %symbol,
                %start,
                %end,
                skipped = total - out.len(),
                "rows without a predicted close skipped"
            );
        }
        Ok(out)
    }

    async fn distinct_symbols(&self) -> anyhow::Result<Vec<String>> {
        let sql = symbols_query(&self.table);
        sqlx::query_scalar::<_, String>(&sql)
            .persistent(false)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("select distinct symbols from {} failed", self.table.qualified()))
    }

    async fn date_extent(&self) -> anyhow::Result<Option<DateBounds>> {
        let sql = extent_query(&self.table);
        let (min_date, max_date) = sqlx::query_as::<_, (Option<NaiveDate>, Option<NaiveDate>)>(&sql)
            .persistent(false)
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("select date extent from {} failed", self.table.qualified()))?;

        Ok(match (min_date, max_date) {
            (Some(min_date), Some(max_date)) => Some(DateBounds { min_date, max_date }),
            _ => None,
        })
    }
}

fn range_query(table: &TableRef) -> String {
    format!(
        "SELECT {date}, {symbol}, {actual}::float8, {predicted}::float8 \
         FROM {table} \
         WHERE {symbol} = $1 AND {date} >= $2 AND {date} <= $3 \
         ORDER BY {date} ASC",
        date = quote_ident(COL_DATE),
        symbol = quote_ident(COL_SYMBOL),
        actual = quote_ident(COL_ACTUAL_CLOSE),
        predicted = quote_ident(COL_PREDICTED_CLOSE),
        table = table.qualified(),
    )
}

fn symbols_query(table: &TableRef) -> String {
    format!(
        "SELECT DISTINCT {symbol} FROM {table} WHERE {symbol} IS NOT NULL ORDER BY {symbol} ASC",
        symbol = quote_ident(COL_SYMBOL),
        table = table.qualified(),
    )
}

fn extent_query(table: &TableRef) -> String {
    format!(
        "SELECT MIN({date}), MAX({date}) FROM {table}",
        date = quote_ident(COL_DATE),
        table = table.qualified(),
    )
}

fn validate_ident(s: &str) -> anyhow::Result<String> {
    let t = s.trim();
    anyhow::ensure!(!t.is_empty(), "identifier must be non-empty");
    anyhow::ensure!(t.len() <= 63, "identifier longer than 63 bytes: {t}");
    let mut chars = t.chars();
    let first_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    anyhow::ensure!(
        first_ok && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$'),
        "identifier contains unsupported characters: {t}"
    );
    Ok(t.to_string())
}

// Identifiers are validated first, so there is never a quote to escape.
fn quote_ident(s: &str) -> String {
    format!("\"{s}\"")
}
