use amizone_broadcast::Progress;
use amizone_core::config::AmizoneConfig;
use tokio::task::JoinHandle;
use tokio_postgres::NoTls;
use tracing::{debug, error, warn};

use crate::error::QueryError;

/// Connect straight to the project database and dump the product table.
///
/// Bypasses row-level security; a development tool only.
pub async fn run(config: &AmizoneConfig, progress: &dyn Progress) {
    if let Err(e) = dump_products(config, progress).await {
        error!(error = %e, "postgres query failed");
        progress.emit(&format!("connect to postgres failed: {e}"));
    }
}

async fn dump_products(config: &AmizoneConfig, progress: &dyn Progress) -> Result<(), QueryError> {
    debug!(driver = %config.supabase.db_driver, host = %config.supabase.url, "connecting to postgres");
    let (client, connection) =
        tokio_postgres::connect(&config.supabase.postgres_url(), NoTls).await?;
    let driver = tokio::spawn(async move {
        if let Err(e) = connection.await {
            warn!(error = %e, "postgres connection closed with error");
        }
    });

    let row = client.query_one("SELECT version()", &[]).await?;
    let version: String = row.get(0);
    progress.step("1", &format!("connected to: {version}"));

    progress.step("2", "products:");
    let sql = products_sql(&config.query.schema, &config.query.table);
    for row in client.query(sql.as_str(), &[]).await? {
        let json: String = row.get(0);
        progress.step("a", &format!("- {json}"));
    }

    drop(client);
    join_driver(driver).await;
    Ok(())
}

/// Wait for the connection task after the client is dropped.
///
/// Returns false when the task panicked or was cancelled.
async fn join_driver(driver: JoinHandle<()>) -> bool {
    match driver.await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "postgres connection task failed");
            false
        }
    }
}

/// Quote an SQL identifier, doubling embedded quotes.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Every row as one JSON text column, whatever the table's column types.
pub fn products_sql(schema: &str, table: &str) -> String {
    format!(
        "SELECT row_to_json(t)::text FROM {}.{} AS t",
        quote_ident(schema),
        quote_ident(table)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_identifiers() {
        assert_eq!(quote_ident("shop_product"), "\"shop_product\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[tokio::test]
    async fn driver_panic_is_reported() {
        let driver = tokio::spawn(async { panic!("connection task blew up") });
        assert!(!join_driver(driver).await);
    }

    #[tokio::test]
    async fn driver_clean_exit() {
        assert!(join_driver(tokio::spawn(async {})).await);
    }

    #[test]
    fn products_query() {
        assert_eq!(
            products_sql("ami_zone", "shop_product"),
            "SELECT row_to_json(t)::text FROM \"ami_zone\".\"shop_product\" AS t"
        );
    }
}
