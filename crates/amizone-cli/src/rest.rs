use std::fmt;

use amizone_broadcast::Progress;
use amizone_core::config::{AmizoneConfig, QueryConfig, SupabaseCredentials};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::error::QueryError;

/// Minimal client for the project's auth and PostgREST endpoints.
pub struct SupabaseRest {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub user: User,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.email {
            Some(email) => write!(f, "{email} ({})", self.id),
            None => write!(f, "{}", self.id),
        }
    }
}

/// One row of the product select.
///
/// Only `name` and the embedded category are printed; every column is
/// optional so any `query.columns` list decodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Product {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub category: Option<Category>,
    pub unit: Option<String>,
    pub price: Option<f64>,
    pub vat: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Category {
    pub id: Option<i64>,
    pub name: Option<String>,
}

impl Product {
    /// One console line: `- <name> in category <category>`.
    pub fn summary(&self) -> String {
        let name = self.name.as_deref().unwrap_or("-");
        let category = self
            .category
            .as_ref()
            .and_then(|c| c.name.as_deref())
            .unwrap_or("-");
        format!("- {name} in category {category}")
    }
}

impl SupabaseRest {
    pub fn new(credentials: &SupabaseCredentials) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: credentials.http_url(),
            anon_key: credentials.anon_key.clone(),
        }
    }

    pub fn token_url(&self) -> String {
        format!("{}/auth/v1/token?grant_type=password", self.base_url)
    }

    pub fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    /// The query as a readable URL, for logs.
    pub fn describe_query(&self, query: &QueryConfig) -> String {
        format!(
            "{}?select={} (schema {})",
            self.table_url(&query.table),
            query.columns,
            query.schema
        )
    }

    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, QueryError> {
        debug!(%email, "signing in with password");
        let resp = self
            .client
            .post(self.token_url())
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;
        let resp = check_status(resp, "sign-in").await?;
        Ok(resp.json().await?)
    }

    /// Select rows from `query.table` in `query.schema` as the signed-in user.
    pub async fn select_products(
        &self,
        query: &QueryConfig,
        access_token: &str,
    ) -> Result<Vec<Product>, QueryError> {
        debug!(table = %query.table, schema = %query.schema, "selecting products");
        let resp = self
            .client
            .get(self.table_url(&query.table))
            .query(&[("select", query.columns.as_str())])
            .header("apikey", &self.anon_key)
            .header("Accept-Profile", &query.schema)
            .bearer_auth(access_token)
            .send()
            .await?;
        let resp = check_status(resp, "select").await?;
        Ok(resp.json().await?)
    }
}

async fn check_status(resp: reqwest::Response, what: &str) -> Result<reqwest::Response, QueryError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let message = resp.text().await.unwrap_or_default();
    warn!(status, body = %message, "{what} request rejected");
    Err(QueryError::Api { status, message })
}

/// Sign in, query products and print the first `query.limit` of them.
///
/// Failures are reported as one line; the command itself never fails.
pub async fn run(config: &AmizoneConfig, progress: &dyn Progress) {
    if let Err(e) = query_products(config, progress).await {
        error!(error = %e, "REST query failed");
        progress.emit(&format!("connect to supabase failed: {e}"));
    }
}

async fn query_products(config: &AmizoneConfig, progress: &dyn Progress) -> Result<(), QueryError> {
    let rest = SupabaseRest::new(&config.supabase);

    let session = rest
        .sign_in_with_password(&config.supabase.user_email, &config.supabase.user_password)
        .await?;
    progress.step("1", &format!("connected to: {}", session.user));

    let products = rest.select_products(&config.query, &session.access_token).await?;
    progress.step("2", &format!("result to: {}", rest.describe_query(&config.query)));
    for product in products.iter().take(config.query.limit) {
        progress.step("a", &product.summary());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rest() -> SupabaseRest {
        SupabaseRest::new(&SupabaseCredentials {
            url: "abcd.supabase.co".into(),
            anon_key: "anon".into(),
            ..Default::default()
        })
    }

    #[test]
    fn endpoint_urls() {
        let rest = rest();
        assert_eq!(
            rest.token_url(),
            "https://abcd.supabase.co/auth/v1/token?grant_type=password"
        );
        assert_eq!(
            rest.table_url("shop_product"),
            "https://abcd.supabase.co/rest/v1/shop_product"
        );
    }

    #[test]
    fn describe_query_names_schema_and_columns() {
        let text = rest().describe_query(&QueryConfig::default());
        assert_eq!(
            text,
            "https://abcd.supabase.co/rest/v1/shop_product?select=id,name,category:shop_category(*),unit,price,vat (schema ami_zone)"
        );
    }

    #[test]
    fn product_with_embedded_category() {
        let json = r#"[{"id":1,"name":"Apfel","category":{"id":3,"name":"Obst"},"unit":"kg","price":2.49,"vat":7.0}]"#;
        let products: Vec<Product> = serde_json::from_str(json).unwrap();
        assert_eq!(products[0].category.as_ref().unwrap().name.as_deref(), Some("Obst"));
        assert_eq!(products[0].price, Some(2.49));
        assert_eq!(products[0].summary(), "- Apfel in category Obst");
    }

    #[test]
    fn product_without_category() {
        let json = r#"{"id":2,"name":"Brot","category":null,"unit":"Stk","price":3.1,"vat":7}"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.category, None);
        assert_eq!(product.summary(), "- Brot in category -");
    }

    #[test]
    fn reduced_column_set_decodes() {
        // select=id,name,category:shop_category(*)
        let json = r#"[{"id":1,"name":"Apfel","category":{"id":3,"name":"Obst"}}]"#;
        let products: Vec<Product> = serde_json::from_str(json).unwrap();
        assert_eq!(products[0].unit, None);
        assert_eq!(products[0].summary(), "- Apfel in category Obst");
    }

    #[test]
    fn null_columns_decode() {
        let json = r#"{"id":4,"name":"Milch","category":null,"unit":null,"price":null,"vat":7}"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.unit, None);
        assert_eq!(product.vat, Some(7.0));
    }

    #[test]
    fn row_without_name_still_summarizes() {
        let product: Product = serde_json::from_str(r#"{"id":5}"#).unwrap();
        assert_eq!(product.summary(), "- - in category -");
    }

    #[test]
    fn session_user_display() {
        let json = r#"{"access_token":"jwt","token_type":"bearer","user":{"id":"u-1","email":"a@b.de"}}"#;
        let session: Session = serde_json::from_str(json).unwrap();
        assert_eq!(session.access_token, "jwt");
        assert_eq!(session.user.to_string(), "a@b.de (u-1)");
    }

    #[test]
    fn api_error_message() {
        let err = QueryError::Api {
            status: 400,
            message: "invalid_grant".into(),
        };
        assert_eq!(err.to_string(), "API error 400: invalid_grant");
    }
}
