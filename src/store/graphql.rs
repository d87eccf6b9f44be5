//! GraphQL record store.
//!
//! Talks to a managed GraphQL data API (AppSync-style) authenticated with an
//! API key. Operations follow the generated naming convention:
//!
//! | Call | Operation |
//! |------|-----------|
//! | list | `list<Plural>(limit, nextToken) { items nextToken }` |
//! | create | `create<Type>(input: Create<Type>Input!)` |
//! | delete | `delete<Type>(input: Delete<Type>Input!)` |
//! | get | `get<Type>(id: ID!)` |
//!
//! Timeouts come from the HTTP client; nothing above this layer retries.

use super::{Page, PageRequest, RecordStore};
use crate::models::{RecordFields, RecordId, RecordKind, StoredRecord};
use crate::{Error, Result};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;

/// GraphQL response envelope.
#[derive(Debug, Deserialize)]
struct GraphqlResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Option<Vec<GraphqlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
}

/// List connection shape.
#[derive(Debug, Deserialize)]
struct Connection {
    #[serde(default)]
    items: Vec<Option<Value>>,
    #[serde(default, rename = "nextToken")]
    next_token: Option<String>,
}

/// Record store backed by a GraphQL endpoint.
pub struct GraphqlStore {
    client: reqwest::Client,
    endpoint: String,
    api_key: SecretString,
}

impl std::fmt::Debug for GraphqlStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphqlStore")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl GraphqlStore {
    /// Creates a client for `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        endpoint: impl Into<String>,
        api_key: SecretString,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!("framedex/{}", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| Error::operation("build_http_client", e))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
        })
    }

    /// Sends one GraphQL document and returns the `data` object.
    async fn execute(
        &self,
        operation: &'static str,
        kind: RecordKind,
        query: String,
        variables: Value,
    ) -> Result<Value> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", self.api_key.expose_secret())
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(|e| Error::store(operation, kind, format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::store(
                operation,
                kind,
                format!("HTTP {} response", status.as_u16()),
            ));
        }

        let body: GraphqlResponse = response
            .json()
            .await
            .map_err(|e| Error::store(operation, kind, format!("invalid response body: {e}")))?;

        if let Some(errors) = body.errors.filter(|errors| !errors.is_empty()) {
            let messages: Vec<_> = errors.into_iter().map(|e| e.message).collect();
            return Err(Error::store(operation, kind, messages.join("; ")));
        }

        body.data
            .ok_or_else(|| Error::store(operation, kind, "response has no data"))
    }

    /// Extracts `data.<field>` as an optional record.
    fn record_field(
        operation: &'static str,
        kind: RecordKind,
        mut data: Value,
        field: &str,
    ) -> Result<Option<StoredRecord>> {
        match data.get_mut(field).map(Value::take) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => StoredRecord::from_json(kind, value)
                .map(Some)
                .map_err(|e| Error::store(operation, kind, e)),
        }
    }
}

/// Returns the selection set for a kind.
fn selection_set(kind: RecordKind) -> String {
    std::iter::once("id")
        .chain(kind.descriptor().store_fields())
        .collect::<Vec<_>>()
        .join(" ")
}

fn list_query(kind: RecordKind) -> (String, String) {
    let field = format!("list{}", kind.plural_type_name());
    let query = format!(
        "query List($limit: Int, $nextToken: String) {{ {field}(limit: $limit, nextToken: $nextToken) {{ items {{ {} }} nextToken }} }}",
        selection_set(kind)
    );
    (field, query)
}

fn mutation(kind: RecordKind, verb: &str) -> (String, String) {
    let type_name = kind.type_name();
    let field = format!("{verb}{type_name}");
    let input = format!("{}{type_name}Input", capitalize(verb));
    let query = format!(
        "mutation Mutate($input: {input}!) {{ {field}(input: $input) {{ {} }} }}",
        selection_set(kind)
    );
    (field, query)
}

fn get_query(kind: RecordKind) -> (String, String) {
    let field = format!("get{}", kind.type_name());
    let query = format!(
        "query Get($id: ID!) {{ {field}(id: $id) {{ {} }} }}",
        selection_set(kind)
    );
    (field, query)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

#[async_trait]
impl RecordStore for GraphqlStore {
    fn name(&self) -> &'static str {
        "graphql"
    }

    async fn list(&self, kind: RecordKind, request: PageRequest) -> Result<Page> {
        let (field, query) = list_query(kind);
        let variables = json!({ "limit": request.page_size, "nextToken": request.cursor });
        let mut data = self.execute("list", kind, query, variables).await?;

        let connection: Connection = data
            .get_mut(&field)
            .map(Value::take)
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| Error::store("list", kind, format!("invalid connection: {e}")))?
            .ok_or_else(|| Error::store("list", kind, format!("response has no '{field}'")))?;

        let items = connection
            .items
            .into_iter()
            .flatten()
            .map(|value| StoredRecord::from_json(kind, value))
            .collect::<Result<Vec<_>>>()
            .map_err(|e| Error::store("list", kind, e))?;

        Ok(Page {
            items,
            next_cursor: connection.next_token,
        })
    }

    async fn create(&self, fields: RecordFields) -> Result<StoredRecord> {
        let kind = fields.kind();
        let (field, query) = mutation(kind, "create");
        let input = fields.to_json()?;
        let data = self
            .execute("create", kind, query, json!({ "input": input }))
            .await?;

        Self::record_field("create", kind, data, &field)?
            .ok_or_else(|| Error::store("create", kind, "store returned no record"))
    }

    async fn delete(&self, kind: RecordKind, id: &RecordId) -> Result<Option<StoredRecord>> {
        let (field, query) = mutation(kind, "delete");
        let data = self
            .execute("delete", kind, query, json!({ "input": { "id": id.as_str() } }))
            .await?;
        Self::record_field("delete", kind, data, &field)
    }

    async fn get(&self, kind: RecordKind, id: &RecordId) -> Result<Option<StoredRecord>> {
        let (field, query) = get_query(kind);
        let data = self
            .execute("get", kind, query, json!({ "id": id.as_str() }))
            .await?;
        Self::record_field("get", kind, data, &field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_shape() {
        let (field, query) = list_query(RecordKind::MoveCategory);
        assert_eq!(field, "listMoveCategories");
        assert!(query.contains("listMoveCategories(limit: $limit, nextToken: $nextToken)"));
        assert!(query.contains("items { id move_category_id move_category }"));
        assert!(query.contains("nextToken"));
    }

    #[test]
    fn test_mutation_shape() {
        let (field, query) = mutation(RecordKind::Move, "create");
        assert_eq!(field, "createMove");
        assert!(query.contains("$input: CreateMoveInput!"));
        assert!(query.contains("effects remarks"));

        let (field, query) = mutation(RecordKind::Character, "delete");
        assert_eq!(field, "deleteCharacter");
        assert!(query.contains("DeleteCharacterInput!"));
    }

    #[test]
    fn test_get_query_shape() {
        let (field, query) = get_query(RecordKind::Character);
        assert_eq!(field, "getCharacter");
        assert!(query.starts_with("query Get($id: ID!)"));
    }

    #[test]
    fn test_record_field_null_is_none() {
        let data = json!({ "deleteMove": null });
        let record =
            GraphqlStore::record_field("delete", RecordKind::Move, data, "deleteMove").unwrap();
        assert!(record.is_none());
    }

    #[test]
    fn test_record_field_parses_record() {
        let data = json!({ "getCharacter": { "id": "c-1", "character_id": "ryu", "character_name_en": "Ryu" } });
        let record = GraphqlStore::record_field("get", RecordKind::Character, data, "getCharacter")
            .unwrap()
            .unwrap();
        assert_eq!(record.id.as_str(), "c-1");
        assert_eq!(record.natural_key(), Some("ryu"));
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("create"), "Create");
        assert_eq!(capitalize(""), "");
    }
}
