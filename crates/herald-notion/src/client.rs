use std::sync::Arc;

use serde_json::{json, Map, Value};

use herald_core::{
    validate_declared_types, ApiClient, ApiErrorKind, Error, ErrorMap, ExpectedField, HttpAuth,
    HttpMethod, HttpTransport, PageRules, ReqwestTransport, RetryPolicy,
};

const BASE_URL: &str = "https://api.notion.com/v1";

/// API version sent when the config does not name one.
pub const CURRENT_VERSION: &str = "2022-06-28";

/// Connection settings for [`NotionClient::connect`].
pub struct NotionConfig {
    token: String,
    version: String,
    retry: RetryPolicy,
    transport: Arc<dyn HttpTransport>,
}

impl NotionConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            version: String::from(CURRENT_VERSION),
            retry: RetryPolicy::default(),
            transport: Arc::new(ReqwestTransport::new()),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = transport;
        self
    }
}

/// Where a new page hangs: under a page or as a row of a database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parent {
    Page(String),
    Database(String),
}

impl Parent {
    fn to_value(&self) -> Value {
        match self {
            Self::Page(id) => json!({"type": "page_id", "page_id": id}),
            Self::Database(id) => json!({"type": "database_id", "database_id": id}),
        }
    }
}

/// Payload for [`NotionClient::create_page`]. Unset icon/cover are sent as
/// null, which is what the API expects for "no icon".
#[derive(Debug, Clone, Default)]
pub struct NewPage {
    pub properties: Option<Value>,
    pub children: Option<Value>,
    pub icon: Option<Value>,
    pub cover: Option<Value>,
}

impl NewPage {
    pub fn with_properties(mut self, properties: Value) -> Self {
        self.properties = Some(properties);
        self
    }

    pub fn with_children(mut self, children: Value) -> Self {
        self.children = Some(children);
        self
    }

    pub fn with_icon(mut self, icon: Value) -> Self {
        self.icon = Some(icon);
        self
    }

    pub fn with_cover(mut self, cover: Value) -> Self {
        self.cover = Some(cover);
        self
    }
}

/// Tri-state for PATCH fields: omitted fields keep their remote value,
/// cleared fields are sent as null, set fields carry the new value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FieldUpdate {
    #[default]
    Keep,
    Clear,
    Set(Value),
}

impl FieldUpdate {
    fn apply(self, fields: &mut Map<String, Value>, name: &str) {
        match self {
            Self::Keep => {}
            Self::Clear => {
                fields.insert(name.to_owned(), Value::Null);
            }
            Self::Set(value) => {
                fields.insert(name.to_owned(), value);
            }
        }
    }
}

/// Payload for [`NotionClient::create_database`]. Without properties the
/// database is created with a lone `Name` title column, inlined by default.
#[derive(Debug, Clone)]
pub struct NewDatabase {
    pub properties: Option<Value>,
    pub title: Option<Value>,
    pub is_inline: bool,
}

impl Default for NewDatabase {
    fn default() -> Self {
        Self {
            properties: None,
            title: None,
            is_inline: true,
        }
    }
}

/// Comments attach to a page or continue an existing discussion thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentTarget {
    Page(String),
    Discussion(String),
}

/// Object filter for [`NotionClient::search`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchFilter {
    Page,
    Database,
}

impl SearchFilter {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Page => "page",
            Self::Database => "database",
        }
    }
}

/// Notion API client. Credentials are validated at construction; a value of
/// this type proves the token worked at least once.
pub struct NotionClient {
    api: ApiClient,
}

impl std::fmt::Debug for NotionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotionClient").finish_non_exhaustive()
    }
}

impl NotionClient {
    /// Validate the token and version with a `users/me` ping and return a
    /// ready client. An invalid token surfaces as
    /// [`ApiErrorKind::InvalidToken`], an unknown version as
    /// [`ApiErrorKind::InvalidVersion`].
    pub fn connect(config: NotionConfig) -> Result<Self, Error> {
        let api = ApiClient::new(config.transport, error_map())
            .with_auth(HttpAuth::Bearer(config.token))
            .with_header("Notion-Version", config.version)
            .with_header("Content-Type", "application/json")
            .with_retry(config.retry)
            .with_paging(PageRules::default());

        let client = Self { api };
        client.bot_user()?;
        Ok(client)
    }

    // Pages

    /// Retrieve page properties by id.
    pub fn get_page(&self, page_id: &str) -> Result<Value, Error> {
        self.request(HttpMethod::Get, &format!("{BASE_URL}/pages/{page_id}"), None)
    }

    /// Create a page under a page or database parent. A missing parent is
    /// reported as [`ApiErrorKind::ParentNotFound`] rather than the generic
    /// not-found, since the target of the call is the page being created.
    pub fn create_page(&self, parent: &Parent, page: NewPage) -> Result<Value, Error> {
        let body = json!({
            "parent": parent.to_value(),
            "properties": page.properties.unwrap_or_else(|| json!({})),
            "children": page.children.unwrap_or_else(|| json!([])),
            "icon": page.icon,
            "cover": page.cover,
        });

        remap_missing_parent(self.request(
            HttpMethod::Post,
            &format!("{BASE_URL}/pages"),
            Some(body),
        ))
    }

    /// Update a page's properties and optionally its icon/cover. Fields the
    /// caller does not supply are omitted so remote values survive.
    pub fn update_page(
        &self,
        page_id: &str,
        properties: Option<Value>,
        icon: FieldUpdate,
        cover: FieldUpdate,
    ) -> Result<Value, Error> {
        let mut fields = Map::new();
        fields.insert(
            String::from("properties"),
            properties.unwrap_or_else(|| json!({})),
        );
        icon.apply(&mut fields, "icon");
        cover.apply(&mut fields, "cover");

        self.request(
            HttpMethod::Patch,
            &format!("{BASE_URL}/pages/{page_id}"),
            Some(Value::Object(fields)),
        )
    }

    /// Send a page to the trash bin.
    pub fn trash_page(&self, page_id: &str) -> Result<Value, Error> {
        self.set_archived(&format!("{BASE_URL}/pages/{page_id}"), true)
    }

    /// Recover a page from the trash bin.
    pub fn recover_page(&self, page_id: &str) -> Result<Value, Error> {
        self.set_archived(&format!("{BASE_URL}/pages/{page_id}"), false)
    }

    // Users

    /// The bot user associated with the integration token.
    pub fn bot_user(&self) -> Result<Value, Error> {
        self.request(HttpMethod::Get, &format!("{BASE_URL}/users/me"), None)
    }

    /// All users shared with the integration, across every page.
    pub fn list_users(&self) -> Result<Value, Error> {
        self.request(HttpMethod::Get, &format!("{BASE_URL}/users"), None)
    }

    pub fn get_user(&self, user_id: &str) -> Result<Value, Error> {
        self.request(HttpMethod::Get, &format!("{BASE_URL}/users/{user_id}"), None)
    }

    // Comments

    /// Unresolved comments on a page or block.
    pub fn get_comments(&self, block_or_page_id: &str) -> Result<Value, Error> {
        self.request(
            HttpMethod::Get,
            &format!("{BASE_URL}/comments?block_id={block_or_page_id}"),
            None,
        )
    }

    /// Post a comment on a page or into an existing discussion thread.
    pub fn create_comment(
        &self,
        target: &CommentTarget,
        rich_text: Value,
    ) -> Result<Value, Error> {
        let body = match target {
            CommentTarget::Page(id) => json!({
                "parent": {"page_id": id},
                "rich_text": rich_text,
            }),
            CommentTarget::Discussion(id) => json!({
                "discussion_id": id,
                "rich_text": rich_text,
            }),
        };

        remap_missing_parent(self.request(
            HttpMethod::Post,
            &format!("{BASE_URL}/comments"),
            Some(body),
        ))
    }

    // Search

    /// Search pages and databases shared with the integration. Without a
    /// query this is a blanket listing sorted by last edited time; only that
    /// timestamp sort is supported by the API.
    pub fn search(
        &self,
        query: Option<&str>,
        filter: Option<SearchFilter>,
        sort_ascending: bool,
    ) -> Result<Value, Error> {
        let mut body = json!({
            "query": query.unwrap_or(""),
            "sort": {
                "timestamp": "last_edited_time",
                "direction": if sort_ascending { "ascending" } else { "descending" },
            },
        });
        if let Some(filter) = filter {
            body["filter"] = json!({"property": "object", "value": filter.as_str()});
        }

        self.request(HttpMethod::Post, &format!("{BASE_URL}/search"), Some(body))
    }

    // Databases

    pub fn get_database(&self, database_id: &str) -> Result<Value, Error> {
        refine_validation_error(self.request(
            HttpMethod::Get,
            &format!("{BASE_URL}/databases/{database_id}"),
            None,
        ))
    }

    /// Fetch a database and verify its columns against the shape the caller
    /// depends on. Column names and their declared types must match.
    pub fn get_database_checked(
        &self,
        database_id: &str,
        expected: &[ExpectedField],
    ) -> Result<Value, Error> {
        let database = self.get_database(database_id)?;
        let properties = database.get("properties").cloned().unwrap_or(Value::Null);
        validate_declared_types(&properties, expected)?;
        Ok(database)
    }

    /// Create a database under a page, inlined by default.
    pub fn create_database(
        &self,
        parent_page_id: &str,
        database: NewDatabase,
    ) -> Result<Value, Error> {
        let mut body = json!({
            "parent": {"type": "page_id", "page_id": parent_page_id},
            "properties": database
                .properties
                .unwrap_or_else(|| json!({"Name": {"title": {}}})),
            "is_inline": database.is_inline,
        });
        if let Some(title) = database.title {
            body["title"] = title;
        }

        remap_missing_parent(self.request(
            HttpMethod::Post,
            &format!("{BASE_URL}/databases"),
            Some(body),
        ))
    }

    /// Update a database's title, columns or inline flag. Unsupplied parts
    /// are omitted from the request.
    pub fn update_database(
        &self,
        database_id: &str,
        title: Option<Value>,
        properties: Option<Value>,
        is_inline: Option<bool>,
    ) -> Result<Value, Error> {
        let mut fields = Map::new();
        if let Some(title) = title {
            fields.insert(String::from("title"), title);
        }
        if let Some(properties) = properties {
            fields.insert(String::from("properties"), properties);
        }
        if let Some(is_inline) = is_inline {
            fields.insert(String::from("is_inline"), Value::Bool(is_inline));
        }

        self.request(
            HttpMethod::Patch,
            &format!("{BASE_URL}/databases/{database_id}"),
            Some(Value::Object(fields)),
        )
    }

    pub fn trash_database(&self, database_id: &str) -> Result<Value, Error> {
        self.set_archived(&format!("{BASE_URL}/databases/{database_id}"), true)
    }

    pub fn recover_database(&self, database_id: &str) -> Result<Value, Error> {
        self.set_archived(&format!("{BASE_URL}/databases/{database_id}"), false)
    }

    /// Rows of a database, filtered and sorted remotely, merged across every
    /// result page.
    pub fn query_database(
        &self,
        database_id: &str,
        filter: Option<Value>,
        sorts: Option<Value>,
    ) -> Result<Value, Error> {
        let mut body = Map::new();
        if let Some(filter) = filter {
            body.insert(String::from("filter"), filter);
        }
        if let Some(sorts) = sorts {
            body.insert(String::from("sorts"), sorts);
        }

        refine_validation_error(self.request(
            HttpMethod::Post,
            &format!("{BASE_URL}/databases/{database_id}/query"),
            Some(Value::Object(body)),
        ))
    }

    // Database rows

    /// Insert a row into a database. Safe to call concurrently from a batch
    /// dispatcher; the client holds no per-call state.
    pub fn create_row(&self, database_id: &str, properties: Value) -> Result<Value, Error> {
        self.create_page(
            &Parent::Database(database_id.to_owned()),
            NewPage::default().with_properties(properties),
        )
    }

    pub fn get_row(&self, row_id: &str) -> Result<Value, Error> {
        self.get_page(row_id)
    }

    pub fn update_row(&self, row_id: &str, properties: Value) -> Result<Value, Error> {
        self.update_page(row_id, Some(properties), FieldUpdate::Keep, FieldUpdate::Keep)
    }

    pub fn trash_row(&self, row_id: &str) -> Result<Value, Error> {
        self.trash_page(row_id)
    }

    pub fn recover_row(&self, row_id: &str) -> Result<Value, Error> {
        self.recover_page(row_id)
    }

    /// A single property item of a row. Not-found here concerns the row the
    /// property belongs to, so it is reported as a missing parent; the API
    /// signals an unknown property id as a validation error, which becomes
    /// the not-found the caller actually means.
    pub fn row_property_item(&self, row_id: &str, property_id: &str) -> Result<Value, Error> {
        self.request(
            HttpMethod::Get,
            &format!("{BASE_URL}/pages/{row_id}/properties/{property_id}"),
            None,
        )
        .map_err(|error| match error {
            Error::Api(api) if api.kind == ApiErrorKind::ObjectNotFound => {
                Error::Api(api.with_kind(ApiErrorKind::ParentNotFound))
            }
            Error::Api(api) if api.kind == ApiErrorKind::Validation => {
                Error::Api(api.with_kind(ApiErrorKind::ObjectNotFound))
            }
            other => other,
        })
    }

    // Blocks

    pub fn get_block(&self, block_id: &str) -> Result<Value, Error> {
        self.request(HttpMethod::Get, &format!("{BASE_URL}/blocks/{block_id}"), None)
    }

    /// Children of a block, merged across every result page.
    pub fn block_children(&self, parent_block_id: &str) -> Result<Value, Error> {
        self.request(
            HttpMethod::Get,
            &format!("{BASE_URL}/blocks/{parent_block_id}/children"),
            None,
        )
    }

    /// Append child blocks to a parent block.
    pub fn append_block_children(
        &self,
        parent_block_id: &str,
        children: Value,
    ) -> Result<Value, Error> {
        remap_missing_parent(self.request(
            HttpMethod::Patch,
            &format!("{BASE_URL}/blocks/{parent_block_id}/children"),
            Some(json!({"children": children})),
        ))
    }

    /// Update a block's content. The body is the block object fragment the
    /// API documents for the block's type.
    pub fn update_block(&self, block_id: &str, block: Value) -> Result<Value, Error> {
        self.request(
            HttpMethod::Patch,
            &format!("{BASE_URL}/blocks/{block_id}"),
            Some(block),
        )
    }

    pub fn trash_block(&self, block_id: &str) -> Result<Value, Error> {
        self.set_archived(&format!("{BASE_URL}/blocks/{block_id}"), true)
    }

    pub fn recover_block(&self, block_id: &str) -> Result<Value, Error> {
        self.set_archived(&format!("{BASE_URL}/blocks/{block_id}"), false)
    }

    /// Trash a block through the dedicated delete endpoint.
    pub fn delete_block(&self, block_id: &str) -> Result<Value, Error> {
        self.request(
            HttpMethod::Delete,
            &format!("{BASE_URL}/blocks/{block_id}"),
            None,
        )
    }

    // Shared plumbing

    /// Every call goes through the paginating path: responses without
    /// pagination fields pass through untouched, list responses come back
    /// merged.
    fn request(&self, method: HttpMethod, url: &str, body: Option<Value>) -> Result<Value, Error> {
        self.api.call_paged(method, url, body)
    }

    fn set_archived(&self, url: &str, archived: bool) -> Result<Value, Error> {
        self.request(HttpMethod::Patch, url, Some(json!({"archived": archived})))
    }
}

/// Status/code table from the API's error reference
/// (<https://developers.notion.com/reference/errors>).
fn error_map() -> ErrorMap {
    ErrorMap::new()
        .status(401, ApiErrorKind::InvalidToken)
        .status(403, ApiErrorKind::InsufficientPermissions)
        .status(404, ApiErrorKind::ObjectNotFound)
        .status(409, ApiErrorKind::Conflict)
        .status(500, ApiErrorKind::InternalServerError)
        .status(503, ApiErrorKind::ServiceUnavailable)
        .code("invalid_json", ApiErrorKind::InvalidJson)
        .code("invalid_request_url", ApiErrorKind::InvalidRequestUrl)
        .code("invalid_request", ApiErrorKind::InvalidRequest)
        .code("validation_error", ApiErrorKind::Validation)
        .code("missing_version", ApiErrorKind::InvalidVersion)
}

/// A create-under-parent call failed because the parent does not exist; the
/// caller distinguishes that from "the target didn't exist".
fn remap_missing_parent(result: Result<Value, Error>) -> Result<Value, Error> {
    result.map_err(|error| match error {
        Error::Api(api) if api.kind == ApiErrorKind::ObjectNotFound => {
            Error::Api(api.with_kind(ApiErrorKind::ParentNotFound))
        }
        other => other,
    })
}

/// Special case: the API reports a malformed database/page id as a plain
/// validation error whose free-text message mentions "valid uuid". There is
/// no structured code for it, so the match is on the message text.
fn refine_validation_error(result: Result<Value, Error>) -> Result<Value, Error> {
    result.map_err(|error| match error {
        Error::Api(api)
            if api.kind == ApiErrorKind::Validation && api.message.contains("valid uuid") =>
        {
            log::debug!("refining validation error to invalid_id: {}", api.message);
            Error::Api(api.with_kind(ApiErrorKind::InvalidId))
        }
        other => other,
    })
}
