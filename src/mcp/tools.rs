//! The tool contract.
//!
//! A tool is a named, schema-described unit of functionality. Capabilities
//! implement [`Tool`]; the [`Dispatcher`](crate::mcp::dispatcher::Dispatcher)
//! validates incoming arguments against the tool's [`InputSchema`] before
//! calling it, so handlers receive [`Arguments`] that already have the right
//! shape.
//!
//! # Examples
//!
//! ```
//! use toolgate::mcp::tools::{Argument, Arguments, InputSchema, Kind, Tool, ToolCallError, ToolCallResponse};
//!
//! struct Echo;
//!
//! impl Tool for Echo {
//!     fn name(&self) -> &str {
//!         "echo"
//!     }
//!
//!     fn description(&self) -> &str {
//!         "Echoes back the input message"
//!     }
//!
//!     fn input_schema(&self) -> InputSchema {
//!         InputSchema::new(vec![
//!             Argument::new("message", Kind::String, "Message to echo", true),
//!         ])
//!     }
//!
//!     fn call(&self, arguments: &Arguments) -> Result<ToolCallResponse, ToolCallError> {
//!         let message = arguments.str("message")?;
//!         Ok(ToolCallResponse::text(format!("Echo: {message}")))
//!     }
//! }
//! ```

use serde::de::{MapAccess, Visitor};
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// Trait for implementing MCP tools.
///
/// # Thread Safety
///
/// Tools must be `Send + Sync`: the HTTP transport runs each request on its
/// own thread and they all share one registry.
///
/// # Contract
///
/// `call` receives arguments that passed schema validation. It reports
/// failure by returning `Err`; it never writes to a transport directly.
/// Tools whose effect cannot be undone take a boolean `confirm` argument
/// defaulting to `false` and only describe the would-be effect until it is
/// set.
pub trait Tool: Send + Sync {
    /// Returns the unique name of the tool.
    fn name(&self) -> &str;

    /// Returns a human-readable description of what the tool does.
    fn description(&self) -> &str;

    /// Returns the schema defining the tool's input parameters.
    fn input_schema(&self) -> InputSchema;

    /// Executes the tool with validated arguments.
    fn call(&self, arguments: &Arguments) -> Result<ToolCallResponse, ToolCallError>;
}

/// The type an [`Argument`] must have.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Kind {
    /// A JSON string.
    String,
    /// Any JSON number.
    Number,
    /// A JSON number with no fractional part.
    Integer,
    /// `true` or `false`.
    Boolean,
    /// A string drawn from a fixed set of values.
    Enum(Vec<String>),
    /// A JSON object.
    Object,
    /// A JSON array.
    Array,
}

impl Kind {
    /// Builds an [`Kind::Enum`] from string slices.
    pub fn one_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Kind::Enum(values.into_iter().map(Into::into).collect())
    }

    /// The JSON Schema `type` keyword for this kind.
    pub fn json_type(&self) -> &'static str {
        match self {
            Kind::String | Kind::Enum(_) => "string",
            Kind::Number => "number",
            Kind::Integer => "integer",
            Kind::Boolean => "boolean",
            Kind::Object => "object",
            Kind::Array => "array",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Enum(values) => write!(f, "one of [{}]", values.join(", ")),
            other => f.write_str(other.json_type()),
        }
    }
}

/// Represents a single parameter for a tool.
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub(crate) name: String,
    pub(crate) kind: Kind,
    pub(crate) description: String,
    pub(crate) required: bool,
    pub(crate) default: Option<Value>,
}

impl Argument {
    /// Creates a new tool argument specification.
    ///
    /// ```
    /// use toolgate::mcp::tools::{Argument, Kind};
    ///
    /// let path = Argument::new("path", Kind::String, "Path to the file", true);
    /// let confirm = Argument::new("confirm", Kind::Boolean, "Apply the change", false)
    ///     .with_default(false);
    /// assert!(path.is_required());
    /// assert!(!confirm.is_required());
    /// ```
    pub fn new(
        name: impl Into<String>,
        kind: Kind,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            description: description.into(),
            required,
            default: None,
        }
    }

    /// Value substituted when an optional argument is omitted.
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }
}

/// Schema defining a tool's input parameters.
///
/// Serializes as a JSON Schema object. A strict schema rejects arguments it
/// does not declare; the default is lenient and ignores them.
#[derive(Debug, Clone, PartialEq)]
pub struct InputSchema {
    arguments: Vec<Argument>,
    strict: bool,
}

impl InputSchema {
    /// Creates a new lenient input schema from a collection of arguments.
    pub fn new<A: IntoIterator<Item = Argument>>(arguments: A) -> Self {
        InputSchema {
            arguments: arguments.into_iter().collect(),
            strict: false,
        }
    }

    /// Rejects undeclared arguments.
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }

    pub fn argument(&self, name: &str) -> Option<&Argument> {
        self.arguments.iter().find(|a| a.name == name)
    }
}

struct Properties<'a>(&'a [Argument]);

impl Serialize for Properties<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for argument in self.0 {
            let mut property = Map::new();
            property.insert("type".to_string(), argument.kind.json_type().into());
            if let Kind::Enum(values) = &argument.kind {
                property.insert("enum".to_string(), values.clone().into());
            }
            property.insert("description".to_string(), argument.description.clone().into());
            if let Some(default) = &argument.default {
                property.insert("default".to_string(), default.clone());
            }
            map.serialize_entry(&argument.name, &property)?;
        }
        map.end()
    }
}

impl Serialize for InputSchema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let required: Vec<&str> = self
            .arguments
            .iter()
            .filter(|a| a.required)
            .map(|a| a.name.as_str())
            .collect();
        let fields = if self.strict { 4 } else { 3 };
        let mut s = serializer.serialize_struct("InputSchema", fields)?;
        s.serialize_field("type", "object")?;
        s.serialize_field("properties", &Properties(&self.arguments))?;
        s.serialize_field("required", &required)?;
        if self.strict {
            s.serialize_field("additionalProperties", &false)?;
        }
        s.end()
    }
}

/// Metadata about a tool, as returned by `tools/list`.
#[derive(Debug, serde::Serialize)]
pub struct ToolInfo {
    name: String,
    description: String,
    #[serde(rename = "inputSchema")]
    input_schema: InputSchema,
}

impl ToolInfo {
    pub(crate) fn from_tool(tool: &dyn Tool) -> Self {
        ToolInfo {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            input_schema: tool.input_schema(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// The `tools/list` result.
#[derive(Debug, serde::Serialize)]
pub struct ToolList {
    pub(crate) tools: Vec<ToolInfo>,
}

impl ToolList {
    pub fn tools(&self) -> &[ToolInfo] {
        &self.tools
    }
}

/// Parameters of a `tools/call` request.
#[derive(Debug, serde::Deserialize, Clone)]
pub(crate) struct ToolCallParams {
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) arguments: Option<Value>,
}

/// Validated arguments handed to a tool.
///
/// Accessors return [`ToolCallError`] so handlers can use `?`; after
/// validation a required argument is always present with the declared type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments(Map<String, Value>);

impl Arguments {
    pub fn new(map: Map<String, Value>) -> Self {
        Arguments(map)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn str(&self, name: &str) -> Result<&str, ToolCallError> {
        self.opt_str(name)
            .ok_or_else(|| ToolCallError::new(format!("Missing string argument '{name}'")))
    }

    pub fn opt_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    pub fn bool(&self, name: &str) -> Result<bool, ToolCallError> {
        self.0
            .get(name)
            .and_then(Value::as_bool)
            .ok_or_else(|| ToolCallError::new(format!("Missing boolean argument '{name}'")))
    }

    /// Reads a boolean, treating absence as `false`.
    pub fn flag(&self, name: &str) -> bool {
        self.0.get(name).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn f64(&self, name: &str) -> Result<f64, ToolCallError> {
        self.0
            .get(name)
            .and_then(Value::as_f64)
            .ok_or_else(|| ToolCallError::new(format!("Missing number argument '{name}'")))
    }

    pub fn i64(&self, name: &str) -> Result<i64, ToolCallError> {
        self.0
            .get(name)
            .and_then(Value::as_i64)
            .ok_or_else(|| ToolCallError::new(format!("Missing integer argument '{name}'")))
    }

    pub fn opt_f64(&self, name: &str) -> Option<f64> {
        self.0.get(name).and_then(Value::as_f64)
    }

    pub fn opt_i64(&self, name: &str) -> Option<i64> {
        self.0.get(name).and_then(Value::as_i64)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

/// The outcome of a tool invocation.
///
/// ```
/// use toolgate::mcp::tools::ToolCallResponse;
///
/// let response = ToolCallResponse::text("done");
/// let json = serde_json::to_value(&response).unwrap();
/// assert_eq!(json["content"][0]["type"], "text");
/// assert_eq!(json["isError"], false);
/// ```
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ToolCallResponse {
    content: Vec<ToolContent>,
    #[serde(rename = "isError", default)]
    is_error: bool,
}

impl ToolCallResponse {
    /// Creates a new successful tool response.
    pub fn new(content: Vec<ToolContent>) -> Self {
        ToolCallResponse {
            content,
            is_error: false,
        }
    }

    /// A successful response with a single text block.
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(vec![ToolContent::Text(text.into())])
    }

    /// A successful response whose single text block is pretty-printed JSON.
    pub fn json(value: &Value) -> Result<Self, ToolCallError> {
        serde_json::to_string_pretty(value)
            .map(Self::text)
            .map_err(|e| ToolCallError::new("Failed to encode tool output").with_detail(e.to_string()))
    }

    /// A failed response with a single text block.
    pub fn error(message: impl Into<String>) -> Self {
        ToolCallResponse {
            content: vec![ToolContent::Text(message.into())],
            is_error: true,
        }
    }

    pub fn content(&self) -> &[ToolContent] {
        &self.content
    }

    pub fn is_error(&self) -> bool {
        self.is_error
    }

    /// All text blocks joined by newlines.
    pub fn joined_text(&self) -> String {
        self.content
            .iter()
            .filter_map(ToolContent::as_str)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A failure reported by a tool handler.
///
/// The message is shown to the caller. The detail, typically the underlying
/// error's debug output, is only shown when the server runs in debug mode.
///
/// ```
/// use toolgate::mcp::tools::ToolCallError;
///
/// let error = ToolCallError::new("File not found: notes.txt").with_detail("Os { code: 2 }");
/// assert_eq!(error.to_string(), "File not found: notes.txt");
/// assert_eq!(error.into_response(false).joined_text(), "File not found: notes.txt");
/// ```
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct ToolCallError {
    message: String,
    detail: Option<String>,
}

impl ToolCallError {
    pub fn new(message: impl Into<String>) -> Self {
        ToolCallError {
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Converts this error into an `isError` response.
    pub fn into_response(self, debug: bool) -> ToolCallResponse {
        match self.detail {
            Some(detail) if debug => ToolCallResponse {
                content: vec![self.message.into(), detail.into()],
                is_error: true,
            },
            _ => ToolCallResponse::error(self.message),
        }
    }
}

/// Content returned by a tool.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ToolContent {
    /// Text content
    Text(String),
}

impl ToolContent {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ToolContent::Text(text) => Some(text),
        }
    }
}

impl Serialize for ToolContent {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            ToolContent::Text(text) => {
                let mut s = serializer.serialize_struct("ToolContent", 2)?;
                s.serialize_field("type", "text")?;
                s.serialize_field("text", text)?;
                s.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for ToolContent {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de;
        struct ToolContentVisitor;

        impl<'de> Visitor<'de> for ToolContentVisitor {
            type Value = ToolContent;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a tool content object with type and data")
            }

            fn visit_map<M>(self, mut map: M) -> Result<Self::Value, M::Error>
            where
                M: MapAccess<'de>,
            {
                let mut content_type: Option<String> = None;
                let mut text: Option<String> = None;

                while let Some(key) = map.next_key::<String>()? {
                    match key.as_str() {
                        "type" => {
                            if content_type.is_some() {
                                return Err(de::Error::duplicate_field("type"));
                            }
                            content_type = Some(map.next_value()?);
                        }
                        "text" => {
                            if text.is_some() {
                                return Err(de::Error::duplicate_field("text"));
                            }
                            text = Some(map.next_value()?);
                        }
                        _ => {
                            let _: de::IgnoredAny = map.next_value()?;
                        }
                    }
                }

                match content_type.as_deref() {
                    Some("text") => {
                        let text = text.ok_or_else(|| de::Error::missing_field("text"))?;
                        Ok(ToolContent::Text(text))
                    }
                    Some(other) => Err(de::Error::unknown_variant(other, &["text"])),
                    None => Err(de::Error::missing_field("type")),
                }
            }
        }

        deserializer.deserialize_map(ToolContentVisitor)
    }
}

impl From<String> for ToolContent {
    fn from(value: String) -> Self {
        ToolContent::Text(value)
    }
}

impl From<&str> for ToolContent {
    fn from(value: &str) -> Self {
        ToolContent::Text(value.to_string())
    }
}
