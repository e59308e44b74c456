//! Resolved operations, grouped into controllers

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use super::types::TypeId;

/// Where a parameter travels, from the OpenAPI `in` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
}

impl ParameterLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Query => "query",
            Self::Header => "header",
            Self::Cookie => "cookie",
        }
    }

    /// Serialization style OpenAPI assumes when none is declared.
    pub fn default_style(&self) -> &'static str {
        match self {
            Self::Path | Self::Header => "simple",
            Self::Query | Self::Cookie => "form",
        }
    }
}

impl fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP methods an OpenAPI path item can declare, in visiting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
    Options,
    Head,
    Patch,
    Trace,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 8] = [
        Self::Get,
        Self::Put,
        Self::Post,
        Self::Delete,
        Self::Options,
        Self::Head,
        Self::Patch,
        Self::Trace,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Put => "put",
            Self::Post => "post",
            Self::Delete => "delete",
            Self::Options => "options",
            Self::Head => "head",
            Self::Patch => "patch",
            Self::Trace => "trace",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|method| method.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown HTTP method: {}", s))
    }
}

/// A resolved operation parameter (or response header).
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDescriptor {
    pub name: String,
    pub location: ParameterLocation,
    pub description: Option<String>,
    pub style: String,
    pub explode: bool,
    pub required: bool,
    pub deprecated: bool,
    pub parameter_type: TypeId,
}

impl ParameterDescriptor {
    /// Path before query before header before cookie, then by name.
    pub fn ordering(&self, other: &Self) -> Ordering {
        self.location
            .cmp(&other.location)
            .then_with(|| self.name.cmp(&other.name))
    }
}

/// One content type of an operation's request body.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub content_type: String,
    pub description: Option<String>,
    pub required: bool,
    pub payload_type: TypeId,
}

/// One status code and content type of an operation's responses.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseDescriptor {
    /// `"200"`, `"2XX"` or `"default"`
    pub status: String,
    /// Empty when the response carries no body
    pub content_type: String,
    pub description: Option<String>,
    pub payload_type: Option<TypeId>,
    pub headers: Vec<ParameterDescriptor>,
}

impl ResponseDescriptor {
    /// By content type, then by status code.
    pub fn ordering(&self, other: &Self) -> Ordering {
        self.content_type
            .cmp(&other.content_type)
            .then_with(|| self.status.cmp(&other.status))
    }

    pub fn is_success(&self) -> bool {
        self.status.starts_with('2')
    }
}

/// A resolved path + method pair.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationDescriptor {
    pub method: HttpMethod,
    pub path: String,
    pub name: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub deprecated: bool,
    pub tags: Vec<String>,
    pub parameters: Vec<ParameterDescriptor>,
    pub requests: Vec<RequestDescriptor>,
    pub responses: Vec<ResponseDescriptor>,
}

impl OperationDescriptor {
    /// Grouping key of the controller this operation belongs to.
    pub fn controller_key(&self) -> &str {
        self.tags.first().map(String::as_str).unwrap_or("default")
    }

    /// The response a handler returns on success: the lowest 2xx status with
    /// a body, preferring JSON, falling back to the default response.
    pub fn success_response(&self) -> Option<&ResponseDescriptor> {
        let with_body = |response: &&ResponseDescriptor| response.payload_type.is_some();
        let mut successes: Vec<&ResponseDescriptor> = self
            .responses
            .iter()
            .filter(|response| response.is_success())
            .filter(with_body)
            .collect();
        successes.sort_by(|a, b| {
            a.status
                .cmp(&b.status)
                .then_with(|| is_json(&b.content_type).cmp(&is_json(&a.content_type)))
        });
        successes.into_iter().next().or_else(|| {
            self.responses
                .iter()
                .filter(|response| response.status == "default")
                .find(with_body)
        })
    }

    /// The request body a handler accepts, preferring JSON.
    pub fn primary_request(&self) -> Option<&RequestDescriptor> {
        self.requests
            .iter()
            .find(|request| is_json(&request.content_type))
            .or_else(|| self.requests.first())
    }
}

fn is_json(content_type: &str) -> bool {
    content_type.contains("json")
}

/// Operations sharing a first tag.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerDescriptor {
    pub name: String,
    pub description: Option<String>,
    pub operations: Vec<OperationDescriptor>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: &str, content_type: &str, payload: Option<usize>) -> ResponseDescriptor {
        ResponseDescriptor {
            status: status.to_string(),
            content_type: content_type.to_string(),
            description: None,
            payload_type: payload.map(TypeId::from_index),
            headers: Vec::new(),
        }
    }

    fn operation(responses: Vec<ResponseDescriptor>) -> OperationDescriptor {
        OperationDescriptor {
            method: HttpMethod::Get,
            path: "/pets".to_string(),
            name: "list-pets".to_string(),
            summary: None,
            description: None,
            deprecated: false,
            tags: Vec::new(),
            parameters: Vec::new(),
            requests: Vec::new(),
            responses,
        }
    }

    #[test]
    fn test_http_method_parsing() {
        assert_eq!("GET".parse::<HttpMethod>(), Ok(HttpMethod::Get));
        assert_eq!("patch".parse::<HttpMethod>(), Ok(HttpMethod::Patch));
        assert!("fetch".parse::<HttpMethod>().is_err());
        assert_eq!(HttpMethod::Delete.to_string(), "delete");
    }

    #[test]
    fn test_controller_key_defaults() {
        let mut op = operation(Vec::new());
        assert_eq!(op.controller_key(), "default");
        op.tags = vec!["pets".to_string(), "admin".to_string()];
        assert_eq!(op.controller_key(), "pets");
    }

    #[test]
    fn test_success_response_prefers_lowest_json_body() {
        let op = operation(vec![
            response("204", "", None),
            response("201", "application/xml", Some(1)),
            response("201", "application/json", Some(2)),
            response("default", "application/json", Some(3)),
        ]);
        let chosen = op.success_response().map(|r| (r.status.as_str(), r.content_type.as_str()));
        assert_eq!(chosen, Some(("201", "application/json")));

        let fallback = operation(vec![response("default", "application/json", Some(3))]);
        assert_eq!(
            fallback.success_response().map(|r| r.status.as_str()),
            Some("default")
        );
    }

    #[test]
    fn test_response_ordering() {
        let mut responses = vec![
            response("404", "application/json", None),
            response("200", "text/plain", None),
            response("200", "application/json", None),
        ];
        responses.sort_by(|a, b| a.ordering(b));
        let keys: Vec<(String, String)> = responses
            .into_iter()
            .map(|r| (r.content_type, r.status))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("application/json".to_string(), "200".to_string()),
                ("application/json".to_string(), "404".to_string()),
                ("text/plain".to_string(), "200".to_string()),
            ]
        );
    }
}
