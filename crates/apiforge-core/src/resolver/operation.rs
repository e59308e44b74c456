//! Operation, parameter, request and response resolution

use std::collections::BTreeMap;

use openapiv3::{
    Header, MediaType, Operation, Parameter, ParameterSchemaOrContent, PathItem, PathStyle,
    QueryStyle, ReferenceOr, RequestBody, Response, Responses, StatusCode,
};

use super::{follow, Context, Resolver, SchemaNode};
use crate::model::{
    ControllerDescriptor, HttpMethod, OperationDescriptor, ParameterDescriptor, ParameterLocation,
    RequestDescriptor, ResponseDescriptor,
};
use crate::utils::dasherize;

/// Controller for operations without tags.
pub const DEFAULT_CONTROLLER: &str = "default";

impl<'a> Resolver<'a> {
    /// Resolve every operation and group them into controllers by first tag.
    pub(super) fn resolve_controllers(&mut self) -> Vec<ControllerDescriptor> {
        let document = self.document;
        let mut paths: Vec<(&'a String, &'a ReferenceOr<PathItem>)> =
            document.paths.paths.iter().collect();
        paths.sort_by(|a, b| a.0.cmp(b.0));

        self.reporter
            .notice(format!("Resolving operations of {} paths", paths.len()));
        let nested = self.reporter.nested();
        let mut groups: BTreeMap<String, Vec<OperationDescriptor>> = BTreeMap::new();
        for (path, item) in paths {
            let item = match item {
                ReferenceOr::Item(item) => item,
                ReferenceOr::Reference { reference } => {
                    self.reporter.warn(format!(
                        "Skipping path '{}': external path item '{}' is not supported",
                        path, reference
                    ));
                    continue;
                }
            };
            for (method, operation) in path_operations(item) {
                let descriptor = self.resolve_operation(path, method, item, operation);
                nested.debug(format!("{} {} -> {}", method, path, descriptor.name));
                let key = dasherize(descriptor.controller_key());
                let key = if key.is_empty() {
                    DEFAULT_CONTROLLER.to_string()
                } else {
                    key
                };
                groups.entry(key).or_default().push(descriptor);
            }
        }

        groups
            .into_iter()
            .map(|(name, mut operations)| {
                operations.sort_by(|a, b| a.name.cmp(&b.name));
                ControllerDescriptor {
                    description: self.tag_description(&name),
                    name,
                    operations,
                }
            })
            .collect()
    }

    fn tag_description(&self, controller: &str) -> Option<String> {
        self.document
            .tags
            .iter()
            .find(|tag| dasherize(&tag.name) == controller)
            .and_then(|tag| tag.description.clone())
    }

    fn resolve_operation(
        &mut self,
        path: &str,
        method: HttpMethod,
        item: &'a PathItem,
        operation: &'a Operation,
    ) -> OperationDescriptor {
        let name = operation
            .operation_id
            .as_deref()
            .map(dasherize)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| fallback_operation_name(method, path));

        let parameters = self.resolve_parameters(&name, &item.parameters, &operation.parameters);
        let requests = match &operation.request_body {
            Some(body) => self.resolve_requests(&name, body),
            None => Vec::new(),
        };
        let responses = self.resolve_responses(&name, &operation.responses);

        OperationDescriptor {
            method,
            path: path.to_string(),
            name,
            summary: operation.summary.clone(),
            description: operation.description.clone(),
            deprecated: operation.deprecated,
            tags: operation.tags.clone(),
            parameters,
            requests,
            responses,
        }
    }

    /// Path-level parameters merged with operation parameters. The operation
    /// wins when both declare the same name and location.
    fn resolve_parameters(
        &mut self,
        operation: &str,
        shared: &'a [ReferenceOr<Parameter>],
        own: &'a [ReferenceOr<Parameter>],
    ) -> Vec<ParameterDescriptor> {
        let document = self.document;
        let table = |name: &str| {
            document
                .components
                .as_ref()
                .and_then(|components| components.parameters.get(name))
        };

        let mut merged: Vec<&'a Parameter> = Vec::new();
        for reference in shared.iter().chain(own.iter()) {
            let Some(parameter) = follow(reference, table) else {
                self.reporter
                    .warn(format!("Skipping unresolvable parameter in '{}'", operation));
                continue;
            };
            let data = parameter.parameter_data_ref();
            let location = parameter_location(parameter);
            merged.retain(|existing| {
                existing.parameter_data_ref().name != data.name
                    || parameter_location(existing) != location
            });
            merged.push(parameter);
        }

        let scope = Context::root(operation, None);
        let mut parameters: Vec<ParameterDescriptor> = merged
            .into_iter()
            .map(|parameter| self.resolve_parameter(&scope, parameter))
            .collect();
        parameters.sort_by(|a, b| a.ordering(b));
        parameters
    }

    fn resolve_parameter(
        &mut self,
        scope: &Context<'_, 'a>,
        parameter: &'a Parameter,
    ) -> ParameterDescriptor {
        let data = parameter.parameter_data_ref();
        let location = parameter_location(parameter);
        let style = match parameter {
            Parameter::Query { style, .. } => query_style(style),
            Parameter::Path { style, .. } => path_style(style),
            _ => location.default_style(),
        };
        let ctx = scope.property(&data.name, schema_of(&data.format));
        let parameter_type = self.resolve(&ctx);

        ParameterDescriptor {
            name: data.name.clone(),
            location,
            description: data.description.clone(),
            style: style.to_string(),
            explode: data.explode.unwrap_or(style == "form"),
            required: data.required || location == ParameterLocation::Path,
            deprecated: data.deprecated.unwrap_or(false),
            parameter_type,
        }
    }

    /// One request descriptor per declared content type.
    fn resolve_requests(
        &mut self,
        operation: &str,
        body: &'a ReferenceOr<RequestBody>,
    ) -> Vec<RequestDescriptor> {
        let document = self.document;
        let body = follow(body, |name| {
            document
                .components
                .as_ref()
                .and_then(|components| components.request_bodies.get(name))
        });
        let Some(body) = body else {
            self.reporter
                .warn(format!("Skipping unresolvable request body of '{}'", operation));
            return Vec::new();
        };

        let contents = sorted_content(body.content.iter());
        let multiple = contents.len() > 1;
        let mut requests = Vec::with_capacity(contents.len());
        for (content_type, media) in contents {
            let name = payload_name(&[operation], content_type, multiple, "request");
            let Some(schema) = &media.schema else {
                continue;
            };
            let ctx = Context::root(&name, Some(SchemaNode::from(schema)));
            requests.push(RequestDescriptor {
                content_type: content_type.clone(),
                description: body.description.clone(),
                required: body.required,
                payload_type: self.resolve(&ctx),
            });
        }
        requests
    }

    /// One response descriptor per status code and content type. Responses
    /// without a body yield a single descriptor with no payload.
    fn resolve_responses(
        &mut self,
        operation: &str,
        responses: &'a Responses,
    ) -> Vec<ResponseDescriptor> {
        let document = self.document;
        let table = |name: &str| {
            document
                .components
                .as_ref()
                .and_then(|components| components.responses.get(name))
        };

        let mut entries: Vec<(String, &'a ReferenceOr<Response>)> = responses
            .responses
            .iter()
            .map(|(code, response)| (status_text(code), response))
            .collect();
        if let Some(default) = &responses.default {
            entries.push(("default".to_string(), default));
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let mut descriptors = Vec::new();
        for (status, response) in entries {
            let Some(response) = follow(response, table) else {
                self.reporter.warn(format!(
                    "Skipping unresolvable {} response of '{}'",
                    status, operation
                ));
                continue;
            };
            let headers = self.resolve_headers(operation, &status, response);
            let contents = sorted_content(response.content.iter());
            if contents.is_empty() {
                descriptors.push(ResponseDescriptor {
                    status,
                    content_type: String::new(),
                    description: Some(response.description.clone()).filter(|d| !d.is_empty()),
                    payload_type: None,
                    headers,
                });
                continue;
            }
            let multiple = contents.len() > 1;
            for (content_type, media) in contents {
                let name = payload_name(&[operation, status.as_str()], content_type, multiple, "response");
                let payload_type = media.schema.as_ref().map(|schema| {
                    let ctx = Context::root(&name, Some(SchemaNode::from(schema)));
                    self.resolve(&ctx)
                });
                descriptors.push(ResponseDescriptor {
                    status: status.clone(),
                    content_type: content_type.clone(),
                    description: Some(response.description.clone()).filter(|d| !d.is_empty()),
                    payload_type,
                    headers: headers.clone(),
                });
            }
        }
        descriptors.sort_by(|a, b| a.ordering(b));
        descriptors
    }

    fn resolve_headers(
        &mut self,
        operation: &str,
        status: &str,
        response: &'a Response,
    ) -> Vec<ParameterDescriptor> {
        let document = self.document;
        let table = |name: &str| {
            document
                .components
                .as_ref()
                .and_then(|components| components.headers.get(name))
        };

        let scope = Context::root(&format!("{}-{}", operation, status), None);
        let mut headers = Vec::new();
        for (name, header) in &response.headers {
            let Some(header) = follow(header, table) else {
                self.reporter.warn(format!(
                    "Skipping unresolvable header '{}' of '{}'",
                    name, operation
                ));
                continue;
            };
            headers.push(self.resolve_header(&scope, name, header));
        }
        headers.sort_by(|a, b| a.ordering(b));
        headers
    }

    fn resolve_header(
        &mut self,
        scope: &Context<'_, 'a>,
        name: &str,
        header: &'a Header,
    ) -> ParameterDescriptor {
        let ctx = scope.property(name, schema_of(&header.format));
        ParameterDescriptor {
            name: name.to_string(),
            location: ParameterLocation::Header,
            description: header.description.clone(),
            style: ParameterLocation::Header.default_style().to_string(),
            explode: false,
            required: header.required,
            deprecated: header.deprecated.unwrap_or(false),
            parameter_type: self.resolve(&ctx),
        }
    }
}

/// Operations of a path item in the fixed method order.
fn path_operations(item: &PathItem) -> Vec<(HttpMethod, &Operation)> {
    [
        (HttpMethod::Get, &item.get),
        (HttpMethod::Put, &item.put),
        (HttpMethod::Post, &item.post),
        (HttpMethod::Delete, &item.delete),
        (HttpMethod::Options, &item.options),
        (HttpMethod::Head, &item.head),
        (HttpMethod::Patch, &item.patch),
        (HttpMethod::Trace, &item.trace),
    ]
    .into_iter()
    .filter_map(|(method, operation)| operation.as_ref().map(|operation| (method, operation)))
    .collect()
}

/// `get /pets/{petId}` becomes `get-pets-pet-id`.
fn fallback_operation_name(method: HttpMethod, path: &str) -> String {
    let segments: Vec<&str> = path
        .split(|c: char| !c.is_alphanumeric())
        .filter(|segment| !segment.is_empty())
        .collect();
    dasherize(&format!("{} {}", method, segments.join(" ")))
}

fn parameter_location(parameter: &Parameter) -> ParameterLocation {
    match parameter {
        Parameter::Query { .. } => ParameterLocation::Query,
        Parameter::Header { .. } => ParameterLocation::Header,
        Parameter::Path { .. } => ParameterLocation::Path,
        Parameter::Cookie { .. } => ParameterLocation::Cookie,
    }
}

fn query_style(style: &QueryStyle) -> &'static str {
    match style {
        QueryStyle::Form => "form",
        QueryStyle::SpaceDelimited => "spaceDelimited",
        QueryStyle::PipeDelimited => "pipeDelimited",
        QueryStyle::DeepObject => "deepObject",
    }
}

fn path_style(style: &PathStyle) -> &'static str {
    match style {
        PathStyle::Matrix => "matrix",
        PathStyle::Label => "label",
        PathStyle::Simple => "simple",
    }
}

/// The schema of a parameter or header, or of its first content entry.
fn schema_of(format: &ParameterSchemaOrContent) -> Option<SchemaNode<'_>> {
    match format {
        ParameterSchemaOrContent::Schema(schema) => Some(SchemaNode::from(schema)),
        ParameterSchemaOrContent::Content(content) => content
            .values()
            .next()
            .and_then(|media| media.schema.as_ref())
            .map(SchemaNode::from),
    }
}

fn status_text(code: &StatusCode) -> String {
    match code {
        StatusCode::Code(code) => code.to_string(),
        StatusCode::Range(range) => format!("{}XX", range),
    }
}

fn sorted_content<'m>(
    content: impl Iterator<Item = (&'m String, &'m MediaType)>,
) -> Vec<(&'m String, &'m MediaType)> {
    let mut content: Vec<_> = content.collect();
    content.sort_by(|a, b| a.0.cmp(b.0));
    content
}

/// `list-pets-200-response`, or `list-pets-200-json-response` when the
/// response declares several content types.
fn payload_name(prefix: &[&str], content_type: &str, multiple: bool, suffix: &str) -> String {
    let mut parts: Vec<String> = prefix.iter().map(|part| part.to_string()).collect();
    if multiple {
        let subtype = content_type.rsplit('/').next().unwrap_or(content_type);
        parts.push(dasherize(subtype));
    }
    parts.push(suffix.to_string());
    parts.join("-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PrimitiveKind;
    use crate::resolver::tests::resolve_yaml;

    const PETSTORE: &str = r#"
openapi: 3.0.3
info:
  title: Petstore
  version: 1.0.0
tags:
  - name: pets
    description: Everything about your pets
paths:
  /pets:
    get:
      operationId: listPets
      tags: [pets]
      summary: List all pets
      parameters:
        - name: limit
          in: query
          schema:
            type: integer
            format: int32
        - name: X-Trace
          in: header
          schema:
            type: string
      responses:
        '200':
          description: A paged array of pets
          headers:
            x-next:
              schema:
                type: string
          content:
            application/json:
              schema:
                type: array
                items:
                  $ref: '#/components/schemas/Pet'
        default:
          description: unexpected error
          content:
            application/json:
              schema:
                $ref: '#/components/schemas/Error'
    post:
      operationId: createPets
      tags: [pets]
      requestBody:
        required: true
        content:
          application/json:
            schema:
              $ref: '#/components/schemas/Pet'
          application/xml:
            schema:
              $ref: '#/components/schemas/Pet'
      responses:
        '201':
          description: Null response
  /pets/{petId}:
    parameters:
      - name: petId
        in: path
        required: true
        schema:
          type: string
    get:
      tags: [pets]
      parameters:
        - name: petId
          in: path
          required: true
          description: The id of the pet to retrieve
          schema:
            type: string
            format: uuid
      responses:
        '200':
          description: Expected response to a valid request
          content:
            application/json:
              schema:
                $ref: '#/components/schemas/Pet'
  /health:
    get:
      operationId: health
      responses:
        2XX:
          description: ok
components:
  schemas:
    Pet:
      type: object
      required: [id, name]
      properties:
        id:
          type: integer
          format: int64
        name:
          type: string
    Error:
      type: object
      properties:
        code:
          type: integer
        message:
          type: string
"#;

    #[test]
    fn test_controllers_are_grouped_and_sorted() {
        let (spec, _) = resolve_yaml(PETSTORE);
        let names: Vec<&str> = spec.controllers.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["default", "pets"]);

        let pets = spec.controller("pets").expect("pets");
        assert_eq!(pets.description.as_deref(), Some("Everything about your pets"));
        let operations: Vec<&str> = pets.operations.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(operations, vec!["create-pets", "get-pets-pet-id", "list-pets"]);

        let health = &spec.controller("default").expect("default").operations[0];
        assert_eq!(health.responses[0].status, "2XX");
        assert!(health.responses[0].payload_type.is_none());
    }

    #[test]
    fn test_parameters_are_merged_and_sorted() {
        let (spec, _) = resolve_yaml(PETSTORE);
        let get = spec
            .operations()
            .find(|o| o.name == "get-pets-pet-id")
            .expect("operation");
        assert_eq!(get.parameters.len(), 1);
        let pet_id = &get.parameters[0];
        assert_eq!(pet_id.description.as_deref(), Some("The id of the pet to retrieve"));
        assert_eq!(
            spec.arena[pet_id.parameter_type].primitive_kind(),
            Some(PrimitiveKind::Uuid)
        );
        assert_eq!(pet_id.style, "simple");
        assert!(!pet_id.explode);

        let list = spec.operations().find(|o| o.name == "list-pets").expect("list");
        let locations: Vec<(ParameterLocation, &str)> = list
            .parameters
            .iter()
            .map(|p| (p.location, p.name.as_str()))
            .collect();
        assert_eq!(
            locations,
            vec![
                (ParameterLocation::Query, "limit"),
                (ParameterLocation::Header, "X-Trace")
            ]
        );
        assert!(list.parameters[0].explode);
        assert!(!list.parameters[0].required);
    }

    #[test]
    fn test_requests_and_responses() {
        let (spec, _) = resolve_yaml(PETSTORE);
        let create = spec.operations().find(|o| o.name == "create-pets").expect("create");
        let content_types: Vec<&str> = create
            .requests
            .iter()
            .map(|r| r.content_type.as_str())
            .collect();
        assert_eq!(content_types, vec!["application/json", "application/xml"]);
        assert!(create.requests.iter().all(|r| r.required));
        assert!(spec.find("create-pets-json-request").is_some());
        assert!(spec.find("create-pets-xml-request").is_some());

        let list = spec.operations().find(|o| o.name == "list-pets").expect("list");
        let statuses: Vec<&str> = list.responses.iter().map(|r| r.status.as_str()).collect();
        assert_eq!(statuses, vec!["200", "default"]);
        let ok = &list.responses[0];
        assert_eq!(ok.headers.len(), 1);
        assert_eq!(ok.headers[0].name, "x-next");
        let payload = spec.find("list-pets-200-response").expect("response alias");
        assert!(payload.is_alias());
        let array = &spec.arena[payload.element.expect("array")];
        assert!(array.is_array());
        assert_eq!(spec.arena[array.element.expect("pet")].name, "pet");
        assert_eq!(
            list.success_response().map(|r| r.payload_type),
            Some(ok.payload_type)
        );
    }

    #[test]
    fn test_fallback_operation_name() {
        assert_eq!(
            fallback_operation_name(HttpMethod::Get, "/pets/{petId}/toys"),
            "get-pets-pet-id-toys"
        );
        assert_eq!(fallback_operation_name(HttpMethod::Delete, "/"), "delete");
    }

    #[test]
    fn test_payload_names() {
        assert_eq!(
            payload_name(&["list-pets", "200"], "application/json", false, "response"),
            "list-pets-200-response"
        );
        assert_eq!(
            payload_name(&["upload"], "multipart/form-data", true, "request"),
            "upload-form-data-request"
        );
    }
}
