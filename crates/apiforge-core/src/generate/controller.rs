//! One controller module per group of tagged operations

use std::collections::HashSet;

use crate::document::{Document, Function};
use crate::model::{ControllerDescriptor, OperationDescriptor};
use crate::report::Reporter;
use crate::utils::{to_field_ident, to_screaming_snake_case, to_snake_case, to_type_ident};

use super::types::{push_docs, TypeNames, Used};

/// Width descriptions are wrapped to in doc comments.
const DOC_WIDTH: usize = 80;

/// Name of the error type every handler returns, declared in `mod.rs`.
pub const HANDLER_ERROR: &str = "HandlerError";

/// File name of a controller module, e.g. `pet_store.rs`.
pub fn file_name(controller: &ControllerDescriptor) -> String {
    format!("{}.rs", module_name(controller))
}

/// Module name of a controller, e.g. `pet_store`.
pub fn module_name(controller: &ControllerDescriptor) -> String {
    let name = to_field_ident(&controller.name);
    name.strip_prefix("r#").map(|bare| format!("{}_", bare)).unwrap_or(name)
}

pub struct ControllerGenerator<'s> {
    names: &'s TypeNames<'s>,
    types_module: &'s str,
    reporter: Reporter,
}

impl<'s> ControllerGenerator<'s> {
    pub fn new(names: &'s TypeNames<'s>, types_module: &'s str, reporter: &Reporter) -> Self {
        Self {
            names,
            types_module,
            reporter: reporter.nested(),
        }
    }

    pub fn document(
        &self,
        controller: &ControllerDescriptor,
        operations: &[&OperationDescriptor],
        banner: &[String],
    ) -> Document {
        let mut document = Document::new();
        for line in banner {
            document.add_doc(line.clone());
        }
        document.add_import(format!("super::{}", HANDLER_ERROR));

        let mut used = Used::default();
        let mut handlers = Vec::new();
        let mut seen = HashSet::new();
        for &operation in operations {
            let handler = to_field_ident(&operation.name);
            if !seen.insert(handler.clone()) {
                self.reporter.warn(format!(
                    "Skipping '{} {}': handler '{}' already exists in '{}'",
                    operation.method, operation.path, handler, controller.name
                ));
                continue;
            }
            handlers.push((operation, handler));
        }

        let paths = document.add_constant_block("paths");
        for (operation, _) in &handlers {
            paths.add_constant(
                &to_screaming_snake_case(&operation.name),
                "&str",
                &format!("{:?}", operation.path),
            );
        }

        for (operation, _) in &handlers {
            if !operation.parameters.is_empty() {
                self.add_params(&mut document, operation, &mut used);
            }
        }

        let controller_name = to_type_ident(&format!("{}-controller", controller.name));
        let record = document.add_record_type(&controller_name);
        push_docs(&mut record.decorations.docs, controller.description.as_deref());
        record
            .decorations
            .attribute("#[derive(Debug, Clone, Default)]");
        for (operation, handler) in &handlers {
            self.fill_handler(record.add_method(handler), operation, &mut used);
            self.reporter
                .success(format!("{}::{}", controller_name, handler));
        }

        self.add_routes(&mut document, &handlers);

        for ty in used.types {
            document.add_import(format!("super::{}::{}", self.types_module, ty));
        }
        for import in used.imports {
            document.add_import(import);
        }
        document
    }

    fn add_params(
        &self,
        document: &mut Document,
        operation: &OperationDescriptor,
        used: &mut Used,
    ) {
        let name = params_ident(operation);
        let record = document.add_record_type(&name);
        record
            .decorations
            .doc(format!("Parameters of `{}`.", to_snake_case(&operation.name)))
            .attribute("#[derive(Debug, Clone, Default)]");
        for parameter in &operation.parameters {
            let mut ty = self.names.rust_type(parameter.parameter_type, used);
            if !parameter.required {
                ty = format!("Option<{}>", ty);
            }
            let field = record.add_field(&to_field_ident(&parameter.name), &ty);
            field
                .decorations
                .doc(format!("`{}` in {}", parameter.name, parameter.location));
            if let Some(description) = parameter.description.as_deref() {
                field.decorations.doc("");
                push_docs(&mut field.decorations.docs, Some(description));
            }
            if parameter.deprecated {
                field.decorations.attribute("#[deprecated]");
            }
        }
    }

    fn fill_handler(&self, method: &mut Function, operation: &OperationDescriptor, used: &mut Used) {
        method.decorations.docs = handler_docs(operation);
        if operation.deprecated {
            method.decorations.attribute("#[deprecated]");
        }

        method.set_async(true).param("&self");
        if !operation.parameters.is_empty() {
            method.param(format!("params: {}", params_ident(operation)));
        }
        if let Some(request) = operation.primary_request() {
            let mut ty = self.names.rust_type(request.payload_type, used);
            if !request.required {
                ty = format!("Option<{}>", ty);
            }
            method.param(format!("body: {}", ty));
        }

        let response = operation
            .success_response()
            .and_then(|response| response.payload_type)
            .map(|id| self.names.rust_type(id, used))
            .unwrap_or_else(|| "()".to_string());
        method.returns(format!("Result<{}, {}>", response, HANDLER_ERROR));

        if !operation.parameters.is_empty() {
            let bindings: Vec<String> = operation
                .parameters
                .iter()
                .map(|parameter| to_field_ident(&parameter.name))
                .collect();
            method.code(format!(
                "let {} {{ {} }} = params;",
                params_ident(operation),
                bindings.join(", ")
            ));
        }
        method
            .block_start()
            .code(format!(
                "let response: {} = todo!({:?});",
                response, operation.name
            ))
            .block_end()
            .code("Ok(response)");
    }

    fn add_routes(&self, document: &mut Document, handlers: &[(&OperationDescriptor, String)]) {
        let mut code = String::from("vec![\n");
        for (operation, handler) in handlers {
            code.push_str(&format!(
                "    ({:?}, paths::{}, {:?}),\n",
                operation.method.as_str().to_uppercase(),
                to_screaming_snake_case(&operation.name),
                handler
            ));
        }
        code.push(']');

        let routes = document.add_function("routes");
        routes
            .decorations
            .doc("`(method, path, handler)` for every operation of this controller.");
        routes
            .returns("Vec<(&'static str, &'static str, &'static str)>")
            .code(code);
    }
}

fn params_ident(operation: &OperationDescriptor) -> String {
    to_type_ident(&format!("{}-params", operation.name))
}

/// `[METHOD] /path`, the summary, then the description wrapped.
fn handler_docs(operation: &OperationDescriptor) -> Vec<String> {
    let mut docs = vec![format!(
        "[{}] {}",
        operation.method.as_str().to_uppercase(),
        operation.path
    )];
    if let Some(summary) = operation.summary.as_deref().map(str::trim) {
        if !summary.is_empty() {
            docs.push(summary.to_string());
        }
    }
    if let Some(description) = operation.description.as_deref().map(str::trim) {
        if !description.is_empty() {
            docs.push(String::new());
            for line in description.lines() {
                if line.trim().is_empty() {
                    docs.push(String::new());
                    continue;
                }
                docs.extend(
                    textwrap::wrap(line.trim(), DOC_WIDTH)
                        .into_iter()
                        .map(|wrapped| wrapped.trim_end().to_string()),
                );
            }
        }
    }
    docs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Declaration, Statement};
    use crate::resolver::tests::resolve_yaml;

    const PETS: &str = r#"
openapi: 3.0.3
info:
  title: Pets
  version: 1.0.0
tags:
  - name: pet-store
    description: Everything about your pets
paths:
  /pets:
    get:
      operationId: listPets
      tags: [pet-store]
      summary: List all pets
      description: Returns every pet the store knows about, oldest first, without any paging applied at all to the result set.
      parameters:
        - name: limit
          in: query
          schema:
            type: integer
            format: int32
        - name: type
          in: query
          required: true
          schema:
            type: string
      responses:
        '200':
          description: A list of pets
          content:
            application/json:
              schema:
                type: array
                items:
                  $ref: '#/components/schemas/Pet'
    post:
      operationId: createPets
      tags: [pet-store]
      deprecated: true
      requestBody:
        required: true
        content:
          application/json:
            schema:
              $ref: '#/components/schemas/Pet'
      responses:
        '201':
          description: Created
components:
  schemas:
    Pet:
      type: object
      required: [id]
      properties:
        id:
          type: integer
          format: int64
"#;

    fn generate() -> Document {
        let (spec, _) = resolve_yaml(PETS);
        let names = TypeNames::new(&spec);
        let controller = spec.controller("pet-store").expect("controller");
        let operations: Vec<&OperationDescriptor> = controller.operations.iter().collect();
        ControllerGenerator::new(&names, "types", &Reporter::default())
            .document(controller, &operations, &[])
    }

    #[test]
    fn test_file_name() {
        let controller = ControllerDescriptor {
            name: "pet-store".to_string(),
            description: None,
            operations: Vec::new(),
        };
        assert_eq!(file_name(&controller), "pet_store.rs");
        let keyword = ControllerDescriptor {
            name: "type".to_string(),
            ..controller
        };
        assert_eq!(module_name(&keyword), "type_");
    }

    #[test]
    fn test_declarations() {
        let document = generate();
        let names: Vec<&str> = document
            .declarations
            .iter()
            .map(Declaration::name)
            .collect();
        assert_eq!(
            names,
            vec!["paths", "ListPetsParams", "PetStoreController", "routes"]
        );
        let Some(Declaration::Constants(paths)) = document.find("paths") else {
            panic!("paths should be a constant block");
        };
        assert_eq!(paths.constants[0].name, "CREATE_PETS");
        assert_eq!(paths.constants[0].value, "\"/pets\"");

        let imports: Vec<&str> = document.imports.iter().map(String::as_str).collect();
        assert_eq!(
            imports,
            vec![
                "super::HandlerError",
                "super::types::CreatePetsRequest",
                "super::types::ListPets200Response",
            ]
        );
    }

    #[test]
    fn test_params_record() {
        let document = generate();
        let params = document.record("ListPetsParams").expect("params");
        let fields: Vec<(&str, &str)> = params
            .fields
            .iter()
            .map(|f| (f.name.as_str(), f.ty.as_str()))
            .collect();
        assert_eq!(fields, vec![("limit", "Option<i32>"), ("r#type", "String")]);
        assert_eq!(params.fields[0].decorations.docs, vec!["`limit` in query".to_string()]);
    }

    #[test]
    fn test_handlers() {
        let document = generate();
        let controller = document.record("PetStoreController").expect("controller");
        assert_eq!(
            controller.decorations.docs,
            vec!["Everything about your pets".to_string()]
        );

        let create = controller.method("create_pets").expect("create");
        assert!(create.is_async);
        assert_eq!(create.params, vec!["&self", "body: CreatePetsRequest"]);
        assert_eq!(create.returns.as_deref(), Some("Result<(), HandlerError>"));
        assert_eq!(create.decorations.attributes, vec!["#[deprecated]".to_string()]);
        assert_eq!(
            create.decorations.generate_key(),
            Some("pet-store-controller:create-pets")
        );

        let list = controller.method("list_pets").expect("list");
        assert_eq!(list.params, vec!["&self", "params: ListPetsParams"]);
        assert_eq!(
            list.returns.as_deref(),
            Some("Result<ListPets200Response, HandlerError>")
        );
        assert_eq!(
            list.body,
            vec![
                Statement::Code("let ListPetsParams { limit, r#type } = params;".to_string()),
                Statement::Comment("define block start".to_string()),
                Statement::Code(
                    "let response: ListPets200Response = todo!(\"list-pets\");".to_string()
                ),
                Statement::Comment("define block end".to_string()),
                Statement::Code("Ok(response)".to_string()),
            ]
        );
        assert_eq!(list.decorations.docs[0], "[GET] /pets");
        assert_eq!(list.decorations.docs[1], "List all pets");
        assert_eq!(list.decorations.docs[2], "");
        assert!(list.decorations.docs[3..].iter().all(|line| line.len() <= DOC_WIDTH));
        assert!(list.decorations.docs.len() > 4);
    }

    #[test]
    fn test_routes() {
        let document = generate();
        let routes = document.function("routes").expect("routes");
        assert_eq!(
            routes.body,
            vec![Statement::Code(
                "vec![\n    (\"POST\", paths::CREATE_PETS, \"create_pets\"),\n    (\"GET\", paths::LIST_PETS, \"list_pets\"),\n]"
                    .to_string()
            )]
        );
    }

    #[test]
    fn test_rendered_controller_parses_back() {
        let document = generate();
        let reparsed = Document::parse(&document.render()).expect("parses");
        assert_eq!(reparsed, document);
    }
}
