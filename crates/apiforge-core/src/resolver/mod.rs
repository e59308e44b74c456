//! OpenAPI resolution: turns a parsed document into a [`SpecDescriptor`].
//!
//! Every schema component, property, array element, parameter, request body
//! and response is resolved into a [`TypeDescriptor`] owned by one
//! [`TypeArena`]. Named types are cached by their dasherized name, so a
//! schema referenced from many places resolves exactly once and recursive
//! references terminate at the reserved arena slot.
//!
//! Components, properties and paths are visited in sorted order, so two
//! passes over the same document produce identical descriptors.

mod context;
mod operation;
mod schema;

use std::collections::{HashMap, HashSet};

use openapiv3::{OpenAPI, ReferenceOr, Schema};

use crate::model::{SpecDescriptor, TypeArena, TypeDescriptor, TypeId};
use crate::report::Reporter;

pub use context::{reference_basename, Context, SchemaNode, Scope};

/// Longest `$ref` chain followed before giving up.
const MAX_REFERENCE_DEPTH: usize = 32;

/// Resolve every schema component and operation of `document`.
pub fn resolve(document: &OpenAPI, reporter: &Reporter) -> SpecDescriptor {
    Resolver::new(document, reporter.clone()).run()
}

/// State of one resolution pass.
pub struct Resolver<'a> {
    document: &'a OpenAPI,
    reporter: Reporter,
    arena: TypeArena,
    /// Named types by dasherized name
    cache: HashMap<String, TypeId>,
    /// The inline schema each cached name was first resolved from
    origins: HashMap<String, &'a Schema>,
    /// Names whose resolution is in progress and not yet cached
    resolving: HashSet<String>,
}

impl<'a> Resolver<'a> {
    pub fn new(document: &'a OpenAPI, reporter: Reporter) -> Self {
        Self {
            document,
            reporter,
            arena: TypeArena::new(),
            cache: HashMap::new(),
            origins: HashMap::new(),
            resolving: HashSet::new(),
        }
    }

    /// Resolve components, then operations, and hand over the result.
    pub fn run(mut self) -> SpecDescriptor {
        let document = self.document;
        let mut names: Vec<(&'a String, &'a ReferenceOr<Schema>)> = document
            .components
            .iter()
            .flat_map(|components| components.schemas.iter())
            .collect();
        names.sort_by(|a, b| a.0.cmp(b.0));

        self.reporter
            .notice(format!("Resolving {} schema components", names.len()));
        let nested = self.reporter.nested();
        for (name, schema) in names {
            let ctx = Context::root(name, Some(SchemaNode::from(schema)));
            let id = self.resolve(&ctx);
            nested.debug(format!("{} -> {:?}", ctx.name(), self.arena[id].kind));
        }

        let controllers = self.resolve_controllers();

        let mut named: Vec<TypeId> = self.cache.values().copied().collect();
        named.sort_by(|a, b| self.arena[*a].name.cmp(&self.arena[*b].name));
        self.reporter.success(format!(
            "Resolved {} named types and {} controllers",
            named.len(),
            controllers.len()
        ));

        SpecDescriptor {
            title: document.info.title.clone(),
            version: document.info.version.clone(),
            arena: self.arena,
            named,
            controllers,
        }
    }

    /// Resolve the node held by `ctx`, reusing the cached type of the same
    /// name when there is one.
    pub fn resolve(&mut self, ctx: &Context<'_, 'a>) -> TypeId {
        if let Some(&id) = self.cache.get(ctx.name()) {
            self.check_collision(ctx);
            return id;
        }
        if self.resolving.contains(ctx.name()) {
            self.reporter.warn(format!(
                "Reference cycle through '{}' without an object in between, using any",
                ctx.name()
            ));
            return self.arena.push(TypeDescriptor::any(ctx.name()));
        }

        self.resolving.insert(ctx.name().to_string());
        let id = match ctx.node() {
            None => {
                let any = self.arena.push(TypeDescriptor::any(ctx.name()));
                self.name_at_root(ctx, any, None)
            }
            Some(SchemaNode::Reference(reference)) => {
                let target = self.dereference(reference);
                let id = self.resolve(&target);
                self.name_at_root(ctx, id, None)
            }
            Some(SchemaNode::Item(schema)) => self.resolve_schema(ctx, schema),
        };
        self.resolving.remove(ctx.name());
        id
    }

    /// The context a `$ref` points at. Unknown references resolve to `any`.
    fn dereference(&self, reference: &str) -> Context<'a, 'a> {
        let node = self.lookup_schema(reference).map(SchemaNode::from);
        if node.is_none() {
            self.reporter
                .warn(format!("Unresolvable reference '{}', using any", reference));
        }
        Context::dereference(reference, node)
    }

    fn lookup_schema(&self, reference: &str) -> Option<&'a ReferenceOr<Schema>> {
        let prefix = "#/components/schemas/";
        let name = reference.strip_prefix(prefix)?;
        self.document.components.as_ref()?.schemas.get(name)
    }

    /// Follow `$ref`s from `node` down to an inline schema.
    fn follow_schema(&self, node: SchemaNode<'a>) -> Option<&'a Schema> {
        let mut current = node;
        for _ in 0..MAX_REFERENCE_DEPTH {
            match current {
                SchemaNode::Item(schema) => return Some(schema),
                SchemaNode::Reference(reference) => {
                    current = SchemaNode::from(self.lookup_schema(reference)?);
                }
            }
        }
        None
    }

    /// Root contexts get a named, cached alias; nested ones return `id` as is.
    fn name_at_root(
        &mut self,
        ctx: &Context<'_, 'a>,
        id: TypeId,
        origin: Option<&'a Schema>,
    ) -> TypeId {
        if !ctx.is_root() {
            return id;
        }
        let mut alias = TypeDescriptor::alias(ctx.name(), id);
        if let Some(schema) = origin {
            alias.description = schema.schema_data.description.clone();
            alias.nullable = schema.schema_data.nullable;
        }
        let alias = self.arena.push(alias);
        self.remember(ctx.name(), alias, origin);
        alias
    }

    fn remember(&mut self, name: &str, id: TypeId, origin: Option<&'a Schema>) {
        self.cache.insert(name.to_string(), id);
        if let Some(schema) = origin {
            self.origins.insert(name.to_string(), schema);
        }
    }

    /// A name reused for a different inline schema keeps the first type.
    fn check_collision(&self, ctx: &Context<'_, 'a>) {
        let Some(SchemaNode::Item(schema)) = ctx.node() else {
            return;
        };
        if let Some(origin) = self.origins.get(ctx.name()) {
            if !std::ptr::eq(*origin, schema) {
                self.reporter.warn(format!(
                    "Name '{}' is used by more than one schema, reusing the first",
                    ctx.name()
                ));
            }
        }
    }
}

/// Follow a `$ref` chain through a component table.
fn follow<'a, T>(
    item: &'a ReferenceOr<T>,
    table: impl Fn(&str) -> Option<&'a ReferenceOr<T>>,
) -> Option<&'a T> {
    let mut current = item;
    for _ in 0..MAX_REFERENCE_DEPTH {
        match current {
            ReferenceOr::Item(item) => return Some(item),
            ReferenceOr::Reference { reference } => {
                current = table(reference_basename(reference))?;
            }
        }
    }
    None
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::{PrimitiveKind, TypeKind};
    use crate::report::{MemorySink, Severity};
    use std::sync::Arc;

    pub(crate) fn parse(yaml: &str) -> OpenAPI {
        serde_yaml::from_str(yaml).expect("valid OpenAPI document")
    }

    pub(crate) fn resolve_yaml(yaml: &str) -> (SpecDescriptor, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::default());
        let reporter = Reporter::new(sink.clone());
        (resolve(&parse(yaml), &reporter), sink)
    }

    const HEADER: &str = "openapi: 3.0.3\ninfo:\n  title: Test\n  version: 1.0.0\npaths: {}\n";

    fn with_schemas(schemas: &str) -> String {
        format!("{}components:\n  schemas:\n{}", HEADER, schemas)
    }

    #[test]
    fn test_empty_object_becomes_map_alias() {
        let (spec, _) = resolve_yaml(&with_schemas("    Bag:\n      type: object\n"));
        let bag = spec.find("bag").expect("bag");
        assert!(bag.is_alias());
        let map = &spec.arena[spec.arena.unalias(bag.element.expect("target"))];
        assert!(map.is_map());
        let key = &spec.arena[map.key.expect("key")];
        let value = &spec.arena[map.element.expect("value")];
        assert_eq!(key.primitive_kind(), Some(PrimitiveKind::String));
        assert!(value.is_any());
    }

    #[test]
    fn test_class_properties_ordering() {
        let yaml = with_schemas(
            "    Account:
      type: object
      required: [Balance]
      properties:
        balance:
          type: number
          format: double
        account_id:
          type: string
          format: uuid
        name:
          type: string
",
        );
        let (spec, _) = resolve_yaml(&yaml);
        let account = spec.find("account").expect("account");
        assert!(account.is_class());
        let names: Vec<&str> = account.properties.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["account_id", "balance", "name"]);
        let balance = &account.properties[1];
        assert!(balance.required, "required matching is case-insensitive");
        assert_eq!(
            spec.arena[balance.property_type].kind,
            TypeKind::Primitive(PrimitiveKind::Float64)
        );
        assert_eq!(
            spec.arena[account.properties[0].property_type].primitive_kind(),
            Some(PrimitiveKind::Uuid)
        );
    }

    #[test]
    fn test_string_enum_keeps_value_order() {
        let yaml = with_schemas("    Status:\n      type: string\n      enum: [open, closed, pending]\n");
        let (spec, _) = resolve_yaml(&yaml);
        let status = spec.find("status").expect("status");
        assert!(status.is_enum());
        assert_eq!(
            status.constraints.allowed_values,
            vec![
                serde_json::json!("open"),
                serde_json::json!("closed"),
                serde_json::json!("pending")
            ]
        );
    }

    #[test]
    fn test_references_resolve_once() {
        let yaml = with_schemas(
            "    Owner:
      type: object
      properties:
        name:
          type: string
    Pet:
      type: object
      properties:
        owner:
          $ref: '#/components/schemas/Owner'
        previousOwners:
          type: array
          items:
            $ref: '#/components/schemas/Owner'
        coOwner:
          $ref: '#/components/schemas/Owner'
",
        );
        let (spec, _) = resolve_yaml(&yaml);
        let owner_classes = spec
            .arena
            .iter()
            .filter(|(_, d)| d.is_class() && d.name == "owner")
            .count();
        assert_eq!(owner_classes, 1);

        let pet = spec.find("pet").expect("pet");
        let owner = spec.find("owner").expect("owner");
        let owner_id = spec.named.iter().copied().find(|id| spec.arena[*id].name == "owner");
        let direct: Vec<TypeId> = pet
            .properties
            .iter()
            .filter(|p| p.name != "previousOwners")
            .map(|p| p.property_type)
            .collect();
        assert!(direct.iter().all(|id| Some(*id) == owner_id));
        let list = pet
            .properties
            .iter()
            .find(|p| p.name == "previousOwners")
            .expect("list property");
        let array = &spec.arena[list.property_type];
        assert!(array.is_array());
        assert_eq!(array.element, owner_id);
        assert!(owner.is_class());
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let yaml = with_schemas(
            "    Zoo:
      type: object
      properties:
        animals:
          type: array
          items:
            $ref: '#/components/schemas/Animal'
    Animal:
      type: object
      properties:
        id:
          type: integer
          format: int64
        kind:
          type: string
          enum: [cat, dog]
",
        );
        let (first, _) = resolve_yaml(&yaml);
        let (second, _) = resolve_yaml(&yaml);
        assert_eq!(first, second);
    }

    #[test]
    fn test_self_reference_terminates() {
        let yaml = with_schemas(
            "    Node:
      type: object
      properties:
        children:
          type: array
          items:
            $ref: '#/components/schemas/Node'
        parent:
          $ref: '#/components/schemas/Node'
",
        );
        let (spec, _) = resolve_yaml(&yaml);
        let node_id = spec
            .named
            .iter()
            .copied()
            .find(|id| spec.arena[*id].name == "node")
            .expect("node");
        let node = &spec.arena[node_id];
        let parent = node.properties.iter().find(|p| p.name == "parent").expect("parent");
        assert_eq!(parent.property_type, node_id);
        let children = node
            .properties
            .iter()
            .find(|p| p.name == "children")
            .expect("children");
        assert_eq!(spec.arena[children.property_type].element, Some(node_id));
    }

    #[test]
    fn test_alias_cycle_degrades_to_any() {
        let yaml = with_schemas(
            "    A:
      $ref: '#/components/schemas/B'
    B:
      $ref: '#/components/schemas/A'
",
        );
        let (spec, sink) = resolve_yaml(&yaml);
        assert!(spec.find("a").is_some());
        assert!(spec.find("b").is_some());
        assert!(!sink.messages(Severity::Warn).is_empty());
    }

    #[test]
    fn test_unknown_reference_becomes_any() {
        let yaml = with_schemas(
            "    Pet:
      type: object
      properties:
        owner:
          $ref: '#/components/schemas/Missing'
",
        );
        let (spec, sink) = resolve_yaml(&yaml);
        let pet = spec.find("pet").expect("pet");
        let owner = &pet.properties[0];
        assert!(spec.arena[spec.arena.unalias(owner.property_type)].is_any());
        assert!(sink
            .messages(Severity::Warn)
            .iter()
            .any(|message| message.contains("Missing")));
    }

    #[test]
    fn test_root_reference_is_aliased() {
        let yaml = with_schemas(
            "    Animal:
      $ref: '#/components/schemas/Pet'
    Pet:
      type: object
      properties:
        name:
          type: string
    Tags:
      type: array
      items:
        type: string
",
        );
        let (spec, _) = resolve_yaml(&yaml);
        let animal = spec.find("animal").expect("animal");
        assert!(animal.is_alias());
        assert_eq!(spec.arena[animal.element.expect("target")].name, "pet");

        let tags = spec.find("tags").expect("tags");
        assert!(tags.is_alias());
        let array = &spec.arena[tags.element.expect("array")];
        assert!(array.is_array());
        assert_eq!(spec.arena[array.element.expect("item")].name, "tag");
    }

    #[test]
    fn test_additional_properties_are_embedded() {
        let yaml = with_schemas(
            "    Labels:
      type: object
      properties:
        name:
          type: string
      additionalProperties:
        type: string
",
        );
        let (spec, _) = resolve_yaml(&yaml);
        let labels = spec.find("labels").expect("labels");
        let extra = labels
            .properties
            .iter()
            .find(|p| p.is_embedded)
            .expect("embedded property");
        assert_eq!(extra.name, "additional_properties");
        let map = &spec.arena[extra.property_type];
        assert!(map.is_map());
        assert_eq!(
            spec.arena[map.element.expect("value")].primitive_kind(),
            Some(PrimitiveKind::String)
        );
    }

    #[test]
    fn test_all_of_is_flattened() {
        let yaml = with_schemas(
            "    Base:
      type: object
      required: [id]
      properties:
        id:
          type: integer
    Dog:
      allOf:
        - $ref: '#/components/schemas/Base'
        - type: object
          properties:
            bark:
              type: boolean
",
        );
        let (spec, _) = resolve_yaml(&yaml);
        let dog = spec.find("dog").expect("dog");
        assert!(dog.is_class());
        let names: Vec<&str> = dog.properties.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["id", "bark"]);
        assert!(dog.properties[0].required);
    }

    #[test]
    fn test_one_of_degrades_with_warning() {
        let yaml = with_schemas(
            "    Shape:
      oneOf:
        - type: string
        - type: integer
",
        );
        let (spec, sink) = resolve_yaml(&yaml);
        let shape = spec.find("shape").expect("shape");
        assert!(spec.arena[spec.arena.unalias(shape.element.expect("target"))].is_any());
        assert_eq!(sink.messages(Severity::Warn).len(), 1);
    }

    #[test]
    fn test_numeric_constraints() {
        let yaml = with_schemas(
            "    Percent:
      type: integer
      minimum: 0
      maximum: 100
      exclusiveMaximum: true
      enum: [0, 50, 100]
",
        );
        let (spec, _) = resolve_yaml(&yaml);
        let percent = spec.find("percent").expect("percent");
        let primitive = &spec.arena[percent.element.expect("primitive")];
        assert_eq!(primitive.primitive_kind(), Some(PrimitiveKind::Int32));
        assert_eq!(primitive.constraints.min, Some(0.0));
        assert_eq!(primitive.constraints.max, Some(100.0));
        assert!(primitive.constraints.max_exclusive);
        assert_eq!(primitive.constraints.allowed_values.len(), 3);
    }
}
