//! Schema node resolution

use openapiv3::{
    AdditionalProperties, IntegerFormat, NumberFormat, ReferenceOr, Schema, SchemaKind,
    StringFormat, Type, VariantOrUnknownOrEmpty,
};
use serde_json::Value as JsonValue;

use super::{Context, Resolver, SchemaNode};
use crate::model::{
    sort_properties, Constraints, PrimitiveKind, PropertyDescriptor, TypeDescriptor, TypeId,
    TypeKind,
};

/// Name of the property that carries `additionalProperties`.
pub const ADDITIONAL_PROPERTIES: &str = "additional_properties";

/// Deepest `allOf` nesting that is flattened.
const MAX_ALL_OF_DEPTH: usize = 16;

/// The parts of an object-like schema the resolver needs.
#[derive(Default)]
struct ObjectShape<'a> {
    properties: Vec<(&'a str, SchemaNode<'a>)>,
    required: Vec<&'a str>,
    additional: Option<&'a AdditionalProperties>,
}

impl<'a> ObjectShape<'a> {
    fn from_parts<I>(
        properties: I,
        required: &'a [String],
        additional: Option<&'a AdditionalProperties>,
    ) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a ReferenceOr<Box<Schema>>)>,
    {
        let mut shape = Self::default();
        shape.extend(properties, required, additional);
        shape
    }

    /// Later members win on duplicate property names.
    fn extend<I>(
        &mut self,
        properties: I,
        required: &'a [String],
        additional: Option<&'a AdditionalProperties>,
    ) where
        I: IntoIterator<Item = (&'a String, &'a ReferenceOr<Box<Schema>>)>,
    {
        for (name, node) in properties {
            let node = SchemaNode::from(node);
            match self
                .properties
                .iter_mut()
                .find(|entry| entry.0 == name.as_str())
            {
                Some(entry) => entry.1 = node,
                None => self.properties.push((name.as_str(), node)),
            }
        }
        self.required.extend(required.iter().map(String::as_str));
        if self.additional.is_none() {
            self.additional = additional;
        }
    }

    fn is_required(&self, name: &str) -> bool {
        self.required
            .iter()
            .any(|required| required.eq_ignore_ascii_case(name))
    }
}

impl<'a> Resolver<'a> {
    pub(super) fn resolve_schema(&mut self, ctx: &Context<'_, 'a>, schema: &'a Schema) -> TypeId {
        match &schema.schema_kind {
            SchemaKind::Type(Type::Object(object)) => {
                let shape = ObjectShape::from_parts(
                    &object.properties,
                    &object.required,
                    object.additional_properties.as_ref(),
                );
                self.resolve_object(ctx, schema, shape)
            }
            SchemaKind::Type(Type::Array(array)) => {
                let constraints = Constraints {
                    min: array.min_items.map(|n| n as f64),
                    max: array.max_items.map(|n| n as f64),
                    unique: array.unique_items,
                    ..Default::default()
                };
                let items = array.items.as_ref().map(SchemaNode::from);
                self.resolve_array(ctx, schema, items, constraints)
            }
            SchemaKind::Type(Type::String(string)) => {
                let mut nullable_value = false;
                let values: Vec<JsonValue> = string
                    .enumeration
                    .iter()
                    .filter_map(|value| {
                        if value.is_none() {
                            nullable_value = true;
                        }
                        value.clone().map(JsonValue::String)
                    })
                    .collect();
                if !values.is_empty() {
                    return self.resolve_enum(ctx, schema, values, nullable_value);
                }
                let format = string_format(&string.format);
                let kind = PrimitiveKind::from_type_and_format("string", format.as_deref())
                    .unwrap_or(PrimitiveKind::String);
                let constraints = Constraints {
                    min: string.min_length.map(|n| n as f64),
                    max: string.max_length.map(|n| n as f64),
                    pattern: string.pattern.clone(),
                    ..Default::default()
                };
                self.resolve_primitive(ctx, schema, kind, constraints)
            }
            SchemaKind::Type(Type::Integer(integer)) => {
                let format = integer_format(&integer.format);
                let kind = PrimitiveKind::from_type_and_format("integer", format.as_deref())
                    .unwrap_or(PrimitiveKind::Int32);
                let constraints = Constraints {
                    min: integer.minimum.map(|n| n as f64),
                    max: integer.maximum.map(|n| n as f64),
                    min_exclusive: integer.exclusive_minimum,
                    max_exclusive: integer.exclusive_maximum,
                    multiple_of: integer.multiple_of.map(|n| n as f64),
                    allowed_values: integer
                        .enumeration
                        .iter()
                        .flatten()
                        .map(|value| JsonValue::from(*value))
                        .collect(),
                    ..Default::default()
                };
                self.resolve_primitive(ctx, schema, kind, constraints)
            }
            SchemaKind::Type(Type::Number(number)) => {
                let format = number_format(&number.format);
                let kind = PrimitiveKind::from_type_and_format("number", format.as_deref())
                    .unwrap_or(PrimitiveKind::Float32);
                let constraints = Constraints {
                    min: number.minimum,
                    max: number.maximum,
                    min_exclusive: number.exclusive_minimum,
                    max_exclusive: number.exclusive_maximum,
                    multiple_of: number.multiple_of,
                    allowed_values: number
                        .enumeration
                        .iter()
                        .flatten()
                        .map(|value| JsonValue::from(*value))
                        .collect(),
                    ..Default::default()
                };
                self.resolve_primitive(ctx, schema, kind, constraints)
            }
            SchemaKind::Type(Type::Boolean(_)) => {
                self.resolve_primitive(ctx, schema, PrimitiveKind::Boolean, Constraints::default())
            }
            SchemaKind::AllOf { all_of } => {
                let mut shape = ObjectShape::default();
                self.flatten_all_of(all_of, &mut shape, 0);
                self.resolve_object(ctx, schema, shape)
            }
            SchemaKind::OneOf { .. } | SchemaKind::AnyOf { .. } | SchemaKind::Not { .. } => {
                self.reporter.warn(format!(
                    "Composition in '{}' is not supported, using any",
                    ctx.name()
                ));
                let descriptor = self.describe(ctx, schema, TypeKind::Any);
                let any = self.arena.push(descriptor);
                self.name_at_root(ctx, any, Some(schema))
            }
            SchemaKind::Any(any) => {
                if let Some(items) = &any.items {
                    let constraints = Constraints {
                        min: any.min_items.map(|n| n as f64),
                        max: any.max_items.map(|n| n as f64),
                        unique: any.unique_items.unwrap_or(false),
                        ..Default::default()
                    };
                    return self.resolve_array(ctx, schema, Some(items.into()), constraints);
                }
                if !any.all_of.is_empty() {
                    let mut shape = ObjectShape::default();
                    self.flatten_all_of(&any.all_of, &mut shape, 0);
                    shape.extend(
                        &any.properties,
                        &any.required,
                        any.additional_properties.as_ref(),
                    );
                    return self.resolve_object(ctx, schema, shape);
                }
                let strings: Vec<JsonValue> = any
                    .enumeration
                    .iter()
                    .filter(|value| value.is_string())
                    .cloned()
                    .collect();
                if !strings.is_empty() && strings.len() == any.enumeration.len() {
                    return self.resolve_enum(ctx, schema, strings, false);
                }
                let primitive = any
                    .typ
                    .as_deref()
                    .and_then(|typ| PrimitiveKind::from_type_and_format(typ, any.format.as_deref()));
                if let Some(kind) = primitive {
                    let constraints = Constraints {
                        allowed_values: any.enumeration.clone(),
                        ..Default::default()
                    };
                    return self.resolve_primitive(ctx, schema, kind, constraints);
                }
                let shape = ObjectShape::from_parts(
                    &any.properties,
                    &any.required,
                    any.additional_properties.as_ref(),
                );
                self.resolve_object(ctx, schema, shape)
            }
        }
    }

    /// A descriptor carrying the schema-level metadata shared by every kind.
    fn describe(&self, ctx: &Context<'_, 'a>, schema: &Schema, kind: TypeKind) -> TypeDescriptor {
        let mut descriptor = TypeDescriptor::new(ctx.name(), kind);
        descriptor.description = schema.schema_data.description.clone();
        descriptor.nullable = schema.schema_data.nullable;
        descriptor.default = schema.schema_data.default.clone();
        descriptor
    }

    fn resolve_primitive(
        &mut self,
        ctx: &Context<'_, 'a>,
        schema: &'a Schema,
        kind: PrimitiveKind,
        constraints: Constraints,
    ) -> TypeId {
        let mut descriptor = self.describe(ctx, schema, TypeKind::Primitive(kind));
        descriptor.constraints = constraints;
        let id = self.arena.push(descriptor);
        self.name_at_root(ctx, id, Some(schema))
    }

    /// String enums are always named, wherever they occur.
    fn resolve_enum(
        &mut self,
        ctx: &Context<'_, 'a>,
        schema: &'a Schema,
        values: Vec<JsonValue>,
        nullable_value: bool,
    ) -> TypeId {
        let mut descriptor = self.describe(ctx, schema, TypeKind::Enum);
        descriptor.nullable |= nullable_value;
        descriptor.constraints.allowed_values = values;
        let id = self.arena.push(descriptor);
        self.remember(ctx.name(), id, Some(schema));
        id
    }

    fn resolve_array(
        &mut self,
        ctx: &Context<'_, 'a>,
        schema: &'a Schema,
        items: Option<SchemaNode<'a>>,
        constraints: Constraints,
    ) -> TypeId {
        let element_ctx = ctx.element(items);
        let element = self.resolve(&element_ctx);
        let mut descriptor = self.describe(ctx, schema, TypeKind::Array);
        descriptor.element = Some(element);
        descriptor.constraints = constraints;
        let id = self.arena.push(descriptor);
        self.name_at_root(ctx, id, Some(schema))
    }

    /// Objects are always named. The slot is reserved and cached before any
    /// property resolves, so self-references land on it.
    fn resolve_object(
        &mut self,
        ctx: &Context<'_, 'a>,
        schema: &'a Schema,
        shape: ObjectShape<'a>,
    ) -> TypeId {
        if shape.properties.is_empty() && !has_additional(shape.additional) {
            let key = self
                .arena
                .push(TypeDescriptor::primitive(ctx.name(), PrimitiveKind::String));
            let value = self.arena.push(TypeDescriptor::any(ctx.name()));
            let mut map = self.describe(ctx, schema, TypeKind::Map);
            map.key = Some(key);
            map.element = Some(value);
            let id = self.arena.push(map);
            return self.name_at_root(ctx, id, Some(schema));
        }

        let id = self.arena.reserve(ctx.name());
        self.remember(ctx.name(), id, Some(schema));

        let mut members = shape.properties.clone();
        members.sort_by(|a, b| a.0.cmp(b.0));
        let mut properties = Vec::with_capacity(members.len() + 1);
        for (name, node) in members {
            let child = ctx.property(name, Some(node));
            let property_type = self.resolve(&child);
            let mut property = PropertyDescriptor::new(name, property_type);
            property.required = shape.is_required(name);
            if let SchemaNode::Item(inline) = node {
                property.description = inline.schema_data.description.clone();
                property.read_only = inline.schema_data.read_only;
                property.write_only = inline.schema_data.write_only;
            }
            properties.push(property);
        }

        if let Some(value) = self.additional_value(ctx, shape.additional) {
            let key = self
                .arena
                .push(TypeDescriptor::primitive(ctx.name(), PrimitiveKind::String));
            let map_name = format!("{}-{}", ctx.name(), "additional-properties");
            let map = self.arena.push(TypeDescriptor::map(map_name, key, value));
            let mut property = PropertyDescriptor::new(ADDITIONAL_PROPERTIES, map);
            property.required = true;
            property.is_embedded = true;
            properties.push(property);
        }

        sort_properties(&mut properties);
        let mut descriptor = self.describe(ctx, schema, TypeKind::Class);
        descriptor.properties = properties;
        self.arena.fill(id, descriptor);
        id
    }

    /// Value type of an `additionalProperties` map, if the object has one.
    fn additional_value(
        &mut self,
        ctx: &Context<'_, 'a>,
        additional: Option<&'a AdditionalProperties>,
    ) -> Option<TypeId> {
        match additional? {
            AdditionalProperties::Any(false) => None,
            AdditionalProperties::Any(true) => {
                Some(self.arena.push(TypeDescriptor::any(ctx.name())))
            }
            AdditionalProperties::Schema(schema) => {
                let child = ctx.property("value", Some(SchemaNode::from(schema.as_ref())));
                Some(self.resolve(&child))
            }
        }
    }

    /// Merge `allOf` members (following references) into one object shape.
    fn flatten_all_of(
        &self,
        members: &'a [ReferenceOr<Schema>],
        shape: &mut ObjectShape<'a>,
        depth: usize,
    ) {
        if depth > MAX_ALL_OF_DEPTH {
            return;
        }
        for member in members {
            let Some(schema) = self.follow_schema(SchemaNode::from(member)) else {
                self.reporter
                    .warn("Skipping unresolvable allOf member".to_string());
                continue;
            };
            match &schema.schema_kind {
                SchemaKind::Type(Type::Object(object)) => shape.extend(
                    &object.properties,
                    &object.required,
                    object.additional_properties.as_ref(),
                ),
                SchemaKind::AllOf { all_of } => self.flatten_all_of(all_of, shape, depth + 1),
                SchemaKind::Any(any) => {
                    self.flatten_all_of(&any.all_of, shape, depth + 1);
                    shape.extend(
                        &any.properties,
                        &any.required,
                        any.additional_properties.as_ref(),
                    );
                }
                _ => self
                    .reporter
                    .debug("Ignoring non-object allOf member".to_string()),
            }
        }
    }
}

fn has_additional(additional: Option<&AdditionalProperties>) -> bool {
    !matches!(additional, None | Some(AdditionalProperties::Any(false)))
}

fn string_format(format: &VariantOrUnknownOrEmpty<StringFormat>) -> Option<String> {
    match format {
        VariantOrUnknownOrEmpty::Item(format) => Some(
            match format {
                StringFormat::Date => "date",
                StringFormat::DateTime => "date-time",
                StringFormat::Password => "password",
                StringFormat::Byte => "byte",
                StringFormat::Binary => "binary",
            }
            .to_string(),
        ),
        VariantOrUnknownOrEmpty::Unknown(format) => Some(format.clone()),
        VariantOrUnknownOrEmpty::Empty => None,
    }
}

fn integer_format(format: &VariantOrUnknownOrEmpty<IntegerFormat>) -> Option<String> {
    match format {
        VariantOrUnknownOrEmpty::Item(IntegerFormat::Int32) => Some("int32".to_string()),
        VariantOrUnknownOrEmpty::Item(IntegerFormat::Int64) => Some("int64".to_string()),
        VariantOrUnknownOrEmpty::Unknown(format) => Some(format.clone()),
        VariantOrUnknownOrEmpty::Empty => None,
    }
}

fn number_format(format: &VariantOrUnknownOrEmpty<NumberFormat>) -> Option<String> {
    match format {
        VariantOrUnknownOrEmpty::Item(NumberFormat::Float) => Some("float".to_string()),
        VariantOrUnknownOrEmpty::Item(NumberFormat::Double) => Some("double".to_string()),
        VariantOrUnknownOrEmpty::Unknown(format) => Some(format.clone()),
        VariantOrUnknownOrEmpty::Empty => None,
    }
}
