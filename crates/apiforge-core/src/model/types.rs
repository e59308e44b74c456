//! Resolved schema types and the arena that owns them

use std::cmp::Ordering;
use std::fmt;
use std::ops::Index;

use serde_json::Value as JsonValue;

/// Index of a [`TypeDescriptor`] inside a [`TypeArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeId(usize);

impl TypeId {
    pub fn index(&self) -> usize {
        self.0
    }

    #[cfg(test)]
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index)
    }
}

/// Canonical primitive kinds after type+format normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    String,
    Date,
    DateTime,
    Uuid,
    Password,
    Byte,
    Binary,
    Int32,
    Int64,
    Float32,
    Float64,
    Boolean,
}

impl PrimitiveKind {
    /// Map an OpenAPI `type` + `format` pair to its canonical kind.
    ///
    /// Returns `None` for types that are not primitive (objects, arrays and
    /// unknown type names).
    pub fn from_type_and_format(typ: &str, format: Option<&str>) -> Option<Self> {
        let kind = match (typ, format.unwrap_or_default()) {
            ("string", "date") => Self::Date,
            ("string", "date-time") => Self::DateTime,
            ("string", "uuid") => Self::Uuid,
            ("string", "password") => Self::Password,
            ("string", "byte") => Self::Byte,
            ("string", "binary") => Self::Binary,
            ("string", _) => Self::String,
            ("integer", "int64") => Self::Int64,
            ("integer", _) => Self::Int32,
            ("number", "double") | ("number", "float64") => Self::Float64,
            ("number", _) => Self::Float32,
            ("boolean", _) => Self::Boolean,
            _ => return None,
        };
        Some(kind)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Date => "date",
            Self::DateTime => "date-time",
            Self::Uuid => "uuid",
            Self::Password => "password",
            Self::Byte => "byte",
            Self::Binary => "binary",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Boolean => "boolean",
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Self::Int32 | Self::Int64)
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }

    pub fn is_textual(&self) -> bool {
        matches!(
            self,
            Self::String | Self::Date | Self::DateTime | Self::Uuid | Self::Password | Self::Byte
        )
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The shape of a resolved type. Exactly one applies to every descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Any,
    Primitive(PrimitiveKind),
    Enum,
    Array,
    Class,
    Map,
    Alias,
}

/// Validation constraints collected from a schema node.
///
/// String and array lengths are stored in `min`/`max`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constraints {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub min_exclusive: bool,
    pub max_exclusive: bool,
    pub multiple_of: Option<f64>,
    pub pattern: Option<String>,
    pub unique: bool,
    pub allowed_values: Vec<JsonValue>,
}

impl Constraints {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Validator rules for a value of the given kind, e.g. `length(min = 1)`.
    ///
    /// Rules that validators cannot express as a simple attribute (pattern,
    /// multiple-of, uniqueness) are reported by [`Constraints::notes`].
    pub fn validation_rules(&self, kind: TypeKind) -> Vec<String> {
        let mut rules = Vec::new();
        match kind {
            TypeKind::Primitive(primitive) if primitive.is_integer() || primitive.is_float() => {
                let format_bound = |bound: f64| {
                    if primitive.is_float() {
                        format!("{:?}", bound)
                    } else {
                        format!("{}", bound as i64)
                    }
                };
                let mut parts = Vec::new();
                if let Some(min) = self.min {
                    let arg = if self.min_exclusive { "exclusive_min" } else { "min" };
                    parts.push(format!("{} = {}", arg, format_bound(min)));
                }
                if let Some(max) = self.max {
                    let arg = if self.max_exclusive { "exclusive_max" } else { "max" };
                    parts.push(format!("{} = {}", arg, format_bound(max)));
                }
                if !parts.is_empty() {
                    rules.push(format!("range({})", parts.join(", ")));
                }
            }
            TypeKind::Primitive(primitive) if primitive.is_textual() => {
                if let Some(rule) = self.length_rule() {
                    rules.push(rule);
                }
            }
            TypeKind::Array => {
                if let Some(rule) = self.length_rule() {
                    rules.push(rule);
                }
            }
            _ => {}
        }
        rules
    }

    /// Human-readable notes for constraints without a validator rule.
    pub fn notes(&self) -> Vec<String> {
        let mut notes = Vec::new();
        if let Some(pattern) = &self.pattern {
            notes.push(format!("Must match `{}`.", pattern));
        }
        if let Some(multiple_of) = self.multiple_of {
            notes.push(format!("Must be a multiple of {}.", multiple_of));
        }
        if self.unique {
            notes.push("Items must be unique.".to_string());
        }
        notes
    }

    fn length_rule(&self) -> Option<String> {
        let mut parts = Vec::new();
        if let Some(min) = self.min {
            parts.push(format!("min = {}", min as u64));
        }
        if let Some(max) = self.max {
            parts.push(format!("max = {}", max as u64));
        }
        if parts.is_empty() {
            None
        } else {
            Some(format!("length({})", parts.join(", ")))
        }
    }
}

/// A property of a class descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDescriptor {
    pub name: String,
    pub description: Option<String>,
    pub required: bool,
    pub read_only: bool,
    pub write_only: bool,
    pub is_embedded: bool,
    pub property_type: TypeId,
}

impl PropertyDescriptor {
    pub fn new(name: impl Into<String>, property_type: TypeId) -> Self {
        Self {
            name: name.into(),
            description: None,
            required: false,
            read_only: false,
            write_only: false,
            is_embedded: false,
            property_type,
        }
    }

    /// Whether the property is an identifier (`id` or `*_id`).
    pub fn is_identifier(&self) -> bool {
        self.name == "id" || self.name.ends_with("_id")
    }

    /// Identifiers first, then alphabetical by name.
    pub fn ordering(&self, other: &Self) -> Ordering {
        other
            .is_identifier()
            .cmp(&self.is_identifier())
            .then_with(|| self.name.cmp(&other.name))
    }
}

/// Sort properties into their deterministic output order.
pub fn sort_properties(properties: &mut [PropertyDescriptor]) {
    properties.sort_by(|a, b| a.ordering(b));
}

/// A resolved schema node.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    pub name: String,
    pub description: Option<String>,
    pub kind: TypeKind,
    pub nullable: bool,
    /// Array item, alias target or map value.
    pub element: Option<TypeId>,
    /// Map key.
    pub key: Option<TypeId>,
    pub default: Option<JsonValue>,
    pub constraints: Constraints,
    pub properties: Vec<PropertyDescriptor>,
}

impl TypeDescriptor {
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            description: None,
            kind,
            nullable: false,
            element: None,
            key: None,
            default: None,
            constraints: Constraints::default(),
            properties: Vec::new(),
        }
    }

    pub fn any(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Any)
    }

    pub fn primitive(name: impl Into<String>, kind: PrimitiveKind) -> Self {
        Self::new(name, TypeKind::Primitive(kind))
    }

    pub fn alias(name: impl Into<String>, element: TypeId) -> Self {
        let mut descriptor = Self::new(name, TypeKind::Alias);
        descriptor.element = Some(element);
        descriptor
    }

    pub fn array(name: impl Into<String>, element: TypeId) -> Self {
        let mut descriptor = Self::new(name, TypeKind::Array);
        descriptor.element = Some(element);
        descriptor
    }

    pub fn map(name: impl Into<String>, key: TypeId, value: TypeId) -> Self {
        let mut descriptor = Self::new(name, TypeKind::Map);
        descriptor.key = Some(key);
        descriptor.element = Some(value);
        descriptor
    }

    pub fn is_any(&self) -> bool {
        self.kind == TypeKind::Any
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self.kind, TypeKind::Primitive(_))
    }

    pub fn is_enum(&self) -> bool {
        self.kind == TypeKind::Enum
    }

    pub fn is_array(&self) -> bool {
        self.kind == TypeKind::Array
    }

    pub fn is_class(&self) -> bool {
        self.kind == TypeKind::Class
    }

    pub fn is_map(&self) -> bool {
        self.kind == TypeKind::Map
    }

    pub fn is_alias(&self) -> bool {
        self.kind == TypeKind::Alias
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match self.kind {
            TypeKind::Primitive(kind) => Some(kind),
            _ => None,
        }
    }
}

/// Owner of every descriptor produced by one resolution pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeArena {
    nodes: Vec<TypeDescriptor>,
}

impl TypeArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, descriptor: TypeDescriptor) -> TypeId {
        self.nodes.push(descriptor);
        TypeId(self.nodes.len() - 1)
    }

    /// Allocate a slot before its contents are known, so that recursive
    /// references can point at it while it is being resolved.
    pub fn reserve(&mut self, name: impl Into<String>) -> TypeId {
        self.push(TypeDescriptor::any(name))
    }

    /// Fill a slot obtained from [`TypeArena::reserve`].
    pub fn fill(&mut self, id: TypeId, descriptor: TypeDescriptor) {
        if let Some(slot) = self.nodes.get_mut(id.0) {
            *slot = descriptor;
        }
    }

    pub fn get(&self, id: TypeId) -> Option<&TypeDescriptor> {
        self.nodes.get(id.0)
    }

    /// Follow alias links down to the first non-alias descriptor.
    pub fn unalias(&self, mut id: TypeId) -> TypeId {
        // bounded walk: alias chains cannot be longer than the arena
        for _ in 0..self.nodes.len() {
            match self.get(id) {
                Some(descriptor) if descriptor.is_alias() => match descriptor.element {
                    Some(element) => id = element,
                    None => break,
                },
                _ => break,
            }
        }
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TypeId, &TypeDescriptor)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, descriptor)| (TypeId(index), descriptor))
    }
}

impl Index<TypeId> for TypeArena {
    type Output = TypeDescriptor;

    fn index(&self, id: TypeId) -> &Self::Output {
        &self.nodes[id.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_primitive_kind_mapping() {
        use PrimitiveKind as P;
        let cases = [
            ("string", Some("date-time"), P::DateTime),
            ("string", Some("uuid"), P::Uuid),
            ("string", Some("email"), P::String),
            ("string", None, P::String),
            ("integer", Some("int64"), P::Int64),
            ("integer", Some("int32"), P::Int32),
            ("integer", None, P::Int32),
            ("number", Some("double"), P::Float64),
            ("number", Some("float64"), P::Float64),
            ("number", Some("float"), P::Float32),
            ("number", None, P::Float32),
            ("boolean", None, P::Boolean),
        ];
        for (typ, format, expected) in cases {
            assert_eq!(
                PrimitiveKind::from_type_and_format(typ, format),
                Some(expected),
                "{} {:?}",
                typ,
                format
            );
        }
        assert_eq!(PrimitiveKind::from_type_and_format("object", None), None);
        assert_eq!(PrimitiveKind::DateTime.to_string(), "date-time");
    }

    #[test]
    fn test_property_ordering_puts_identifiers_first() {
        let id = TypeId(0);
        let mut properties = vec![
            PropertyDescriptor::new("name", id),
            PropertyDescriptor::new("balance", id),
            PropertyDescriptor::new("account_id", id),
            PropertyDescriptor::new("id", id),
            PropertyDescriptor::new("ownerId", id),
        ];
        sort_properties(&mut properties);
        let names: Vec<&str> = properties.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["account_id", "id", "balance", "name", "ownerId"]
        );
    }

    #[test]
    fn test_validation_rules() {
        let numeric = Constraints {
            min: Some(0.0),
            max: Some(100.0),
            max_exclusive: true,
            ..Default::default()
        };
        assert_eq!(
            numeric.validation_rules(TypeKind::Primitive(PrimitiveKind::Int32)),
            vec!["range(min = 0, exclusive_max = 100)".to_string()]
        );
        assert_eq!(
            numeric.validation_rules(TypeKind::Primitive(PrimitiveKind::Float64)),
            vec!["range(min = 0.0, exclusive_max = 100.0)".to_string()]
        );

        let text = Constraints {
            min: Some(1.0),
            max: Some(64.0),
            pattern: Some("^[a-z]+$".to_string()),
            ..Default::default()
        };
        assert_eq!(
            text.validation_rules(TypeKind::Primitive(PrimitiveKind::String)),
            vec!["length(min = 1, max = 64)".to_string()]
        );
        assert_eq!(text.notes(), vec!["Must match `^[a-z]+$`.".to_string()]);
        assert!(text.validation_rules(TypeKind::Class).is_empty());
    }

    #[test]
    fn test_arena_reserve_and_unalias() {
        let mut arena = TypeArena::new();
        let class = arena.reserve("pet");
        let alias = arena.push(TypeDescriptor::alias("animal", class));
        let outer = arena.push(TypeDescriptor::alias("creature", alias));
        arena.fill(class, TypeDescriptor::new("pet", TypeKind::Class));

        assert!(arena[class].is_class());
        assert_eq!(arena.unalias(outer), class);
        assert_eq!(arena.len(), 3);

        let mut enum_type = TypeDescriptor::new("status", TypeKind::Enum);
        enum_type.constraints.allowed_values = vec![json!("a"), json!("b")];
        let id = arena.push(enum_type);
        assert!(arena[id].is_enum());
        assert!(!arena[id].constraints.is_empty());
    }
}
