//! The schema types module

use std::collections::{BTreeSet, HashSet};

use crate::document::{Document, Record};
use crate::model::{
    PrimitiveKind, PropertyDescriptor, SpecDescriptor, TypeDescriptor, TypeId, TypeKind,
};
use crate::report::Reporter;
use crate::utils::{to_field_ident, to_type_ident, unraw};

const RECORD_DERIVES: &str = "Debug, Clone, Default, PartialEq, Serialize, Deserialize";
const ENUM_DERIVES: &str =
    "Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize";

/// Maps descriptors to Rust type expressions.
pub struct TypeNames<'s> {
    spec: &'s SpecDescriptor,
    named: HashSet<TypeId>,
}

impl<'s> TypeNames<'s> {
    pub fn new(spec: &'s SpecDescriptor) -> Self {
        Self {
            spec,
            named: spec.named.iter().copied().collect(),
        }
    }

    pub fn spec(&self) -> &'s SpecDescriptor {
        self.spec
    }

    pub fn is_named(&self, id: TypeId) -> bool {
        self.named.contains(&id)
    }

    /// Identifier of a named type.
    pub fn ident(&self, id: TypeId) -> String {
        to_type_ident(&self.spec.arena[id].name)
    }

    /// The Rust type expression for `id`. Named types are referred to by
    /// identifier; `used` collects the identifiers and imports needed.
    pub fn rust_type(&self, id: TypeId, used: &mut Used) -> String {
        let descriptor = &self.spec.arena[id];
        if self.is_named(id) {
            used.types.insert(self.ident(id));
            return self.ident(id);
        }
        match descriptor.kind {
            TypeKind::Any => "serde_json::Value".to_string(),
            TypeKind::Primitive(kind) => primitive_type(kind).to_string(),
            TypeKind::Array => match descriptor.element {
                Some(element) => format!("Vec<{}>", self.rust_type(element, used)),
                None => "Vec<serde_json::Value>".to_string(),
            },
            TypeKind::Map => {
                used.imports.insert("std::collections::HashMap".to_string());
                let value = match descriptor.element {
                    Some(value) => self.rust_type(value, used),
                    None => "serde_json::Value".to_string(),
                };
                format!("HashMap<String, {}>", value)
            }
            TypeKind::Alias => match descriptor.element {
                Some(element) => self.rust_type(element, used),
                None => "serde_json::Value".to_string(),
            },
            // classes and enums are always named; reaching here means an
            // unnamed reserved slot, which resolves like any
            TypeKind::Class | TypeKind::Enum => "serde_json::Value".to_string(),
        }
    }

    /// The descriptor behind any alias chain.
    pub fn target(&self, id: TypeId) -> &'s TypeDescriptor {
        &self.spec.arena[self.spec.arena.unalias(id)]
    }
}

/// Type identifiers and imports referenced while naming types.
#[derive(Debug, Default)]
pub struct Used {
    pub types: BTreeSet<String>,
    pub imports: BTreeSet<String>,
}

pub fn primitive_type(kind: PrimitiveKind) -> &'static str {
    match kind {
        PrimitiveKind::Int32 => "i32",
        PrimitiveKind::Int64 => "i64",
        PrimitiveKind::Float32 => "f32",
        PrimitiveKind::Float64 => "f64",
        PrimitiveKind::Boolean => "bool",
        PrimitiveKind::Binary => "Vec<u8>",
        PrimitiveKind::String
        | PrimitiveKind::Date
        | PrimitiveKind::DateTime
        | PrimitiveKind::Uuid
        | PrimitiveKind::Password
        | PrimitiveKind::Byte => "String",
    }
}

/// Builds the types document: one declaration per named type.
pub struct TypesGenerator<'s> {
    names: &'s TypeNames<'s>,
    reporter: Reporter,
}

impl<'s> TypesGenerator<'s> {
    pub fn new(names: &'s TypeNames<'s>, reporter: &Reporter) -> Self {
        Self {
            names,
            reporter: reporter.nested(),
        }
    }

    pub fn document(&self, banner: &[String]) -> Document {
        let spec = self.names.spec();
        let mut document = Document::new();
        for line in banner {
            document.add_doc(line.clone());
        }
        document.add_import("serde::{Deserialize, Serialize}");

        let mut used = Used::default();
        for (id, descriptor) in spec.types() {
            match descriptor.kind {
                TypeKind::Class => self.add_record(&mut document, id, descriptor, &mut used),
                TypeKind::Enum => self.add_enum(&mut document, id, descriptor),
                TypeKind::Alias => self.add_alias(&mut document, id, descriptor, &mut used),
                _ => {
                    self.reporter.debug(format!(
                        "Skipping '{}': {:?} types are not declared",
                        descriptor.name, descriptor.kind
                    ));
                    continue;
                }
            }
            self.reporter.success(self.names.ident(id));
        }
        for import in used.imports {
            document.add_import(import);
        }
        document
    }

    fn add_record(
        &self,
        document: &mut Document,
        id: TypeId,
        descriptor: &TypeDescriptor,
        used: &mut Used,
    ) {
        let name = self.names.ident(id);
        let record = document.add_record_type(&name);
        push_docs(&mut record.decorations.docs, descriptor.description.as_deref());

        let mut validated = false;
        for property in &descriptor.properties {
            validated |= self.add_property(record, id, property, used);
        }

        let derives = if validated {
            used.imports.insert("validator::Validate".to_string());
            format!("#[derive({}, Validate)]", RECORD_DERIVES)
        } else {
            format!("#[derive({})]", RECORD_DERIVES)
        };
        record.decorations.attribute(derives);
    }

    /// Returns whether the field carries validation rules.
    fn add_property(
        &self,
        record: &mut Record,
        owner: TypeId,
        property: &PropertyDescriptor,
        used: &mut Used,
    ) -> bool {
        let spec = self.names.spec();
        let target_id = spec.arena.unalias(property.property_type);
        let target = &spec.arena[target_id];

        let mut ty = self.names.rust_type(property.property_type, used);
        if self.closes_cycle(owner, target_id) {
            ty = format!("Box<{}>", ty);
        }
        let optional = !property.is_embedded && (!property.required || target.nullable);
        if optional {
            ty = format!("Option<{}>", ty);
        }

        let ident = to_field_ident(&property.name);
        let field = record.add_field(&ident, &ty);
        push_docs(&mut field.decorations.docs, property.description.as_deref());
        let notes = target.constraints.notes();
        if !notes.is_empty() {
            if !field.decorations.docs.is_empty() {
                field.decorations.docs.push(String::new());
            }
            field.decorations.docs.extend(notes);
        }

        let mut serde = Vec::new();
        if property.is_embedded {
            serde.push("flatten".to_string());
        } else if unraw(&ident) != property.name {
            serde.push(format!("rename = {:?}", property.name));
        }
        if optional {
            serde.push("default".to_string());
        }
        if property.write_only {
            serde.push("skip_serializing".to_string());
        } else if optional {
            serde.push("skip_serializing_if = \"Option::is_none\"".to_string());
        }
        if property.read_only {
            serde.push("skip_deserializing".to_string());
        }
        if !serde.is_empty() {
            field
                .decorations
                .attribute(format!("#[serde({})]", serde.join(", ")));
        }

        let rules = target.constraints.validation_rules(target.kind);
        if rules.is_empty() {
            return false;
        }
        field
            .decorations
            .attribute(format!("#[validate({})]", rules.join(", ")));
        true
    }

    /// Whether a field of `owner` holding `target` leads back to `owner`
    /// through fields stored inline, making the record infinitely sized.
    /// `Vec` and `HashMap` fields live on the heap and break the chain.
    fn closes_cycle(&self, owner: TypeId, target: TypeId) -> bool {
        let arena = &self.names.spec().arena;
        let mut seen = HashSet::new();
        let mut stack = vec![target];
        while let Some(id) = stack.pop() {
            if id == owner {
                return true;
            }
            if !seen.insert(id) || !arena[id].is_class() {
                continue;
            }
            stack.extend(
                arena[id]
                    .properties
                    .iter()
                    .map(|property| arena.unalias(property.property_type)),
            );
        }
        false
    }

    fn add_enum(&self, document: &mut Document, id: TypeId, descriptor: &TypeDescriptor) {
        let enumeration = document.add_enum_type(&self.names.ident(id));
        push_docs(
            &mut enumeration.decorations.docs,
            descriptor.description.as_deref(),
        );
        enumeration
            .decorations
            .attribute(format!("#[derive({})]", ENUM_DERIVES));

        let mut seen = HashSet::new();
        for (index, value) in descriptor.constraints.allowed_values.iter().enumerate() {
            let Some(value) = value.as_str() else {
                continue;
            };
            let mut variant_name = to_type_ident(value);
            if !seen.insert(variant_name.clone()) {
                variant_name = format!("{}{}", variant_name, index);
                seen.insert(variant_name.clone());
            }
            let variant = enumeration.add_variant(&variant_name);
            if index == 0 {
                variant.decorations.attribute("#[default]");
            }
            variant
                .decorations
                .attribute(format!("#[serde(rename = {:?})]", value));
        }
    }

    fn add_alias(
        &self,
        document: &mut Document,
        id: TypeId,
        descriptor: &TypeDescriptor,
        used: &mut Used,
    ) {
        let name = self.names.ident(id);
        let Some(element) = descriptor.element else {
            document.add_alias_type(&name, "serde_json::Value");
            return;
        };
        let target = &self.names.spec().arena[element];
        let docs = if target.is_array() && !self.names.is_named(element) {
            let item = match target.element {
                Some(item) => self.names.rust_type(item, used),
                None => "serde_json::Value".to_string(),
            };
            &mut document.add_list_type(&name, &item).decorations.docs
        } else {
            let ty = self.names.rust_type(element, used);
            &mut document.add_alias_type(&name, &ty).decorations.docs
        };
        push_docs(docs, descriptor.description.as_deref());
    }
}

/// Split a description into doc lines.
pub(crate) fn push_docs(docs: &mut Vec<String>, description: Option<&str>) {
    if let Some(description) = description.map(str::trim).filter(|d| !d.is_empty()) {
        docs.extend(description.lines().map(|line| line.trim_end().to_string()));
    }
}
