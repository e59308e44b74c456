//! Structural form of a generated Rust source file.
//!
//! A [`Document`] is what generators build, what the merger reconciles and
//! what previous output is parsed back into. Builders tag every item they
//! create with a `generate` marker so that the merger can recognize it on the
//! next run; hand-written items carry `define` markers instead.
//!
//! ```
//! use apiforge_core::document::Document;
//!
//! let mut document = Document::new();
//! let pet = document.add_record_type("Pet");
//! pet.add_field("name", "String");
//!
//! let text = document.render();
//! assert!(text.contains("// generate pet\n"));
//! assert_eq!(Document::parse(&text).unwrap(), document);
//! ```

pub mod marker;
mod parse;
mod render;

use std::collections::BTreeSet;

use crate::utils::dasherize;

pub use marker::{normalize_key, Marker};

/// Comments, docs and attributes attached to an item, in rendering order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Decorations {
    pub markers: Vec<Marker>,
    /// Plain comment text, without the leading `//`
    pub comments: Vec<String>,
    /// Doc comment text, without the leading `///`
    pub docs: Vec<String>,
    /// Full attribute text, e.g. `#[derive(Debug)]`
    pub attributes: Vec<String>,
}

impl Decorations {
    pub fn generated(name: &str) -> Self {
        Self {
            markers: vec![Marker::generate(&dasherize(name))],
            ..Default::default()
        }
    }

    pub fn generate_key(&self) -> Option<&str> {
        self.markers.iter().find_map(|marker| match marker {
            Marker::Generate(key) => Some(key.as_str()),
            _ => None,
        })
    }

    pub fn define_key(&self) -> Option<&str> {
        self.markers.iter().find_map(|marker| match marker {
            Marker::Define(key) => Some(key.as_str()),
            _ => None,
        })
    }

    pub fn is_generated(&self) -> bool {
        self.generate_key().is_some()
    }

    pub fn is_defined(&self) -> bool {
        self.define_key().is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
            && self.comments.is_empty()
            && self.docs.is_empty()
            && self.attributes.is_empty()
    }

    /// Classify one comment line: markers, then docs, then plain comments.
    pub fn push_comment(&mut self, comment: &str) {
        if let Some(doc) = comment.strip_prefix("///") {
            self.docs.push(strip_one_space(doc).to_string());
        } else if let Some(marker) = Marker::parse(comment) {
            self.markers.push(marker);
        } else if let Some(text) = comment.strip_prefix("//") {
            self.comments.push(strip_one_space(text).to_string());
        } else {
            self.comments.push(comment.to_string());
        }
    }

    pub fn doc(&mut self, line: impl Into<String>) -> &mut Self {
        self.docs.push(line.into());
        self
    }

    pub fn attribute(&mut self, attribute: impl Into<String>) -> &mut Self {
        self.attributes.push(attribute.into());
        self
    }

    pub fn comment(&mut self, comment: impl Into<String>) -> &mut Self {
        self.comments.push(comment.into());
        self
    }
}

fn strip_one_space(text: &str) -> &str {
    text.strip_prefix(' ').unwrap_or(text)
}

/// A named struct field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub ty: String,
    pub visibility: String,
    pub decorations: Decorations,
}

/// A struct with named fields, plus the methods of its inherent `impl`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub name: String,
    pub visibility: String,
    pub decorations: Decorations,
    pub fields: Vec<Field>,
    pub methods: Vec<Function>,
}

impl Record {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visibility: "pub".to_string(),
            decorations: Decorations::default(),
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn add_field(&mut self, name: &str, ty: &str) -> &mut Field {
        self.fields.push(Field {
            name: name.to_string(),
            ty: ty.to_string(),
            visibility: "pub".to_string(),
            decorations: Decorations::generated(name),
        });
        let index = self.fields.len() - 1;
        &mut self.fields[index]
    }

    /// Methods are keyed `receiver:method`.
    pub fn add_method(&mut self, name: &str) -> &mut Function {
        let mut method = Function::new(name);
        method.decorations.markers = vec![Marker::generate(&format!(
            "{}:{}",
            dasherize(&self.name),
            dasherize(name)
        ))];
        self.methods.push(method);
        let index = self.methods.len() - 1;
        &mut self.methods[index]
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn method(&self, name: &str) -> Option<&Function> {
        self.methods.iter().find(|method| method.name == name)
    }
}

/// A fieldless enum variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    pub name: String,
    pub decorations: Decorations,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enumeration {
    pub name: String,
    pub visibility: String,
    pub decorations: Decorations,
    pub variants: Vec<Variant>,
}

impl Enumeration {
    pub fn add_variant(&mut self, name: &str) -> &mut Variant {
        self.variants.push(Variant {
            name: name.to_string(),
            decorations: Decorations::generated(name),
        });
        let index = self.variants.len() - 1;
        &mut self.variants[index]
    }
}

/// `type Name = Target;`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alias {
    pub name: String,
    pub visibility: String,
    pub decorations: Decorations,
    pub target: String,
}

/// `type Name = Vec<Element>;`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct List {
    pub name: String,
    pub visibility: String,
    pub decorations: Decorations,
    pub element: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constant {
    pub name: String,
    pub visibility: String,
    pub ty: String,
    pub value: String,
    pub decorations: Decorations,
}

/// A module holding nothing but constants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstantBlock {
    pub name: String,
    pub visibility: String,
    pub decorations: Decorations,
    pub constants: Vec<Constant>,
}

impl ConstantBlock {
    pub fn add_constant(&mut self, name: &str, ty: &str, value: &str) -> &mut Constant {
        self.constants.push(Constant {
            name: name.to_string(),
            visibility: "pub".to_string(),
            ty: ty.to_string(),
            value: value.to_string(),
            decorations: Decorations::generated(name),
        });
        let index = self.constants.len() - 1;
        &mut self.constants[index]
    }
}

/// One statement of a function body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// Source text, possibly spanning several lines, without body indentation
    Code(String),
    /// Comment text without the leading `//`
    Comment(String),
}

impl Statement {
    pub fn marker(&self) -> Option<Marker> {
        match self {
            Self::Comment(text) => Marker::parse(text),
            Self::Code(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub name: String,
    pub visibility: String,
    pub is_async: bool,
    pub params: Vec<String>,
    pub returns: Option<String>,
    pub body: Vec<Statement>,
    pub decorations: Decorations,
}

impl Function {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visibility: "pub".to_string(),
            is_async: false,
            params: Vec::new(),
            returns: None,
            body: Vec::new(),
            decorations: Decorations::default(),
        }
    }

    pub fn set_async(&mut self, is_async: bool) -> &mut Self {
        self.is_async = is_async;
        self
    }

    pub fn param(&mut self, param: impl Into<String>) -> &mut Self {
        self.params.push(param.into());
        self
    }

    pub fn returns(&mut self, ty: impl Into<String>) -> &mut Self {
        self.returns = Some(ty.into());
        self
    }

    pub fn code(&mut self, code: impl Into<String>) -> &mut Self {
        self.body.push(Statement::Code(code.into()));
        self
    }

    pub fn comment(&mut self, comment: impl Into<String>) -> &mut Self {
        self.body.push(Statement::Comment(comment.into()));
        self
    }

    pub fn block_start(&mut self) -> &mut Self {
        self.comment(Marker::BlockStart.to_string())
    }

    pub fn block_end(&mut self) -> &mut Self {
        self.comment(Marker::BlockEnd.to_string())
    }

    /// Indices of the first paired `define block start` / `define block end`.
    pub fn block_range(&self) -> Option<(usize, usize)> {
        let start = self
            .body
            .iter()
            .position(|statement| statement.marker() == Some(Marker::BlockStart))?;
        let end = self.body[start + 1..]
            .iter()
            .position(|statement| statement.marker() == Some(Marker::BlockEnd))?;
        Some((start, start + 1 + end))
    }
}

/// An item kept as source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verbatim {
    pub name: String,
    pub decorations: Decorations,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declaration {
    Record(Record),
    Enum(Enumeration),
    Alias(Alias),
    List(List),
    Constants(ConstantBlock),
    Function(Function),
    Verbatim(Verbatim),
}

impl Declaration {
    pub fn name(&self) -> &str {
        match self {
            Self::Record(item) => &item.name,
            Self::Enum(item) => &item.name,
            Self::Alias(item) => &item.name,
            Self::List(item) => &item.name,
            Self::Constants(item) => &item.name,
            Self::Function(item) => &item.name,
            Self::Verbatim(item) => &item.name,
        }
    }

    pub fn decorations(&self) -> &Decorations {
        match self {
            Self::Record(item) => &item.decorations,
            Self::Enum(item) => &item.decorations,
            Self::Alias(item) => &item.decorations,
            Self::List(item) => &item.decorations,
            Self::Constants(item) => &item.decorations,
            Self::Function(item) => &item.decorations,
            Self::Verbatim(item) => &item.decorations,
        }
    }

    pub fn decorations_mut(&mut self) -> &mut Decorations {
        match self {
            Self::Record(item) => &mut item.decorations,
            Self::Enum(item) => &mut item.decorations,
            Self::Alias(item) => &mut item.decorations,
            Self::List(item) => &mut item.decorations,
            Self::Constants(item) => &mut item.decorations,
            Self::Function(item) => &mut item.decorations,
            Self::Verbatim(item) => &mut item.decorations,
        }
    }

    pub fn generate_key(&self) -> Option<&str> {
        self.decorations().generate_key()
    }

    pub fn is_defined(&self) -> bool {
        self.decorations().is_defined()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    /// Module doc lines (`//!`)
    pub docs: Vec<String>,
    /// `use` paths, without `use` and `;`
    pub imports: BTreeSet<String>,
    pub declarations: Vec<Declaration>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_doc(&mut self, line: impl Into<String>) -> &mut Self {
        self.docs.push(line.into());
        self
    }

    pub fn add_import(&mut self, path: impl Into<String>) -> &mut Self {
        self.imports.insert(path.into());
        self
    }

    pub fn push(&mut self, declaration: Declaration) -> &mut Declaration {
        self.declarations.push(declaration);
        let index = self.declarations.len() - 1;
        &mut self.declarations[index]
    }

    pub fn add_record_type(&mut self, name: &str) -> &mut Record {
        let mut record = Record::new(name);
        record.decorations = Decorations::generated(name);
        match self.push(Declaration::Record(record)) {
            Declaration::Record(record) => record,
            _ => unreachable!("pushed a record"),
        }
    }

    pub fn add_enum_type(&mut self, name: &str) -> &mut Enumeration {
        let enumeration = Enumeration {
            name: name.to_string(),
            visibility: "pub".to_string(),
            decorations: Decorations::generated(name),
            variants: Vec::new(),
        };
        match self.push(Declaration::Enum(enumeration)) {
            Declaration::Enum(enumeration) => enumeration,
            _ => unreachable!("pushed an enum"),
        }
    }

    pub fn add_alias_type(&mut self, name: &str, target: &str) -> &mut Alias {
        let alias = Alias {
            name: name.to_string(),
            visibility: "pub".to_string(),
            decorations: Decorations::generated(name),
            target: target.to_string(),
        };
        match self.push(Declaration::Alias(alias)) {
            Declaration::Alias(alias) => alias,
            _ => unreachable!("pushed an alias"),
        }
    }

    pub fn add_list_type(&mut self, name: &str, element: &str) -> &mut List {
        let list = List {
            name: name.to_string(),
            visibility: "pub".to_string(),
            decorations: Decorations::generated(name),
            element: element.to_string(),
        };
        match self.push(Declaration::List(list)) {
            Declaration::List(list) => list,
            _ => unreachable!("pushed a list"),
        }
    }

    pub fn add_constant_block(&mut self, name: &str) -> &mut ConstantBlock {
        let block = ConstantBlock {
            name: name.to_string(),
            visibility: "pub".to_string(),
            decorations: Decorations::generated(name),
            constants: Vec::new(),
        };
        match self.push(Declaration::Constants(block)) {
            Declaration::Constants(block) => block,
            _ => unreachable!("pushed a constant block"),
        }
    }

    pub fn add_function(&mut self, name: &str) -> &mut Function {
        let mut function = Function::new(name);
        function.decorations = Decorations::generated(name);
        match self.push(Declaration::Function(function)) {
            Declaration::Function(function) => function,
            _ => unreachable!("pushed a function"),
        }
    }

    pub fn add_verbatim(&mut self, name: &str, text: &str) -> &mut Verbatim {
        let verbatim = Verbatim {
            name: name.to_string(),
            decorations: Decorations::generated(name),
            text: text.to_string(),
        };
        match self.push(Declaration::Verbatim(verbatim)) {
            Declaration::Verbatim(verbatim) => verbatim,
            _ => unreachable!("pushed a verbatim item"),
        }
    }

    pub fn find(&self, name: &str) -> Option<&Declaration> {
        self.declarations
            .iter()
            .find(|declaration| declaration.name() == name)
    }

    /// The declaration carrying `generate <key>`.
    pub fn find_generated(&self, key: &str) -> Option<&Declaration> {
        self.declarations
            .iter()
            .find(|declaration| declaration.generate_key() == Some(key))
    }

    pub fn record(&self, name: &str) -> Option<&Record> {
        match self.find(name)? {
            Declaration::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        match self.find(name)? {
            Declaration::Function(function) => Some(function),
            _ => None,
        }
    }
}
