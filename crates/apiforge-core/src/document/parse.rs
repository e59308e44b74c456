//! Reading previously rendered (and possibly hand-edited) source back into a
//! [`Document`], using the tree-sitter Rust grammar.
//!
//! Comments and attributes preceding an item attach to it; a comment on the
//! same line as a field or declaration attaches to that item. Items the
//! document model cannot represent structurally are kept as [`Verbatim`]
//! text so nothing a user wrote is lost.

use tree_sitter::{Node, Parser};

use super::{
    Alias, Constant, ConstantBlock, Declaration, Decorations, Document, Enumeration, Field,
    Function, List, Record, Statement, Variant, Verbatim,
};
use crate::error::{Error, Result};

impl Document {
    /// Parse Rust source into a document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Document`] when the text contains syntax errors.
    pub fn parse(text: &str) -> Result<Self> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_rust::LANGUAGE.into())
            .map_err(|e| Error::document(format!("failed to load Rust grammar: {}", e)))?;
        let tree = parser
            .parse(text, None)
            .ok_or_else(|| Error::document("parser produced no tree"))?;

        let root = tree.root_node();
        if root.has_error() {
            let line = first_error(root).map_or(0, |node| node.start_position().row + 1);
            return Err(Error::document(format!("syntax error near line {}", line)));
        }

        DocumentParser { source: text }.document(root)
    }
}

fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error)
}

fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

fn is_comment(node: Node<'_>) -> bool {
    matches!(node.kind(), "line_comment" | "block_comment")
}

/// Remove up to `column` leading spaces from every line but the first.
fn dedent(text: &str, column: usize) -> String {
    text.lines()
        .enumerate()
        .map(|(index, line)| {
            if index == 0 {
                line
            } else {
                let indent = line.len() - line.trim_start_matches(' ').len();
                &line[indent.min(column)..]
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

struct DocumentParser<'s> {
    source: &'s str,
}

impl<'s> DocumentParser<'s> {
    fn text(&self, node: Node<'_>) -> &'s str {
        self.source.get(node.byte_range()).unwrap_or_default()
    }

    fn comment(&self, node: Node<'_>) -> &'s str {
        self.text(node).trim_end()
    }

    fn field_text(&self, node: Node<'_>, field: &str) -> Option<&'s str> {
        node.child_by_field_name(field).map(|child| self.text(child))
    }

    fn visibility(&self, node: Node<'_>) -> String {
        named_children(node)
            .into_iter()
            .find(|child| child.kind() == "visibility_modifier")
            .map(|child| self.text(child).to_string())
            .unwrap_or_default()
    }

    fn is_generic(&self, node: Node<'_>) -> bool {
        node.child_by_field_name("type_parameters").is_some()
            || named_children(node)
                .iter()
                .any(|child| child.kind() == "where_clause")
    }

    fn document(&self, root: Node<'_>) -> Result<Document> {
        let mut document = Document::new();
        let mut pending = Decorations::default();
        let mut last_row: Option<usize> = None;

        for node in named_children(root) {
            if is_comment(node) {
                let comment = self.comment(node);
                if let Some(doc) = comment.strip_prefix("//!") {
                    document
                        .docs
                        .push(doc.strip_prefix(' ').unwrap_or(doc).to_string());
                    continue;
                }
                let trailing = last_row == Some(node.start_position().row);
                match document.declarations.last_mut() {
                    Some(previous) if trailing => previous.decorations_mut().push_comment(comment),
                    _ => pending.push_comment(comment),
                }
                continue;
            }
            if node.kind() == "attribute_item" {
                pending.attributes.push(self.text(node).to_string());
                continue;
            }

            let decorations = std::mem::take(&mut pending);
            last_row = Some(node.end_position().row);

            if node.kind() == "use_declaration" && decorations.is_empty() {
                if self.visibility(node).is_empty() {
                    if let Some(argument) = self.field_text(node, "argument") {
                        document.imports.insert(argument.to_string());
                        continue;
                    }
                }
            }
            if node.kind() == "impl_item" && self.attach_impl(node, &decorations, &mut document) {
                continue;
            }

            let declaration = match node.kind() {
                "struct_item" => self.record(node, &decorations).map(Declaration::Record),
                "enum_item" => self.enumeration(node, &decorations).map(Declaration::Enum),
                "type_item" => self.type_alias(node, &decorations),
                "mod_item" => self.constants(node, &decorations).map(Declaration::Constants),
                "function_item" => self.function(node, &decorations).map(Declaration::Function),
                _ => None,
            };
            let declaration =
                declaration.unwrap_or_else(|| Declaration::Verbatim(self.verbatim(node, decorations)));
            document.declarations.push(declaration);
        }

        Ok(document)
    }

    fn verbatim(&self, node: Node<'_>, decorations: Decorations) -> Verbatim {
        let text = self.text(node);
        let name = match node.kind() {
            "impl_item" => {
                let header = text.split('{').next().unwrap_or(text);
                header.split_whitespace().collect::<Vec<_>>().join(" ")
            }
            _ => self
                .field_text(node, "name")
                .map(str::to_string)
                .unwrap_or_else(|| text.lines().next().unwrap_or_default().trim().to_string()),
        };
        Verbatim {
            name,
            decorations,
            text: text.to_string(),
        }
    }

    fn record(&self, node: Node<'_>, decorations: &Decorations) -> Option<Record> {
        if self.is_generic(node) {
            return None;
        }
        let body = node.child_by_field_name("body")?;
        if body.kind() != "field_declaration_list" {
            return None;
        }

        let mut record = Record::new(self.field_text(node, "name")?);
        record.visibility = self.visibility(node);
        record.decorations = decorations.clone();

        let mut pending = Decorations::default();
        let mut last_row: Option<usize> = None;
        for child in named_children(body) {
            match child.kind() {
                "line_comment" | "block_comment" => {
                    let trailing = last_row == Some(child.start_position().row);
                    match record.fields.last_mut() {
                        Some(field) if trailing => field.decorations.push_comment(self.comment(child)),
                        _ => pending.push_comment(self.comment(child)),
                    }
                }
                "attribute_item" => pending.attributes.push(self.text(child).to_string()),
                "field_declaration" => {
                    record.fields.push(Field {
                        name: self.field_text(child, "name")?.to_string(),
                        ty: self.field_text(child, "type")?.to_string(),
                        visibility: self.visibility(child),
                        decorations: std::mem::take(&mut pending),
                    });
                    last_row = Some(child.end_position().row);
                }
                _ => return None,
            }
        }
        Some(record)
    }

    fn enumeration(&self, node: Node<'_>, decorations: &Decorations) -> Option<Enumeration> {
        if self.is_generic(node) {
            return None;
        }
        let body = node.child_by_field_name("body")?;
        let mut enumeration = Enumeration {
            name: self.field_text(node, "name")?.to_string(),
            visibility: self.visibility(node),
            decorations: decorations.clone(),
            variants: Vec::new(),
        };

        let mut pending = Decorations::default();
        let mut last_row: Option<usize> = None;
        for child in named_children(body) {
            match child.kind() {
                "line_comment" | "block_comment" => {
                    let trailing = last_row == Some(child.start_position().row);
                    match enumeration.variants.last_mut() {
                        Some(variant) if trailing => {
                            variant.decorations.push_comment(self.comment(child))
                        }
                        _ => pending.push_comment(self.comment(child)),
                    }
                }
                "attribute_item" => pending.attributes.push(self.text(child).to_string()),
                "enum_variant" => {
                    if child.child_by_field_name("body").is_some()
                        || child.child_by_field_name("value").is_some()
                    {
                        return None;
                    }
                    enumeration.variants.push(Variant {
                        name: self.field_text(child, "name")?.to_string(),
                        decorations: std::mem::take(&mut pending),
                    });
                    last_row = Some(child.end_position().row);
                }
                _ => return None,
            }
        }
        Some(enumeration)
    }

    fn type_alias(&self, node: Node<'_>, decorations: &Decorations) -> Option<Declaration> {
        if self.is_generic(node) {
            return None;
        }
        let name = self.field_text(node, "name")?.to_string();
        let target = self.field_text(node, "type")?;
        let visibility = self.visibility(node);
        let declaration = match target
            .strip_prefix("Vec<")
            .and_then(|rest| rest.strip_suffix('>'))
        {
            Some(element) => Declaration::List(List {
                name,
                visibility,
                decorations: decorations.clone(),
                element: element.to_string(),
            }),
            None => Declaration::Alias(Alias {
                name,
                visibility,
                decorations: decorations.clone(),
                target: target.to_string(),
            }),
        };
        Some(declaration)
    }

    /// A module whose body holds only constants.
    fn constants(&self, node: Node<'_>, decorations: &Decorations) -> Option<ConstantBlock> {
        let body = node.child_by_field_name("body")?;
        let mut block = ConstantBlock {
            name: self.field_text(node, "name")?.to_string(),
            visibility: self.visibility(node),
            decorations: decorations.clone(),
            constants: Vec::new(),
        };

        let mut pending = Decorations::default();
        let mut last_row: Option<usize> = None;
        for child in named_children(body) {
            match child.kind() {
                "line_comment" | "block_comment" => {
                    let trailing = last_row == Some(child.start_position().row);
                    match block.constants.last_mut() {
                        Some(constant) if trailing => {
                            constant.decorations.push_comment(self.comment(child))
                        }
                        _ => pending.push_comment(self.comment(child)),
                    }
                }
                "attribute_item" => pending.attributes.push(self.text(child).to_string()),
                "const_item" => {
                    block.constants.push(Constant {
                        name: self.field_text(child, "name")?.to_string(),
                        visibility: self.visibility(child),
                        ty: self.field_text(child, "type")?.to_string(),
                        value: self.field_text(child, "value")?.to_string(),
                        decorations: std::mem::take(&mut pending),
                    });
                    last_row = Some(child.end_position().row);
                }
                _ => return None,
            }
        }
        Some(block)
    }

    fn function(&self, node: Node<'_>, decorations: &Decorations) -> Option<Function> {
        if self.is_generic(node) {
            return None;
        }
        let modifiers = named_children(node)
            .into_iter()
            .find(|child| child.kind() == "function_modifiers")
            .map(|child| self.text(child));
        let is_async = match modifiers {
            None => false,
            Some("async") => true,
            Some(_) => return None,
        };

        let mut function = Function::new(self.field_text(node, "name")?);
        function.visibility = self.visibility(node);
        function.is_async = is_async;
        function.decorations = decorations.clone();
        function.returns = self.field_text(node, "return_type").map(str::to_string);

        let parameters = node.child_by_field_name("parameters")?;
        for parameter in named_children(parameters) {
            if is_comment(parameter) {
                continue;
            }
            let text = self.text(parameter);
            function
                .params
                .push(text.split_whitespace().collect::<Vec<_>>().join(" "));
        }

        let body = node.child_by_field_name("body")?;
        for statement in named_children(body) {
            let text = self.text(statement);
            let statement = if statement.kind() == "line_comment" {
                let comment = text.trim_end().trim_start_matches('/');
                Statement::Comment(comment.strip_prefix(' ').unwrap_or(comment).to_string())
            } else {
                Statement::Code(dedent(text, statement.start_position().column))
            };
            function.body.push(statement);
        }
        Some(function)
    }

    /// Attach the methods of an inherent `impl` to the record it extends.
    ///
    /// Returns `false`, leaving the block to be kept verbatim, when the impl
    /// is a trait impl, is generic, carries attributes, or contains anything
    /// besides plain functions.
    fn attach_impl(&self, node: Node<'_>, decorations: &Decorations, document: &mut Document) -> bool {
        if node.child_by_field_name("trait").is_some()
            || self.is_generic(node)
            || !decorations.attributes.is_empty()
        {
            return false;
        }
        let (Some(target), Some(body)) = (
            self.field_text(node, "type"),
            node.child_by_field_name("body"),
        ) else {
            return false;
        };

        let inherited = decorations
            .markers
            .iter()
            .find(|marker| matches!(marker, super::Marker::Define(_)))
            .cloned();
        let mut methods = Vec::new();
        let mut pending = Decorations::default();
        for child in named_children(body) {
            match child.kind() {
                "line_comment" | "block_comment" => pending.push_comment(self.comment(child)),
                "attribute_item" => pending.attributes.push(self.text(child).to_string()),
                "function_item" => {
                    let decorations = std::mem::take(&mut pending);
                    let Some(mut method) = self.function(child, &decorations) else {
                        return false;
                    };
                    if method.decorations.markers.is_empty() {
                        method.decorations.markers.extend(inherited.clone());
                    }
                    methods.push(method);
                }
                _ => return false,
            }
        }

        let record = document.declarations.iter_mut().find_map(|declaration| match declaration {
            Declaration::Record(record) if record.name == target => Some(record),
            _ => None,
        });
        match record {
            Some(record) => {
                record.methods.extend(methods);
                true
            }
            None => false,
        }
    }
}
