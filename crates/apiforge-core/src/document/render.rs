//! Canonical text rendering of documents

use super::{
    ConstantBlock, Declaration, Decorations, Document, Enumeration, Function, Record, Statement,
};

const INDENT: &str = "    ";

impl Document {
    /// Render the document as Rust source: module docs, imports, then one
    /// blank-line separated section per declaration.
    pub fn render(&self) -> String {
        let mut sections = Vec::new();

        if !self.docs.is_empty() {
            let mut docs = String::new();
            for line in &self.docs {
                docs.push_str(&prefixed("//!", line));
                docs.push('\n');
            }
            sections.push(docs);
        }

        if !self.imports.is_empty() {
            let mut imports = String::new();
            for import in &self.imports {
                imports.push_str(&format!("use {};\n", import));
            }
            sections.push(imports);
        }

        for declaration in &self.declarations {
            let mut out = String::new();
            render_declaration(&mut out, declaration);
            sections.push(out);
        }

        sections.join("\n")
    }
}

fn render_declaration(out: &mut String, declaration: &Declaration) {
    match declaration {
        Declaration::Record(record) => render_record(out, record),
        Declaration::Enum(enumeration) => render_enum(out, enumeration),
        Declaration::Alias(alias) => {
            render_decorations(out, &alias.decorations, 0);
            out.push_str(&format!(
                "{}type {} = {};\n",
                visibility(&alias.visibility),
                alias.name,
                alias.target
            ));
        }
        Declaration::List(list) => {
            render_decorations(out, &list.decorations, 0);
            out.push_str(&format!(
                "{}type {} = Vec<{}>;\n",
                visibility(&list.visibility),
                list.name,
                list.element
            ));
        }
        Declaration::Constants(block) => render_constants(out, block),
        Declaration::Function(function) => render_function(out, function, 0),
        Declaration::Verbatim(verbatim) => {
            render_decorations(out, &verbatim.decorations, 0);
            out.push_str(verbatim.text.trim_end());
            out.push('\n');
        }
    }
}

fn render_record(out: &mut String, record: &Record) {
    render_decorations(out, &record.decorations, 0);
    let header = format!("{}struct {}", visibility(&record.visibility), record.name);
    if record.fields.is_empty() {
        out.push_str(&format!("{} {{}}\n", header));
    } else {
        out.push_str(&format!("{} {{\n", header));
        for field in &record.fields {
            render_decorations(out, &field.decorations, 1);
            out.push_str(&format!(
                "{}{}{}: {},\n",
                INDENT,
                visibility(&field.visibility),
                field.name,
                field.ty
            ));
        }
        out.push_str("}\n");
    }

    if !record.methods.is_empty() {
        out.push_str(&format!("\nimpl {} {{\n", record.name));
        for (index, method) in record.methods.iter().enumerate() {
            if index > 0 {
                out.push('\n');
            }
            render_function(out, method, 1);
        }
        out.push_str("}\n");
    }
}

fn render_enum(out: &mut String, enumeration: &Enumeration) {
    render_decorations(out, &enumeration.decorations, 0);
    let header = format!(
        "{}enum {}",
        visibility(&enumeration.visibility),
        enumeration.name
    );
    if enumeration.variants.is_empty() {
        out.push_str(&format!("{} {{}}\n", header));
        return;
    }
    out.push_str(&format!("{} {{\n", header));
    for variant in &enumeration.variants {
        render_decorations(out, &variant.decorations, 1);
        out.push_str(&format!("{}{},\n", INDENT, variant.name));
    }
    out.push_str("}\n");
}

fn render_constants(out: &mut String, block: &ConstantBlock) {
    render_decorations(out, &block.decorations, 0);
    let header = format!("{}mod {}", visibility(&block.visibility), block.name);
    if block.constants.is_empty() {
        out.push_str(&format!("{} {{}}\n", header));
        return;
    }
    out.push_str(&format!("{} {{\n", header));
    for constant in &block.constants {
        render_decorations(out, &constant.decorations, 1);
        out.push_str(&format!(
            "{}{}const {}: {} = {};\n",
            INDENT,
            visibility(&constant.visibility),
            constant.name,
            constant.ty,
            constant.value
        ));
    }
    out.push_str("}\n");
}

fn render_function(out: &mut String, function: &Function, depth: usize) {
    render_decorations(out, &function.decorations, depth);
    let indent = INDENT.repeat(depth);
    let mut signature = format!(
        "{}{}{}fn {}({})",
        indent,
        visibility(&function.visibility),
        if function.is_async { "async " } else { "" },
        function.name,
        function.params.join(", ")
    );
    if let Some(returns) = &function.returns {
        signature.push_str(&format!(" -> {}", returns));
    }

    if function.body.is_empty() {
        out.push_str(&format!("{} {{}}\n", signature));
        return;
    }
    out.push_str(&format!("{} {{\n", signature));
    let body_indent = INDENT.repeat(depth + 1);
    for statement in &function.body {
        match statement {
            Statement::Code(code) => {
                for line in code.lines() {
                    if line.trim().is_empty() {
                        out.push('\n');
                    } else {
                        out.push_str(&format!("{}{}\n", body_indent, line));
                    }
                }
            }
            Statement::Comment(comment) => {
                out.push_str(&format!("{}{}\n", body_indent, comment_line(comment)));
            }
        }
    }
    out.push_str(&format!("{}}}\n", indent));
}

fn render_decorations(out: &mut String, decorations: &Decorations, depth: usize) {
    let indent = INDENT.repeat(depth);
    for marker in &decorations.markers {
        out.push_str(&format!("{}{}\n", indent, marker.to_comment()));
    }
    for comment in &decorations.comments {
        out.push_str(&format!("{}{}\n", indent, comment_line(comment)));
    }
    for doc in &decorations.docs {
        out.push_str(&format!("{}{}\n", indent, prefixed("///", doc)));
    }
    for attribute in &decorations.attributes {
        out.push_str(&format!("{}{}\n", indent, attribute));
    }
}

/// Block comments are kept as written; everything else is a line comment.
fn comment_line(comment: &str) -> String {
    if comment.starts_with("/*") {
        comment.to_string()
    } else {
        prefixed("//", comment)
    }
}

fn prefixed(prefix: &str, text: &str) -> String {
    if text.is_empty() {
        prefix.to_string()
    } else {
        format!("{} {}", prefix, text)
    }
}

fn visibility(visibility: &str) -> String {
    if visibility.is_empty() {
        String::new()
    } else {
        format!("{} ", visibility)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_record_with_methods() {
        let mut document = Document::new();
        document.add_doc("Generated types.");
        document.add_import("serde::{Deserialize, Serialize}");
        let record = document.add_record_type("Pet");
        record
            .decorations
            .doc("A pet.")
            .attribute("#[derive(Debug, Serialize, Deserialize)]");
        record.add_field("id", "i64");
        record
            .add_method("label")
            .param("&self")
            .returns("String")
            .code("self.id.to_string()");

        let expected = "\
//! Generated types.

use serde::{Deserialize, Serialize};

// generate pet
/// A pet.
#[derive(Debug, Serialize, Deserialize)]
pub struct Pet {
    // generate id
    pub id: i64,
}

impl Pet {
    // generate pet:label
    pub fn label(&self) -> String {
        self.id.to_string()
    }
}
";
        assert_eq!(document.render(), expected);
    }

    #[test]
    fn test_render_function_with_block() {
        let mut document = Document::new();
        document
            .add_function("handler")
            .set_async(true)
            .returns("u32")
            .code("let base = 1;")
            .block_start()
            .code("let value = base;")
            .block_end()
            .code("value");

        let expected = "\
// generate handler
pub async fn handler() -> u32 {
    let base = 1;
    // define block start
    let value = base;
    // define block end
    value
}
";
        assert_eq!(document.render(), expected);
    }

    #[test]
    fn test_render_small_items() {
        let mut document = Document::new();
        document.add_alias_type("Name", "String");
        document.add_list_type("Pets", "Pet");
        document
            .add_constant_block("paths")
            .add_constant("LIST_PETS", "&str", "\"/pets\"");
        document.add_enum_type("Status").add_variant("Open");

        let text = document.render();
        assert!(text.contains("// generate name\npub type Name = String;\n"));
        assert!(text.contains("pub type Pets = Vec<Pet>;\n"));
        assert!(text.contains(
            "pub mod paths {\n    // generate list-pets\n    pub const LIST_PETS: &str = \"/pets\";\n}\n"
        ));
        assert!(text.contains("pub enum Status {\n    // generate open\n    Open,\n}\n"));
    }
}
