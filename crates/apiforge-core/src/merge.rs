//! Regeneration-safe merging of a freshly generated document with the
//! previous content of the same file.
//!
//! The first pass walks the generated declarations and reconciles each with
//! the previous declaration carrying the same `generate` key: hand-added
//! members marked `define` are carried over, and function bodies get their
//! `define block start`/`define block end` region spliced back in. The second
//! pass appends previous declarations marked `define` that nothing matched.
//! Missing or malformed markers only mean nothing is preserved.

use std::collections::HashSet;

use crate::document::{
    Constant, Declaration, Decorations, Document, Field, Function, Record, Variant,
};
use crate::report::Reporter;

/// Merge `target` (fresh output) with `source` (the previous file, if any).
pub fn merge(target: Document, source: Option<&Document>, reporter: &Reporter) -> Document {
    let Some(source) = source else {
        return target;
    };
    let nested = reporter.nested();
    let mut result = target;
    let mut matched = HashSet::new();

    for declaration in result.declarations.iter_mut() {
        let Some(key) = declaration.generate_key().map(str::to_string) else {
            continue;
        };
        let Some((index, previous)) = source
            .declarations
            .iter()
            .enumerate()
            .find(|(_, previous)| previous.generate_key() == Some(key.as_str()))
        else {
            continue;
        };
        matched.insert(index);

        match (declaration, previous) {
            (Declaration::Record(next), Declaration::Record(previous)) => {
                merge_record(next, previous, &nested)
            }
            (Declaration::Enum(next), Declaration::Enum(previous)) => {
                carry_defined(&mut next.variants, &previous.variants, &next.name, &nested)
            }
            (Declaration::Constants(next), Declaration::Constants(previous)) => {
                carry_defined(&mut next.constants, &previous.constants, &next.name, &nested)
            }
            (Declaration::Function(next), Declaration::Function(previous)) => {
                splice_block(next, previous, &nested)
            }
            _ => {}
        }
    }

    for (index, previous) in source.declarations.iter().enumerate() {
        if matched.contains(&index) || !previous.is_defined() {
            continue;
        }
        if result.find(previous.name()).is_some() {
            nested.warn(format!(
                "Not carrying over '{}': a generated declaration uses that name",
                previous.name()
            ));
            continue;
        }
        nested.info(format!("Carrying over '{}'", previous.name()));
        result.declarations.push(previous.clone());
    }

    result.imports.extend(
        source
            .imports
            .iter()
            .filter(|path| !is_sibling_import(path))
            .cloned(),
    );
    result
}

/// Paths into sibling generated modules. Only the fresh output supplies
/// these; a hand-added one needs a `define` marker to be kept.
fn is_sibling_import(path: &str) -> bool {
    path.starts_with("super::")
}

/// Anything inside a declaration that can be carried over on its own.
trait Member: Clone {
    fn name(&self) -> &str;
    fn decorations(&self) -> &Decorations;
}

impl Member for Field {
    fn name(&self) -> &str {
        &self.name
    }

    fn decorations(&self) -> &Decorations {
        &self.decorations
    }
}

impl Member for Variant {
    fn name(&self) -> &str {
        &self.name
    }

    fn decorations(&self) -> &Decorations {
        &self.decorations
    }
}

impl Member for Constant {
    fn name(&self) -> &str {
        &self.name
    }

    fn decorations(&self) -> &Decorations {
        &self.decorations
    }
}

impl Member for Function {
    fn name(&self) -> &str {
        &self.name
    }

    fn decorations(&self) -> &Decorations {
        &self.decorations
    }
}

/// Append the `define`-marked members of `previous` after the generated ones.
fn carry_defined<T: Member>(next: &mut Vec<T>, previous: &[T], owner: &str, reporter: &Reporter) {
    for member in previous.iter().filter(|member| member.decorations().is_defined()) {
        if next.iter().any(|existing| existing.name() == member.name()) {
            if !member.decorations().is_generated() {
                reporter.warn(format!(
                    "Dropping '{}' in '{}': a generated member has the same name",
                    member.name(),
                    owner
                ));
            }
            continue;
        }
        reporter.debug(format!("Keeping '{}' in '{}'", member.name(), owner));
        next.push(member.clone());
    }
}

fn merge_record(next: &mut Record, previous: &Record, reporter: &Reporter) {
    carry_defined(&mut next.fields, &previous.fields, &next.name, reporter);

    for method in next.methods.iter_mut() {
        let Some(key) = method.decorations.generate_key().map(str::to_string) else {
            continue;
        };
        if let Some(old) = previous
            .methods
            .iter()
            .find(|old| old.decorations.generate_key() == Some(key.as_str()))
        {
            splice_block(method, old, reporter);
        }
    }

    let handwritten: Vec<Function> = previous
        .methods
        .iter()
        .filter(|method| !method.decorations.is_generated())
        .cloned()
        .collect();
    carry_defined(&mut next.methods, &handwritten, &next.name, reporter);
}

/// Replace the editable region of `next` with the one from `previous`.
/// Both bodies need a paired region; otherwise `next` is left as is.
fn splice_block(next: &mut Function, previous: &Function, reporter: &Reporter) {
    match (next.block_range(), previous.block_range()) {
        (Some((start, end)), Some((old_start, old_end))) => {
            let region = previous.body[old_start..=old_end].to_vec();
            next.body.splice(start..=end, region);
            reporter.debug(format!("Kept the editable region of '{}'", next.name));
        }
        (Some(_), None) => reporter.debug(format!(
            "No complete editable region in the previous '{}', regenerating it",
            next.name
        )),
        _ => {}
    }
}
