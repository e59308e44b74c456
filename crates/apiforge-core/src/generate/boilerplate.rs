//! File banners rendered from a small tera template

use tera::{Context, Tera};

use crate::error::Result;

const BANNER_TEMPLATE: &str = "\
Generated by apiforge from {{ title }}{% if version %} {{ version }}{% endif %}.

Items marked `// generate` are rewritten on every run. Keep hand-written code
in items marked `// define`, or between `// define block start` and
`// define block end` inside generated functions.";

/// Module doc lines placed at the top of every generated file.
pub fn banner(title: &str, version: &str) -> Result<Vec<String>> {
    let mut context = Context::new();
    context.insert("title", title);
    context.insert("version", version);
    let text = Tera::one_off(BANNER_TEMPLATE, &context, false)?;
    Ok(text.lines().map(|line| line.trim_end().to_string()).collect())
}
