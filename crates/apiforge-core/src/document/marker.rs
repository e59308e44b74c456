//! Marker comments: the contract between the generator and hand edits.
//!
//! ```text
//! // generate <key>        identity of a generated item
//! // define <key>          item added by hand, preserved on regeneration
//! // define block start    start of an editable region in a function body
//! // define block end      end of that region
//! ```
//!
//! Keys are case-insensitive and dash-normalized.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

static GENERATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^generate\s+(\S.*)$").expect("valid generate marker pattern")
});

static BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^define\s+block\s+(start|end)$").expect("valid block marker pattern")
});

static DEFINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^define(?:\s+(.*))?$").expect("valid define marker pattern")
});

static SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s_-]+").expect("valid separator pattern"));

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Marker {
    Generate(String),
    /// The key may be empty: a bare `// define` still marks the item.
    Define(String),
    BlockStart,
    BlockEnd,
}

impl Marker {
    pub fn generate(key: &str) -> Self {
        Self::Generate(normalize_key(key))
    }

    pub fn define(key: &str) -> Self {
        Self::Define(normalize_key(key))
    }

    /// Recognize a marker in a comment, with or without its leading `//`.
    pub fn parse(comment: &str) -> Option<Self> {
        let text = comment.trim();
        let text = text.strip_prefix("//").unwrap_or(text).trim();

        if let Some(captures) = BLOCK.captures(text) {
            let which = captures.get(1).map(|m| m.as_str().to_ascii_lowercase());
            return match which.as_deref() {
                Some("start") => Some(Self::BlockStart),
                _ => Some(Self::BlockEnd),
            };
        }
        if let Some(captures) = GENERATE.captures(text) {
            let key = normalize_key(captures.get(1).map_or("", |m| m.as_str()));
            return (!key.is_empty()).then_some(Self::Generate(key));
        }
        DEFINE.captures(text).map(|captures| {
            Self::Define(normalize_key(captures.get(1).map_or("", |m| m.as_str())))
        })
    }

    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Generate(key) | Self::Define(key) => Some(key),
            Self::BlockStart | Self::BlockEnd => None,
        }
    }

    /// The comment line carrying this marker.
    pub fn to_comment(&self) -> String {
        format!("// {}", self)
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generate(key) => write!(f, "generate {}", key),
            Self::Define(key) if key.is_empty() => f.write_str("define"),
            Self::Define(key) => write!(f, "define {}", key),
            Self::BlockStart => f.write_str("define block start"),
            Self::BlockEnd => f.write_str("define block end"),
        }
    }
}

/// Lowercase a key and turn whitespace and underscores into single dashes.
pub fn normalize_key(key: &str) -> String {
    SEPARATORS
        .replace_all(key.trim(), "-")
        .trim_matches('-')
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_markers() {
        assert_eq!(
            Marker::parse("// generate pet-owner"),
            Some(Marker::Generate("pet-owner".to_string()))
        );
        assert_eq!(
            Marker::parse("define field extra-note"),
            Some(Marker::Define("field-extra-note".to_string()))
        );
        assert_eq!(Marker::parse("//   define block START "), Some(Marker::BlockStart));
        assert_eq!(Marker::parse("// define block end"), Some(Marker::BlockEnd));
        assert_eq!(Marker::parse("// define"), Some(Marker::Define(String::new())));
        assert_eq!(
            Marker::parse("// generate pets-controller:list-pets"),
            Some(Marker::Generate("pets-controller:list-pets".to_string()))
        );
    }

    #[test]
    fn test_ordinary_comments_are_not_markers() {
        assert_eq!(Marker::parse("// regenerate everything"), None);
        assert_eq!(Marker::parse("// defined elsewhere"), None);
        assert_eq!(Marker::parse("// generate"), None);
        assert_eq!(Marker::parse("// TODO: validate input"), None);
    }

    #[test]
    fn test_display_round_trips() {
        for marker in [
            Marker::generate("Pet Owner"),
            Marker::define("extra_note"),
            Marker::Define(String::new()),
            Marker::BlockStart,
            Marker::BlockEnd,
        ] {
            assert_eq!(Marker::parse(&marker.to_comment()), Some(marker.clone()));
        }
    }

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("Field  Extra_Note"), "field-extra-note");
        assert_eq!(normalize_key("--a__b--"), "a-b");
        assert_eq!(normalize_key("pets:list-pets"), "pets:list-pets");
    }
}
