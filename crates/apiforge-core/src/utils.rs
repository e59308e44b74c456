//! String transformation utilities for naming resolved types and generated code

/// Words that cannot be used as plain Rust identifiers.
const RUST_KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "dyn", "else", "enum", "extern", "false",
    "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub", "ref",
    "return", "static", "struct", "trait", "true", "type", "unsafe", "use", "where", "while",
    "abstract", "become", "box", "do", "final", "macro", "override", "priv", "try", "typeof",
    "unsized", "virtual", "yield",
];

/// Keywords that cannot even be written as raw identifiers.
const RESERVED_IDENTS: &[&str] = &["self", "Self", "super", "crate"];

/// Whether `word` is a Rust keyword, including reserved and path keywords.
pub fn is_rust_keyword(word: &str) -> bool {
    RUST_KEYWORDS.contains(&word) || RESERVED_IDENTS.contains(&word)
}

/// Convert a string to snake_case
pub fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    let mut prev_is_lowercase = false;

    for (i, ch) in s.chars().enumerate() {
        if ch.is_uppercase() {
            // Split camelCase humps, but keep runs of capitals together
            if i > 0 && prev_is_lowercase {
                result.push('_');
            }
            result.extend(ch.to_lowercase());
            prev_is_lowercase = false;
        } else if ch.is_alphanumeric() {
            result.push(ch);
            prev_is_lowercase = ch.is_lowercase() || ch.is_ascii_digit();
        } else if ch == '-' || ch == '_' || ch == ' ' || ch == '.' {
            if !result.is_empty() && !result.ends_with('_') {
                result.push('_');
            }
            prev_is_lowercase = false;
        }
    }

    // Remove duplicate underscores and trim
    let mut final_result = String::new();
    let mut prev_underscore = false;
    for ch in result.chars() {
        if ch == '_' {
            if !prev_underscore && !final_result.is_empty() {
                final_result.push(ch);
            }
            prev_underscore = true;
        } else {
            final_result.push(ch);
            prev_underscore = false;
        }
    }

    final_result.trim_matches('_').to_string()
}

/// Convert a string to UpperCamelCase (PascalCase)
pub fn to_upper_camel_case(s: &str) -> String {
    // First convert to snake_case to normalize the input
    let snake = to_snake_case(s);

    // Then split on underscores and capitalize each word
    snake
        .split('_')
        .filter(|s| !s.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            }
        })
        .collect()
}

/// Convert a string to SCREAMING_SNAKE_CASE
pub fn to_screaming_snake_case(s: &str) -> String {
    to_snake_case(s).to_uppercase()
}

/// Convert a string to dash-separated lowercase words, the form used for
/// type names, cache keys and marker keys.
pub fn dasherize(s: &str) -> String {
    to_snake_case(s).replace('_', "-")
}

/// Best-effort English singular of the last word of a dasherized name.
///
/// Returns the input unchanged when no plural ending is recognized.
pub fn singularize(name: &str) -> String {
    let (head, last) = match name.rfind('-') {
        Some(pos) => name.split_at(pos + 1),
        None => ("", name),
    };

    let singular = if let Some(stem) = last.strip_suffix("ies") {
        if stem.is_empty() {
            last.to_string()
        } else {
            format!("{}y", stem)
        }
    } else if ["sses", "shes", "ches", "xes", "zes"]
        .iter()
        .any(|suffix| last.ends_with(suffix))
    {
        last[..last.len() - 2].to_string()
    } else if last.ends_with("ss") || last.ends_with("us") || last.ends_with("is") {
        last.to_string()
    } else if let Some(stem) = last.strip_suffix('s') {
        if stem.is_empty() {
            last.to_string()
        } else {
            stem.to_string()
        }
    } else {
        last.to_string()
    };

    format!("{}{}", head, singular)
}

/// Turn an arbitrary wire name into a valid Rust field or function identifier.
pub fn to_field_ident(name: &str) -> String {
    let snake = to_snake_case(name);
    if snake.is_empty() {
        return "value".to_string();
    }
    if snake.starts_with(|c: char| c.is_ascii_digit()) {
        return format!("_{}", snake);
    }
    if RESERVED_IDENTS.contains(&snake.as_str()) {
        return format!("{}_", snake);
    }
    if RUST_KEYWORDS.contains(&snake.as_str()) {
        return format!("r#{}", snake);
    }
    snake
}

/// Turn an arbitrary name into a valid Rust type or variant identifier.
pub fn to_type_ident(name: &str) -> String {
    let camel = to_upper_camel_case(name);
    if camel.is_empty() {
        return "Empty".to_string();
    }
    if camel.starts_with(|c: char| c.is_ascii_digit()) {
        return format!("V{}", camel);
    }
    if camel == "Self" {
        return "SelfValue".to_string();
    }
    camel
}

/// Strip the raw-identifier prefix, giving the name as it appears on the wire.
pub fn unraw(ident: &str) -> &str {
    ident.strip_prefix("r#").unwrap_or(ident)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_snake_case() {
        assert_eq!(to_snake_case("findPetsByStatus"), "find_pets_by_status");
        assert_eq!(to_snake_case("FindPetsByStatus"), "find_pets_by_status");
        assert_eq!(to_snake_case("find-pets-by-status"), "find_pets_by_status");
        assert_eq!(to_snake_case("find_pets_by_status"), "find_pets_by_status");
        assert_eq!(to_snake_case("HTTPResponse"), "httpresponse");
        assert_eq!(to_snake_case("get HTTP Response"), "get_http_response");
        assert_eq!(to_snake_case("petId"), "pet_id");
        assert_eq!(to_snake_case("v1.Pet"), "v1_pet");
    }

    #[test]
    fn test_to_upper_camel_case() {
        assert_eq!(
            to_upper_camel_case("find_pets_by_status"),
            "FindPetsByStatus"
        );
        assert_eq!(to_upper_camel_case("pets-controller"), "PetsController");
        assert_eq!(
            to_upper_camel_case("list-pets-200-response"),
            "ListPets200Response"
        );
        assert_eq!(to_upper_camel_case("http_response"), "HttpResponse");
    }

    #[test]
    fn test_dasherize() {
        assert_eq!(dasherize("NewPet"), "new-pet");
        assert_eq!(dasherize("account_id"), "account-id");
        assert_eq!(dasherize("PetsController"), "pets-controller");
        assert_eq!(dasherize("list-pets"), "list-pets");
        assert_eq!(dasherize("Extra Note"), "extra-note");
    }

    #[test]
    fn test_singularize() {
        assert_eq!(singularize("pets"), "pet");
        assert_eq!(singularize("categories"), "category");
        assert_eq!(singularize("addresses"), "address");
        assert_eq!(singularize("boxes"), "box");
        assert_eq!(singularize("status"), "status");
        assert_eq!(singularize("pet-tags"), "pet-tag");
        assert_eq!(singularize("data"), "data");
    }

    #[test]
    fn test_identifiers() {
        assert_eq!(to_field_ident("type"), "r#type");
        assert_eq!(to_field_ident("self"), "self_");
        assert_eq!(to_field_ident("2fa"), "_2fa");
        assert_eq!(to_field_ident("createdAt"), "created_at");
        assert_eq!(to_type_ident("in-progress"), "InProgress");
        assert_eq!(to_type_ident("404"), "V404");
        assert_eq!(to_type_ident(""), "Empty");
        assert_eq!(unraw("r#type"), "type");
    }
}
