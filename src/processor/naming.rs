//! Identifier transforms between Python and the generated Rust.

const RUST_KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "false", "fn", "for", "gen", "if", "impl", "in", "let", "loop", "match", "mod",
    "move", "mut", "pub", "ref", "return", "self", "Self", "static", "struct", "super", "trait",
    "true", "type", "unsafe", "use", "where", "while", "abstract", "become", "box", "do", "final",
    "macro", "override", "priv", "try", "typeof", "unsized", "virtual", "yield",
];

/// Keywords that can't be written as raw identifiers.
const NOT_RAW: &[&str] = &["crate", "self", "Self", "super", "_"];

/// Tuple structs and variants in scope of the generated code. A parameter
/// pattern with one of these names resolves to the constructor, not a binding.
const CONSTRUCTORS: &[&str] = &["Some", "None", "Ok", "Err", "Bytes", "Pairs"];

/// Converts a snake_case (or arbitrary) identifier to PascalCase.
///
/// Words are split on underscores and the first letter of each is
/// upper-cased; the rest of every word is kept as written.
pub fn convert(name: &str) -> String {
    name.split('_')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// PascalCase method name for a Python function, kept clear of `Self`.
pub fn method_name(name: &str) -> String {
    let converted = convert(name);
    if converted == "Self" {
        "Self_".to_string()
    } else {
        converted
    }
}

/// Rust identifier for a Python name, escaping keywords.
pub fn binding(name: &str) -> String {
    if NOT_RAW.contains(&name) || CONSTRUCTORS.contains(&name) {
        format!("{name}_")
    } else if RUST_KEYWORDS.contains(&name) {
        format!("r#{name}")
    } else {
        name.to_string()
    }
}

/// Whether `name` can be imported as a Python module and named in Rust.
pub fn is_module_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {
            chars.all(|c| c.is_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert() {
        let test_cases = vec![
            ("my_cool_func", "MyCoolFunc"),
            ("already", "Already"),
            ("Already", "Already"),
            ("camelCase_name", "CamelCaseName"),
            ("_private", "Private"),
            ("double__underscore", "DoubleUnderscore"),
            ("trailing_", "Trailing"),
            ("x1_y2", "X1Y2"),
            ("__", ""),
        ];

        for (input, expected) in test_cases {
            assert_eq!(convert(input), expected, "input: {input}");
        }
    }

    #[test]
    fn test_method_name_avoids_self() {
        assert_eq!(method_name("self"), "Self_");
        assert_eq!(method_name("get_self"), "GetSelf");
    }

    #[test]
    fn test_binding() {
        let test_cases = vec![
            ("value", "value"),
            ("type", "r#type"),
            ("match", "r#match"),
            ("gen", "r#gen"),
            ("self", "self_"),
            ("_", "__"),
            ("match_", "match_"),
            ("Ok", "Ok_"),
            ("Err", "Err_"),
            ("Some", "Some_"),
            ("Bytes", "Bytes_"),
            ("ok", "ok"),
        ];

        for (input, expected) in test_cases {
            assert_eq!(binding(input), expected, "input: {input}");
        }
    }

    #[test]
    fn test_module_names() {
        assert!(is_module_name("demo_module"));
        assert!(is_module_name("_internal"));
        assert!(!is_module_name("my-module"));
        assert!(!is_module_name("1st"));
        assert!(!is_module_name(""));
    }
}
