use once_cell::sync::Lazy;
use std::collections::HashMap;

const SALUTATIONS: &[&str] = &[
    "please ",
    "could you ",
    "can you ",
    "help me ",
    "hi, ",
    "hey, ",
    "麻烦",
    "请帮我",
    "请",
];

/// Known misspellings of technology names, mapped to their canonical form.
/// A compiled static table rather than a runtime-loaded file.
static MISSPELLINGS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("pyhton", "python"),
        ("javscript", "javascript"),
        ("typescrip", "typescript"),
        ("dockerfle", "dockerfile"),
        ("reactjs", "react"),
        ("nodejs", "node.js"),
        ("postgre", "postgres"),
        ("kubernets", "kubernetes"),
    ])
});

static COLLOQUIAL_VERBS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("fix up", "fix"),
        ("whip up", "create"),
        ("hook up", "connect"),
        ("spin up", "start"),
        ("搞一下", "处理"),
        ("弄一个", "创建"),
    ])
});

/// Local normalization pass independent of the LLM: collapse whitespace,
/// strip leading salutations, substitute misspellings, formalize colloquial
/// verbs. Runs even when the LLM is unavailable.
pub fn normalize(text: &str) -> String {
    let collapsed = collapse_whitespace(text);
    let stripped = strip_salutations(&collapsed);
    let despelled = substitute_table(&stripped, &MISSPELLINGS);
    substitute_table(&despelled, &COLLOQUIAL_VERBS)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_salutations(text: &str) -> String {
    let lower = text.to_lowercase();
    for salutation in SALUTATIONS {
        if lower.starts_with(salutation) {
            return text[salutation.len()..].trim_start().to_string();
        }
    }
    text.to_string()
}

fn substitute_table(text: &str, table: &HashMap<&'static str, &'static str>) -> String {
    let mut result = text.to_string();
    for (from, to) in table.iter() {
        if result.to_lowercase().contains(from) {
            result = case_insensitive_replace(&result, from, to);
        }
    }
    result
}

fn case_insensitive_replace(haystack: &str, needle: &str, replacement: &str) -> String {
    let lower_haystack = haystack.to_lowercase();
    let lower_needle = needle.to_lowercase();
    let mut out = String::new();
    let mut rest = haystack;
    let mut rest_lower = lower_haystack.as_str();

    while let Some(pos) = rest_lower.find(&lower_needle) {
        out.push_str(&rest[..pos]);
        out.push_str(replacement);
        let cut = pos + needle.len();
        rest = &rest[cut..];
        rest_lower = &rest_lower[cut..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_leading_salutation() {
        assert_eq!(normalize("please fix the bug"), "fix the bug");
    }

    #[test]
    fn collapses_repeated_whitespace() {
        assert_eq!(normalize("fix   the   bug"), "fix the bug");
    }

    #[test]
    fn corrects_known_misspelling() {
        assert_eq!(normalize("write a pyhton script"), "write a python script");
    }

    #[test]
    fn formalizes_colloquial_verb() {
        assert_eq!(normalize("whip up a landing page"), "create a landing page");
    }
}
