/// Singular form of an english collection name, good enough for url parameters.
///
/// Only the common suffix rules are applied, irregular nouns are returned as they are
/// when they do not end with `s`.
pub(crate) fn singularize(word: &str) -> String {
    const IRREGULAR: [(&str, &str); 6] =
        [("people", "person"), ("children", "child"), ("men", "man"), ("women", "woman"), ("mice", "mouse"), ("data", "datum")];

    let lower = word.to_ascii_lowercase();
    if let Some((_, singular)) = IRREGULAR.iter().find(|(plural, _)| lower == *plural) {
        return (*singular).to_string();
    }

    if let Some(stem) = word.strip_suffix("ies").filter(|stem| !stem.is_empty()) {
        return format!("{stem}y");
    }

    for suffix in ["sses", "shes", "ches", "xes", "zes"] {
        if lower.ends_with(suffix) {
            return word[..word.len() - 2].to_string();
        }
    }

    if lower.ends_with("ss") || lower.ends_with("us") || lower.ends_with("is") {
        return word.to_string();
    }

    match word.strip_suffix('s') {
        Some(stem) if !stem.is_empty() => stem.to_string(),
        _ => word.to_string(),
    }
}
