//! Icon key and component name derivation.

/// Derive the catalog key for an icon name: trimmed, lowercased, spaces
/// replaced with hyphens. Deterministic so resubmitting the same name
/// upserts the same record.
pub fn icon_key(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "-")
}

/// Pascal-case a separated key (`arrow-up-right` -> `ArrowUpRight`).
/// Exported for target adapters that emit component files.
pub fn component_name(icon_key: &str) -> String {
    icon_key
        .trim()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn icon_key_lowercases_and_hyphenates() {
        assert_eq!(icon_key("Arrow Up Right"), "arrow-up-right");
        assert_eq!(icon_key("  Home "), "home");
        assert_eq!(icon_key("already-keyed"), "already-keyed");
    }

    #[test]
    fn component_name_pascal_cases() {
        assert_eq!(component_name("arrow-up-right"), "ArrowUpRight");
        assert_eq!(component_name("home"), "Home");
        assert_eq!(component_name("2fa_badge"), "2faBadge");
    }
}
