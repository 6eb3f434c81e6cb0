//! Structural color rewriting across the three representations a vector
//! graphic carries colors in: element attributes, inline style declaration
//! lists, and embedded stylesheet text.
//!
//! All map keys and document values are normalized before comparison so that
//! `#ABC`, `#aabbcc`, `rgb(170, 187, 204)` and `hsl(...)` equivalents all
//! address the same entry. Keywords, `url(...)` paint servers and
//! `var(...)` custom-property references are sentinels: never normalized
//! into colors and never substituted.

use std::collections::BTreeMap;

use xmltree::{Element, XMLNode};

/// Attributes the rewrite pass inspects on every element.
pub const COLOR_ATTRIBUTES: [&str; 6] =
    ["fill", "stroke", "stop-color", "flood-color", "lighting-color", "color"];

/// Normalize a color expression to its canonical comparison form.
///
/// Returns `None` for empty input. Hex is case-folded with short (3/4-digit)
/// forms expanded; `rgb()`/`rgba()` and `hsl()`/`hsla()` with integer
/// channels and unit alpha collapse to hex; sentinels pass through
/// unmodified (with `currentColor` keeping its canonical capitalization).
pub fn normalize(input: &str) -> Option<String> {
    let value = input.trim();
    if value.is_empty() {
        return None;
    }

    let lowered = value.to_ascii_lowercase();
    if lowered == "currentcolor" {
        return Some("currentColor".to_string());
    }
    if is_sentinel(&lowered) {
        return Some(lowered);
    }

    if let Some(hex) = lowered.strip_prefix('#') {
        if matches!(hex.len(), 3 | 4 | 6 | 8) && hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Some(format!("#{}", expand_hex(hex)));
        }
        return Some(lowered);
    }

    if let Some(normalized) = normalize_rgb(&lowered) {
        return Some(normalized);
    }
    if let Some(normalized) = normalize_hsl(&lowered) {
        return Some(normalized);
    }

    Some(lowered)
}

/// True for values the rewrite pass must never touch: paint keywords,
/// `url(...)` references and CSS custom-property references. Expects
/// lowercased input.
fn is_sentinel(lowered: &str) -> bool {
    matches!(lowered, "none" | "transparent" | "currentcolor" | "inherit" | "initial" | "unset")
        || lowered.starts_with("url(")
        || lowered.starts_with("var(")
}

fn expand_hex(hex: &str) -> String {
    match hex.len() {
        3 | 4 => hex.chars().flat_map(|c| [c, c]).collect(),
        _ => hex.to_string(),
    }
}

fn channel_hex(n: u32) -> String {
    format!("{:02x}", n.min(255))
}

fn rgb_hex(r: u32, g: u32, b: u32) -> String {
    format!("#{}{}{}", channel_hex(r), channel_hex(g), channel_hex(b))
}

fn parse_alpha(part: &str) -> Option<f64> {
    part.trim().parse::<f64>().ok()
}

fn is_opaque(alpha: Option<f64>) -> bool {
    match alpha {
        None => true,
        Some(a) => !a.is_finite() || (a - 1.0).abs() < f64::EPSILON,
    }
}

/// `rgb(r, g, b)` / `rgba(r, g, b, a)` with integer channels, plus the
/// space-separated `rgb(r g b / a)` form. Unit alpha collapses to hex;
/// other alphas re-serialize in a canonical spelling.
fn normalize_rgb(lowered: &str) -> Option<String> {
    let inner = lowered
        .strip_prefix("rgba(")
        .or_else(|| lowered.strip_prefix("rgb("))?
        .strip_suffix(')')?;

    if inner.contains(',') {
        let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
        if parts.len() != 3 && parts.len() != 4 {
            return None;
        }
        let r = parts[0].parse::<u32>().ok()?;
        let g = parts[1].parse::<u32>().ok()?;
        let b = parts[2].parse::<u32>().ok()?;
        let alpha = if parts.len() == 4 { Some(parse_alpha(parts[3])?) } else { None };
        if is_opaque(alpha) {
            return Some(rgb_hex(r, g, b));
        }
        return Some(format!("rgba({},{},{},{})", r, g, b, alpha.unwrap_or(1.0)));
    }

    let (channels, alpha) = match inner.split_once('/') {
        Some((channels, alpha)) => (channels, Some(parse_alpha(alpha)?)),
        None => (inner, None),
    };
    let parts: Vec<&str> = channels.split_whitespace().collect();
    if parts.len() != 3 {
        return None;
    }
    let r = parts[0].parse::<u32>().ok()?;
    let g = parts[1].parse::<u32>().ok()?;
    let b = parts[2].parse::<u32>().ok()?;
    if is_opaque(alpha) {
        return Some(rgb_hex(r, g, b));
    }
    Some(format!("rgb({} {} {} / {})", r, g, b, alpha.unwrap_or(1.0)))
}

/// `hsl(h, s%, l%)` / `hsla(h, s%, l%, a)` (comma or space separated).
/// Unit alpha converts to hex; translucent values fall through to the
/// caller's lowercased passthrough.
fn normalize_hsl(lowered: &str) -> Option<String> {
    let inner = lowered
        .strip_prefix("hsla(")
        .or_else(|| lowered.strip_prefix("hsl("))?
        .strip_suffix(')')?;

    let (channels, alpha) = if inner.contains(',') {
        let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
        if parts.len() != 3 && parts.len() != 4 {
            return None;
        }
        let alpha = if parts.len() == 4 { Some(parse_alpha(parts[3])?) } else { None };
        (parts[..3].to_vec(), alpha)
    } else {
        let (channels, alpha) = match inner.split_once('/') {
            Some((channels, alpha)) => (channels, Some(parse_alpha(alpha)?)),
            None => (inner, None),
        };
        let parts: Vec<&str> = channels.split_whitespace().collect();
        if parts.len() != 3 {
            return None;
        }
        (parts, alpha)
    };

    if !is_opaque(alpha) {
        return None;
    }

    let h = channels[0].trim_end_matches("deg").trim().parse::<f64>().ok()?;
    let s = channels[1].strip_suffix('%')?.trim().parse::<f64>().ok()?;
    let l = channels[2].strip_suffix('%')?.trim().parse::<f64>().ok()?;
    let (r, g, b) = hsl_to_rgb(h, s, l);
    Some(rgb_hex(r, g, b))
}

fn hsl_to_rgb(h: f64, s: f64, l: f64) -> (u32, u32, u32) {
    let h = ((h % 360.0) + 360.0) % 360.0;
    let s = (s / 100.0).clamp(0.0, 1.0);
    let l = (l / 100.0).clamp(0.0, 1.0);

    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let hp = h / 60.0;
    let x = c * (1.0 - (hp % 2.0 - 1.0).abs());
    let (r1, g1, b1) = match hp as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = l - c / 2.0;
    (
        ((r1 + m) * 255.0).round() as u32,
        ((g1 + m) * 255.0).round() as u32,
        ((b1 + m) * 255.0).round() as u32,
    )
}

/// A substitution map with normalized source keys. Keys that normalize to
/// sentinels are dropped at construction so the map can never rewrite
/// `currentColor`, `none`, `url(...)` or `var(...)`.
#[derive(Debug, Clone, Default)]
pub struct ColorMap {
    entries: BTreeMap<String, String>,
}

impl ColorMap {
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a String, &'a String)>) -> Self {
        let mut entries = BTreeMap::new();
        for (from, to) in pairs {
            if let Some(key) = normalize(from) {
                if !is_sentinel(&key.to_ascii_lowercase()) {
                    entries.insert(key, to.clone());
                }
            }
        }
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replacement for a raw document value, or `None` when the value is a
    /// sentinel or simply unmapped.
    pub fn lookup(&self, raw: &str) -> Option<&str> {
        let normalized = normalize(raw)?;
        if is_sentinel(&normalized.to_ascii_lowercase()) {
            return None;
        }
        self.entries.get(&normalized).map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RewriteOptions {
    pub inline_style: bool,
    /// Textual hex substitution inside `<style>` text. Coarser than the
    /// attribute passes (no CSS selector parsing), so opt-in.
    pub style_element_text: bool,
}

impl Default for RewriteOptions {
    fn default() -> Self {
        Self { inline_style: true, style_element_text: false }
    }
}

/// Walk the document tree and substitute mapped colors in place.
pub fn rewrite_element(el: &mut Element, map: &ColorMap, opts: &RewriteOptions) {
    for attr in COLOR_ATTRIBUTES {
        let replacement = el.attributes.get(attr).and_then(|v| map.lookup(v)).map(str::to_string);
        if let Some(replacement) = replacement {
            el.attributes.insert(attr.to_string(), replacement);
        }
    }

    if opts.inline_style {
        let rewritten = el.attributes.get("style").and_then(|s| rewrite_declarations(s, map));
        if let Some(rewritten) = rewritten {
            el.attributes.insert("style".to_string(), rewritten);
        }
    }

    if opts.style_element_text && el.name == "style" {
        for child in &mut el.children {
            match child {
                XMLNode::Text(text) | XMLNode::CData(text) => {
                    *text = rewrite_css_text(text, map);
                }
                _ => {}
            }
        }
    }

    for child in &mut el.children {
        if let XMLNode::Element(child_el) = child {
            rewrite_element(child_el, map, opts);
        }
    }
}

fn is_color_property(property: &str) -> bool {
    COLOR_ATTRIBUTES.iter().any(|a| property.eq_ignore_ascii_case(a))
}

/// Split a declaration list on `;`, then each declaration on the first `:`.
fn parse_declarations(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|part| {
            let part = part.trim();
            if part.is_empty() {
                return None;
            }
            let (property, value) = part.split_once(':')?;
            Some((property.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

fn serialize_declarations(decls: &[(String, String)]) -> String {
    decls
        .iter()
        .map(|(property, value)| format!("{}: {}", property, value))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Substitute mapped values in an inline declaration list, preserving the
/// original property order. `None` when nothing matched, so untouched
/// attributes are never re-serialized.
fn rewrite_declarations(style: &str, map: &ColorMap) -> Option<String> {
    let mut decls = parse_declarations(style);
    let mut changed = false;

    for (property, value) in &mut decls {
        if !is_color_property(property) {
            continue;
        }
        if let Some(replacement) = map.lookup(value) {
            *value = replacement.to_string();
            changed = true;
        }
    }

    changed.then(|| serialize_declarations(&decls))
}

/// Best-effort textual substitution across embedded stylesheet text: every
/// normalized 6-digit hex key is replaced case-insensitively, along with its
/// short form when all three channel pairs are doubled. 8-digit (alpha) hex
/// keys are skipped; they have no unambiguous textual form here.
fn rewrite_css_text(text: &str, map: &ColorMap) -> String {
    let mut out = text.to_string();

    for (from, to) in &map.entries {
        let Some(hex) = from.strip_prefix('#') else { continue };
        if hex.len() != 6 {
            continue;
        }

        out = replace_all_ci(&out, from, to);

        let bytes = hex.as_bytes();
        let doubled =
            bytes[0] == bytes[1] && bytes[2] == bytes[3] && bytes[4] == bytes[5];
        if doubled {
            let short = format!("#{}{}{}", &hex[0..1], &hex[2..3], &hex[4..5]);
            out = replace_all_ci(&out, &short, to);
        }
    }

    out
}

/// Case-insensitive replace for ASCII needles.
fn replace_all_ci(haystack: &str, needle: &str, replacement: &str) -> String {
    if needle.is_empty() {
        return haystack.to_string();
    }
    let lower_haystack = haystack.to_ascii_lowercase();
    let lower_needle = needle.to_ascii_lowercase();

    let mut out = String::with_capacity(haystack.len());
    let mut cursor = 0;
    while let Some(offset) = lower_haystack[cursor..].find(&lower_needle) {
        let start = cursor + offset;
        out.push_str(&haystack[cursor..start]);
        out.push_str(replacement);
        cursor = start + needle.len();
    }
    out.push_str(&haystack[cursor..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map_of(pairs: &[(&str, &str)]) -> ColorMap {
        let owned: Vec<(String, String)> =
            pairs.iter().map(|(f, t)| (f.to_string(), t.to_string())).collect();
        ColorMap::from_pairs(owned.iter().map(|(f, t)| (f, t)))
    }

    #[test]
    fn short_hex_expands_to_full() {
        assert_eq!(normalize("#ABC").unwrap(), "#aabbcc");
        assert_eq!(normalize("#abc").unwrap(), normalize("#AABBCC").unwrap());
        assert_eq!(normalize("#f00f").unwrap(), "#ff0000ff");
    }

    #[test]
    fn rgb_with_unit_alpha_collapses_to_hex() {
        assert_eq!(normalize("rgb(170,187,204)").unwrap(), "#aabbcc");
        assert_eq!(normalize("rgba(170, 187, 204, 1)").unwrap(), "#aabbcc");
        assert_eq!(normalize("rgb(170 187 204)").unwrap(), "#aabbcc");
        assert_eq!(normalize("rgb(170 187 204 / 1)").unwrap(), "#aabbcc");
    }

    #[test]
    fn translucent_rgb_keeps_alpha() {
        assert_eq!(normalize("rgba(1, 2, 3, 0.5)").unwrap(), "rgba(1,2,3,0.5)");
        assert_eq!(normalize("rgb(1 2 3 / 0.5)").unwrap(), "rgb(1 2 3 / 0.5)");
    }

    #[test]
    fn hsl_with_unit_alpha_collapses_to_hex() {
        assert_eq!(normalize("hsl(0, 100%, 50%)").unwrap(), "#ff0000");
        assert_eq!(normalize("hsl(120deg, 100%, 50%)").unwrap(), "#00ff00");
        assert_eq!(normalize("hsla(240, 100%, 50%, 1)").unwrap(), "#0000ff");
    }

    #[test]
    fn sentinels_pass_through() {
        assert_eq!(normalize("none").unwrap(), "none");
        assert_eq!(normalize("CurrentColor").unwrap(), "currentColor");
        assert_eq!(normalize("url(#grad)").unwrap(), "url(#grad)");
        assert_eq!(normalize("var(--primary)").unwrap(), "var(--primary)");
        assert_eq!(normalize(""), None);
    }

    #[test]
    fn sentinel_map_keys_are_dropped() {
        let map = map_of(&[("none", "#000000"), ("#abc", "currentColor")]);
        assert_eq!(map.lookup("none"), None);
        assert_eq!(map.lookup("#AABBCC"), Some("currentColor"));
    }

    #[test]
    fn attribute_rewrite_substitutes_equivalent_forms() {
        let svg = r##"<svg xmlns="http://www.w3.org/2000/svg"><path fill="#ABC" stroke="rgb(170,187,204)"/><circle fill="none"/></svg>"##;
        let mut doc = Element::parse(svg.as_bytes()).unwrap();
        let map = map_of(&[("#aabbcc", "currentColor")]);
        rewrite_element(&mut doc, &map, &RewriteOptions::default());

        let path = doc.children[0].as_element().unwrap();
        assert_eq!(path.attributes.get("fill").map(String::as_str), Some("currentColor"));
        assert_eq!(path.attributes.get("stroke").map(String::as_str), Some("currentColor"));
        let circle = doc.children[1].as_element().unwrap();
        assert_eq!(circle.attributes.get("fill").map(String::as_str), Some("none"));
    }

    #[test]
    fn inline_style_preserves_declaration_order() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg"><rect style="stroke-width: 2; fill: #AABBCC; opacity: 0.5"/></svg>"#;
        let mut doc = Element::parse(svg.as_bytes()).unwrap();
        let map = map_of(&[("#aabbcc", "var(--primary)")]);
        rewrite_element(&mut doc, &map, &RewriteOptions::default());

        let rect = doc.children[0].as_element().unwrap();
        assert_eq!(
            rect.attributes.get("style").map(String::as_str),
            Some("stroke-width: 2; fill: var(--primary); opacity: 0.5")
        );
    }

    #[test]
    fn unmatched_inline_style_is_untouched() {
        let original = "fill:#123456 ;stroke:none";
        let svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg"><rect style="{}"/></svg>"#,
            original
        );
        let mut doc = Element::parse(svg.as_bytes()).unwrap();
        let map = map_of(&[("#aabbcc", "currentColor")]);
        rewrite_element(&mut doc, &map, &RewriteOptions::default());

        let rect = doc.children[0].as_element().unwrap();
        // No substitution occurred, so the odd spacing survives verbatim.
        assert_eq!(rect.attributes.get("style").map(String::as_str), Some(original));
    }

    #[test]
    fn style_text_replaces_full_and_short_forms() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg"><style>.a{fill:#AABBCC}.b{fill:#abc}</style></svg>"#;
        let mut doc = Element::parse(svg.as_bytes()).unwrap();
        let map = map_of(&[("#aabbcc", "currentColor")]);
        rewrite_element(
            &mut doc,
            &map,
            &RewriteOptions { inline_style: true, style_element_text: true },
        );

        let style = doc.children[0].as_element().unwrap();
        let text = style.children.iter().find_map(|c| c.as_text()).unwrap();
        assert_eq!(text, ".a{fill:currentColor}.b{fill:currentColor}");
    }

    #[test]
    fn style_text_skips_undoubled_short_form() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg"><style>.a{fill:#123456}.b{fill:#135}</style></svg>"#;
        let mut doc = Element::parse(svg.as_bytes()).unwrap();
        let map = map_of(&[("#123456", "currentColor")]);
        rewrite_element(
            &mut doc,
            &map,
            &RewriteOptions { inline_style: true, style_element_text: true },
        );

        let style = doc.children[0].as_element().unwrap();
        let text = style.children.iter().find_map(|c| c.as_text()).unwrap();
        // #123456 is not short-expressible, so #135 must survive.
        assert_eq!(text, ".a{fill:currentColor}.b{fill:#135}");
    }

    #[test]
    fn style_text_disabled_by_default() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg"><style>.a{fill:#aabbcc}</style></svg>"#;
        let mut doc = Element::parse(svg.as_bytes()).unwrap();
        let map = map_of(&[("#aabbcc", "currentColor")]);
        rewrite_element(&mut doc, &map, &RewriteOptions::default());

        let style = doc.children[0].as_element().unwrap();
        let text = style.children.iter().find_map(|c| c.as_text()).unwrap();
        assert_eq!(text, ".a{fill:#aabbcc}");
    }

    #[test]
    fn replace_all_ci_is_case_insensitive() {
        assert_eq!(replace_all_ci("#AaBbCc and #aabbcc", "#aabbcc", "X"), "X and X");
    }
}
