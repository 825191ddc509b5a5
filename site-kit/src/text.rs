use unicode_normalization::UnicodeNormalization;

/// Folds text for accent-insensitive search: lowercase, decomposed, with
/// combining diacritical marks (U+0300..=U+036F) dropped, trimmed.
///
/// `"  Cañería PVC "` becomes `"caneria pvc"`.
pub fn normalize_text(text: &str) -> String {
    let folded: String = text
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();

    folded.trim().to_string()
}

fn is_combining_mark(c: char) -> bool {
    ('\u{0300}'..='\u{036f}').contains(&c)
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_accents_and_case() {
        assert_eq!(normalize_text("  Cañería PVC "), "caneria pvc");
        assert_eq!(normalize_text("CONSTRUCCIÓN"), "construccion");
        assert_eq!(normalize_text(""), "");
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html(r#"<img src="x" onerror='y'> & more"#),
            "&lt;img src=&quot;x&quot; onerror=&#39;y&#39;&gt; &amp; more"
        );
        assert_eq!(escape_html("Ladrillo 12x18"), "Ladrillo 12x18");
    }
}
