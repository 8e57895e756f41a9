//! Text rendering for container diagnostics.
//!
//! Formats resolution chains, shortens fully qualified type names and
//! produces "did you mean?" candidates for unregistered contracts.

/// Renders a resolution chain as a single arrow-separated line.
///
/// # Examples
/// ```
/// use wasl_support::rendering::render_chain;
///
/// let chain = vec!["Mailer", "Transport", "Mailer"];
/// assert_eq!(render_chain(&chain), "Mailer → Transport → Mailer");
/// ```
pub fn render_chain(chain: &[impl AsRef<str>]) -> String {
    chain
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join(" → ")
}

/// Renders a resolution chain with every entry shortened first.
///
/// ```
/// use wasl_support::rendering::render_short_chain;
///
/// let chain = ["app::a::Mailer", "app::b::Transport"];
/// assert_eq!(render_short_chain(&chain), "Mailer → Transport");
/// ```
pub fn render_short_chain(chain: &[impl AsRef<str>]) -> String {
    let short: Vec<String> = chain
        .iter()
        .map(|s| shorten_type_name(s.as_ref()))
        .collect();
    render_chain(&short)
}

/// Shortens a fully qualified type name for display.
///
/// ```
/// use wasl_support::rendering::shorten_type_name;
///
/// assert_eq!(shorten_type_name("app::mail::Mailer"), "Mailer");
/// assert_eq!(
///     shorten_type_name("alloc::sync::Arc<dyn app::mail::Transport>"),
///     "Arc<dyn Transport>"
/// );
/// ```
pub fn shorten_type_name(full_name: &str) -> String {
    let mut result = String::with_capacity(full_name.len());
    let mut chars = full_name.chars().peekable();
    let mut segment = String::new();

    while let Some(ch) = chars.next() {
        match ch {
            ':' if chars.peek() == Some(&':') => {
                chars.next();
                segment.clear();
            }
            '<' | '>' | ',' | ' ' | '(' | ')' | '[' | ']' | ';' | '&' => {
                result.push_str(&segment);
                result.push(ch);
                segment.clear();
            }
            _ => segment.push(ch),
        }
    }

    result.push_str(&segment);
    result
}

/// Picks registered names that look like `requested`, best match first.
///
/// Substring hits on the full name score highest, then hits on the
/// shortened name, then a shared prefix of at least three characters.
pub fn suggest_similar<'a>(
    requested: &str,
    available: impl IntoIterator<Item = &'a str>,
    max_suggestions: usize,
) -> Vec<String> {
    let requested_lower = requested.to_lowercase();
    let requested_short = shorten_type_name(requested).to_lowercase();

    let mut scored: Vec<(&str, usize)> = available
        .into_iter()
        .filter(|name| *name != requested)
        .filter_map(|name| {
            let name_lower = name.to_lowercase();
            let name_short = shorten_type_name(name).to_lowercase();

            if name_lower.contains(&requested_lower) || requested_lower.contains(&name_lower) {
                return Some((name, 100));
            }

            if name_short.contains(&requested_short) || requested_short.contains(&name_short) {
                return Some((name, 80));
            }

            let common = name_short
                .chars()
                .zip(requested_short.chars())
                .take_while(|(a, b)| a == b)
                .count();

            (common >= 3).then_some((name, common * 10))
        })
        .collect();

    scored.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    scored
        .into_iter()
        .take(max_suggestions)
        .map(|(name, _)| name.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_simple_chain() {
        let chain = vec!["A", "B", "C", "A"];
        assert_eq!(render_chain(&chain), "A → B → C → A");
    }

    #[test]
    fn render_empty_chain() {
        let chain: Vec<&str> = vec![];
        assert_eq!(render_chain(&chain), "");
    }

    #[test]
    fn render_short_chain_strips_paths() {
        let chain = ["crate::a::A", "crate::b::B", "crate::a::A"];
        assert_eq!(render_short_chain(&chain), "A → B → A");
    }

    #[test]
    fn shorten_simple_path() {
        assert_eq!(shorten_type_name("my_app::services::Mailer"), "Mailer");
    }

    #[test]
    fn shorten_with_generics() {
        assert_eq!(
            shorten_type_name("alloc::sync::Arc<dyn my_app::traits::Clock>"),
            "Arc<dyn Clock>"
        );
        assert_eq!(
            shorten_type_name("core::option::Option<(alloc::string::String, u8)>"),
            "Option<(String, u8)>"
        );
    }

    #[test]
    fn shorten_no_path() {
        assert_eq!(shorten_type_name("String"), "String");
    }

    #[test]
    fn suggest_similar_types() {
        let available = [
            "my_app::Mailer",
            "my_app::MailerConfig",
            "my_app::Clock",
        ];

        let suggestions = suggest_similar("my_app::Mail", available, 3);
        assert_eq!(suggestions.len(), 2);
        assert!(suggestions.iter().all(|s| s.contains("Mailer")));
    }

    #[test]
    fn suggest_respects_limit_and_skips_self() {
        let available = ["a::Store", "a::StoreA", "a::StoreB", "a::StoreC"];
        let suggestions = suggest_similar("a::Store", available, 2);
        assert_eq!(suggestions.len(), 2);
        assert!(!suggestions.contains(&"a::Store".to_string()));
    }

    #[test]
    fn suggest_no_match() {
        let suggestions = suggest_similar("XyzAbcDef", ["my_app::Clock"], 3);
        assert!(suggestions.is_empty());
    }
}
