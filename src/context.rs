//! Knowledge base aggregation into a single prompt block.

use tracing::debug;

use crate::model::KnowledgeItem;

/// Per-document character cap applied to extracted sources.
pub const MAX_SOURCE_CHARS: usize = 15_000;

const CONTEXT_HEADER: &str = "\n\nGLOBAL KNOWLEDGE BASE & CONTEXT:\n";
const LINKS_LABEL: &str =
    "Relevant External Links (The user considers these sources authoritative):\n";
const DOCS_LABEL: &str = "\nOrganizational Knowledge (Presentations, Writings, Background):\n";

/// Render knowledge items as one context block.
///
/// Links are listed before documents, each group in insertion order.
/// Document content is cut at [`MAX_SOURCE_CHARS`] characters.
pub fn build_global_context(items: &[KnowledgeItem]) -> String {
    if items.is_empty() {
        return String::new();
    }

    let (links, docs): (Vec<&KnowledgeItem>, Vec<&KnowledgeItem>) =
        items.iter().partition(|item| item.is_link());

    let mut context = String::from(CONTEXT_HEADER);

    if !links.is_empty() {
        context.push_str(LINKS_LABEL);
        for link in &links {
            context.push_str(&format!("- {}: {}\n", link.title, link.content));
        }
    }

    if !docs.is_empty() {
        context.push_str(DOCS_LABEL);
        for doc in &docs {
            let content = truncate_chars(&doc.content, MAX_SOURCE_CHARS);
            if content.len() < doc.content.len() {
                debug!(
                    source = %doc.title,
                    original_chars = doc.content.chars().count(),
                    kept_chars = MAX_SOURCE_CHARS,
                    "Truncated knowledge source"
                );
            }
            context.push_str(&format!(
                "--- BEGIN SOURCE: {} ---\n{}\n--- END SOURCE ---\n",
                doc.title, content
            ));
        }
    }

    context
}

/// Prefix of `text` holding at most `max` characters.
fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_items() {
        assert_eq!(build_global_context(&[]), "");
    }

    #[test]
    fn test_links_precede_docs() {
        let items = vec![
            KnowledgeItem::file("Board Deck", "We house 300 people."),
            KnowledgeItem::link("HUD Report", "https://hud.gov/report"),
            KnowledgeItem::text("Mission", "Ending homelessness."),
            KnowledgeItem::link("Census", "https://census.gov"),
        ];
        let context = build_global_context(&items);

        let hud = context.find("- HUD Report: https://hud.gov/report").unwrap();
        let census = context.find("- Census: https://census.gov").unwrap();
        let deck = context.find("--- BEGIN SOURCE: Board Deck ---").unwrap();
        let mission = context.find("--- BEGIN SOURCE: Mission ---").unwrap();

        assert!(hud < census);
        assert!(census < deck);
        assert!(deck < mission);
        assert!(context.starts_with(CONTEXT_HEADER));
    }

    #[test]
    fn test_only_links_omits_docs_label() {
        let context = build_global_context(&[KnowledgeItem::link("A", "https://a.org")]);
        assert!(context.contains(LINKS_LABEL));
        assert!(!context.contains("Organizational Knowledge"));
    }

    #[test]
    fn test_doc_truncated_at_cap() {
        let long = "x".repeat(MAX_SOURCE_CHARS + 500);
        let context = build_global_context(&[KnowledgeItem::file("Long", long)]);
        let body = context
            .split("--- BEGIN SOURCE: Long ---\n")
            .nth(1)
            .and_then(|rest| rest.split("\n--- END SOURCE ---").next())
            .unwrap();
        assert_eq!(body.chars().count(), MAX_SOURCE_CHARS);
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        let text = "é".repeat(MAX_SOURCE_CHARS + 1);
        let cut = truncate_chars(&text, MAX_SOURCE_CHARS);
        assert_eq!(cut.chars().count(), MAX_SOURCE_CHARS);
        assert_eq!(truncate_chars("short", MAX_SOURCE_CHARS), "short");
    }

    #[test]
    fn test_every_title_present() {
        let items: Vec<KnowledgeItem> = (0..5)
            .map(|i| {
                if i % 2 == 0 {
                    KnowledgeItem::link(format!("Link {}", i), "https://x.org")
                } else {
                    KnowledgeItem::file(format!("Doc {}", i), "body")
                }
            })
            .collect();
        let context = build_global_context(&items);
        for item in &items {
            assert!(context.contains(&item.title), "missing {}", item.title);
        }
    }
}
