use page_model::{NodeId, PageDocument};
use tracing::trace;

/// One parsed path step. Only the dialect [`compute_selector`] emits is
/// understood; anything else fails the parse and the lookup.
///
/// [`compute_selector`]: crate::compute_selector
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectorSegment {
    pub id: Option<String>,
    pub tag: Option<String>,
    pub class: Option<String>,
    pub nth: Option<usize>,
}

/// Find the first element in document order matching `selector`.
///
/// The first segment may anchor anywhere in the tree; each following segment
/// must match a direct child, mirroring the `" > "` combinator.
pub fn resolve(doc: &PageDocument, selector: &str) -> Option<NodeId> {
    let segments = parse_selector(selector)?;
    let first = segments.first()?;

    let mut matches: Vec<NodeId> = doc
        .document_order()
        .into_iter()
        .filter(|id| matches_segment(doc, *id, first))
        .collect();

    for segment in &segments[1..] {
        let mut next = Vec::new();
        for parent in matches {
            for child in doc.element_children(parent) {
                if matches_segment(doc, child, segment) {
                    next.push(child);
                }
            }
        }
        matches = next;
        if matches.is_empty() {
            break;
        }
    }

    let found = matches.into_iter().next();
    trace!(target: "selector.resolve", selector, found = ?found, "selector lookup");
    found
}

/// Split a selector path into segments, or `None` when any part falls
/// outside the emitted dialect.
pub fn parse_selector(selector: &str) -> Option<Vec<SelectorSegment>> {
    let trimmed = selector.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.split(" > ").map(parse_segment).collect()
}

fn parse_segment(part: &str) -> Option<SelectorSegment> {
    let part = part.trim();
    if part.is_empty() {
        return None;
    }
    if let Some(id) = part.strip_prefix('#') {
        if id.is_empty() {
            return None;
        }
        return Some(SelectorSegment {
            id: Some(id.to_string()),
            ..SelectorSegment::default()
        });
    }

    let mut segment = SelectorSegment::default();
    let (head, pseudo) = match part.split_once(':') {
        Some((head, pseudo)) => (head, Some(pseudo)),
        None => (part, None),
    };

    let (tag, class) = match head.split_once('.') {
        Some((tag, class)) => (tag, Some(class)),
        None => (head, None),
    };
    if tag.is_empty() {
        return None;
    }
    segment.tag = Some(tag.to_ascii_lowercase());
    if let Some(class) = class {
        if class.is_empty() {
            return None;
        }
        segment.class = Some(class.to_string());
    }

    if let Some(pseudo) = pseudo {
        let n = pseudo
            .strip_prefix("nth-of-type(")?
            .strip_suffix(')')?
            .parse::<usize>()
            .ok()?;
        if n == 0 {
            return None;
        }
        segment.nth = Some(n);
    }
    Some(segment)
}

fn matches_segment(doc: &PageDocument, node: NodeId, segment: &SelectorSegment) -> bool {
    let page_node = doc.node(node);
    if !page_node.is_element() {
        return false;
    }
    if let Some(id) = &segment.id {
        return page_node.attr("id") == Some(id.as_str());
    }
    let Some(tag) = &segment.tag else {
        return false;
    };
    if page_node.tag() != Some(tag.as_str()) {
        return false;
    }
    if let Some(class) = &segment.class {
        if !page_node.classes().contains(&class.as_str()) {
            return false;
        }
    }
    if let Some(nth) = segment.nth {
        return nth_of_type(doc, node, tag) == Some(nth);
    }
    true
}

/// 1-indexed position of `node` among same-tag element siblings.
fn nth_of_type(doc: &PageDocument, node: NodeId, tag: &str) -> Option<usize> {
    let parent = doc.parent(node)?;
    doc.element_children(parent)
        .into_iter()
        .filter(|sibling| doc.node(*sibling).tag() == Some(tag))
        .position(|sibling| sibling == node)
        .map(|index| index + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute_selector;
    use page_model::{samples, DocumentSpec, ElementSpec, NodeSpec, ViewportSpec};

    fn build(body: Vec<NodeSpec>) -> PageDocument {
        let spec = DocumentSpec {
            base_url: "https://app.local/".to_string(),
            title: None,
            viewport: ViewportSpec::default(),
            body,
        };
        PageDocument::from_spec(&spec).unwrap()
    }

    #[test]
    fn id_selector_resolves_anywhere() {
        let doc = build(vec![NodeSpec::Element(
            ElementSpec::new("div").with_child(NodeSpec::Element(
                ElementSpec::new("button").with_attr("id", "go"),
            )),
        )]);
        let node = resolve(&doc, "#go").unwrap();
        assert_eq!(doc.node(node).attr("id"), Some("go"));
    }

    #[test]
    fn computed_selectors_resolve_back_to_their_node() {
        let doc = page_model::PageDocument::from_spec(&samples::demo_document()).unwrap();
        for id in doc.document_order() {
            if !doc.node(id).is_element() {
                continue;
            }
            let selector = compute_selector(&doc, id).unwrap();
            assert_eq!(
                resolve(&doc, &selector),
                Some(id),
                "selector {selector} did not round-trip"
            );
        }
    }

    #[test]
    fn nth_segments_pick_the_right_sibling() {
        let doc = build(vec![NodeSpec::Element(
            ElementSpec::new("ul")
                .with_child(NodeSpec::Element(ElementSpec::new("li").with_text("one")))
                .with_child(NodeSpec::Element(ElementSpec::new("li").with_text("two"))),
        )]);
        let node = resolve(&doc, "ul > li:nth-of-type(2)").unwrap();
        assert_eq!(doc.visible_text(node), "two");
    }

    #[test]
    fn stale_selector_stops_resolving_after_restructure() {
        let before = build(vec![
            NodeSpec::Element(ElementSpec::new("div").with_attr("class", "hero")),
            NodeSpec::Element(ElementSpec::new("div")),
        ]);
        let hero = before.element_children(before.body())[0];
        let selector = compute_selector(&before, hero).unwrap();
        assert_eq!(selector, "div.hero");

        // Re-render drops the class; the old selector is best-effort only.
        let after = build(vec![
            NodeSpec::Element(ElementSpec::new("div")),
            NodeSpec::Element(ElementSpec::new("div")),
        ]);
        assert!(resolve(&after, &selector).is_none());
    }

    #[test]
    fn parse_exposes_segment_structure() {
        let segments = parse_selector("main > button.cta:nth-of-type(2)").unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].tag.as_deref(), Some("main"));
        let last = &segments[1];
        assert_eq!(last.tag.as_deref(), Some("button"));
        assert_eq!(last.class.as_deref(), Some("cta"));
        assert_eq!(last.nth, Some(2));
    }

    #[test]
    fn malformed_selectors_do_not_resolve() {
        let doc = build(vec![NodeSpec::Element(ElementSpec::new("div"))]);
        assert!(resolve(&doc, "").is_none());
        assert!(resolve(&doc, "div:first-child").is_none());
        assert!(resolve(&doc, "#").is_none());
        assert!(resolve(&doc, "div:nth-of-type(0)").is_none());
    }
}
