use page_model::{NodeId, PageDocument};

const ROOT_PREFIX: &str = "html > body > ";

/// Compute the path expression for `node`, walking up to the document root
/// and prepending one segment per ancestor.
///
/// Returns `None` for non-element nodes; callers must check before use.
pub fn compute_selector(doc: &PageDocument, node: NodeId) -> Option<String> {
    if !doc.node(node).is_element() {
        return None;
    }

    let mut segments: Vec<String> = Vec::new();
    let mut current = node;
    loop {
        let page_node = doc.node(current);
        let tag = page_node.tag()?;

        // An id is assumed page-unique, so it both names this step and ends
        // the ascent.
        if let Some(id) = page_node.attr("id") {
            if !id.is_empty() {
                segments.push(format!("#{id}"));
                break;
            }
        }

        let mut segment = tag.to_string();
        match doc.parent(current) {
            Some(parent) => {
                let siblings = doc.element_children(parent);
                if let Some(class) = sibling_unique_class(doc, current, &siblings) {
                    segment.push('.');
                    segment.push_str(class);
                } else {
                    let same_tag: Vec<NodeId> = siblings
                        .iter()
                        .copied()
                        .filter(|sibling| doc.node(*sibling).tag() == Some(tag))
                        .collect();
                    if same_tag.len() > 1 {
                        let preceding = same_tag
                            .iter()
                            .position(|sibling| *sibling == current)
                            .unwrap_or(0);
                        segment.push_str(&format!(":nth-of-type({})", preceding + 1));
                    }
                }
                segments.push(segment);
                current = parent;
            }
            None => {
                segments.push(segment);
                break;
            }
        }
    }

    segments.reverse();
    let selector = segments.join(" > ");
    // The implicit document root never appears in emitted selectors.
    match selector.strip_prefix(ROOT_PREFIX) {
        Some(stripped) => Some(stripped.to_string()),
        None => Some(selector),
    }
}

/// The first class on `node` that exactly one of `siblings` carries.
fn sibling_unique_class<'doc>(
    doc: &'doc PageDocument,
    node: NodeId,
    siblings: &[NodeId],
) -> Option<&'doc str> {
    doc.node(node).classes().into_iter().find(|class| {
        siblings
            .iter()
            .filter(|sibling| doc.node(**sibling).classes().contains(class))
            .count()
            == 1
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use page_model::{DocumentSpec, ElementSpec, NodeSpec, ViewportSpec};
    use pagepilot_core_types::Rect;

    fn build(body: Vec<NodeSpec>) -> PageDocument {
        let spec = DocumentSpec {
            base_url: "https://app.local/".to_string(),
            title: None,
            viewport: ViewportSpec::default(),
            body,
        };
        PageDocument::from_spec(&spec).unwrap()
    }

    fn rect() -> Rect {
        Rect::new(0.0, 0.0, 50.0, 20.0)
    }

    #[test]
    fn id_wins_at_any_depth() {
        let doc = build(vec![NodeSpec::Element(
            ElementSpec::new("div").with_child(NodeSpec::Element(
                ElementSpec::new("ul").with_child(NodeSpec::Element(
                    ElementSpec::new("li").with_child(NodeSpec::Element(
                        ElementSpec::new("span")
                            .with_attr("id", "deep")
                            .with_rect(rect()),
                    )),
                )),
            )),
        )]);
        let span = doc
            .document_order()
            .into_iter()
            .find(|id| doc.node(*id).attr("id") == Some("deep"))
            .unwrap();
        assert_eq!(compute_selector(&doc, span).as_deref(), Some("#deep"));
    }

    #[test]
    fn same_tag_siblings_get_ordered_nth_of_type() {
        let doc = build(vec![NodeSpec::Element(
            ElementSpec::new("ul")
                .with_child(NodeSpec::Element(ElementSpec::new("li").with_rect(rect())))
                .with_child(NodeSpec::Element(ElementSpec::new("li").with_rect(rect())))
                .with_child(NodeSpec::Element(ElementSpec::new("li").with_rect(rect()))),
        )]);
        let ul = doc.element_children(doc.body())[0];
        let items = doc.element_children(ul);

        let selectors: Vec<String> = items
            .iter()
            .map(|item| compute_selector(&doc, *item).unwrap())
            .collect();
        assert_eq!(
            selectors,
            vec![
                "ul > li:nth-of-type(1)",
                "ul > li:nth-of-type(2)",
                "ul > li:nth-of-type(3)",
            ]
        );
    }

    #[test]
    fn sibling_unique_class_beats_position() {
        let doc = build(vec![
            NodeSpec::Element(ElementSpec::new("div").with_attr("class", "hero primary")),
            NodeSpec::Element(ElementSpec::new("div").with_attr("class", "primary")),
        ]);
        let hero = doc.element_children(doc.body())[0];
        // "primary" is shared, "hero" is unique among the siblings.
        assert_eq!(compute_selector(&doc, hero).as_deref(), Some("div.hero"));
    }

    #[test]
    fn shared_class_falls_back_to_nth() {
        let doc = build(vec![
            NodeSpec::Element(ElementSpec::new("div").with_attr("class", "card")),
            NodeSpec::Element(ElementSpec::new("div").with_attr("class", "card")),
        ]);
        let second = doc.element_children(doc.body())[1];
        assert_eq!(
            compute_selector(&doc, second).as_deref(),
            Some("div:nth-of-type(2)")
        );
    }

    #[test]
    fn lone_element_keeps_bare_tag() {
        let doc = build(vec![NodeSpec::Element(
            ElementSpec::new("main").with_child(NodeSpec::Element(
                ElementSpec::new("button").with_rect(rect()),
            )),
        )]);
        let main = doc.element_children(doc.body())[0];
        let button = doc.element_children(main)[0];
        assert_eq!(
            compute_selector(&doc, button).as_deref(),
            Some("main > button")
        );
    }

    #[test]
    fn body_itself_is_not_stripped() {
        let doc = build(vec![]);
        assert_eq!(
            compute_selector(&doc, doc.body()).as_deref(),
            Some("html > body")
        );
    }

    #[test]
    fn text_nodes_have_no_selector() {
        let doc = build(vec![NodeSpec::Element(
            ElementSpec::new("p").with_text("plain words"),
        )]);
        let p = doc.element_children(doc.body())[0];
        let text = doc.children(p)[0];
        assert!(compute_selector(&doc, text).is_none());
    }
}
