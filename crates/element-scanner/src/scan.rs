use std::time::Instant;

use page_model::{NodeId, PageDocument, PageNode};
use pagepilot_core_types::{ActionType, ElementId, InteractiveElement};
use tracing::debug;
use url::Url;

use crate::errors::ScanError;
use crate::metrics;

/// Attribute carrying the scan-local id, the executor's side channel for
/// re-locating a target without re-running the selector engine.
pub const SCAN_TAG_ATTR: &str = "data-pagepilot-id";

/// ARIA roles treated as interactive.
const INTERACTIVE_ROLES: &[&str] = &["button"];

/// Raw handler attributes that make an otherwise plain element a candidate.
const CLICK_HANDLER_ATTRIBUTES: &[&str] = &["onclick"];

/// Descriptor text is a matching hint, not a transcript.
const MAX_TEXT_CHARS: usize = 120;

/// Enumerate the currently interactive, visible elements.
///
/// Side effect: emitted elements are tagged with [`SCAN_TAG_ATTR`]; tags from
/// the previous generation are cleared first. Any sealed subtree fails the
/// whole scan with [`ScanError::AccessDenied`]; the session catches that and
/// reports an empty inventory.
pub fn scan(doc: &mut PageDocument) -> Result<Vec<InteractiveElement>, ScanError> {
    let started = Instant::now();
    let result = collect(doc);
    match &result {
        Ok(elements) => {
            metrics::record_scan(elements.len(), started.elapsed());
            debug!(
                target: "scanner.events",
                elements = elements.len(),
                "scan.completed"
            );
        }
        Err(error) => {
            metrics::record_failure(started.elapsed());
            debug!(target: "scanner.events", %error, "scan.denied");
        }
    }
    result
}

fn collect(doc: &mut PageDocument) -> Result<Vec<InteractiveElement>, ScanError> {
    doc.clear_attr(SCAN_TAG_ATTR);

    let mut elements = Vec::new();
    for node_id in doc.document_order() {
        let node = doc.node(node_id);
        if node.sealed {
            return Err(ScanError::AccessDenied);
        }
        if !node.is_element() || !is_candidate(node) || !is_visible(node) {
            continue;
        }

        let geometry = node.rect;
        let tag = node.tag().unwrap_or_default().to_uppercase();
        let (action_type, href) = classify(doc.base_url(), node);
        let text = normalize_text(&doc.visible_text(node_id));

        let id = ElementId(elements.len() as u32);
        elements.push(InteractiveElement {
            id,
            geometry,
            tag,
            text,
            action_type,
            href,
        });
        doc.set_attr(node_id, SCAN_TAG_ATTR, id.to_string());
    }
    Ok(elements)
}

/// Links, buttons, non-hidden inputs, text areas, ARIA buttons, and elements
/// carrying a raw click handler attribute.
fn is_candidate(node: &PageNode) -> bool {
    match node.tag() {
        Some("a") => node.attr("href").is_some(),
        Some("button") | Some("textarea") => true,
        Some("input") => node
            .attr("type")
            .map(|kind| !kind.eq_ignore_ascii_case("hidden"))
            .unwrap_or(true),
        Some(_) => {
            node.attr("role")
                .map(|role| {
                    INTERACTIVE_ROLES
                        .iter()
                        .any(|known| role.eq_ignore_ascii_case(known))
                })
                .unwrap_or(false)
                || CLICK_HANDLER_ATTRIBUTES
                    .iter()
                    .any(|attr| node.attr(attr).is_some())
        }
        None => false,
    }
}

/// A user must be able to see and hit the element right now.
fn is_visible(node: &PageNode) -> bool {
    node.rect.has_area()
        && !node.style.visibility_hidden
        && !node.style.display_none
        && !node.style.pointer_events_none
}

/// Priority order: form controls are `input`, real links are `navigate` with
/// a resolved target, everything else is `click`.
fn classify(base_url: &str, node: &PageNode) -> (ActionType, Option<String>) {
    match node.tag() {
        Some("input") | Some("textarea") => (ActionType::Input, None),
        Some("a") => match node.attr("href") {
            Some(href) if is_real_link(href) => {
                (ActionType::Navigate, Some(resolve_href(base_url, href)))
            }
            _ => (ActionType::Click, None),
        },
        _ => (ActionType::Click, None),
    }
}

/// Non-empty, not a same-page fragment, not a script pseudo-URL.
fn is_real_link(href: &str) -> bool {
    let trimmed = href.trim();
    !trimmed.is_empty()
        && !trimmed.starts_with('#')
        && !trimmed.to_ascii_lowercase().starts_with("javascript:")
}

fn resolve_href(base_url: &str, href: &str) -> String {
    Url::parse(base_url)
        .and_then(|base| base.join(href))
        .map(|resolved| resolved.to_string())
        .unwrap_or_else(|_| href.to_string())
}

fn normalize_text(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let lowered = collapsed.to_lowercase();
    if lowered.chars().count() <= MAX_TEXT_CHARS {
        lowered
    } else {
        lowered.chars().take(MAX_TEXT_CHARS).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use page_model::{samples, DocumentSpec, ElementSpec, NodeSpec, StyleSpec, ViewportSpec};
    use pagepilot_core_types::Rect;

    fn build(body: Vec<NodeSpec>) -> PageDocument {
        let spec = DocumentSpec {
            base_url: "https://preview.pagepilot.local/app/".to_string(),
            title: None,
            viewport: ViewportSpec::default(),
            body,
        };
        PageDocument::from_spec(&spec).unwrap()
    }

    fn rect() -> Rect {
        Rect::new(10.0, 10.0, 80.0, 24.0)
    }

    #[test]
    fn demo_document_inventory_is_complete_and_sequential() {
        let mut doc = PageDocument::from_spec(&samples::demo_document()).unwrap();
        let elements = scan(&mut doc).unwrap();

        assert_eq!(elements.len(), 11);
        for (index, element) in elements.iter().enumerate() {
            assert_eq!(element.id.0 as usize, index);
            assert!(element.geometry.has_area());
        }
    }

    #[test]
    fn classification_follows_priority_order() {
        let mut doc = PageDocument::from_spec(&samples::demo_document()).unwrap();
        let elements = scan(&mut doc).unwrap();

        let email = elements.iter().find(|e| e.tag == "INPUT").unwrap();
        assert_eq!(email.action_type, ActionType::Input);
        assert!(email.href.is_none());

        let features = elements.iter().find(|e| e.text == "features").unwrap();
        assert_eq!(features.action_type, ActionType::Navigate);
        assert_eq!(
            features.href.as_deref(),
            Some("https://preview.pagepilot.local/features")
        );

        // Fragment and script-scheme links are just clicks.
        let back_top = elements.iter().find(|e| e.text == "back to top").unwrap();
        assert_eq!(back_top.action_type, ActionType::Click);
        assert!(back_top.href.is_none());
        let share = elements.iter().find(|e| e.text == "share").unwrap();
        assert_eq!(share.action_type, ActionType::Click);

        let theme = elements.iter().find(|e| e.text == "toggle theme").unwrap();
        assert_eq!(theme.action_type, ActionType::Click);
        assert_eq!(theme.tag, "DIV");
    }

    #[test]
    fn invisible_and_hidden_elements_never_appear() {
        let mut doc = build(vec![
            NodeSpec::Element(ElementSpec::new("a").with_attr("href", "/zero")),
            NodeSpec::Element(
                ElementSpec::new("input")
                    .with_attr("type", "hidden")
                    .with_rect(rect()),
            ),
            NodeSpec::Element(ElementSpec {
                tag: "button".to_string(),
                rect: rect(),
                style: StyleSpec {
                    visibility: Some("hidden".to_string()),
                    ..StyleSpec::default()
                },
                ..ElementSpec::default()
            }),
            NodeSpec::Element(ElementSpec {
                tag: "button".to_string(),
                rect: rect(),
                style: StyleSpec {
                    pointer_events: Some("none".to_string()),
                    ..StyleSpec::default()
                },
                ..ElementSpec::default()
            }),
            NodeSpec::Element(
                ElementSpec::new("button")
                    .with_rect(rect())
                    .with_text("Real"),
            ),
        ]);

        let elements = scan(&mut doc).unwrap();
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].text, "real");
        assert_eq!(elements[0].tag, "BUTTON");
    }

    #[test]
    fn scan_tags_elements_and_retires_old_tags() {
        let mut doc = PageDocument::from_spec(&samples::demo_document()).unwrap();
        let first = scan(&mut doc).unwrap();

        let tagged = doc
            .document_order()
            .into_iter()
            .filter(|id| doc.attr(*id, SCAN_TAG_ATTR).is_some())
            .count();
        assert_eq!(tagged, first.len());
        assert!(doc.find_by_attr(SCAN_TAG_ATTR, "0").is_some());

        // A second generation re-tags from zero without leaving stale ids.
        let second = scan(&mut doc).unwrap();
        let tagged_again = doc
            .document_order()
            .into_iter()
            .filter(|id| doc.attr(*id, SCAN_TAG_ATTR).is_some())
            .count();
        assert_eq!(second.len(), first.len());
        assert_eq!(tagged_again, second.len());
    }

    #[test]
    fn sealed_frame_fails_the_scan() {
        let mut doc = PageDocument::from_spec(&samples::sealed_frame_document()).unwrap();
        assert!(matches!(scan(&mut doc), Err(ScanError::AccessDenied)));
    }

    #[test]
    fn text_is_lowercased_trimmed_and_bounded() {
        let mut doc = build(vec![NodeSpec::Element(
            ElementSpec::new("button")
                .with_rect(rect())
                .with_text("  SAVE   Draft  "),
        )]);
        let elements = scan(&mut doc).unwrap();
        assert_eq!(elements[0].text, "save draft");

        let long = "x".repeat(500);
        let mut doc = build(vec![NodeSpec::Element(
            ElementSpec::new("button").with_rect(rect()).with_text(long),
        )]);
        let elements = scan(&mut doc).unwrap();
        assert_eq!(elements[0].text.chars().count(), MAX_TEXT_CHARS);
    }

    #[test]
    fn input_value_feeds_descriptor_text() {
        let mut doc = build(vec![NodeSpec::Element(ElementSpec {
            tag: "input".to_string(),
            value: Some("Prefilled@Example.com".to_string()),
            rect: rect(),
            ..ElementSpec::default()
        })]);
        let elements = scan(&mut doc).unwrap();
        assert_eq!(elements[0].text, "prefilled@example.com");
    }
}
