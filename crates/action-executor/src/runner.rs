use std::time::Instant;

use element_scanner::SCAN_TAG_ATTR;
use page_model::{NodeId, NoticeKind, PageDocument};
use pagepilot_core_types::{ActionCommand, ActionPayload, ActionVerb, ElementId};
use tracing::debug;

use crate::tempo::TypingTempo;

/// Local outcome of one dispatch. Stays inside the sandbox; nothing here is
/// reported back across the bridge.
#[derive(Clone, Copy, Debug)]
pub struct ExecReport {
    pub verb: ActionVerb,
    pub performed: bool,
    pub target: Option<ElementId>,
    pub latency_ms: u128,
}

/// Perform one action against the document. Infallible by contract: misses
/// and malformed payloads degrade to a no-op report.
pub async fn execute(
    doc: &mut PageDocument,
    command: &ActionCommand,
    tempo: TypingTempo,
) -> ExecReport {
    let started = Instant::now();
    let performed = match command.verb {
        ActionVerb::Click => run_click(doc, &command.payload),
        ActionVerb::Scroll => run_scroll(doc, &command.payload),
        ActionVerb::Type => run_type(doc, &command.payload, tempo).await,
    };
    let report = ExecReport {
        verb: command.verb,
        performed,
        target: command.payload.id,
        latency_ms: started.elapsed().as_millis(),
    };
    debug!(
        target: "executor.events",
        verb = %report.verb,
        performed = report.performed,
        target = ?report.target,
        "action.executed"
    );
    report
}

/// Resolve a scan-local id to its tagged node. A stale or unknown id is a
/// miss, not an error; the next scan generation makes ids meaningful again.
fn locate(doc: &PageDocument, payload: &ActionPayload) -> Option<NodeId> {
    let id = payload.id?;
    doc.find_by_attr(SCAN_TAG_ATTR, &id.to_string())
}

fn run_click(doc: &mut PageDocument, payload: &ActionPayload) -> bool {
    match locate(doc, payload) {
        Some(node) => {
            doc.focus(node);
            doc.activate(node);
            true
        }
        None => {
            debug!(target: "executor.events", id = ?payload.id, "click.miss");
            false
        }
    }
}

fn run_scroll(doc: &mut PageDocument, payload: &ActionPayload) -> bool {
    match payload.amount {
        Some(amount) => {
            doc.scroll_by(amount);
            true
        }
        None => false,
    }
}

/// Clear, then reveal the text one character per tick, then synthesize the
/// input/change pair reactive code listens for. The plain value write alone
/// would be invisible to framework state.
async fn run_type(doc: &mut PageDocument, payload: &ActionPayload, tempo: TypingTempo) -> bool {
    let Some(node) = locate(doc, payload) else {
        debug!(target: "executor.events", id = ?payload.id, "type.miss");
        return false;
    };
    let Some(text) = payload.text.as_deref() else {
        return false;
    };

    doc.focus(node);
    doc.set_value(node, "");

    let chars: Vec<char> = text.chars().collect();
    let mut revealed = String::with_capacity(text.len());
    for (index, ch) in chars.iter().enumerate() {
        revealed.push(*ch);
        doc.set_value(node, revealed.clone());
        if index + 1 < chars.len() {
            tokio::time::sleep(tempo.per_char).await;
        }
    }

    doc.push_notice(node, NoticeKind::Input);
    doc.push_notice(node, NoticeKind::Change);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use element_scanner::scan;
    use page_model::{samples, DocumentSpec, ElementSpec, NodeSpec, ViewportSpec};
    use pagepilot_core_types::Rect;

    fn input_doc() -> PageDocument {
        let spec = DocumentSpec {
            base_url: "https://app.local/".to_string(),
            title: None,
            viewport: ViewportSpec::default(),
            body: vec![
                NodeSpec::Element(
                    ElementSpec::new("input")
                        .with_attr("id", "name")
                        .with_rect(Rect::new(0.0, 0.0, 120.0, 30.0)),
                ),
                NodeSpec::Element(
                    ElementSpec::new("button")
                        .with_rect(Rect::new(40.0, 0.0, 90.0, 30.0))
                        .with_text("Save"),
                ),
            ],
        };
        PageDocument::from_spec(&spec).unwrap()
    }

    fn quick() -> TypingTempo {
        TypingTempo::from_millis(1)
    }

    #[tokio::test]
    async fn typing_sets_value_and_fires_one_input_then_one_change() {
        let mut doc = input_doc();
        let elements = scan(&mut doc).unwrap();
        let input = elements
            .iter()
            .find(|element| element.tag == "INPUT")
            .unwrap();

        let report = execute(&mut doc, &ActionCommand::type_text(input.id, "abc"), quick()).await;
        assert!(report.performed);

        let node = doc.find_by_attr(SCAN_TAG_ATTR, &input.id.to_string()).unwrap();
        assert_eq!(doc.value(node), Some("abc"));

        let notices: Vec<_> = doc
            .notices()
            .iter()
            .filter(|notice| notice.node == node)
            .map(|notice| notice.kind)
            .collect();
        assert_eq!(notices, vec![NoticeKind::Input, NoticeKind::Change]);
    }

    #[tokio::test]
    async fn typing_paces_characters_on_the_cadence() {
        let mut doc = input_doc();
        let elements = scan(&mut doc).unwrap();
        let input = elements
            .iter()
            .find(|element| element.tag == "INPUT")
            .unwrap();

        let started = Instant::now();
        execute(
            &mut doc,
            &ActionCommand::type_text(input.id, "abcd"),
            TypingTempo::from_millis(20),
        )
        .await;
        // Three inter-character gaps at 20ms each.
        assert!(started.elapsed() >= std::time::Duration::from_millis(60));
    }

    #[tokio::test]
    async fn unknown_id_is_a_silent_noop() {
        let mut doc = input_doc();
        scan(&mut doc).unwrap();
        let notices_before = doc.notices().len();
        let activations_before = doc.activations().len();

        for command in [
            ActionCommand::click(ElementId(99)),
            ActionCommand::type_text(ElementId(99), "zzz"),
        ] {
            let report = execute(&mut doc, &command, quick()).await;
            assert!(!report.performed);
        }

        assert_eq!(doc.notices().len(), notices_before);
        assert_eq!(doc.activations().len(), activations_before);
    }

    #[tokio::test]
    async fn stale_ids_from_a_previous_document_miss() {
        let mut doc = input_doc();
        let elements = scan(&mut doc).unwrap();
        let old_id = elements[0].id;

        // The app re-rendered: a fresh document has no tags yet.
        let mut fresh =
            PageDocument::from_spec(&samples::demo_document()).unwrap();
        let report = execute(&mut fresh, &ActionCommand::click(old_id), quick()).await;
        assert!(!report.performed);
        assert!(fresh.activations().is_empty());
    }

    #[tokio::test]
    async fn click_focuses_and_activates_the_target() {
        let mut doc = input_doc();
        let elements = scan(&mut doc).unwrap();
        let button = elements
            .iter()
            .find(|element| element.tag == "BUTTON")
            .unwrap();

        let report = execute(&mut doc, &ActionCommand::click(button.id), quick()).await;
        assert!(report.performed);

        let node = doc
            .find_by_attr(SCAN_TAG_ATTR, &button.id.to_string())
            .unwrap();
        assert_eq!(doc.focused(), Some(node));
        assert_eq!(doc.activations(), &[node]);
    }

    #[tokio::test]
    async fn scroll_shifts_the_viewport() {
        let mut doc = input_doc();
        scan(&mut doc).unwrap();
        let report = execute(&mut doc, &ActionCommand::scroll(240.0), quick()).await;
        assert!(report.performed);
        assert_eq!(doc.scroll_top(), 240.0);
    }
}
