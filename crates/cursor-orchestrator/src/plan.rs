//! Matching plan steps against scan inventories.
//!
//! The host side never sees the document, only wire descriptors, so selector
//! matching here is structural: the trailing tag of the path, optionally
//! positioned with `:nth-of-type`, checked against same-tag descriptors in
//! inventory order. Id and class segments cannot be verified from
//! descriptors; steps relying on them fall back to their hint or get skipped.

use pagepilot_core_types::{ElementId, InteractiveElement};
use selector_engine::parse_selector;

use crate::model::TestStep;

/// Find the element a step refers to in the current inventory. The selector
/// wins over the hint when both are present and both resolve.
pub fn match_step(step: &TestStep, elements: &[InteractiveElement]) -> Option<ElementId> {
    if let Some(selector) = step.selector.as_deref() {
        if let Some(id) = match_selector(selector, elements) {
            return Some(id);
        }
    }
    step.hint
        .as_deref()
        .and_then(|hint| match_hint(hint, elements))
}

fn match_selector(selector: &str, elements: &[InteractiveElement]) -> Option<ElementId> {
    let segments = parse_selector(selector)?;
    let last = segments.last()?;
    let tag = last.tag.as_deref()?;

    let same_tag: Vec<&InteractiveElement> = elements
        .iter()
        .filter(|element| element.tag.eq_ignore_ascii_case(tag))
        .collect();
    match last.nth {
        Some(nth) => same_tag.get(nth - 1).map(|element| element.id),
        // Without a position the tag must be unambiguous.
        None => match same_tag.as_slice() {
            [only] => Some(only.id),
            _ => None,
        },
    }
}

fn match_hint(hint: &str, elements: &[InteractiveElement]) -> Option<ElementId> {
    let needle = hint.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    elements
        .iter()
        .find(|element| element.text.contains(&needle))
        .map(|element| element.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StepAction;
    use pagepilot_core_types::{ActionType, Rect};

    fn element(id: u32, tag: &str, text: &str) -> InteractiveElement {
        InteractiveElement {
            id: ElementId(id),
            geometry: Rect::new(10.0 * id as f64, 0.0, 100.0, 30.0),
            tag: tag.to_string(),
            text: text.to_string(),
            action_type: ActionType::Click,
            href: None,
        }
    }

    fn step(selector: Option<&str>, hint: Option<&str>) -> TestStep {
        TestStep {
            action: StepAction::Click,
            selector: selector.map(str::to_string),
            hint: hint.map(str::to_string),
            text: None,
            amount: None,
        }
    }

    #[test]
    fn hints_match_normalized_text_case_insensitively() {
        let elements = vec![element(0, "A", "skip intro"), element(1, "BUTTON", "notify me")];
        let found = match_step(&step(None, Some("NOTIFY")), &elements);
        assert_eq!(found, Some(ElementId(1)));
    }

    #[test]
    fn positioned_selectors_count_same_tag_descriptors() {
        let elements = vec![
            element(0, "BUTTON", "first"),
            element(1, "INPUT", ""),
            element(2, "BUTTON", "second"),
        ];
        let found = match_step(&step(Some("main > button:nth-of-type(2)"), None), &elements);
        assert_eq!(found, Some(ElementId(2)));
    }

    #[test]
    fn bare_tags_match_only_when_unique() {
        let one_button = vec![element(0, "BUTTON", "go"), element(1, "A", "home")];
        assert_eq!(
            match_step(&step(Some("form > button"), None), &one_button),
            Some(ElementId(0))
        );

        let two_buttons = vec![element(0, "BUTTON", "go"), element(1, "BUTTON", "stop")];
        assert_eq!(match_step(&step(Some("form > button"), None), &two_buttons), None);
    }

    #[test]
    fn id_selectors_cannot_be_verified_from_descriptors() {
        let elements = vec![element(0, "BUTTON", "pay now")];
        assert_eq!(match_step(&step(Some("#pay"), None), &elements), None);
        // ...but the hint still rescues the step.
        assert_eq!(
            match_step(&step(Some("#pay"), Some("pay now")), &elements),
            Some(ElementId(0))
        );
    }

    #[test]
    fn selector_wins_over_hint_when_both_resolve() {
        let elements = vec![element(0, "BUTTON", "pay now"), element(1, "A", "pay later")];
        let found = match_step(&step(Some("main > button"), Some("pay later")), &elements);
        assert_eq!(found, Some(ElementId(0)));
    }
}
