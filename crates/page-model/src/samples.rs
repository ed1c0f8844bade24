//! Built-in documents for demos, CLI defaults, and integration tests.

use pagepilot_core_types::Rect;

use crate::spec::{DocumentSpec, ElementSpec, NodeSpec, StyleSpec, ViewportSpec};

/// A small generated landing page exercising every classification path:
/// navigation links, fragment and script-scheme links, form controls, ARIA
/// buttons, raw click handlers, and a few elements the scanner must skip.
pub fn demo_document() -> DocumentSpec {
    let header = ElementSpec::new("header")
        .with_rect(Rect::new(0.0, 0.0, 1280.0, 64.0))
        .with_child(NodeSpec::Element(
            ElementSpec::new("a")
                .with_attr("class", "brand")
                .with_attr("href", "/")
                .with_rect(Rect::new(16.0, 24.0, 120.0, 32.0))
                .with_text("Acme Notes"),
        ))
        .with_child(NodeSpec::Element(
            ElementSpec::new("a")
                .with_attr("href", "/features")
                .with_rect(Rect::new(20.0, 860.0, 90.0, 24.0))
                .with_text("Features"),
        ))
        .with_child(NodeSpec::Element(
            ElementSpec::new("a")
                .with_attr("href", "/pricing")
                .with_rect(Rect::new(20.0, 970.0, 80.0, 24.0))
                .with_text("Pricing"),
        ))
        .with_child(NodeSpec::Element(
            ElementSpec::new("a")
                .with_attr("href", "#top")
                .with_rect(Rect::new(20.0, 1070.0, 100.0, 24.0))
                .with_text("Back to top"),
        ))
        .with_child(NodeSpec::Element(
            ElementSpec::new("span")
                .with_attr("onclick", "toggleMenu()")
                .with_rect(Rect::new(20.0, 1190.0, 60.0, 24.0))
                .with_text("Menu"),
        ));

    let signup = ElementSpec::new("section")
        .with_attr("class", "signup")
        .with_rect(Rect::new(180.0, 400.0, 480.0, 220.0))
        .with_child(NodeSpec::Element(
            ElementSpec::new("h1")
                .with_rect(Rect::new(190.0, 420.0, 440.0, 40.0))
                .with_text("Your notes, organized"),
        ))
        .with_child(NodeSpec::Element(
            ElementSpec::new("input")
                .with_attr("id", "email")
                .with_attr("type", "email")
                .with_attr("placeholder", "Work email")
                .with_rect(Rect::new(250.0, 420.0, 280.0, 40.0)),
        ))
        .with_child(NodeSpec::Element(
            ElementSpec::new("button")
                .with_attr("id", "subscribe")
                .with_rect(Rect::new(250.0, 720.0, 120.0, 40.0))
                .with_text("Notify me"),
        ))
        .with_child(NodeSpec::Element(
            // Hidden inputs never reach the inventory.
            ElementSpec::new("input")
                .with_attr("type", "hidden")
                .with_attr("name", "csrf")
                .with_rect(Rect::new(0.0, 0.0, 1.0, 1.0)),
        ));

    let feedback = ElementSpec::new("section")
        .with_attr("class", "feedback")
        .with_rect(Rect::new(430.0, 400.0, 480.0, 200.0))
        .with_child(NodeSpec::Element(
            ElementSpec::new("textarea")
                .with_attr("name", "feedback")
                .with_rect(Rect::new(440.0, 420.0, 420.0, 96.0)),
        ))
        .with_child(NodeSpec::Element(
            ElementSpec::new("button")
                .with_attr("class", "cta")
                .with_rect(Rect::new(540.0, 420.0, 160.0, 48.0))
                .with_text("Get started"),
        ))
        .with_child(NodeSpec::Element(
            ElementSpec::new("div")
                .with_attr("role", "button")
                .with_rect(Rect::new(540.0, 600.0, 110.0, 32.0))
                .with_text("Toggle theme"),
        ))
        .with_child(NodeSpec::Element(
            ElementSpec::new("a")
                .with_attr("href", "javascript:void(0)")
                .with_rect(Rect::new(600.0, 420.0, 70.0, 20.0))
                .with_text("Share"),
        ))
        .with_child(NodeSpec::Element(
            // Zero box, filtered out by the visibility gate.
            ElementSpec::new("a")
                .with_attr("href", "/ghost")
                .with_text("Ghost link"),
        ))
        .with_child(NodeSpec::Element(ElementSpec {
            tag: "button".to_string(),
            style: StyleSpec {
                display: Some("none".to_string()),
                ..StyleSpec::default()
            },
            rect: Rect::new(600.0, 600.0, 90.0, 30.0),
            children: vec![NodeSpec::text("Debug")],
            ..ElementSpec::default()
        }));

    DocumentSpec {
        base_url: "https://preview.pagepilot.local/app/".to_string(),
        title: Some("Acme Notes".to_string()),
        viewport: ViewportSpec::default(),
        body: vec![
            NodeSpec::Element(header),
            NodeSpec::Element(signup),
            NodeSpec::Element(feedback),
        ],
    }
}

/// A document whose embedded frame denies inspection; scanning it fails and
/// the session must fall back to an empty inventory.
pub fn sealed_frame_document() -> DocumentSpec {
    DocumentSpec {
        base_url: "https://preview.pagepilot.local/app/".to_string(),
        title: Some("Embedded checkout".to_string()),
        viewport: ViewportSpec::default(),
        body: vec![
            NodeSpec::Element(
                ElementSpec::new("button")
                    .with_attr("id", "pay")
                    .with_rect(Rect::new(40.0, 40.0, 120.0, 40.0))
                    .with_text("Pay now"),
            ),
            NodeSpec::Element(ElementSpec {
                tag: "iframe".to_string(),
                sealed: true,
                rect: Rect::new(120.0, 40.0, 600.0, 400.0),
                ..ElementSpec::default()
            }),
        ],
    }
}
