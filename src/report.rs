//! Output rendering for the CLI: one serializable payload per command,
//! emitted as text, JSON, or YAML.

use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;

use cursor_orchestrator::RunReport;
use element_scanner::metrics::ScanMetricSnapshot;
use improve_loop::ImproveReport;
use pagepilot_core_types::InteractiveElement;

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Yaml,
}

/// Print a payload in the requested format. `text` builds the human
/// rendering lazily so the serializers never pay for it.
pub fn emit<T: Serialize>(
    format: OutputFormat,
    value: &T,
    text: impl FnOnce() -> String,
) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        // serde_yaml terminates its output with a newline already.
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
        OutputFormat::Text => println!("{}", text()),
    }
    Ok(())
}

/// What `scan` reports: the inventory, optionally selectors aligned with it,
/// optionally the scanner's counters.
#[derive(Debug, Serialize)]
pub struct ScanOutput {
    pub elements: Vec<InteractiveElement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selectors: Option<Vec<Option<String>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<ScanMetricSnapshot>,
}

pub fn scan_text(output: &ScanOutput) -> String {
    let mut lines = Vec::new();
    lines.push(format!("{} interactive element(s)", output.elements.len()));
    for (index, element) in output.elements.iter().enumerate() {
        let mut line = format!(
            "  [{}] {:8} {:8} \"{}\" at ({:.0},{:.0}) {:.0}x{:.0}",
            element.id,
            element.tag,
            element.action_type,
            element.text,
            element.geometry.left,
            element.geometry.top,
            element.geometry.width,
            element.geometry.height,
        );
        if let Some(href) = &element.href {
            line.push_str(&format!(" -> {href}"));
        }
        if let Some(selectors) = &output.selectors {
            match selectors.get(index) {
                Some(Some(selector)) => line.push_str(&format!("  {selector}")),
                _ => line.push_str("  (no selector)"),
            }
        }
        lines.push(line);
    }
    if let Some(metrics) = &output.metrics {
        lines.push(format!(
            "scans: {} total, {} failed, {} empty, avg {:.2}ms",
            metrics.total, metrics.failed, metrics.empty, metrics.avg_ms
        ));
    }
    lines.join("\n")
}

pub fn run_text(report: &RunReport) -> String {
    let mut lines = Vec::new();
    let outcome = if report.completed { "completed" } else { "stopped" };
    let elapsed = report
        .finished_at
        .signed_duration_since(report.started_at)
        .num_milliseconds();
    lines.push(format!(
        "run {} {} after {} action(s) in {}ms",
        report.run,
        outcome,
        report.actions.len(),
        elapsed
    ));
    for action in &report.actions {
        let mut line = format!("  {}", action.verb);
        if let Some(target) = action.target {
            line.push_str(&format!(" element {target}"));
        }
        if let Some(step) = action.step {
            line.push_str(&format!(" (step {step})"));
        }
        lines.push(line);
    }
    if !report.skipped_steps.is_empty() {
        let skipped: Vec<String> = report
            .skipped_steps
            .iter()
            .map(|step| step.to_string())
            .collect();
        lines.push(format!("skipped step(s): {}", skipped.join(", ")));
    }
    lines.join("\n")
}

pub fn improve_text(report: &ImproveReport) -> String {
    let mut lines = Vec::new();
    let outcome = if report.completed { "completed" } else { "stopped" };
    lines.push(format!(
        "improve run {} {} after {} cycle(s)",
        report.run, outcome, report.cycles
    ));
    for prompt in &report.prompts {
        lines.push(format!("  > {}", prompt.text));
    }
    if let Some(failure) = &report.failure {
        lines.push(format!("generation failed: {failure}"));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use cursor_orchestrator::ActionRecord;
    use pagepilot_core_types::{ActionType, ActionVerb, ElementId, Rect, RunId};

    fn sample_scan() -> ScanOutput {
        ScanOutput {
            elements: vec![InteractiveElement {
                id: ElementId(0),
                geometry: Rect::new(10.0, 20.0, 120.0, 40.0),
                tag: "BUTTON".to_string(),
                text: "notify me".to_string(),
                action_type: ActionType::Click,
                href: None,
            }],
            selectors: Some(vec![Some("#subscribe".to_string())]),
            metrics: None,
        }
    }

    #[test]
    fn scan_text_lists_elements_with_selectors() {
        let text = scan_text(&sample_scan());
        assert!(text.starts_with("1 interactive element(s)"));
        assert!(text.contains("\"notify me\""));
        assert!(text.contains("#subscribe"));
    }

    #[test]
    fn scan_output_omits_absent_sections_in_json() {
        let output = ScanOutput {
            elements: vec![],
            selectors: None,
            metrics: None,
        };
        let value = serde_json::to_value(&output).unwrap();
        assert!(value.get("selectors").is_none());
        assert!(value.get("metrics").is_none());
    }

    #[test]
    fn run_text_summarizes_actions_and_skips() {
        let now = Utc::now();
        let report = RunReport {
            run: RunId("run-1".to_string()),
            started_at: now,
            finished_at: now,
            completed: true,
            actions: vec![ActionRecord {
                verb: ActionVerb::Click,
                target: Some(ElementId(3)),
                step: Some(0),
                at: now,
            }],
            skipped_steps: vec![2],
        };
        let text = run_text(&report);
        assert!(text.contains("completed after 1 action(s)"));
        assert!(text.contains("click element 3 (step 0)"));
        assert!(text.contains("skipped step(s): 2"));
    }

    #[test]
    fn improve_text_carries_the_failure_verbatim() {
        let now = Utc::now();
        let report = ImproveReport {
            run: RunId("run-2".to_string()),
            started_at: now,
            finished_at: now,
            completed: false,
            cycles: 1,
            prompts: vec![],
            failure: Some("the model is overloaded".to_string()),
        };
        let text = improve_text(&report);
        assert!(text.contains("stopped after 1 cycle(s)"));
        assert!(text.contains("generation failed: the model is overloaded"));
    }
}
