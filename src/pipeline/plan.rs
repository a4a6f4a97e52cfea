//! Data-flow plan of a run, built without calling the generation port

use super::Mode;
use crate::offer::Stage;
use crate::roles::RoleSet;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// One step of the pipeline as it would execute.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanStep {
    pub step: &'static str,
    /// Persona title for generation steps; `None` for ASSEMBLE.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub receives: &'static str,
    pub produces: Vec<&'static str>,
    pub generated: bool,
    /// Worst-case wall time is `attempt_timeout_secs * max_attempts`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DryRun {
    pub mode: Mode,
    pub input: Value,
    pub steps: Vec<PlanStep>,
}

fn generation_step(
    roles: &RoleSet,
    stage: Stage,
    timeout: Duration,
    receives: &'static str,
    produces: Vec<&'static str>,
) -> PlanStep {
    let role = roles.get(stage);
    PlanStep {
        step: stage.as_str(),
        role: Some(role.role.clone()),
        receives,
        produces,
        generated: true,
        max_attempts: Some(role.max_iterations.max(1)),
        attempt_timeout_secs: Some(timeout.as_secs()),
    }
}

/// The steps a run in `mode` would take, in order.
pub fn plan(roles: &RoleSet, mode: Mode, timeout: Duration) -> Vec<PlanStep> {
    let gather_receives = match mode {
        Mode::Create => "user input",
        Mode::Redesign => "existing offer document and metadata",
    };
    vec![
        generation_step(
            roles,
            Stage::Gather,
            timeout,
            gather_receives,
            vec!["service_name", "pricing", "features", "description", "target_audience"],
        ),
        generation_step(
            roles,
            Stage::Copy,
            timeout,
            "gathered information",
            vec!["headline", "subtitle", "description", "feature_bullets", "call_to_action"],
        ),
        generation_step(
            roles,
            Stage::Design,
            timeout,
            "gathered information merged with copy",
            vec!["template", "color_palette", "typography", "reasoning"],
        ),
        PlanStep {
            step: "assemble",
            role: None,
            receives: "gathered information, copy and design",
            produces: vec!["offer"],
            generated: false,
            max_attempts: None,
            attempt_timeout_secs: None,
        },
        generation_step(
            roles,
            Stage::Audit,
            timeout,
            "assembled offer",
            vec!["category_scores", "issues", "recommendation"],
        ),
    ]
}

pub fn dry_run(roles: &RoleSet, mode: Mode, input: Value, timeout: Duration) -> DryRun {
    DryRun {
        mode,
        input,
        steps: plan(roles, mode, timeout),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_lists_stages_in_data_flow_order() {
        let roles = RoleSet::builtin().unwrap();
        let steps = plan(&roles, Mode::Create, Duration::from_secs(120));

        let names: Vec<&str> = steps.iter().map(|s| s.step).collect();
        assert_eq!(names, vec!["gather", "copy", "design", "assemble", "audit"]);
        assert!(!steps[3].generated);
        assert_eq!(steps[0].max_attempts, Some(roles.gather.max_iterations));
        assert_eq!(steps[4].attempt_timeout_secs, Some(120));
        assert_eq!(steps[2].receives, "gathered information merged with copy");
    }

    #[test]
    fn redesign_plan_reads_the_document() {
        let roles = RoleSet::builtin().unwrap();
        let run = dry_run(
            &roles,
            Mode::Redesign,
            Value::String("Old offer".into()),
            Duration::from_secs(30),
        );

        assert_eq!(run.mode, Mode::Redesign);
        assert!(run.steps[0].receives.contains("document"));
        let json = serde_json::to_value(&run).unwrap();
        assert!(json["steps"][3].get("role").is_none());
    }
}
