//! Built-in prompt templates for the design, analysis and decision roles

use serde::Serialize;

pub const DESIGN_SYSTEM: &str = "design_system";
pub const DESIGN_INITIAL: &str = "design_initial";
pub const DESIGN_REVISE: &str = "design_revise";
pub const ANALYSIS_SYSTEM: &str = "analysis_system";
pub const ANALYSIS_USER: &str = "analysis_user";
pub const DECISION_SYSTEM: &str = "decision_system";
pub const DECISION_USER: &str = "decision_user";

/// (name, source) pairs registered by `PromptRenderer::with_builtins`
pub const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    (DESIGN_SYSTEM, DESIGN_SYSTEM_TEMPLATE),
    (DESIGN_INITIAL, DESIGN_INITIAL_TEMPLATE),
    (DESIGN_REVISE, DESIGN_REVISE_TEMPLATE),
    (ANALYSIS_SYSTEM, ANALYSIS_SYSTEM_TEMPLATE),
    (ANALYSIS_USER, ANALYSIS_USER_TEMPLATE),
    (DECISION_SYSTEM, DECISION_SYSTEM_TEMPLATE),
    (DECISION_USER, DECISION_USER_TEMPLATE),
];

const DESIGN_SYSTEM_TEMPLATE: &str = r#"You are an expert aerospace engineer who writes airframe assembly scripts.

An assembly script is plain text, one statement per line. `#` starts a comment.

    robot <name>
    component <name> box <length> <width> <height> [at <x> <y> <z>] [rot <rx> <ry> <rz>] [mass <kg>]
    component <name> cylinder <radius> <height> [at <x> <y> <z>] [rot <rx> <ry> <rz>] [mass <kg>]
    component <name> sphere <radius> [at <x> <y> <z>] [rot <rx> <ry> <rz>] [mass <kg>]

RULES:
1. Dimensions and positions are millimetres, rotations are degrees
2. Every component name is unique and every dimension is positive
3. Build a complete drone: a central fuselage, four arms in an X pattern and a motor mount at the end of each arm
4. Centre the fuselage at the origin
5. Consider structural integrity, weight and aerodynamics

Return ONLY the script, no explanations."#;

const DESIGN_INITIAL_TEMPLATE: &str = r#"Write an assembly script for the following aerospace design:

MISSION REQUIREMENTS:
{{mission_prompt}}

Create a complete, manufacturable airframe. Focus on:
- Structural integrity
- Weight optimization
- Aerodynamic considerations"#;

const DESIGN_REVISE_TEMPLATE: &str = r#"Revise the assembly script based on simulation feedback:

MISSION REQUIREMENTS:
{{mission_prompt}}

PREVIOUS DESIGN ISSUES/FEEDBACK:
{{#if feedback}}{{feedback}}{{else}}No specific feedback{{/if}}

PREVIOUS ITERATION {{previous_iteration}} SCRIPT:
{{#if prior_artifact}}{{prior_artifact}}{{else}}No previous script{{/if}}

PREVIOUS ERRORS:
{{#if prior_errors}}{{#each prior_errors}}- {{this}}
{{/each}}{{else}}None{{/if}}

Write an improved script that addresses the feedback."#;

const ANALYSIS_SYSTEM_TEMPLATE: &str = r#"You are an expert test pilot and aerospace physicist.

Analyze the simulation metrics and provide specific, actionable feedback for improving the design.

Focus on:
1. Stability issues (oscillations, drift, instability)
2. Performance metrics (acceleration, forces, efficiency)
3. Physical validity
4. Structural integrity concerns

Give concrete recommendations such as "Increase arm radius from 10mm to 12mm for better stiffness".

Be concise and actionable."#;

const ANALYSIS_USER_TEMPLATE: &str = r#"Analyze these simulation results:

MISSION: {{mission_prompt}}
ITERATION: {{iteration}}
SOURCE: {{source}}

METRICS:
{{#each metrics}}- {{@key}}: {{this}}
{{/each}}
Provide specific recommendations for design improvements."#;

const DECISION_SYSTEM_TEMPLATE: &str = r#"You are the supervisor of an airframe engineering team.

Decide whether to continue iterating on a design or approve it.

ITERATE if:
- Stability score < 0.85
- Max acceleration > 10 m/s^2
- Position drift > 0.5 m
- The analysis identified specific issues

FINISH if:
- Stability score >= 0.85
- No critical errors
- Metrics meet acceptable thresholds

You must respond with ONLY: "iterate" or "finish" (lowercase, no punctuation)."#;

const DECISION_USER_TEMPLATE: &str = r#"DECISION NEEDED - Iteration {{iteration}}

MISSION: {{mission_prompt}}

SIMULATION METRICS:
{{#each metrics}}- {{@key}}: {{this}}
{{/each}}
DESIGNER FEEDBACK:
{{#if feedback}}{{feedback}}{{else}}None{{/if}}

ERRORS:
{{#if errors}}{{#each errors}}- {{this}}
{{/each}}{{else}}None{{/if}}

Should we iterate (improve design) or finish (approve design)?

Respond with only: "iterate" or "finish""#;

/// Variables for the design prompts
#[derive(Debug, Clone, Serialize)]
pub struct DesignPromptContext<'a> {
    pub mission_prompt: &'a str,
    pub iteration: u32,
    pub previous_iteration: u32,
    pub feedback: Option<&'a str>,
    pub prior_artifact: Option<&'a str>,
    pub prior_errors: &'a [String],
}

/// Variables for the analysis prompt
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisPromptContext<'a, M: Serialize> {
    pub mission_prompt: &'a str,
    pub iteration: u32,
    pub source: &'a str,
    pub metrics: &'a M,
}

/// Variables for the decision prompt
#[derive(Debug, Clone, Serialize)]
pub struct DecisionPromptContext<'a, M: Serialize> {
    pub mission_prompt: &'a str,
    pub iteration: u32,
    pub metrics: &'a M,
    pub feedback: Option<&'a str>,
    pub errors: &'a [String],
}
