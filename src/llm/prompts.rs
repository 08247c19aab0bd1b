//! Prompt builders
//!
//! Every prompt ends by asking for bare JSON; the reply still goes through
//! the balanced-span extractor because models do not reliably comply.

use crate::action::Plan;
use crate::dom::DomElement;
use serde::Serialize;
use serde_json::Value;

const SCREENSHOT_NOTE: &str = "A screenshot of the current viewport is attached. Use it to judge which elements are visible and prominent.";

const ACTION_SCHEMA: &str = r#"{"action":"click|fill|goto|google_search|hover|waitUntil|end","selector":"<css>","text":"<opt>","value":"<opt>","url":"<for goto>","query":"<for google_search>","condition":"<opt>","timeout":1000,"reason":"<why>"}"#;

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

fn last_action_line(last_action: Option<&Value>) -> String {
    match last_action {
        Some(action) if !action.is_null() => action.to_string(),
        _ => "None".to_string(),
    }
}

fn screenshot_line(has_image: bool) -> &'static str {
    if has_image {
        SCREENSHOT_NOTE
    } else {
        ""
    }
}

/// Prompt asking for a step-by-step plan as a JSON array
pub fn planning_prompt(
    goal: &str,
    dom: &[DomElement],
    step: u32,
    last_action: Option<&Value>,
    has_image: bool,
) -> String {
    format!(
        r#"You are a browser automation planner.

Analyse the page in three passes:
1. Structure: find the main areas (header, nav, main, sidebar, footer) and the page type.
2. Goal focus: find the sections and elements related to the goal.
3. Planning: write concrete steps with stable, semantic selectors.
{screenshot}

Goal: "{goal}"
Current step: {step}
Last action: {last}

DOM elements:
{dom}

Return ONLY a JSON array:
[{{"step": <int>, "action": "goto|click|fill|hover|waitUntil|google_search|end", "selector": "<css>", "text": "<opt>", "value": "<opt>", "url": "<opt>", "reason": "<why>"}}]
"#,
        screenshot = screenshot_line(has_image),
        goal = goal,
        step = step,
        last = last_action_line(last_action),
        dom = to_json(dom),
    )
}

/// Prompt asking for the next action while following `plan`
pub fn execution_prompt(
    goal: &str,
    plan: &Plan,
    step: u32,
    dom: &[DomElement],
    has_image: bool,
) -> String {
    let guide = if step == 0 || plan.is_empty() {
        format!(
            "First step. The goal is \"{}\". If the browser is not on the right site yet, navigate there with goto; otherwise take the first action that moves toward the goal.",
            goal
        )
    } else {
        let planned = plan
            .get(step as usize - 1)
            .map(to_json)
            .unwrap_or_else(|| "Plan step not found".to_string());
        format!(
            "Planned step {}/{}: {}\nExecute this step, or adapt it if the page has changed.",
            step,
            plan.len(),
            planned
        )
    };

    format!(
        r#"Execute the next browser action toward the goal.

{guide}
{screenshot}

Goal: "{goal}"
Step: {step}

DOM elements:
{dom}

Return ONLY one JSON object:
{schema}
Return {{"action":"end","reason":"<why>"}} when the goal is already achieved.
"#,
        guide = guide,
        screenshot = screenshot_line(has_image),
        goal = goal,
        step = step,
        dom = to_json(dom),
        schema = ACTION_SCHEMA,
    )
}

/// Prompt asking for one action without a plan
pub fn single_step_prompt(goal: &str, dom: &[DomElement], step: u32, has_image: bool) -> String {
    format!(
        r#"You are a browser control agent. Return ONLY one JSON action. Prefer directly visible elements. Return {{"action":"end"}} if the goal is done.
{screenshot}

Goal: "{goal}"
Step: {step}
DOM:
{dom}

Schema:
{schema}
"#,
        screenshot = screenshot_line(has_image),
        goal = goal,
        step = step,
        dom = to_json(dom),
        schema = ACTION_SCHEMA,
    )
}

/// Prompt for one chunk of an oversized snapshot
pub fn chunk_prompt(
    goal: &str,
    chunk: &[DomElement],
    chunk_num: usize,
    total_chunks: usize,
    step: u32,
    plan: &Plan,
    context_summary: &str,
) -> String {
    let planned = plan
        .get(step as usize)
        .map(|s| format!("\nCurrent planned action: {}", s.action))
        .unwrap_or_default();

    format!(
        r#"DOM chunk analysis (with context from earlier chunks)

Goal: {goal}
Scope: chunk {chunk_num}/{total_chunks} ({count} elements){planned}

{context}

Elements in this chunk:
{dom}

Instructions:
1. Taking earlier findings into account, find the best action toward the goal.
2. Only use elements from this chunk.
3. Give a confidence score between 0.0 and 1.0.
4. Elements directly tied to the goal and consistent with earlier findings deserve the highest confidence; newly found navigation elements deserve less.

If a suitable action exists:
{{"action":"click|fill|goto|google_search|hover|waitUntil","selector":"<css>","text":"<opt>","value":"<opt>","url":"<opt>","timeout":1000,"confidence":0.8,"reason":"<why, with context>"}}

If nothing in this chunk is suitable:
{{"action":"none","reason":"no suitable element in this chunk"}}

Return ONLY the JSON, no other text."#,
        goal = goal,
        chunk_num = chunk_num,
        total_chunks = total_chunks,
        count = chunk.len(),
        planned = planned,
        context = context_summary,
        dom = to_json(chunk),
    )
}

/// Prompt asking whether the goal is done, needs a new plan, or continues
pub fn evaluation_prompt(
    goal: &str,
    dom: &[DomElement],
    step: u32,
    last_action: Option<&Value>,
    has_image: bool,
) -> String {
    format!(
        r#"You are evaluating the progress of a browser automation.

1. Read the current page state.
2. Decide whether it satisfies the goal, and what evidence in the DOM supports that.
3. Choose: COMPLETED (goal achieved), CONTINUE (progressing, give the next action) or REPLAN (the approach is not working).
{screenshot}

Goal: "{goal}"
Step: {step}
Last action: {last}

Current DOM:
{dom}

Return ONLY ONE JSON object:
For COMPLETED: {{"status":"completed","reason":"<analysis>","evidence":"<dom evidence>"}}
For REPLAN: {{"status":"replan","reason":"<why the approach failed>","new_plan_needed":true}}
For CONTINUE: {{"status":"continue","action":"click|fill|goto|hover|waitUntil","selector":"<css>","value":"<opt>","url":"<opt>","reason":"<next step>"}}
"#,
        screenshot = screenshot_line(has_image),
        goal = goal,
        step = step,
        last = last_action_line(last_action),
        dom = to_json(dom),
    )
}

/// Prompt turning a navigation-only goal into one direct command.
///
/// A pure navigation is answered as `<URL>로 이동`; anything else is
/// answered as a short imperative that needs the page to act on.
pub fn navigation_prompt(goal: &str) -> String {
    format!(
        r#"Convert the user's intent into ONE direct browser command (Korean).
Prefer a concise imperative. If it is pure navigation, output only '<URL>로 이동'.

Input: "{goal}"

Examples:
- "유튜브 들어가서 구독함 열어줘" -> "https://youtube.com로 이동 후 '구독' 클릭"
- "검색창에 AI 입력하고 검색" -> "검색창에 'AI' 입력 후 검색 버튼 클릭"
- "위키백과 열어줘" -> "https://wikipedia.org로 이동"
Command:"#,
        goal = goal,
    )
}
