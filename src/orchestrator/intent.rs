//! Keyword gate deciding whether a goal needs the current page

use regex::Regex;
use std::sync::OnceLock;
use tracing::info;
use url::Url;

/// Verbs and nouns that imply interacting with page content
const ACTION_KEYWORDS_EN: &[&str] = &[
    "click", "input", "type", "enter text", "search", "login", "log in", "sign in", "lookup",
    "look up", "check", "confirm", "read", "view", "select", "download", "button", "link", "menu",
    "form", "field", "text", "content", "info", "information", "data",
];

const ACTION_KEYWORDS_KO: &[&str] = &[
    "클릭", "입력", "검색", "로그인", "조회", "확인", "읽기", "보기", "선택", "다운로드", "버튼",
    "링크", "메뉴", "폼", "필드", "텍스트", "내용", "정보", "데이터",
];

/// Words that only ask to be taken somewhere
const NAVIGATION_KEYWORDS_EN: &[&str] = &[
    "move", "go", "enter", "access", "open", "visit", "homepage", "site", "website",
];

const NAVIGATION_KEYWORDS_KO: &[&str] = &[
    "이동", "가기", "들어가", "접속", "열기", "홈페이지", "사이트", "웹사이트",
];

/// Words naming a site or page without saying which one
const SITE_KEYWORDS_EN: &[&str] = &["site", "website", "homepage", "page"];

const SITE_KEYWORDS_KO: &[&str] = &[
    "사이트", "홈페이지", "웹사이트", "페이지", "들어가", "접속", "이동",
];

/// Outcome of the keyword gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalIntent {
    /// Mentions page interaction; needs a snapshot
    Interact,
    /// Only asks to go somewhere; may be answered directly
    Navigate,
    /// Neither keyword family matched
    Ambiguous,
}

impl GoalIntent {
    /// Whether a page snapshot must be requested before acting
    pub fn needs_page_context(&self) -> bool {
        !matches!(self, GoalIntent::Navigate)
    }
}

/// Classify a goal by keyword.
///
/// English keywords match whole words (so "go" does not fire on "google");
/// Korean keywords match as substrings since they attach to particles.
pub fn classify(goal: &str) -> GoalIntent {
    let lowered = goal.to_lowercase();
    let words = padded_words(&lowered);

    let has = |en: &[&str], ko: &[&str]| {
        en.iter().any(|k| words.contains(&format!(" {} ", k)))
            || ko.iter().any(|k| lowered.contains(k))
    };

    let intent = if has(ACTION_KEYWORDS_EN, ACTION_KEYWORDS_KO) {
        GoalIntent::Interact
    } else if has(NAVIGATION_KEYWORDS_EN, NAVIGATION_KEYWORDS_KO) {
        GoalIntent::Navigate
    } else {
        GoalIntent::Ambiguous
    };

    info!(?intent, "Goal classified: {}", goal);
    intent
}

/// Whether `goal` needs a page snapshot
pub fn needs_page_context(goal: &str) -> bool {
    classify(goal).needs_page_context()
}

/// Whether `goal` refers to a site or page generically, so the page itself
/// must be inspected rather than a destination guessed
pub fn mentions_site(goal: &str) -> bool {
    let lowered = goal.to_lowercase();
    let words = padded_words(&lowered);
    SITE_KEYWORDS_EN
        .iter()
        .any(|k| words.contains(&format!(" {} ", k)))
        || SITE_KEYWORDS_KO.iter().any(|k| lowered.contains(k))
}

/// Destination of a pure navigation command such as
/// `https://example.com로 이동` or `go to https://example.com`.
///
/// Returns `None` when the command does anything besides navigating or the
/// URL is not an absolute http(s) URL.
pub fn navigation_target(command: &str) -> Option<String> {
    static NAVIGATION: OnceLock<Regex> = OnceLock::new();
    let pattern = NAVIGATION.get_or_init(|| {
        Regex::new(r"(?i)^(?:(?:go to|navigate to|open)\s+)?(https?://[^\s'\x22]+?)(?:\s*(?:으로|로)\s*이동)?\s*\.?$")
            .expect("valid regex")
    });

    let command = command
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '`')
        .trim();
    let candidate = pattern.captures(command)?.get(1)?.as_str();

    let url = Url::parse(candidate).ok()?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return None;
    }
    Some(candidate.to_string())
}

/// Restate a goal as concrete page-level guidance
pub fn web_guide(goal: &str) -> String {
    let lowered = goal.to_lowercase();
    let words = padded_words(&lowered);
    let mentions = |en: &[&str], ko: &str| {
        lowered.contains(ko) || en.iter().any(|k| words.contains(&format!(" {} ", k)))
    };

    if mentions(&["login", "log in", "sign in"], "로그인") {
        "Fill the id and password fields of the login form, then press the login button"
            .to_string()
    } else if mentions(&["search"], "검색") {
        "Type the keyword into the search box, then press the search button or Enter".to_string()
    } else {
        goal.to_string()
    }
}

/// Words separated by single spaces, padded on both ends
fn padded_words(text: &str) -> String {
    let words: Vec<&str> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    format!(" {} ", words.join(" "))
}
