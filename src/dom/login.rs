//! Login-wall detection
//!
//! A page only counts as a login wall when it shows a password field, login
//! wording and login-styled markup at the same time, and never when it
//! already shows signs of a signed-in session.

use crate::dom::DomElement;
use serde::Serialize;
use tracing::info;

const SUCCESS_INDICATORS: &[&str] = &[
    "메일함",
    "inbox",
    "받은편지함",
    "logout",
    "log out",
    "sign out",
    "로그아웃",
    "내정보",
    "profile",
    "프로필",
];

const LOGIN_KEYWORDS: &[&str] = &[
    "로그인",
    "login",
    "log in",
    "sign in",
    "아이디",
    "비밀번호",
    "password",
    "이메일",
];

const LOGIN_CLASS_FRAGMENTS: &[&str] = &["login", "signin", "auth", "credential"];

/// Counts gathered while classifying a page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoginSignals {
    /// Elements whose text shows a signed-in state
    pub success_signals: usize,
    /// Elements whose text mentions login vocabulary
    pub text_matches: usize,
    /// Password inputs
    pub password_fields: usize,
    /// Elements whose class or id carries a login fragment
    pub login_elements: usize,
}

impl LoginSignals {
    /// Gather all counts for a summarized page
    pub fn scan(elements: &[DomElement]) -> Self {
        let mut signals = Self::default();

        for element in elements {
            let text = element.text_lower();
            if SUCCESS_INDICATORS.iter().any(|k| text.contains(k)) {
                signals.success_signals += 1;
            }
            if LOGIN_KEYWORDS.iter().any(|k| text.contains(k)) {
                signals.text_matches += 1;
            }
            if element
                .input_type
                .as_deref()
                .is_some_and(|t| t.eq_ignore_ascii_case("password"))
            {
                signals.password_fields += 1;
            }

            let class_name = element.class_lower();
            let id = element.id_lower();
            if LOGIN_CLASS_FRAGMENTS
                .iter()
                .any(|f| class_name.contains(f) || id.contains(f))
            {
                signals.login_elements += 1;
            }
        }

        signals
    }

    /// Apply the classification rule to the gathered counts
    pub fn is_login_wall(&self) -> bool {
        if self.success_signals > 0 {
            return false;
        }
        self.password_fields > 0 && self.text_matches > 0 && self.login_elements > 0
    }
}

/// Classify a summarized page as a login wall.
pub fn is_login_wall(elements: &[DomElement]) -> bool {
    let signals = LoginSignals::scan(elements);
    let is_login = signals.is_login_wall();

    info!(
        is_login,
        success = signals.success_signals,
        password_fields = signals.password_fields,
        text_matches = signals.text_matches,
        login_elements = signals.login_elements,
        "Login wall check"
    );

    is_login
}

#[cfg(test)]
mod tests {
    use super::*;

    fn password() -> DomElement {
        DomElement::new("input", "#pw").with_type("password")
    }

    fn login_text() -> DomElement {
        DomElement::new("label", "label.l").with_text("Login to continue")
    }

    #[test]
    fn test_two_of_three_is_not_a_login_wall() {
        let page = vec![password(), login_text()];
        assert!(!is_login_wall(&page));
    }

    #[test]
    fn test_all_three_is_a_login_wall() {
        let page = vec![
            password(),
            login_text(),
            DomElement::new("form", "form").with_class("login-form"),
        ];
        assert!(is_login_wall(&page));
    }

    #[test]
    fn test_login_fragment_in_id_counts() {
        let page = vec![
            password(),
            login_text(),
            DomElement::new("div", "#auth-box").with_id("auth-box"),
        ];
        assert!(is_login_wall(&page));
    }

    #[test]
    fn test_success_signal_overrides() {
        let page = vec![
            password(),
            login_text(),
            DomElement::new("form", "form").with_class("login-form"),
            DomElement::new("a", "#out").with_text("Logout"),
        ];
        assert!(!is_login_wall(&page));
    }

    #[test]
    fn test_korean_vocabulary() {
        let page = vec![
            DomElement::new("input", "#pw").with_type("PASSWORD"),
            DomElement::new("button", "#btn").with_text("로그인"),
            DomElement::new("div", "div.signin").with_class("signin"),
        ];
        let signals = LoginSignals::scan(&page);
        assert_eq!(signals.password_fields, 1);
        assert_eq!(signals.text_matches, 1);
        assert_eq!(signals.login_elements, 1);
        assert!(signals.is_login_wall());
    }

    #[test]
    fn test_empty_page() {
        assert!(!is_login_wall(&[]));
    }
}
