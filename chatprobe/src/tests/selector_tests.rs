use crate::profile::ElementRole;
use crate::selector::{xpath_literal, Selector};

#[test]
fn test_selector_prefixes() {
    assert_eq!(Selector::from("id:send_button"), Selector::Id("send_button".to_string()));
    assert_eq!(
        Selector::from("ClassName: android.widget.EditText"),
        Selector::ClassName("android.widget.EditText".to_string())
    );
    assert_eq!(Selector::from("desc:Send"), Selector::AccessibilityId("Send".to_string()));
    assert_eq!(
        Selector::from("//android.widget.EditText"),
        Selector::XPath("//android.widget.EditText".to_string())
    );
    assert_eq!(Selector::from("text:Skip"), Selector::Text("Skip".to_string()));
    assert_eq!(Selector::from("label:Next"), Selector::Label("Next".to_string()));
    assert_eq!(Selector::from("#chat_input"), Selector::Id("chat_input".to_string()));
    assert!(matches!(Selector::from("send button"), Selector::Invalid(_)));
    assert!(matches!(Selector::from(""), Selector::Invalid(_)));
}

#[test]
fn test_display_round_trips_through_parse() {
    for raw in ["id:btn_send", "classname:android.widget.TextView", "label:Get Started"] {
        let selector = Selector::from(raw);
        assert_eq!(Selector::from(selector.to_string().as_str()), selector);
    }
}

#[test]
fn test_w3c_strategies() {
    assert_eq!(
        Selector::from("id:send_button").to_strategy(),
        Some(("id", "send_button".to_string()))
    );
    assert_eq!(
        Selector::from("classname:android.widget.EditText").to_strategy(),
        Some(("class name", "android.widget.EditText".to_string()))
    );
    assert_eq!(
        Selector::from("label:Skip").to_strategy(),
        Some((
            "xpath",
            "//*[contains(@text, 'Skip') or contains(@content-desc, 'Skip')]".to_string()
        ))
    );
    assert_eq!(Selector::Invalid("x".to_string()).to_strategy(), None);
}

#[test]
fn test_xpath_literal_quoting() {
    assert_eq!(xpath_literal("Next"), "'Next'");
    assert_eq!(xpath_literal("Let's go"), "\"Let's go\"");
    assert_eq!(
        xpath_literal("it's \"fine\""),
        "concat('it', \"'\", 's \"fine\"')"
    );
}

#[test]
fn test_dismiss_labels_cover_case_variants() {
    let labels: Vec<String> = ElementRole::OnboardingDismiss
        .default_strategies()
        .into_iter()
        .map(|s| s.to_string())
        .collect();

    assert_eq!(labels.len(), 12);
    for expected in ["label:skip", "label:Continue", "label:GET STARTED", "label:Get Started", "label:next"] {
        assert!(labels.iter().any(|l| l == expected), "missing {expected}");
    }
}

#[test]
fn test_latest_message_prefers_last_match() {
    assert!(ElementRole::LatestBotMessage.prefers_last_match());
    assert!(!ElementRole::ChatInput.prefers_last_match());
}
