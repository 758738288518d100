use super::*;
use serde_json::json;

#[test]
fn session_report_for_logged_out_session() {
    let report = serde_json::to_value(SessionReport::from(&Session::default())).expect("json");
    assert_eq!(
        report,
        json!({ "authenticated": false, "loading": false, "profile": null })
    );
}

#[test]
fn session_report_hides_token_and_keeps_profile() {
    let session = Session {
        token: Some("secret-token".into()),
        profile: Some(Profile::with_name("Asha")),
        loading: false,
    };

    let report = serde_json::to_value(SessionReport::from(&session)).expect("json");

    assert_eq!(report["authenticated"], json!(true));
    assert_eq!(report["profile"]["profile"]["name"], json!("Asha"));
    assert!(!report.to_string().contains("secret-token"));
}

#[test]
fn token_without_profile_is_still_authenticated() {
    let session = Session {
        token: Some("t".into()),
        ..Session::default()
    };
    let report = serde_json::to_value(SessionReport::from(&session)).expect("json");
    assert_eq!(report["authenticated"], json!(true));
    assert_eq!(report["profile"], json!(null));
}
