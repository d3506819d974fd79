mod common;

use std::sync::Arc;

use common::{Effect, FakeSession, Interaction, ScriptedOperator};
use ifa_robot::pages::{AlertDisposition, KNOWN_ALERT_TEXT};
use ifa_robot::workflow::Stage;
use ifa_robot::{Chapter, ChapterSet, ElementId, Error, FieldSpec, Locator, RobotConfig, Workflow};

const CONFIG: &str = r#"
[DEFAULT]
username = "robot"
password = "secret"

[portal]
url = "https://portal.test"
"#;

/// A portal whose form is rejected once and accepted on the second attempt.
struct Portal {
    session: Arc<FakeSession>,
    errors: ElementId,
}

impl Portal {
    fn new() -> Self {
        let session = FakeSession::new();
        let s = &session;

        s.node("login link")
            .tag("a")
            .locator(Locator::partial_link_text("ÜGYINTÉZÉS BEJELENTKEZÉSSEL"))
            .add();
        s.node("Ügyfélkapu")
            .tag("button")
            .locator(Locator::partial_button_text("Ügyfélkapu"))
            .add();
        s.node("username")
            .tag("input")
            .locator(Locator::name("felhasznaloNev"))
            .add();
        s.node("password")
            .tag("input")
            .locator(Locator::name("jelszo"))
            .add();
        s.node("login")
            .tag("button")
            .locator(Locator::button_text("bejelentkezés"))
            .add();
        s.node("start case")
            .tag("a")
            .locator(Locator::partial_link_text("ÜGYINDÍTÁS"))
            .add();
        s.node("role")
            .tag("select")
            .locator(Locator::name("kepviselet.szerepkor"))
            .add();
        s.node("sector")
            .tag("select")
            .locator(Locator::name("sector"))
            .add();
        s.node("case type")
            .tag("select")
            .locator(Locator::name("caseType"))
            .add();
        s.node("search")
            .tag("button")
            .locator(Locator::button_text("Űrlap keresés"))
            .add();
        for revision in ["online 1", "online 2"] {
            s.node(revision)
                .tag("button")
                .locator(Locator::button_text("Online kitöltés"))
                .add();
        }
        s.node("form frame")
            .tag("iframe")
            .locator(Locator::id("iform-iframe"))
            .add();
        let attachments_submit = s
            .node("attachments submit")
            .tag("button")
            .locator(Locator::button_text("Beküldés"))
            .hidden()
            .add();

        s.node("next chapter")
            .tag("a")
            .locator(Locator::partial_link_text("Következő fejezet"))
            .in_frame()
            .add();
        let more_actions = s
            .node("more actions")
            .tag("a")
            .locator(Locator::partial_link_text("További műveletek"))
            .in_frame()
            .add();
        let submit_link = s
            .node("submit link")
            .tag("a")
            .locator(Locator::partial_link_text("Az űrlap beküldése"))
            .in_frame()
            .add();
        s.node("taxid")
            .tag("input")
            .locator(Locator::css("#taxid"))
            .in_frame()
            .add();
        s.node("county")
            .tag("input")
            .attr("data-mask", "999")
            .locator(Locator::css("#county"))
            .in_frame()
            .add();
        s.node("kind")
            .tag("select")
            .locator(Locator::css("#kind"))
            .in_frame()
            .add();

        let (loading, _) = s.modal("loading", "Feldolgozás folyamatban", "Adatok betöltése", &[]);
        let (confirm, confirm_buttons) = s.modal(
            "confirm",
            "Megerősítés",
            "Biztosan beküldi az űrlapot?",
            &["Igen", "Nem"],
        );
        let (errors, _) = s.modal("errors", "Hibalista", "Hiányzó adat: vendégéjszakák", &[]);
        let (accepted, _) = s.modal("accepted", "Sikeres ellenőrzés", "Az űrlap beküldve", &[]);
        let (alert, close) = s.alert(KNOWN_ALERT_TEXT, "Bezárás");
        for root in [loading, confirm, errors, accepted, alert] {
            s.move_into_frame(root);
        }
        s.set_present(loading, true);
        s.hide_after_checks(loading, 1);

        s.on_click(close, vec![Effect::Hide(alert)]);
        s.on_click(submit_link, vec![Effect::Show(confirm)]);
        s.on_click(submit_link, vec![Effect::Show(confirm)]);
        s.on_click(confirm_buttons[0], vec![Effect::Close(confirm), Effect::Show(errors)]);
        s.on_click(
            confirm_buttons[0],
            vec![
                Effect::Close(confirm),
                Effect::Show(accepted),
                Effect::Show(attachments_submit),
            ],
        );
        // The operator closes the error list while fixing the form.
        s.on_click(more_actions, vec![]);
        s.on_click(more_actions, vec![Effect::Close(errors)]);

        Self { session, errors }
    }
}

fn chapters() -> ChapterSet {
    ChapterSet::new(vec![
        Chapter::new(
            "Adózó",
            vec![
                FieldSpec::new("#taxid", "1234567890"),
                FieldSpec::new("#county", "042"),
            ],
        ),
        Chapter::new("Bevallás", vec![FieldSpec::new("#kind", "IFA")]),
    ])
    .expect("valid chapters")
}

#[tokio::test(start_paused = true)]
async fn test_full_run_with_one_rejection() {
    let portal = Portal::new();
    let operator = ScriptedOperator::new();
    let config = RobotConfig::from_toml_str(CONFIG).expect("valid config");
    let mut workflow = Workflow::new(portal.session.clone(), operator.clone(), config, chapters());

    let outcome = workflow.run().await.expect("run completes");

    assert_eq!(outcome.submission_attempts, 2);
    assert_eq!(outcome.alert, AlertDisposition::Dismissed);
    assert_eq!(workflow.state().stage, Stage::Done);
    assert_eq!(operator.manual_edit_rounds(), 2);
    assert!(operator.retry_prompts().is_empty());
    assert!(operator
        .output()
        .iter()
        .any(|line| line.contains("the form has some errors")));
    assert!(!portal.session.is_shown(portal.errors));

    assert_eq!(
        portal.session.clicks(),
        vec![
            "login link",
            "Ügyfélkapu",
            "login",
            "start case",
            "search",
            "online 2",
            "alert Bezárás",
            "taxid",
            "county",
            "next chapter",
            "more actions",
            "submit link",
            "confirm Igen",
            "more actions",
            "submit link",
            "confirm Igen",
            "attachments submit",
        ]
    );

    let interactions = portal.session.interactions();
    assert_eq!(interactions[0], Interaction::Goto("https://portal.test".into()));
    for expected in [
        Interaction::SendKeys("username".into(), "robot".into()),
        Interaction::SendKeys("password".into(), "secret".into()),
        Interaction::SelectText("role".into(), "Saját néven (magánszemélyként)".into()),
        Interaction::SelectText("sector".into(), "Adóügy".into()),
        Interaction::SelectText("case type".into(), "idegenforgalmi adó".into()),
        Interaction::SelectValue("kind".into(), "IFA".into()),
        Interaction::SwitchFrame,
        Interaction::SwitchDefault,
    ] {
        assert!(interactions.contains(&expected), "missing {expected:?}");
    }
}

#[tokio::test(start_paused = true)]
async fn test_declined_wait_stops_the_run() {
    let session = FakeSession::new();
    let operator = ScriptedOperator::new();
    let config = RobotConfig::from_toml_str(CONFIG).expect("valid config");
    let mut workflow = Workflow::new(session.clone(), operator.clone(), config, chapters());

    let error = match workflow.run().await {
        Ok(_) => panic!("the landing page never renders"),
        Err(e) => e,
    };

    assert!(matches!(error, Error::WaitAbandoned(_)));
    assert_eq!(error.exit_code(), 1);
    assert_eq!(workflow.state().stage, Stage::Landing);
    assert_eq!(operator.retry_prompts().len(), 1);
    assert_eq!(
        session.interactions(),
        vec![Interaction::Goto("https://portal.test".into())]
    );
}

#[tokio::test(start_paused = true)]
async fn test_attempt_cap_ends_the_submission_loop() {
    let portal = Portal::new();
    let operator = ScriptedOperator::new();
    let config = RobotConfig::from_toml_str(&format!(
        "{CONFIG}\n[workflow]\nmax_submission_attempts = 1\n"
    ))
    .expect("valid config");
    let mut workflow = Workflow::new(portal.session.clone(), operator.clone(), config, chapters());

    let error = match workflow.run().await {
        Ok(_) => panic!("the first attempt is rejected"),
        Err(e) => e,
    };

    assert!(matches!(error, Error::SubmissionAttemptsExhausted(1)));
    assert_eq!(error.exit_code(), 0);
    assert_eq!(workflow.state().stage, Stage::Form);
    assert_eq!(operator.manual_edit_rounds(), 1);
    assert!(!portal.session.clicks().contains(&"attachments submit".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_closed_operator_input_stops_before_submitting() {
    let portal = Portal::new();
    let operator = ScriptedOperator::input_closed();
    let config = RobotConfig::from_toml_str(CONFIG).expect("valid config");
    let mut workflow = Workflow::new(portal.session.clone(), operator.clone(), config, chapters());

    let error = match workflow.run().await {
        Ok(_) => panic!("nobody released the form"),
        Err(e) => e,
    };

    assert!(matches!(error, Error::OperatorInputClosed));
    assert_eq!(workflow.state().stage, Stage::Form);
    assert_eq!(workflow.state().attempts, 0);
    let clicks = portal.session.clicks();
    assert!(!clicks.contains(&"more actions".to_string()));
    assert!(!clicks.contains(&"submit link".to_string()));
}
