use datatemplate::app::session::{
    ChangeEffect, ChangeOrigin, PasteOutcome, Phase, Session, SessionHost, SessionOptions,
    SessionState,
};
use datatemplate::app::transport::Location;
use datatemplate::domain::model::DocumentKind;
use datatemplate::infra::memory::MemoryHost;

fn new_session(host: MemoryHost) -> Session<MemoryHost> {
    Session::new(host, SessionState::new(), SessionOptions::default())
}

#[test]
fn url_restore_reaches_clean_with_query_removed() {
    let mut session = new_session(MemoryHost::default());
    assert_eq!(session.state().phase(), Phase::Initializing);

    session
        .start(Location::parse("https://app.test/index.html?template=WA%3D%3D"))
        .unwrap();

    assert_eq!(session.state().phase(), Phase::Clean);
    assert_eq!(session.host().document(DocumentKind::Template), "X");
    assert_eq!(session.location().query(), None);
    assert_eq!(
        session.host().replaced_locations,
        vec!["https://app.test/index.html".to_string()]
    );
}

#[test]
fn edits_dirty_the_session_exactly_once() {
    let mut session = new_session(MemoryHost::default());
    session.start(Location::default()).unwrap();

    assert_eq!(
        session.notify_change(ChangeOrigin::Edit),
        ChangeEffect::BecameDirty
    );
    assert_eq!(session.notify_change(ChangeOrigin::Edit), ChangeEffect::Unchanged);
    assert_eq!(session.state().phase(), Phase::Dirty);
    assert_eq!(session.host().guards_installed, 1);
}

#[test]
fn pasting_a_bundle_replaces_every_document() {
    let mut session = new_session(MemoryHost::with_documents("a\n1", "t", "v: 1"));
    session.start(Location::default()).unwrap();

    let outcome = session.paste("see below\n<TEMPLATE.J2>\n\tnew\n</template.j2>");
    assert!(matches!(outcome, PasteOutcome::Consumed(_)));

    let current = session.current();
    assert_eq!(current.template, "new");
    assert_eq!(current.data, "");
    assert_eq!(current.vars, "");
}

#[test]
fn failed_restore_still_leaves_session_usable() {
    let mut session = new_session(MemoryHost::default());
    assert!(session.start(Location::parse("/?vars=***")).is_err());
    assert_eq!(session.state().phase(), Phase::Clean);

    session.paste("<vars.yml>a: 1</vars.yml>");
    assert_eq!(session.current().vars, "a: 1");
    assert_eq!(session.state().phase(), Phase::Dirty);
}
