mod common;

use netelem::config::{EditorConfig, EmitConfig, SessionConfig};
use netelem::emit::CodeEmitter;
use netelem::functions::FunctionRegistry;
use netelem::model::RoleId;
use netelem::presentation::{WidgetKind, WindowKind};
use netelem::reconcile::{Session, SessionOptions};
use tempfile::TempDir;

use common::path;

#[test]
fn configured_session_edits_then_emits() {
    let dir = TempDir::new().unwrap();
    let config = EditorConfig {
        emit: EmitConfig::new("Leader election", "Chang Roberts"),
        session: SessionConfig {
            roles: vec![RoleId::Own, RoleId::Own],
            window: WindowKind::Edit,
        },
    };
    config.save(dir.path()).unwrap();
    let config = EditorConfig::load(dir.path()).unwrap();

    let functions = FunctionRegistry::with_builtins();
    let types = common::types();
    let mut node = common::process("p1", &functions);

    let mut session = Session::open(&node, SessionOptions::from(&config.session)).unwrap();
    assert_eq!(session.options().roles, vec![RoleId::Own]);
    assert!(session.find(&path(RoleId::Private, &["Config"])).is_none());

    let state = session.find(&path(RoleId::Own, &["State"])).unwrap();
    let descriptor = session.descriptor(state, &node, &types, &functions).unwrap();
    assert_eq!(descriptor.new_value.kind, WidgetKind::Dropdown);
    assert_eq!(descriptor.new_value.options, vec!["Idle", "Candidate", "Leader"]);

    session
        .commit_edit(state, "Candidate", &node, &types, &functions)
        .unwrap();
    assert!(session.commit(&mut node, &types).unwrap().is_clean());
    assert_eq!(node.summary(), "Process p1 (State: Candidate)");

    let mut emitter = CodeEmitter::new(config.emit.clone()).unwrap();
    emitter.emit_node(&node).unwrap();
    let units = emitter.finish().unwrap();
    assert_eq!(units.len(), 1);
    assert!(units[0].text.contains("use netelem::attributes::"));
}

#[test]
fn read_only_window_refuses_edits() {
    let functions = FunctionRegistry::with_builtins();
    let types = common::types();
    let node = common::process("p1", &functions);
    let options = SessionOptions {
        window: WindowKind::ReadOnly,
        ..SessionOptions::default()
    };
    let mut session = Session::open(&node, options).unwrap();
    let round = session.find(&path(RoleId::Own, &["Round"])).unwrap();

    assert!(session
        .commit_edit(round, "2", &node, &types, &functions)
        .is_err());
    let descriptor = session.descriptor(round, &node, &types, &functions).unwrap();
    assert!(!descriptor.new_value.enabled);
}
