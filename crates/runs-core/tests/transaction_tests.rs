use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::rc::Rc;

use proptest::prelude::*;
use runs_core::{Editor, EditorError, Env, Error, RunDirs, Transaction, Ui};
use runs_local_db::Database;
use runs_model::{RunEntry, RunPath, ValidationError};
use runs_mux_core::{MuxError, SessionName, SessionOptions, SessionSupervisor};
use runs_repo::{SourceControl, VcsResult};
use tempfile::TempDir;

/// In-process stand-in for tmux that records every call.
#[derive(Clone, Default)]
struct FakeSupervisor {
    sessions: Rc<RefCell<BTreeMap<String, String>>>,
    log: Rc<RefCell<Vec<String>>>,
    fail_new_sessions: bool,
}

impl FakeSupervisor {
    fn active(&self, path: &str) -> bool {
        self.sessions
            .borrow()
            .contains_key(SessionName::for_path(path).as_str())
    }

    fn command_of(&self, path: &str) -> Option<String> {
        self.sessions
            .borrow()
            .get(SessionName::for_path(path).as_str())
            .cloned()
    }

    fn log(&self) -> Vec<String> {
        self.log.borrow().clone()
    }
}

impl SessionSupervisor for FakeSupervisor {
    fn id(&self) -> &'static str {
        "fake"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn new_session(&self, name: &SessionName, opts: &SessionOptions) -> Result<(), MuxError> {
        if self.fail_new_sessions {
            return Err(MuxError::CommandFailed("new-session refused".to_string()));
        }
        self.log.borrow_mut().push(format!("new {name}"));
        self.sessions
            .borrow_mut()
            .insert(name.to_string(), opts.command.to_string());
        Ok(())
    }

    fn kill(&self, name: &SessionName) -> Result<(), MuxError> {
        self.log.borrow_mut().push(format!("kill {name}"));
        self.sessions.borrow_mut().remove(name.as_str());
        Ok(())
    }

    fn rename(&self, from: &SessionName, to: &SessionName) -> Result<(), MuxError> {
        self.log.borrow_mut().push(format!("rename {from} {to}"));
        let mut sessions = self.sessions.borrow_mut();
        if let Some(command) = sessions.remove(from.as_str()) {
            sessions.insert(to.to_string(), command);
        }
        Ok(())
    }

    fn interrupt(&self, name: &SessionName) -> Result<(), MuxError> {
        self.log.borrow_mut().push(format!("interrupt {name}"));
        Ok(())
    }

    fn list(&self) -> Result<Vec<SessionName>, MuxError> {
        Ok(self
            .sessions
            .borrow()
            .keys()
            .map(SessionName::from_raw)
            .collect())
    }
}

struct FakeRepo {
    dirty: bool,
}

impl SourceControl for FakeRepo {
    fn last_commit(&self) -> VcsResult<String> {
        Ok("c0".to_string())
    }

    fn is_dirty(&self) -> VcsResult<bool> {
        Ok(self.dirty)
    }

    fn last_commit_message(&self) -> VcsResult<String> {
        Ok("Initial commit".to_string())
    }
}

/// Appends a fixed line to whatever it is given.
struct FakeEditor {
    headers: Rc<RefCell<Vec<String>>>,
}

impl Editor for FakeEditor {
    fn edit(&self, header: &str, initial: &str) -> Result<String, EditorError> {
        self.headers.borrow_mut().push(header.to_string());
        if initial == "abort" {
            return Err(EditorError::EmptyDescription);
        }
        Ok(format!("{initial} (edited)"))
    }
}

struct Fixture {
    tmp: TempDir,
    supervisor: FakeSupervisor,
    headers: Rc<RefCell<Vec<String>>>,
    dirty: bool,
}

impl Fixture {
    fn new() -> Self {
        Self {
            tmp: TempDir::new().unwrap(),
            supervisor: FakeSupervisor::default(),
            headers: Rc::default(),
            dirty: false,
        }
    }

    fn root(&self) -> PathBuf {
        self.tmp.path().join(".runs")
    }

    fn dirs(&self) -> RunDirs {
        RunDirs::new(self.root(), vec!["chk".to_string(), "tb".to_string()])
    }

    fn db(&self) -> Database {
        Database::open(self.tmp.path().join("runs.db")).unwrap()
    }

    /// A transaction whose prompts read `answers`.
    fn transaction_with_input(&self, answers: &'static str) -> Transaction {
        let env = Env {
            ui: Ui::with_io(true, false, answers.as_bytes(), std::io::sink()),
            dirs: self.dirs(),
            supervisor: Box::new(self.supervisor.clone()),
            repo: Box::new(FakeRepo { dirty: self.dirty }),
            editor: Box::new(FakeEditor {
                headers: self.headers.clone(),
            }),
            session_cwd: Some(self.tmp.path().to_path_buf()),
        };
        Transaction::open(self.db(), env)
    }

    fn transaction(&self) -> Transaction {
        let env = Env {
            ui: Ui::with_io(true, true, std::io::empty(), std::io::sink()),
            dirs: self.dirs(),
            supervisor: Box::new(self.supervisor.clone()),
            repo: Box::new(FakeRepo { dirty: self.dirty }),
            editor: Box::new(FakeEditor {
                headers: self.headers.clone(),
            }),
            session_cwd: None,
        };
        Transaction::open(self.db(), env)
    }

    fn new_runs(&self, runs: &[(&str, &str)]) {
        let mut tx = self.transaction();
        for (path, command) in runs {
            tx.add_run(entry(path, command)).unwrap();
        }
        tx.commit().unwrap();
    }

    fn paths(&self) -> Vec<String> {
        self.db()
            .all()
            .unwrap()
            .into_iter()
            .map(|e| e.path.to_string())
            .collect()
    }

    fn run_dir(&self, tree: &str, path: &str) -> PathBuf {
        self.root().join(tree).join(path)
    }
}

fn entry(path: &str, command: &str) -> RunEntry {
    RunEntry {
        path: RunPath::new(path).unwrap(),
        command: command.to_string(),
        commit: "c0".to_string(),
        datetime: "2024-01-01T00:00:00Z".to_string(),
        description: "d1".to_string(),
    }
}

fn path(p: &str) -> RunPath {
    RunPath::new(p).unwrap()
}

#[test]
fn new_run_creates_row_dirs_and_session() {
    let fx = Fixture::new();
    fx.new_runs(&[("foo", "train.py")]);

    let stored = fx.db().entry("foo").unwrap();
    assert_eq!(stored, entry("foo", "train.py"));
    assert!(fx.run_dir("chk", "foo").is_dir());
    assert!(fx.run_dir("tb", "foo").is_dir());
    assert!(fx.supervisor.active("foo"));
}

#[test]
fn new_run_overwrites_existing_path() {
    let fx = Fixture::new();
    fx.new_runs(&[("foo", "train.py")]);
    fx.new_runs(&[("foo", "train.py --lr=1")]);

    assert_eq!(fx.paths(), vec!["foo"]);
    assert_eq!(fx.db().entry("foo").unwrap().command, "train.py --lr=1");
    assert_eq!(fx.supervisor.command_of("foo").unwrap(), "train.py --lr=1");
    assert_eq!(
        fx.supervisor.log(),
        vec!["new foo", "kill foo", "new foo"]
    );
}

#[test]
fn removal_runs_before_new_run_in_one_transaction() {
    let fx = Fixture::new();
    fx.new_runs(&[("p", "old")]);

    let mut tx = fx.transaction();
    tx.add_run(entry("p", "new")).unwrap();
    tx.remove(path("p"));
    tx.commit().unwrap();

    assert_eq!(fx.db().entry("p").unwrap().command, "new");
    assert!(fx.run_dir("chk", "p").is_dir());
}

#[test]
fn move_into_directory() {
    let fx = Fixture::new();
    fx.new_runs(&[("foo/a", "x"), ("foo/b", "y")]);

    let mut tx = fx.transaction();
    tx.move_run(path("foo/a"), path("bar/a"), false);
    tx.move_run(path("foo/b"), path("bar/b"), false);
    tx.commit().unwrap();

    assert_eq!(fx.paths(), vec!["bar/a", "bar/b"]);
    assert!(fx.run_dir("chk", "bar/a").is_dir());
    assert!(fx.run_dir("tb", "bar/b").is_dir());
    assert!(!fx.run_dir("chk", "foo").exists());
    assert!(fx.supervisor.active("bar/a"));
    assert!(!fx.supervisor.active("foo/a"));
}

#[test]
fn move_can_kill_sessions() {
    let fx = Fixture::new();
    fx.new_runs(&[("a", "x")]);

    let mut tx = fx.transaction();
    tx.move_run(path("a"), path("b"), true);
    tx.commit().unwrap();

    assert_eq!(fx.paths(), vec!["b"]);
    assert!(!fx.supervisor.active("a"));
    assert!(!fx.supervisor.active("b"));
}

#[test]
fn colliding_moves_change_nothing() {
    let fx = Fixture::new();
    fx.new_runs(&[("a", "x"), ("b", "y")]);

    let mut tx = fx.transaction();
    tx.move_run(path("a"), path("c"), false);
    tx.move_run(path("b"), path("c"), false);
    let err = tx.commit().unwrap_err();

    assert!(matches!(
        err,
        Error::Validation(ValidationError::CollidingMoves { .. })
    ));
    assert_eq!(fx.paths(), vec!["a", "b"]);
    assert!(fx.run_dir("chk", "a").is_dir());
}

#[test]
fn remove_prunes_empty_parents() {
    let fx = Fixture::new();
    fx.new_runs(&[("a/1", "x"), ("a/2", "x"), ("b/1", "x")]);

    let mut tx = fx.transaction();
    let matched = tx.db().get(&["a/%"], &[] as &[&str]).unwrap();
    for run in matched {
        tx.remove(run.path);
    }
    tx.commit().unwrap();

    assert_eq!(fx.paths(), vec!["b/1"]);
    assert!(!fx.run_dir("chk", "a").exists());
    assert!(!fx.run_dir("tb", "a").exists());
    assert!(fx.run_dir("chk", "b/1").is_dir());
    assert!(!fx.supervisor.active("a/1"));
}

#[test]
fn declined_prompt_changes_nothing() {
    let fx = Fixture::new();
    fx.new_runs(&[("a", "x")]);

    let mut tx = fx.transaction_with_input("n\n");
    tx.remove(path("a"));
    assert!(tx.commit().unwrap_err().is_cancelled());

    assert_eq!(fx.paths(), vec!["a"]);
    assert!(fx.run_dir("chk", "a").is_dir());
    assert!(fx.supervisor.active("a"));
}

#[test]
fn dirty_repo_asks_before_creating() {
    let mut fx = Fixture::new();
    fx.dirty = true;

    let mut tx = fx.transaction_with_input("no\n");
    tx.add_run(entry("a", "x")).unwrap();
    assert!(tx.commit().unwrap_err().is_cancelled());
    assert!(fx.paths().is_empty());

    let mut tx = fx.transaction_with_input("y\n");
    tx.add_run(entry("a", "x")).unwrap();
    tx.commit().unwrap();
    assert_eq!(fx.paths(), vec!["a"]);
}

#[test]
fn several_new_runs_need_one_confirmation() {
    let fx = Fixture::new();
    let mut tx = fx.transaction_with_input("y\n");
    tx.add_run(entry("a", "x")).unwrap();
    tx.add_run(entry("b", "y")).unwrap();
    tx.commit().unwrap();
    assert_eq!(fx.paths(), vec!["a", "b"]);
}

#[test]
fn stages_apply_in_fixed_order() {
    let fx = Fixture::new();
    fx.new_runs(&[("gone", "x"), ("keep", "x"), ("moving", "x")]);
    let before = fx.supervisor.log().len();

    let mut tx = fx.transaction();
    tx.add_run(entry("fresh", "x")).unwrap();
    tx.move_run(path("moving"), path("moved"), false);
    tx.remove(path("gone"));
    tx.kill(path("keep"));
    tx.interrupt(path("keep"));
    tx.commit().unwrap();

    assert_eq!(
        fx.supervisor.log()[before..].to_vec(),
        vec![
            "interrupt keep",
            "kill keep",
            "kill gone",
            "rename moving moved",
            "new fresh"
        ]
    );
    // Kill leaves the database and directories alone.
    assert!(fx.db().contains(&["keep"]).unwrap());
    assert!(fx.run_dir("chk", "keep").is_dir());
}

#[test]
fn queued_items_are_processed_in_natural_order() {
    let fx = Fixture::new();
    let mut tx = fx.transaction();
    for p in ["run10", "run2", "run1"] {
        tx.add_run(entry(p, "x")).unwrap();
    }
    tx.commit().unwrap();
    assert_eq!(
        fx.supervisor.log(),
        vec!["new run1", "new run2", "new run10"]
    );
}

#[test]
fn description_changes_use_editor_when_missing() {
    let fx = Fixture::new();
    fx.new_runs(&[("a", "train.py"), ("b", "eval.py")]);

    let mut tx = fx.transaction();
    tx.change_description(path("a"), "train.py".into(), "d1".into(), None);
    tx.change_description(path("b"), "eval.py".into(), "d1".into(), Some("given".into()));
    tx.commit().unwrap();

    assert_eq!(fx.db().entry("a").unwrap().description, "d1 (edited)");
    assert_eq!(fx.db().entry("b").unwrap().description, "given");

    let headers = fx.headers.borrow();
    assert_eq!(headers.len(), 1);
    assert!(headers[0].contains("# Run: a"));
    assert!(headers[0].contains("train.py"));
}

#[test]
fn empty_edited_description_cancels() {
    let fx = Fixture::new();
    fx.new_runs(&[("a", "x")]);

    let mut tx = fx.transaction();
    tx.change_description(path("a"), "x".into(), "abort".into(), None);
    assert!(tx.commit().unwrap_err().is_cancelled());
    assert_eq!(fx.db().entry("a").unwrap().description, "d1");
}

#[test]
fn failure_while_applying_keeps_earlier_stages() {
    let mut fx = Fixture::new();
    fx.new_runs(&[("old", "x")]);
    fx.supervisor.fail_new_sessions = true;

    let mut tx = fx.transaction();
    tx.remove(path("old"));
    tx.add_run(entry("new", "x")).unwrap();
    let err = tx.commit().unwrap_err();

    assert!(matches!(err, Error::Session(_)));
    // The removal ran and stays applied; the new run never reached the database.
    assert!(fx.paths().is_empty());
}

#[test]
fn dropped_transaction_changes_nothing() {
    let fx = Fixture::new();
    fx.new_runs(&[("a", "x")]);

    let mut tx = fx.transaction();
    tx.remove(path("a"));
    drop(tx);

    assert_eq!(fx.paths(), vec!["a"]);
}

#[test]
fn remove_keeps_directories_of_nested_runs() {
    let fx = Fixture::new();
    fx.new_runs(&[("foo", "x"), ("foo/a", "y")]);
    std::fs::write(fx.run_dir("chk", "foo/a").join("model.pt"), "weights").unwrap();
    std::fs::write(fx.run_dir("chk", "foo").join("log.txt"), "foo").unwrap();

    let mut tx = fx.transaction();
    tx.remove(path("foo"));
    tx.commit().unwrap();

    assert_eq!(fx.paths(), vec!["foo/a"]);
    assert!(fx.run_dir("chk", "foo/a").join("model.pt").exists());
    assert!(fx.run_dir("tb", "foo/a").is_dir());
    assert!(!fx.run_dir("chk", "foo").join("log.txt").exists());
    assert!(fx.supervisor.active("foo/a"));
}

#[test]
fn overwriting_a_parent_run_keeps_nested_runs() {
    let fx = Fixture::new();
    fx.new_runs(&[("foo", "x"), ("foo/a", "y")]);
    std::fs::write(fx.run_dir("chk", "foo/a").join("model.pt"), "weights").unwrap();

    fx.new_runs(&[("foo", "x --lr=1")]);

    assert_eq!(fx.paths(), vec!["foo", "foo/a"]);
    assert!(fx.run_dir("chk", "foo/a").join("model.pt").exists());
    assert_eq!(fx.db().entry("foo").unwrap().command, "x --lr=1");
}

#[test]
fn move_leaves_unmoved_nested_runs_in_place() {
    let fx = Fixture::new();
    fx.new_runs(&[("foo", "x"), ("foo/a", "y")]);
    std::fs::write(fx.run_dir("chk", "foo/a").join("model.pt"), "weights").unwrap();
    std::fs::write(fx.run_dir("chk", "foo").join("log.txt"), "foo").unwrap();

    let mut tx = fx.transaction();
    tx.move_run(path("foo"), path("bar"), false);
    tx.commit().unwrap();

    assert_eq!(fx.paths(), vec!["bar", "foo/a"]);
    assert!(fx.run_dir("chk", "foo/a").join("model.pt").exists());
    assert!(fx.run_dir("chk", "bar").join("log.txt").exists());
    assert!(!fx.run_dir("chk", "bar/a").exists());
    assert!(fx.supervisor.active("bar"));
    assert!(fx.supervisor.active("foo/a"));
}

#[test]
fn move_carries_nested_runs_that_move_along() {
    let fx = Fixture::new();
    fx.new_runs(&[("foo", "x"), ("foo/a", "y")]);
    std::fs::write(fx.run_dir("chk", "foo/a").join("model.pt"), "weights").unwrap();

    let mut tx = fx.transaction();
    tx.move_run(path("foo"), path("bar"), false);
    tx.move_run(path("foo/a"), path("bar/a"), false);
    tx.commit().unwrap();

    assert_eq!(fx.paths(), vec!["bar", "bar/a"]);
    assert!(fx.run_dir("chk", "bar/a").join("model.pt").exists());
    assert!(!fx.run_dir("chk", "foo").exists());
}

#[test]
fn move_into_own_subtree_is_rejected() {
    let fx = Fixture::new();
    fx.new_runs(&[("foo", "x")]);

    let mut tx = fx.transaction();
    tx.move_run(path("foo"), path("foo/bar"), false);
    let err = tx.commit().unwrap_err();

    assert!(matches!(
        err,
        Error::Validation(ValidationError::MoveIntoSelf { .. })
    ));
    assert_eq!(fx.paths(), vec!["foo"]);
    assert!(fx.run_dir("chk", "foo").is_dir());
}

fn nested_runs() -> impl Strategy<Value = (Vec<String>, Vec<bool>)> {
    prop::collection::btree_set("[ab](/[ab]){0,2}", 1..6).prop_flat_map(|runs| {
        let count = runs.len();
        (
            Just(runs.into_iter().collect::<Vec<_>>()),
            prop::collection::vec(any::<bool>(), count),
        )
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn removal_never_touches_surviving_run_files((runs, removed) in nested_runs()) {
        let fx = Fixture::new();
        let created: Vec<(&str, &str)> = runs.iter().map(|run| (run.as_str(), "x")).collect();
        fx.new_runs(&created);
        for run in &runs {
            std::fs::write(fx.run_dir("chk", run).join("own.txt"), run).unwrap();
        }

        let mut tx = fx.transaction();
        for (run, remove) in runs.iter().zip(&removed) {
            if *remove {
                tx.remove(path(run));
            }
        }
        tx.commit().unwrap();

        for (run, remove) in runs.iter().zip(&removed) {
            let own = fx.run_dir("chk", run).join("own.txt");
            prop_assert_eq!(own.exists(), !remove, "run {}", run);
        }
        let surviving = removed.iter().filter(|remove| !**remove).count();
        prop_assert_eq!(fx.paths().len(), surviving);
    }
}
