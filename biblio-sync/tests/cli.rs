use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command as StdCommand;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

const FOO: &str = "@inproceedings{foo2020,\n  title = {Foo},\n  year = 2020,\n}\n";
const BAR_BROKEN: &str = "@article{bar2021,\n  title = {Unbalanced,\n  year = 2021\n";

fn write(root: &Path, rel: &str, content: &str) -> PathBuf {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, content).unwrap();
    path
}

fn git(dir: &Path, args: &[&str]) {
    let status = StdCommand::new("git")
        .arg("-C")
        .arg(dir)
        .args(["-c", "user.name=Test", "-c", "user.email=test@example.org"])
        .args(args)
        .status()
        .expect("git must be installed for CLI integration tests");
    assert!(status.success(), "git {args:?} failed");
}

/// A committed repository with one valid and one broken bib file.
fn create_remote(root: &Path) -> PathBuf {
    let remote = root.join("remote");
    write(&remote, "bibliography.yaml", "MASTER_BIB: ./master.bib\nOUTPUT_DIR: site\n");
    write(&remote, "papers/2020/foo.bib", FOO);
    write(&remote, "papers/2021/bar.bib", BAR_BROKEN);
    git(&remote, &["init", "--quiet"]);
    git(&remote, &["add", "."]);
    git(&remote, &["commit", "--quiet", "-m", "papers"]);
    remote
}

fn create_resources(root: &Path) -> PathBuf {
    let resources = root.join("tool");
    write(&resources, "_template_.html", "<html>page</html>");
    write(&resources, "_template_bibtex.html", "<html>bibtex</html>");
    write(&resources, "static/img/logo.png", "png");
    resources
}

#[test]
fn sync_cli_publishes_a_fresh_clone_then_updates_it() {
    let tmp = tempdir().unwrap();
    let remote = create_remote(tmp.path());
    let resources = create_resources(tmp.path());
    let local = tmp.path().join("work/papers");

    Command::cargo_bin("biblio-sync")
        .expect("Binary exists")
        .arg("sync")
        .arg(&remote)
        .arg(&local)
        .arg("--resources")
        .arg(&resources)
        .env("RUST_LOG", "info")
        .assert()
        .success()
        .stdout(predicate::str::contains("bar.bib").and(predicate::str::contains("Skipping")));

    assert_eq!(fs::read_to_string(local.join("master.bib")).unwrap(), FOO);
    let logo = local.join("site/img/logo.png");
    assert!(fs::symlink_metadata(&logo).unwrap().file_type().is_symlink());
    assert_eq!(fs::read_to_string(&logo).unwrap(), "png");
    assert_eq!(
        fs::read_to_string(local.join("_template_bibtex.html")).unwrap(),
        "<html>bibtex</html>"
    );

    // Second run pulls into the existing working copy and relinks nothing.
    Command::cargo_bin("biblio-sync")
        .unwrap()
        .arg("sync")
        .arg(&remote)
        .arg(&local)
        .arg("--resources")
        .arg(&resources)
        .env("RUST_LOG", "info")
        .assert()
        .success()
        .stdout(predicate::str::contains("Skipping"));
    assert_eq!(fs::read_to_string(local.join("master.bib")).unwrap(), FOO);
}

#[test]
fn sync_cli_fails_when_the_remote_cannot_be_cloned() {
    let tmp = tempdir().unwrap();
    let missing_remote = tmp.path().join("does-not-exist");
    let local = tmp.path().join("work");

    Command::cargo_bin("biblio-sync")
        .unwrap()
        .current_dir(tmp.path())
        .arg("sync")
        .arg(&missing_remote)
        .arg(&local)
        .assert()
        .failure();

    assert!(!local.join("anonbib.bib").exists());
}

#[test]
fn sync_cli_requires_a_remote() {
    Command::cargo_bin("biblio-sync")
        .unwrap()
        .arg("sync")
        .assert()
        .failure()
        .stderr(predicate::str::contains("REMOTE"));
}

use std::sync::{Arc, Mutex};
use tracing_subscriber::prelude::*; // needed for .with()
use tracing_subscriber::{layer::Context, Layer, Registry};

/// Custom Layer to collect emitted event messages.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let msg = format!("{:?}", event);
        self.events.lock().unwrap().push(msg);
    }
}

#[tokio::test]
async fn emits_trace_initialised_event() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    use biblio_sync::cli::{run, Cli, Commands};

    let tmp = tempdir().unwrap();
    let cli = Cli {
        command: Commands::Sync {
            remote: tmp.path().join("no-remote").display().to_string(),
            local_dir: Some(tmp.path().join("work")),
            config_name: PathBuf::from("bibliography.yaml"),
            resources: tmp.path().to_path_buf(),
            reference: None,
        },
    };

    let result = run(cli).await;
    assert!(result.is_err(), "cloning a missing remote must fail");

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
}

#[test]
fn sync_help_mentions_the_renamed_config_default() {
    Command::cargo_bin("biblio-sync")
        .unwrap()
        .args(["sync", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("bibliography.yaml")
                .and(predicate::str::contains("bibliography.cfg")),
        );
}
