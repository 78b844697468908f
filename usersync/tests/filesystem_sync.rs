//! Round trips through the JSON identity store and a real file tree.

#![expect(
    clippy::expect_used,
    reason = "test code uses expect for clear failure messages"
)]

use std::fs;
use std::path::{Path, PathBuf};

use camino::Utf8PathBuf;
use rstest::{fixture, rstest};
use tempfile::TempDir;
use usersync::app::{SyncApp, seed_store};
use usersync::domain::ports::IdentityService;
use usersync::domain::{CanonicalNode, GROUP_SEPARATOR, Membership, SyncLayout, UserRecord};
use usersync::outbound::JsonIdentityStore;
use usersync::settings::SyncSettings;

struct Seeded {
    scratch: TempDir,
    settings: SyncSettings,
}

impl Seeded {
    fn root(&self) -> PathBuf {
        self.scratch.path().join("usync")
    }

    fn user_folder(&self) -> PathBuf {
        SyncLayout::user_folder(&self.root())
    }

    fn documents(&self, folder: &Path) -> Vec<PathBuf> {
        let Ok(entries) = fs::read_dir(folder) else {
            return Vec::new();
        };
        let mut paths: Vec<_> = entries
            .map(|entry| entry.expect("directory entry").path())
            .filter(|path| path.is_file())
            .collect();
        paths.sort();
        paths
    }

    fn first_user(&self) -> UserRecord {
        self.store()
            .service()
            .snapshot()
            .expect("snapshot")
            .users
            .into_iter()
            .next()
            .expect("seeded users")
    }

    fn store(&self) -> JsonIdentityStore {
        JsonIdentityStore::open(
            Utf8PathBuf::from_path_buf(self.settings.store()).expect("utf-8 store path"),
        )
        .expect("open store")
    }

    fn lookup(&self, email: &str) -> UserRecord {
        self.store()
            .service()
            .find_by_email(email)
            .expect("lookup")
            .expect("user exists")
    }
}

#[fixture]
fn seeded() -> Seeded {
    let scratch = tempfile::tempdir().expect("create temp dir");
    let settings = SyncSettings {
        root: Some(scratch.path().join("usync")),
        archive_root: Some(scratch.path().join("usync-archive")),
        store: Some(scratch.path().join("identity.json")),
        ..SyncSettings::default()
    };
    let outcomes = seed_store(&settings).expect("seed store");
    assert!(outcomes.iter().all(|outcome| outcome.success));
    Seeded { scratch, settings }
}

fn other_alias(current: &str) -> &'static str {
    if current == "translator" { "editor" } else { "translator" }
}

#[rstest]
fn seeding_writes_one_document_per_user(seeded: Seeded) {
    let documents = seeded.documents(&seeded.user_folder());

    assert_eq!(documents.len(), 12);
    assert!(
        documents
            .iter()
            .all(|path| path.extension().is_some_and(|ext| ext == "config"))
    );
    let xml = fs::read_to_string(&documents[0]).expect("read document");
    assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
}

#[rstest]
fn edited_document_drifts_then_imports(seeded: Seeded) {
    let user = seeded.first_user();
    let path = SyncLayout::file_for(&seeded.root(), &user.email);
    let xml = fs::read_to_string(&path).expect("read document");
    let mut node = CanonicalNode::parse_document(&xml)
        .expect("parse")
        .pop()
        .expect("user node");
    let current = node.attribute("Organisation").expect("organisation").to_owned();
    let target = other_alias(&current);
    node.set_attribute("Organisation", target);
    fs::write(&path, node.to_xml().expect("render")).expect("rewrite document");

    let app = SyncApp::open(&seeded.settings).expect("open app");
    let drifted: Vec<_> = app
        .report()
        .into_iter()
        .filter(|outcome| outcome.success)
        .map(|outcome| outcome.key)
        .collect();
    assert_eq!(drifted, vec![user.email.clone()]);

    let imported = app.import(false).expect("import");
    assert_eq!(imported.len(), 12);
    assert!(imported.iter().all(|outcome| outcome.success));

    let reopened = SyncApp::open(&seeded.settings).expect("reopen app");
    assert!(reopened.report().iter().all(|outcome| !outcome.success));
    let stored = seeded.lookup(&user.email);
    assert_eq!(stored.membership, Membership::Organisation(target.to_owned()));
    assert_eq!(stored.credential, user.credential);
}

#[rstest]
fn malformed_files_fail_alone_and_other_extensions_are_ignored(seeded: Seeded) {
    let folder = seeded.user_folder();
    fs::write(folder.join("broken.config"), "<User Email=\"x@example.org\">").expect("write");
    fs::write(folder.join("notes.txt"), "not a document").expect("write");

    let app = SyncApp::open(&seeded.settings).expect("open app");
    let outcomes = app.import(false).expect("import");

    assert_eq!(outcomes.len(), 13);
    let failed: Vec<_> = outcomes.iter().filter(|outcome| !outcome.success).collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].path.as_deref(), Some(folder.join("broken.config").as_path()));
}

#[rstest]
fn deleted_user_document_moves_to_archive(seeded: Seeded) {
    let user = seeded.first_user();
    let app = SyncApp::open(&seeded.settings).expect("open app");

    let outcomes = app.orchestrator().on_deleted(&[user.clone()]);

    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].success);
    assert!(!SyncLayout::file_for(&seeded.root(), &user.email).exists());
    assert_eq!(seeded.documents(&seeded.user_folder()).len(), 11);
    let archived = seeded.documents(
        &seeded
            .scratch
            .path()
            .join("usync-archive")
            .join("User"),
    );
    assert_eq!(archived.len(), 1);
    assert_eq!(outcomes[0].path.as_deref(), Some(archived[0].as_path()));
}

#[test]
fn multi_group_store_exports_joined_groups() {
    let scratch = tempfile::tempdir().expect("create temp dir");
    let settings = SyncSettings {
        root: Some(scratch.path().join("usync")),
        archive_root: Some(scratch.path().join("usync-archive")),
        store: Some(scratch.path().join("identity.json")),
        organisation_model: Some("multi-group".to_owned()),
        ..SyncSettings::default()
    };
    seed_store(&settings).expect("seed store");

    let known = ["admin", "editor", "translator", "writer"];
    let folder = SyncLayout::user_folder(&settings.root());
    for entry in fs::read_dir(&folder).expect("list documents") {
        let xml = fs::read_to_string(entry.expect("entry").path()).expect("read");
        let node = CanonicalNode::parse_document(&xml)
            .expect("parse")
            .pop()
            .expect("user node");
        let organisation = node.attribute("Organisation").expect("organisation");
        assert!(
            organisation
                .split(GROUP_SEPARATOR)
                .filter(|alias| !alias.is_empty())
                .all(|alias| known.contains(&alias)),
            "unexpected groups in {organisation}"
        );
    }
    let app = SyncApp::open(&settings).expect("open app");
    assert!(app.report().iter().all(|outcome| !outcome.success));
}
