//! End-to-end lifecycle tests: download, activate, confirm, roll back,
//! stage and delete, over a JSON state file and real zip archives.

mod common;

use common::Engine;
use chrono::Utc;
use otter_common::checksum;
use otter_common::{BundleInfo, BundleStatus, ID_BUILTIN};
use std::fs;

const SITE_V1: &[(&str, &str)] = &[("index.html", "<h1>v1</h1>"), ("app.js", "v1()")];
const SITE_V2: &[(&str, &str)] = &[("dist/index.html", "<h1>v2</h1>"), ("dist/app.js", "v2()")];

#[tokio::test]
async fn fetch_installs_both_tiers_and_records_pending() {
    let engine = Engine::new();
    let url = engine.archive("v1.zip", SITE_V1);
    let expected_checksum = checksum::compute(std::path::Path::new(&url));

    let info = engine.downloader.fetch(&url, "1.0.0").await.unwrap();

    assert_eq!(info.status, BundleStatus::Pending);
    assert_eq!(info.version, "1.0.0");
    assert_eq!(info.checksum, expected_checksum);
    assert_eq!(info.checksum.len(), 8);

    let listed = engine.controller.list();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0], info);

    let layout = engine.config.layout();
    assert!(layout.is_installed(&info.id));
    assert_eq!(
        fs::read_to_string(layout.persist_path(&info.id).join("index.html")).unwrap(),
        "<h1>v1</h1>"
    );
    let scratch_left = fs::read_dir(&layout.scratch_root).unwrap().count();
    assert_eq!(scratch_left, 0);
}

#[tokio::test]
async fn fetch_reports_progress_in_order() {
    let engine = Engine::new();
    let url = engine.archive("v1.zip", SITE_V1);

    let info = engine.downloader.fetch(&url, "1.0.0").await.unwrap();

    assert_eq!(engine.percents(&info.id), vec![0, 10, 40, 70, 71, 85, 100]);
}

#[tokio::test]
async fn wrapped_archive_is_unflattened_in_both_tiers() {
    let engine = Engine::new();
    let url = engine.archive("v2.zip", SITE_V2);

    let info = engine.downloader.fetch(&url, "2.0.0").await.unwrap();

    let layout = engine.config.layout();
    assert!(layout.hot_path(&info.id).join("index.html").is_file());
    assert!(layout.persist_path(&info.id).join("app.js").is_file());
    assert!(engine.controller.activate(&info.id));
}

#[tokio::test]
async fn failed_fetch_leaves_downloading_record_and_pointers() {
    let engine = Engine::new();
    let missing = engine.temp.path().join("missing.zip");

    let err = engine
        .downloader
        .fetch(&missing.to_string_lossy(), "9.9.9")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "network");

    let started = engine
        .progress
        .lock()
        .unwrap()
        .first()
        .map(|(id, _)| id.clone())
        .unwrap();
    assert_eq!(engine.percents(&started), vec![0]);
    let record = engine.controller.store().get(&started);
    assert_eq!(record.status, BundleStatus::Downloading);
    assert_eq!(record.version, "9.9.9");
    assert!(engine.controller.is_using_builtin());
    assert!(engine.controller.list().is_empty());
}

#[tokio::test]
async fn corrupt_archive_fails_with_decompress_error() {
    let engine = Engine::new();
    let path = engine.temp.path().join("broken.zip");
    fs::write(&path, "not a zip at all").unwrap();

    let err = engine
        .downloader
        .fetch(&path.to_string_lossy(), "1.0.0")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "decompress");
    assert!(engine.controller.is_using_builtin());
}

#[tokio::test]
async fn activate_succeeds_only_for_builtin_or_installed() {
    let engine = Engine::new();
    let url = engine.archive("v1.zip", SITE_V1);
    let info = engine.downloader.fetch(&url, "1.0.0").await.unwrap();

    assert!(engine.controller.activate(ID_BUILTIN));
    assert!(!engine.controller.activate("doesnotexist"));
    assert!(engine.controller.is_using_builtin());

    fs::remove_file(engine.config.layout().persist_path(&info.id).join("index.html")).unwrap();
    assert!(!engine.controller.activate(&info.id));
    assert!(engine.controller.is_using_builtin());
}

#[tokio::test]
async fn delete_never_touches_builtin_or_current() {
    let engine = Engine::new();
    let url = engine.archive("v1.zip", SITE_V1);
    let info = engine.downloader.fetch(&url, "1.0.0").await.unwrap();
    assert!(engine.controller.activate(&info.id));

    assert!(!engine.controller.delete(ID_BUILTIN));
    assert!(!engine.controller.delete(&engine.controller.current_bundle_id()));
    assert!(engine.config.layout().is_installed(&info.id));
    assert_eq!(engine.controller.store().get(&info.id).version, "1.0.0");
}

#[tokio::test]
async fn confirm_success_rotates_fallback() {
    let engine = Engine::new();
    let a = engine
        .downloader
        .fetch(&engine.archive("a.zip", SITE_V1), "1.0.0")
        .await
        .unwrap();
    let b = engine
        .downloader
        .fetch(&engine.archive("b.zip", SITE_V2), "2.0.0")
        .await
        .unwrap();

    assert!(engine.controller.activate(&a.id));
    engine.controller.confirm_success(&a, true);
    assert_eq!(engine.controller.fallback_bundle().id, a.id);

    assert!(engine.controller.activate(&b.id));
    engine.controller.confirm_success(&b, true);
    assert_eq!(engine.controller.fallback_bundle().id, b.id);

    let ids: Vec<String> = engine.controller.list().into_iter().map(|i| i.id).collect();
    assert_eq!(ids, vec![b.id.clone()]);
}

#[tokio::test]
async fn failed_bundle_rolls_back_to_fallback() {
    let engine = Engine::new();
    let good = engine
        .downloader
        .fetch(&engine.archive("good.zip", SITE_V1), "1.0.0")
        .await
        .unwrap();
    assert!(engine.controller.activate(&good.id));
    engine.controller.confirm_success(&good, false);

    let bad = engine
        .downloader
        .fetch(&engine.archive("bad.zip", SITE_V2), "2.0.0")
        .await
        .unwrap();
    assert!(engine.controller.activate(&bad.id));
    assert_eq!(engine.controller.current_bundle_id(), bad.id);

    // the host could not load it
    engine.controller.confirm_error(&bad);
    let fallback = engine.controller.fallback_bundle();
    assert!(engine.controller.activate(&fallback.id));

    assert_eq!(engine.controller.current_bundle_id(), good.id);
    let served = engine.controller.bundle_path(&engine.controller.current_bundle_id());
    assert_eq!(fs::read_to_string(served.join("index.html")).unwrap(), "<h1>v1</h1>");

    let bad_record = engine.controller.store().get(&bad.id);
    assert_eq!(bad_record.status, BundleStatus::Error);
    assert!(engine.controller.list().iter().any(|i| i.id == bad.id));

    assert!(engine.controller.delete(&bad.id));
    assert!(!engine.controller.list().iter().any(|i| i.id == bad.id));
}

#[tokio::test]
async fn staged_bundle_survives_restart_and_applies() {
    let engine = Engine::new();
    let info = engine
        .downloader
        .fetch(&engine.archive("v1.zip", SITE_V1), "1.0.0")
        .await
        .unwrap();

    assert!(!engine.controller.stage_next(Some("nothere")));
    assert!(engine.controller.next_bundle().is_none());
    assert!(engine.controller.stage_next(Some(&info.id)));

    let engine = engine.restart();
    assert!(engine.controller.is_using_builtin());
    assert_eq!(engine.controller.next_bundle().map(|b| b.id), Some(info.id.clone()));

    let applied = engine.controller.apply_next(Utc::now(), "1.0").unwrap();
    assert_eq!(applied.id, info.id);
    assert!(engine.controller.next_bundle().is_none());

    let engine = engine.restart();
    assert_eq!(engine.controller.current_bundle_id(), info.id);
    assert!(!engine.controller.is_using_builtin());
}

#[test]
fn store_put_get_roundtrip_forces_id() {
    let engine = Engine::new();
    let store = engine.controller.store();
    let info = BundleInfo::new("ignored", "3.1.4", BundleStatus::Success, "1234abcd");

    store.put("k3y", &info).unwrap();
    let read = store.get("k3y");
    assert_eq!(read, info.clone().with_id("k3y"));

    let engine = engine.restart();
    assert_eq!(engine.controller.store().get("k3y"), info.with_id("k3y"));
}
