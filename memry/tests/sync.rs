mod helpers;

use helpers::{count_requests, mount_empty_sync_routes, mount_lectures, pushed_lectures, spawn_app};
use memry_client::api_client::AuthClient;
use memry_client::domain::Lecture;
use memry_client::error::SyncError;
use memry_client::net::LinkState;
use memry_client::sync::SyncSummary;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

fn client_for(app: &helpers::TestApp) -> AuthClient {
    AuthClient::new(&app.server.uri(), "token").unwrap()
}

#[tokio::test]
async fn full_sync_adopts_legacy_rows_and_pushes_them() {
    let app = spawn_app(LinkState::online()).await.unwrap();
    let user_id = Uuid::new_v4();
    mount_empty_sync_routes(&app.server).await;

    // written before the device had an account
    let legacy = Lecture::new("Intro to Cells".into());
    app.db.save(&legacy).await.unwrap();

    let client = client_for(&app);
    let summary = app.coordinator.sync_all(&client, user_id).await.unwrap();

    assert_eq!(
        summary,
        SyncSummary {
            migrated: 1,
            pulled: 0,
            pushed: 1
        }
    );

    let pushed = pushed_lectures(&app.server).await;
    assert_eq!(pushed.len(), 1);
    assert_eq!(pushed[0]["id"], legacy.id.to_string());
    assert_eq!(pushed[0]["user_id"], user_id.to_string());

    let local = app.db.get(legacy.id).await.unwrap().unwrap();
    assert_eq!(local.user_id, Some(user_id));
}

#[tokio::test]
async fn pull_applies_remote_rows_missing_locally() {
    let app = spawn_app(LinkState::online()).await.unwrap();
    let user_id = Uuid::new_v4();

    let mut remote = Lecture::new("Photosynthesis".into());
    remote.user_id = Some(user_id);
    remote.summary = "Light in, sugar out.".into();
    mount_lectures(&app.server, &[(remote.clone(), user_id)]).await;
    mount_empty_sync_routes(&app.server).await;

    let client = client_for(&app);
    let summary = app.coordinator.sync_all(&client, user_id).await.unwrap();

    assert_eq!(summary.pulled, 1);
    let local = app.db.get(remote.id).await.unwrap().unwrap();
    assert_eq!(local.title, "Photosynthesis");
    assert_eq!(local.summary, "Light in, sugar out.");
}

#[tokio::test]
async fn pull_skips_malformed_remote_rows_and_keeps_the_rest() {
    let app = spawn_app(LinkState::online()).await.unwrap();
    let user_id = Uuid::new_v4();

    let good = Lecture::new("Good".into());
    let mut broken = Lecture::new("Broken".into()).to_cloud(user_id).unwrap();
    broken.quiz = "{not json".into();
    let lectures = vec![good.to_cloud(user_id).unwrap(), broken];
    Mock::given(method("GET"))
        .and(path("/lectures"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "lectures": lectures })),
        )
        .mount(&app.server)
        .await;
    mount_empty_sync_routes(&app.server).await;

    let client = client_for(&app);
    let summary = app.coordinator.sync_all(&client, user_id).await.unwrap();

    assert_eq!(summary.pulled, 1);
    assert!(app.db.get(good.id).await.unwrap().is_some());
}

#[tokio::test]
async fn duplicate_title_rejects_the_upsert_without_sending_anything() {
    let app = spawn_app(LinkState::online()).await.unwrap();
    let user_id = Uuid::new_v4();

    let mut mine = Lecture::new("Linear Algebra 4".into());
    mine.user_id = Some(user_id);
    app.db.save(&mine).await.unwrap();

    // someone else's record already owns this title
    let mut other = Lecture::new("Linear Algebra 4".into());
    other.user_id = Some(user_id);
    Mock::given(method("GET"))
        .and(path("/lectures/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            serde_json::json!({ "lectures": [other.to_cloud(user_id).unwrap()] }),
        ))
        .mount(&app.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/lectures"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "ok": true })))
        .expect(0)
        .mount(&app.server)
        .await;

    let client = client_for(&app);
    let res = app.coordinator.upsert(&client, &mine).await;

    assert_eq!(res, Err(SyncError::DuplicateTitle));
    // local copy untouched
    let back = app.db.get(mine.id).await.unwrap().unwrap();
    assert_eq!(back.title, mine.title);
    assert_eq!(back.updated_at, mine.updated_at);
}

#[tokio::test]
async fn upsert_with_its_own_remote_copy_is_not_a_duplicate() {
    let app = spawn_app(LinkState::online()).await.unwrap();
    let user_id = Uuid::new_v4();

    let mut mine = Lecture::new("Linear Algebra 4".into());
    mine.user_id = Some(user_id);

    Mock::given(method("GET"))
        .and(path("/lectures/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            serde_json::json!({ "lectures": [mine.to_cloud(user_id).unwrap()] }),
        ))
        .mount(&app.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/lectures"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "ok": true })))
        .expect(1)
        .mount(&app.server)
        .await;

    let client = client_for(&app);
    app.coordinator.upsert(&client, &mine).await.unwrap();
}

#[tokio::test]
async fn failed_upload_pushes_the_row_without_audio() {
    let app = spawn_app(LinkState::online()).await.unwrap();
    let user_id = Uuid::new_v4();
    mount_empty_sync_routes(&app.server).await;

    let mut lecture = Lecture::new("Recorded".into());
    lecture.user_id = Some(user_id);
    lecture.local_audio_path = Some("/nowhere/recording.m4a".into());
    app.db.save(&lecture).await.unwrap();

    let client = client_for(&app);
    let res = app.coordinator.upsert(&client, &lecture).await.unwrap();

    assert_eq!(res, None);
    let pushed = pushed_lectures(&app.server).await;
    assert_eq!(pushed.len(), 1);
    assert_eq!(pushed[0]["audio_url"], serde_json::Value::Null);
    // the recording reference survives for a later attempt
    let local = app.db.get(lecture.id).await.unwrap().unwrap();
    assert_eq!(local.local_audio_path, lecture.local_audio_path);
}

#[tokio::test]
async fn successful_upload_rewrites_the_row_with_the_remote_url() {
    let app = spawn_app(LinkState::online()).await.unwrap();
    let user_id = Uuid::new_v4();
    mount_empty_sync_routes(&app.server).await;

    let dir = tempfile::TempDir::new().unwrap();
    let audio = dir.path().join("recording.m4a");
    tokio::fs::write(&audio, b"not really audio").await.unwrap();

    let mut lecture = Lecture::new("Recorded".into());
    lecture.user_id = Some(user_id);
    lecture.local_audio_path = Some(audio.to_str().unwrap().into());
    app.db.save(&lecture).await.unwrap();

    let key = format!("/blobs/{user_id}/{}.m4a", lecture.id);
    let url = format!("https://blobs.example.com{key}");
    Mock::given(method("PUT"))
        .and(path(key.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "url": url })))
        .expect(1)
        .mount(&app.server)
        .await;

    let client = client_for(&app);
    let res = app.coordinator.upsert(&client, &lecture).await.unwrap();

    assert_eq!(res, Some(url.clone()));
    let pushed = pushed_lectures(&app.server).await;
    assert_eq!(pushed[0]["audio_url"], url.as_str());
    let local = app.db.get(lecture.id).await.unwrap().unwrap();
    assert_eq!(local.audio_url, Some(url));
}

#[tokio::test]
async fn concurrent_syncs_for_one_user_share_a_single_run() {
    let app = spawn_app(LinkState::online()).await.unwrap();
    let user_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/lectures"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "lectures": [] }))
                .set_delay(std::time::Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&app.server)
        .await;
    mount_empty_sync_routes(&app.server).await;

    let client = client_for(&app);
    let (a, b) = tokio::join!(
        app.coordinator.sync_all(&client, user_id),
        app.coordinator.sync_all(&client, user_id),
    );

    assert_eq!(a.unwrap(), b.unwrap());
    let requests = app.server.received_requests().await.unwrap();
    assert_eq!(
        count_requests(&requests, wiremock::http::Method::Get, "/lectures"),
        1
    );
}

#[tokio::test]
async fn a_failed_pull_surfaces_and_the_next_sync_resumes() {
    let app = spawn_app(LinkState::online()).await.unwrap();
    let user_id = Uuid::new_v4();

    let mut lecture = Lecture::new("Pending".into());
    lecture.user_id = Some(user_id);
    app.db.save(&lecture).await.unwrap();

    Mock::given(method("GET"))
        .and(path("/lectures"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&app.server)
        .await;

    let client = client_for(&app);
    let res = app.coordinator.sync_all(&client, user_id).await;
    assert!(matches!(res, Err(SyncError::Remote(_))));
    // nothing lost locally
    assert!(app.db.get(lecture.id).await.unwrap().is_some());

    app.server.reset().await;
    mount_empty_sync_routes(&app.server).await;

    let summary = app.coordinator.sync_all(&client, user_id).await.unwrap();
    assert_eq!(summary.pushed, 1);
}

#[tokio::test]
async fn delete_is_local_first_and_survives_a_dead_backend() {
    let app = spawn_app(LinkState::online()).await.unwrap();
    let user_id = Uuid::new_v4();

    let mut lecture = Lecture::new("Old notes".into());
    lecture.user_id = Some(user_id);
    app.db.save(&lecture).await.unwrap();

    // no DELETE mock mounted; the remote call fails
    let client = client_for(&app);
    app.coordinator.delete(&client, lecture.id).await.unwrap();

    assert!(app.db.get(lecture.id).await.unwrap().is_none());
}
