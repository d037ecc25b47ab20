mod common;

use serde_json::Value;
use uuid::Uuid;

async fn react(app: &common::TestApp, token: &str, comment_id: Uuid, kind: &str) -> Value {
    let resp = app
        .client
        .post(app.url(&format!("/comment/{comment_id}/{kind}")))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    body["data"].clone()
}

async fn setup(app: &common::TestApp) -> (common::TestUser, Uuid) {
    let user = common::create_test_user(app, "reactor").await;
    let question = common::create_question(app, &user.token, "React to this", &[], 0).await;
    let comment = common::add_comment(app, &user.token, common::data_id(&question), "Vote me").await;
    (user, common::data_id(&comment))
}

#[tokio::test]
async fn like_toggles_on_and_off() {
    let app = common::spawn_app().await;
    let (user, comment_id) = setup(&app).await;

    let data = react(&app, &user.token, comment_id, "like").await;
    assert_eq!(data["reaction"], "like");
    assert_eq!(data["like_count"], 1);
    assert_eq!(data["dislike_count"], 0);

    let data = react(&app, &user.token, comment_id, "like").await;
    assert_eq!(data["reaction"], "none");
    assert_eq!(data["like_count"], 0);
}

#[tokio::test]
async fn dislike_flips_a_like() {
    let app = common::spawn_app().await;
    let (user, comment_id) = setup(&app).await;

    react(&app, &user.token, comment_id, "like").await;
    let data = react(&app, &user.token, comment_id, "dislike").await;
    assert_eq!(data["reaction"], "dislike");
    assert_eq!(data["like_count"], 0);
    assert_eq!(data["dislike_count"], 1);

    let resp = app
        .client
        .get(app.url(&format!("/comment/{comment_id}/reaction-count")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["like_count"], 0);
    assert_eq!(body["data"]["dislike_count"], 1);
}

#[tokio::test]
async fn counts_are_per_user() {
    let app = common::spawn_app().await;
    let (user, comment_id) = setup(&app).await;
    let other = common::create_test_user(&app, "other").await;

    react(&app, &user.token, comment_id, "like").await;
    let data = react(&app, &other.token, comment_id, "like").await;
    assert_eq!(data["like_count"], 2);

    let data = react(&app, &other.token, comment_id, "dislike").await;
    assert_eq!(data["like_count"], 1);
    assert_eq!(data["dislike_count"], 1);
}

#[tokio::test]
async fn concurrent_toggles_leave_one_row() {
    let app = common::spawn_app().await;
    let (user, comment_id) = setup(&app).await;

    let mut handles = Vec::new();
    for i in 0..8 {
        let client = app.client.clone();
        let url = app.url(&format!(
            "/comment/{comment_id}/{}",
            if i % 2 == 0 { "like" } else { "dislike" }
        ));
        let token = user.token.clone();
        handles.push(tokio::spawn(async move {
            client.post(url).bearer_auth(token).send().await.unwrap().status()
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), 200);
    }

    let resp = app
        .client
        .get(app.url(&format!("/comment/{comment_id}/reaction-count")))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let total = body["data"]["like_count"].as_i64().unwrap()
        + body["data"]["dislike_count"].as_i64().unwrap();
    assert!(total <= 1);
}

#[tokio::test]
async fn reacting_needs_a_session_and_a_comment() {
    let app = common::spawn_app().await;
    let (user, comment_id) = setup(&app).await;

    let resp = app
        .client
        .post(app.url(&format!("/comment/{comment_id}/like")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = app
        .client
        .post(app.url(&format!("/comment/{}/like", Uuid::new_v4())))
        .bearer_auth(&user.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}
