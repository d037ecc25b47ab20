mod common;

use reqwest::multipart;
use serde_json::{json, Value};
use uuid::Uuid;

#[tokio::test]
async fn add_and_list_comments() {
    let app = common::spawn_app().await;
    let asker = common::create_test_user(&app, "qauthor").await;
    let helper = common::create_test_user(&app, "helper").await;
    let question = common::create_question(&app, &asker.token, "Need help please", &[], 0).await;
    let question_id = common::data_id(&question);

    common::add_comment(&app, &helper.token, question_id, "First answer").await;
    let second = common::add_comment(&app, &asker.token, question_id, "Second answer").await;
    assert_eq!(second["data"]["like_count"], 0);
    assert_eq!(second["data"]["author"]["nickname"], asker.nickname.as_str());

    let resp = app
        .client
        .get(app.url(&format!("/comment/{question_id}/comments")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let items = body["data"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["content"], "Second answer");
    assert_eq!(items[1]["author"]["id"], helper.id.to_string());
}

#[tokio::test]
async fn comment_with_images() {
    let app = common::spawn_app().await;
    let user = common::create_test_user(&app, "imgcomment").await;
    let question = common::create_question(&app, &user.token, "Pictures below", &[], 0).await;
    let question_id = common::data_id(&question);

    let form = multipart::Form::new()
        .text("comment", "See attached")
        .part("images", common::png_part());
    let resp = app
        .client
        .post(app.url(&format!("/comment/{question_id}/add-comment")))
        .bearer_auth(&user.token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let image = body["data"]["images"][0].as_str().unwrap().to_string();
    let comment_id = common::data_id(&body);

    let resp = app.client.get(app.url(&image)).send().await.unwrap();
    assert_eq!(resp.status(), 200);

    let resp = app
        .client
        .delete(app.url(&format!("/comment/{comment_id}/delete-comment")))
        .bearer_auth(&user.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = app.client.get(app.url(&image)).send().await.unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn comment_on_missing_question() {
    let app = common::spawn_app().await;
    let user = common::create_test_user(&app, "lost").await;
    let missing = Uuid::new_v4();

    let form = multipart::Form::new().text("comment", "Hello?");
    let resp = app
        .client
        .post(app.url(&format!("/comment/{missing}/add-comment")))
        .bearer_auth(&user.token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let resp = app
        .client
        .get(app.url(&format!("/comment/{missing}/comments")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn empty_comment_is_rejected() {
    let app = common::spawn_app().await;
    let user = common::create_test_user(&app, "empty").await;
    let question = common::create_question(&app, &user.token, "Blank replies", &[], 0).await;
    let question_id = common::data_id(&question);

    let form = multipart::Form::new().text("comment", "   ");
    let resp = app
        .client
        .post(app.url(&format!("/comment/{question_id}/add-comment")))
        .bearer_auth(&user.token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn update_and_delete_permissions() {
    let app = common::spawn_app().await;
    let author = common::create_test_user(&app, "cauthor").await;
    let stranger = common::create_test_user(&app, "cstranger").await;
    let admin = common::create_admin(&app).await;
    let question = common::create_question(&app, &author.token, "Permission test", &[], 0).await;
    let comment = common::add_comment(&app, &author.token, common::data_id(&question), "Mine").await;
    let comment_id = common::data_id(&comment);

    let resp = app
        .client
        .put(app.url(&format!("/comment/{comment_id}/update-comment")))
        .bearer_auth(&stranger.token)
        .json(&json!({ "comment": "Not yours" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    let resp = app
        .client
        .put(app.url(&format!("/comment/{comment_id}/update-comment")))
        .bearer_auth(&author.token)
        .json(&json!({ "comment": "Edited" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["content"], "Edited");

    let resp = app
        .client
        .delete(app.url(&format!("/comment/{comment_id}/delete-comment")))
        .bearer_auth(&stranger.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    let resp = app
        .client
        .delete(app.url(&format!("/comment/{comment_id}/delete-comment")))
        .bearer_auth(&admin.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = app
        .client
        .delete(app.url(&format!("/comment/{comment_id}/delete-comment")))
        .bearer_auth(&admin.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn deleting_question_removes_its_comments() {
    let app = common::spawn_app().await;
    let user = common::create_test_user(&app, "cascade").await;
    let question = common::create_question(&app, &user.token, "Short lived", &[], 0).await;
    let question_id = common::data_id(&question);
    let comment = common::add_comment(&app, &user.token, question_id, "Soon gone").await;
    let comment_id = common::data_id(&comment);

    let resp = app
        .client
        .delete(app.url(&format!("/question/{question_id}/delete")))
        .bearer_auth(&user.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = app
        .client
        .get(app.url(&format!("/comment/{comment_id}/reaction-count")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}
