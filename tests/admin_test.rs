mod common;

use serde_json::{json, Value};
use uuid::Uuid;

#[tokio::test]
async fn admin_routes_require_admin_role() {
    let app = common::spawn_app().await;
    let user = common::create_test_user(&app, "plain").await;

    let resp = app
        .client
        .get(app.url("/admin/get-statics"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = app
        .client
        .get(app.url("/admin/get-statics"))
        .bearer_auth(&user.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
}

#[tokio::test]
async fn statistics_count_content() {
    let app = common::spawn_app().await;
    let admin = common::create_admin(&app).await;

    let before: Value = app
        .client
        .get(app.url("/admin/get-statics"))
        .bearer_auth(&admin.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let user = common::create_test_user(&app, "counted").await;
    let question = common::create_question(&app, &user.token, "Counted question", &[], 0).await;
    common::add_comment(&app, &user.token, common::data_id(&question), "Counted comment").await;

    let after: Value = app
        .client
        .get(app.url("/admin/get-statics"))
        .bearer_auth(&admin.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    for key in ["user_count", "question_count", "comment_count"] {
        let b = before["data"][key].as_u64().unwrap();
        let a = after["data"][key].as_u64().unwrap();
        assert!(a > b, "{key} did not grow: {b} -> {a}");
    }
}

#[tokio::test]
async fn six_months_data_is_newest_first() {
    let app = common::spawn_app().await;
    let admin = common::create_admin(&app).await;
    let question = common::create_question(&app, &admin.token, "This month", &[], 0).await;
    common::add_comment(&app, &admin.token, common::data_id(&question), "Also this month").await;

    let resp = app
        .client
        .get(app.url("/admin/six-months-data"))
        .bearer_auth(&admin.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let months = body["data"].as_array().unwrap();
    assert_eq!(months.len(), 6);

    let current = chrono::Utc::now().format("%Y-%m").to_string();
    assert_eq!(months[0]["month"], current.as_str());
    assert!(months[0]["question_count"].as_u64().unwrap() >= 1);
    assert!(months[0]["comment_count"].as_u64().unwrap() >= 1);
    assert!(months[0]["month"].as_str().unwrap() > months[1]["month"].as_str().unwrap());
}

#[tokio::test]
async fn delete_user_removes_their_content() {
    let app = common::spawn_app().await;
    let admin = common::create_admin(&app).await;
    let victim = common::create_test_user(&app, "victim").await;
    let bystander = common::create_test_user(&app, "bystander").await;

    let question = common::create_question(&app, &victim.token, "Doomed question", &[], 1).await;
    let question_id = common::data_id(&question);
    let image = question["data"]["images"][0].as_str().unwrap().to_string();
    let other_q = common::create_question(&app, &bystander.token, "Survivor question", &[], 0).await;
    let victim_comment =
        common::add_comment(&app, &victim.token, common::data_id(&other_q), "Doomed comment").await;
    app.client
        .post(app.url(&format!(
            "/comment/{}/like",
            common::data_id(&victim_comment)
        )))
        .bearer_auth(&bystander.token)
        .send()
        .await
        .unwrap();

    let resp = app
        .client
        .delete(app.url(&format!("/admin/{}/delete-user", victim.id)))
        .bearer_auth(&admin.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = app
        .client
        .get(app.url(&format!("/user/{}", victim.id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let resp = app
        .client
        .get(app.url(&format!("/question/{question_id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let resp = app.client.get(app.url(&image)).send().await.unwrap();
    assert_eq!(resp.status(), 404);

    let resp = app
        .client
        .get(app.url(&format!("/comment/{}/comments", common::data_id(&other_q))))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert!(body["data"].as_array().unwrap().is_empty());

    // The deleted user's session no longer works
    let resp = app
        .client
        .get(app.url("/auth/autologin"))
        .bearer_auth(&victim.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn admin_cannot_delete_self_or_missing_user() {
    let app = common::spawn_app().await;
    let admin = common::create_admin(&app).await;

    let resp = app
        .client
        .delete(app.url(&format!("/admin/{}/delete-user", admin.id)))
        .bearer_auth(&admin.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = app
        .client
        .delete(app.url(&format!("/admin/{}/delete-user", Uuid::new_v4())))
        .bearer_auth(&admin.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn tag_management() {
    let app = common::spawn_app().await;
    let admin = common::create_admin(&app).await;
    let name = common::unique("MixedCase");

    let resp = app
        .client
        .post(app.url("/admin/add-tag"))
        .bearer_auth(&admin.token)
        .json(&json!({ "name": format!("  {name}  ") }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["name"], name.to_lowercase());
    let tag_id = common::data_id(&body);

    let resp = app
        .client
        .post(app.url("/admin/add-tag"))
        .bearer_auth(&admin.token)
        .json(&json!({ "name": name.to_uppercase() }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Tag already exists");

    let resp = app
        .client
        .post(app.url("/admin/add-tag"))
        .bearer_auth(&admin.token)
        .json(&json!({ "name": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = app
        .client
        .delete(app.url(&format!("/admin/{tag_id}/delete-tag")))
        .bearer_auth(&admin.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = app
        .client
        .delete(app.url(&format!("/admin/{tag_id}/delete-tag")))
        .bearer_auth(&admin.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}
