mod common;

use serde_json::Value;

#[tokio::test]
async fn tags_are_listed_by_name() {
    let app = common::spawn_app().await;
    let admin = common::create_admin(&app).await;
    let (_, zeta) = common::create_tag(&app, &admin.token, "zeta").await;
    let (_, alpha) = common::create_tag(&app, &admin.token, "alpha").await;

    for path in ["/tags/", "/tags"] {
        let resp = app.client.get(app.url(path)).send().await.unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        let names: Vec<&str> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        let a = names.iter().position(|n| *n == alpha).unwrap();
        let z = names.iter().position(|n| *n == zeta).unwrap();
        assert!(a < z);
    }
}

#[tokio::test]
async fn deleting_a_tag_unlinks_questions() {
    let app = common::spawn_app().await;
    let admin = common::create_admin(&app).await;
    let (tag_id, _) = common::create_tag(&app, &admin.token, "fleeting").await;
    let question = common::create_question(&app, &admin.token, "Tagged then untagged", &[tag_id], 0).await;
    let question_id = common::data_id(&question);

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
        .get(app.url(&format!("/question/{question_id}")))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert!(body["data"]["tags"].as_array().unwrap().is_empty());
}
