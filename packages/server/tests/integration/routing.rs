use serde_json::json;

use crate::common::{TestApp, png_bytes, routes};

mod trailing_slash {
    use super::*;

    #[tokio::test]
    async fn collection_and_identity_paths_accept_a_trailing_slash() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        app.create_item(&token, json!({"name": "Drill"})).await;

        let res = app
            .get_with_token(&format!("{}/", routes::ITEMS), &token)
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body.as_array().map(Vec::len), Some(1));

        let res = app.get_with_token(&format!("{}/", routes::ME), &token).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["username"], "alice");
    }

    #[tokio::test]
    async fn token_and_item_writes_accept_a_trailing_slash() {
        let app = TestApp::spawn().await;
        app.create_authenticated_user("alice", "securepass").await;

        let res = app
            .post_without_token(
                &format!("{}/", routes::TOKEN),
                &json!({"username": "alice", "password": "securepass"}),
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        let token = res.body["access"].as_str().unwrap().to_string();

        let res = app
            .post_with_token(&format!("{}/", routes::ITEMS), &json!({"name": "Saw"}), &token)
            .await;
        assert_eq!(res.status, 201, "{}", res.text);
        let id = res.id();

        let res = app
            .patch_with_token(
                &format!("{}/", routes::item(id)),
                &json!({"description": "sharp"}),
                &token,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["description"], "sharp");

        let res = app
            .upload_with_token(
                &format!("{}/", routes::item_upload(id)),
                "image",
                "saw.png",
                png_bytes(),
                &token,
            )
            .await;
        assert_eq!(res.status, 201, "{}", res.text);
    }

    #[tokio::test]
    async fn unknown_paths_still_404() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;

        let res = app.get_with_token("/api/nothing-here/", &token).await;

        assert_eq!(res.status, 404);
    }
}

mod docs {
    use super::*;

    #[tokio::test]
    async fn openapi_document_and_swagger_ui_are_served() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token("/api-docs/openapi.json").await;
        assert_eq!(res.status, 200);
        assert!(res.body["paths"]["/api/items/{id}"].is_object(), "{}", res.text);

        let res = app.get_without_token("/swagger-ui/").await;
        assert_eq!(res.status, 200);
    }
}
