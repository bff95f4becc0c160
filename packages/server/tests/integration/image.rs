use serde_json::json;

use crate::common::{MAX_BLOB_SIZE, TestApp, png_bytes, routes};

mod upload {
    use super::*;

    #[tokio::test]
    async fn owner_upload_returns_created_image() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let item = app.create_item(&token, json!({"name": "Drill"})).await;

        let res = app
            .upload_with_token(&routes::item_upload(item), "image", "drill.png", png_bytes(), &token)
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        let id = res.id();
        assert_eq!(res.body["image"], format!("/media/images/{id}"));
        assert!(res.body["uploaded_at"].is_string());

        let res = app.get_with_token(&routes::item(item), &token).await;
        assert_eq!(res.body["images"][0]["id"], id);
    }

    #[tokio::test]
    async fn missing_item_is_not_found() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;

        let res = app
            .upload_with_token(&routes::item_upload(404), "image", "a.png", png_bytes(), &token)
            .await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn non_owner_is_forbidden_even_without_an_image() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;
        let bob = app.create_authenticated_user("bob", "securepass").await;
        let item = app.create_item(&alice, json!({"name": "Drill"})).await;

        let res = app
            .upload_with_token(&routes::item_upload(item), "photo", "a.png", png_bytes(), &bob)
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
    }

    #[tokio::test]
    async fn missing_image_field_is_a_bad_request() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let item = app.create_item(&token, json!({"name": "Drill"})).await;

        let res = app
            .upload_with_token(&routes::item_upload(item), "photo", "a.png", png_bytes(), &token)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn json_body_is_a_bad_request() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let item = app.create_item(&token, json!({"name": "Drill"})).await;

        let res = app
            .post_with_token(&routes::item_upload(item), &json!({"image": "x"}), &token)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn non_image_file_is_a_validation_error() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let item = app.create_item(&token, json!({"name": "Drill"})).await;

        let res = app
            .upload_with_token(
                &routes::item_upload(item),
                "image",
                "notes.txt",
                b"hello".to_vec(),
                &token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
        assert_eq!(app.stored_blob_count(), 0);
    }

    #[tokio::test]
    async fn oversized_file_is_a_validation_error() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let item = app.create_item(&token, json!({"name": "Drill"})).await;
        let big = vec![0u8; MAX_BLOB_SIZE as usize + 1];

        let res = app
            .upload_with_token(&routes::item_upload(item), "image", "big.png", big, &token)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");

        let res = app.get_with_token(&routes::item(item), &token).await;
        assert_eq!(res.body["images"], json!([]));
    }
}

mod media {
    use super::*;

    #[tokio::test]
    async fn stored_image_is_served_publicly_with_etag() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let item = app.create_item(&token, json!({"name": "Drill"})).await;
        let image = app.upload_image(item, "drill.png", &png_bytes(), &token).await;

        let res = app
            .client
            .get(app.url(&routes::media_image(image)))
            .send()
            .await
            .expect("Failed to send GET request");
        assert_eq!(res.status(), 200);
        assert_eq!(res.headers()["content-type"], "image/png");
        let etag = res.headers()["etag"].to_str().unwrap().to_string();
        let bytes = res.bytes().await.unwrap();
        assert_eq!(bytes.as_ref(), png_bytes().as_slice());

        let res = app
            .client
            .get(app.url(&routes::media_image(image)))
            .header("If-None-Match", etag)
            .send()
            .await
            .expect("Failed to send GET request");
        assert_eq!(res.status(), 304);
    }

    #[tokio::test]
    async fn unknown_image_is_not_found() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token(&routes::media_image(31337)).await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }
}

mod lifecycle {
    use super::*;

    #[tokio::test]
    async fn upload_permissions_and_cascade_scenario() {
        let app = TestApp::spawn().await;
        let u1 = app.create_authenticated_user("owner", "securepass").await;
        let u2 = app.create_authenticated_user("visitor", "securepass").await;

        let item = app.create_item(&u1, json!({"name": "A"})).await;

        let image = app.upload_image(item, "a.png", &png_bytes(), &u1).await;

        let res = app
            .upload_with_token(&routes::item_upload(item), "image", "b.png", png_bytes(), &u2)
            .await;
        assert_eq!(res.status, 403);

        assert!(!app.list_item_ids("?mine=true", &u2).await.contains(&item));

        let res = app.delete_with_token(&routes::item(item), &u1).await;
        assert_eq!(res.status, 204);

        let res = app.get_without_token(&routes::media_image(image)).await;
        assert_eq!(res.status, 404);
        assert_eq!(app.stored_blob_count(), 0);
    }

    #[tokio::test]
    async fn shared_content_survives_until_last_reference_is_gone() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let first = app.create_item(&token, json!({"name": "First"})).await;
        let second = app.create_item(&token, json!({"name": "Second"})).await;

        app.upload_image(first, "same.png", &png_bytes(), &token).await;
        let kept = app.upload_image(second, "same.png", &png_bytes(), &token).await;
        assert_eq!(app.stored_blob_count(), 1);

        let res = app.delete_with_token(&routes::item(first), &token).await;
        assert_eq!(res.status, 204);
        assert_eq!(app.stored_blob_count(), 1);

        let res = app.get_without_token(&routes::media_image(kept)).await;
        assert_eq!(res.status, 200);

        let res = app.delete_with_token(&routes::item(second), &token).await;
        assert_eq!(res.status, 204);
        assert_eq!(app.stored_blob_count(), 0);
    }
}
