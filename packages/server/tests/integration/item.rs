use serde_json::json;

use crate::common::{TestApp, routes};

mod create {
    use super::*;

    #[tokio::test]
    async fn owner_is_always_the_creator() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;
        let bob = app.create_authenticated_user("bob", "securepass").await;
        let bob_id = app.get_with_token(routes::ME, &bob).await.id();
        let alice_id = app.get_with_token(routes::ME, &alice).await.id();

        let res = app
            .post_with_token(
                routes::ITEMS,
                &json!({"name": "Tent", "owner": bob_id}),
                &alice,
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["owner"], alice_id);
    }

    #[tokio::test]
    async fn response_embeds_related_records() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let loc = app.create_location(&token, "Garage").await;
        let group = app.create_group(&token, "Camping").await;
        let t1 = app.create_tag(&token, "outdoor").await;
        let t2 = app.create_tag(&token, "heavy").await;

        let res = app
            .post_with_token(
                routes::ITEMS,
                &json!({
                    "name": "Tent",
                    "description": "Four person",
                    "location": loc,
                    "group": group,
                    "tags": [t2, t1, t2],
                }),
                &token,
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["name"], "Tent");
        assert_eq!(res.body["description"], "Four person");
        assert_eq!(res.body["location"], loc);
        assert_eq!(res.body["location_detail"]["name"], "Garage");
        assert_eq!(res.body["group"], group);
        assert_eq!(res.body["group_detail"]["name"], "Camping");
        assert_eq!(res.body["tags"], json!([t1, t2]));
        assert_eq!(res.body["tags_detail"][0]["name"], "outdoor");
        assert_eq!(res.body["images"], json!([]));
        assert!(res.body["created_at"].is_string());
    }

    #[tokio::test]
    async fn unplaced_item_has_null_details() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;

        let res = app
            .post_with_token(routes::ITEMS, &json!({"name": "Loose screw"}), &token)
            .await;

        assert_eq!(res.status, 201);
        assert!(res.body["location"].is_null());
        assert!(res.body["location_detail"].is_null());
        assert!(res.body["group_detail"].is_null());
    }

    #[tokio::test]
    async fn unknown_location_is_a_bad_request() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;

        let res = app
            .post_with_token(
                routes::ITEMS,
                &json!({"name": "Tent", "location": 999}),
                &token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "BAD_REQUEST");
        assert!(app.list_item_ids("", &token).await.is_empty());
    }

    #[tokio::test]
    async fn unknown_tag_is_a_bad_request() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let tag = app.create_tag(&token, "real").await;

        let res = app
            .post_with_token(
                routes::ITEMS,
                &json!({"name": "Tent", "tags": [tag, 4242]}),
                &token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;

        let res = app
            .post_with_token(routes::ITEMS, &json!({"name": "   "}), &token)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn anonymous_requests_are_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(routes::ITEMS, &json!({"name": "Tent"}))
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_MISSING");
    }
}

mod retrieve {
    use super::*;

    #[tokio::test]
    async fn any_user_can_read_any_item() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;
        let bob = app.create_authenticated_user("bob", "securepass").await;
        let id = app.create_item(&alice, json!({"name": "Drill"})).await;

        let res = app.get_with_token(&routes::item(id), &bob).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["name"], "Drill");
    }

    #[tokio::test]
    async fn missing_item_is_not_found() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;

        let res = app.get_with_token(&routes::item(12345), &token).await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }
}

mod update {
    use super::*;

    #[tokio::test]
    async fn non_owner_is_forbidden_and_item_is_unchanged() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;
        let bob = app.create_authenticated_user("bob", "securepass").await;
        let id = app.create_item(&alice, json!({"name": "Drill"})).await;

        let patch = app
            .patch_with_token(&routes::item(id), &json!({"name": "Stolen"}), &bob)
            .await;
        let put = app
            .put_with_token(&routes::item(id), &json!({"name": "Stolen"}), &bob)
            .await;
        let delete = app.delete_with_token(&routes::item(id), &bob).await;

        for res in [patch, put, delete] {
            assert_eq!(res.status, 403, "{}", res.text);
            assert_eq!(res.body["code"], "PERMISSION_DENIED");
        }

        let res = app.get_with_token(&routes::item(id), &alice).await;
        assert_eq!(res.body["name"], "Drill");
    }

    #[tokio::test]
    async fn missing_item_is_not_found_before_ownership_is_checked() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;

        let res = app
            .patch_with_token(&routes::item(777), &json!({"name": "x"}), &token)
            .await;

        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn patch_changes_only_supplied_fields() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let loc = app.create_location(&token, "Shed").await;
        let id = app
            .create_item(
                &token,
                json!({"name": "Saw", "description": "Rusty", "location": loc}),
            )
            .await;

        let res = app
            .patch_with_token(&routes::item(id), &json!({"description": "Sharp"}), &token)
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["name"], "Saw");
        assert_eq!(res.body["description"], "Sharp");
        assert_eq!(res.body["location"], loc);
    }

    #[tokio::test]
    async fn patch_null_clears_location_and_group() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let loc = app.create_location(&token, "Shed").await;
        let group = app.create_group(&token, "Tools").await;
        let id = app
            .create_item(
                &token,
                json!({"name": "Saw", "location": loc, "group": group}),
            )
            .await;

        let res = app
            .patch_with_token(
                &routes::item(id),
                &json!({"location": null, "group": null}),
                &token,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert!(res.body["location"].is_null());
        assert!(res.body["group"].is_null());
    }

    #[tokio::test]
    async fn empty_tag_list_clears_all_tags() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let t1 = app.create_tag(&token, "a").await;
        let t2 = app.create_tag(&token, "b").await;
        let id = app
            .create_item(&token, json!({"name": "Box", "tags": [t1, t2]}))
            .await;

        let res = app
            .patch_with_token(&routes::item(id), &json!({"tags": []}), &token)
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["tags"], json!([]));
        assert_eq!(res.body["tags_detail"], json!([]));
        assert!(app.list_item_ids(&format!("?tag={t1}"), &token).await.is_empty());
    }

    #[tokio::test]
    async fn tag_list_replaces_the_previous_set() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let t1 = app.create_tag(&token, "a").await;
        let t2 = app.create_tag(&token, "b").await;
        let t3 = app.create_tag(&token, "c").await;
        let id = app
            .create_item(&token, json!({"name": "Box", "tags": [t1, t2]}))
            .await;

        let res = app
            .put_with_token(
                &routes::item(id),
                &json!({"name": "Box", "tags": [t3, t2]}),
                &token,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["tags"], json!([t2, t3]));
    }

    #[tokio::test]
    async fn put_requires_a_name() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let id = app.create_item(&token, json!({"name": "Saw"})).await;

        let res = app
            .put_with_token(&routes::item(id), &json!({"description": "x"}), &token)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn put_leaves_absent_fields_unchanged() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let tag = app.create_tag(&token, "sharp").await;
        let id = app
            .create_item(
                &token,
                json!({"name": "Saw", "description": "Rusty", "tags": [tag]}),
            )
            .await;

        let res = app
            .put_with_token(&routes::item(id), &json!({"name": "Hand saw"}), &token)
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["name"], "Hand saw");
        assert_eq!(res.body["description"], "Rusty");
        assert_eq!(res.body["tags"], json!([tag]));
    }

    #[tokio::test]
    async fn failed_reference_check_rolls_back_the_whole_update() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let tag = app.create_tag(&token, "keep").await;
        let id = app
            .create_item(&token, json!({"name": "Saw", "tags": [tag]}))
            .await;

        let res = app
            .patch_with_token(
                &routes::item(id),
                &json!({"name": "Renamed", "tags": [], "group": 999}),
                &token,
            )
            .await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "BAD_REQUEST");

        let res = app.get_with_token(&routes::item(id), &token).await;
        assert_eq!(res.body["name"], "Saw");
        assert_eq!(res.body["tags"], json!([tag]));
    }

    #[tokio::test]
    async fn owner_cannot_be_reassigned() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;
        let bob = app.create_authenticated_user("bob", "securepass").await;
        let alice_id = app.get_with_token(routes::ME, &alice).await.id();
        let bob_id = app.get_with_token(routes::ME, &bob).await.id();
        let id = app.create_item(&alice, json!({"name": "Saw"})).await;

        let res = app
            .patch_with_token(&routes::item(id), &json!({"owner": bob_id}), &alice)
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["owner"], alice_id);
    }
}

mod delete {
    use super::*;

    #[tokio::test]
    async fn owner_can_delete() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let tag = app.create_tag(&token, "t").await;
        let id = app
            .create_item(&token, json!({"name": "Saw", "tags": [tag]}))
            .await;

        let res = app.delete_with_token(&routes::item(id), &token).await;
        assert_eq!(res.status, 204);

        let res = app.get_with_token(&routes::item(id), &token).await;
        assert_eq!(res.status, 404);

        // The tag itself survives.
        let res = app.get_with_token(&routes::tag(tag), &token).await;
        assert_eq!(res.status, 200);
    }
}
