use serde_json::json;

use crate::common::{ADMIN_USERNAME, TestApp, routes};

async fn user_id(app: &TestApp, token: &str, username: &str) -> i32 {
    let res = app.get_with_token(routes::USERS, token).await;
    assert_eq!(res.status, 200, "{}", res.text);
    res.body
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["username"] == username)
        .and_then(|u| u["id"].as_i64())
        .expect("user should be listed") as i32
}

mod create {
    use super::*;

    #[tokio::test]
    async fn admin_can_create_a_user_with_the_default_role() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;

        let res = app
            .post_with_token(
                routes::USERS,
                &json!({"username": "crew_one", "password": "password123"}),
                &token,
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["username"], "crew_one");
        assert_eq!(res.body["role"], "user");
        assert!(res.body.get("password").is_none());
    }

    #[tokio::test]
    async fn taken_username_returns_409() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        let body = json!({"username": "crew_one", "password": "password123"});
        let first = app.post_with_token(routes::USERS, &body, &token).await;
        assert_eq!(first.status, 201, "{}", first.text);

        let res = app.post_with_token(routes::USERS, &body, &token).await;

        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "USERNAME_TAKEN");
    }

    #[tokio::test]
    async fn short_password_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;

        let res = app
            .post_with_token(
                routes::USERS,
                &json!({"username": "crew_one", "password": "short"}),
                &token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn regular_user_cannot_manage_users() {
        let app = TestApp::spawn().await;
        let token = app
            .create_user_with_role("crew_one", "password123", "user")
            .await;

        let list = app.get_with_token(routes::USERS, &token).await;
        let create = app
            .post_with_token(
                routes::USERS,
                &json!({"username": "crew_two", "password": "password123"}),
                &token,
            )
            .await;

        assert_eq!(list.status, 403);
        assert_eq!(create.status, 403);
        assert_eq!(create.body["code"], "PERMISSION_DENIED");
    }
}

mod manage {
    use super::*;

    #[tokio::test]
    async fn toggle_role_promotes_and_demotes() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        app.create_user_with_role("crew_one", "password123", "user")
            .await;
        let id = user_id(&app, &token, "crew_one").await;

        let up = app
            .post_with_token(&routes::toggle_role(id), &json!({}), &token)
            .await;
        let down = app
            .post_with_token(&routes::toggle_role(id), &json!({}), &token)
            .await;

        assert_eq!(up.status, 200, "{}", up.text);
        assert_eq!(up.body["role"], "admin");
        assert_eq!(down.body["role"], "user");
    }

    #[tokio::test]
    async fn reset_password_changes_the_login() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        app.create_user_with_role("crew_one", "password123", "user")
            .await;
        let id = user_id(&app, &token, "crew_one").await;

        let res = app
            .post_with_token(
                &routes::reset_password(id),
                &json!({"password": "new-password-9"}),
                &token,
            )
            .await;

        assert_eq!(res.status, 204, "{}", res.text);
        assert_eq!(app.login("crew_one", "password123").await.status, 401);
        assert_eq!(app.login("crew_one", "new-password-9").await.status, 200);
    }

    #[tokio::test]
    async fn admin_can_delete_a_user() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        app.create_user_with_role("crew_one", "password123", "user")
            .await;
        let id = user_id(&app, &token, "crew_one").await;

        let res = app.delete_with_token(&routes::user(id), &token).await;

        assert_eq!(res.status, 204);
        assert_eq!(app.login("crew_one", "password123").await.status, 401);
    }

    #[tokio::test]
    async fn bootstrap_admin_is_protected() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let other_admin = app
            .create_user_with_role("office_lead", "password123", "admin")
            .await;
        let id = user_id(&app, &admin, ADMIN_USERNAME).await;

        let delete = app.delete_with_token(&routes::user(id), &other_admin).await;
        let toggle = app
            .post_with_token(&routes::toggle_role(id), &json!({}), &other_admin)
            .await;

        assert_eq!(delete.status, 409);
        assert_eq!(delete.body["code"], "CONFLICT");
        assert_eq!(toggle.status, 409);
    }

    #[tokio::test]
    async fn admin_cannot_delete_themselves() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let token = app
            .create_user_with_role("office_lead", "password123", "admin")
            .await;
        let id = user_id(&app, &admin, "office_lead").await;

        let res = app.delete_with_token(&routes::user(id), &token).await;

        assert_eq!(res.status, 409);
    }

    #[tokio::test]
    async fn missing_user_returns_404() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;

        let res = app.delete_with_token(&routes::user(999), &token).await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }
}
