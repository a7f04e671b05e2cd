use sea_orm::{ActiveModelTrait, ActiveValue::Set};
use smartspend::models::user;
use smartspend::testing::TestApp;

#[tokio::test]
async fn register_logs_the_user_in_without_leaking_the_hash() {
    let app = TestApp::new().await;

    let res = app
        .client
        .post(
            &app.url("/api/auth/register"),
            r#"{"username":"alice","email":"alice@example.com","password":"secret-pass","full_name":"Alice A"}"#,
        )
        .await;

    assert_eq!(res.status, 201, "{}", res.body);
    let data = res.data();
    assert!(!data["access_token"].as_str().unwrap().is_empty());
    assert!(!data["refresh_token"].as_str().unwrap().is_empty());
    assert_eq!(data["user"]["username"], "alice");
    assert_eq!(data["user"]["email"], "alice@example.com");
    assert_eq!(data["user"]["full_name"], "Alice A");
    assert!(data["user"].get("password_hash").is_none());
    assert!(data["user"].get("password").is_none());

    // The pair is immediately usable.
    let me = app
        .client
        .get_with_auth(
            &app.url("/api/users/me"),
            data["access_token"].as_str().unwrap(),
        )
        .await;
    assert_eq!(me.status, 200);
}

#[tokio::test]
async fn register_rejects_duplicates_and_short_passwords() {
    let app = TestApp::new().await;
    app.create_user("bob", "bob@example.com", "secret-pass").await;

    let dup = app
        .client
        .post(
            &app.url("/api/auth/register"),
            r#"{"username":"bob","email":"other@example.com","password":"secret-pass"}"#,
        )
        .await;
    assert_eq!(dup.status, 409);

    let dup_email = app
        .client
        .post(
            &app.url("/api/auth/register"),
            r#"{"username":"bob2","email":"bob@example.com","password":"secret-pass"}"#,
        )
        .await;
    assert_eq!(dup_email.status, 409);

    let short = app
        .client
        .post(
            &app.url("/api/auth/register"),
            r#"{"username":"carol","email":"carol@example.com","password":"short"}"#,
        )
        .await;
    assert_eq!(short.status, 422);
}

#[tokio::test]
async fn concurrent_registration_yields_one_account() {
    let app = TestApp::new().await;

    let body = r#"{"username":"race","email":"race@example.com","password":"secret-pass"}"#;
    let url = app.url("/api/auth/register");

    let (a, b) = tokio::join!(app.client.post(&url, body), app.client.post(&url, body));

    // One wins, the other gets a conflict, never a server error.
    let mut statuses = [a.status, b.status];
    statuses.sort();
    assert_eq!(statuses, [201, 409], "got {} and {}", a.status, b.status);
}

#[tokio::test]
async fn login_works_with_username_or_email() {
    let app = TestApp::new().await;
    app.create_user("dave", "dave@example.com", "secret-pass").await;

    let by_username = app
        .client
        .post(
            &app.url("/api/auth/login"),
            r#"{"username":"dave","password":"secret-pass"}"#,
        )
        .await;
    assert_eq!(by_username.status, 200, "{}", by_username.body);
    assert!(by_username.data()["access_token"].as_str().is_some());
    assert!(by_username.data()["refresh_token"].as_str().is_some());

    let by_email = app
        .client
        .post(
            &app.url("/api/auth/login"),
            r#"{"username":"dave@example.com","password":"secret-pass"}"#,
        )
        .await;
    assert_eq!(by_email.status, 200, "{}", by_email.body);
}

#[tokio::test]
async fn login_failures_share_one_message() {
    let app = TestApp::new().await;
    app.create_user("erin", "erin@example.com", "secret-pass").await;

    let wrong_password = app
        .client
        .post(
            &app.url("/api/auth/login"),
            r#"{"username":"erin","password":"wrong-pass!"}"#,
        )
        .await;
    let unknown_user = app
        .client
        .post(
            &app.url("/api/auth/login"),
            r#"{"username":"nobody","password":"secret-pass"}"#,
        )
        .await;

    assert_eq!(wrong_password.status, 401);
    assert_eq!(unknown_user.status, 401);
    assert_eq!(
        wrong_password.error()["message"],
        unknown_user.error()["message"],
        "failure cause must not be distinguishable"
    );
}

#[tokio::test]
async fn me_requires_a_valid_access_token() {
    let app = TestApp::new().await;
    let user = app.create_user("frank", "frank@example.com", "secret-pass").await;

    let anon = app.client.get(&app.url("/api/users/me")).await;
    assert_eq!(anon.status, 401);

    let garbage = app
        .client
        .get_with_auth(&app.url("/api/users/me"), "not-a-jwt")
        .await;
    assert_eq!(garbage.status, 401);

    let ok = app
        .client
        .get_with_auth(&app.url("/api/users/me"), &user.access_token)
        .await;
    assert_eq!(ok.status, 200, "{}", ok.body);
    assert_eq!(ok.data()["username"], "frank");
}

#[tokio::test]
async fn token_types_are_not_interchangeable() {
    let app = TestApp::new().await;
    let user = app.create_user("grace", "grace@example.com", "secret-pass").await;

    // A refresh token is not a bearer credential.
    let res = app
        .client
        .get_with_auth(&app.url("/api/users/me"), &user.refresh_token)
        .await;
    assert_eq!(res.status, 401);

    // An access token cannot be redeemed for a new pair.
    let body = serde_json::json!({ "refresh_token": user.access_token });
    let res = app
        .client
        .post(&app.url("/api/auth/refresh"), &body.to_string())
        .await;
    assert_eq!(res.status, 401);
}

#[tokio::test]
async fn refresh_rotates_and_the_old_token_dies() {
    let app = TestApp::new().await;
    let user = app.create_user("heidi", "heidi@example.com", "secret-pass").await;

    let body = serde_json::json!({ "refresh_token": user.refresh_token });
    let first = app
        .client
        .post(&app.url("/api/auth/refresh"), &body.to_string())
        .await;
    assert_eq!(first.status, 200, "{}", first.body);

    let new_refresh = first.data()["refresh_token"].as_str().unwrap().to_string();
    assert_ne!(new_refresh, user.refresh_token);

    // The redeemed token is gone for good.
    let reuse = app
        .client
        .post(&app.url("/api/auth/refresh"), &body.to_string())
        .await;
    assert_eq!(reuse.status, 401);

    // The replacement works.
    let body = serde_json::json!({ "refresh_token": new_refresh });
    let second = app
        .client
        .post(&app.url("/api/auth/refresh"), &body.to_string())
        .await;
    assert_eq!(second.status, 200, "{}", second.body);
}

#[tokio::test]
async fn concurrent_redemption_succeeds_exactly_once() {
    let app = TestApp::new().await;
    let user = app.create_user("ivan", "ivan@example.com", "secret-pass").await;

    let body = serde_json::json!({ "refresh_token": user.refresh_token }).to_string();
    let url = app.url("/api/auth/refresh");

    let (a, b) = tokio::join!(app.client.post(&url, &body), app.client.post(&url, &body));

    let successes = [a.status, b.status].iter().filter(|&&s| s == 200).count();
    assert_eq!(successes, 1, "statuses: {} and {}", a.status, b.status);
}

#[tokio::test]
async fn refresh_rejects_garbage() {
    let app = TestApp::new().await;

    for bad in [
        r#"{"refresh_token":""}"#,
        r#"{"refresh_token":"definitely.not.ajwt"}"#,
        r#"{"refresh_token":"eyJhbGciOiJIUzI1NiJ9.e30.bad-signature"}"#,
    ] {
        let res = app.client.post(&app.url("/api/auth/refresh"), bad).await;
        assert_eq!(res.status, 401, "accepted {bad}");
    }
}

#[tokio::test]
async fn deactivated_users_lose_both_token_kinds() {
    let app = TestApp::new().await;
    let user = app.create_user("lena", "lena@example.com", "secret-pass").await;

    let deactivate = user::ActiveModel {
        id: Set(user.user["id"].as_i64().unwrap() as i32),
        is_active: Set(false),
        ..Default::default()
    };
    deactivate.update(&app.db).await.unwrap();

    let me = app
        .client
        .get_with_auth(&app.url("/api/users/me"), &user.access_token)
        .await;
    assert_eq!(me.status, 401);

    let body = serde_json::json!({ "refresh_token": user.refresh_token });
    let refresh = app
        .client
        .post(&app.url("/api/auth/refresh"), &body.to_string())
        .await;
    assert_eq!(refresh.status, 401);

    let login = app
        .client
        .post(
            &app.url("/api/auth/login"),
            r#"{"username":"lena","password":"secret-pass"}"#,
        )
        .await;
    assert_eq!(login.status, 401);
}

#[tokio::test]
async fn change_password_revokes_refresh_tokens() {
    let app = TestApp::new().await;
    let user = app.create_user("judy", "judy@example.com", "secret-pass").await;

    let wrong = app
        .client
        .post_with_auth(
            &app.url("/api/auth/change-password"),
            &user.access_token,
            r#"{"current_password":"not-my-pass","new_password":"fresh-secret"}"#,
        )
        .await;
    assert_eq!(wrong.status, 401);

    let ok = app
        .client
        .post_with_auth(
            &app.url("/api/auth/change-password"),
            &user.access_token,
            r#"{"current_password":"secret-pass","new_password":"fresh-secret"}"#,
        )
        .await;
    assert_eq!(ok.status, 200, "{}", ok.body);

    // The pre-change refresh token is dead.
    let body = serde_json::json!({ "refresh_token": user.refresh_token });
    let res = app
        .client
        .post(&app.url("/api/auth/refresh"), &body.to_string())
        .await;
    assert_eq!(res.status, 401);

    // Old password no longer logs in, the new one does.
    let old = app
        .client
        .post(
            &app.url("/api/auth/login"),
            r#"{"username":"judy","password":"secret-pass"}"#,
        )
        .await;
    assert_eq!(old.status, 401);
    app.login("judy", "fresh-secret").await;
}

#[tokio::test]
async fn logout_kills_refresh_but_not_outstanding_access() {
    let app = TestApp::new().await;
    let user = app.create_user("ken", "ken@example.com", "secret-pass").await;

    let res = app
        .client
        .post_with_auth(&app.url("/api/auth/logout"), &user.access_token, "{}")
        .await;
    assert_eq!(res.status, 200, "{}", res.body);

    let body = serde_json::json!({ "refresh_token": user.refresh_token });
    let refresh = app
        .client
        .post(&app.url("/api/auth/refresh"), &body.to_string())
        .await;
    assert_eq!(refresh.status, 401);

    // Access tokens are stateless and ride out their TTL.
    let me = app
        .client
        .get_with_auth(&app.url("/api/users/me"), &user.access_token)
        .await;
    assert_eq!(me.status, 200);
}
