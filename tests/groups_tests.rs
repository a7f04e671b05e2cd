use smartspend::testing::{TestApp, TestUser};

async fn make_group(app: &TestApp, owner: &TestUser, name: &str) -> i64 {
    let res = app
        .client
        .post_with_auth(
            &app.url("/api/groups"),
            &owner.access_token,
            &serde_json::json!({ "name": name }).to_string(),
        )
        .await;
    assert_eq!(res.status, 201, "{}", res.body);
    res.data()["id"].as_i64().unwrap()
}

#[tokio::test]
async fn creator_becomes_owner_and_first_member() {
    let app = TestApp::new().await;
    let alice = app.create_user("alice", "alice@example.com", "secret-pass").await;

    let group_id = make_group(&app, &alice, "Flat 12B").await;

    let res = app
        .client
        .get_with_auth(&app.url("/api/groups/me"), &alice.access_token)
        .await;
    assert_eq!(res.status, 200, "{}", res.body);

    let data = res.data();
    assert_eq!(data["id"].as_i64(), Some(group_id));
    assert_eq!(data["name"], "Flat 12B");
    assert_eq!(data["owner_id"], alice.user["id"]);
    let members = data["members"].as_array().unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0]["username"], "alice");
}

#[tokio::test]
async fn one_group_per_user() {
    let app = TestApp::new().await;
    let alice = app.create_user("alice", "alice@example.com", "secret-pass").await;
    make_group(&app, &alice, "First").await;

    let res = app
        .client
        .post_with_auth(
            &app.url("/api/groups"),
            &alice.access_token,
            r#"{"name":"Second"}"#,
        )
        .await;
    assert_eq!(res.status, 409);
}

#[tokio::test]
async fn groups_are_invisible_to_non_members() {
    let app = TestApp::new().await;
    let alice = app.create_user("alice", "alice@example.com", "secret-pass").await;
    let bob = app.create_user("bob", "bob@example.com", "secret-pass").await;
    let group_id = make_group(&app, &alice, "Private").await;

    let res = app
        .client
        .get_with_auth(
            &app.url(&format!("/api/groups/{group_id}")),
            &bob.access_token,
        )
        .await;
    assert_eq!(res.status, 404);

    // Same status as a group that does not exist at all.
    let missing = app
        .client
        .get_with_auth(&app.url("/api/groups/999999"), &bob.access_token)
        .await;
    assert_eq!(missing.status, res.status);
}

#[tokio::test]
async fn owner_adds_and_removes_members() {
    let app = TestApp::new().await;
    let alice = app.create_user("alice", "alice@example.com", "secret-pass").await;
    let bob = app.create_user("bob", "bob@example.com", "secret-pass").await;
    let group_id = make_group(&app, &alice, "Household").await;

    let res = app
        .client
        .post_with_auth(
            &app.url(&format!("/api/groups/{group_id}/members")),
            &alice.access_token,
            r#"{"username":"bob"}"#,
        )
        .await;
    assert_eq!(res.status, 201, "{}", res.body);

    // Bob can now see the group.
    let seen = app
        .client
        .get_with_auth(
            &app.url(&format!("/api/groups/{group_id}")),
            &bob.access_token,
        )
        .await;
    assert_eq!(seen.status, 200);
    assert_eq!(seen.data()["members"].as_array().unwrap().len(), 2);

    // And be removed again.
    let bob_id = bob.user["id"].as_i64().unwrap();
    let removed = app
        .client
        .delete_with_auth(
            &app.url(&format!("/api/groups/{group_id}/members/{bob_id}")),
            &alice.access_token,
        )
        .await;
    assert_eq!(removed.status, 200, "{}", removed.body);

    // Once out, Bob is free to start his own group.
    make_group(&app, &bob, "Bob's place").await;
}

#[tokio::test]
async fn member_management_is_owner_only() {
    let app = TestApp::new().await;
    let alice = app.create_user("alice", "alice@example.com", "secret-pass").await;
    let bob = app.create_user("bob", "bob@example.com", "secret-pass").await;
    let carol = app.create_user("carol", "carol@example.com", "secret-pass").await;
    let group_id = make_group(&app, &alice, "Household").await;

    app.client
        .post_with_auth(
            &app.url(&format!("/api/groups/{group_id}/members")),
            &alice.access_token,
            r#"{"username":"bob"}"#,
        )
        .await;

    // A plain member cannot invite.
    let res = app
        .client
        .post_with_auth(
            &app.url(&format!("/api/groups/{group_id}/members")),
            &bob.access_token,
            r#"{"username":"carol"}"#,
        )
        .await;
    assert_eq!(res.status, 403);

    // Nor rename or delete.
    let rename = app
        .client
        .put_with_auth(
            &app.url(&format!("/api/groups/{group_id}")),
            &bob.access_token,
            r#"{"name":"Bob's now"}"#,
        )
        .await;
    assert_eq!(rename.status, 403);

    let delete = app
        .client
        .delete_with_auth(
            &app.url(&format!("/api/groups/{group_id}")),
            &bob.access_token,
        )
        .await;
    assert_eq!(delete.status, 403);
    let _ = carol;
}

#[tokio::test]
async fn cannot_add_someone_who_already_has_a_group() {
    let app = TestApp::new().await;
    let alice = app.create_user("alice", "alice@example.com", "secret-pass").await;
    let bob = app.create_user("bob", "bob@example.com", "secret-pass").await;
    let group_id = make_group(&app, &alice, "Alice's").await;
    make_group(&app, &bob, "Bob's").await;

    let res = app
        .client
        .post_with_auth(
            &app.url(&format!("/api/groups/{group_id}/members")),
            &alice.access_token,
            r#"{"username":"bob"}"#,
        )
        .await;
    assert_eq!(res.status, 409);
}

#[tokio::test]
async fn owner_cannot_remove_themselves() {
    let app = TestApp::new().await;
    let alice = app.create_user("alice", "alice@example.com", "secret-pass").await;
    let group_id = make_group(&app, &alice, "Solo").await;
    let alice_id = alice.user["id"].as_i64().unwrap();

    let res = app
        .client
        .delete_with_auth(
            &app.url(&format!("/api/groups/{group_id}/members/{alice_id}")),
            &alice.access_token,
        )
        .await;
    assert_eq!(res.status, 400);
}

#[tokio::test]
async fn owner_renames_the_group() {
    let app = TestApp::new().await;
    let alice = app.create_user("alice", "alice@example.com", "secret-pass").await;
    let group_id = make_group(&app, &alice, "Old name").await;

    let res = app
        .client
        .put_with_auth(
            &app.url(&format!("/api/groups/{group_id}")),
            &alice.access_token,
            r#"{"name":"New name"}"#,
        )
        .await;
    assert_eq!(res.status, 200, "{}", res.body);
    assert_eq!(res.data()["name"], "New name");
}

#[tokio::test]
async fn deleting_a_group_frees_members_and_detaches_transactions() {
    let app = TestApp::new().await;
    let alice = app.create_user("alice", "alice@example.com", "secret-pass").await;
    let bob = app.create_user("bob", "bob@example.com", "secret-pass").await;
    let group_id = make_group(&app, &alice, "Ephemeral").await;

    app.client
        .post_with_auth(
            &app.url(&format!("/api/groups/{group_id}/members")),
            &alice.access_token,
            r#"{"username":"bob"}"#,
        )
        .await;

    // A transaction tagged with the group.
    let tx = app
        .client
        .post_with_auth(
            &app.url("/api/transactions"),
            &alice.access_token,
            &serde_json::json!({
                "title": "Rent",
                "amount": 800.0,
                "kind": "expense",
                "group_id": group_id,
            })
            .to_string(),
        )
        .await;
    assert_eq!(tx.status, 201, "{}", tx.body);
    let tx_id = tx.data()["id"].as_i64().unwrap();

    let res = app
        .client
        .delete_with_auth(
            &app.url(&format!("/api/groups/{group_id}")),
            &alice.access_token,
        )
        .await;
    assert_eq!(res.status, 200, "{}", res.body);

    // Both former members can start fresh groups.
    make_group(&app, &alice, "Alice again").await;
    make_group(&app, &bob, "Bob again").await;

    // The transaction survives, untagged.
    let kept = app
        .client
        .get_with_auth(
            &app.url(&format!("/api/transactions/{tx_id}")),
            &alice.access_token,
        )
        .await;
    assert_eq!(kept.status, 200, "{}", kept.body);
    assert!(kept.data()["group_id"].is_null());
}
