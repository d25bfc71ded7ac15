use crate::common::{TestApp, USER1};

#[tokio::test]
async fn upload_without_credentials_is_challenged() {
    let app = TestApp::spawn().await;
    let part = reqwest::multipart::Part::bytes(b"x".to_vec()).file_name("x.txt");
    let form = reqwest::multipart::Form::new().part("file", part);

    let res = app.upload_form(None, form).await;

    assert_eq!(res.status, 401);
    assert_eq!(res.header("www-authenticate"), "Basic realm=\"Login Required\"");
    assert!(res.body["error"].is_string());
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let app = TestApp::spawn().await;
    let res = app
        .upload_as(("user1", "not-the-password"), "x.txt", b"x".to_vec())
        .await;
    assert_eq!(res.status, 401);
}

#[tokio::test]
async fn unknown_user_is_rejected() {
    let app = TestApp::spawn().await;
    let res = app
        .upload_as(("mallory", "password1"), "x.txt", b"x".to_vec())
        .await;
    assert_eq!(res.status, 401);
}

#[tokio::test]
async fn delete_without_credentials_is_challenged() {
    let app = TestApp::spawn().await;
    let hash = app.upload_ok("keep.txt", b"keep me").await;

    let res = app.delete_as(None, &hash).await;
    assert_eq!(res.status, 401);

    let res = app.delete_as(Some(("user1", "wrong")), &hash).await;
    assert_eq!(res.status, 401);

    // Still there.
    let res = app.delete_as(Some(USER1), &hash).await;
    assert_eq!(res.status, 200);
}
