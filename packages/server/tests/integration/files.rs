use std::sync::atomic::Ordering;

use crate::common::{TestApp, USER1, USER2, routes};

const TEST_CONTENT_HASH: &str = "6ae8a75555209fd6c44157c0aed8016e763ff435a19cf186f76863140143ff72";

mod upload {
    use super::*;

    #[tokio::test]
    async fn first_upload_returns_hash() {
        let app = TestApp::spawn().await;

        let res = app
            .upload_as(USER1, "testfile.txt", b"test content".to_vec())
            .await;

        assert_eq!(res.status, 201);
        assert_eq!(res.file_hash(), TEST_CONTENT_HASH);
        assert!(res.body.get("message").is_none());
    }

    #[tokio::test]
    async fn duplicate_upload_reports_existing_hash() {
        let app = TestApp::spawn().await;
        app.upload_ok("testfile.txt", b"test content").await;

        let res = app
            .upload_as(USER2, "other-name.txt", b"test content".to_vec())
            .await;

        assert_eq!(res.status, 201);
        assert_eq!(res.body["message"], "File already exists.");
        assert_eq!(res.file_hash(), TEST_CONTENT_HASH);

        // The first uploader's filename sticks.
        let download = app.get(&routes::download(TEST_CONTENT_HASH)).await;
        assert!(
            download
                .header("content-disposition")
                .contains("filename=\"testfile.txt\"")
        );
    }

    #[tokio::test]
    async fn missing_file_part_is_rejected() {
        let app = TestApp::spawn().await;
        let form = reqwest::multipart::Form::new().text("note", "no file here");

        let res = app.upload_form(Some(USER1), form).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.error(), "No file part.");
    }

    #[tokio::test]
    async fn empty_filename_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app.upload_as(USER1, "", b"anonymous".to_vec()).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.error(), "No selected file.");
    }

    #[tokio::test]
    async fn filename_is_stored_as_sent() {
        let app = TestApp::spawn().await;
        let hash = app.upload_ok("  padded name.txt ", b"spacing").await;

        let res = app.get(&routes::download(&hash)).await;
        assert!(
            res.header("content-disposition")
                .starts_with("attachment; filename=\"  padded name.txt \"")
        );
    }

    #[tokio::test]
    async fn filename_with_path_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .upload_as(USER1, "../etc/passwd", b"sneaky".to_vec())
            .await;

        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn oversized_file_is_rejected() {
        let app = TestApp::spawn_with_config(|c| c.storage.max_upload_size = 16).await;
        assert_eq!(app.config.storage.max_upload_size, 16);

        let res = app.upload_as(USER1, "big.bin", vec![7u8; 1024]).await;

        assert_eq!(res.status, 400);
        assert!(res.error().contains("maximum size"));
    }

    #[tokio::test]
    async fn concurrent_identical_uploads_create_once() {
        let app = TestApp::spawn().await;

        let uploads = (0..6).map(|i| {
            let who = if i % 2 == 0 { USER1 } else { USER2 };
            app.upload_as(who, "same.txt", b"same bytes".to_vec())
        });
        let results = futures::future::join_all(uploads).await;

        let mut created = 0;
        for res in &results {
            assert_eq!(res.status, 201, "{}", res.text);
            if res.body.get("message").is_none() {
                created += 1;
            }
        }
        assert_eq!(created, 1);

        let first = results[0].file_hash();
        assert!(results.iter().all(|r| r.file_hash() == first));
    }

    #[tokio::test]
    async fn blob_write_failure_is_bad_request() {
        let (app, blobs) = TestApp::spawn_faulty().await;
        blobs.fail_put.set(1);

        let res = app.upload_as(USER1, "f.txt", b"unlucky".to_vec()).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.error(), "Could not save file.");

        // Nothing was recorded, so a retry creates the file.
        let res = app.upload_as(USER1, "f.txt", b"unlucky".to_vec()).await;
        assert_eq!(res.status, 201);
        assert!(res.body.get("message").is_none());
    }
}

mod download {
    use super::*;

    #[tokio::test]
    async fn returns_bytes_as_attachment() {
        let app = TestApp::spawn().await;
        let hash = app.upload_ok("testfile.txt", b"test content").await;

        let res = app.get(&routes::download(&hash)).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.text, "test content");
        assert_eq!(res.header("content-type"), "application/octet-stream");
        assert_eq!(
            res.header("content-disposition"),
            "attachment; filename=\"testfile.txt\""
        );
        assert_eq!(res.header("content-length"), "12");
    }

    #[tokio::test]
    async fn needs_no_credentials() {
        let app = TestApp::spawn().await;
        let hash = app.upload_ok("public.txt", b"anyone can read").await;

        let res = app
            .client
            .get(format!("http://{}{}", app.addr, routes::download(&hash)))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status().as_u16(), 200);
    }

    #[tokio::test]
    async fn unknown_hash_is_not_found() {
        let app = TestApp::spawn().await;

        let res = app.get(&routes::download(TEST_CONTENT_HASH)).await;

        assert_eq!(res.status, 404);
        assert_eq!(res.error(), "File not found.");
    }

    #[tokio::test]
    async fn record_without_blob_looks_like_unknown_hash() {
        let app = TestApp::spawn().await;
        let hash = app.upload_ok("vanished.txt", b"gone from disk").await;
        std::fs::remove_file(app.config.storage.root.join(&hash[..2]).join(&hash)).unwrap();

        let res = app.get(&routes::download(&hash)).await;
        let unknown = app.get(&routes::download(&"0".repeat(64))).await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body, unknown.body);
        assert_eq!(res.error(), "File not found.");
    }

    #[tokio::test]
    async fn malformed_hash_is_not_found() {
        let app = TestApp::spawn().await;

        let non_hex = "z".repeat(64);
        for bad in ["abc", "not-a-hash", non_hex.as_str()] {
            let res = app.get(&routes::download(bad)).await;
            assert_eq!(res.status, 404, "hash {bad}");
        }
    }

    #[tokio::test]
    async fn unreadable_blob_is_server_error() {
        let (app, blobs) = TestApp::spawn_faulty().await;
        let hash = app.upload_ok("r.txt", b"readable later").await;
        blobs.fail_open.set(1);

        let res = app.get(&routes::download(&hash)).await;

        assert_eq!(res.status, 500);
        assert_eq!(res.error(), "Could not read file.");
    }
}

mod delete {
    use super::*;

    #[tokio::test]
    async fn owner_can_delete() {
        let app = TestApp::spawn().await;
        let hash = app.upload_ok("testfile.txt", b"test content").await;

        let res = app.delete_as(Some(USER1), &hash).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["message"], "File deleted.");

        let res = app.get(&routes::download(&hash)).await;
        assert_eq!(res.status, 404);

        let res = app.delete_as(Some(USER1), &hash).await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn non_owner_gets_not_found() {
        let app = TestApp::spawn().await;
        let hash = app.upload_ok("testfile.txt", b"test content").await;
        app.upload_as(USER2, "testfile.txt", b"test content".to_vec())
            .await;

        let refused = app.delete_as(Some(USER2), &hash).await;
        let missing = app.delete_as(Some(USER2), &"0".repeat(64)).await;

        assert_eq!(refused.status, 404);
        assert_eq!(refused.body, missing.body);

        let res = app.get(&routes::download(&hash)).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.text, "test content");
    }

    #[tokio::test]
    async fn malformed_hash_is_not_found() {
        let app = TestApp::spawn().await;
        let res = app.delete_as(Some(USER1), "xyz").await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn blob_delete_failure_is_server_error_and_keeps_file() {
        let (app, blobs) = TestApp::spawn_faulty().await;
        let hash = app.upload_ok("k.txt", b"keep on failure").await;
        blobs.fail_delete.set(1);

        let res = app.delete_as(Some(USER1), &hash).await;
        assert_eq!(res.status, 500);
        assert_eq!(res.error(), "Could not delete file.");
        assert_eq!(blobs.delete_calls.load(Ordering::SeqCst), 1);

        let res = app.get(&routes::download(&hash)).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.text, "keep on failure");
    }

    #[tokio::test]
    async fn deleted_content_can_be_reuploaded_by_someone_else() {
        let app = TestApp::spawn().await;
        let hash = app.upload_ok("a.txt", b"second life").await;
        app.delete_as(Some(USER1), &hash).await;

        let res = app
            .upload_as(USER2, "b.txt", b"second life".to_vec())
            .await;
        assert_eq!(res.status, 201);
        assert!(res.body.get("message").is_none());

        let res = app.delete_as(Some(USER2), &hash).await;
        assert_eq!(res.status, 200);
    }
}

mod service {
    use super::*;

    #[tokio::test]
    async fn health_is_ok() {
        let app = TestApp::spawn().await;
        let res = app.get(routes::HEALTH).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["status"], "ok");
    }

    #[tokio::test]
    async fn openapi_lists_file_routes() {
        let app = TestApp::spawn().await;
        let res = app.get(routes::OPENAPI).await;

        assert_eq!(res.status, 200);
        let paths = &res.body["paths"];
        assert!(paths.get("/upload").is_some());
        assert!(paths.get("/download/{hash}").is_some());
        assert!(paths.get("/delete/{hash}").is_some());
    }
}
