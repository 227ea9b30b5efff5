use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use log::{o, Logger};
use once_cell::sync::OnceCell;
use serde::Deserialize;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use warp::http::{Response, StatusCode};

use voter_registry::config::Config;
use voter_registry::db::SqliteDb;
use voter_registry::environment::Environment;
use voter_registry::routes::{self, ErrorResponse, REGISTRATION_MESSAGE};
use voter_registry::store::FileStore;
use voter_registry::voter::VoterStatus;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Reply {
    message: String,
}

static SLOG_SCOPE_GUARD: OnceCell<slog_scope::GlobalLoggerGuard> = OnceCell::new();

const PHOTO: &str = "data:image/jpeg;base64,/9j/4AAQSkZJRgABAQAAAQABAAD/2wBDAP8=";
const ID_NUMBER: &str = "123456789012";

struct Fixture {
    directory: TempDir,
    db: Arc<SqliteDb>,
    environment: Environment,
}

impl Fixture {
    async fn new(test_name: &str) -> Self {
        Self::with_config(test_name, |_| {}).await
    }

    async fn with_config(test_name: &str, adjust: impl FnOnce(&mut Config)) -> Self {
        let directory = tempfile::tempdir().expect("create scratch directory");
        let connection_string = format!("sqlite://{}", directory.path().join("voters.db").display());

        let mut config = Config::for_paths(connection_string, directory.path().join("uploads"));
        adjust(&mut config);

        let db = SqliteDb::from_config(&config).expect("create database pool");
        db.initialize().await.expect("apply migrations");
        let db = Arc::new(db);

        let store = FileStore::new(config.upload_dir.clone());

        let environment = Environment::new(
            make_logger(test_name),
            db.clone(),
            Arc::new(store),
            Arc::new(config),
        );

        Self {
            directory,
            db,
            environment,
        }
    }

    async fn post(&self, body: &Value) -> Response<Bytes> {
        warp::test::request()
            .path("/register")
            .method("POST")
            .header("content-type", "application/json")
            .body(serde_json::to_vec(body).expect("serialize body"))
            .reply(&routes::make_api(self.environment.clone()))
            .await
    }

    fn photos(&self) -> Vec<String> {
        list_files(&self.directory.path().join("uploads"))
    }
}

#[tokio::test]
async fn registering_twice_conflicts() {
    let fixture = Fixture::new("registering_twice_conflicts").await;
    let body = submission(ID_NUMBER, "abc1234567");

    let response = fixture.post(&body).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert!(response.headers().contains_key("server-timing"));

    let reply: Reply = serde_json::from_slice(response.body()).expect("parse reply");
    assert_eq!(reply.message, REGISTRATION_MESSAGE);

    let record = fixture
        .db
        .retrieve("ABC1234567")
        .await
        .expect("query database")
        .expect("find registration");
    assert_eq!(record.status, VoterStatus::Pending);
    assert_eq!(record.name, "Asha");
    assert_eq!(record.date_of_birth, "1990-01-01");
    assert!(Path::new(&record.photo_reference).exists());

    let response = fixture.post(&body).await;
    assert_failed(
        &response,
        StatusCode::CONFLICT,
        "A user with this Aadhaar or Voter ID is already registered.",
    );
    assert_eq!(fixture.db.count_all().await.unwrap(), 1);
}

#[tokio::test]
async fn voter_ids_conflict_regardless_of_case() {
    let fixture = Fixture::new("voter_ids_conflict_regardless_of_case").await;

    let response = fixture.post(&submission("111111111111", "abc1")).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = fixture.post(&submission("222222222222", "ABC1")).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    assert_eq!(fixture.db.count_all().await.unwrap(), 1);
}

#[tokio::test]
async fn shared_id_numbers_conflict() {
    let fixture = Fixture::new("shared_id_numbers_conflict").await;

    let response = fixture.post(&submission(ID_NUMBER, "first")).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = fixture.post(&submission(ID_NUMBER, "second")).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    assert!(fixture.db.retrieve("SECOND").await.unwrap().is_none());
}

#[tokio::test]
async fn raw_id_number_is_never_stored() {
    let fixture = Fixture::new("raw_id_number_is_never_stored").await;

    let response = fixture.post(&submission(ID_NUMBER, "xyz9")).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let record = fixture.db.retrieve("XYZ9").await.unwrap().unwrap();
    assert_eq!(record.id_fingerprint.len(), 64);
    assert!(!record.id_fingerprint.contains(ID_NUMBER));
    assert!(!record.photo_reference.contains(ID_NUMBER));

    let photos = fixture.photos();
    assert_eq!(photos.len(), 1);
    assert!(photos[0].starts_with(&record.id_fingerprint));
    assert!(!photos[0].contains(ID_NUMBER));
}

#[tokio::test]
async fn empty_bodies_are_rejected() {
    let fixture = Fixture::new("empty_bodies_are_rejected").await;
    let filter = routes::make_api(fixture.environment.clone());

    let bodies: [&[u8]; 4] = [b"", b"{}", b"[1, 2]", b"not json"];

    for body in bodies.iter() {
        let response = warp::test::request()
            .path("/register")
            .method("POST")
            .body(*body)
            .reply(&filter)
            .await;

        assert_failed(
            &response,
            StatusCode::BAD_REQUEST,
            "Invalid request: Missing JSON body",
        );
    }

    // no content-length header at all
    let response = warp::test::request()
        .path("/register")
        .method("POST")
        .reply(&filter)
        .await;
    assert_failed(
        &response,
        StatusCode::BAD_REQUEST,
        "Invalid request: Missing JSON body",
    );

    assert_eq!(fixture.db.count_all().await.unwrap(), 0);
}

#[tokio::test]
async fn missing_fields_store_nothing() {
    let fixture = Fixture::new("missing_fields_store_nothing").await;

    for field in &["name", "dob", "aadhaar_number", "voter_id", "phone_number", "photo"] {
        let mut body = submission(ID_NUMBER, "abc1");
        body.as_object_mut().unwrap().remove(*field);

        let response = fixture.post(&body).await;
        assert_failed(&response, StatusCode::BAD_REQUEST, "Missing required fields");

        let mut body = submission(ID_NUMBER, "abc1");
        body[*field] = json!("");

        let response = fixture.post(&body).await;
        assert_failed(&response, StatusCode::BAD_REQUEST, "Missing required fields");
    }

    assert_eq!(fixture.db.count_all().await.unwrap(), 0);
    assert!(fixture.photos().is_empty());
}

#[tokio::test]
async fn malformed_photos_store_nothing() {
    let fixture = Fixture::new("malformed_photos_store_nothing").await;

    let mut body = submission(ID_NUMBER, "abc1");
    body["photo"] = json!("data:image/jpeg;base64,***not base64***");

    let response = fixture.post(&body).await;
    assert_failed(
        &response,
        StatusCode::INTERNAL_SERVER_ERROR,
        "Server failed to process and save the photo",
    );

    assert_eq!(fixture.db.count_all().await.unwrap(), 0);
    assert!(fixture.photos().is_empty());
}

#[tokio::test]
async fn unreachable_database_is_reported() {
    let directory = tempfile::tempdir().unwrap();
    let unreachable = format!(
        "sqlite://{}",
        directory.path().join("missing").join("voters.db").display()
    );

    let mut config = Config::for_paths(unreachable, directory.path().join("uploads"));
    config.acquire_timeout = Duration::from_secs(1);

    let db = SqliteDb::from_config(&config).unwrap();
    let environment = Environment::new(
        make_logger("unreachable_database_is_reported"),
        Arc::new(db),
        Arc::new(FileStore::new(config.upload_dir.clone())),
        Arc::new(config),
    );

    let response = warp::test::request()
        .path("/register")
        .method("POST")
        .body(serde_json::to_vec(&submission(ID_NUMBER, "abc1")).unwrap())
        .reply(&routes::make_api(environment))
        .await;

    assert_failed(
        &response,
        StatusCode::INTERNAL_SERVER_ERROR,
        "Failed to establish a database connection.",
    );
}

#[tokio::test]
async fn oversized_bodies_are_refused() {
    let fixture = Fixture::with_config("oversized_bodies_are_refused", |config| {
        config.max_content_length = 64;
    })
    .await;

    let response = fixture.post(&submission(ID_NUMBER, "abc1")).await;
    assert_failed(
        &response,
        StatusCode::PAYLOAD_TOO_LARGE,
        "Request body exceeds the maximum of 64 bytes",
    );

    let body = serde_json::to_vec(&submission(ID_NUMBER, "abc1")).unwrap();
    let response = send_chunked(&fixture, &body).await;
    assert!(
        response.starts_with("HTTP/1.1 413"),
        "chunked bodies are limited too: {}",
        response
    );

    assert_eq!(fixture.db.count_all().await.unwrap(), 0);
    assert!(fixture.photos().is_empty());
}

#[tokio::test]
async fn chunked_bodies_are_read() {
    let fixture = Fixture::new("chunked_bodies_are_read").await;
    let body = serde_json::to_vec(&submission(ID_NUMBER, "chunky1")).unwrap();

    let response = send_chunked(&fixture, &body).await;

    assert!(response.starts_with("HTTP/1.1 201"), "{}", response);
    assert!(response.contains(REGISTRATION_MESSAGE));
    assert!(fixture.db.retrieve("CHUNKY1").await.unwrap().is_some());
}

#[tokio::test]
async fn other_database_errors_include_details() {
    let directory = tempfile::tempdir().unwrap();
    let connection_string = format!("sqlite://{}", directory.path().join("voters.db").display());
    let config = Config::for_paths(connection_string, directory.path().join("uploads"));

    // no migrations, so there is no table to insert into
    let db = Arc::new(SqliteDb::from_config(&config).unwrap());
    let environment = Environment::new(
        make_logger("other_database_errors_include_details"),
        db.clone(),
        Arc::new(FileStore::new(config.upload_dir.clone())),
        Arc::new(config),
    );

    let response = warp::test::request()
        .path("/register")
        .method("POST")
        .body(serde_json::to_vec(&submission(ID_NUMBER, "abc1")).unwrap())
        .reply(&routes::make_api(environment))
        .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.headers().contains_key("server-timing"));

    let body: ErrorResponse = serde_json::from_slice(response.body()).unwrap();
    assert!(
        body.error.starts_with("A server-side database error occurred: "),
        "{}",
        body.error
    );
    assert!(body.error.contains("no such table"), "{}", body.error);

    db.initialize().await.unwrap();
    assert_eq!(db.count_all().await.unwrap(), 0);
}

#[tokio::test]
async fn cross_origin_preflight_is_allowed() {
    let fixture = Fixture::new("cross_origin_preflight_is_allowed").await;

    let response = warp::test::request()
        .path("/register")
        .method("OPTIONS")
        .header("origin", "https://forms.example.org")
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "content-type, x-requested-with")
        .reply(&routes::make_api(fixture.environment.clone()))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .contains_key("access-control-allow-origin"));
}

#[tokio::test]
async fn other_methods_and_paths_are_not_handled() {
    let fixture = Fixture::new("other_methods_and_paths_are_not_handled").await;
    let filter = routes::make_api(fixture.environment.clone());

    let response = warp::test::request()
        .path("/register")
        .method("GET")
        .reply(&filter)
        .await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

    let response = warp::test::request()
        .path("/register/extra")
        .method("POST")
        .body("{}")
        .reply(&filter)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn configured_path_is_served() {
    let fixture = Fixture::with_config("configured_path_is_served", |config| {
        config.registration_path = "voters".to_owned();
    })
    .await;

    let response = warp::test::request()
        .path("/voters")
        .method("POST")
        .body(serde_json::to_vec(&submission(ID_NUMBER, "abc1")).unwrap())
        .reply(&routes::make_api(fixture.environment.clone()))
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
}

/// Serves the API on an ephemeral port and sends `body` with
/// `transfer-encoding: chunked`, in two chunks. Returns the raw response.
async fn send_chunked(fixture: &Fixture, body: &[u8]) -> String {
    let (address, server) = warp::serve(routes::make_api(fixture.environment.clone()))
        .bind_ephemeral(([127, 0, 0, 1], 0));
    let server = tokio::spawn(server);

    let (first, second) = body.split_at(body.len() / 2);
    let mut request = b"POST /register HTTP/1.1\r\n\
        host: localhost\r\n\
        content-type: application/json\r\n\
        transfer-encoding: chunked\r\n\
        connection: close\r\n\r\n"
        .to_vec();

    for chunk in &[first, second] {
        request.extend_from_slice(format!("{:x}\r\n", chunk.len()).as_bytes());
        request.extend_from_slice(chunk);
        request.extend_from_slice(b"\r\n");
    }
    request.extend_from_slice(b"0\r\n\r\n");

    let mut stream = TcpStream::connect(address).await.expect("connect to server");
    stream.write_all(&request).await.expect("send request");

    // a refused body may be reset before it is fully read; whatever
    // arrived before that still holds the response
    let mut response = Vec::new();
    let _ = stream.read_to_end(&mut response).await;

    server.abort();

    String::from_utf8_lossy(&response).into_owned()
}

fn submission(id_number: &str, voter_id: &str) -> Value {
    json!({
        "name": "Asha",
        "dob": "1990-01-01",
        "aadhaar_number": id_number,
        "voter_id": voter_id,
        "phone_number": "9876543210",
        "photo": PHOTO,
    })
}

fn assert_failed(response: &Response<Bytes>, expected_status: StatusCode, expected_error: &str) {
    assert_eq!(response.status(), expected_status);
    assert!(
        response.headers().contains_key("server-timing"),
        "error responses carry timing"
    );

    let body: ErrorResponse = serde_json::from_slice(response.body()).expect("parse error body");
    assert_eq!(body.error, expected_error);
}

fn list_files(directory: &Path) -> Vec<String> {
    match fs::read_dir(directory) {
        Ok(entries) => entries
            .map(|entry| {
                entry
                    .expect("read directory entry")
                    .file_name()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect(),
        Err(_) => vec![],
    }
}

fn make_logger(test_name: &str) -> Arc<Logger> {
    SLOG_SCOPE_GUARD.get_or_init(|| slog_envlogger::init().expect("initialize slog-envlogger"));

    Arc::new(slog_scope::logger().new(o!("test" => test_name.to_owned())))
}
