use crate::error::Error;
use crate::extraction::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build a ZIP archive in memory from `(name, content)` pairs
///
/// Names ending in `/` become directory entries.
fn zip_bytes(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ::zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options =
        ::zip::write::FileOptions::default().compression_method(::zip::CompressionMethod::Stored);
    for (name, content) in files {
        if let Some(dir) = name.strip_suffix('/') {
            writer.add_directory(dir, options).unwrap();
        } else {
            writer.start_file(*name, options).unwrap();
            std::io::Write::write_all(&mut writer, content).unwrap();
        }
    }
    writer.finish().unwrap().into_inner()
}

fn create_zip_archive(archive_path: &Path, files: &[(&str, &[u8])]) {
    std::fs::write(archive_path, zip_bytes(files)).unwrap();
}

/// Scratch files left behind in `dir`
fn scratch_files(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(SCRATCH_PREFIX))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// ZipExtractor
// ---------------------------------------------------------------------------

#[test]
fn test_fan_out_uses_destination_stem() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("job.zip");
    create_zip_archive(
        &archive,
        &[("a.prj", b"PROJCS[\"UTM 12N\"]"), ("a.asc", b"ncols 4\nnrows 4\n")],
    );
    let dest = temp.path().join("out.lcp");

    let files = ZipExtractor::extract(&archive, &dest).unwrap();

    assert_eq!(
        files,
        vec![temp.path().join("out.prj"), temp.path().join("out.asc")]
    );
    assert_eq!(
        std::fs::read(temp.path().join("out.prj")).unwrap(),
        b"PROJCS[\"UTM 12N\"]"
    );
    assert_eq!(
        std::fs::read(temp.path().join("out.asc")).unwrap(),
        b"ncols 4\nnrows 4\n"
    );
    assert!(!dest.exists(), "no entry carries the .lcp extension");
}

#[test]
fn test_empty_archive_yields_no_files() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("empty.zip");
    create_zip_archive(&archive, &[]);

    let files = ZipExtractor::extract(&archive, &temp.path().join("out.lcp")).unwrap();
    assert!(files.is_empty());
}

#[test]
fn test_nested_entries_flatten_and_directories_are_skipped() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("nested.zip");
    create_zip_archive(
        &archive,
        &[
            ("Landscape_1/", b""),
            ("Landscape_1/Landscape_1.lcp", b"binary landscape"),
            ("Landscape_1/metadata.xml", b"<meta/>"),
        ],
    );

    let files = ZipExtractor::extract(&archive, &temp.path().join("site.lcp")).unwrap();

    assert_eq!(
        files,
        vec![temp.path().join("site.lcp"), temp.path().join("site.xml")]
    );
    assert!(!temp.path().join("site").exists());
    assert_eq!(
        std::fs::read(temp.path().join("site.lcp")).unwrap(),
        b"binary landscape"
    );
}

#[test]
fn test_later_entry_with_same_extension_wins() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("dup.zip");
    create_zip_archive(&archive, &[("one.txt", b"first"), ("two.txt", b"second")]);

    let files = ZipExtractor::extract(&archive, &temp.path().join("out.lcp")).unwrap();

    assert_eq!(files.len(), 2);
    assert_eq!(
        std::fs::read_to_string(temp.path().join("out.txt")).unwrap(),
        "second"
    );
}

#[test]
fn test_extraction_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("job.zip");
    create_zip_archive(&archive, &[("a.prj", b"projection"), ("a.asc", b"grid")]);
    let dest = temp.path().join("out.lcp");

    let first = ZipExtractor::extract(&archive, &dest).unwrap();
    let second = ZipExtractor::extract(&archive, &dest).unwrap();

    assert_eq!(first, second);
    assert_eq!(std::fs::read(temp.path().join("out.asc")).unwrap(), b"grid");
}

#[test]
fn test_corrupt_archive_is_io_error() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("bad.zip");
    std::fs::write(&archive, b"this is not a zip archive").unwrap();

    let result = ZipExtractor::extract(&archive, &temp.path().join("out.lcp"));
    assert!(matches!(result, Err(Error::Io(_))));
}

#[test]
fn test_missing_archive_is_io_error() {
    let temp = TempDir::new().unwrap();
    let result = ZipExtractor::extract(
        &temp.path().join("nowhere.zip"),
        &temp.path().join("out.lcp"),
    );
    assert!(matches!(result, Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound));
}

#[test]
fn test_unwritable_destination_is_io_error() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("job.zip");
    create_zip_archive(&archive, &[("a.prj", b"x")]);

    let result = ZipExtractor::extract(&archive, &temp.path().join("missing/dir/out.lcp"));
    assert!(matches!(result, Err(Error::Io(_))));
}

// ---------------------------------------------------------------------------
// Download and fan-out
// ---------------------------------------------------------------------------

async fn serve_archive(server: &MockServer, body: Vec<u8>) -> url::Url {
    Mock::given(method("GET"))
        .and(path("/artifacts/job.zip"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(server)
        .await;
    url::Url::parse(&format!("{}/artifacts/job.zip", server.uri())).unwrap()
}

#[tokio::test]
async fn test_download_to_scratch_writes_body_and_reports_progress() {
    let server = MockServer::start().await;
    let body = zip_bytes(&[("a.prj", b"projection")]);
    let url = serve_archive(&server, body.clone()).await;
    let scratch_dir = TempDir::new().unwrap();

    let mut last = (0, None);
    let scratch = download_to_scratch(
        &reqwest::Client::new(),
        &url,
        scratch_dir.path(),
        &CancellationToken::new(),
        |bytes, total| last = (bytes, total),
    )
    .await
    .unwrap();

    assert_eq!(scratch.len(), body.len() as u64);
    assert_eq!(last, (body.len() as u64, Some(body.len() as u64)));
    assert_eq!(std::fs::read(scratch.path()).unwrap(), body);
    assert!(scratch.path().starts_with(scratch_dir.path()));

    let path = scratch.path().to_path_buf();
    scratch.remove().unwrap();
    assert!(!path.exists());
}

#[tokio::test]
async fn test_scratch_names_are_unique() {
    let server = MockServer::start().await;
    let url = serve_archive(&server, zip_bytes(&[])).await;
    let scratch_dir = TempDir::new().unwrap();
    let http = reqwest::Client::new();
    let cancel = CancellationToken::new();

    let a = download_to_scratch(&http, &url, scratch_dir.path(), &cancel, |_, _| {})
        .await
        .unwrap();
    let b = download_to_scratch(&http, &url, scratch_dir.path(), &cancel, |_, _| {})
        .await
        .unwrap();

    assert_ne!(a.path(), b.path());
    assert_eq!(scratch_files(scratch_dir.path()).len(), 2);
}

#[tokio::test]
async fn test_fetch_and_extract_removes_scratch() {
    let server = MockServer::start().await;
    let url = serve_archive(
        &server,
        zip_bytes(&[("a.prj", b"projection"), ("a.asc", b"grid")]),
    )
    .await;
    let out = TempDir::new().unwrap();
    let scratch_dir = TempDir::new().unwrap();
    let dest = out.path().join("out.lcp");

    let (files, archive) = fetch_and_extract(
        &reqwest::Client::new(),
        &url,
        &dest,
        scratch_dir.path(),
        false,
        &CancellationToken::new(),
        |_, _| {},
    )
    .await
    .unwrap();

    assert_eq!(files, vec![out.path().join("out.prj"), out.path().join("out.asc")]);
    assert!(archive.is_none());
    assert!(scratch_files(scratch_dir.path()).is_empty());
}

#[tokio::test]
async fn test_fetch_and_extract_keeps_archive_on_request() {
    let server = MockServer::start().await;
    let body = zip_bytes(&[("a.asc", b"grid")]);
    let url = serve_archive(&server, body.clone()).await;
    let out = TempDir::new().unwrap();
    let scratch_dir = TempDir::new().unwrap();

    let (files, archive) = fetch_and_extract(
        &reqwest::Client::new(),
        &url,
        &out.path().join("out.lcp"),
        scratch_dir.path(),
        true,
        &CancellationToken::new(),
        |_, _| {},
    )
    .await
    .unwrap();

    assert_eq!(files, vec![out.path().join("out.asc")]);
    let archive = archive.expect("archive should be kept");
    assert_eq!(std::fs::read(&archive).unwrap(), body);
    assert_eq!(scratch_files(scratch_dir.path()), vec![archive]);
}

#[tokio::test]
async fn test_corrupt_download_still_removes_scratch() {
    let server = MockServer::start().await;
    let url = serve_archive(&server, b"<html>maintenance</html>".to_vec()).await;
    let out = TempDir::new().unwrap();
    let scratch_dir = TempDir::new().unwrap();

    let result = fetch_and_extract(
        &reqwest::Client::new(),
        &url,
        &out.path().join("out.lcp"),
        scratch_dir.path(),
        false,
        &CancellationToken::new(),
        |_, _| {},
    )
    .await;

    assert!(matches!(result, Err(Error::Io(_))));
    assert!(scratch_files(scratch_dir.path()).is_empty());
}

#[tokio::test]
async fn test_missing_artifact_is_network_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let url = url::Url::parse(&format!("{}/artifacts/gone.zip", server.uri())).unwrap();
    let out = TempDir::new().unwrap();
    let scratch_dir = TempDir::new().unwrap();

    let result = fetch_and_extract(
        &reqwest::Client::new(),
        &url,
        &out.path().join("out.lcp"),
        scratch_dir.path(),
        false,
        &CancellationToken::new(),
        |_, _| {},
    )
    .await;

    assert!(matches!(result, Err(Error::Network(_))));
    assert!(scratch_files(scratch_dir.path()).is_empty());
}

#[tokio::test]
async fn test_cancelled_download_leaves_nothing_behind() {
    let server = MockServer::start().await;
    let url = serve_archive(&server, zip_bytes(&[("a.asc", b"grid")])).await;
    let scratch_dir = TempDir::new().unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = download_to_scratch(
        &reqwest::Client::new(),
        &url,
        scratch_dir.path(),
        &cancel,
        |_, _| {},
    )
    .await;

    assert!(matches!(result, Err(Error::Cancelled)));
    assert!(scratch_files(scratch_dir.path()).is_empty());
}

#[tokio::test]
async fn test_extract_archive_runs_off_the_runtime() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("job.zip");
    create_zip_archive(&archive, &[("a.prj", b"projection")]);

    let files = extract_archive(&archive, &temp.path().join("out.lcp"))
        .await
        .unwrap();
    assert_eq!(files, vec![temp.path().join("out.prj")]);
}

#[tokio::test]
async fn test_slow_artifact_outlasts_service_request_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/artifacts/slow.zip"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(zip_bytes(&[("a.asc", b"grid")]))
                .set_delay(std::time::Duration::from_millis(1500)),
        )
        .mount(&server)
        .await;
    let url = url::Url::parse(&format!("{}/artifacts/slow.zip", server.uri())).unwrap();

    let mut config = crate::config::Config::default();
    config.service.base_url = server.uri();
    config.service.request_timeout = std::time::Duration::from_secs(1);
    let service = crate::service::ServiceClient::new(&config).unwrap();

    let out = TempDir::new().unwrap();
    let scratch_dir = TempDir::new().unwrap();
    let (files, _) = fetch_and_extract(
        service.http(),
        &url,
        &out.path().join("out.lcp"),
        scratch_dir.path(),
        false,
        &CancellationToken::new(),
        |_, _| {},
    )
    .await
    .unwrap();

    assert_eq!(files, vec![out.path().join("out.asc")]);
}

#[tokio::test]
async fn test_progress_is_reported_per_step_and_at_the_end() {
    let server = MockServer::start().await;
    let body = vec![7u8; (PROGRESS_STEP_BYTES * 3 + 1234) as usize];
    let url = serve_archive(&server, body.clone()).await;
    let scratch_dir = TempDir::new().unwrap();

    let mut reports = Vec::new();
    let scratch = download_to_scratch(
        &reqwest::Client::new(),
        &url,
        scratch_dir.path(),
        &CancellationToken::new(),
        |bytes, _| reports.push(bytes),
    )
    .await
    .unwrap();

    assert_eq!(scratch.len(), body.len() as u64);
    assert!(!reports.is_empty() && reports.len() <= 4, "{reports:?}");
    assert_eq!(*reports.last().unwrap(), body.len() as u64);
    assert!(
        reports
            .windows(2)
            .all(|w| w[1] >= w[0] + PROGRESS_STEP_BYTES || w[1] == body.len() as u64)
    );
}

#[tokio::test]
async fn test_empty_body_reports_progress_once() {
    let server = MockServer::start().await;
    let url = serve_archive(&server, Vec::new()).await;
    let scratch_dir = TempDir::new().unwrap();

    let mut reports = Vec::new();
    let scratch = download_to_scratch(
        &reqwest::Client::new(),
        &url,
        scratch_dir.path(),
        &CancellationToken::new(),
        |bytes, _| reports.push(bytes),
    )
    .await
    .unwrap();

    assert!(scratch.is_empty());
    assert_eq!(reports, vec![0]);
}
