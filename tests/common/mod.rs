//! Common test utilities for landscape-dl integration tests
//!
//! [`MockLandfire`] stands up a wiremock server speaking the validation,
//! submission and download service endpoints, with a scripted status sequence.

#![allow(dead_code)]

use landscape_dl::{Config, LandscapeClient};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const VALIDATION_PATH: &str =
    "/requestValidationServiceClient/sampleRequestValidationServiceProxy/processAOI.jsp";
pub const INITIATE_PATH: &str = "/axis2/services/DownloadService/initiateDownload";
pub const STATUS_PATH: &str = "/axis2/services/DownloadService/getDownloadStatus";
pub const DATA_PATH: &str = "/axis2/services/DownloadService/getData";
pub const SUBMIT_PATH: &str = "/extract/submit";
pub const ARTIFACT_PATH: &str = "/artifacts/LF_42.zip";
pub const JOB_ID: &str = "LF_42";

/// Wrap a value the way the download service does
pub fn xml_return(value: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <ns:getDownloadStatusResponse xmlns:ns=\"http://service.landfire\">\
         <ns:return>{value}</ns:return>\
         </ns:getDownloadStatusResponse>"
    )
}

/// Build a ZIP archive in memory
pub fn zip_bytes(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options =
        zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Stored);
    for (name, content) in files {
        writer.start_file(*name, options).unwrap();
        std::io::Write::write_all(&mut writer, content).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Default artifact: a projection file and a grid
pub fn landscape_zip() -> Vec<u8> {
    zip_bytes(&[
        ("Landscape_1.prj", b"PROJCS[\"WGS 84 / UTM zone 12N\"]"),
        ("Landscape_1.asc", b"ncols 2\nnrows 2\n1 2\n3 4\n"),
    ])
}

/// Replays a status sequence, repeating the last entry once exhausted
pub struct StatusSequence {
    codes: Vec<i32>,
    next: AtomicUsize,
}

impl StatusSequence {
    pub fn new(codes: &[i32]) -> Self {
        Self {
            codes: codes.to_vec(),
            next: AtomicUsize::new(0),
        }
    }
}

impl Respond for StatusSequence {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let i = self.next.fetch_add(1, Ordering::SeqCst);
        let code = self.codes[i.min(self.codes.len() - 1)];
        ResponseTemplate::new(200).set_body_string(xml_return(&format!("{code},Status text")))
    }
}

/// Status responder that fails at the transport level on one attempt
pub struct FailingStatus {
    fail_at: usize,
    next: AtomicUsize,
}

impl FailingStatus {
    /// Fail the `fail_at`-th query (1-based) with HTTP 500
    pub fn new(fail_at: usize) -> Self {
        Self {
            fail_at,
            next: AtomicUsize::new(0),
        }
    }
}

impl Respond for FailingStatus {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let attempt = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt == self.fail_at {
            ResponseTemplate::new(500)
        } else {
            ResponseTemplate::new(200).set_body_string(xml_return("100,Received"))
        }
    }
}

/// A mock extraction service
pub struct MockLandfire {
    pub server: MockServer,
}

impl MockLandfire {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// Config pointing at the mock with millisecond poll waits
    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.service.base_url = self.uri();
        config.poll.interval = Duration::from_millis(5);
        config
    }

    pub fn client(&self) -> LandscapeClient {
        LandscapeClient::new(self.config()).unwrap()
    }

    /// Validation returning one piece that points at the submission endpoint
    pub async fn mount_validation(&self) {
        let body = serde_json::json!({
            "REQUEST_SERVICE_RESPONSE": {
                "PIECE": [{
                    "DOWNLOAD_URL": format!("{}{}?id=7&prj=102039&fmt=zip", self.uri(), SUBMIT_PATH),
                    "THUMBNAIL_URL": "none"
                }],
                "STATUS": true
            }
        });
        Mock::given(method("GET"))
            .and(path(VALIDATION_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Validation reporting no data for the area
    pub async fn mount_empty_validation(&self) {
        let body = serde_json::json!({
            "REQUEST_SERVICE_RESPONSE": { "PIECE": [], "STATUS": false }
        });
        Mock::given(method("GET"))
            .and(path(VALIDATION_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Submission that only answers when the projection was pinned to `epsg`
    pub async fn mount_submit(&self, epsg: u32) {
        Mock::given(method("GET"))
            .and(path(SUBMIT_PATH))
            .and(query_param("prj", epsg.to_string()))
            .and(query_param("id", "7"))
            .respond_with(ResponseTemplate::new(200).set_body_string(xml_return(JOB_ID)))
            .expect(1)
            .mount(&self.server)
            .await;
    }

    pub async fn mount_initiate(&self) {
        Mock::given(method("GET"))
            .and(path(INITIATE_PATH))
            .and(query_param("downloadID", JOB_ID))
            .respond_with(ResponseTemplate::new(200).set_body_string(xml_return("")))
            .expect(1)
            .mount(&self.server)
            .await;
    }

    /// Status endpoint driven by `responder`, expecting exactly `calls` queries
    pub async fn mount_status<R: Respond + 'static>(&self, responder: R, calls: u64) {
        Mock::given(method("GET"))
            .and(path(STATUS_PATH))
            .and(query_param("downloadID", JOB_ID))
            .respond_with(responder)
            .expect(calls)
            .mount(&self.server)
            .await;
    }

    /// Final data URL, expected `calls` times
    pub async fn mount_data(&self, calls: u64) {
        let artifact = format!("{}{}", self.uri(), ARTIFACT_PATH);
        Mock::given(method("GET"))
            .and(path(DATA_PATH))
            .and(query_param("downloadID", JOB_ID))
            .respond_with(ResponseTemplate::new(200).set_body_string(xml_return(&artifact)))
            .expect(calls)
            .mount(&self.server)
            .await;
    }

    pub async fn mount_artifact(&self, body: Vec<u8>, calls: u64) {
        Mock::given(method("GET"))
            .and(path(ARTIFACT_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
            .expect(calls)
            .mount(&self.server)
            .await;
    }

    /// Everything up to and including initiation
    pub async fn mount_job(&self, epsg: u32) {
        self.mount_validation().await;
        self.mount_submit(epsg).await;
        self.mount_initiate().await;
    }

    /// Number of requests the server saw on `endpoint`
    pub async fn hits(&self, endpoint: &str) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path() == endpoint)
            .count()
    }
}
