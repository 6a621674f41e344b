//! Mock of the WordPress version-check API and archive host

use serde_json::json;
use wiremock::{
    matchers::{method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

pub struct MockVersionApi {
    pub server: MockServer,
    pub base_url: String,
}

impl MockVersionApi {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let base_url = server.uri();
        Self { server, base_url }
    }

    /// URL to hand to `DownloadUrlResolver::new`
    pub fn version_check_url(&self) -> String {
        format!("{}/core/version-check/1.7/", self.base_url)
    }

    /// Version check answering with a single offer for `locale`
    pub async fn mock_offer(&self, locale: &str, download: &str) {
        Mock::given(method("GET"))
            .and(path("/core/version-check/1.7/"))
            .and(query_param("locale", locale))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "offers": [
                    {
                        "response": "upgrade",
                        "download": download,
                        "locale": locale,
                        "current": "6.4.2"
                    }
                ],
                "translations": []
            })))
            .mount(&self.server)
            .await;
    }

    /// Version check succeeding with no offers at all
    pub async fn mock_no_offers(&self) {
        Mock::given(method("GET"))
            .and(path("/core/version-check/1.7/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&self.server)
            .await;
    }

    /// Version check failing with `status`, optionally only `times` times
    pub async fn mock_status(&self, status: u16, times: Option<u64>) {
        let mock = Mock::given(method("GET"))
            .and(path("/core/version-check/1.7/"))
            .respond_with(ResponseTemplate::new(status));
        let mock = match times {
            Some(n) => mock.up_to_n_times(n),
            None => mock,
        };
        mock.mount(&self.server).await;
    }

    /// Serve `body` as an archive at `archive_path`; returns its URL
    pub async fn mock_archive(&self, archive_path: &str, body: &[u8]) -> String {
        Mock::given(method("GET"))
            .and(path(archive_path))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
            .mount(&self.server)
            .await;
        format!("{}{}", self.base_url, archive_path)
    }

    pub async fn mock_missing_archive(&self, archive_path: &str) -> String {
        Mock::given(method("GET"))
            .and(path(archive_path))
            .respond_with(ResponseTemplate::new(404))
            .mount(&self.server)
            .await;
        format!("{}{}", self.base_url, archive_path)
    }

    pub async fn request_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|requests| requests.len())
            .unwrap_or(0)
    }
}
