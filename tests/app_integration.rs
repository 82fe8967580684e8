use std::fs;
use tracing::info;

use mufx::cli::prices::OutputFormat;
use mufx::cli::verify::VerifyTarget;
use mufx::core::config::YahooProviderConfig;
use mufx::core::{INSTRUMENTS, Outcome, fetch_all};
use mufx::providers::YahooFinanceProvider;

mod test_utils {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // 2026-03-05 and 2026-03-06 14:30 UTC
    pub const TIMESTAMPS: [i64; 2] = [1772721000, 1772807400];

    pub fn chart_item(previous: f64, current: f64) -> String {
        format!(
            r#"{{
                "meta": {{"currency": "USD", "gmtoffset": 0}},
                "timestamp": [{}, {}],
                "indicators": {{"quote": [{{"close": [{previous}, {current}]}}]}}
            }}"#,
            TIMESTAMPS[0], TIMESTAMPS[1]
        )
    }

    /// Spark response carrying a 1% rise for every key except `skip`.
    pub fn spark_body(keys: &[&str], skip: &[&str]) -> String {
        let items: Vec<String> = keys
            .iter()
            .filter(|k| !skip.contains(*k))
            .map(|k| {
                format!(
                    r#"{{"symbol": "{k}", "response": [{}]}}"#,
                    chart_item(100.0, 101.0)
                )
            })
            .collect();
        format!(
            r#"{{"spark": {{"result": [{}], "error": null}}}}"#,
            items.join(",")
        )
    }

    pub async fn create_mock_server(spark_response: &str) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v7/finance/spark"))
            .respond_with(ResponseTemplate::new(200).set_body_string(spark_response))
            .expect(1)
            .mount(&mock_server)
            .await;

        mock_server
    }

    pub async fn mount_chart(mock_server: &MockServer, symbol: &str, response: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path(format!("/v8/finance/chart/{symbol}")))
            .respond_with(response)
            .expect(1)
            .mount(mock_server)
            .await;
    }

    pub fn write_config(base_url: &str) -> tempfile::NamedTempFile {
        let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
        let config_content = format!(
            r#"
            providers:
              yahoo:
                base_url: {base_url}
                timeout_secs: 5
            "#
        );
        std::fs::write(config_file.path(), config_content).expect("Failed to write config file");
        config_file
    }
}

fn catalog_keys() -> Vec<&'static str> {
    INSTRUMENTS.iter().map(|i| i.lookup_key).collect()
}

#[test_log::test(tokio::test)]
async fn test_fetch_all_with_partial_batch() {
    let keys = catalog_keys();
    let mock_server =
        test_utils::create_mock_server(&test_utils::spark_body(&keys, &["GBPUSD=X", "BTC-USD"]))
            .await;
    test_utils::mount_chart(
        &mock_server,
        "GBPUSD=X",
        wiremock::ResponseTemplate::new(200).set_body_string(format!(
            r#"{{"chart": {{"result": [{}]}}}}"#,
            test_utils::chart_item(1.25, 1.2)
        )),
    )
    .await;
    test_utils::mount_chart(&mock_server, "BTC-USD", wiremock::ResponseTemplate::new(404))
        .await;

    let provider = YahooFinanceProvider::new(&YahooProviderConfig {
        base_url: mock_server.uri(),
        timeout_secs: 5,
    })
    .unwrap();
    let report = fetch_all(INSTRUMENTS, &provider).await.unwrap();
    info!(?report, "Fetched report");

    let names: Vec<_> = report.entries().iter().map(|(n, _)| n.as_str()).collect();
    let expected: Vec<_> = INSTRUMENTS.iter().map(|i| i.name).collect();
    assert_eq!(names, expected);
    assert_eq!(report.failure_count(), 1);

    let Some(Outcome::Observed(dxy)) = report.get("DXY") else {
        panic!("expected DXY observation");
    };
    assert_eq!(dxy.change_str, "+1.00%");
    assert_eq!(dxy.as_of_date.to_string(), "2026-03-06");

    let Some(Outcome::Observed(gbp)) = report.get("GBP/USD") else {
        panic!("expected GBP/USD observation");
    };
    assert_eq!(gbp.price, 1.2);
    assert_eq!(gbp.change_pct, -4.0);

    let Some(Outcome::Failed(btc)) = report.get("BTC/USD") else {
        panic!("expected BTC/USD failure");
    };
    assert!(btc.message.contains("HTTP error: 404"));
}

#[test_log::test(tokio::test)]
async fn test_full_app_flow_with_mock() {
    let keys = catalog_keys();

    for format in [OutputFormat::Json, OutputFormat::Csv, OutputFormat::Table] {
        let mock_server =
            test_utils::create_mock_server(&test_utils::spark_body(&keys, &["BZ=F"])).await;
        // Unusable fallback data is still a successful run
        test_utils::mount_chart(
            &mock_server,
            "BZ=F",
            wiremock::ResponseTemplate::new(200).set_body_string(r#"{"chart": {"result": []}}"#),
        )
        .await;
        let config_file = test_utils::write_config(&mock_server.uri());

        let result = mufx::run_command(
            mufx::AppCommand::Prices(format),
            Some(config_file.path().to_str().unwrap()),
        )
        .await;
        assert!(
            result.is_ok(),
            "Main function failed with: {:?}",
            result.err()
        );
    }
}

#[test_log::test(tokio::test)]
async fn test_unusable_fallback_renders_error_rows() {
    use mufx::cli::prices::{render_csv, render_json, render_table};

    let keys = catalog_keys();
    let mock_server =
        test_utils::create_mock_server(&test_utils::spark_body(&keys, &["BZ=F"])).await;
    test_utils::mount_chart(
        &mock_server,
        "BZ=F",
        wiremock::ResponseTemplate::new(200).set_body_string(r#"{"chart": {"result": []}}"#),
    )
    .await;
    let provider = YahooFinanceProvider::new(&YahooProviderConfig {
        base_url: mock_server.uri(),
        timeout_secs: 5,
    })
    .unwrap();

    let report = fetch_all(INSTRUMENTS, &provider).await.unwrap();
    assert_eq!(report.failure_count(), 1);

    let csv = render_csv(&report).unwrap();
    let lines: Vec<_> = csv.lines().collect();
    assert_eq!(lines.len(), INSTRUMENTS.len() + 1);
    assert!(lines.contains(&"Brent,ERROR,,,,,"));
    assert!(lines.contains(&"DXY,101.00,100.00,1.00,up,primary,2026-03-06"));

    let json: serde_json::Value = serde_json::from_str(&render_json(&report).unwrap()).unwrap();
    assert_eq!(
        json["instruments"]["Brent"]["error"],
        "No price data found for symbol: BZ=F"
    );
    assert_eq!(json["instruments"]["Brent"]["category"], "secondary");
    assert_eq!(json["instruments"]["DXY"]["change_str"], "+1.00%");

    let table = render_table(&report, INSTRUMENTS);
    assert!(table.contains("ERROR: No price data found for symbol: BZ=F"));
    assert!(table.contains("Brent: Brent front month"));
}

#[test_log::test(tokio::test)]
async fn test_batch_failure_is_fatal() {
    let mock_server = wiremock::MockServer::start().await;
    wiremock::Mock::given(wiremock::matchers::method("GET"))
        .respond_with(wiremock::ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;
    let config_file = test_utils::write_config(&mock_server.uri());

    let result = mufx::run_command(
        mufx::AppCommand::Prices(OutputFormat::Table),
        Some(config_file.path().to_str().unwrap()),
    )
    .await;

    let err = result.expect_err("batch failure should abort the run");
    assert!(err.to_string().contains("Batch price query failed"));
    let requests = mock_server.received_requests().await.unwrap_or_default();
    assert_eq!(requests.len(), 1);
}

#[test_log::test(tokio::test)]
async fn test_missing_config_path_is_fatal() {
    let result = mufx::run_command(
        mufx::AppCommand::Prices(OutputFormat::Json),
        Some("/nonexistent/mufx/config.yaml"),
    )
    .await;
    assert!(result.is_err());
}

#[test_log::test(tokio::test)]
async fn test_verify_all_articles() {
    use mufx::core::integrity::sha256_hex;

    let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let good = format!(
        r#"<html><body data-hash="{}"><article><p>DXY long</p></article></body></html>"#,
        sha256_hex("DXY long")
    );
    let tampered = format!(
        r#"<html><body data-hash="{}"><article><p>DXY short</p></article></body></html>"#,
        sha256_hex("DXY long")
    );
    fs::write(dir.path().join("signal-20260227.html"), good).unwrap();
    fs::write(dir.path().join("weekly-20260301.html"), tampered).unwrap();
    fs::write(dir.path().join("index.html"), "<html></html>").unwrap();

    let result = mufx::run_command(
        mufx::AppCommand::Verify(VerifyTarget::All {
            dir: dir.path().to_path_buf(),
        }),
        None,
    )
    .await;
    assert!(result.is_ok(), "Verify failed with: {:?}", result.err());
}
