//! Integration tests for the stress agent HTTP server

#[cfg(feature = "server")]
mod server_tests {
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;
    use stress_agent::server::{run, ServerConfig, ServerHandle};
    use stress_agent::{Config, ServiceStats, StressService};

    fn test_config() -> Config {
        let dir: PathBuf = std::env::temp_dir().join(format!(
            "stress-agent-server-test-{}",
            uuid::Uuid::new_v4()
        ));
        Config {
            source_path: dir.join("emotibit_live.csv"),
            model_path: dir.join("stress_model.json"),
            scaler_path: dir.join("scaler.json"),
            poll_interval: Duration::from_millis(20),
            data_path: dir,
            ..Config::default()
        }
    }

    async fn start(config: &Config) -> ServerHandle {
        let service = Arc::new(StressService::new(config, Arc::new(ServiceStats::new())));
        let handle = run(ServerConfig::local(0), service)
            .await
            .expect("Failed to start server");

        // Give server time to start
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle
    }

    async fn wait_for_source(
        client: &reqwest::Client,
        base: &str,
        expected: &str,
    ) -> serde_json::Value {
        wait_for(client, base, |body| body["source"] == expected).await
    }

    async fn wait_for(
        client: &reqwest::Client,
        base: &str,
        done: impl Fn(&serde_json::Value) -> bool,
    ) -> serde_json::Value {
        for _ in 0..100 {
            let body: serde_json::Value = client
                .get(format!("{base}/reading"))
                .send()
                .await
                .expect("Failed to send request")
                .json()
                .await
                .expect("Failed to parse JSON");
            if done(&body) {
                return body;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("reading never reached the expected state");
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let config = test_config();
        let handle = start(&config).await;

        let client = reqwest::Client::new();
        let response = client
            .get(format!("http://{}/health", handle.addr))
            .send()
            .await
            .expect("Failed to send request");

        assert!(response.status().is_success());

        let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
        assert_eq!(body["status"], "ok");
        assert!(body["version"].as_str().is_some());

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_reading_endpoint_shape() {
        let config = test_config();
        let handle = start(&config).await;
        let base = format!("http://{}", handle.addr);
        let client = reqwest::Client::new();

        // The poller seeds the missing source, then scores its last row
        let body = wait_for_source(&client, &base, "heuristic").await;
        assert_eq!(body["hr"], 76);
        assert_eq!(body["hrv"], 44);
        assert_eq!(body["eda"], 0.32);
        assert_eq!(body["temp"], 34.6);
        assert!(body["timestamp"].as_i64().is_some());
        let score = body["score"].as_f64().unwrap();
        assert!((0.0..=10.0).contains(&score));

        // POST is accepted too, and so is the legacy path
        let response = client
            .post(format!("{base}/reading"))
            .send()
            .await
            .expect("Failed to send request");
        assert!(response.status().is_success());

        let response = client
            .get(format!("{base}/api/emotibit"))
            .send()
            .await
            .expect("Failed to send request");
        assert!(response.status().is_success());

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_status_endpoint() {
        let config = test_config();
        let handle = start(&config).await;
        let base = format!("http://{}", handle.addr);
        let client = reqwest::Client::new();

        wait_for_source(&client, &base, "heuristic").await;

        let body: serde_json::Value = client
            .get(format!("{base}/status"))
            .send()
            .await
            .expect("Failed to send request")
            .json()
            .await
            .expect("Failed to parse JSON");

        assert_eq!(body["model_available"], false);
        assert_eq!(body["model_loaded"], false);
        assert_eq!(body["source_exists"], true);
        assert!(body["last_update"].as_i64().is_some());

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_simulate_appends_record() {
        let config = test_config();
        let handle = start(&config).await;
        let base = format!("http://{}", handle.addr);
        let client = reqwest::Client::new();

        let response = client
            .post(format!("{base}/simulate"))
            .send()
            .await
            .expect("Failed to send request");
        assert!(response.status().is_success());

        let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["source"], "simulated");
        let hr = body["data"]["hr"].as_i64().unwrap();

        let content = std::fs::read_to_string(&config.source_path).unwrap();
        let last = content.lines().last().unwrap();
        assert_eq!(last.split(',').nth(1).unwrap(), hr.to_string());

        // The poller scores the injected row like any real record
        let hrv = body["data"]["hrv"].as_i64().unwrap();
        let eda = body["data"]["eda"].clone();
        let reading = wait_for(&client, &base, |r| {
            r["source"] == "heuristic"
                && r["hr"].as_i64() == Some(hr)
                && r["hrv"].as_i64() == Some(hrv)
                && r["eda"] == eda
        })
        .await;
        assert_eq!(reading["temp"], body["data"]["temp"]);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_simulate_failure_is_an_error_response() {
        let mut config = test_config();
        // Put the source under a regular file so appends cannot succeed
        std::fs::create_dir_all(&config.data_path).unwrap();
        let blocker = config.data_path.join("blocker");
        std::fs::write(&blocker, "").unwrap();
        config.source_path = blocker.join("live.csv");

        let handle = start(&config).await;
        let client = reqwest::Client::new();

        let response = client
            .post(format!("http://{}/simulate", handle.addr))
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);

        let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
        assert!(body["error"].as_str().unwrap().contains("append"));

        // Readings are still served (synthetic while the source is unusable)
        let response = client
            .get(format!("http://{}/reading", handle.addr))
            .send()
            .await
            .expect("Failed to send request");
        assert!(response.status().is_success());

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_model_scoring_end_to_end() {
        let config = test_config();
        std::fs::create_dir_all(&config.data_path).unwrap();
        // Constant model: always predicts 7.25
        std::fs::write(
            &config.model_path,
            r#"{"layers": [{"weights": [[0.0, 0.0, 0.0, 0.0]], "bias": [7.25]}]}"#,
        )
        .unwrap();
        std::fs::write(
            &config.scaler_path,
            r#"{"mean": [0.3, 75.0, 45.0, 34.5], "scale": [0.1, 10.0, 10.0, 1.0]}"#,
        )
        .unwrap();

        let handle = start(&config).await;
        let base = format!("http://{}", handle.addr);
        let client = reqwest::Client::new();

        let body = wait_for_source(&client, &base, "model").await;
        assert_eq!(body["score"], 7.3);

        let status: serde_json::Value = client
            .get(format!("{base}/status"))
            .send()
            .await
            .expect("Failed to send request")
            .json()
            .await
            .expect("Failed to parse JSON");
        assert_eq!(status["model_available"], true);
        assert_eq!(status["model_loaded"], true);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_stats_endpoint() {
        let config = test_config();
        let handle = start(&config).await;
        let base = format!("http://{}", handle.addr);
        let client = reqwest::Client::new();

        wait_for_source(&client, &base, "heuristic").await;

        let body: serde_json::Value = client
            .get(format!("{base}/stats"))
            .send()
            .await
            .expect("Failed to send request")
            .json()
            .await
            .expect("Failed to parse JSON");

        assert!(body["ticks"].as_u64().unwrap() >= 2);
        assert_eq!(body["sources_seeded"], 1);
        assert!(body["readings_published"].as_u64().unwrap() >= 1);

        handle.shutdown().await;
    }
}
