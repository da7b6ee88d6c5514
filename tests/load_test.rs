//! End-to-end load test over real sockets.

use std::time::{Duration, Instant};

use admission_gate::lifecycle::Shutdown;
use admission_gate::HttpServer;
use reqwest::StatusCode;

mod common;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_load_against_single_client_budget() {
    // 1. Setup mock upstream
    let (upstream, hits) = common::start_mock_upstream("Hello from upstream").await;

    // 2. Start gate
    let config = common::config_for(upstream);
    let max = config.rate_limit.max_requests_per_window as usize;
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let gate_addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config);
    let server_shutdown = shutdown.subscribe();
    let server_task = tokio::spawn(async move { server.run(listener, server_shutdown).await });

    tokio::time::sleep(Duration::from_millis(100)).await;

    // 3. Fire concurrent requests from one client and from anonymous clients
    let concurrency = 40;
    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    let url = format!("http://{}/api/create-dns-record", gate_addr);
    let start = Instant::now();

    let mut tasks = Vec::new();
    for i in 0..concurrency {
        let client = client.clone();
        let url = url.clone();
        tasks.push(tokio::spawn(async move {
            let mut request = client.get(&url);
            if i % 2 == 0 {
                request = request.header("x-forwarded-for", "1.2.3.4");
            }
            let res = request.send().await.expect("gate unreachable");
            (i % 2 == 0, res.status())
        }));
    }

    let mut identified_ok = 0;
    let mut identified_limited = 0;
    let mut anonymous_ok = 0;
    for task in tasks {
        match task.await.unwrap() {
            (true, StatusCode::OK) => identified_ok += 1,
            (true, StatusCode::TOO_MANY_REQUESTS) => identified_limited += 1,
            (false, StatusCode::OK) => anonymous_ok += 1,
            (identified, status) => panic!("unexpected status {status} (identified: {identified})"),
        }
    }

    println!("\n--- Load Test Results ---");
    println!("Total Requests:  {}", concurrency);
    println!("Total Duration:  {:?}", start.elapsed());
    println!("Identified OK:   {}", identified_ok);
    println!("Identified 429:  {}", identified_limited);
    println!("Anonymous OK:    {}", anonymous_ok);
    println!("-------------------------\n");

    // 4. Budget held exactly; anonymous traffic untouched
    assert_eq!(identified_ok, max);
    assert_eq!(identified_limited, concurrency / 2 - max);
    assert_eq!(anonymous_ok, concurrency / 2);
    assert_eq!(hits.load(std::sync::atomic::Ordering::SeqCst), max + concurrency / 2);

    // 5. Graceful shutdown (drop pooled keep-alive connections first)
    drop(client);
    shutdown.trigger();
    let result = tokio::time::timeout(Duration::from_secs(5), server_task)
        .await
        .expect("server did not stop")
        .unwrap();
    assert!(result.is_ok());
}
