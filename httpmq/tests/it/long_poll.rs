use crate::helper::{pop, pop_timeout, push, request, start_server};
use anyhow::Result;
use hyper::{Method, StatusCode};
use std::time::{Duration, Instant};

#[tokio::test]
async fn waiting_pop_gets_later_push() -> Result<()> {
    let addr = start_server().await?;

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        push(addr, "/jobs", "job-1").await
    });

    let started = Instant::now();

    assert_eq!(pop_timeout(addr, "/jobs", 2).await?.as_deref(), Some("job-1"));
    assert!(started.elapsed() < Duration::from_secs(2));

    // it went to the waiting consumer only
    assert_eq!(pop(addr, "/jobs").await?, None);

    Ok(())
}

#[tokio::test]
async fn waiting_pop_times_out() -> Result<()> {
    let addr = start_server().await?;

    let started = Instant::now();

    assert_eq!(pop_timeout(addr, "/idle", 1).await?, None);

    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_secs(1));
    assert!(elapsed < Duration::from_millis(1500));

    // a push after the timeout is not taken by the expired waiter
    push(addr, "/idle", "fresh").await?;
    assert_eq!(pop(addr, "/idle").await?.as_deref(), Some("fresh"));

    Ok(())
}

#[tokio::test]
async fn available_message_is_returned_without_waiting() -> Result<()> {
    let addr = start_server().await?;

    push(addr, "/ready", "now").await?;

    let started = Instant::now();

    assert_eq!(pop_timeout(addr, "/ready", 10).await?.as_deref(), Some("now"));
    assert!(started.elapsed() < Duration::from_secs(1));

    Ok(())
}

#[tokio::test]
async fn invalid_timeout_is_not_found() -> Result<()> {
    let addr = start_server().await?;

    push(addr, "/q", "stay").await?;

    let (status, _) = request(addr, Method::GET, "/q?timeout=later").await?;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(pop(addr, "/q").await?.as_deref(), Some("stay"));

    Ok(())
}
