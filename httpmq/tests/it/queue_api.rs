use crate::helper::{pop, push, request, start_server};
use anyhow::Result;
use hyper::{Method, StatusCode};
use std::collections::HashSet;

#[tokio::test]
async fn fifo_order() -> Result<()> {
    let addr = start_server().await?;

    for m in ["A", "B", "C"] {
        assert_eq!(push(addr, "/letters", m).await?, StatusCode::OK);
    }

    assert_eq!(pop(addr, "/letters").await?.as_deref(), Some("A"));
    assert_eq!(pop(addr, "/letters").await?.as_deref(), Some("B"));
    assert_eq!(pop(addr, "/letters").await?.as_deref(), Some("C"));
    assert_eq!(pop(addr, "/letters").await?, None);

    Ok(())
}

#[tokio::test]
async fn pop_unknown_queue_is_not_found() -> Result<()> {
    let addr = start_server().await?;

    let (status, body) = request(addr, Method::GET, "/nobody-pushed-here").await?;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.is_empty());

    Ok(())
}

#[tokio::test]
async fn push_without_value_is_bad_request() -> Result<()> {
    let addr = start_server().await?;

    let (status, body) = request(addr, Method::PUT, "/q").await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.is_empty());
    assert_eq!(pop(addr, "/q").await?, None);

    Ok(())
}

#[tokio::test]
async fn other_methods_are_not_allowed() -> Result<()> {
    let addr = start_server().await?;

    push(addr, "/q", "keep").await?;

    for method in [Method::POST, Method::DELETE, Method::PATCH] {
        let (status, _) = request(addr, method, "/q?v=other").await?;

        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    assert_eq!(pop(addr, "/q").await?.as_deref(), Some("keep"));
    assert_eq!(pop(addr, "/q").await?, None);

    Ok(())
}

#[tokio::test]
async fn encoded_message() -> Result<()> {
    let addr = start_server().await?;

    push(addr, "/q", "hello%20world%21").await?;

    assert_eq!(pop(addr, "/q").await?.as_deref(), Some("hello world!"));

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_producers_and_consumers() -> Result<()> {
    const PRODUCERS: usize = 4;
    const PER_PRODUCER: usize = 25;
    const TOTAL: usize = PRODUCERS * PER_PRODUCER;

    let addr = start_server().await?;

    let producers = (0..PRODUCERS).map(|p| {
        tokio::spawn(async move {
            for i in 0..PER_PRODUCER {
                push(addr, "/shared", &format!("{p}-{i}")).await?;
            }

            anyhow::Ok(())
        })
    });

    let consumers = (0..PRODUCERS).map(|_| {
        tokio::spawn(async move {
            let mut got = vec![];

            for _ in 0..PER_PRODUCER {
                match crate::helper::pop_timeout(addr, "/shared", 5).await? {
                    Some(m) => got.push(m),
                    None => break,
                }
            }

            anyhow::Ok(got)
        })
    });

    let producers: Vec<_> = producers.collect();
    let consumers: Vec<_> = consumers.collect();

    for r in futures::future::join_all(producers).await {
        r??;
    }

    let mut seen = HashSet::new();

    for r in futures::future::join_all(consumers).await {
        for m in r?? {
            assert!(seen.insert(m.clone()), "{m} delivered twice");
        }
    }

    assert_eq!(seen.len(), TOTAL);
    assert_eq!(pop(addr, "/shared").await?, None);

    Ok(())
}
