// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Demonstrates using `UniFlight` in front of a slow, fallible backend.
//!
//! Concurrent requests for the same key share one backend call. The backend fails on its first
//! call; every request that joined that call sees the same error, and the next round of requests
//! triggers a fresh call that succeeds.

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use uniflight::UniFlight;

async fn load_profile(calls: &AtomicUsize) -> Result<String, String> {
    let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
    tokio::time::sleep(Duration::from_millis(200)).await;

    if call == 1 {
        Err(format!("backend timed out (call #{call})"))
    } else {
        Ok(format!("Profile(name: Alice) from call #{call}"))
    }
}

#[tokio::main]
async fn main() {
    let group = Arc::new(UniFlight::<String, Result<String, String>>::new());
    let calls = Arc::new(AtomicUsize::new(0));

    for round in 1..=2 {
        println!("round {round}: 4 concurrent requests for profile:42");

        let handles: Vec<_> = (1..=4)
            .map(|request| {
                let group = Arc::clone(&group);
                let calls = Arc::clone(&calls);
                tokio::spawn(async move {
                    let outcome = group
                        .work("profile:42".to_string(), || async { load_profile(&calls).await })
                        .await;
                    println!("  [request {request}] {outcome:?}");
                })
            })
            .collect();

        for handle in handles {
            handle.await.expect("request task panicked");
        }
    }

    println!("backend was called {} time(s) for 8 requests", calls.load(Ordering::SeqCst));
}
