// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Two cache peers on loopback sharing one group.
//!
//! Every key is owned by one of the peers. Asking either peer for a key returns the same value,
//! but only the owner ever runs the (slow) loader. Set `RUST_LOG=groupcache=debug` to watch the
//! peers talk to each other.

use std::sync::Arc;
use std::time::{Duration, Instant};

use groupcache::{ByteView, CacheGroup, Context, Group, GroupRegistry, HttpPool, PeerPicker, getter_fn};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

struct Peer {
    url: String,
    group: Arc<CacheGroup>,
}

async fn spawn_peer(listener: TcpListener, url: String, peers: &[String]) -> Peer {
    let groups = Arc::new(GroupRegistry::new());
    let pool = Arc::new(HttpPool::new(url.clone(), Arc::clone(&groups)));
    pool.set_peers(peers);

    let owner = url.clone();
    let getter = getter_fn(move |_ctx, key: String| {
        let owner = owner.clone();
        async move {
            // Stand-in for a slow database or a render farm.
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(ByteView::from(format!("profile of {key} (rendered by {owner})")))
        }
    });

    let group = CacheGroup::builder("profiles", getter)
        .cache_entries(1024)
        .peers(Arc::clone(&pool) as Arc<dyn PeerPicker>)
        .build();
    groups
        .register(Arc::clone(&group) as Arc<dyn Group>)
        .expect("fresh registry");

    tokio::spawn(pool.serve(listener));

    Peer { url, group }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("groupcache=info")))
        .init();

    let mut listeners = Vec::new();
    for _ in 0..2 {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let url = format!("http://{}", listener.local_addr()?);
        listeners.push((listener, url));
    }
    let urls: Vec<String> = listeners.iter().map(|(_, url)| url.clone()).collect();

    let mut peers = Vec::new();
    for (listener, url) in listeners {
        peers.push(spawn_peer(listener, url, &urls).await);
    }

    let ctx = Context::new();
    for round in 1..=2 {
        println!("round {round}");
        for key in ["alice", "bob", "carol", "dave"] {
            for peer in &peers {
                let started = Instant::now();
                let value = peer.group.get(&ctx, key).await?;
                println!(
                    "  {} asked for {key}: {} in {:?}",
                    peer.url,
                    String::from_utf8_lossy(&value.to_vec()),
                    started.elapsed()
                );
            }
        }
    }

    Ok(())
}
