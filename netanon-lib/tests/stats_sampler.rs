use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use netanon_lib::sink::HandleStats;
use netanon_lib::stats::{Sampler, Source};
use tokio::sync::watch;

#[tokio::test]
async fn registers_and_polls_a_source() {
    let sampler = Arc::new(Sampler::new());
    let counter = Arc::new(AtomicU64::new(5));
    let counter_clone = counter.clone();
    sampler
        .register(Source {
            label: "test".into(),
            poll: Box::new(move || HandleStats {
                received: counter_clone.load(Ordering::Relaxed),
                dropped: 0,
                written: 0,
            }),
        })
        .await;

    let (tx, rx) = watch::channel(false);
    let handle = tokio::spawn(sampler.clone().run(Duration::from_millis(10), rx));
    tokio::time::sleep(Duration::from_millis(25)).await;
    tx.send(true).unwrap();
    handle.await.unwrap();
}
