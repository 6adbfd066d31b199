/// integration tests to ensure store workers are created and respond to commands
///
use provider_lib::store::supervisor::Supervisor;
use provider_lib::worker::{WorkerState, OK};
use std::time::Duration;

const TTL: Duration = Duration::from_secs(60);

#[test]
fn single_worker() {
    async_std::task::block_on(async move {
        let supervisor = Supervisor::new(1, TTL)
            .await
            .expect("should create the supervisor");

        assert_eq!(supervisor.pool_size, 1);
        assert_eq!(supervisor.workers.len(), 1);

        // now get the status, should be ok
        let status = supervisor.status().await;
        assert_eq!(status.len(), 1);
        for sts in status.iter() {
            assert_eq!(sts.worker_id.len(), 16);
            assert_eq!(sts.status, OK);
            assert_eq!(sts.state, WorkerState::Idle);
            assert!(!sts.uptime.is_empty());
            assert_eq!(sts.error_count, 0);
            assert_eq!(sts.entries, 0);
        }

        assert_eq!(supervisor.len().await, 0);

        // set a value and read it back
        let prev = supervisor
            .set("greeting", r#""hello""#.to_string())
            .await
            .expect("set should work");
        assert_eq!(prev, None);

        let value = supervisor.get("greeting").await.expect("get should work");
        assert_eq!(value.as_deref(), Some(r#""hello""#));
        assert_eq!(supervisor.keys().await.expect("keys"), vec!["greeting"]);

        // remove it
        let removed = supervisor.remove("greeting").await.expect("remove should work");
        assert!(removed.is_some());
        assert_eq!(supervisor.len().await, 0);

        assert!(supervisor.shutdown().await.is_ok());
    });
}

#[test]
fn worker_pool() {
    async_std::task::block_on(async move {
        let supervisor = Supervisor::new(4, TTL)
            .await
            .expect("should create the supervisor");

        // enough keys that every worker gets some
        let count = 50;
        for n in 0..count {
            supervisor
                .set(&format!("key-{}", n), n.to_string())
                .await
                .expect("set should work");
        }

        assert_eq!(supervisor.len().await, count);

        let status = supervisor.status().await;
        assert_eq!(status.len(), 4);
        assert!(status.iter().all(|sts| sts.entries > 0));
        assert_eq!(status.iter().map(|sts| sts.entries).sum::<usize>(), count);

        let mut keys = supervisor.keys().await.expect("keys");
        keys.sort();
        assert_eq!(keys.len(), count);

        for n in 0..count {
            let value = supervisor
                .get(&format!("key-{}", n))
                .await
                .expect("get should work");
            assert_eq!(value, Some(n.to_string()));
        }

        supervisor.remove("key-7").await.expect("remove should work");
        assert_eq!(supervisor.len().await, count - 1);

        assert!(supervisor.shutdown().await.is_ok());

        // a stopped pool reports its workers as down
        async_std::task::sleep(Duration::from_millis(50)).await;
        let status = supervisor.status().await;
        assert!(status.iter().all(|sts| sts.state == WorkerState::Broken));
    });
}

#[test]
fn expired_entries_are_purged() {
    async_std::task::block_on(async move {
        let supervisor = Supervisor::new(2, Duration::from_millis(100))
            .await
            .expect("should create the supervisor");

        for n in 0..6 {
            supervisor
                .set(&format!("key-{}", n), "1".to_string())
                .await
                .expect("set should work");
        }

        async_std::task::sleep(Duration::from_millis(250)).await;
        assert_eq!(supervisor.purge().await.expect("purge should work"), 6);
        assert_eq!(supervisor.len().await, 0);

        assert!(supervisor.shutdown().await.is_ok());
    });
}
