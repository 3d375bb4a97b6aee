//! Redis adapter backing the queue and persistence ports.
//!
//! One connection pool implements:
//! - `JobQueuePort`: waiting/active lists, a delayed zset for backoff,
//!   bounded terminal lists
//! - `VideoRepository`: video rows as JSON plus a status key mutated only
//!   through conditional scripts
//! - `BillingStore`: append-only per-user record lists

mod billing;
mod pool;
mod queue;
mod repository;

pub use pool::RedisPool;

const NS: &str = "tremolo";

fn waiting_key(queue: &str) -> String {
    format!("{NS}:queue:{queue}:waiting")
}

fn active_key(queue: &str) -> String {
    format!("{NS}:queue:{queue}:active")
}

fn delayed_key(queue: &str) -> String {
    format!("{NS}:queue:{queue}:delayed")
}

fn completed_key(queue: &str) -> String {
    format!("{NS}:queue:{queue}:completed")
}

fn failed_key(queue: &str) -> String {
    format!("{NS}:queue:{queue}:failed")
}

fn paused_key(queue: &str) -> String {
    format!("{NS}:queue:{queue}:paused")
}

fn video_key(id: uuid::Uuid) -> String {
    format!("{NS}:video:{id}")
}

fn video_status_key(id: uuid::Uuid) -> String {
    format!("{NS}:video:{id}:status")
}

fn billing_key(user_id: i64) -> String {
    format!("{NS}:billing:user:{user_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced_per_queue() {
        assert_eq!(waiting_key("transcode"), "tremolo:queue:transcode:waiting");
        assert_eq!(delayed_key("ping"), "tremolo:queue:ping:delayed");
        assert_ne!(active_key("transcode"), active_key("ping"));
    }

    #[test]
    fn video_keys_embed_the_id() {
        let id = uuid::Uuid::new_v4();
        assert!(video_key(id).contains(&id.to_string()));
        assert_eq!(video_status_key(id), format!("{}:status", video_key(id)));
    }
}
