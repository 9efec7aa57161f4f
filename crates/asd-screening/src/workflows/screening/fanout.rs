//! Fan-out/fan-in over keyed fallible futures: run them all, keep every outcome.

use std::future::Future;

use futures::future::join_all;

/// Outcomes of a fan-out, each tagged with the key it was dispatched under.
/// Both lists keep dispatch order.
#[derive(Debug)]
pub struct Settled<K, T, E> {
    pub fulfilled: Vec<(K, T)>,
    pub rejected: Vec<(K, E)>,
}

impl<K, T, E> Settled<K, T, E> {
    pub fn dispatched(&self) -> usize {
        self.fulfilled.len() + self.rejected.len()
    }

    pub fn is_partial(&self) -> bool {
        !self.fulfilled.is_empty() && !self.rejected.is_empty()
    }

    /// Succeeds when at least one task fulfilled; otherwise hands back every rejection.
    pub fn succeed_if_any(self) -> Result<Self, Vec<(K, E)>> {
        if self.fulfilled.is_empty() {
            Err(self.rejected)
        } else {
            Ok(self)
        }
    }
}

/// Polls every task concurrently and waits until all of them settle.
pub async fn settle_all<K, T, E, F, I>(tasks: I) -> Settled<K, T, E>
where
    I: IntoIterator<Item = (K, F)>,
    F: Future<Output = Result<T, E>>,
{
    let (keys, futures): (Vec<K>, Vec<F>) = tasks.into_iter().unzip();
    let results = join_all(futures).await;

    let mut settled = Settled {
        fulfilled: Vec::with_capacity(keys.len()),
        rejected: Vec::new(),
    };
    for (key, result) in keys.into_iter().zip(results) {
        match result {
            Ok(value) => settled.fulfilled.push((key, value)),
            Err(err) => settled.rejected.push((key, err)),
        }
    }
    settled
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::BoxFuture;
    use futures::FutureExt;
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn keeps_successes_and_failures_apart() {
        let tasks: Vec<(&str, BoxFuture<'static, Result<u32, String>>)> = vec![
            ("a", async { Ok(1) }.boxed()),
            ("b", async { Err("down".to_string()) }.boxed()),
            ("c", async { Ok(3) }.boxed()),
        ];

        let settled = settle_all(tasks).await;
        assert_eq!(settled.fulfilled, vec![("a", 1), ("c", 3)]);
        assert_eq!(settled.rejected, vec![("b", "down".to_string())]);
        assert_eq!(settled.dispatched(), 3);
        assert!(settled.is_partial());
        assert!(settled.succeed_if_any().is_ok());
    }

    #[tokio::test]
    async fn all_rejections_fail_the_fan_out() {
        let tasks = vec![
            ("a", futures::future::ready(Err::<(), _>("x"))),
            ("b", futures::future::ready(Err::<(), _>("y"))),
        ];

        let rejected = settle_all(tasks)
            .await
            .succeed_if_any()
            .expect_err("nothing fulfilled");
        assert_eq!(rejected, vec![("a", "x"), ("b", "y")]);
    }

    #[tokio::test]
    async fn tasks_run_concurrently() {
        // The first task can only finish once the second one has run.
        let (tx, rx) = oneshot::channel::<u8>();
        let waiter = async move { rx.await.map_err(|_| "sender dropped") }.boxed();
        let sender = async move {
            tx.send(7).map_err(|_| "receiver dropped")?;
            Ok::<u8, &'static str>(0)
        }
        .boxed();

        let settled = tokio::time::timeout(
            Duration::from_secs(1),
            settle_all(vec![("waiter", waiter), ("sender", sender)]),
        )
        .await
        .expect("fan-out does not serialize its tasks");
        assert_eq!(settled.fulfilled, vec![("waiter", 7), ("sender", 0)]);
    }
}
