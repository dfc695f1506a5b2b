use std::fmt::Display;
use std::future::Future;

use futures::future::join_all;
use tracing::debug;

/// Runs one operation per item concurrently and keeps only the successes.
///
/// Every future is started together and awaited collectively. Failures are
/// logged at debug level and dropped, so the output may be shorter than the
/// input.
pub(crate) async fn best_effort<I, T, F, Fut, E>(items: I, operation: F) -> Vec<(I::Item, T)>
where
    I: IntoIterator,
    I::Item: Display + Clone,
    F: Fn(I::Item) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::error::Error + 'static,
{
    let attempts = items.into_iter().map(|item| {
        let future = operation(item.clone());
        async move { (item, future.await) }
    });

    join_all(attempts)
        .await
        .into_iter()
        .filter_map(|(item, result)| match result {
            Ok(value) => Some((item, value)),
            Err(error) => {
                debug!(
                    %item,
                    error = &error as &dyn std::error::Error,
                    "skipping control after failure"
                );
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::error::TransportError;

    #[tokio::test]
    async fn failures_are_omitted_and_successes_kept() {
        let results = best_effort(["brightness", "gain", "hue"], |name| async move {
            if name == "gain" {
                Err(TransportError::SimulatedStall {
                    name: name.to_string(),
                })
            } else {
                Ok(name.len())
            }
        })
        .await;

        assert_eq!(vec![("brightness", 10), ("hue", 3)], results);
    }

    #[tokio::test]
    async fn empty_input_yields_empty_output() {
        let results = best_effort(Vec::<String>::new(), |_name| async {
            Ok::<_, TransportError>(())
        })
        .await;

        assert_eq!(Vec::<(String, ())>::new(), results);
    }
}
