use futures::{Stream, ready};
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::info;

use crate::error::EtlResult;

pin_project! {
    /// Passes items through while logging a progress line every `every` successful items.
    #[must_use = "streams do nothing unless polled"]
    pub struct ProgressStream<S> {
        #[pin]
        stream: S,
        label: String,
        every: u64,
        seen: u64,
    }
}

impl<S> ProgressStream<S> {
    /// Wraps `stream`. An interval of zero disables logging.
    pub fn wrap(stream: S, label: impl Into<String>, every: u64) -> Self {
        Self {
            stream,
            label: label.into(),
            every,
            seen: 0,
        }
    }

    /// Number of successful items yielded so far.
    pub fn seen(&self) -> u64 {
        self.seen
    }
}

impl<S, T> Stream for ProgressStream<S>
where
    S: Stream<Item = EtlResult<T>>,
{
    type Item = EtlResult<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        let item = ready!(this.stream.poll_next(cx));

        if let Some(Ok(_)) = &item {
            *this.seen += 1;
            if *this.every > 0 && *this.seen % *this.every == 0 {
                info!(table = %this.label, rows = *this.seen, "processed rows");
            }
        }

        Poll::Ready(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{StreamExt, stream};

    #[tokio::test]
    async fn counts_only_successful_items() {
        let items: Vec<EtlResult<u32>> = vec![
            Ok(1),
            Err(crate::etl_error!(crate::error::ErrorKind::InvalidData, "Bad")),
            Ok(2),
        ];
        let mut progress = ProgressStream::wrap(stream::iter(items), "test", 1);

        while progress.next().await.is_some() {}

        assert_eq!(progress.seen(), 2);
    }
}
