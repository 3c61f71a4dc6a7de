//! Read side of the stores: queries and the record streams they produce.

mod progress;
mod query;

pub use progress::ProgressStream;
pub use query::{RankSpec, SelectQuery, SortDirection};

use futures::stream::{self, BoxStream};
use futures::{Stream, StreamExt};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use crate::error::EtlResult;
use crate::types::RawRecord;

/// A store rows can be read from.
pub trait Source {
    /// Whether the source evaluates [`SelectQuery::rank`] itself.
    ///
    /// Sources that cannot rank receive queries without a rank and the caller keeps the
    /// first row per partition on its side.
    fn supports_ranking(&self) -> bool {
        false
    }

    /// Runs `query` and returns its rows as a lazy, finite stream.
    ///
    /// The stream cannot be rewound: reading the rows again requires issuing the query again.
    fn execute_query(
        &self,
        query: &SelectQuery,
    ) -> impl Future<Output = EtlResult<RecordStream>> + Send;
}

/// Ordered stream of [`RawRecord`]s produced by a [`Source`].
#[must_use = "streams do nothing unless polled"]
pub struct RecordStream {
    columns: Arc<[String]>,
    inner: BoxStream<'static, EtlResult<RawRecord>>,
}

impl RecordStream {
    pub fn new<S>(columns: Arc<[String]>, inner: S) -> Self
    where
        S: Stream<Item = EtlResult<RawRecord>> + Send + 'static,
    {
        Self {
            columns,
            inner: inner.boxed(),
        }
    }

    /// Creates a stream over records that are already in memory.
    pub fn from_records(columns: Arc<[String]>, records: Vec<RawRecord>) -> Self {
        Self::new(columns, stream::iter(records.into_iter().map(Ok)))
    }

    pub fn columns(&self) -> &Arc<[String]> {
        &self.columns
    }
}

impl Stream for RecordStream {
    type Item = EtlResult<RawRecord>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}
