//! The queue of tracks waiting to be played.

use std::collections::VecDeque;
use std::fmt::{Display, Write};

use delegate::delegate;
use rand::seq::SliceRandom;
use tokio::sync::{Mutex, Notify};

use super::Track;
use crate::error::UserError;

/// FIFO of pending tracks for one guild.
///
/// Order is insertion order until [shuffle](SongQueue::shuffle) is called.
/// Only the session's draining task should call [dequeue](SongQueue::dequeue).
#[derive(Debug, Default)]
pub struct SongQueue {
    #[allow(clippy::missing_docs_in_private_items)]
    inner: Mutex<VecDeque<Track>>,
    /// Wakes the consumer waiting in [dequeue](SongQueue::dequeue).
    available: Notify,
}

impl SongQueue {
    /// Add to the back of the queue, returns the new length.
    pub async fn enqueue(&self, track: Track) -> usize {
        let len = {
            let mut queue = self.inner.lock().await;
            queue.push_back(track);
            queue.len()
        };
        self.available.notify_one();
        len
    }

    /// Take the front of the queue, waiting until there is one.
    pub async fn dequeue(&self) -> Track {
        loop {
            // Created before checking so an enqueue in between leaves a permit.
            let notified = self.available.notified();
            if let Some(track) = self.inner.lock().await.pop_front() {
                return track;
            }
            notified.await;
        }
    }

    /// Randomly reorder the queue.
    pub async fn shuffle(&self) {
        let mut queue = self.inner.lock().await;
        queue.make_contiguous().shuffle(&mut rand::thread_rng());
    }

    /// Remove the track at the 0-based `index`.
    pub async fn remove_at(&self, index: usize) -> Result<Track, UserError> {
        let mut queue = self.inner.lock().await;
        let len = queue.len();
        queue.remove(index).ok_or(UserError::NoSuchTrack {
            position: index + 1,
            len,
        })
    }

    /// Clone the tracks in `start..end`, clamped to the queue.
    pub async fn slice(&self, start: usize, end: usize) -> Vec<Track> {
        let queue = self.inner.lock().await;
        let end = end.min(queue.len());
        let start = start.min(end);
        queue.range(start..end).cloned().collect()
    }

    /// One page of the queue. `page` starts at 1.
    pub async fn page(&self, page: usize, per_page: usize) -> Result<QueuePage, UserError> {
        let per_page = per_page.max(1);
        let total = self.len().await;
        if total == 0 {
            return Err(UserError::EmptyQueue);
        }

        let pages = total.div_ceil(per_page);
        if page == 0 || page > pages {
            return Err(UserError::NoSuchPage { page, pages });
        }

        let start = (page - 1) * per_page;
        let tracks = self.slice(start, start + per_page).await;
        Ok(QueuePage {
            first_position: start + 1,
            tracks,
            page,
            pages,
            total,
        })
    }

    delegate! {
        to self.inner.lock().await {
            /// Number of queued tracks.
            #[await(false)]
            pub async fn len(&self) -> usize;
            /// Whether the queue is empty.
            #[await(false)]
            pub async fn is_empty(&self) -> bool;
            /// Clear the queue.
            #[await(false)]
            pub async fn clear(&self);
        }
    }
}

/// A page of the queue, displayed as an embed description.
#[derive(Debug, Clone)]
pub struct QueuePage {
    /// 1-based queue position of the first track.
    pub first_position: usize,
    pub tracks: Vec<Track>,
    pub page: usize,
    pub pages: usize,
    /// Length of the whole queue.
    pub total: usize,
}

impl Display for QueuePage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut buffer = String::new();
        for (position, track) in (self.first_position..).zip(&self.tracks) {
            let next_line = format!("`{position}.` [**{}**]({})", track.title, track.url);

            // An embed has a limit of 4096 chars
            if buffer.len() + next_line.len() > 4000 {
                break;
            }
            writeln!(buffer, "{next_line}")?;
        }
        write!(f, "**{} tracks:**\n\n{buffer}", self.total)
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::*;
    use crate::player::testing;

    async fn queue_of(titles: &[&str]) -> SongQueue {
        let queue = SongQueue::default();
        for title in titles {
            queue.enqueue(testing::track(title, 1)).await;
        }
        queue
    }

    async fn titles(queue: &SongQueue) -> Vec<String> {
        let len = queue.len().await;
        queue
            .slice(0, len)
            .await
            .into_iter()
            .map(|t| t.title)
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn dequeues_in_order_then_waits() {
        let queue = queue_of(&["a", "b", "c"]).await;

        assert_eq!(queue.dequeue().await.title, "a");
        assert_eq!(queue.dequeue().await.title, "b");
        assert_eq!(queue.dequeue().await.title, "c");

        let waited = tokio::time::timeout(Duration::from_secs(60), queue.dequeue()).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn dequeue_wakes_on_enqueue() {
        let queue = std::sync::Arc::new(SongQueue::default());
        let consumer = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.dequeue().await })
        };
        tokio::task::yield_now().await;

        queue.enqueue(testing::track("late", 1)).await;
        assert_eq!(consumer.await.unwrap().title, "late");
    }

    #[tokio::test]
    async fn remove_at_bounds() {
        let queue = queue_of(&["a", "b", "c"]).await;

        assert_eq!(queue.remove_at(1).await.unwrap().title, "b");
        assert_eq!(titles(&queue).await, ["a", "c"]);

        let err = queue.remove_at(2).await.unwrap_err();
        assert!(matches!(err, UserError::NoSuchTrack { position: 3, len: 2 }));
        assert_eq!(titles(&queue).await, ["a", "c"]);
    }

    #[tokio::test]
    async fn shuffle_keeps_tracks() {
        let names: Vec<String> = (0..20).map(|i| i.to_string()).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let queue = queue_of(&refs).await;

        queue.shuffle().await;

        let mut shuffled = titles(&queue).await;
        shuffled.sort();
        let mut expected = names.clone();
        expected.sort();
        assert_eq!(shuffled, expected);
    }

    #[tokio::test]
    async fn pages() {
        let names: Vec<String> = (1..=23).map(|i| i.to_string()).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let queue = queue_of(&refs).await;

        let page = queue.page(3, 10).await.unwrap();
        assert_eq!(page.pages, 3);
        assert_eq!(page.first_position, 21);
        assert_eq!(page.tracks.len(), 3);
        assert!(page.to_string().starts_with("**23 tracks:**"));
        assert!(page.to_string().contains("`21.` [**21**]"));

        assert!(matches!(
            queue.page(4, 10).await,
            Err(UserError::NoSuchPage { page: 4, pages: 3 })
        ));
        assert!(matches!(
            queue.page(0, 10).await,
            Err(UserError::NoSuchPage { .. })
        ));
        assert!(matches!(
            SongQueue::default().page(1, 10).await,
            Err(UserError::EmptyQueue)
        ));
    }

    #[tokio::test]
    async fn slice_is_clamped() {
        let queue = queue_of(&["a", "b"]).await;
        assert_eq!(queue.slice(1, 10).await.len(), 1);
        assert!(queue.slice(5, 10).await.is_empty());
    }
}
