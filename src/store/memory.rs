use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use super::{ChapterViewSource, ComicStore, SubscriptionStore, UserStore};
use crate::error::StoreError;
use crate::models::{Chapter, Comic, ComicPatch, RateEntry, SubscriptionToggle, User};

pub fn comic(id: i64, title: &str) -> Comic {
    Comic {
        id,
        title: title.to_string(),
        description: None,
        thumb_img: Some(format!("thumb-{}.png", id)),
        preview_img: None,
        author_id: None,
        total_sub: 0,
        chapters: Vec::new(),
        genres: Vec::new(),
        rates: Vec::new(),
        comments: Vec::new(),
        created_at: Utc.timestamp_opt(1_700_000_000 + id * 60, 0).unwrap(),
        updated_at: None,
    }
}

pub fn rates(values: &[i32]) -> Vec<RateEntry> {
    values
        .iter()
        .enumerate()
        .map(|(idx, rate)| RateEntry {
            user_id: idx as i64 + 1,
            rate: *rate,
        })
        .collect()
}

#[derive(Default)]
struct Inner {
    comics: Vec<Comic>,
    chapters: HashMap<i64, Chapter>,
    users: HashMap<i64, User>,
    failing_chapters: HashSet<i64>,
    panicking_chapters: HashSet<i64>,
    delayed_chapters: HashMap<i64, Duration>,
    delayed_comics: HashMap<i64, Duration>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_comic(&self, comic: Comic) {
        self.inner.lock().unwrap().comics.push(comic);
    }

    pub fn insert_chapter(&self, id: i64, comic_id: i64, views: i64) {
        let chapter = Chapter {
            id,
            comic_id,
            title: format!("Chapter {}", id),
            position: id as i32,
            views,
            created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        };
        self.inner.lock().unwrap().chapters.insert(id, chapter);
    }

    pub fn insert_user(&self, id: i64, subscribe: Vec<i64>) {
        let user = User {
            id,
            username: format!("user{}", id),
            email: format!("user{}@example.com", id),
            hashed_password: None,
            coin: 0,
            vip: false,
            is_admin: false,
            subscribe,
            like: Vec::new(),
            created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            updated_at: None,
        };
        self.inner.lock().unwrap().users.insert(id, user);
    }

    pub fn promote_admin(&self, id: i64) {
        if let Some(user) = self.inner.lock().unwrap().users.get_mut(&id) {
            user.is_admin = true;
        }
    }

    pub fn fail_chapter(&self, id: i64) {
        self.inner.lock().unwrap().failing_chapters.insert(id);
    }

    pub fn delay_chapter(&self, id: i64, delay: Duration) {
        self.inner.lock().unwrap().delayed_chapters.insert(id, delay);
    }

    /// The view lookup for `id` panics instead of returning.
    pub fn panic_on_chapter(&self, id: i64) {
        self.inner.lock().unwrap().panicking_chapters.insert(id);
    }

    pub fn delay_comic(&self, id: i64, delay: Duration) {
        self.inner.lock().unwrap().delayed_comics.insert(id, delay);
    }

    pub fn total_sub(&self, comic_id: i64) -> Option<i64> {
        let inner = self.inner.lock().unwrap();
        inner
            .comics
            .iter()
            .find(|comic| comic.id == comic_id)
            .map(|comic| comic.total_sub)
    }

    pub fn subscriptions_of(&self, user_id: i64) -> Vec<i64> {
        let inner = self.inner.lock().unwrap();
        inner
            .users
            .get(&user_id)
            .map(|user| user.subscribe.clone())
            .unwrap_or_default()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn select<F>(&self, predicate: F) -> Vec<Comic>
    where
        F: Fn(&Comic) -> bool,
    {
        let inner = self.inner.lock().unwrap();
        inner
            .comics
            .iter()
            .filter(|comic| predicate(comic))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ChapterViewSource for MemoryStore {
    async fn get_view(&self, chapter_id: i64) -> Result<i64, StoreError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let (delay, failing, panicking, chapter) = {
            let inner = self.inner.lock().unwrap();
            (
                inner.delayed_chapters.get(&chapter_id).copied(),
                inner.failing_chapters.contains(&chapter_id),
                inner.panicking_chapters.contains(&chapter_id),
                inner.chapters.get(&chapter_id).cloned(),
            )
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if panicking {
            panic!("view counter crashed for chapter {}", chapter_id);
        }
        if failing {
            return Err(StoreError::Unavailable(format!(
                "view counter unavailable for chapter {}",
                chapter_id
            )));
        }

        chapter
            .map(|chapter| chapter.views)
            .ok_or_else(|| StoreError::chapter_not_found(chapter_id))
    }

    async fn get_chapters_by_ids(&self, ids: &[i64]) -> Result<Vec<Chapter>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| inner.chapters.get(id).cloned())
            .collect())
    }
}

#[async_trait]
impl ComicStore for MemoryStore {
    async fn get_by_id(&self, id: i64) -> Result<Comic, StoreError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let delay = self.inner.lock().unwrap().delayed_comics.get(&id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.select(|comic| comic.id == id)
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::comic_not_found(id))
    }

    async fn get_all(&self) -> Result<Vec<Comic>, StoreError> {
        Ok(self.select(|_| true))
    }

    async fn get_by_genre(&self, genre: &str) -> Result<Vec<Comic>, StoreError> {
        Ok(self.select(|comic| comic.genres.iter().any(|g| g.eq_ignore_ascii_case(genre))))
    }

    async fn search_by_name(&self, text: &str) -> Result<Vec<Comic>, StoreError> {
        let needle = text.to_lowercase();
        Ok(self.select(|comic| comic.title.to_lowercase().contains(&needle)))
    }

    async fn get_newest(&self, limit: i64) -> Result<Vec<Comic>, StoreError> {
        let mut comics = self.select(|_| true);
        comics.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        comics.truncate(limit.max(0) as usize);
        Ok(comics)
    }

    async fn update(&self, id: i64, patch: ComicPatch) -> Result<Comic, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let comic = inner
            .comics
            .iter_mut()
            .find(|comic| comic.id == id)
            .ok_or_else(|| StoreError::comic_not_found(id))?;

        if let Some(title) = patch.title {
            comic.title = title;
        }
        if let Some(description) = patch.description {
            comic.description = Some(description);
        }
        if let Some(thumb_img) = patch.thumb_img {
            comic.thumb_img = Some(thumb_img);
        }
        if let Some(preview_img) = patch.preview_img {
            comic.preview_img = Some(preview_img);
        }
        if let Some(genres) = patch.genre {
            comic.genres = genres;
        }
        comic.updated_at = Some(Utc::now());

        Ok(comic.clone())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_id(&self, id: i64) -> Result<User, StoreError> {
        let inner = self.inner.lock().unwrap();
        inner
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::user_not_found(id))
    }
}

#[async_trait]
impl SubscriptionStore for MemoryStore {
    async fn toggle_subscription(
        &self,
        user_id: i64,
        comic_id: i64,
    ) -> Result<SubscriptionToggle, StoreError> {
        let mut guard = self.inner.lock().unwrap();
        let inner = &mut *guard;

        let comic = inner
            .comics
            .iter_mut()
            .find(|comic| comic.id == comic_id)
            .ok_or_else(|| StoreError::comic_not_found(comic_id))?;
        let user = inner
            .users
            .get_mut(&user_id)
            .ok_or_else(|| StoreError::user_not_found(user_id))?;

        let subscribed = if let Some(pos) = user.subscribe.iter().position(|id| *id == comic_id) {
            user.subscribe.remove(pos);
            comic.total_sub = (comic.total_sub - 1).max(0);
            false
        } else {
            user.subscribe.push(comic_id);
            comic.total_sub += 1;
            true
        };

        Ok(SubscriptionToggle {
            subscribed,
            total_sub: comic.total_sub,
        })
    }
}
