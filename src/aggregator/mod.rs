//! Read-time aggregation over stored comics.
//!
//! Every read recomputes `totalViews` (and `totalRates` for top series) from
//! the chapter view counters and rating entries. Nothing computed here is
//! written back to the store.

mod fan_out;

pub use fan_out::{FanOutSettings, ViewFailurePolicy, fetch_views};

use std::sync::Arc;

use crate::error::StoreError;
use crate::models::{Chapter, Comic, ComicDetailView, ComicPatch, ComicView};
use crate::store::{ChapterViewSource, ComicStore, UserStore};

pub const NEWEST_ARRIVALS_LIMIT: i64 = 5;

/// Query shape of a comic listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComicSelector {
    All,
    ByGenre(String),
    ByName(String),
    Newest(i64),
    /// All comics, most viewed first.
    Trending,
    /// All comics, highest rating sum first.
    TopRated,
}

pub fn compute_rate(comic: &Comic) -> i64 {
    comic.rates.iter().map(|entry| i64::from(entry.rate)).sum()
}

#[derive(Clone)]
pub struct Aggregator {
    comics: Arc<dyn ComicStore>,
    views: Arc<dyn ChapterViewSource>,
    users: Arc<dyn UserStore>,
    settings: FanOutSettings,
}

impl Aggregator {
    pub fn new(
        comics: Arc<dyn ComicStore>,
        views: Arc<dyn ChapterViewSource>,
        users: Arc<dyn UserStore>,
        settings: FanOutSettings,
    ) -> Self {
        Self {
            comics,
            views,
            users,
            settings,
        }
    }

    pub async fn compute_view(&self, comic: &Comic) -> Result<i64, StoreError> {
        let views = fetch_views(&self.views, &comic.chapters, &self.settings).await?;
        Ok(views.iter().sum())
    }

    /// Totals for many comics at once. All chapter ids go through a single
    /// bounded fan-out and are split back per comic afterwards.
    async fn compute_views(&self, comics: &[Comic]) -> Result<Vec<i64>, StoreError> {
        let chapter_ids: Vec<i64> = comics
            .iter()
            .flat_map(|comic| comic.chapters.iter().copied())
            .collect();
        let views = fetch_views(&self.views, &chapter_ids, &self.settings).await?;

        let mut remaining = views.as_slice();
        Ok(comics
            .iter()
            .map(|comic| {
                let (own, rest) = remaining.split_at(comic.chapters.len());
                remaining = rest;
                own.iter().sum()
            })
            .collect())
    }

    pub async fn list_comics(&self, selector: &ComicSelector) -> Result<Vec<ComicView>, StoreError> {
        let comics = match selector {
            ComicSelector::All | ComicSelector::Trending | ComicSelector::TopRated => {
                self.comics.get_all().await?
            }
            ComicSelector::ByGenre(genre) => self.comics.get_by_genre(genre).await?,
            ComicSelector::ByName(text) => self.comics.search_by_name(text).await?,
            ComicSelector::Newest(limit) => self.comics.get_newest(*limit).await?,
        };

        let totals = self.compute_views(&comics).await?;
        let mut views: Vec<ComicView> = comics
            .iter()
            .zip(totals)
            .map(|(comic, total_views)| ComicView::project(comic, total_views))
            .collect();

        // `sort_by` is stable, so ties keep store order.
        match selector {
            ComicSelector::Trending => {
                views.sort_by(|a, b| b.total_views.cmp(&a.total_views));
            }
            ComicSelector::TopRated => {
                views = views
                    .into_iter()
                    .zip(&comics)
                    .map(|(view, comic)| view.with_total_rates(compute_rate(comic)))
                    .collect();
                views.sort_by(|a, b| b.total_rates.cmp(&a.total_rates));
            }
            _ => {}
        }

        Ok(views)
    }

    pub async fn get_comic_detail(
        &self,
        comic_id: i64,
        user_id: i64,
    ) -> Result<ComicDetailView, StoreError> {
        let comic = self.comics.get_by_id(comic_id).await?;
        let (total_views, user) =
            tokio::try_join!(self.compute_view(&comic), self.users.find_by_id(user_id))?;

        Ok(ComicDetailView {
            is_sub: user.is_subscribed_to(comic.id),
            comic: ComicView::project(&comic, total_views),
        })
    }

    /// Chapters of a comic in the comic's own chapter order.
    pub async fn list_chapters(&self, comic_id: i64) -> Result<Vec<Chapter>, StoreError> {
        let comic = self.comics.get_by_id(comic_id).await?;
        self.views.get_chapters_by_ids(&comic.chapters).await
    }

    pub async fn update_comic(
        &self,
        comic_id: i64,
        patch: ComicPatch,
    ) -> Result<ComicView, StoreError> {
        let comic = self.comics.update(comic_id, patch).await?;
        let total_views = self.compute_view(&comic).await?;
        Ok(ComicView::project(&comic, total_views))
    }
}
