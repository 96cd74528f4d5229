use std::sync::Arc;

use tokio::task::JoinSet;

use crate::error::StoreError;
use crate::models::{SubscriptionEntry, SubscriptionToggle};
use crate::store::{ComicStore, SubscriptionStore, UserStore};

#[derive(Clone)]
pub struct SubscriptionView {
    comics: Arc<dyn ComicStore>,
    users: Arc<dyn UserStore>,
    subscriptions: Arc<dyn SubscriptionStore>,
}

impl SubscriptionView {
    pub fn new(
        comics: Arc<dyn ComicStore>,
        users: Arc<dyn UserStore>,
        subscriptions: Arc<dyn SubscriptionStore>,
    ) -> Self {
        Self {
            comics,
            users,
            subscriptions,
        }
    }

    pub async fn toggle_subscribe(
        &self,
        user_id: i64,
        comic_id: i64,
    ) -> Result<SubscriptionToggle, StoreError> {
        let toggle = self
            .subscriptions
            .toggle_subscription(user_id, comic_id)
            .await?;

        tracing::debug!(
            user_id = user_id,
            comic_id = comic_id,
            subscribed = toggle.subscribed,
            total_sub = toggle.total_sub,
            "subscription toggled"
        );
        Ok(toggle)
    }

    /// Display fields of every subscribed comic, in subscription order.
    /// Lookups run concurrently. Subscriptions whose comic no longer
    /// resolves are skipped.
    pub async fn list_subscriptions(
        &self,
        user_id: i64,
    ) -> Result<Vec<SubscriptionEntry>, StoreError> {
        let user = self.users.find_by_id(user_id).await?;

        let mut join_set = JoinSet::new();
        for (idx, comic_id) in user.subscribe.iter().copied().enumerate() {
            let comics = Arc::clone(&self.comics);
            join_set.spawn(async move { (idx, comic_id, comics.get_by_id(comic_id).await) });
        }

        let mut slots: Vec<Option<SubscriptionEntry>> = vec![None; user.subscribe.len()];
        while let Some(joined) = join_set.join_next().await {
            let (idx, comic_id, outcome) = joined
                .map_err(|e| StoreError::Unavailable(format!("comic lookup task failed: {}", e)))?;

            match outcome {
                Ok(comic) => slots[idx] = Some(SubscriptionEntry::from(&comic)),
                Err(StoreError::NotFound { .. }) => {
                    tracing::warn!(
                        user_id = user_id,
                        comic_id = comic_id,
                        "skipping subscription to missing comic"
                    );
                }
                Err(err) => return Err(err),
            }
        }

        Ok(slots.into_iter().flatten().collect())
    }
}
