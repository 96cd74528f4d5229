use std::sync::Arc;

use crate::aggregator::{Aggregator, FanOutSettings};
use crate::store::{ChapterViewSource, ComicStore, SubscriptionStore, UserStore};
use crate::subscription::SubscriptionView;

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Aggregator,
    pub subscriptions: SubscriptionView,
    pub users: Arc<dyn UserStore>,
    pub jwt_secret: Arc<str>,
}

impl AppState {
    /// Wires every collaborator to the same backing store.
    pub fn new<S>(store: Arc<S>, fan_out: FanOutSettings, jwt_secret: &str) -> Self
    where
        S: ComicStore + ChapterViewSource + UserStore + SubscriptionStore + 'static,
    {
        Self {
            aggregator: Aggregator::new(store.clone(), store.clone(), store.clone(), fan_out),
            subscriptions: SubscriptionView::new(store.clone(), store.clone(), store.clone()),
            users: store,
            jwt_secret: Arc::from(jwt_secret),
        }
    }
}
