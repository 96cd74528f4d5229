use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;

use crate::error::StoreError;
use crate::store::ChapterViewSource;

pub const DEFAULT_VIEW_FETCH_CONCURRENCY: usize = 16;
pub const DEFAULT_VIEW_FETCH_TIMEOUT: Duration = Duration::from_millis(5000);

/// What a failed or timed-out chapter lookup does to the aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewFailurePolicy {
    /// Abort the whole aggregation with the first error.
    #[default]
    Fail,
    /// Count the chapter as 0 views and log a warning.
    TreatAsZero,
}

impl FromStr for ViewFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail" => Ok(Self::Fail),
            "zero" => Ok(Self::TreatAsZero),
            other => Err(format!("unknown view failure policy: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FanOutSettings {
    pub concurrency: usize,
    pub timeout: Duration,
    pub on_failure: ViewFailurePolicy,
}

impl Default for FanOutSettings {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_VIEW_FETCH_CONCURRENCY,
            timeout: DEFAULT_VIEW_FETCH_TIMEOUT,
            on_failure: ViewFailurePolicy::default(),
        }
    }
}

/// A comic listing a chapter the view source cannot find is broken stored
/// data, not a bad request.
fn dangling_chapter(err: StoreError) -> StoreError {
    match err {
        StoreError::NotFound { entity, id } => {
            StoreError::Unavailable(format!("{} {} is referenced but missing", entity, id))
        }
        other => other,
    }
}

/// Looks up the view count of every chapter in `chapter_ids`, with at most
/// `settings.concurrency` lookups in flight. The result is index-aligned with
/// the input.
pub async fn fetch_views(
    source: &Arc<dyn ChapterViewSource>,
    chapter_ids: &[i64],
    settings: &FanOutSettings,
) -> Result<Vec<i64>, StoreError> {
    if chapter_ids.is_empty() {
        return Ok(Vec::new());
    }

    let concurrency = settings.concurrency.max(1).min(chapter_ids.len());
    let mut join_set = JoinSet::new();
    let mut results = vec![0_i64; chapter_ids.len()];
    let mut next_idx = 0usize;
    let mut spawned: HashMap<tokio::task::Id, (usize, i64)> = HashMap::new();

    while next_idx < chapter_ids.len() || !join_set.is_empty() {
        while next_idx < chapter_ids.len() && join_set.len() < concurrency {
            let idx = next_idx;
            let chapter_id = chapter_ids[idx];
            let source = Arc::clone(source);
            let timeout = settings.timeout;

            let handle = join_set.spawn(async move {
                let outcome = match tokio::time::timeout(timeout, source.get_view(chapter_id)).await
                {
                    Ok(result) => result,
                    Err(_) => Err(StoreError::Timeout { chapter_id }),
                };
                (idx, chapter_id, outcome)
            });
            spawned.insert(handle.id(), (idx, chapter_id));

            next_idx += 1;
        }

        let Some(joined) = join_set.join_next().await else {
            break;
        };
        let (idx, chapter_id, outcome) = match joined {
            Ok((idx, chapter_id, outcome)) => (idx, chapter_id, outcome.map_err(dangling_chapter)),
            Err(join_err) => {
                let Some((idx, chapter_id)) = spawned.get(&join_err.id()).copied() else {
                    return Err(StoreError::Unavailable(format!(
                        "view lookup task failed: {}",
                        join_err
                    )));
                };
                let err = StoreError::Unavailable(format!(
                    "view lookup task for chapter {} failed: {}",
                    chapter_id, join_err
                ));
                (idx, chapter_id, Err(err))
            }
        };

        match outcome {
            Ok(views) => results[idx] = views,
            // Returning drops the set, which aborts the lookups still running.
            Err(err) if settings.on_failure == ViewFailurePolicy::Fail => return Err(err),
            Err(err) => {
                tracing::warn!(
                    chapter_id = chapter_id,
                    error = %err,
                    "chapter view lookup failed; counting as 0"
                );
                results[idx] = 0;
            }
        }
    }

    Ok(results)
}
