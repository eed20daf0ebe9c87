use crate::{
    ContentService,
    error::{Missing, Result},
};
use forumwerk_common::model::{
    Id,
    forum::{CreateForum, Forum, ForumMarker, ForumPatch, ForumView},
    thread::{Thread, ThreadFilter, ThreadSummary, ThreadView},
};
use tracing::{info, instrument};

impl ContentService {
    #[instrument(skip_all)]
    pub async fn create_forum(&self, forum: &CreateForum) -> Result<Forum> {
        let forum = self.store.create_forum(forum).await?;
        info!(forum = %forum.id, "Created forum");
        Ok(forum)
    }

    pub async fn list_forums(&self) -> Result<Vec<ForumView>> {
        let forums = self.store.list_forums().await?;
        let threads = self.store.list_threads(ThreadFilter::All).await?;

        let mut views: Vec<ForumView> = forums
            .into_iter()
            .map(|forum| {
                let summaries = summaries(threads.iter().filter(|thread| thread.forum == forum.id));
                ForumView {
                    forum,
                    threads: summaries,
                }
            })
            .collect();
        views.sort_by_key(|view| (view.forum.created_at, view.forum.id));
        Ok(views)
    }

    #[instrument(skip(self))]
    pub async fn get_forum(&self, id: Id<ForumMarker>) -> Result<ForumView> {
        let forum = self.require_forum(id).await?;
        let threads = self.store.list_threads(ThreadFilter::Forum(id)).await?;

        Ok(ForumView {
            forum,
            threads: summaries(threads.iter()),
        })
    }

    #[instrument(skip(self, patch))]
    pub async fn update_forum(&self, id: Id<ForumMarker>, patch: &ForumPatch) -> Result<Forum> {
        Ok(self
            .store
            .update_forum(id, patch)
            .await?
            .ok_or(Missing::Forum(id))?)
    }

    #[instrument(skip(self))]
    pub async fn delete_forum(&self, id: Id<ForumMarker>) -> Result<()> {
        if self.store.delete_forum(id).await? {
            info!("Deleted forum");
            Ok(())
        } else {
            Err(Missing::Forum(id).into())
        }
    }

    /// Full thread views of a forum, newest first.
    #[instrument(skip(self))]
    pub async fn threads_by_forum(&self, id: Id<ForumMarker>) -> Result<Vec<ThreadView>> {
        let forum = self.require_forum(id).await?;
        let mut threads = self.store.list_threads(ThreadFilter::Forum(id)).await?;
        newest_first(&mut threads);

        let ids: Vec<_> = threads.iter().map(|thread| thread.id).collect();
        let snapshot = self.snapshot(&ids).await?;

        Ok(threads
            .iter()
            .map(|thread| snapshot.thread_view(thread, Some(&forum)))
            .collect())
    }
}

fn summaries<'a>(threads: impl Iterator<Item = &'a Thread>) -> Vec<ThreadSummary> {
    let mut summaries: Vec<ThreadSummary> = threads.map(ThreadSummary::from).collect();
    summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
    summaries
}

pub(super) fn newest_first(threads: &mut [Thread]) {
    threads.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
}
