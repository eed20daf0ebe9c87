use crate::{
    ContentService, MentionTarget,
    error::{Missing, Result},
    service::{distinct_threads, forums::newest_first},
};
use forumwerk_common::model::{
    Id,
    like::{LikeOutcome, LikeTarget, LikeToggle},
    notification::NotificationKind,
    thread::{
        CreateThread, Thread, ThreadFilter, ThreadMarker, ThreadPatch, ThreadSort, ThreadView,
    },
    user::{User, UserMarker},
};
use tracing::{debug, info, instrument};

pub(super) const THREAD_LIKED: &str = "Your thread was liked!";

impl ContentService {
    #[instrument(skip(self, thread), fields(forum = %thread.forum))]
    pub async fn create_thread(
        &self,
        author: Id<UserMarker>,
        thread: &CreateThread,
    ) -> Result<ThreadView> {
        self.require_forum(thread.forum).await?;
        let created = self.store.create_thread(author, thread).await?;
        info!(thread = %created.id, "Created thread");

        self.notifications
            .scan_and_notify_mentions(&created.content, author, MentionTarget::Thread(created.id))
            .await;

        self.thread_view(&created).await
    }

    #[instrument(skip(self))]
    pub async fn get_thread(&self, id: Id<ThreadMarker>) -> Result<ThreadView> {
        let thread = self.require_thread(id).await?;
        self.thread_view(&thread).await
    }

    /// Every thread in `sort` order, optionally only those whose title or
    /// content contains `query` (ignoring case).
    #[instrument(skip(self, query))]
    pub async fn list_threads(
        &self,
        sort: ThreadSort,
        query: Option<&str>,
    ) -> Result<Vec<ThreadView>> {
        let mut threads = self.store.list_threads(ThreadFilter::All).await?;

        if let Some(query) = query.map(str::trim).filter(|query| !query.is_empty()) {
            let needle = query.to_lowercase();
            threads.retain(|thread| {
                thread.title.to_lowercase().contains(&needle)
                    || thread.content.to_lowercase().contains(&needle)
            });
        }

        let mut views = self.thread_views(&threads).await?;
        sort.sort(&mut views);
        Ok(views)
    }

    /// Threads started by `author`, newest first.
    #[instrument(skip(self))]
    pub async fn threads_by_user(&self, author: Id<UserMarker>) -> Result<Vec<ThreadView>> {
        self.require_user(author).await?;
        let mut threads = self.store.list_threads(ThreadFilter::Author(author)).await?;
        newest_first(&mut threads);
        self.thread_views(&threads).await
    }

    #[instrument(skip(self, patch))]
    pub async fn update_thread(
        &self,
        id: Id<ThreadMarker>,
        patch: &ThreadPatch,
    ) -> Result<ThreadView> {
        let before = self.require_thread(id).await?;
        let updated = self
            .store
            .update_thread(id, patch)
            .await?
            .ok_or(Missing::Thread(id))?;

        if updated.content != before.content {
            self.notifications
                .scan_and_notify_mentions(
                    &updated.content,
                    updated.author.id,
                    MentionTarget::Thread(id),
                )
                .await;
        }

        self.thread_view(&updated).await
    }

    #[instrument(skip(self))]
    pub async fn delete_thread(&self, id: Id<ThreadMarker>) -> Result<()> {
        if self.store.delete_thread(id).await? {
            info!("Deleted thread");
            Ok(())
        } else {
            Err(Missing::Thread(id).into())
        }
    }

    /// Likes the thread, or takes the like back if `user` already liked it.
    #[instrument(skip(self))]
    pub async fn toggle_thread_like(
        &self,
        user: Id<UserMarker>,
        id: Id<ThreadMarker>,
    ) -> Result<LikeOutcome<ThreadView>> {
        let thread = self.require_thread(id).await?;
        let target = LikeTarget::Thread(id);

        let state = if self.store.has_like(user, target).await? {
            self.store.delete_like(user, target).await?;
            LikeToggle::Unliked
        } else {
            if !self.store.insert_like(user, target).await? {
                debug!("Like was inserted concurrently");
            }
            LikeToggle::Liked
        };

        if state == LikeToggle::Liked && thread.author.id != user {
            self.notifications
                .dispatch(
                    thread.author.id,
                    user,
                    THREAD_LIKED,
                    NotificationKind::Like,
                    Some(format!("/threads/{id}")),
                )
                .await;
        }

        Ok(LikeOutcome {
            state,
            target: self.thread_view(&thread).await?,
        })
    }

    #[instrument(skip(self))]
    pub async fn thread_likers(&self, id: Id<ThreadMarker>) -> Result<Vec<User>> {
        self.require_thread(id).await?;
        Ok(self.store.list_likers(LikeTarget::Thread(id)).await?)
    }

    /// One full thread view composed from fresh counts.
    pub(super) async fn thread_view(&self, thread: &Thread) -> Result<ThreadView> {
        let forum = self.store.fetch_forum(thread.forum).await?;
        let snapshot = self.snapshot(&[thread.id]).await?;
        Ok(snapshot.thread_view(thread, forum.as_ref()))
    }

    /// Full views of `threads` in the given order, sharing one snapshot.
    pub(super) async fn thread_views(&self, threads: &[Thread]) -> Result<Vec<ThreadView>> {
        let ids = distinct_threads(threads.iter().map(|thread| thread.id));
        let snapshot = self.snapshot(&ids).await?;
        let forums = self.forums_by_id().await?;

        Ok(threads
            .iter()
            .map(|thread| snapshot.thread_view(thread, forums.get(&thread.forum)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        error::{Missing, ServiceError},
        service::testing::{forum, inbox, service, user},
    };
    use forumwerk_common::model::{
        Id,
        forum::ForumMarker,
        like::LikeToggle,
        notification::NotificationKind,
        post::CreatePost,
        thread::{CreateThread, ThreadPatch, ThreadSort},
    };

    fn new_thread(forum: Id<ForumMarker>, title: &str, content: &str) -> CreateThread {
        CreateThread {
            forum,
            title: title.to_owned(),
            content: content.to_owned(),
        }
    }

    #[tokio::test]
    async fn thread_needs_forum() {
        let (service, store) = service();
        let author = user(&store, "alice").await;

        let result = service
            .create_thread(author.id, &new_thread(Id::from(9), "lost", ""))
            .await;

        assert!(matches!(
            result,
            Err(ServiceError::NotFound(Missing::Forum(_)))
        ));
    }

    #[tokio::test]
    async fn created_thread_view() {
        let (service, store) = service();
        let author = user(&store, "alice").await;
        let general = forum(&service).await;

        let view = service
            .create_thread(author.id, &new_thread(general.id, "Hello", "first!"))
            .await
            .unwrap();

        assert_eq!(view.title, "Hello");
        assert_eq!(view.forum_title.as_deref(), Some("General"));
        assert_eq!(view.author.handle.get(), "alice");
        assert_eq!(view.like_count, 0);
        assert_eq!(view.post_count, 0);
        assert!(view.posts.is_empty());
    }

    #[tokio::test]
    async fn mentions_in_thread_notify_once() {
        let (service, store) = service();
        let alice = user(&store, "alice").await;
        let bob = user(&store, "bob").await;
        let carol = user(&store, "carol").await;
        let general = forum(&service).await;

        let view = service
            .create_thread(
                carol.id,
                &new_thread(general.id, "Ping", "hi @alice and @bob, @alice and @carol @nobody"),
            )
            .await
            .unwrap();

        for mentioned in [&alice, &bob] {
            let notifications = inbox(&store, mentioned).await;
            assert_eq!(notifications.len(), 1);
            assert_eq!(notifications[0].kind, NotificationKind::Mention);
            assert_eq!(notifications[0].message, "You were mentioned in a thread.");
            assert_eq!(notifications[0].url, Some(format!("/threads/{}", view.id)));
            assert_eq!(notifications[0].sender, carol.id);
            assert!(!notifications[0].is_read);
        }
        assert!(inbox(&store, &carol).await.is_empty());
    }

    #[tokio::test]
    async fn edit_rescans_only_changed_content() {
        let (service, store) = service();
        let alice = user(&store, "alice").await;
        let bob = user(&store, "bob").await;
        let general = forum(&service).await;
        let thread = service
            .create_thread(alice.id, &new_thread(general.id, "Topic", "cc @bob"))
            .await
            .unwrap();

        service
            .update_thread(
                thread.id,
                &ThreadPatch {
                    title: Some("Renamed".to_owned()),
                    content: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(inbox(&store, &bob).await.len(), 1);

        let updated = service
            .update_thread(
                thread.id,
                &ThreadPatch {
                    title: None,
                    content: Some("still cc @bob".to_owned()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.title, "Renamed");
        assert_eq!(inbox(&store, &bob).await.len(), 2);
    }

    #[tokio::test]
    async fn like_toggles_back() {
        let (service, store) = service();
        let alice = user(&store, "alice").await;
        let bob = user(&store, "bob").await;
        let general = forum(&service).await;
        let thread = service
            .create_thread(alice.id, &new_thread(general.id, "Topic", ""))
            .await
            .unwrap();

        let liked = service.toggle_thread_like(bob.id, thread.id).await.unwrap();
        assert_eq!(liked.state, LikeToggle::Liked);
        assert_eq!(liked.target.like_count, 1);
        assert_eq!(service.thread_likers(thread.id).await.unwrap(), vec![bob.clone()]);

        let unliked = service.toggle_thread_like(bob.id, thread.id).await.unwrap();
        assert_eq!(unliked.state, LikeToggle::Unliked);
        assert_eq!(unliked.target.like_count, thread.like_count);

        let notifications = inbox(&store, &alice).await;
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].kind, NotificationKind::Like);
        assert_eq!(notifications[0].message, "Your thread was liked!");
    }

    #[tokio::test]
    async fn liking_own_thread_is_silent() {
        let (service, store) = service();
        let alice = user(&store, "alice").await;
        let general = forum(&service).await;
        let thread = service
            .create_thread(alice.id, &new_thread(general.id, "Topic", ""))
            .await
            .unwrap();

        service.toggle_thread_like(alice.id, thread.id).await.unwrap();

        assert!(inbox(&store, &alice).await.is_empty());
    }

    #[tokio::test]
    async fn sorting_and_search() {
        let (service, store) = service();
        let alice = user(&store, "alice").await;
        let bob = user(&store, "bob").await;
        let general = forum(&service).await;

        let quiet = service
            .create_thread(alice.id, &new_thread(general.id, "Quiet", "nothing here"))
            .await
            .unwrap();
        let busy = service
            .create_thread(alice.id, &new_thread(general.id, "Busy", "Rust talk"))
            .await
            .unwrap();
        let liked = service
            .create_thread(alice.id, &new_thread(general.id, "Liked", "RUST again"))
            .await
            .unwrap();

        for content in ["one", "two"] {
            service
                .create_post(
                    bob.id,
                    &CreatePost {
                        thread: busy.id,
                        parent: None,
                        content: content.to_owned(),
                    },
                )
                .await
                .unwrap();
        }
        service.toggle_thread_like(bob.id, liked.id).await.unwrap();

        let ids = |views: Vec<forumwerk_common::model::thread::ThreadView>| {
            views.into_iter().map(|view| view.id).collect::<Vec<_>>()
        };

        assert_eq!(
            ids(service.list_threads(ThreadSort::New, None).await.unwrap()),
            vec![liked.id, busy.id, quiet.id]
        );
        assert_eq!(
            ids(service.list_threads(ThreadSort::Best, None).await.unwrap())[0],
            busy.id
        );
        assert_eq!(
            ids(service.list_threads(ThreadSort::Hot, None).await.unwrap())[0],
            liked.id
        );
        assert_eq!(
            ids(service.list_threads(ThreadSort::New, Some("rust")).await.unwrap()),
            vec![liked.id, busy.id]
        );

        let listed = service.list_threads(ThreadSort::Best, None).await.unwrap();
        assert_eq!(listed[0].post_count, 2);
        assert_eq!(listed[0].posts.len(), 2);
    }

    #[tokio::test]
    async fn threads_by_user_only_lists_theirs() {
        let (service, store) = service();
        let alice = user(&store, "alice").await;
        let bob = user(&store, "bob").await;
        let general = forum(&service).await;

        service
            .create_thread(alice.id, &new_thread(general.id, "Mine", ""))
            .await
            .unwrap();
        service
            .create_thread(bob.id, &new_thread(general.id, "Theirs", ""))
            .await
            .unwrap();

        let threads = service.threads_by_user(alice.id).await.unwrap();
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].title, "Mine");

        assert!(matches!(
            service.threads_by_user(Id::from(12345)).await,
            Err(ServiceError::NotFound(Missing::User(_)))
        ));
    }
}
