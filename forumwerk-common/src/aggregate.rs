//! Like and post counting shared by every read path.
//!
//! A read operation loads one [`ContentSnapshot`] (posts, post likes, thread
//! likes) and composes all of its thread and post views from it, so counts
//! agree between a thread, its nested replies and any listing around it.

use crate::{
    model::{
        Id,
        forum::Forum,
        post::{Post, PostMarker, PostView},
        thread::{Thread, ThreadMarker, ThreadView},
    },
    tree::ReplyIndex,
};
use derive_where::derive_where;
use std::collections::HashMap;

/// Like count per target id. Missing ids count as zero.
#[derive_where(Clone, Eq, PartialEq, Debug, Default)]
pub struct LikeCounts<Marker>(HashMap<Id<Marker>, u64>);

impl<Marker> LikeCounts<Marker> {
    #[must_use]
    pub fn get(&self, id: Id<Marker>) -> u64 {
        self.0.get(&id).copied().unwrap_or(0)
    }

    /// Sum over `ids`; each id is counted as often as it appears.
    #[must_use]
    pub fn total(&self, ids: impl IntoIterator<Item = Id<Marker>>) -> u64 {
        ids.into_iter().map(|id| self.get(id)).sum()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<Marker> FromIterator<(Id<Marker>, u64)> for LikeCounts<Marker> {
    /// Repeated ids are added together.
    fn from_iter<T: IntoIterator<Item = (Id<Marker>, u64)>>(iter: T) -> Self {
        let mut counts = HashMap::new();
        for (id, count) in iter {
            *counts.entry(id).or_insert(0) += count;
        }
        Self(counts)
    }
}

/// Posts of every depth per thread, independent of reply-tree shape.
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct PostCounts(HashMap<Id<ThreadMarker>, u64>);

impl PostCounts {
    #[must_use]
    pub fn from_posts<'a>(posts: impl IntoIterator<Item = &'a Post>) -> Self {
        let mut counts = HashMap::new();
        for post in posts {
            *counts.entry(post.thread).or_insert(0) += 1;
        }
        Self(counts)
    }

    #[must_use]
    pub fn get(&self, thread: Id<ThreadMarker>) -> u64 {
        self.0.get(&thread).copied().unwrap_or(0)
    }
}

/// Everything one read operation needs to compose its views.
#[derive(Clone, Debug, Default)]
pub struct ContentSnapshot {
    posts_by_thread: HashMap<Id<ThreadMarker>, Vec<Post>>,
    post_counts: PostCounts,
    post_likes: LikeCounts<PostMarker>,
    thread_likes: LikeCounts<ThreadMarker>,
}

impl ContentSnapshot {
    #[must_use]
    pub fn new(
        posts: Vec<Post>,
        post_likes: LikeCounts<PostMarker>,
        thread_likes: LikeCounts<ThreadMarker>,
    ) -> Self {
        let post_counts = PostCounts::from_posts(&posts);

        let mut posts_by_thread: HashMap<_, Vec<Post>> = HashMap::new();
        for post in posts {
            posts_by_thread.entry(post.thread).or_default().push(post);
        }

        Self {
            posts_by_thread,
            post_counts,
            post_likes,
            thread_likes,
        }
    }

    #[must_use]
    pub fn posts_of(&self, thread: Id<ThreadMarker>) -> &[Post] {
        self.posts_by_thread
            .get(&thread)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn posts(&self) -> impl Iterator<Item = &Post> {
        self.posts_by_thread.values().flatten()
    }

    #[must_use]
    pub fn post_likes(&self) -> &LikeCounts<PostMarker> {
        &self.post_likes
    }

    #[must_use]
    pub fn thread_likes(&self) -> &LikeCounts<ThreadMarker> {
        &self.thread_likes
    }

    #[must_use]
    pub fn post_count(&self, thread: Id<ThreadMarker>) -> u64 {
        self.post_counts.get(thread)
    }

    /// Full thread view: counts plus top-level posts with nested replies.
    #[must_use]
    pub fn thread_view(&self, thread: &Thread, forum: Option<&Forum>) -> ThreadView {
        let posts = ReplyIndex::new(self.posts_of(thread.id)).build(None, &self.post_likes);
        self.compose_thread(thread, forum, posts)
    }

    /// Thread view for listings: counts only, `posts` left empty.
    #[must_use]
    pub fn thread_listing(&self, thread: &Thread, forum: Option<&Forum>) -> ThreadView {
        self.compose_thread(thread, forum, Vec::new())
    }

    /// One post with its reply subtree.
    #[must_use]
    pub fn post_view(&self, post: &Post) -> PostView {
        ReplyIndex::new(self.posts_of(post.thread)).build_node(post, &self.post_likes)
    }

    /// Views of the given posts, each with its own reply subtree.
    ///
    /// The reply index of every thread involved is built once.
    #[must_use]
    pub fn post_views(&self, posts: &[&Post]) -> Vec<PostView> {
        let mut indexes: HashMap<Id<ThreadMarker>, ReplyIndex<'_>> = HashMap::new();

        posts
            .iter()
            .map(|post| {
                indexes
                    .entry(post.thread)
                    .or_insert_with(|| ReplyIndex::new(self.posts_of(post.thread)))
                    .build_node(post, &self.post_likes)
            })
            .collect()
    }

    fn compose_thread(
        &self,
        thread: &Thread,
        forum: Option<&Forum>,
        posts: Vec<PostView>,
    ) -> ThreadView {
        ThreadView::compose(
            thread,
            forum,
            self.thread_likes.get(thread.id),
            self.post_count(thread.id),
            posts,
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        aggregate::{ContentSnapshot, LikeCounts, PostCounts},
        model::{
            Id,
            post::{Post, PostMarker},
            thread::{Thread, ThreadMarker},
            user::{Role, User, UserHandle},
        },
    };
    use time::{Duration, macros::datetime};

    fn user() -> User {
        User {
            id: Id::from(100),
            handle: UserHandle::new("author".to_owned()).unwrap(),
            role: Role::Member,
            banned_at: None,
        }
    }

    fn post(id: u64, thread: u64, parent: Option<u64>) -> Post {
        Post {
            id: Id::from(id),
            thread: Id::from(thread),
            parent: parent.map(Id::from),
            author: user(),
            content: String::new(),
            created_at: datetime!(2026-01-01 00:00 UTC) + Duration::seconds(id.cast_signed()),
        }
    }

    fn thread(id: u64) -> Thread {
        Thread {
            id: Id::from(id),
            forum: Id::from(1),
            author: user(),
            title: format!("thread {id}"),
            content: String::new(),
            created_at: datetime!(2026-01-01 00:00 UTC),
        }
    }

    #[test]
    fn missing_ids_count_zero() {
        let likes = LikeCounts::<PostMarker>::from_iter([(Id::from(1), 2)]);

        assert_eq!(likes.get(Id::from(1)), 2);
        assert_eq!(likes.get(Id::from(99)), 0);
        assert_eq!(LikeCounts::<ThreadMarker>::default().get(Id::from(1)), 0);
    }

    #[test]
    fn counts_compare_for_any_marker() {
        struct BareMarker;

        let likes = LikeCounts::<BareMarker>::from_iter([(Id::from(1), 2), (Id::from(2), 0)]);
        let same = likes.clone();

        assert_eq!(likes, same);
        assert_ne!(likes, LikeCounts::default());
        assert_eq!(likes.total([Id::from(1), Id::from(2)]), 2);
    }

    #[test]
    fn repeated_ids_accumulate() {
        let likes = LikeCounts::<PostMarker>::from_iter([(Id::from(1), 2), (Id::from(1), 1)]);

        assert_eq!(likes.get(Id::from(1)), 3);
        assert_eq!(likes.total([Id::from(1), Id::from(5)]), 3);
    }

    #[test]
    fn post_count_includes_nested_replies() {
        let posts = [
            post(1, 10, None),
            post(2, 10, Some(1)),
            post(3, 10, Some(2)),
            post(4, 20, None),
        ];
        let counts = PostCounts::from_posts(&posts);

        assert_eq!(counts.get(Id::from(10)), 3);
        assert_eq!(counts.get(Id::from(20)), 1);
        assert_eq!(counts.get(Id::from(30)), 0);
    }

    #[test]
    fn thread_view_uses_shared_counts() {
        let snapshot = ContentSnapshot::new(
            vec![post(1, 10, None), post(2, 10, Some(1)), post(3, 20, None)],
            LikeCounts::from_iter([(Id::from(2), 4)]),
            LikeCounts::from_iter([(Id::from(10), 7)]),
        );

        let view = snapshot.thread_view(&thread(10), None);

        assert_eq!(view.post_count, 2);
        assert_eq!(view.like_count, 7);
        assert_eq!(view.posts.len(), 1);
        assert_eq!(view.posts[0].replies[0].like_count, 4);

        let listing = snapshot.thread_listing(&thread(20), None);
        assert_eq!(listing.post_count, 1);
        assert_eq!(listing.like_count, 0);
        assert!(listing.posts.is_empty());
    }

    #[test]
    fn post_views_carry_subtrees() {
        let posts = vec![post(1, 10, None), post(2, 10, Some(1)), post(3, 20, None)];
        let snapshot =
            ContentSnapshot::new(posts.clone(), LikeCounts::default(), LikeCounts::default());

        let views = snapshot.post_views(&[&posts[0], &posts[2]]);

        assert_eq!(views.len(), 2);
        assert_eq!(views[0].replies.len(), 1);
        assert!(views[1].replies.is_empty());
    }
}
