//! Reply-tree reconstruction from a flat list of posts.
//!
//! Posts are grouped once by parent id; each group is ordered by
//! `(created_at, id)`. Views are then materialized top-down from that index,
//! so the input never needs owning back-references.

use crate::{
    aggregate::LikeCounts,
    model::{
        Id,
        post::{Post, PostMarker, PostView},
    },
};
use std::collections::{HashMap, HashSet};

/// Children of every parent id present in a flat post set.
#[derive(Clone, Debug, Default)]
pub struct ReplyIndex<'a> {
    children: HashMap<Option<Id<PostMarker>>, Vec<&'a Post>>,
}

impl<'a> ReplyIndex<'a> {
    #[must_use]
    pub fn new(posts: impl IntoIterator<Item = &'a Post>) -> Self {
        let mut children: HashMap<_, Vec<&Post>> = HashMap::new();
        for post in posts {
            children.entry(post.parent).or_default().push(post);
        }
        for siblings in children.values_mut() {
            siblings.sort_by_key(|post| (post.created_at, post.id));
        }

        Self { children }
    }

    /// Direct children of `parent`, oldest first.
    #[must_use]
    pub fn children_of(&self, parent: Option<Id<PostMarker>>) -> &[&'a Post] {
        self.children
            .get(&parent)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Builds the forest hanging below `root` (`None` for top-level posts).
    ///
    /// Posts whose parent is not reachable from `root` are left out. A post is
    /// never emitted twice, so a malformed cyclic input still terminates.
    #[must_use]
    pub fn build(
        &self,
        root: Option<Id<PostMarker>>,
        likes: &LikeCounts<PostMarker>,
    ) -> Vec<PostView> {
        let mut visited = HashSet::new();
        if let Some(root) = root {
            visited.insert(root);
        }
        self.build_level(root, likes, &mut visited)
    }

    /// Builds the view of one post together with its replies.
    #[must_use]
    pub fn build_node(&self, post: &Post, likes: &LikeCounts<PostMarker>) -> PostView {
        let replies = self.build(Some(post.id), likes);
        PostView::new(post, likes.get(post.id), replies)
    }

    fn build_level(
        &self,
        parent: Option<Id<PostMarker>>,
        likes: &LikeCounts<PostMarker>,
        visited: &mut HashSet<Id<PostMarker>>,
    ) -> Vec<PostView> {
        let mut level = Vec::new();
        for post in self.children_of(parent) {
            if !visited.insert(post.id) {
                continue;
            }
            let replies = self.build_level(Some(post.id), likes, visited);
            level.push(PostView::new(post, likes.get(post.id), replies));
        }
        level
    }
}

/// One-shot form of [`ReplyIndex::build`].
#[must_use]
pub fn build_reply_tree(
    posts: &[Post],
    root: Option<Id<PostMarker>>,
    likes: &LikeCounts<PostMarker>,
) -> Vec<PostView> {
    ReplyIndex::new(posts).build(root, likes)
}

#[cfg(test)]
mod tests {
    use crate::{
        aggregate::LikeCounts,
        model::{
            Id,
            post::{Post, PostMarker, PostView},
            user::{Role, User, UserHandle},
        },
        tree::{ReplyIndex, build_reply_tree},
    };
    use time::{Duration, macros::datetime};

    fn post(id: u64, parent: Option<u64>, t: i64) -> Post {
        Post {
            id: Id::from(id),
            thread: Id::from(1),
            parent: parent.map(Id::from),
            author: User {
                id: Id::from(100),
                handle: UserHandle::new("author".to_owned()).unwrap(),
                role: Role::Member,
                banned_at: None,
            },
            content: format!("post {id}"),
            created_at: datetime!(2026-01-01 00:00 UTC) + Duration::seconds(t),
        }
    }

    fn ids(views: &[PostView]) -> Vec<u64> {
        views.iter().map(|view| view.id.into()).collect()
    }

    fn assert_parents_match(views: &[PostView], parent: Option<Id<PostMarker>>) {
        for view in views {
            assert_eq!(view.parent_id, parent);
            assert_parents_match(&view.replies, Some(view.id));
        }
    }

    #[test]
    fn replies_ordered_by_time() {
        let posts = [
            post(1, None, 10),
            post(2, Some(1), 20),
            post(3, Some(1), 15),
            post(4, Some(2), 30),
        ];

        let tree = build_reply_tree(&posts, None, &LikeCounts::default());

        assert_eq!(ids(&tree), [1]);
        assert_eq!(ids(&tree[0].replies), [3, 2]);
        assert_eq!(ids(&tree[0].replies[1].replies), [4]);
        assert!(tree[0].replies[0].replies.is_empty());
        assert!(tree[0].replies[1].replies[0].replies.is_empty());
        assert_parents_match(&tree, None);
    }

    #[test]
    fn equal_timestamps_fall_back_to_id() {
        let posts = [post(9, None, 5), post(7, None, 5), post(8, None, 5)];

        let first = build_reply_tree(&posts, None, &LikeCounts::default());
        let second = build_reply_tree(&posts, None, &LikeCounts::default());

        assert_eq!(ids(&first), [7, 8, 9]);
        assert_eq!(first, second);
    }

    #[test]
    fn input_order_does_not_matter() {
        let forward = [post(1, None, 1), post(2, Some(1), 2), post(3, Some(1), 3)];
        let backward = [forward[2].clone(), forward[1].clone(), forward[0].clone()];

        assert_eq!(
            build_reply_tree(&forward, None, &LikeCounts::default()),
            build_reply_tree(&backward, None, &LikeCounts::default())
        );
    }

    #[test]
    fn orphans_are_skipped() {
        let posts = [post(1, None, 1), post(2, Some(1), 2), post(5, Some(40), 3)];

        let tree = build_reply_tree(&posts, None, &LikeCounts::default());

        assert_eq!(tree.iter().map(PostView::subtree_len).sum::<usize>(), 2);
    }

    #[test]
    fn subtree_below_a_reply() {
        let posts = [
            post(1, None, 1),
            post(2, Some(1), 2),
            post(3, Some(2), 3),
            post(4, Some(2), 4),
        ];

        let tree = build_reply_tree(&posts, Some(Id::from(2)), &LikeCounts::default());

        assert_eq!(ids(&tree), [3, 4]);
        assert_parents_match(&tree, Some(Id::from(2)));
    }

    #[test]
    fn cycles_terminate() {
        let posts = [post(1, Some(2), 1), post(2, Some(1), 2)];

        let tree = build_reply_tree(&posts, Some(Id::from(1)), &LikeCounts::default());

        assert_eq!(ids(&tree), [2]);
        assert!(tree[0].replies.is_empty());
    }

    #[test]
    fn like_counts_attached_with_zero_default() {
        let posts = [post(1, None, 1), post(2, Some(1), 2)];
        let likes = LikeCounts::from_iter([(Id::from(2), 3)]);

        let tree = ReplyIndex::new(&posts).build(None, &likes);

        assert_eq!(tree[0].like_count, 0);
        assert_eq!(tree[0].replies[0].like_count, 3);
    }

    #[test]
    fn single_node_with_replies() {
        let posts = [post(1, None, 1), post(2, Some(1), 2)];
        let index = ReplyIndex::new(&posts);

        let node = index.build_node(&posts[1], &LikeCounts::default());
        assert!(node.replies.is_empty());

        let root = index.build_node(&posts[0], &LikeCounts::default());
        assert_eq!(ids(&root.replies), [2]);
    }
}
