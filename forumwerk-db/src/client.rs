use crate::record::{
    AuthenticationRecord, ForumRecord, FullPostRecord, FullThreadRecord, LikeCountRecord,
    NotificationRecord, UserRecord,
};
use async_trait::async_trait;
use forumwerk_common::{
    model::{
        ForumwerkSnowflakeGenerator, Id, ModelValidationError,
        auth::{AuthTokenHash, Authentication},
        forum::{CreateForum, Forum, ForumMarker, ForumPatch},
        like::LikeTarget,
        notification::{NewNotification, Notification, NotificationMarker},
        post::{CreatePost, Post, PostMarker},
        thread::{CreateThread, Thread, ThreadFilter, ThreadMarker, ThreadPatch},
        user::{CreateUser, Role, User, UserMarker},
    },
    snowflake::{ProcessId, WorkerId},
    store::{self, ContentStore, StoreError},
    util::PositiveDuration,
};
use sqlx::{PgPool, migrate::Migrator, query, query_as};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::info;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        match value {
            DbError::Data(error) => StoreError::Data(error),
            DbError::Sqlx(error) => StoreError::backend(error),
            DbError::Migrate(error) => StoreError::backend(error),
        }
    }
}

/// Binds a batch of ids as a `BIGINT[]` for `= ANY($1)`.
fn ids<Marker>(ids: &[Id<Marker>]) -> Vec<i64> {
    ids.iter().copied().map(Id::as_i64).collect()
}

fn users(records: Vec<UserRecord>) -> Result<Vec<User>> {
    Ok(records
        .into_iter()
        .map(User::try_from)
        .collect::<Result<_, _>>()?)
}

fn threads(records: Vec<FullThreadRecord>) -> Result<Vec<Thread>> {
    Ok(records
        .into_iter()
        .map(Thread::try_from)
        .collect::<Result<_, _>>()?)
}

fn posts(records: Vec<FullPostRecord>) -> Result<Vec<Post>> {
    Ok(records
        .into_iter()
        .map(Post::try_from)
        .collect::<Result<_, _>>()?)
}

pub struct DbClient {
    pool: PgPool,
    snowflake_generator: ForumwerkSnowflakeGenerator,
}

impl DbClient {
    #[must_use]
    pub fn new(pool: PgPool, worker_id: WorkerId, process_id: ProcessId) -> Self {
        Self {
            pool,
            snowflake_generator: ForumwerkSnowflakeGenerator::new(worker_id, process_id),
        }
    }

    pub async fn connect(
        database_url: &str,
        worker_id: WorkerId,
        process_id: ProcessId,
    ) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self::new(pool, worker_id, process_id))
    }

    pub async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    fn next_id<Marker>(&self) -> (Id<Marker>, OffsetDateTime) {
        let snowflake = self.snowflake_generator.generate();
        (Id::new(snowflake), snowflake.created_at())
    }

    pub async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<User>> {
        let record = query_as::<_, UserRecord>(
            "
            SELECT
                users.user_snowflake,
                users.handle,
                users.role,
                users.banned_at
            FROM
                users.users
            WHERE
                users.user_snowflake = $1
            ",
        )
        .bind(user_id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        let user = record.map(User::try_from).transpose()?;
        Ok(user)
    }

    pub async fn fetch_user_by_handle(&self, handle: &str) -> Result<Option<User>> {
        let record = query_as::<_, UserRecord>(
            "
            SELECT
                users.user_snowflake,
                users.handle,
                users.role,
                users.banned_at
            FROM
                users.users
            WHERE
                users.handle = $1
            ",
        )
        .bind(handle)
        .fetch_optional(&self.pool)
        .await?;

        let user = record.map(User::try_from).transpose()?;
        Ok(user)
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        let records = query_as::<_, UserRecord>(
            "
            SELECT
                users.user_snowflake,
                users.handle,
                users.role,
                users.banned_at
            FROM
                users.users
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        users(records)
    }

    pub async fn create_user(&self, user: &CreateUser) -> Result<User> {
        let (user_id, _): (Id<UserMarker>, _) = self.next_id();

        let record = query_as::<_, UserRecord>(
            "
            INSERT INTO users.users (user_snowflake, handle, role)
            VALUES ($1, $2, $3)
            RETURNING
                users.user_snowflake,
                users.handle,
                users.role,
                users.banned_at
            ",
        )
        .bind(user_id.as_i64())
        .bind(user.handle.get())
        .bind(Role::default().as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(record.try_into()?)
    }

    pub async fn set_user_role(&self, user_id: Id<UserMarker>, role: Role) -> Result<Option<User>> {
        let record = query_as::<_, UserRecord>(
            "
            UPDATE users.users
            SET role = $2
            WHERE user_snowflake = $1
            RETURNING
                users.user_snowflake,
                users.handle,
                users.role,
                users.banned_at
            ",
        )
        .bind(user_id.as_i64())
        .bind(role.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let user = record.map(User::try_from).transpose()?;
        Ok(user)
    }

    pub async fn set_user_ban(
        &self,
        user_id: Id<UserMarker>,
        banned_at: Option<OffsetDateTime>,
    ) -> Result<Option<User>> {
        let record = query_as::<_, UserRecord>(
            "
            UPDATE users.users
            SET banned_at = $2
            WHERE user_snowflake = $1
            RETURNING
                users.user_snowflake,
                users.handle,
                users.role,
                users.banned_at
            ",
        )
        .bind(user_id.as_i64())
        .bind(banned_at)
        .fetch_optional(&self.pool)
        .await?;

        let user = record.map(User::try_from).transpose()?;
        Ok(user)
    }

    pub async fn fetch_forum(&self, forum_id: Id<ForumMarker>) -> Result<Option<Forum>> {
        let record = query_as::<_, ForumRecord>(
            "
            SELECT
                forums.forum_snowflake,
                forums.title,
                forums.description,
                forums.image_url,
                forums.created_at
            FROM
                forums.forums
            WHERE
                forums.forum_snowflake = $1
            ",
        )
        .bind(forum_id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Forum::from))
    }

    pub async fn list_forums(&self) -> Result<Vec<Forum>> {
        let records = query_as::<_, ForumRecord>(
            "
            SELECT
                forums.forum_snowflake,
                forums.title,
                forums.description,
                forums.image_url,
                forums.created_at
            FROM
                forums.forums
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(Forum::from).collect())
    }

    pub async fn create_forum(&self, forum: &CreateForum) -> Result<Forum> {
        let (forum_id, created_at): (Id<ForumMarker>, _) = self.next_id();

        let record = query_as::<_, ForumRecord>(
            "
            INSERT INTO forums.forums (forum_snowflake, title, description, image_url, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING
                forums.forum_snowflake,
                forums.title,
                forums.description,
                forums.image_url,
                forums.created_at
            ",
        )
        .bind(forum_id.as_i64())
        .bind(&forum.title)
        .bind(&forum.description)
        .bind(&forum.image_url)
        .bind(created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(record.into())
    }

    pub async fn update_forum(
        &self,
        forum_id: Id<ForumMarker>,
        patch: &ForumPatch,
    ) -> Result<Option<Forum>> {
        let record = query_as::<_, ForumRecord>(
            "
            UPDATE forums.forums
            SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                image_url = COALESCE($4, image_url)
            WHERE forum_snowflake = $1
            RETURNING
                forums.forum_snowflake,
                forums.title,
                forums.description,
                forums.image_url,
                forums.created_at
            ",
        )
        .bind(forum_id.as_i64())
        .bind(&patch.title)
        .bind(&patch.description)
        .bind(&patch.image_url)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Forum::from))
    }

    pub async fn delete_forum(&self, forum_id: Id<ForumMarker>) -> Result<bool> {
        let result = query("DELETE FROM forums.forums WHERE forum_snowflake = $1")
            .bind(forum_id.as_i64())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn fetch_thread(&self, thread_id: Id<ThreadMarker>) -> Result<Option<Thread>> {
        let record = query_as::<_, FullThreadRecord>(
            "
            SELECT
                threads.thread_snowflake,
                threads.forum_snowflake,
                threads.title,
                threads.content,
                threads.created_at,
                users.user_snowflake,
                users.handle,
                users.role,
                users.banned_at
            FROM
                forums.threads JOIN users.users USING (user_snowflake)
            WHERE
                threads.thread_snowflake = $1
            ",
        )
        .bind(thread_id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        let thread = record.map(Thread::try_from).transpose()?;
        Ok(thread)
    }

    /// `$1` and `$2` narrow the listing to a forum or an author when set.
    pub async fn list_threads(&self, filter: ThreadFilter) -> Result<Vec<Thread>> {
        let (forum, author) = match filter {
            ThreadFilter::All => (None, None),
            ThreadFilter::Forum(forum) => (Some(forum.as_i64()), None),
            ThreadFilter::Author(author) => (None, Some(author.as_i64())),
        };

        let records = query_as::<_, FullThreadRecord>(
            "
            SELECT
                threads.thread_snowflake,
                threads.forum_snowflake,
                threads.title,
                threads.content,
                threads.created_at,
                users.user_snowflake,
                users.handle,
                users.role,
                users.banned_at
            FROM
                forums.threads JOIN users.users USING (user_snowflake)
            WHERE
                ($1::BIGINT IS NULL OR threads.forum_snowflake = $1)
                AND ($2::BIGINT IS NULL OR threads.user_snowflake = $2)
            ",
        )
        .bind(forum)
        .bind(author)
        .fetch_all(&self.pool)
        .await?;

        threads(records)
    }

    pub async fn create_thread(
        &self,
        author: Id<UserMarker>,
        thread: &CreateThread,
    ) -> Result<Thread> {
        let (thread_id, created_at): (Id<ThreadMarker>, _) = self.next_id();

        let record = query_as::<_, FullThreadRecord>(
            "
            WITH inserted AS (
                INSERT INTO forums.threads
                    (thread_snowflake, forum_snowflake, user_snowflake, title, content, created_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING *
            )
            SELECT
                inserted.thread_snowflake,
                inserted.forum_snowflake,
                inserted.title,
                inserted.content,
                inserted.created_at,
                users.user_snowflake,
                users.handle,
                users.role,
                users.banned_at
            FROM
                inserted JOIN users.users USING (user_snowflake)
            ",
        )
        .bind(thread_id.as_i64())
        .bind(thread.forum.as_i64())
        .bind(author.as_i64())
        .bind(&thread.title)
        .bind(&thread.content)
        .bind(created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(record.try_into()?)
    }

    pub async fn update_thread(
        &self,
        thread_id: Id<ThreadMarker>,
        patch: &ThreadPatch,
    ) -> Result<Option<Thread>> {
        let record = query_as::<_, FullThreadRecord>(
            "
            WITH updated AS (
                UPDATE forums.threads
                SET
                    title = COALESCE($2, title),
                    content = COALESCE($3, content)
                WHERE thread_snowflake = $1
                RETURNING *
            )
            SELECT
                updated.thread_snowflake,
                updated.forum_snowflake,
                updated.title,
                updated.content,
                updated.created_at,
                users.user_snowflake,
                users.handle,
                users.role,
                users.banned_at
            FROM
                updated JOIN users.users USING (user_snowflake)
            ",
        )
        .bind(thread_id.as_i64())
        .bind(&patch.title)
        .bind(&patch.content)
        .fetch_optional(&self.pool)
        .await?;

        let thread = record.map(Thread::try_from).transpose()?;
        Ok(thread)
    }

    pub async fn delete_thread(&self, thread_id: Id<ThreadMarker>) -> Result<bool> {
        let result = query("DELETE FROM forums.threads WHERE thread_snowflake = $1")
            .bind(thread_id.as_i64())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        let record = query_as::<_, FullPostRecord>(
            "
            SELECT
                posts.post_snowflake,
                posts.thread_snowflake,
                posts.parent_snowflake,
                posts.content,
                posts.created_at,
                users.user_snowflake,
                users.handle,
                users.role,
                users.banned_at
            FROM
                forums.posts JOIN users.users USING (user_snowflake)
            WHERE
                posts.post_snowflake = $1
            ",
        )
        .bind(post_id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        let post = record.map(Post::try_from).transpose()?;
        Ok(post)
    }

    pub async fn list_posts(&self) -> Result<Vec<Post>> {
        let records = query_as::<_, FullPostRecord>(
            "
            SELECT
                posts.post_snowflake,
                posts.thread_snowflake,
                posts.parent_snowflake,
                posts.content,
                posts.created_at,
                users.user_snowflake,
                users.handle,
                users.role,
                users.banned_at
            FROM
                forums.posts JOIN users.users USING (user_snowflake)
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        posts(records)
    }

    pub async fn list_posts_by_threads(
        &self,
        thread_ids: &[Id<ThreadMarker>],
    ) -> Result<Vec<Post>> {
        let records = query_as::<_, FullPostRecord>(
            "
            SELECT
                posts.post_snowflake,
                posts.thread_snowflake,
                posts.parent_snowflake,
                posts.content,
                posts.created_at,
                users.user_snowflake,
                users.handle,
                users.role,
                users.banned_at
            FROM
                forums.posts JOIN users.users USING (user_snowflake)
            WHERE
                posts.thread_snowflake = ANY($1)
            ",
        )
        .bind(ids(thread_ids))
        .fetch_all(&self.pool)
        .await?;

        posts(records)
    }

    pub async fn list_posts_by_author(&self, author: Id<UserMarker>) -> Result<Vec<Post>> {
        let records = query_as::<_, FullPostRecord>(
            "
            SELECT
                posts.post_snowflake,
                posts.thread_snowflake,
                posts.parent_snowflake,
                posts.content,
                posts.created_at,
                users.user_snowflake,
                users.handle,
                users.role,
                users.banned_at
            FROM
                forums.posts JOIN users.users USING (user_snowflake)
            WHERE
                posts.user_snowflake = $1
            ",
        )
        .bind(author.as_i64())
        .fetch_all(&self.pool)
        .await?;

        posts(records)
    }

    pub async fn create_post(&self, author: Id<UserMarker>, post: &CreatePost) -> Result<Post> {
        let (post_id, created_at): (Id<PostMarker>, _) = self.next_id();

        let record = query_as::<_, FullPostRecord>(
            "
            WITH inserted AS (
                INSERT INTO forums.posts
                    (post_snowflake, thread_snowflake, parent_snowflake, user_snowflake, content, created_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING *
            )
            SELECT
                inserted.post_snowflake,
                inserted.thread_snowflake,
                inserted.parent_snowflake,
                inserted.content,
                inserted.created_at,
                users.user_snowflake,
                users.handle,
                users.role,
                users.banned_at
            FROM
                inserted JOIN users.users USING (user_snowflake)
            ",
        )
        .bind(post_id.as_i64())
        .bind(post.thread.as_i64())
        .bind(post.parent.map(Id::as_i64))
        .bind(author.as_i64())
        .bind(&post.content)
        .bind(created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(record.try_into()?)
    }

    pub async fn update_post(
        &self,
        post_id: Id<PostMarker>,
        content: &str,
    ) -> Result<Option<Post>> {
        let record = query_as::<_, FullPostRecord>(
            "
            WITH updated AS (
                UPDATE forums.posts
                SET content = $2
                WHERE post_snowflake = $1
                RETURNING *
            )
            SELECT
                updated.post_snowflake,
                updated.thread_snowflake,
                updated.parent_snowflake,
                updated.content,
                updated.created_at,
                users.user_snowflake,
                users.handle,
                users.role,
                users.banned_at
            FROM
                updated JOIN users.users USING (user_snowflake)
            ",
        )
        .bind(post_id.as_i64())
        .bind(content)
        .fetch_optional(&self.pool)
        .await?;

        let post = record.map(Post::try_from).transpose()?;
        Ok(post)
    }

    /// Replies go with their parent through `ON DELETE CASCADE`.
    pub async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<bool> {
        let result = query("DELETE FROM forums.posts WHERE post_snowflake = $1")
            .bind(post_id.as_i64())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn has_like(&self, user_id: Id<UserMarker>, target: LikeTarget) -> Result<bool> {
        let statement = match target {
            LikeTarget::Post(_) => {
                "SELECT EXISTS (SELECT 1 FROM forums.post_likes WHERE user_snowflake = $1 AND post_snowflake = $2)"
            }
            LikeTarget::Thread(_) => {
                "SELECT EXISTS (SELECT 1 FROM forums.thread_likes WHERE user_snowflake = $1 AND thread_snowflake = $2)"
            }
        };

        let (exists,): (bool,) = query_as(statement)
            .bind(user_id.as_i64())
            .bind(target_id(target))
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }

    /// Relies on the primary key of the like tables for uniqueness.
    pub async fn insert_like(&self, user_id: Id<UserMarker>, target: LikeTarget) -> Result<bool> {
        let statement = match target {
            LikeTarget::Post(_) => {
                "INSERT INTO forums.post_likes (user_snowflake, post_snowflake) VALUES ($1, $2) ON CONFLICT DO NOTHING"
            }
            LikeTarget::Thread(_) => {
                "INSERT INTO forums.thread_likes (user_snowflake, thread_snowflake) VALUES ($1, $2) ON CONFLICT DO NOTHING"
            }
        };

        let result = query(statement)
            .bind(user_id.as_i64())
            .bind(target_id(target))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_like(&self, user_id: Id<UserMarker>, target: LikeTarget) -> Result<bool> {
        let statement = match target {
            LikeTarget::Post(_) => {
                "DELETE FROM forums.post_likes WHERE user_snowflake = $1 AND post_snowflake = $2"
            }
            LikeTarget::Thread(_) => {
                "DELETE FROM forums.thread_likes WHERE user_snowflake = $1 AND thread_snowflake = $2"
            }
        };

        let result = query(statement)
            .bind(user_id.as_i64())
            .bind(target_id(target))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn count_post_likes(
        &self,
        post_ids: &[Id<PostMarker>],
    ) -> Result<Vec<(Id<PostMarker>, u64)>> {
        let records = query_as::<_, LikeCountRecord>(
            "
            SELECT
                post_likes.post_snowflake AS target_snowflake,
                COUNT(*) AS like_count
            FROM
                forums.post_likes
            WHERE
                post_likes.post_snowflake = ANY($1)
            GROUP BY
                post_likes.post_snowflake
            ",
        )
        .bind(ids(post_ids))
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(Into::into).collect())
    }

    pub async fn count_thread_likes(
        &self,
        thread_ids: &[Id<ThreadMarker>],
    ) -> Result<Vec<(Id<ThreadMarker>, u64)>> {
        let records = query_as::<_, LikeCountRecord>(
            "
            SELECT
                thread_likes.thread_snowflake AS target_snowflake,
                COUNT(*) AS like_count
            FROM
                forums.thread_likes
            WHERE
                thread_likes.thread_snowflake = ANY($1)
            GROUP BY
                thread_likes.thread_snowflake
            ",
        )
        .bind(ids(thread_ids))
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(Into::into).collect())
    }

    pub async fn list_likers(&self, target: LikeTarget) -> Result<Vec<User>> {
        let statement = match target {
            LikeTarget::Post(_) => {
                "
                SELECT
                    users.user_snowflake,
                    users.handle,
                    users.role,
                    users.banned_at
                FROM
                    forums.post_likes JOIN users.users USING (user_snowflake)
                WHERE
                    post_likes.post_snowflake = $1
                ORDER BY
                    users.user_snowflake
                "
            }
            LikeTarget::Thread(_) => {
                "
                SELECT
                    users.user_snowflake,
                    users.handle,
                    users.role,
                    users.banned_at
                FROM
                    forums.thread_likes JOIN users.users USING (user_snowflake)
                WHERE
                    thread_likes.thread_snowflake = $1
                ORDER BY
                    users.user_snowflake
                "
            }
        };

        let records = query_as::<_, UserRecord>(statement)
            .bind(target_id(target))
            .fetch_all(&self.pool)
            .await?;

        users(records)
    }

    pub async fn insert_notification(
        &self,
        notification: &NewNotification,
    ) -> Result<Notification> {
        let (notification_id, created_at): (Id<NotificationMarker>, _) = self.next_id();

        let record = query_as::<_, NotificationRecord>(
            "
            INSERT INTO users.notifications
                (notification_snowflake, recipient_snowflake, sender_snowflake, message, url, kind, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING
                notifications.notification_snowflake,
                notifications.recipient_snowflake,
                notifications.sender_snowflake,
                notifications.message,
                notifications.url,
                notifications.kind,
                notifications.is_read,
                notifications.created_at
            ",
        )
        .bind(notification_id.as_i64())
        .bind(notification.recipient.as_i64())
        .bind(notification.sender.as_i64())
        .bind(&notification.message)
        .bind(&notification.url)
        .bind(notification.kind.as_str())
        .bind(created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(record.try_into()?)
    }

    pub async fn list_notifications(&self, recipient: Id<UserMarker>) -> Result<Vec<Notification>> {
        let records = query_as::<_, NotificationRecord>(
            "
            SELECT
                notifications.notification_snowflake,
                notifications.recipient_snowflake,
                notifications.sender_snowflake,
                notifications.message,
                notifications.url,
                notifications.kind,
                notifications.is_read,
                notifications.created_at
            FROM
                users.notifications
            WHERE
                notifications.recipient_snowflake = $1
            ",
        )
        .bind(recipient.as_i64())
        .fetch_all(&self.pool)
        .await?;

        Ok(records
            .into_iter()
            .map(Notification::try_from)
            .collect::<Result<_, _>>()?)
    }

    pub async fn fetch_notification(
        &self,
        notification_id: Id<NotificationMarker>,
    ) -> Result<Option<Notification>> {
        let record = query_as::<_, NotificationRecord>(
            "
            SELECT
                notifications.notification_snowflake,
                notifications.recipient_snowflake,
                notifications.sender_snowflake,
                notifications.message,
                notifications.url,
                notifications.kind,
                notifications.is_read,
                notifications.created_at
            FROM
                users.notifications
            WHERE
                notifications.notification_snowflake = $1
            ",
        )
        .bind(notification_id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        let notification = record.map(Notification::try_from).transpose()?;
        Ok(notification)
    }

    pub async fn mark_notification_read(
        &self,
        notification_id: Id<NotificationMarker>,
    ) -> Result<bool> {
        let result =
            query("UPDATE users.notifications SET is_read = TRUE WHERE notification_snowflake = $1")
                .bind(notification_id.as_i64())
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_notification(
        &self,
        notification_id: Id<NotificationMarker>,
    ) -> Result<bool> {
        let result = query("DELETE FROM users.notifications WHERE notification_snowflake = $1")
            .bind(notification_id.as_i64())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn insert_authentication(&self, authentication: &Authentication) -> Result<()> {
        query(
            "
            INSERT INTO users.authentications
                (token_hash, user_snowflake, created_at, expires_after_seconds)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(authentication.token_hash.0.as_slice())
        .bind(authentication.user.as_i64())
        .bind(authentication.created_at)
        .bind(authentication.expires_after.map(PositiveDuration::whole_seconds))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn fetch_authentication(
        &self,
        hash: &AuthTokenHash,
    ) -> Result<Option<Authentication>> {
        let record = query_as::<_, AuthenticationRecord>(
            "
            SELECT
                authentications.user_snowflake,
                authentications.token_hash,
                authentications.created_at,
                authentications.expires_after_seconds
            FROM
                users.authentications
            WHERE
                authentications.token_hash = $1
            ",
        )
        .bind(hash.0.as_slice())
        .fetch_optional(&self.pool)
        .await?;

        let authentication = record.map(Authentication::try_from).transpose()?;
        Ok(authentication)
    }
}

fn target_id(target: LikeTarget) -> i64 {
    match target {
        LikeTarget::Post(id) => id.as_i64(),
        LikeTarget::Thread(id) => id.as_i64(),
    }
}

#[async_trait]
impl ContentStore for DbClient {
    async fn fetch_user(&self, id: Id<UserMarker>) -> store::Result<Option<User>> {
        Ok(DbClient::fetch_user(self, id).await?)
    }

    async fn fetch_user_by_handle(&self, handle: &str) -> store::Result<Option<User>> {
        Ok(DbClient::fetch_user_by_handle(self, handle).await?)
    }

    async fn list_users(&self) -> store::Result<Vec<User>> {
        Ok(DbClient::list_users(self).await?)
    }

    async fn create_user(&self, user: &CreateUser) -> store::Result<User> {
        Ok(DbClient::create_user(self, user).await?)
    }

    async fn set_user_role(&self, id: Id<UserMarker>, role: Role) -> store::Result<Option<User>> {
        Ok(DbClient::set_user_role(self, id, role).await?)
    }

    async fn set_user_ban(
        &self,
        id: Id<UserMarker>,
        banned_at: Option<OffsetDateTime>,
    ) -> store::Result<Option<User>> {
        Ok(DbClient::set_user_ban(self, id, banned_at).await?)
    }

    async fn fetch_forum(&self, id: Id<ForumMarker>) -> store::Result<Option<Forum>> {
        Ok(DbClient::fetch_forum(self, id).await?)
    }

    async fn list_forums(&self) -> store::Result<Vec<Forum>> {
        Ok(DbClient::list_forums(self).await?)
    }

    async fn create_forum(&self, forum: &CreateForum) -> store::Result<Forum> {
        Ok(DbClient::create_forum(self, forum).await?)
    }

    async fn update_forum(
        &self,
        id: Id<ForumMarker>,
        patch: &ForumPatch,
    ) -> store::Result<Option<Forum>> {
        Ok(DbClient::update_forum(self, id, patch).await?)
    }

    async fn delete_forum(&self, id: Id<ForumMarker>) -> store::Result<bool> {
        Ok(DbClient::delete_forum(self, id).await?)
    }

    async fn fetch_thread(&self, id: Id<ThreadMarker>) -> store::Result<Option<Thread>> {
        Ok(DbClient::fetch_thread(self, id).await?)
    }

    async fn list_threads(&self, filter: ThreadFilter) -> store::Result<Vec<Thread>> {
        Ok(DbClient::list_threads(self, filter).await?)
    }

    async fn create_thread(
        &self,
        author: Id<UserMarker>,
        thread: &CreateThread,
    ) -> store::Result<Thread> {
        Ok(DbClient::create_thread(self, author, thread).await?)
    }

    async fn update_thread(
        &self,
        id: Id<ThreadMarker>,
        patch: &ThreadPatch,
    ) -> store::Result<Option<Thread>> {
        Ok(DbClient::update_thread(self, id, patch).await?)
    }

    async fn delete_thread(&self, id: Id<ThreadMarker>) -> store::Result<bool> {
        Ok(DbClient::delete_thread(self, id).await?)
    }

    async fn fetch_post(&self, id: Id<PostMarker>) -> store::Result<Option<Post>> {
        Ok(DbClient::fetch_post(self, id).await?)
    }

    async fn list_posts(&self) -> store::Result<Vec<Post>> {
        Ok(DbClient::list_posts(self).await?)
    }

    async fn list_posts_by_threads(
        &self,
        threads: &[Id<ThreadMarker>],
    ) -> store::Result<Vec<Post>> {
        Ok(DbClient::list_posts_by_threads(self, threads).await?)
    }

    async fn list_posts_by_author(&self, author: Id<UserMarker>) -> store::Result<Vec<Post>> {
        Ok(DbClient::list_posts_by_author(self, author).await?)
    }

    async fn create_post(&self, author: Id<UserMarker>, post: &CreatePost) -> store::Result<Post> {
        Ok(DbClient::create_post(self, author, post).await?)
    }

    async fn update_post(&self, id: Id<PostMarker>, content: &str) -> store::Result<Option<Post>> {
        Ok(DbClient::update_post(self, id, content).await?)
    }

    async fn delete_post(&self, id: Id<PostMarker>) -> store::Result<bool> {
        Ok(DbClient::delete_post(self, id).await?)
    }

    async fn has_like(&self, user: Id<UserMarker>, target: LikeTarget) -> store::Result<bool> {
        Ok(DbClient::has_like(self, user, target).await?)
    }

    async fn insert_like(&self, user: Id<UserMarker>, target: LikeTarget) -> store::Result<bool> {
        Ok(DbClient::insert_like(self, user, target).await?)
    }

    async fn delete_like(&self, user: Id<UserMarker>, target: LikeTarget) -> store::Result<bool> {
        Ok(DbClient::delete_like(self, user, target).await?)
    }

    async fn count_post_likes(
        &self,
        posts: &[Id<PostMarker>],
    ) -> store::Result<Vec<(Id<PostMarker>, u64)>> {
        Ok(DbClient::count_post_likes(self, posts).await?)
    }

    async fn count_thread_likes(
        &self,
        threads: &[Id<ThreadMarker>],
    ) -> store::Result<Vec<(Id<ThreadMarker>, u64)>> {
        Ok(DbClient::count_thread_likes(self, threads).await?)
    }

    async fn list_likers(&self, target: LikeTarget) -> store::Result<Vec<User>> {
        Ok(DbClient::list_likers(self, target).await?)
    }

    async fn insert_notification(
        &self,
        notification: &NewNotification,
    ) -> store::Result<Notification> {
        Ok(DbClient::insert_notification(self, notification).await?)
    }

    async fn list_notifications(
        &self,
        recipient: Id<UserMarker>,
    ) -> store::Result<Vec<Notification>> {
        Ok(DbClient::list_notifications(self, recipient).await?)
    }

    async fn fetch_notification(
        &self,
        id: Id<NotificationMarker>,
    ) -> store::Result<Option<Notification>> {
        Ok(DbClient::fetch_notification(self, id).await?)
    }

    async fn mark_notification_read(&self, id: Id<NotificationMarker>) -> store::Result<bool> {
        Ok(DbClient::mark_notification_read(self, id).await?)
    }

    async fn delete_notification(&self, id: Id<NotificationMarker>) -> store::Result<bool> {
        Ok(DbClient::delete_notification(self, id).await?)
    }

    async fn insert_authentication(&self, authentication: &Authentication) -> store::Result<()> {
        Ok(DbClient::insert_authentication(self, authentication).await?)
    }

    async fn fetch_authentication(
        &self,
        hash: &AuthTokenHash,
    ) -> store::Result<Option<Authentication>> {
        Ok(DbClient::fetch_authentication(self, hash).await?)
    }
}

#[cfg(test)]
mod tests {
    use crate::client::ids;
    use forumwerk_common::model::{Id, post::PostMarker};

    #[test]
    fn id_batches_bind_as_bigints() {
        struct BareMarker;

        let posts = [Id::<PostMarker>::from(1), Id::from(u64::MAX)];
        assert_eq!(ids(&posts), vec![1, -1]);

        let bare = [Id::<BareMarker>::from(3)];
        assert_eq!(ids(&bare), vec![3]);
    }
}
