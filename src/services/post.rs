use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::{
    CreatePostRequest, Post, PostId, PostQuery, PostResponse, PostWithMeta, SortBy, StorageId,
    ToggleLikeResponse, UserId, UserStats,
};
use crate::services::UserService;
use crate::storage::StorageProvider;

const MAX_CAPTION_CHARS: usize = 500;

/// Post service
pub struct PostService;

impl PostService {
    /// Get post by ID
    pub async fn get_post(db: &Database, post_id: &PostId) -> Result<Post> {
        let post: Post = sqlx::query_as("SELECT * FROM posts WHERE id = ?")
            .bind(post_id)
            .fetch_optional(db.pool())
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

        Ok(post)
    }

    /// Create a post for an uploaded blob (optionally with a live-photo
    /// companion video). The author must have synced a profile first.
    pub async fn create_post(
        db: &Database,
        external_id: &str,
        req: CreatePostRequest,
    ) -> Result<PostResponse> {
        let author = UserService::get_by_external_id(db, external_id).await?;

        let caption = match req.caption.map(|c| c.trim().to_string()) {
            Some(c) if !c.is_empty() => {
                if c.chars().count() > MAX_CAPTION_CHARS {
                    return Err(AppError::BadRequest(format!(
                        "Caption must be at most {} characters",
                        MAX_CAPTION_CHARS
                    )));
                }
                Some(c)
            }
            _ => None,
        };

        Self::ensure_blob_exists(db, &req.storage_id).await?;
        if let Some(companion) = &req.live_photo_video_id {
            Self::ensure_blob_exists(db, companion).await?;
        }

        let id = PostId::generate();
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO posts (
                id, author_id, author_name, storage_id, live_photo_video_id,
                media_type, caption, width, height, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&author.id)
        .bind(&author.name)
        .bind(&req.storage_id)
        .bind(&req.live_photo_video_id)
        .bind(req.media_type.as_str())
        .bind(&caption)
        .bind(req.width.map(|w| w as i64))
        .bind(req.height.map(|h| h as i64))
        .bind(&now)
        .execute(db.pool())
        .await?;

        let post = Self::get_post(db, &id).await?;
        let viewer = author.id.clone();
        Ok(PostResponse::from_meta(
            PostWithMeta {
                post,
                like_count: 0,
                liked_by_me: false,
            },
            Some(&viewer),
        ))
    }

    /// List the feed with like counts and viewer flags. Search is a
    /// case-insensitive substring match on the author name; `most_liked`
    /// breaks ties newest-first.
    pub async fn list_posts(
        db: &Database,
        viewer: Option<&UserId>,
        query: &PostQuery,
    ) -> Result<Vec<PostResponse>> {
        let term = query.search.as_deref().unwrap_or("").trim().to_string();

        let base = r#"
            SELECT p.*,
                   (SELECT COUNT(*) FROM likes l WHERE l.post_id = p.id) AS like_count,
                   EXISTS(
                       SELECT 1 FROM likes l WHERE l.post_id = p.id AND l.user_id = ?
                   ) AS liked_by_me
            FROM posts p
            WHERE (? = '' OR instr(lower(p.author_name), lower(?)) > 0)
        "#;
        let sql = match query.sort_by {
            SortBy::Newest => format!("{} ORDER BY p.created_at DESC", base),
            SortBy::MostLiked => format!("{} ORDER BY like_count DESC, p.created_at DESC", base),
        };

        let rows: Vec<PostWithMeta> = sqlx::query_as(&sql)
            .bind(viewer.map(|v| v.as_str()))
            .bind(&term)
            .bind(&term)
            .fetch_all(db.pool())
            .await?;

        Ok(rows
            .into_iter()
            .map(|meta| PostResponse::from_meta(meta, viewer))
            .collect())
    }

    /// Toggle the viewer's like on a post. Atomic delete-or-insert on the
    /// (user, post) unique key, so concurrent toggles converge.
    pub async fn toggle_like(
        db: &Database,
        external_id: &str,
        post_id: &PostId,
    ) -> Result<ToggleLikeResponse> {
        let user = UserService::get_by_external_id(db, external_id).await?;
        // Fail on unknown posts before touching the likes table
        let post = Self::get_post(db, post_id).await?;

        let mut tx = db.pool().begin().await?;

        let deleted = sqlx::query("DELETE FROM likes WHERE user_id = ? AND post_id = ?")
            .bind(&user.id)
            .bind(&post.id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let liked = if deleted == 0 {
            sqlx::query(
                r#"
                INSERT INTO likes (id, user_id, post_id, created_at)
                VALUES (?, ?, ?, ?)
                ON CONFLICT(user_id, post_id) DO NOTHING
                "#,
            )
            .bind(uuid::Uuid::new_v4().to_string())
            .bind(&user.id)
            .bind(&post.id)
            .bind(chrono::Utc::now().to_rfc3339())
            .execute(&mut *tx)
            .await?;
            true
        } else {
            false
        };

        tx.commit().await?;

        let (like_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM likes WHERE post_id = ?")
            .bind(&post.id)
            .fetch_one(db.pool())
            .await?;

        Ok(ToggleLikeResponse { liked, like_count })
    }

    /// Delete a post. Author only; removes its likes and cleans up the
    /// stored blobs best-effort.
    pub async fn delete_post(
        db: &Database,
        storage: &dyn StorageProvider,
        external_id: &str,
        post_id: &PostId,
    ) -> Result<()> {
        let user = UserService::get_by_external_id(db, external_id).await?;
        let post = Self::get_post(db, post_id).await?;

        if post.author_id != user.id {
            return Err(AppError::Forbidden(
                "Only the author can delete a post".to_string(),
            ));
        }

        sqlx::query("DELETE FROM likes WHERE post_id = ?")
            .bind(&post.id)
            .execute(db.pool())
            .await?;
        sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(&post.id)
            .execute(db.pool())
            .await?;

        let mut blobs = vec![post.storage_id.clone()];
        if let Some(companion) = &post.live_photo_video_id {
            blobs.push(companion.clone());
        }
        for storage_id in blobs {
            if let Err(e) = storage.delete(storage_id.as_str()).await {
                tracing::warn!("Failed to delete blob {}: {}", storage_id, e);
            }
            sqlx::query("DELETE FROM media_blobs WHERE storage_id = ?")
                .bind(&storage_id)
                .execute(db.pool())
                .await?;
        }

        Ok(())
    }

    /// The viewer's posts, newest first, annotated like the feed
    pub async fn list_user_posts(db: &Database, external_id: &str) -> Result<Vec<PostResponse>> {
        let user = UserService::get_by_external_id(db, external_id).await?;

        let rows: Vec<PostWithMeta> = sqlx::query_as(
            r#"
            SELECT p.*,
                   (SELECT COUNT(*) FROM likes l WHERE l.post_id = p.id) AS like_count,
                   EXISTS(
                       SELECT 1 FROM likes l WHERE l.post_id = p.id AND l.user_id = ?
                   ) AS liked_by_me
            FROM posts p
            WHERE p.author_id = ?
            ORDER BY p.created_at DESC
            "#,
        )
        .bind(&user.id)
        .bind(&user.id)
        .fetch_all(db.pool())
        .await?;

        let viewer = user.id;
        Ok(rows
            .into_iter()
            .map(|meta| PostResponse::from_meta(meta, Some(&viewer)))
            .collect())
    }

    /// Post count and total likes received across the viewer's posts
    pub async fn user_stats(db: &Database, external_id: &str) -> Result<UserStats> {
        let user = UserService::get_by_external_id(db, external_id).await?;

        let (post_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM posts WHERE author_id = ?")
            .bind(&user.id)
            .fetch_one(db.pool())
            .await?;

        let (likes_received,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM likes l
            JOIN posts p ON l.post_id = p.id
            WHERE p.author_id = ?
            "#,
        )
        .bind(&user.id)
        .fetch_one(db.pool())
        .await?;

        Ok(UserStats {
            post_count,
            likes_received,
        })
    }

    async fn ensure_blob_exists(db: &Database, storage_id: &StorageId) -> Result<()> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM media_blobs WHERE storage_id = ?")
            .bind(storage_id)
            .fetch_optional(db.pool())
            .await?;

        if row.is_none() {
            return Err(AppError::BadRequest(format!(
                "Unknown storage id: {}",
                storage_id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MediaKind;
    use crate::storage::LocalStorage;

    async fn seed_user(db: &Database, external_id: &str, name: &str) {
        UserService::sync_profile(db, external_id, Some(name.to_string()), None)
            .await
            .unwrap();
    }

    async fn seed_blob(db: &Database) -> StorageId {
        let storage_id = StorageId::generate();
        sqlx::query(
            "INSERT INTO media_blobs (storage_id, content_type, size, created_at) VALUES (?, ?, 1, ?)",
        )
        .bind(&storage_id)
        .bind("image/jpeg")
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(db.pool())
        .await
        .unwrap();
        storage_id
    }

    async fn seed_post(db: &Database, external_id: &str) -> PostResponse {
        let storage_id = seed_blob(db).await;
        PostService::create_post(
            db,
            external_id,
            CreatePostRequest {
                storage_id,
                live_photo_video_id: None,
                caption: None,
                media_type: MediaKind::Image,
                width: None,
                height: None,
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn create_post_requires_a_synced_profile() {
        let db = Database::new_in_memory().await.unwrap();
        let storage_id = seed_blob(&db).await;

        let result = PostService::create_post(
            &db,
            "never-synced",
            CreatePostRequest {
                storage_id,
                live_photo_video_id: None,
                caption: None,
                media_type: MediaKind::Image,
                width: None,
                height: None,
            },
        )
        .await;

        match result {
            Err(AppError::NotFound(_)) => {}
            other => panic!("expected NotFound, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn create_post_rejects_unknown_storage_ids() {
        let db = Database::new_in_memory().await.unwrap();
        seed_user(&db, "guest-1", "Ala").await;

        let result = PostService::create_post(
            &db,
            "guest-1",
            CreatePostRequest {
                storage_id: StorageId::generate(),
                live_photo_video_id: None,
                caption: None,
                media_type: MediaKind::Image,
                width: None,
                height: None,
            },
        )
        .await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn create_post_keeps_the_companion_reference() {
        let db = Database::new_in_memory().await.unwrap();
        seed_user(&db, "guest-1", "Ala").await;
        let image = seed_blob(&db).await;
        let video = seed_blob(&db).await;

        let post = PostService::create_post(
            &db,
            "guest-1",
            CreatePostRequest {
                storage_id: image,
                live_photo_video_id: Some(video.clone()),
                caption: Some("first dance".to_string()),
                media_type: MediaKind::Image,
                width: Some(1920),
                height: Some(1080),
            },
        )
        .await
        .unwrap();

        assert_eq!(
            post.live_photo_video_url.as_deref(),
            Some(format!("/api/v1/media/{}", video).as_str())
        );
        assert_eq!(post.caption.as_deref(), Some("first dance"));
        assert_eq!(post.width, Some(1920));
        assert!(post.is_mine);
    }

    #[tokio::test]
    async fn toggle_like_twice_returns_to_the_original_state() {
        let db = Database::new_in_memory().await.unwrap();
        seed_user(&db, "author", "Ala").await;
        seed_user(&db, "fan", "Bob").await;
        let post = seed_post(&db, "author").await;

        let on = PostService::toggle_like(&db, "fan", &post.id).await.unwrap();
        assert!(on.liked);
        assert_eq!(on.like_count, 1);

        let off = PostService::toggle_like(&db, "fan", &post.id).await.unwrap();
        assert!(!off.liked);
        assert_eq!(off.like_count, 0);
    }

    #[tokio::test]
    async fn toggle_like_fails_on_unknown_posts() {
        let db = Database::new_in_memory().await.unwrap();
        seed_user(&db, "fan", "Bob").await;

        let result = PostService::toggle_like(&db, "fan", &PostId::generate()).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn feed_flags_follow_the_viewer() {
        let db = Database::new_in_memory().await.unwrap();
        seed_user(&db, "author", "Ala").await;
        seed_user(&db, "fan", "Bob").await;
        let post = seed_post(&db, "author").await;
        PostService::toggle_like(&db, "fan", &post.id).await.unwrap();

        let fan = UserService::get_by_external_id(&db, "fan").await.unwrap();
        let feed = PostService::list_posts(&db, Some(&fan.id), &PostQuery::default())
            .await
            .unwrap();
        assert_eq!(feed.len(), 1);
        assert!(feed[0].liked_by_me);
        assert!(!feed[0].is_mine);
        assert_eq!(feed[0].like_count, 1);

        let author = UserService::get_by_external_id(&db, "author").await.unwrap();
        let feed = PostService::list_posts(&db, Some(&author.id), &PostQuery::default())
            .await
            .unwrap();
        assert!(feed[0].is_mine);
        assert!(!feed[0].liked_by_me);
    }

    #[tokio::test]
    async fn search_matches_author_names_case_insensitively() {
        let db = Database::new_in_memory().await.unwrap();
        for (external_id, name) in [("u1", "Ala"), ("u2", "Bob"), ("u3", "alicia")] {
            seed_user(&db, external_id, name).await;
            seed_post(&db, external_id).await;
        }

        let query = PostQuery {
            sort_by: SortBy::Newest,
            search: Some("al".to_string()),
        };
        let feed = PostService::list_posts(&db, None, &query).await.unwrap();

        let mut names: Vec<_> = feed.iter().map(|p| p.author_name.as_str()).collect();
        names.sort_unstable();
        assert_eq!(names, vec!["Ala", "alicia"]);
    }

    #[tokio::test]
    async fn most_liked_orders_by_count_then_recency() {
        let db = Database::new_in_memory().await.unwrap();
        for (external_id, name) in [("u1", "Ala"), ("u2", "Bob"), ("u3", "Cid")] {
            seed_user(&db, external_id, name).await;
        }
        seed_user(&db, "author", "Host").await;

        // Like counts 3, 1, 2 in creation order
        let p1 = seed_post(&db, "author").await;
        let p2 = seed_post(&db, "author").await;
        let p3 = seed_post(&db, "author").await;
        for fan in ["u1", "u2", "u3"] {
            PostService::toggle_like(&db, fan, &p1.id).await.unwrap();
        }
        PostService::toggle_like(&db, "u1", &p2.id).await.unwrap();
        for fan in ["u1", "u2"] {
            PostService::toggle_like(&db, fan, &p3.id).await.unwrap();
        }

        let query = PostQuery {
            sort_by: SortBy::MostLiked,
            search: None,
        };
        let feed = PostService::list_posts(&db, None, &query).await.unwrap();

        let counts: Vec<_> = feed.iter().map(|p| p.like_count).collect();
        assert_eq!(counts, vec![3, 2, 1]);
        assert_eq!(feed[0].id, p1.id);
        assert_eq!(feed[1].id, p3.id);
        assert_eq!(feed[2].id, p2.id);
    }

    #[tokio::test]
    async fn most_liked_ties_break_newest_first() {
        let db = Database::new_in_memory().await.unwrap();
        seed_user(&db, "author", "Host").await;
        let older = seed_post(&db, "author").await;
        let newer = seed_post(&db, "author").await;

        let query = PostQuery {
            sort_by: SortBy::MostLiked,
            search: None,
        };
        let feed = PostService::list_posts(&db, None, &query).await.unwrap();
        assert_eq!(feed[0].id, newer.id);
        assert_eq!(feed[1].id, older.id);
    }

    #[tokio::test]
    async fn delete_post_is_author_only_and_cascades_likes() {
        let db = Database::new_in_memory().await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().to_str().unwrap());
        seed_user(&db, "author", "Ala").await;
        seed_user(&db, "fan", "Bob").await;
        let post = seed_post(&db, "author").await;
        PostService::toggle_like(&db, "fan", &post.id).await.unwrap();

        let denied = PostService::delete_post(&db, &storage, "fan", &post.id).await;
        assert!(matches!(denied, Err(AppError::Forbidden(_))));

        PostService::delete_post(&db, &storage, "author", &post.id)
            .await
            .unwrap();

        assert!(matches!(
            PostService::get_post(&db, &post.id).await,
            Err(AppError::NotFound(_))
        ));
        let (orphans,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM likes WHERE post_id = ?")
            .bind(&post.id)
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[tokio::test]
    async fn stats_count_posts_and_likes_received() {
        let db = Database::new_in_memory().await.unwrap();
        seed_user(&db, "author", "Ala").await;
        seed_user(&db, "fan", "Bob").await;
        let p1 = seed_post(&db, "author").await;
        let p2 = seed_post(&db, "author").await;
        PostService::toggle_like(&db, "fan", &p1.id).await.unwrap();
        PostService::toggle_like(&db, "fan", &p2.id).await.unwrap();
        PostService::toggle_like(&db, "author", &p2.id).await.unwrap();

        let stats = PostService::user_stats(&db, "author").await.unwrap();
        assert_eq!(stats.post_count, 2);
        assert_eq!(stats.likes_received, 3);

        let stats = PostService::user_stats(&db, "fan").await.unwrap();
        assert_eq!(stats.post_count, 0);
        assert_eq!(stats.likes_received, 0);
    }
}
