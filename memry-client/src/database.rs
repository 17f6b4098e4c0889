use crate::domain::lecture::{from_json, to_json};
use crate::domain::Lecture;
use eyre::Result;
use futures_util::TryStreamExt;
use memry_common::api::CloudFilter;
use serde_json::Value;
use sql_builder::{quote, SqlBuilder};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{FromRow, Row, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

pub struct DbLecture(pub Lecture);

fn decode_err(column: &str, err: impl ToString) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: column.into(),
        source: err.to_string().into(),
    }
}

fn parse_uuid(column: &str, raw: &str) -> sqlx::Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| decode_err(column, e))
}

impl<'r> FromRow<'r, SqliteRow> for DbLecture {
    fn from_row(row: &'r SqliteRow) -> sqlx::Result<Self> {
        let id: &str = row.try_get("id")?;
        let user_id: Option<&str> = row.try_get("user_id")?;
        let category: String = row.try_get("category")?;
        let segments: String = row.try_get("segments")?;
        let flashcards: String = row.try_get("flashcards")?;
        let quiz: String = row.try_get("quiz")?;
        let journey_map: String = row.try_get("journey_map")?;
        let chat_history: String = row.try_get("chat_history")?;

        Ok(Self(Lecture {
            id: parse_uuid("id", id)?,
            user_id: user_id.map(|x| parse_uuid("user_id", x)).transpose()?,
            title: row.try_get("title")?,
            duration: row.try_get("duration")?,
            category_tags: category
                .split(crate::domain::lecture::CATEGORY_DELIMITER)
                .filter(|x| !x.is_empty())
                .map(|x| x.to_string())
                .collect(),
            is_favorite: row.try_get("is_favorite")?,
            transcript_text: row.try_get("transcript")?,
            segments: from_json(&segments).map_err(|e| decode_err("segments", e))?,
            summary: row.try_get("summary")?,
            flashcards: from_json(&flashcards).map_err(|e| decode_err("flashcards", e))?,
            quiz: from_json(&quiz).map_err(|e| decode_err("quiz", e))?,
            notes: row.try_get("notes")?,
            concept_graph: from_json(&journey_map).map_err(|e| decode_err("journey_map", e))?,
            chat_history: from_json(&chat_history).map_err(|e| decode_err("chat_history", e))?,
            audio_url: row.try_get("audio_url")?,
            local_audio_path: row.try_get("local_audio_path")?,
            created_at: row
                .try_get("created_at")
                .map(|x: i64| OffsetDateTime::from_unix_timestamp(x))?
                .map_err(|e| decode_err("created_at", e))?,
            updated_at: row
                .try_get("updated_at")
                .map(|x: i64| OffsetDateTime::from_unix_timestamp_nanos(x as i128))?
                .map_err(|e| decode_err("updated_at", e))?,
        }))
    }
}

pub struct DbFilter(pub CloudFilter);

impl<'r> FromRow<'r, SqliteRow> for DbFilter {
    fn from_row(row: &'r SqliteRow) -> sqlx::Result<Self> {
        let id: &str = row.try_get("id")?;
        let user_id: &str = row.try_get("user_id")?;
        Ok(Self(CloudFilter {
            id: parse_uuid("id", id)?,
            user_id: parse_uuid("user_id", user_id)?,
            name: row.try_get("name")?,
            position: row.try_get("position")?,
            created_at: row
                .try_get("created_at")
                .map(|x: i64| OffsetDateTime::from_unix_timestamp(x))?
                .map_err(|e| decode_err("created_at", e))?,
        }))
    }
}

pub struct Database {
    pub pool: SqlitePool,
}

impl Database {
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("opening database at {:?}", path);
        if !path.exists() {
            if let Some(dir) = path.parent() {
                fs_err::create_dir_all(dir)?;
            }
        }
        let options =
            SqliteConnectOptions::from_str(path.to_str().unwrap())?.create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;

        Self::setup_db(&pool).await?;

        Ok(Self { pool })
    }

    async fn setup_db(pool: &SqlitePool) -> Result<()> {
        debug!("setting up database");
        sqlx::migrate!("./migrations").run(pool).await?;

        Ok(())
    }

    async fn save_raw(tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>, v: &Lecture) -> Result<()> {
        sqlx::query(
            r#"
            insert into lectures(
                id, user_id, title, duration, category, is_favorite, transcript, segments,
                summary, flashcards, quiz, notes, journey_map, chat_history, audio_url,
                local_audio_path, created_at, updated_at
            ) values(
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18
            )
            on conflict(id) do update set
                user_id = ?2,
                title = ?3,
                duration = ?4,
                category = ?5,
                is_favorite = ?6,
                transcript = ?7,
                segments = ?8,
                summary = ?9,
                flashcards = ?10,
                quiz = ?11,
                notes = ?12,
                journey_map = ?13,
                chat_history = ?14,
                audio_url = ?15,
                local_audio_path = ?16,
                created_at = ?17,
                updated_at = ?18
            "#,
        )
        .bind(v.id.to_string())
        .bind(v.user_id.map(|x| x.to_string()))
        .bind(v.title.as_str())
        .bind(v.duration)
        .bind(v.category_tags.join(crate::domain::lecture::CATEGORY_DELIMITER))
        .bind(v.is_favorite)
        .bind(v.transcript_text.as_str())
        .bind(to_json(&v.segments)?)
        .bind(v.summary.as_str())
        .bind(to_json(&v.flashcards)?)
        .bind(to_json(&v.quiz)?)
        .bind(v.notes.as_str())
        .bind(to_json(&v.concept_graph)?)
        .bind(to_json(&v.chat_history)?)
        .bind(v.audio_url.to_owned())
        .bind(v.local_audio_path.to_owned())
        .bind(v.created_at.unix_timestamp())
        .bind(v.updated_at.unix_timestamp_nanos() as i64)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    pub async fn save(&self, item: &Lecture) -> Result<()> {
        debug!("saving lecture to database");
        let mut tx = self.pool.begin().await?;
        Self::save_raw(&mut tx, item).await?;
        tx.commit().await?;

        Ok(())
    }

    pub async fn save_bulk(&self, items: &[Lecture]) -> Result<()> {
        debug!("saving lectures in bulk to database");
        let mut tx = self.pool.begin().await?;
        for el in items {
            Self::save_raw(&mut tx, el).await?;
        }
        tx.commit().await?;

        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Lecture>> {
        let res = sqlx::query_as("select * from lectures where id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .map(|DbLecture(lecture)| lecture);

        Ok(res)
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        sqlx::query("delete from lectures where id = ?1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn list(
        &self,
        user_id: Uuid,
        category: Option<&str>,
        search: &str,
    ) -> Result<Vec<Lecture>> {
        let mut query = SqlBuilder::select_from("lectures");
        query.field("*").order_desc("updated_at");
        query.and_where_eq("user_id", quote(user_id.to_string()));

        if let Some(category) = category {
            query.and_where_like_any("category", category);
        }

        if !search.is_empty() {
            query.and_where_like_any("title", search);
        }

        let query = query.sql().expect("Failed to parse query");
        let res = sqlx::query_as(&query)
            .fetch(&self.pool)
            .map_ok(|DbLecture(lecture)| lecture)
            .try_collect()
            .await?;

        Ok(res)
    }

    /// Lectures of this user changed after the cursor. Push candidates.
    pub async fn after(&self, user_id: Uuid, timestamp: OffsetDateTime) -> Result<Vec<Lecture>> {
        debug!("query lectures updated after cursor");
        let res = sqlx::query_as("select * from lectures where user_id = ?1 and updated_at > ?2")
            .bind(user_id.to_string())
            .bind(timestamp.unix_timestamp_nanos() as i64)
            .fetch(&self.pool)
            .map_ok(|DbLecture(lecture)| lecture)
            .try_collect()
            .await?;

        Ok(res)
    }

    /// Rows written before accounts existed carry no owner. Adopting them
    /// into the signed-in user is the one-time legacy migration; once
    /// adopted they stop matching, so re-running is a no-op.
    pub async fn adopt_legacy(&self, user_id: Uuid) -> Result<u64> {
        let res = sqlx::query("update lectures set user_id = ?1 where user_id is null")
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(res.rows_affected())
    }

    pub async fn save_filters(&self, user_id: Uuid, filters: &[CloudFilter]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("delete from filters where user_id = ?1")
            .bind(user_id.to_string())
            .execute(&mut *tx)
            .await?;
        for f in filters {
            sqlx::query(
                "insert into filters(id, user_id, name, position, created_at)
                 values(?1, ?2, ?3, ?4, ?5)",
            )
            .bind(f.id.to_string())
            .bind(f.user_id.to_string())
            .bind(f.name.as_str())
            .bind(f.position)
            .bind(f.created_at.unix_timestamp())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Ok(())
    }

    pub async fn list_filters(&self, user_id: Uuid) -> Result<Vec<CloudFilter>> {
        let res = sqlx::query_as("select * from filters where user_id = ?1 order by position")
            .bind(user_id.to_string())
            .fetch(&self.pool)
            .map_ok(|DbFilter(filter)| filter)
            .try_collect()
            .await?;

        Ok(res)
    }

    pub async fn set_preferences(&self, user_id: Uuid, data: &Value) -> Result<()> {
        sqlx::query(
            "insert into preferences(user_id, data, updated_at) values(?1, ?2, ?3)
             on conflict(user_id) do update set data = ?2, updated_at = ?3",
        )
        .bind(user_id.to_string())
        .bind(serde_json::to_string(data)?)
        .bind(OffsetDateTime::now_utc().unix_timestamp())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn preferences(&self, user_id: Uuid) -> Result<Option<Value>> {
        let raw: Option<(String,)> =
            sqlx::query_as("select data from preferences where user_id = ?1")
                .bind(user_id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        Ok(raw.map(|(x,)| serde_json::from_str(&x)).transpose()?)
    }

    pub async fn last_sync(&self, user_id: Uuid) -> Result<OffsetDateTime> {
        let raw: Option<(i64,)> =
            sqlx::query_as("select last_sync_at from sync_state where user_id = ?1")
                .bind(user_id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        match raw {
            Some((ns,)) => Ok(OffsetDateTime::from_unix_timestamp_nanos(ns as i128)?),
            None => Ok(OffsetDateTime::UNIX_EPOCH),
        }
    }

    pub async fn save_last_sync(&self, user_id: Uuid, at: OffsetDateTime) -> Result<()> {
        sqlx::query(
            "insert into sync_state(user_id, last_sync_at) values(?1, ?2)
             on conflict(user_id) do update set last_sync_at = ?2",
        )
        .bind(user_id.to_string())
        .bind(at.unix_timestamp_nanos() as i64)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_db() -> Database {
        let options = SqliteConnectOptions::from_str("sqlite::memory:").unwrap();
        let pool = SqlitePoolOptions::new().connect_with(options).await.unwrap();
        Database::setup_db(&pool).await.unwrap();
        Database { pool }
    }

    #[tokio::test]
    async fn save_and_get_round_trips() {
        let db = memory_db().await;
        let mut lecture = Lecture::new("Intro".into());
        lecture.user_id = Some(Uuid::new_v4());
        lecture.category_tags = vec!["math".into()];
        lecture.local_audio_path = Some("/tmp/rec.m4a".into());

        db.save(&lecture).await.unwrap();
        let back = db.get(lecture.id).await.unwrap().unwrap();

        assert_eq!(back.title, "Intro");
        assert_eq!(back.category_tags, vec!["math".to_string()]);
        assert_eq!(back.local_audio_path, Some("/tmp/rec.m4a".into()));
        // created_at is second precision in the store
        assert_eq!(
            back.created_at.unix_timestamp(),
            lecture.created_at.unix_timestamp()
        );
        assert_eq!(back.updated_at, lecture.updated_at);
    }

    #[tokio::test]
    async fn after_returns_only_rows_past_the_cursor() {
        let db = memory_db().await;
        let user_id = Uuid::new_v4();

        let mut old = Lecture::new("Old".into());
        old.user_id = Some(user_id);
        old.updated_at = OffsetDateTime::UNIX_EPOCH + time::Duration::seconds(10);
        let mut fresh = Lecture::new("Fresh".into());
        fresh.user_id = Some(user_id);
        db.save_bulk(&[old.clone(), fresh.clone()]).await.unwrap();

        let cursor = OffsetDateTime::UNIX_EPOCH + time::Duration::seconds(60);
        let pending = db.after(user_id, cursor).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, fresh.id);
    }

    #[tokio::test]
    async fn adopt_legacy_is_idempotent() {
        let db = memory_db().await;
        let user_id = Uuid::new_v4();

        let legacy = Lecture::new("Before accounts".into());
        let mut owned = Lecture::new("Owned".into());
        owned.user_id = Some(Uuid::new_v4());
        db.save_bulk(&[legacy.clone(), owned]).await.unwrap();

        assert_eq!(db.adopt_legacy(user_id).await.unwrap(), 1);
        assert_eq!(db.adopt_legacy(user_id).await.unwrap(), 0);

        let back = db.get(legacy.id).await.unwrap().unwrap();
        assert_eq!(back.user_id, Some(user_id));
    }

    #[tokio::test]
    async fn list_scopes_by_user_and_filters_on_category_and_title() {
        let db = memory_db().await;
        let user_id = Uuid::new_v4();

        let mut algebra = Lecture::new("Linear Algebra 4".into());
        algebra.user_id = Some(user_id);
        algebra.category_tags = vec!["math".into()];
        let mut cells = Lecture::new("Cell Biology".into());
        cells.user_id = Some(user_id);
        cells.category_tags = vec!["bio".into()];
        let mut foreign = Lecture::new("Linear Algebra 4".into());
        foreign.user_id = Some(Uuid::new_v4());
        db.save_bulk(&[algebra.clone(), cells.clone(), foreign])
            .await
            .unwrap();

        let all = db.list(user_id, None, "").await.unwrap();
        assert_eq!(all.len(), 2);

        let math = db.list(user_id, Some("math"), "").await.unwrap();
        assert_eq!(math.len(), 1);
        assert_eq!(math[0].id, algebra.id);

        let searched = db.list(user_id, None, "Cell").await.unwrap();
        assert_eq!(searched.len(), 1);
        assert_eq!(searched[0].id, cells.id);
    }

    #[tokio::test]
    async fn delete_removes_the_row() {
        let db = memory_db().await;
        let lecture = Lecture::new("Gone".into());
        db.save(&lecture).await.unwrap();
        db.delete(lecture.id).await.unwrap();
        assert!(db.get(lecture.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn preferences_and_last_sync_round_trip() {
        let db = memory_db().await;
        let user_id = Uuid::new_v4();

        assert_eq!(
            db.last_sync(user_id).await.unwrap(),
            OffsetDateTime::UNIX_EPOCH
        );

        let at = OffsetDateTime::now_utc();
        db.save_last_sync(user_id, at).await.unwrap();
        assert_eq!(db.last_sync(user_id).await.unwrap(), at);

        let prefs = serde_json::json!({ "playback_speed": 1.5 });
        db.set_preferences(user_id, &prefs).await.unwrap();
        assert_eq!(db.preferences(user_id).await.unwrap(), Some(prefs));
    }

    #[tokio::test]
    async fn filters_are_replaced_per_user() {
        let db = memory_db().await;
        let user_id = Uuid::new_v4();
        let filter = |name: &str, position| CloudFilter {
            id: Uuid::new_v4(),
            user_id,
            name: name.into(),
            position,
            created_at: OffsetDateTime::now_utc(),
        };

        db.save_filters(user_id, &[filter("math", 0)]).await.unwrap();
        db.save_filters(user_id, &[filter("bio", 0), filter("math", 1)])
            .await
            .unwrap();

        let names: Vec<String> = db
            .list_filters(user_id)
            .await
            .unwrap()
            .into_iter()
            .map(|x| x.name)
            .collect();
        assert_eq!(names, vec!["bio".to_string(), "math".to_string()]);
    }
}
