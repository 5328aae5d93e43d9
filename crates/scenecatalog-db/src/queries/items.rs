//! Catalog item queries.
//!
//! Items are keyed by their path-derived id, so `upsert_item` is idempotent
//! across rescans.

use rusqlite::Connection;
use scenecatalog_common::{Error, ItemId, MatchMethod, MediaKind, Result};

use super::{conversion_error, item_id, json_column, timestamp};
use crate::models::{CatalogItem, DuplicateReport};

const ITEM_COLUMNS: &str = "id, title, year, kind, primary_path, episodes, poster_ref,
    backdrop_ref, overview, genres, rating, fingerprint, external_ids, match_confidence,
    match_method, created_at, updated_at";

/// Insert or update an item.
///
/// `created_at` is kept from the first insert.
pub fn upsert_item(conn: &Connection, item: &CatalogItem) -> Result<()> {
    let episodes_json = serde_json::to_string(&item.episodes)?;
    let genres_json = serde_json::to_string(&item.genres)?;
    let external_ids_json = serde_json::to_string(&item.external_ids)?;

    conn.execute(
        "INSERT INTO items (
            id, title, year, kind, primary_path, episodes, poster_ref, backdrop_ref,
            overview, genres, rating, fingerprint, external_ids, match_confidence,
            match_method, created_at, updated_at
         ) VALUES (
            :id, :title, :year, :kind, :primary_path, :episodes, :poster_ref, :backdrop_ref,
            :overview, :genres, :rating, :fingerprint, :external_ids, :match_confidence,
            :match_method, :created_at, :updated_at
         )
         ON CONFLICT(id) DO UPDATE SET
            title = :title,
            year = :year,
            kind = :kind,
            primary_path = :primary_path,
            episodes = :episodes,
            poster_ref = :poster_ref,
            backdrop_ref = :backdrop_ref,
            overview = :overview,
            genres = :genres,
            rating = :rating,
            fingerprint = :fingerprint,
            external_ids = :external_ids,
            match_confidence = :match_confidence,
            match_method = :match_method,
            updated_at = :updated_at",
        rusqlite::named_params! {
            ":id": item.id.to_string(),
            ":title": &item.title,
            ":year": item.year,
            ":kind": item.kind.to_string(),
            ":primary_path": &item.primary_path,
            ":episodes": episodes_json,
            ":poster_ref": &item.poster_ref,
            ":backdrop_ref": &item.backdrop_ref,
            ":overview": &item.overview,
            ":genres": genres_json,
            ":rating": item.rating,
            ":fingerprint": &item.fingerprint,
            ":external_ids": external_ids_json,
            ":match_confidence": item.match_confidence,
            ":match_method": item.match_method.map(|m| m.to_string()),
            ":created_at": item.created_at.to_rfc3339(),
            ":updated_at": item.updated_at.to_rfc3339(),
        },
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(())
}

fn parse_item_row(row: &rusqlite::Row) -> rusqlite::Result<CatalogItem> {
    let kind: String = row.get(3)?;
    let match_method: Option<String> = row.get(14)?;

    Ok(CatalogItem {
        id: item_id(row, 0)?,
        title: row.get(1)?,
        year: row.get(2)?,
        kind: kind.parse::<MediaKind>().map_err(|e| conversion_error(3, e))?,
        primary_path: row.get(4)?,
        episodes: json_column(row, 5)?,
        poster_ref: row.get(6)?,
        backdrop_ref: row.get(7)?,
        overview: row.get(8)?,
        genres: json_column(row, 9)?,
        rating: row.get(10)?,
        fingerprint: row.get(11)?,
        external_ids: json_column(row, 12)?,
        match_confidence: row.get(13)?,
        match_method: match_method
            .map(|m| m.parse::<MatchMethod>())
            .transpose()
            .map_err(|e| conversion_error(14, e))?,
        created_at: timestamp(row, 15)?,
        updated_at: timestamp(row, 16)?,
    })
}

fn query_items(
    conn: &Connection,
    sql: &str,
    params: &[(&str, &dyn rusqlite::ToSql)],
) -> Result<Vec<CatalogItem>> {
    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| Error::database(e.to_string()))?;

    let items = stmt
        .query_map(params, parse_item_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(items)
}

fn query_one(
    conn: &Connection,
    sql: &str,
    params: &[(&str, &dyn rusqlite::ToSql)],
) -> Result<Option<CatalogItem>> {
    match conn.query_row(sql, params, parse_item_row) {
        Ok(item) => Ok(Some(item)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Get an item by ID.
pub fn get_item(conn: &Connection, id: ItemId) -> Result<Option<CatalogItem>> {
    query_one(
        conn,
        &format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = :id"),
        rusqlite::named_params! { ":id": id.to_string() },
    )
}

/// List items, optionally restricted to one kind, ordered by title.
pub fn list_items(conn: &Connection, kind: Option<MediaKind>) -> Result<Vec<CatalogItem>> {
    match kind {
        Some(kind) => query_items(
            conn,
            &format!(
                "SELECT {ITEM_COLUMNS} FROM items WHERE kind = :kind
                 ORDER BY title COLLATE NOCASE, primary_path"
            ),
            rusqlite::named_params! { ":kind": kind.to_string() },
        ),
        None => query_items(
            conn,
            &format!("SELECT {ITEM_COLUMNS} FROM items ORDER BY title COLLATE NOCASE, primary_path"),
            &[],
        ),
    }
}

/// Items that have never had a resolution accepted.
pub fn list_unenriched(conn: &Connection) -> Result<Vec<CatalogItem>> {
    query_items(
        conn,
        &format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE match_confidence IS NULL
             ORDER BY primary_path"
        ),
        &[],
    )
}

/// Items carrying the given fingerprint.
pub fn list_items_by_fingerprint(conn: &Connection, fingerprint: &str) -> Result<Vec<CatalogItem>> {
    query_items(
        conn,
        &format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE fingerprint = :fingerprint
             ORDER BY primary_path"
        ),
        rusqlite::named_params! { ":fingerprint": fingerprint },
    )
}

/// Set the fingerprint mirrored on an item.
///
/// Returns `false` when the item does not exist.
pub fn set_fingerprint(conn: &Connection, id: ItemId, fingerprint: &str) -> Result<bool> {
    let changed = conn
        .execute(
            "UPDATE items SET fingerprint = :fingerprint, updated_at = :updated_at WHERE id = :id",
            rusqlite::named_params! {
                ":fingerprint": fingerprint,
                ":updated_at": chrono::Utc::now().to_rfc3339(),
                ":id": id.to_string(),
            },
        )
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(changed > 0)
}

/// Group items whose fingerprint is shared by more than one item.
pub fn find_duplicates(conn: &Connection) -> Result<Vec<DuplicateReport>> {
    let fingerprints: Vec<String> = {
        let mut stmt = conn
            .prepare(
                "SELECT fingerprint FROM items
                 WHERE fingerprint IS NOT NULL
                 GROUP BY fingerprint HAVING COUNT(*) > 1
                 ORDER BY fingerprint",
            )
            .map_err(|e| Error::database(e.to_string()))?;

        let rows = stmt
            .query_map([], |row| row.get(0))
            .map_err(|e| Error::database(e.to_string()))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| Error::database(e.to_string()))?
    };

    fingerprints
        .into_iter()
        .map(|fingerprint| {
            let items = list_items_by_fingerprint(conn, &fingerprint)?;
            Ok(DuplicateReport { fingerprint, items })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::run_migrations;
    use crate::models::{EpisodeRef, MetadataPatch};

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    fn movie(title: &str, path: &str) -> CatalogItem {
        CatalogItem::new(title, Some(2010), MediaKind::Movie, path)
    }

    #[test]
    fn test_upsert_and_get_item() {
        let conn = setup();
        let mut item = movie("Inception", "/m/Inception.2010.mkv");
        item.genres = vec!["Sci-Fi".into()];
        item.external_ids.insert("tmdb".into(), "27205".into());
        item.match_confidence = Some(0.92);
        item.match_method = Some(MatchMethod::Exact);

        upsert_item(&conn, &item).unwrap();
        let fetched = get_item(&conn, item.id).unwrap().unwrap();

        assert_eq!(fetched.title, "Inception");
        assert_eq!(fetched.kind, MediaKind::Movie);
        assert_eq!(fetched.genres, vec!["Sci-Fi"]);
        assert_eq!(fetched.external_ids.get("tmdb").unwrap(), "27205");
        assert_eq!(fetched.match_method, Some(MatchMethod::Exact));
        assert_eq!(fetched.match_confidence, Some(0.92));
    }

    #[test]
    fn test_get_missing_item() {
        let conn = setup();
        assert!(get_item(&conn, ItemId::from_path("/nope")).unwrap().is_none());
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let conn = setup();
        let item = movie("Heat", "/m/Heat.mkv");
        upsert_item(&conn, &item).unwrap();
        upsert_item(&conn, &item).unwrap();

        assert_eq!(list_items(&conn, None).unwrap().len(), 1);
    }

    #[test]
    fn test_upsert_preserves_created_at() {
        let conn = setup();
        let item = movie("Heat", "/m/Heat.mkv");
        upsert_item(&conn, &item).unwrap();

        let mut later = item.clone();
        later.created_at = chrono::Utc::now() + chrono::Duration::days(1);
        later.apply_patch(&MetadataPatch {
            overview: Some("Cops and robbers".into()),
            ..Default::default()
        });
        upsert_item(&conn, &later).unwrap();

        let fetched = get_item(&conn, item.id).unwrap().unwrap();
        assert_eq!(fetched.created_at.timestamp(), item.created_at.timestamp());
        assert_eq!(fetched.overview.as_deref(), Some("Cops and robbers"));
    }

    #[test]
    fn test_episodes_roundtrip() {
        let conn = setup();
        let mut show = CatalogItem::new("Show", None, MediaKind::Tv, "/tv/Show");
        show.merge_episodes(&[EpisodeRef {
            path: "/tv/Show/Show.S01E01.mkv".into(),
            season: 1,
            episode: Some(1),
            name: "Show.S01E01.mkv".into(),
        }]);
        upsert_item(&conn, &show).unwrap();

        let fetched = get_item(&conn, show.id).unwrap().unwrap();
        assert_eq!(fetched.episodes, show.episodes);
    }

    #[test]
    fn test_list_by_kind_and_unenriched() {
        let conn = setup();
        let mut heat = movie("Heat", "/m/Heat.mkv");
        heat.match_confidence = Some(0.9);
        upsert_item(&conn, &heat).unwrap();
        upsert_item(&conn, &movie("Alien", "/m/Alien.mkv")).unwrap();
        upsert_item(
            &conn,
            &CatalogItem::new("Show", None, MediaKind::Tv, "/tv/Show"),
        )
        .unwrap();

        let movies = list_items(&conn, Some(MediaKind::Movie)).unwrap();
        assert_eq!(movies.len(), 2);
        assert_eq!(movies[0].title, "Alien");

        assert_eq!(list_items(&conn, None).unwrap().len(), 3);
        assert_eq!(list_items(&conn, Some(MediaKind::Tv)).unwrap().len(), 1);

        let pending = list_unenriched(&conn).unwrap();
        assert_eq!(pending.len(), 2);
        assert!(pending.iter().all(|i| i.title != "Heat"));
    }

    #[test]
    fn test_find_duplicates() {
        let conn = setup();
        let a = movie("Heat", "/m/a/Heat.mkv");
        let b = movie("Heat", "/m/b/Heat.mkv");
        let c = movie("Alien", "/m/Alien.mkv");
        for item in [&a, &b, &c] {
            upsert_item(&conn, item).unwrap();
        }
        assert!(set_fingerprint(&conn, a.id, "c1:dup").unwrap());
        assert!(set_fingerprint(&conn, b.id, "c1:dup").unwrap());
        assert!(set_fingerprint(&conn, c.id, "c1:solo").unwrap());
        assert!(!set_fingerprint(&conn, ItemId::from_path("/none"), "c1:x").unwrap());

        let reports = find_duplicates(&conn).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].fingerprint, "c1:dup");
        assert_eq!(reports[0].items.len(), 2);
    }
}
