//! The bookmark store
//!
//! Owns the SQLite database and implements the public operations:
//! `add`, `remove`, `delete`, `list`, `tags` and `import`. Tag-set
//! aliasing (`+name`) is resolved here; the CLI passes arguments
//! through untouched.
//!
//! ## Lifecycle
//!
//! Nothing the user can see is computed in SQL. Every soft-deletable
//! row carries an enable/disable stamp pair drawn from a logical clock
//! persisted in the `meta` table; queries load the pairs and filter
//! through `Lifecycle::is_active`. Tags are the exception: a tag with
//! no active claim from any URL association or tag-set membership is
//! purged outright by the cleanup pass.
//!
//! ## Atomicity
//!
//! Every mutating operation runs inside a single rusqlite transaction,
//! clock bump included. A failure anywhere rolls the whole operation
//! back, so a later invocation never observes a half-applied command.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::Context;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::codec::{self, Format};
use crate::config::Config;
use crate::models::{set_name, Lifecycle, Listing, Stamp, TagSummary};
use crate::storage::error::{StoreError, StoreResult};
use crate::storage::{init_schema, needs_init};

/// SQLite-backed bookmark store
pub struct Store {
    conn: Connection,
    config: Config,
}

impl Store {
    /// Open the store at the configured database path
    pub fn open() -> anyhow::Result<Self> {
        let config = Config::load().context("Failed to load configuration")?;
        Self::open_with_config(config).map_err(Into::into)
    }

    /// Open the store with a specific configuration
    pub fn open_with_config(config: Config) -> StoreResult<Self> {
        if let Some(parent) = config.database.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let conn = Connection::open(&config.database)?;
        Self::from_connection(conn, config)
    }

    /// Open an in-memory store (for testing)
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?, Config::default())
    }

    fn from_connection(conn: Connection, config: Config) -> StoreResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        if needs_init(&conn) {
            init_schema(&conn)?;
        }
        Ok(Self { conn, config })
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    // ==================== Mutating operations ====================

    /// Tag a URL, creating the URL and any missing tags
    ///
    /// Idempotent: re-adding refreshes the URL's enabled stamp and
    /// re-enables the named associations, nothing more. A `+name` URL
    /// extends the tag set of that name instead.
    pub fn add(&mut self, url: &str, tags: &[String]) -> StoreResult<()> {
        debug!("adding {:?} to {}", tags, url);

        let tx = self.conn.transaction()?;
        let stamp = next_stamp(&tx)?;
        apply_add(&tx, url, tags, stamp)?;
        tx.commit()?;
        Ok(())
    }

    /// Disassociate tags from a URL
    ///
    /// Associations are soft-disabled, never erased. Unknown URLs, tags
    /// and associations are silent no-ops. Afterwards the cleanup pass
    /// purges globally orphaned tags and soft-disables the URL if it
    /// lost its last active association. A `+name` URL removes members
    /// from that tag set; a set left without active members is
    /// soft-disabled.
    pub fn remove(&mut self, url: &str, tags: &[String]) -> StoreResult<()> {
        debug!("removing {:?} from {}", tags, url);

        let tx = self.conn.transaction()?;
        let stamp = next_stamp(&tx)?;
        let wanted = expand_tags(&tx, tags)?;

        if let Some(name) = set_name(url) {
            if let Some(sid) = set_id(&tx, name)? {
                for tag in &wanted {
                    tx.execute(
                        "UPDATE tag_set_tags SET disabled_at = ?1
                         WHERE set_id = ?2
                           AND tag_id = (SELECT id FROM tags WHERE name = ?3)",
                        params![stamp, sid, tag],
                    )?;
                }
                if active_member_count(&tx, sid)? == 0 {
                    debug!("tag set {} has no active members left, disabling", name);
                    tx.execute(
                        "UPDATE tag_sets SET disabled_at = ?1 WHERE id = ?2",
                        params![stamp, sid],
                    )?;
                }
                collect_garbage(&tx, stamp)?;
            } else {
                debug!("unknown tag set {}, nothing to remove", name);
            }
        } else if let Some(uid) = url_id(&tx, url)? {
            for tag in &wanted {
                tx.execute(
                    "UPDATE url_tags SET disabled_at = ?1
                     WHERE url_id = ?2
                       AND tag_id = (SELECT id FROM tags WHERE name = ?3)",
                    params![stamp, uid, tag],
                )?;
            }
            collect_garbage(&tx, stamp)?;
        } else {
            debug!("unknown url {}, nothing to remove", url);
        }

        tx.commit()?;
        Ok(())
    }

    /// Soft-delete URLs outright, regardless of their tags
    ///
    /// All associations of a deleted URL are disabled with it, then
    /// orphaned tags are purged. `+name` entries disable the tag set of
    /// that name. Unknown URLs are silent no-ops.
    pub fn delete(&mut self, urls: &[String]) -> StoreResult<()> {
        debug!("deleting {:?}", urls);

        let tx = self.conn.transaction()?;
        let stamp = next_stamp(&tx)?;

        for url in urls {
            if let Some(name) = set_name(url) {
                if let Some(sid) = set_id(&tx, name)? {
                    tx.execute(
                        "UPDATE tag_sets SET disabled_at = ?1 WHERE id = ?2",
                        params![stamp, sid],
                    )?;
                } else {
                    debug!("unknown tag set {}, nothing to delete", name);
                }
                continue;
            }
            if let Some(uid) = url_id(&tx, url)? {
                tx.execute(
                    "UPDATE url_tags SET disabled_at = ?1 WHERE url_id = ?2",
                    params![stamp, uid],
                )?;
                tx.execute(
                    "UPDATE urls SET disabled_at = ?1 WHERE id = ?2",
                    params![stamp, uid],
                )?;
            } else {
                debug!("unknown url {}, nothing to delete", url);
            }
        }

        collect_garbage(&tx, stamp)?;
        tx.commit()?;
        Ok(())
    }

    /// Import a serialized URL→tags mapping
    ///
    /// Applies the `add` semantics once per decoded entry, all in one
    /// transaction. Returns the number of imported entries. HTML is
    /// rejected with `UnsupportedImport`.
    pub fn import(&mut self, data: &[u8], format: Format) -> StoreResult<usize> {
        debug!("importing {} bytes of {}", data.len(), format);

        let mapping = codec::decode_listing(data, format)?;

        let tx = self.conn.transaction()?;
        let stamp = next_stamp(&tx)?;
        for (url, tags) in &mapping {
            apply_add(&tx, url, tags, stamp)?;
        }
        tx.commit()?;
        Ok(mapping.len())
    }

    // ==================== Queries ====================

    /// List active URLs matching every given tag (AND semantics)
    ///
    /// An empty filter lists everything. With `with_tags`, each URL
    /// maps to its full sorted active tag list, not just the queried
    /// tags. Ordering is alphabetical by URL.
    pub fn list(&self, tags: &[String], with_tags: bool) -> StoreResult<Listing> {
        debug!("listing urls with tags {:?}", tags);

        let conn = &self.conn;
        let filtered = !tags.is_empty();
        let wanted = expand_tags(conn, tags)?;
        if filtered && wanted.is_empty() {
            // The filter expanded to nothing (unknown set): match nothing.
            return Ok(Listing::new());
        }

        let urls = load_active_urls(conn)?;
        let mut tags_by_url: BTreeMap<i64, BTreeSet<String>> = BTreeMap::new();
        for (url_id, tag) in load_active_assocs(conn)? {
            if urls.contains_key(&url_id) {
                tags_by_url.entry(url_id).or_default().insert(tag);
            }
        }

        let mut listing = Listing::new();
        for (id, url) in &urls {
            let have = tags_by_url.get(id);
            if !wanted
                .iter()
                .all(|tag| have.map_or(false, |set| set.contains(tag)))
            {
                continue;
            }
            let detail = if with_tags {
                Some(have.map(|set| set.iter().cloned().collect()).unwrap_or_default())
            } else {
                None
            };
            listing.insert(url.clone(), detail);
        }
        Ok(listing)
    }

    /// List tags, globally or for the given URLs (OR semantics)
    ///
    /// With no URLs: every tag with its active-URL count, ascending by
    /// count then name. With URLs: the union of their active tags,
    /// alphabetical, counts elided. The asymmetry against `list`
    /// (which intersects) is deliberate and user-facing.
    pub fn tags(&self, urls: &[String]) -> StoreResult<TagSummary> {
        debug!("listing tags for {:?}", urls);

        let conn = &self.conn;
        let active_urls = load_active_urls(conn)?;
        let assocs = load_active_assocs(conn)?;

        if urls.is_empty() {
            let mut counts: BTreeMap<String, i64> = BTreeMap::new();
            for (url_id, tag) in assocs {
                if active_urls.contains_key(&url_id) {
                    *counts.entry(tag).or_insert(0) += 1;
                }
            }
            let mut stats: TagSummary = counts
                .into_iter()
                .map(|(name, count)| (name, Some(count)))
                .collect();
            stats.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
            Ok(stats)
        } else {
            let wanted: BTreeSet<i64> = active_urls
                .iter()
                .filter(|(_, url)| urls.contains(url))
                .map(|(id, _)| *id)
                .collect();
            let union: BTreeSet<String> = assocs
                .into_iter()
                .filter(|(url_id, _)| wanted.contains(url_id))
                .map(|(_, tag)| tag)
                .collect();
            Ok(union.into_iter().map(|name| (name, None)).collect())
        }
    }
}

// ==================== Transaction helpers ====================

/// Draw the next stamp from the persisted logical clock
fn next_stamp(conn: &Connection) -> StoreResult<Stamp> {
    let raw: String = conn.query_row("SELECT value FROM meta WHERE key = 'clock'", [], |row| {
        row.get(0)
    })?;
    let current: Stamp = raw.parse().map_err(|_| StoreError::CorruptMeta {
        details: format!("clock value {:?} is not an integer", raw),
    })?;
    let next = current + 1;
    conn.execute(
        "UPDATE meta SET value = ?1 WHERE key = 'clock'",
        params![next.to_string()],
    )?;
    Ok(next)
}

/// The `add` semantics, shared by `add` and `import`
fn apply_add(conn: &Connection, url: &str, tags: &[String], stamp: Stamp) -> StoreResult<()> {
    if let Some(name) = set_name(url) {
        return apply_set_add(conn, name, tags, stamp);
    }
    if url.is_empty() {
        return Err(StoreError::EmptyUrl);
    }

    let tags = expand_tags(conn, tags)?;
    let url_id = upsert_url(conn, url, stamp)?;
    for tag in &tags {
        let tag_id = get_or_create_tag(conn, tag)?;
        conn.execute(
            "INSERT INTO url_tags (url_id, tag_id, enabled_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(url_id, tag_id) DO UPDATE SET enabled_at = excluded.enabled_at",
            params![url_id, tag_id, stamp],
        )?;
    }
    Ok(())
}

/// Create or extend a tag set
fn apply_set_add(conn: &Connection, name: &str, tags: &[String], stamp: Stamp) -> StoreResult<()> {
    if name.is_empty() {
        return Err(StoreError::EmptyUrl);
    }

    let set_id = upsert_set(conn, name, stamp)?;
    let tags = expand_tags(conn, tags)?;
    for tag in &tags {
        let tag_id = get_or_create_tag(conn, tag)?;
        conn.execute(
            "INSERT INTO tag_set_tags (set_id, tag_id, enabled_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(set_id, tag_id) DO UPDATE SET enabled_at = excluded.enabled_at",
            params![set_id, tag_id, stamp],
        )?;
    }
    Ok(())
}

/// Collapse duplicates and expand `+name` references to set members
fn expand_tags(conn: &Connection, tags: &[String]) -> StoreResult<BTreeSet<String>> {
    let mut out = BTreeSet::new();
    for tag in tags {
        if let Some(name) = set_name(tag) {
            let members = active_set_members(conn, name)?;
            if members.is_empty() {
                debug!("tag set {} is unknown or empty", name);
            }
            out.extend(members);
        } else if !tag.is_empty() {
            out.insert(tag.clone());
        }
    }
    Ok(out)
}

fn upsert_url(conn: &Connection, url: &str, stamp: Stamp) -> StoreResult<i64> {
    conn.execute(
        "INSERT INTO urls (url, created_at, enabled_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(url) DO UPDATE SET enabled_at = excluded.enabled_at",
        params![url, Utc::now().timestamp_millis(), stamp],
    )?;
    Ok(conn.query_row(
        "SELECT id FROM urls WHERE url = ?1",
        params![url],
        |row| row.get(0),
    )?)
}

fn upsert_set(conn: &Connection, name: &str, stamp: Stamp) -> StoreResult<i64> {
    conn.execute(
        "INSERT INTO tag_sets (name, enabled_at) VALUES (?1, ?2)
         ON CONFLICT(name) DO UPDATE SET enabled_at = excluded.enabled_at",
        params![name, stamp],
    )?;
    Ok(conn.query_row(
        "SELECT id FROM tag_sets WHERE name = ?1",
        params![name],
        |row| row.get(0),
    )?)
}

/// Get or create a tag, returning its ID
fn get_or_create_tag(conn: &Connection, name: &str) -> StoreResult<i64> {
    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM tags WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )
        .optional()?;

    if let Some(id) = existing {
        return Ok(id);
    }

    conn.execute("INSERT INTO tags (name) VALUES (?1)", params![name])?;
    Ok(conn.last_insert_rowid())
}

fn url_id(conn: &Connection, url: &str) -> StoreResult<Option<i64>> {
    Ok(conn
        .query_row(
            "SELECT id FROM urls WHERE url = ?1",
            params![url],
            |row| row.get(0),
        )
        .optional()?)
}

fn set_id(conn: &Connection, name: &str) -> StoreResult<Option<i64>> {
    Ok(conn
        .query_row(
            "SELECT id FROM tag_sets WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )
        .optional()?)
}

/// Active members of an active tag set, by set name
fn active_set_members(conn: &Connection, name: &str) -> StoreResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT t.name, s.enabled_at, s.disabled_at, st.enabled_at, st.disabled_at
         FROM tag_sets s
         JOIN tag_set_tags st ON st.set_id = s.id
         JOIN tags t ON t.id = st.tag_id
         WHERE s.name = ?1",
    )?;
    let rows = stmt.query_map(params![name], |row| {
        Ok((
            row.get::<_, String>(0)?,
            Lifecycle {
                enabled_at: row.get(1)?,
                disabled_at: row.get(2)?,
            },
            Lifecycle {
                enabled_at: row.get(3)?,
                disabled_at: row.get(4)?,
            },
        ))
    })?;

    let mut members = Vec::new();
    for row in rows {
        let (tag, set_lc, member_lc) = row?;
        if set_lc.is_active() && member_lc.is_active() {
            members.push(tag);
        }
    }
    Ok(members)
}

/// Count a set's active memberships, ignoring the set row's own state
fn active_member_count(conn: &Connection, set_id: i64) -> StoreResult<usize> {
    let mut stmt = conn.prepare(
        "SELECT enabled_at, disabled_at FROM tag_set_tags WHERE set_id = ?1",
    )?;
    let rows = stmt.query_map(params![set_id], |row| {
        Ok(Lifecycle {
            enabled_at: row.get(0)?,
            disabled_at: row.get(1)?,
        })
    })?;

    let mut count = 0;
    for row in rows {
        if row?.is_active() {
            count += 1;
        }
    }
    Ok(count)
}

/// Active URL rows, id → url string
fn load_active_urls(conn: &Connection) -> StoreResult<BTreeMap<i64, String>> {
    let mut stmt = conn.prepare("SELECT id, url, enabled_at, disabled_at FROM urls")?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            Lifecycle {
                enabled_at: row.get(2)?,
                disabled_at: row.get(3)?,
            },
        ))
    })?;

    let mut urls = BTreeMap::new();
    for row in rows {
        let (id, url, lc) = row?;
        if lc.is_active() {
            urls.insert(id, url);
        }
    }
    Ok(urls)
}

/// Active URL-tag associations as (url_id, tag name) pairs
fn load_active_assocs(conn: &Connection) -> StoreResult<Vec<(i64, String)>> {
    let mut stmt = conn.prepare(
        "SELECT ut.url_id, t.name, ut.enabled_at, ut.disabled_at
         FROM url_tags ut
         JOIN tags t ON t.id = ut.tag_id",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            Lifecycle {
                enabled_at: row.get(2)?,
                disabled_at: row.get(3)?,
            },
        ))
    })?;

    let mut assocs = Vec::new();
    for row in rows {
        let (url_id, tag, lc) = row?;
        if lc.is_active() {
            assocs.push((url_id, tag));
        }
    }
    Ok(assocs)
}

/// The cleanup pass run after `remove` and `delete`
///
/// Purges tags with no active claim from any URL association or tag-set
/// membership, then soft-disables active URLs left without any active
/// association.
fn collect_garbage(conn: &Connection, stamp: Stamp) -> StoreResult<()> {
    let mut active_tag_ids: BTreeSet<i64> = BTreeSet::new();
    let mut urls_with_active: BTreeSet<i64> = BTreeSet::new();

    {
        let mut stmt =
            conn.prepare("SELECT url_id, tag_id, enabled_at, disabled_at FROM url_tags")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                Lifecycle {
                    enabled_at: row.get(2)?,
                    disabled_at: row.get(3)?,
                },
            ))
        })?;
        for row in rows {
            let (url_id, tag_id, lc) = row?;
            if lc.is_active() {
                active_tag_ids.insert(tag_id);
                urls_with_active.insert(url_id);
            }
        }
    }

    {
        // The set row's own state is ignored here: members of a
        // soft-disabled set must survive so re-enabling it restores them.
        let mut stmt =
            conn.prepare("SELECT tag_id, enabled_at, disabled_at FROM tag_set_tags")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                Lifecycle {
                    enabled_at: row.get(1)?,
                    disabled_at: row.get(2)?,
                },
            ))
        })?;
        for row in rows {
            let (tag_id, member_lc) = row?;
            if member_lc.is_active() {
                active_tag_ids.insert(tag_id);
            }
        }
    }

    let stale: Vec<(i64, String)> = {
        let mut stmt = conn.prepare("SELECT id, name FROM tags")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        let mut stale = Vec::new();
        for row in rows {
            let (id, name): (i64, String) = row?;
            if !active_tag_ids.contains(&id) {
                stale.push((id, name));
            }
        }
        stale
    };
    for (id, name) in stale {
        debug!("pruning orphaned tag {}", name);
        // Cascades to url_tags and tag_set_tags, all inactive by now,
        // so urls_with_active still holds below.
        conn.execute("DELETE FROM tags WHERE id = ?1", params![id])?;
    }

    let mut stmt = conn.prepare("SELECT id, url, enabled_at, disabled_at FROM urls")?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            Lifecycle {
                enabled_at: row.get(2)?,
                disabled_at: row.get(3)?,
            },
        ))
    })?;
    let mut orphaned = Vec::new();
    for row in rows {
        let (id, url, lc) = row?;
        if lc.is_active() && !urls_with_active.contains(&id) {
            orphaned.push((id, url));
        }
    }
    drop(stmt);
    for (id, url) in orphaned {
        debug!("url {} has no active tags left, disabling", url);
        conn.execute(
            "UPDATE urls SET disabled_at = ?1 WHERE id = ?2",
            params![stamp, id],
        )?;
    }

    Ok(())
}
