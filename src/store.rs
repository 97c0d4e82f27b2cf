use std::{
    collections::HashMap,
    fs::{self, File, OpenOptions},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
};

use chrono::Local;
use once_cell::sync::Lazy;
use uuid::Uuid;

use crate::entry::{Entry, META_TIME, META_UUID};
use crate::errors::CoreError;
use crate::grammar::Grammar;

/// Sentinel marker opening a raw entry's span.
pub const MARKER_START: &str = "BEANBOT_START";
/// Sentinel marker closing a raw entry's span.
pub const MARKER_END: &str = "BEANBOT_END";

const TMP_SUFFIX: &str = "tmp";
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One lock per distinct resolved ledger path, held for the full duration of
/// any create or remove. No other component may touch the file outside it.
static PATH_LOCKS: Lazy<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

fn lock_for(path: &Path) -> Arc<Mutex<()>> {
    let mut registry = PATH_LOCKS.lock().unwrap_or_else(PoisonError::into_inner);
    Arc::clone(registry.entry(path.to_path_buf()).or_default())
}

/// File-backed entry store. Appends new entries and excises removed ones by
/// line range, leaving every unrelated line byte-identical.
pub struct LedgerStore {
    path_template: String,
    grammar: Arc<dyn Grammar>,
}

impl LedgerStore {
    /// `path_template` may contain `{year}`, `{month}`, and `{date}`
    /// placeholders, resolved against the local clock at each operation.
    pub fn new(path_template: impl Into<String>, grammar: Arc<dyn Grammar>) -> Self {
        Self {
            path_template: path_template.into(),
            grammar,
        }
    }

    pub fn grammar(&self) -> &Arc<dyn Grammar> {
        &self.grammar
    }

    /// The ledger path for operations performed now.
    pub fn ledger_path(&self) -> PathBuf {
        let now = Local::now();
        let resolved = self
            .path_template
            .replace("{year}", &now.format("%Y").to_string())
            .replace("{month}", &now.format("%m").to_string())
            .replace("{date}", &now.format("%d").to_string());
        PathBuf::from(resolved)
    }

    /// Appends an entry under a fresh identity. Returns the identity and the
    /// stored entry (transactions gain identity/timestamp metadata).
    pub fn create(&self, entry: Entry) -> Result<(String, Entry), CoreError> {
        self.create_with_tags(entry, &[])
    }

    pub fn create_with_tags(
        &self,
        entry: Entry,
        extra_tags: &[String],
    ) -> Result<(String, Entry), CoreError> {
        let path = self.ledger_path();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let lock = lock_for(&path);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let identity = Uuid::new_v4().to_string();
        let (entry, block) = match entry {
            Entry::Raw(text) => {
                let block =
                    format!("; {MARKER_START} {identity}\n{text}\n; {MARKER_END} {identity}\n");
                (Entry::Raw(text), block)
            }
            Entry::Transaction(mut tx) => {
                tx.set_meta(META_UUID, identity.clone());
                tx.set_meta(META_TIME, Local::now().format(TIME_FORMAT).to_string());
                tx.tags.extend(extra_tags.iter().cloned());
                let block = self.grammar.format(&tx);
                (Entry::Transaction(tx), block)
            }
        };

        // The block is written in one call so a failed create never leaves a
        // partial entry behind.
        let needs_separator = match fs::read(&path) {
            Ok(existing) => !existing.is_empty() && existing.last() != Some(&b'\n'),
            Err(err) if err.kind() == ErrorKind::NotFound => false,
            Err(err) => return Err(err.into()),
        };
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        let payload = if needs_separator {
            format!("\n{block}")
        } else {
            block
        };
        file.write_all(payload.as_bytes())?;
        file.flush()?;

        tracing::debug!(identity = %identity, path = %path.display(), "appended ledger entry");
        Ok((identity, entry))
    }

    /// Removes the entry carrying `identity`, returning it. Structured
    /// entries are matched through the grammar's parse; raw entries through
    /// their sentinel markers, which works even when unrelated content in the
    /// file fails to parse.
    pub fn remove(&self, identity: &str) -> Result<Entry, CoreError> {
        let path = self.ledger_path();
        let lock = lock_for(&path);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let content = fs::read_to_string(&path)?;
        let parsed = self.grammar.parse(&content);

        if let Some(found) = parsed
            .entries
            .iter()
            .find(|entry| entry.tx.meta_value(META_UUID) == Some(identity))
        {
            let first = found.lineno;
            let last = found.max_line();
            write_atomic(&path, &excise_lines(&content, first, last))?;
            tracing::debug!(identity = %identity, first, last, "removed structured entry");
            return Ok(Entry::Transaction(found.tx.clone()));
        }

        let start_needle = format!("{MARKER_START} {identity}");
        let end_needle = format!("{MARKER_END} {identity}");
        let lines: Vec<&str> = content.split_inclusive('\n').collect();
        let start = lines.iter().position(|line| line.contains(&start_needle));
        let end = lines.iter().position(|line| line.contains(&end_needle));

        match (start, end) {
            (Some(start), Some(end)) if start <= end => {
                let mut interior: String = lines[start + 1..end].concat();
                if interior.ends_with('\n') {
                    interior.pop();
                }
                let rewritten: String = lines[..start]
                    .iter()
                    .chain(lines[end + 1..].iter())
                    .copied()
                    .collect();
                write_atomic(&path, &rewritten)?;
                tracing::debug!(identity = %identity, "removed marker-wrapped entry");
                Ok(Entry::Raw(interior))
            }
            // Malformed ledger content is the more actionable diagnostic, but
            // only once both lookups have come up empty.
            _ if !parsed.errors.is_empty() => Err(CoreError::GrammarParse {
                text: String::new(),
                diagnostics: parsed.errors,
            }),
            _ => Err(CoreError::EntryNotFound),
        }
    }
}

/// Drops the 1-based inclusive line range, keeping all other lines untouched.
fn excise_lines(content: &str, first: usize, last: usize) -> String {
    content
        .split_inclusive('\n')
        .enumerate()
        .filter(|(index, _)| {
            let lineno = index + 1;
            lineno < first || lineno > last
        })
        .map(|(_, line)| line)
        .collect()
}

/// The full new content lands in a temp file first so a failed rewrite never
/// leaves the ledger half-written.
fn write_atomic(path: &Path, data: &str) -> Result<(), CoreError> {
    let tmp = tmp_path(path);
    {
        let mut file = File::create(&tmp)?;
        file.write_all(data.as_bytes())?;
        file.flush()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::BeanGrammar;
    use tempfile::tempdir;

    #[test]
    fn path_placeholders_resolve_against_the_local_clock() {
        let store = LedgerStore::new(
            "/ledgers/{year}/{month}/{date}.bean",
            Arc::new(BeanGrammar::new()),
        );
        let now = Local::now();
        let expected = format!(
            "/ledgers/{}/{}/{}.bean",
            now.format("%Y"),
            now.format("%m"),
            now.format("%d")
        );
        assert_eq!(store.ledger_path(), PathBuf::from(expected));
    }

    #[test]
    fn excise_keeps_surrounding_lines_byte_identical() {
        let content = "a\nb\nc\nd";
        assert_eq!(excise_lines(content, 2, 3), "a\nd");
        assert_eq!(excise_lines(content, 1, 1), "b\nc\nd");
        assert_eq!(excise_lines(content, 4, 4), "a\nb\nc\n");
    }

    #[test]
    fn concurrent_creates_serialize_on_the_path_lock() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("shared.bean");
        let store = Arc::new(LedgerStore::new(
            path.to_string_lossy().to_string(),
            Arc::new(BeanGrammar::new()) as Arc<dyn Grammar>,
        ));

        let mut handles = Vec::new();
        for index in 0..8 {
            let store = Arc::clone(&store);
            handles.push(std::thread::spawn(move || {
                store
                    .create(Entry::Raw(format!("; worker {index}")))
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let content = fs::read_to_string(&path).unwrap();
        // Eight raw blocks of three lines each, no interleaving.
        assert_eq!(content.lines().count(), 24);
        for index in 0..8 {
            assert!(content.contains(&format!("; worker {index}")));
        }
    }
}
