use std::collections::HashSet;

/// Characters rejected by common filesystems (the Windows set is the strictest).
pub const FORBIDDEN_CHARS: [char; 9] = ['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Longest file stem produced, in characters.
pub const MAX_NAME_CHARS: usize = 255;

/// Map a sheet title to a filesystem-safe file stem: every forbidden
/// character becomes `_`, then the result is cut to 255 characters.
pub fn sanitize_sheet_name(title: &str) -> String {
    title
        .chars()
        .map(|c| if FORBIDDEN_CHARS.contains(&c) { '_' } else { c })
        .take(MAX_NAME_CHARS)
        .collect()
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Hands out unique archive entry stems for one archive.
///
/// The first sheet sanitizing to a given stem keeps it; later ones get
/// `_2`, `_3`, ... appended. Comparison ignores case since the
/// archive is usually extracted onto a case-insensitive filesystem.
#[derive(Debug, Default)]
pub struct EntryNamer {
    taken: HashSet<String>,
}

impl EntryNamer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign(&mut self, title: &str) -> String {
        let base = sanitize_sheet_name(title);
        if self.taken.insert(base.to_lowercase()) {
            return base;
        }
        let mut n = 2usize;
        loop {
            let suffix = format!("_{n}");
            let stem = truncate_chars(&base, MAX_NAME_CHARS - suffix.chars().count());
            let candidate = format!("{stem}{suffix}");
            if self.taken.insert(candidate.to_lowercase()) {
                return candidate;
            }
            n += 1;
        }
    }
}
