//! Maven-style version comparison.
//!
//! [`MavenVersion`] implements the ordering used by Maven artifact
//! resolution: numeric segments compare numerically, well-known qualifiers
//! (`alpha < beta < milestone < rc < snapshot < release < sp`) compare by
//! rank, unknown qualifiers compare lexically after all known ones, and
//! trailing zero / release segments are insignificant (`1.0 == 1`).

use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

/// Known qualifiers, lowest first. The empty string is a plain release.
const QUALIFIERS: [&str; 7] = ["alpha", "beta", "milestone", "rc", "snapshot", "", "sp"];

/// Rank of the empty (release) qualifier within [`QUALIFIERS`].
const RELEASE_RANK: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Item {
    /// Decimal digits without leading zeros (`"0"` for zero).
    Int(String),
    /// A qualifier with aliases already applied.
    Str(String),
    List(Vec<Item>),
}

impl Item {
    fn int(digits: &str) -> Item {
        let trimmed = digits.trim_start_matches('0');
        Item::Int(if trimmed.is_empty() { "0" } else { trimmed }.to_string())
    }

    fn qualifier(value: &str, followed_by_digit: bool) -> Item {
        let value = match value {
            "a" if followed_by_digit => "alpha",
            "b" if followed_by_digit => "beta",
            "m" if followed_by_digit => "milestone",
            "ga" | "final" | "release" => "",
            "cr" => "rc",
            other => other,
        };
        Item::Str(value.to_string())
    }

    fn is_null(&self) -> bool {
        match self {
            Item::Int(v) => v == "0",
            Item::Str(v) => qualifier_key(v) == RELEASE_RANK.to_string(),
            Item::List(items) => items.is_empty(),
        }
    }
}

/// Sort key for a qualifier: its rank for known qualifiers, or
/// `"<count>-<qualifier>"` so unknown ones sort after every known one.
fn qualifier_key(value: &str) -> String {
    match QUALIFIERS.iter().position(|q| *q == value) {
        Some(rank) => rank.to_string(),
        None => format!("{}-{}", QUALIFIERS.len(), value),
    }
}

fn cmp_ints(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Compares `item` against `other`, where `None` is the implicit padding
/// used when one list is shorter than the other.
fn cmp_item(item: &Item, other: Option<&Item>) -> Ordering {
    match (item, other) {
        (Item::Int(v), None) => {
            if v == "0" {
                Ordering::Equal
            } else {
                Ordering::Greater
            }
        }
        (Item::Int(a), Some(Item::Int(b))) => cmp_ints(a, b),
        (Item::Int(_), Some(_)) => Ordering::Greater,

        (Item::Str(v), None) => qualifier_key(v).cmp(&RELEASE_RANK.to_string()),
        (Item::Str(_), Some(Item::Int(_))) => Ordering::Less,
        (Item::Str(a), Some(Item::Str(b))) => qualifier_key(a).cmp(&qualifier_key(b)),
        (Item::Str(_), Some(Item::List(_))) => Ordering::Less,

        (Item::List(items), None) => match items.first() {
            Some(first) => cmp_item(first, None),
            None => Ordering::Equal,
        },
        (Item::List(_), Some(Item::Int(_))) => Ordering::Less,
        (Item::List(_), Some(Item::Str(_))) => Ordering::Greater,
        (Item::List(left), Some(Item::List(right))) => {
            let len = left.len().max(right.len());
            for i in 0..len {
                let result = match (left.get(i), right.get(i)) {
                    (Some(l), r) => cmp_item(l, r),
                    (None, Some(r)) => cmp_item(r, None).reverse(),
                    (None, None) => Ordering::Equal,
                };
                if result != Ordering::Equal {
                    return result;
                }
            }
            Ordering::Equal
        }
    }
}

/// Strips insignificant trailing items, skipping over nested lists.
fn normalize(items: &mut Vec<Item>) {
    let mut i = items.len();
    while i > 0 {
        i -= 1;
        if items[i].is_null() {
            items.remove(i);
        } else if !matches!(items[i], Item::List(_)) {
            break;
        }
    }
}

/// A parsed, comparable Maven version.
///
/// Equality follows the Maven ordering, so `1.0` and `1.0.0` are equal even
/// though [`MavenVersion::as_str`] differs.
#[derive(Debug, Clone)]
pub struct MavenVersion {
    raw: String,
    items: Item,
}

/// Path of indexes from the root list to the list currently being filled.
type ListPath = Vec<usize>;

fn list_at<'a>(root: &'a mut Vec<Item>, path: &ListPath) -> &'a mut Vec<Item> {
    let mut current = root;
    for &idx in path {
        current = match &mut current[idx] {
            Item::List(items) => items,
            _ => unreachable!("list path always points at lists"),
        };
    }
    current
}

/// Appends a fresh sublist to the list at `path` and descends into it.
fn open_sublist(root: &mut Vec<Item>, path: &mut ListPath) {
    let list = list_at(root, path);
    list.push(Item::List(Vec::new()));
    let idx = list.len() - 1;
    path.push(idx);
}

fn normalize_at(root: &mut Vec<Item>, path: &[usize]) {
    let mut current = &mut *root;
    for &idx in path {
        current = match &mut current[idx] {
            Item::List(items) => items,
            _ => return,
        };
    }
    normalize(current);
}

impl MavenVersion {
    pub fn parse(version: &str) -> MavenVersion {
        let lower = version.to_lowercase();
        let chars: Vec<char> = lower.chars().collect();
        let mut root: Vec<Item> = Vec::new();
        let mut path: ListPath = Vec::new();
        // Every list opened while parsing, innermost last.
        let mut opened: Vec<ListPath> = vec![Vec::new()];

        let parse_item = |is_digit: bool, buf: &str| {
            if is_digit {
                Item::int(buf)
            } else {
                Item::qualifier(buf, false)
            }
        };

        let mut is_digit = false;
        let mut start = 0;
        for (i, &c) in chars.iter().enumerate() {
            let segment = || chars[start..i].iter().collect::<String>();
            if c == '.' || c == '-' {
                let item = if i == start {
                    Item::int("0")
                } else {
                    parse_item(is_digit, &segment())
                };
                list_at(&mut root, &path).push(item);
                start = i + 1;
                if c == '-' {
                    open_sublist(&mut root, &mut path);
                    opened.push(path.clone());
                }
            } else if c.is_ascii_digit() {
                if !is_digit && i > start {
                    list_at(&mut root, &path).push(Item::qualifier(&segment(), true));
                    start = i;
                    open_sublist(&mut root, &mut path);
                    opened.push(path.clone());
                }
                is_digit = true;
            } else {
                if is_digit && i > start {
                    list_at(&mut root, &path).push(parse_item(true, &segment()));
                    start = i;
                    open_sublist(&mut root, &mut path);
                    opened.push(path.clone());
                }
                is_digit = false;
            }
        }
        if chars.len() > start {
            let tail: String = chars[start..].iter().collect();
            list_at(&mut root, &path).push(parse_item(is_digit, &tail));
        }

        while let Some(list_path) = opened.pop() {
            normalize_at(&mut root, &list_path);
        }

        MavenVersion {
            raw: version.to_string(),
            items: Item::List(root),
        }
    }

    /// The version string as originally supplied.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for MavenVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PartialEq for MavenVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MavenVersion {}

impl PartialOrd for MavenVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MavenVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        cmp_item(&self.items, Some(&other.items))
    }
}

fn scheme_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[0-9]+([.-]([0-9]+|[A-Za-z]+[0-9]*))*$")
            .expect("version scheme regex must compile")
    })
}

/// Returns true if every version follows a conventional Maven layout: a
/// numeric leading segment followed by `.`/`-` separated segments that are
/// numeric, alphabetic, or alphabetic with a numeric suffix (`rc1`).
///
/// An empty list counts as Maven so that the first version of a component
/// never forces the opaque scheme on its own.
pub fn is_maven_scheme<S: AsRef<str>>(versions: &[S]) -> bool {
    versions.iter().all(|v| scheme_re().is_match(v.as_ref()))
}
