//! wsPath helpers
//!
//! Three path shapes are in play:
//!
//! - file path: `dir/sub/note.md`
//! - wsPath: `<wsName>:<filePath>`, e.g. `my-ws:dir/sub/note.md`
//! - fs path: `<wsName>/<filePath>`, what storage backends see
//!
//! Locations (`/ws/<wsName>/<filePath>?secondary=<wsPath>`) map to the
//! pair of notes open in the primary and secondary editors.

use crate::error::PathValidationError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_NOTE_EXTENSION: &str = ".md";
pub const VALID_NOTE_EXTENSIONS: &[&str] = &[DEFAULT_NOTE_EXTENSION];

type Result<T> = std::result::Result<T, PathValidationError>;

static UNSAFE_FILE_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_\s\-.]").expect("valid sanitize regex"));

/// Works on any string
pub fn has_valid_note_extension(s: &str) -> bool {
    VALID_NOTE_EXTENSIONS.iter().any(|ext| s.ends_with(ext))
}

/// Extension of the last path component, including the dot
pub fn get_extension(s: &str) -> Option<&str> {
    let name = s.rsplit('/').next().unwrap_or(s);
    name.rfind('.').map(|dot| &name[dot..])
}

pub fn suffix_with_note_extension(s: &str) -> String {
    if s.ends_with(DEFAULT_NOTE_EXTENSION) {
        s.to_string()
    } else {
        format!("{s}{DEFAULT_NOTE_EXTENSION}")
    }
}

pub fn remove_extension(s: &str) -> &str {
    match s.rfind('.') {
        Some(dot) => &s[..dot],
        None => s,
    }
}

/// The parts of a file wsPath
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedPath {
    pub ws_path: String,
    pub ws_name: String,
    pub file_path: String,
    pub dir_path: String,
    pub file_name: String,
    pub file_name_without_ext: String,
}

/// Validate a file wsPath and split it into its parts
pub fn resolve_path(ws_path: &str) -> Result<ResolvedPath> {
    validate_ws_path(ws_path)?;
    validate_file_ws_path(ws_path)?;
    resolve_path_unchecked(ws_path)
}

/// Split a wsPath without checking that it names a file
pub fn resolve_path_unchecked(ws_path: &str) -> Result<ResolvedPath> {
    let (ws_name, file_path) = split_ws_path(ws_path)?;
    let segments: Vec<&str> = file_path.split('/').collect();
    let (file_name, dirs) = match segments.split_last() {
        Some((last, dirs)) => (*last, dirs),
        None => return Err(PathValidationError::EmptyFilePath(ws_path.to_string())),
    };
    let dir_path = dirs
        .iter()
        .filter(|segment| !segment.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("/");

    Ok(ResolvedPath {
        ws_path: ws_path.to_string(),
        ws_name: ws_name.to_string(),
        file_path: file_path.to_string(),
        dir_path,
        file_name: file_name.to_string(),
        file_name_without_ext: remove_extension(file_name).to_string(),
    })
}

pub fn valid_ws_name(ws_name: &str) -> Result<()> {
    if ws_name.is_empty() {
        return Err(PathValidationError::EmptyWsName(ws_name.to_string()));
    }
    if ws_name.contains(':') {
        return Err(PathValidationError::InvalidWsNameCharacters(
            ws_name.to_string(),
        ));
    }
    Ok(())
}

pub fn is_ws_path(s: &str) -> bool {
    !s.is_empty() && s.split(':').count() == 2
}

pub fn is_valid_file_ws_path(s: &str) -> bool {
    is_ws_path(s) && s.rsplit('/').next().is_some_and(|name| name.contains('.'))
}

pub fn validate_ws_path(ws_path: &str) -> Result<()> {
    if ws_path.split('/').any(str::is_empty) {
        return Err(PathValidationError::EmptySegment(ws_path.to_string()));
    }

    let mut parts = ws_path.split(':');
    let ws_name = parts.next().unwrap_or_default();
    let file_path = parts.next();
    if parts.next().is_some() {
        return Err(PathValidationError::ExtraSeparator(ws_path.to_string()));
    }
    let Some(file_path) = file_path else {
        return Err(PathValidationError::MissingSeparator(ws_path.to_string()));
    };
    if ws_name.is_empty() {
        return Err(PathValidationError::EmptyWsName(ws_path.to_string()));
    }
    if file_path.is_empty() {
        return Err(PathValidationError::EmptyFilePath(ws_path.to_string()));
    }
    Ok(())
}

/// A file wsPath is a wsPath whose last component has an extension
pub fn validate_file_ws_path(ws_path: &str) -> Result<()> {
    validate_ws_path(ws_path)?;
    if !is_valid_file_ws_path(ws_path) {
        return Err(PathValidationError::MissingExtension(ws_path.to_string()));
    }
    Ok(())
}

/// A note wsPath is a file wsPath ending in one of `VALID_NOTE_EXTENSIONS`
pub fn validate_note_ws_path(ws_path: &str) -> Result<()> {
    validate_file_ws_path(ws_path)?;
    if !is_valid_note_ws_path(ws_path) {
        return Err(PathValidationError::UnsupportedNoteExtension(
            VALID_NOTE_EXTENSIONS.join(", "),
        ));
    }
    Ok(())
}

pub fn is_valid_note_ws_path(ws_path: &str) -> bool {
    has_valid_note_extension(ws_path)
}

/// Strip everything but word characters, whitespace, `-` and `.`
pub fn sanitize_file_path(file_path: &str) -> String {
    UNSAFE_FILE_CHARS.replace_all(file_path, "").into_owned()
}

/// Resolve a link written inside a note to a wsPath
///
/// `file_path` is relative to the directory of the note at `ws_path`,
/// e.g. `./sibling.md` or `../other/note.md`.
pub fn parse_local_file_path(file_path: &str, ws_path: &str) -> Result<String> {
    if file_path.contains(':') {
        return Err(PathValidationError::ColonInLocalPath(file_path.to_string()));
    }
    let file_path = file_path.strip_prefix("./").unwrap_or(file_path);
    let resolved = resolve_path(ws_path)?;

    let mut base = String::from("https://bangle.io");
    if !resolved.dir_path.is_empty() {
        base.push('/');
        base.push_str(&resolved.dir_path);
        base.push('/');
    }
    let joined = Url::parse(&base)
        .and_then(|base| base.join(file_path))
        .map_err(|_| PathValidationError::UnresolvableLocalPath(file_path.to_string()))?;

    let web_path = joined.path();
    let web_path = web_path.strip_prefix('/').unwrap_or(web_path);
    // File systems don't percent-encode names
    let decoded = urlencoding::decode(web_path)
        .map_err(|_| PathValidationError::UnresolvableLocalPath(file_path.to_string()))?;

    Ok(file_path_to_ws_path(&resolved.ws_name, &decoded))
}

pub fn to_fs_path(ws_path: &str) -> Result<String> {
    let resolved = resolve_path(ws_path)?;
    Ok(format!("{}/{}", resolved.ws_name, resolved.file_path))
}

pub fn from_fs_path(fs_path: &str) -> Option<String> {
    let (ws_name, file_path) = fs_path.split_once('/').unwrap_or((fs_path, ""));
    if ws_name.is_empty() || ws_name.contains(':') {
        return None;
    }
    Some(file_path_to_ws_path(ws_name, file_path))
}

pub fn split_ws_path(ws_path: &str) -> Result<(&str, &str)> {
    let mut parts = ws_path.split(':');
    let ws_name = parts.next().unwrap_or_default();
    let file_path = parts.next().unwrap_or_default();
    if ws_name.is_empty() {
        return Err(PathValidationError::EmptyWsName(ws_path.to_string()));
    }
    if file_path.is_empty() {
        return Err(PathValidationError::EmptyFilePath(ws_path.to_string()));
    }
    Ok((ws_name, file_path))
}

/// Replace the file name of `ws_path`, keeping its directory
pub fn update_file_name(ws_path: &str, new_file_name: &str) -> Result<String> {
    let resolved = resolve_path(ws_path)?;
    Ok(file_path_to_ws_path(
        &resolved.ws_name,
        &format!("{}/{}", resolved.dir_path, new_file_name),
    ))
}

pub fn file_path_to_ws_path(ws_name: &str, file_path: &str) -> String {
    let file_path = file_path.strip_prefix('/').unwrap_or(file_path);
    format!("{ws_name}:{file_path}")
}

// Locations

const WS_ROUTE: &str = "/ws/";

pub fn ws_name_to_pathname(ws_name: &str) -> String {
    format!("{WS_ROUTE}{ws_name}")
}

pub fn ws_path_to_pathname(ws_path: &str) -> Result<String> {
    let (ws_name, file_path) = split_ws_path(ws_path)?;
    Ok(format!("{WS_ROUTE}{ws_name}/{file_path}"))
}

/// The workspace named by a `/ws/...` pathname
pub fn pathname_to_ws_name(pathname: &str) -> Option<String> {
    let rest = pathname.strip_prefix(WS_ROUTE)?;
    let ws_name = rest.split('/').next().unwrap_or_default();
    if ws_name.is_empty() {
        return None;
    }
    Some(urlencoding::decode(ws_name).map_or_else(|_| ws_name.to_string(), |s| s.into_owned()))
}

/// The note open in the primary editor, from a `/ws/<ws>/<file>` pathname
pub fn pathname_to_ws_path(pathname: &str) -> Option<String> {
    let ws_name = pathname_to_ws_name(pathname)?;
    let rest = pathname.strip_prefix(WS_ROUTE)?;
    let (_, file_path) = rest.split_once('/')?;
    if file_path.is_empty() {
        return None;
    }
    let file_path =
        urlencoding::decode(file_path).map_or_else(|_| file_path.to_string(), |s| s.into_owned());
    Some(file_path_to_ws_path(&ws_name, &file_path))
}

/// The note open in the secondary editor, from a `secondary=` query
pub fn search_to_secondary_ws_path(search: &str) -> Option<String> {
    let query = search.strip_prefix('?').unwrap_or(search);
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "secondary")
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

/// Route shown when the browser refused storage access
pub fn ws_auth_route(ws_name: &str, code: &str) -> String {
    format!("/ws-auth/{ws_name}?code={code}")
}

pub fn ws_not_found_route(ws_name: &str) -> String {
    format!("/ws-not-found/{ws_name}")
}

pub fn ws_invalid_path_route(ws_name: &str) -> String {
    format!("/ws-invalid-path/{ws_name}")
}

/// A location split into pathname and search query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub pathname: String,
    pub search: String,
}

impl Location {
    pub fn to_href(&self) -> String {
        if self.search.is_empty() {
            self.pathname.clone()
        } else {
            format!("{}?{}", self.pathname, self.search)
        }
    }
}

/// The wsPaths open in the primary and secondary editors
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenedWsPaths {
    primary: Option<String>,
    secondary: Option<String>,
}

impl OpenedWsPaths {
    pub const MAX_INDEX: usize = 1;

    pub fn new(primary: Option<String>, secondary: Option<String>) -> Self {
        Self { primary, secondary }
    }

    pub fn from_array(paths: [Option<&str>; 2]) -> Self {
        let [primary, secondary] = paths;
        Self::new(primary.map(String::from), secondary.map(String::from))
    }

    /// Build from a location's pathname and search query
    pub fn from_location(pathname: &str, search: &str) -> Self {
        Self::new(
            pathname_to_ws_path(pathname),
            search_to_secondary_ws_path(search),
        )
    }

    pub fn to_array(&self) -> [Option<&str>; 2] {
        [self.primary.as_deref(), self.secondary.as_deref()]
    }

    pub fn primary(&self) -> Option<&str> {
        self.primary.as_deref()
    }

    pub fn secondary(&self) -> Option<&str> {
        self.secondary.as_deref()
    }

    /// Replace the path at `index` (0 = primary, 1 = secondary)
    pub fn update_by_index(&self, index: usize, ws_path: Option<&str>) -> Self {
        let ws_path = ws_path.map(String::from);
        match index {
            0 => Self::new(ws_path, self.secondary.clone()),
            1 => Self::new(self.primary.clone(), ws_path),
            _ => self.clone(),
        }
    }

    pub fn update_primary(&self, ws_path: Option<&str>) -> Self {
        self.update_by_index(0, ws_path)
    }

    pub fn update_secondary(&self, ws_path: Option<&str>) -> Self {
        self.update_by_index(1, ws_path)
    }

    /// Apply `f` to every open path
    pub fn map_paths(&self, f: impl Fn(&str) -> Option<String>) -> Self {
        Self::new(
            self.primary.as_deref().and_then(&f),
            self.secondary.as_deref().and_then(&f),
        )
    }

    pub fn has(&self, ws_path: &str) -> bool {
        self.all_ws_paths().contains(&ws_path)
    }

    pub fn has_some(&self) -> bool {
        self.primary.is_some() || self.secondary.is_some()
    }

    /// Open paths without duplicates, primary first
    pub fn all_ws_paths(&self) -> Vec<&str> {
        let mut paths = Vec::with_capacity(2);
        for path in self.to_array().into_iter().flatten() {
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
        paths
    }

    /// Move a lone secondary path into the primary slot
    pub fn optimize_space(&self) -> Self {
        match (&self.primary, &self.secondary) {
            (None, Some(secondary)) => Self::new(Some(secondary.clone()), None),
            _ => self.clone(),
        }
    }

    pub fn all_belong_to_ws(&self, ws_name: &str) -> bool {
        self.all_ws_paths()
            .iter()
            .all(|path| split_ws_path(path).is_ok_and(|(name, _)| name == ws_name))
    }

    /// The location showing these paths inside `ws_name`
    pub fn to_location(&self, ws_name: &str) -> Location {
        let pathname = self
            .primary
            .as_deref()
            .and_then(|path| ws_path_to_pathname(path).ok())
            .unwrap_or_else(|| ws_name_to_pathname(ws_name));
        let search = match &self.secondary {
            Some(secondary) => url::form_urlencoded::Serializer::new(String::new())
                .append_pair("secondary", secondary)
                .finish(),
            None => String::new(),
        };
        Location { pathname, search }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_resolve_path() {
        let resolved = resolve_path("my-ws:dir/sub/file.md").unwrap();
        assert_eq!(resolved.ws_name, "my-ws");
        assert_eq!(resolved.file_path, "dir/sub/file.md");
        assert_eq!(resolved.dir_path, "dir/sub");
        assert_eq!(resolved.file_name, "file.md");
        assert_eq!(resolved.file_name_without_ext, "file");

        let top = resolve_path("my-ws:file.md").unwrap();
        assert_eq!(top.dir_path, "");
    }

    #[test]
    fn test_validate_ws_path() {
        assert!(matches!(
            validate_ws_path("no-colon-path"),
            Err(PathValidationError::MissingSeparator(_))
        ));
        assert!(validate_ws_path("ws:file.md").is_ok());
        assert!(matches!(
            validate_ws_path("ws:a:b.md"),
            Err(PathValidationError::ExtraSeparator(_))
        ));
        assert!(matches!(
            validate_ws_path("ws:a//b.md"),
            Err(PathValidationError::EmptySegment(_))
        ));
        assert!(matches!(
            validate_ws_path(":file.md"),
            Err(PathValidationError::EmptyWsName(_))
        ));
        assert!(matches!(
            validate_ws_path("ws:"),
            Err(PathValidationError::EmptyFilePath(_))
        ));
    }

    #[test]
    fn test_file_and_note_validation() {
        assert!(matches!(
            validate_file_ws_path("ws:dir/file"),
            Err(PathValidationError::MissingExtension(_))
        ));
        assert!(validate_file_ws_path("ws:dir/image.png").is_ok());
        assert!(matches!(
            validate_note_ws_path("ws:dir/image.png"),
            Err(PathValidationError::UnsupportedNoteExtension(_))
        ));
        assert!(validate_note_ws_path("ws:dir/note.md").is_ok());
        assert!(!is_valid_file_ws_path("my-ws-hello"));
    }

    #[test]
    fn test_extension_helpers() {
        assert_eq!(get_extension("a.b/c.md"), Some(".md"));
        assert_eq!(get_extension("a.b/c"), None);
        assert_eq!(suffix_with_note_extension("note"), "note.md");
        assert_eq!(suffix_with_note_extension("note.md"), "note.md");
        assert_eq!(remove_extension("dir/note.md"), "dir/note");
        assert!(has_valid_note_extension("x.md"));
    }

    #[test]
    fn test_ws_name_rules() {
        assert!(valid_ws_name("my-ws").is_ok());
        assert!(valid_ws_name("").is_err());
        assert!(matches!(
            valid_ws_name("a:b"),
            Err(PathValidationError::InvalidWsNameCharacters(_))
        ));
    }

    #[test]
    fn test_sanitize_file_path() {
        assert_eq!(sanitize_file_path("my note?*/v1.md"), "my notev1.md");
        assert_eq!(sanitize_file_path("keep_this-one.md"), "keep_this-one.md");
    }

    #[test]
    fn test_parse_local_file_path() {
        assert_eq!(
            parse_local_file_path("./sibling.md", "my-ws:dir/sub/note.md").unwrap(),
            "my-ws:dir/sub/sibling.md"
        );
        assert_eq!(
            parse_local_file_path("../other.md", "my-ws:dir/sub/note.md").unwrap(),
            "my-ws:dir/other.md"
        );
        assert_eq!(
            parse_local_file_path("my%20note.md", "my-ws:note.md").unwrap(),
            "my-ws:my note.md"
        );
        assert!(parse_local_file_path("x:y.md", "my-ws:note.md").is_err());
    }

    #[test]
    fn test_fs_path_conversion() {
        assert_eq!(to_fs_path("my-ws:dir/a.md").unwrap(), "my-ws/dir/a.md");
        assert_eq!(from_fs_path("my-ws/dir/a.md").as_deref(), Some("my-ws:dir/a.md"));
        assert_eq!(from_fs_path("bad:ws/a.md"), None);
        assert_eq!(
            update_file_name("my-ws:dir/a.md", "b.md").unwrap(),
            "my-ws:dir/b.md"
        );
        assert_eq!(file_path_to_ws_path("my-ws", "/a.md"), "my-ws:a.md");
    }

    #[test]
    fn test_location_helpers() {
        assert_eq!(ws_name_to_pathname("my-ws"), "/ws/my-ws");
        assert_eq!(
            ws_path_to_pathname("my-ws:test-note.md").unwrap(),
            "/ws/my-ws/test-note.md"
        );
        assert_eq!(pathname_to_ws_name("/ws/my-ws/a.md").as_deref(), Some("my-ws"));
        assert_eq!(pathname_to_ws_name("/ws-not-found/my-ws"), None);
        assert_eq!(pathname_to_ws_name(""), None);
        assert_eq!(
            pathname_to_ws_path("/ws/my-ws/dir/a.md").as_deref(),
            Some("my-ws:dir/a.md")
        );
        assert_eq!(pathname_to_ws_path("/ws/my-ws"), None);
        assert_eq!(
            search_to_secondary_ws_path("?secondary=my-ws%3Atest-note.md").as_deref(),
            Some("my-ws:test-note.md")
        );
        assert_eq!(search_to_secondary_ws_path(""), None);
    }

    #[test]
    fn test_opened_ws_paths() {
        let opened = OpenedWsPaths::from_array([Some("my-ws:one.md"), None]);
        assert_eq!(opened.to_array(), [Some("my-ws:one.md"), None]);
        assert!(opened.has("my-ws:one.md"));

        let both = opened.update_by_index(1, Some("my-ws:one.md"));
        assert_eq!(both.all_ws_paths(), vec!["my-ws:one.md"]);
        assert!(both.all_belong_to_ws("my-ws"));
        assert!(!both.all_belong_to_ws("other"));

        let lone = OpenedWsPaths::from_array([None, Some("my-ws:two.md")]);
        assert_eq!(lone.optimize_space().primary(), Some("my-ws:two.md"));
    }

    #[test]
    fn test_location_round_trip() {
        let opened = OpenedWsPaths::from_array([Some("my-ws:a.md"), Some("my-ws:test-note.md")]);
        let location = opened.to_location("my-ws");
        assert_eq!(location.pathname, "/ws/my-ws/a.md");
        assert_eq!(location.search, "secondary=my-ws%3Atest-note.md");
        assert_eq!(
            location.to_href(),
            "/ws/my-ws/a.md?secondary=my-ws%3Atest-note.md"
        );
        assert_eq!(
            OpenedWsPaths::from_location(&location.pathname, &location.search),
            opened
        );

        let empty = OpenedWsPaths::default().to_location("my-ws");
        assert_eq!(empty.pathname, "/ws/my-ws");
        assert_eq!(empty.search, "");
    }

    proptest! {
        #[test]
        fn test_valid_note_paths_resolve(
            ws in "[a-z][a-z0-9-]{0,8}",
            dirs in prop::collection::vec("[a-z0-9]{1,6}", 0..3),
            name in "[a-z0-9]{1,8}",
        ) {
            let mut file_path = dirs.join("/");
            if !file_path.is_empty() {
                file_path.push('/');
            }
            file_path.push_str(&name);
            file_path.push_str(DEFAULT_NOTE_EXTENSION);
            let ws_path = file_path_to_ws_path(&ws, &file_path);

            prop_assert!(validate_note_ws_path(&ws_path).is_ok());
            let resolved = resolve_path(&ws_path).unwrap();
            prop_assert_eq!(resolved.ws_name, ws);
            prop_assert_eq!(resolved.dir_path, dirs.join("/"));
            prop_assert_eq!(resolved.file_name_without_ext, name);
        }
    }
}
