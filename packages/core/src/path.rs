//! Path type spanning both the application namespace and backing-store URIs.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Path separator used by every namespace tierfs deals with.
pub const SEPARATOR: char = '/';

/// Errors related to path parsing and namespace checks.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// The path string was empty.
    #[error("path is empty")]
    Empty,

    /// The path cannot take part in an ancestor check or join.
    #[error("malformed path '{path}': {message}")]
    Malformed { path: String, message: String },
}

/// A path in either the application namespace (`/data/a.txt`) or the backing
/// store's namespace (`s3://bucket/base/data/a.txt`, `file:///tmp/ufs`).
///
/// The raw path part is kept as written so that trailing separators survive
/// a round trip through `Display`. Use [`FsPath::normalized`] for the
/// canonical directory form.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FsPath {
    scheme: Option<String>,
    authority: Option<String>,
    path: String,
}

impl FsPath {
    /// Parse a path string.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tierfs_core::FsPath;
    ///
    /// let p = FsPath::parse("s3://bucket/base/file").unwrap();
    /// assert_eq!(p.scheme(), Some("s3"));
    /// assert_eq!(p.authority(), Some("bucket"));
    /// assert_eq!(p.components().collect::<Vec<_>>(), vec!["base", "file"]);
    /// ```
    pub fn parse(s: &str) -> Result<Self, PathError> {
        if s.is_empty() {
            return Err(PathError::Empty);
        }

        let Some((scheme, rest)) = s.split_once("://") else {
            return Ok(FsPath {
                scheme: None,
                authority: None,
                path: s.to_string(),
            });
        };

        if scheme.is_empty() || rest.is_empty() {
            return Err(PathError::Malformed {
                path: s.to_string(),
                message: "scheme must be followed by an authority or a path".to_string(),
            });
        }

        let (authority, path) = match rest.find(SEPARATOR) {
            Some(idx) => (&rest[..idx], &rest[idx..]),
            None => (rest, ""),
        };

        Ok(FsPath {
            scheme: Some(scheme.to_string()),
            authority: (!authority.is_empty()).then(|| authority.to_string()),
            path: path.to_string(),
        })
    }

    /// The root of a scheme-less namespace.
    pub fn root() -> Self {
        FsPath {
            scheme: None,
            authority: None,
            path: SEPARATOR.to_string(),
        }
    }

    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    pub fn authority(&self) -> Option<&str> {
        self.authority.as_deref()
    }

    /// The raw path part, without scheme and authority.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Iterate over non-empty components of the path part.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.path.split(SEPARATOR).filter(|c| !c.is_empty())
    }

    /// Whether the path part names the namespace root.
    pub fn is_root(&self) -> bool {
        self.components().next().is_none()
    }

    /// Whether the path part is absolute.
    ///
    /// Paths carrying a scheme are always treated as absolute.
    pub fn is_absolute(&self) -> bool {
        self.scheme.is_some() || self.path.starts_with(SEPARATOR)
    }

    /// Check that this path can take part in namespace arithmetic.
    pub fn validate(&self) -> Result<(), PathError> {
        if !self.is_absolute() {
            return Err(self.malformed("path is not absolute"));
        }
        if let Some(dots) = self.components().find(|c| *c == "." || *c == "..") {
            return Err(self.malformed(&format!("unsupported '{}' segment", dots)));
        }
        Ok(())
    }

    /// Check whether `self` is an ancestor of, or equal to, `other`.
    ///
    /// Scheme and authority must match exactly; an absent scheme only matches
    /// an absent scheme.
    pub fn is_ancestor_of(&self, other: &FsPath) -> Result<bool, PathError> {
        self.validate()?;
        other.validate()?;

        if self.scheme != other.scheme || self.authority != other.authority {
            return Ok(false);
        }

        let mut theirs = other.components();
        Ok(self.components().all(|c| theirs.next() == Some(c)))
    }

    /// Append the components of `child` under this path.
    ///
    /// The result ends with a separator when `child` is a root, so joining
    /// `/` onto `s3://bucket/base` yields `s3://bucket/base/`.
    ///
    /// A `child` carrying a scheme or authority other than this path's is
    /// rejected; its components belong to a different namespace.
    pub fn join(&self, child: &FsPath) -> Result<FsPath, PathError> {
        if (child.scheme.is_some() || child.authority.is_some())
            && (child.scheme != self.scheme || child.authority != self.authority)
        {
            return Err(child.malformed(&format!("cannot be placed under {}", self)));
        }

        let mut joined = self.prefix();
        let base = self.path.trim_end_matches(SEPARATOR);
        joined.push_str(base);
        for component in child.components() {
            joined.push(SEPARATOR);
            joined.push_str(component);
        }
        if child.is_root() {
            joined.push(SEPARATOR);
        }
        FsPath::parse(&joined)
    }

    /// Canonical directory form: repeated separators collapsed, exactly one
    /// trailing separator.
    #[must_use]
    pub fn normalized(&self) -> FsPath {
        let mut path = String::with_capacity(self.path.len() + 1);
        if self.is_absolute() {
            path.push(SEPARATOR);
        }
        for component in self.components() {
            path.push_str(component);
            path.push(SEPARATOR);
        }
        FsPath {
            scheme: self.scheme.clone(),
            authority: self.authority.clone(),
            path,
        }
    }

    /// The path one level up, or `None` at the namespace root.
    pub fn parent(&self) -> Option<FsPath> {
        let mut components: Vec<&str> = self.components().collect();
        components.pop()?;
        let mut path = String::new();
        if self.is_absolute() {
            path.push(SEPARATOR);
        }
        path.push_str(&components.join("/"));
        Some(FsPath {
            scheme: self.scheme.clone(),
            authority: self.authority.clone(),
            path,
        })
    }

    /// The last component, if any.
    pub fn name(&self) -> Option<&str> {
        self.components().last()
    }

    fn prefix(&self) -> String {
        match &self.scheme {
            Some(scheme) => format!(
                "{}://{}",
                scheme,
                self.authority.as_deref().unwrap_or_default()
            ),
            None => String::new(),
        }
    }

    fn malformed(&self, message: &str) -> PathError {
        PathError::Malformed {
            path: self.to_string(),
            message: message.to_string(),
        }
    }
}

impl fmt::Display for FsPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.prefix(), self.path)
    }
}

impl TryFrom<String> for FsPath {
    type Error = PathError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        FsPath::parse(&s)
    }
}

impl From<FsPath> for String {
    fn from(path: FsPath) -> Self {
        path.to_string()
    }
}

impl std::str::FromStr for FsPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FsPath::parse(s)
    }
}

/// Macro for creating paths from literals.
///
/// # Example
///
/// ```rust
/// use tierfs_core::fs_path;
///
/// let p = fs_path!("/data/logs");
/// assert_eq!(p.name(), Some("logs"));
/// ```
#[macro_export]
macro_rules! fs_path {
    ($s:expr) => {
        $crate::FsPath::parse($s).expect("invalid path literal")
    };
}
