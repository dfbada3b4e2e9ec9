use std::{
    cell::RefCell,
    env, fmt, io,
    path::{Path, PathBuf},
};

use schemars::{json_schema, JsonSchema};
use serde::{
    de::{self, Visitor},
    Deserialize, Deserializer, Serialize,
};

/// A path as written in the configuration, plus the same path resolved against the
/// directory of the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub struct FilePath {
    pub relative: String,
    pub absolute: PathBuf,
}

// Deserialization has no way to receive the config directory, so it is passed through a thread local.
thread_local!(static CONTEXT_START_PATH: RefCell<Option<PathBuf>> = const { RefCell::new(None) });

pub fn with_start_path<F, T>(start_path: &Path, f: F) -> T
where
    F: FnOnce() -> T,
{
    CONTEXT_START_PATH.with(|ctx| {
        *ctx.borrow_mut() = Some(start_path.to_path_buf());
    });

    let result = f();

    CONTEXT_START_PATH.with(|ctx| {
        *ctx.borrow_mut() = None;
    });

    result
}

impl JsonSchema for FilePath {
    fn schema_name() -> std::borrow::Cow<'static, str> {
        "FilePath".into()
    }

    fn json_schema(_generator: &mut schemars::SchemaGenerator) -> schemars::Schema {
        json_schema!({
            "type": "string",
            "format": "path"
        })
    }

    fn inline_schema() -> bool {
        true
    }
}

struct FilePathVisitor;

impl<'de> Visitor<'de> for FilePathVisitor {
    type Value = FilePath;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a string representing a relative file path")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        CONTEXT_START_PATH.with(|ctx| match ctx.borrow().as_ref() {
            Some(start_path) => Ok(FilePath::resolve_relative(start_path, v)),
            None => FilePath::new_from_relative(v)
                .map_err(|err| E::custom(format!("Failed to resolve path \"{}\": {}", v, err))),
        })
    }
}

impl<'de> Deserialize<'de> for FilePath {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_str(FilePathVisitor)
    }
}

impl From<FilePath> for String {
    fn from(value: FilePath) -> Self {
        value.relative
    }
}

impl From<&str> for FilePath {
    fn from(value: &str) -> Self {
        FilePath {
            relative: value.to_string(),
            absolute: PathBuf::from(value),
        }
    }
}

impl FilePath {
    pub fn new_from_relative(relative_path: &str) -> io::Result<FilePath> {
        Ok(Self::resolve_relative(&env::current_dir()?, relative_path))
    }

    fn resolve_relative<RootPath: AsRef<Path>>(base_path: &RootPath, relative_path: &str) -> FilePath {
        FilePath {
            relative: relative_path.to_string(),
            absolute: base_path.as_ref().join(relative_path),
        }
    }
}

impl fmt::Display for FilePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.absolute.display())
    }
}
