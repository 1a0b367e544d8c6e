//! Filesystem-backed schema loading
//!
//! The resolver itself never touches I/O; this module supplies the
//! [`SchemaLoader`] implementation used when schema documents live on
//! disk. Relative schemaLocation values are resolved against a base
//! directory, the way import/include locations are relative to the
//! importing document's directory.

use crate::error::{Error, Result};
use crate::limits::Limits;
use crate::resolver::SchemaLoader;
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

/// Loads schema text from the filesystem
#[derive(Debug)]
pub struct FileLoader {
    /// Directory against which relative locations are resolved
    base_dir: PathBuf,
    /// Resource limits applied to loaded documents
    limits: Limits,
    /// Whether remote (http/https) locations are permitted
    allow_remote: bool,
}

impl FileLoader {
    /// Create a loader rooted at a base directory
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            limits: Limits::default(),
            allow_remote: false,
        }
    }

    /// Create a loader rooted at a schema file's own directory
    pub fn for_schema_file(schema_path: &Path) -> Self {
        let base = schema_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::new(base)
    }

    /// Set the limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Set whether to allow remote resources
    pub fn with_allow_remote(mut self, allow: bool) -> Self {
        self.allow_remote = allow;
        self
    }

    /// Resolve a schemaLocation to a filesystem path
    fn resolve_path(&self, location: &str) -> PathBuf {
        let path = Path::new(location);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

/// Whether a location names a remote resource rather than a file
fn is_remote(location: &str) -> bool {
    match Url::parse(location) {
        Ok(url) => matches!(url.scheme(), "http" | "https" | "ftp"),
        Err(_) => false,
    }
}

impl SchemaLoader for FileLoader {
    fn load(&self, location: &str) -> Result<String> {
        if is_remote(location) {
            if !self.allow_remote {
                return Err(Error::Resource(format!(
                    "Remote resources are not allowed: {}",
                    location
                )));
            }
            return Err(Error::Resource(format!(
                "URL loading not yet implemented: {}",
                location
            )));
        }

        let path = self.resolve_path(location);
        let content = fs::read_to_string(&path).map_err(|e| {
            Error::Resource(format!("Failed to read file '{}': {}", path.display(), e))
        })?;

        self.limits.check_xml_size(content.len())?;

        Ok(content)
    }
}

/// Load and fully resolve a schema file from disk
///
/// Relative import/include locations are resolved against the file's
/// directory.
pub fn resolve_file(schema_path: &Path) -> Result<crate::model::ResolvedSchema> {
    let loader = FileLoader::for_schema_file(schema_path);
    let text = fs::read_to_string(schema_path).map_err(|e| {
        Error::Resource(format!(
            "Failed to read file '{}': {}",
            schema_path.display(),
            e
        ))
    })?;
    let mut schema = crate::parser::parse_schema_text(&text)?;
    schema.location = Some(schema_path.display().to_string());
    crate::resolver::resolve(schema, &loader)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = fs::File::create(&path).unwrap();
        write!(file, "{}", content).unwrap();
        path
    }

    #[test]
    fn test_load_relative_location() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "types.xsd", "<root>types</root>");

        let loader = FileLoader::new(dir.path());
        let content = loader.load("types.xsd").unwrap();

        assert_eq!(content, "<root>types</root>");
    }

    #[test]
    fn test_missing_file_is_resource_error() {
        let dir = TempDir::new().unwrap();
        let loader = FileLoader::new(dir.path());

        let err = loader.load("nope.xsd").unwrap_err();
        assert!(matches!(err, Error::Resource(_)));
    }

    #[test]
    fn test_remote_locations_rejected_by_default() {
        let loader = FileLoader::new(".");
        let err = loader.load("http://example.com/schema.xsd").unwrap_err();
        assert!(matches!(err, Error::Resource(_)));
    }

    #[test]
    fn test_size_limit() {
        let dir = TempDir::new().unwrap();
        let large = "x".repeat(11 * 1024 * 1024);
        write_file(&dir, "big.xsd", &large);

        let loader = FileLoader::new(dir.path()).with_limits(Limits::strict());
        assert!(loader.load("big.xsd").is_err());
    }

    #[test]
    fn test_resolve_file_follows_includes() {
        let dir = TempDir::new().unwrap();
        write_file(
            &dir,
            "base.xsd",
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                 targetNamespace="http://example.com/f">
               <xs:complexType name="Base">
                 <xs:sequence><xs:element name="id" type="xs:int"/></xs:sequence>
               </xs:complexType>
             </xs:schema>"#,
        );
        let main = write_file(
            &dir,
            "main.xsd",
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                 xmlns:tns="http://example.com/f"
                 targetNamespace="http://example.com/f">
               <xs:include schemaLocation="base.xsd"/>
               <xs:element name="thing" type="tns:Base"/>
             </xs:schema>"#,
        );

        let resolved = resolve_file(&main).unwrap();
        assert!(resolved.resolved_type_by_local_name("Base").is_some());
        assert!(resolved.find_element("thing").is_some());
    }
}
