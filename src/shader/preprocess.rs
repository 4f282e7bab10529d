//! `#include` preprocessor for WGSL.
//!
//! - `#include "path"` resolves against the including file's directory, then the shader root
//! - `#include <path>` resolves inside the vendored utility library
//!
//! WGSL has no include guards, so each file is emitted at most once per
//! translation unit. An include that reaches a file already on the current
//! include chain is an error.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ObliqueError, Result};

const DIRECTIVE: &str = "#include";

/// Resolves shader sources against a local root and a vendor root
#[derive(Debug, Clone)]
pub struct ShaderLibrary {
    root: PathBuf,
    vendor: PathBuf,
}

impl ShaderLibrary {
    pub fn new(root: impl Into<PathBuf>, vendor: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            vendor: vendor.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute or root-relative path of a module shader
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Load a shader and expand all of its includes
    pub fn load(&self, path: &Path) -> Result<String> {
        let mut out = String::new();
        let mut chain = Vec::new();
        let mut emitted = HashSet::new();
        self.expand(&self.resolve(path), &mut chain, &mut emitted, &mut out)?;
        Ok(out)
    }

    fn expand(
        &self,
        path: &Path,
        chain: &mut Vec<PathBuf>,
        emitted: &mut HashSet<PathBuf>,
        out: &mut String,
    ) -> Result<()> {
        let canonical = fs::canonicalize(path).map_err(|e| {
            ObliqueError::ShaderInclude(format!("cannot open {}: {}", path.display(), e))
        })?;

        if chain.contains(&canonical) {
            let cycle = chain
                .iter()
                .chain(std::iter::once(&canonical))
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(ObliqueError::ShaderInclude(format!(
                "circular include: {}",
                cycle
            )));
        }
        if !emitted.insert(canonical.clone()) {
            return Ok(());
        }

        let source = fs::read_to_string(&canonical).map_err(|e| ObliqueError::io(&canonical, e))?;
        chain.push(canonical.clone());

        for (line_no, line) in source.lines().enumerate() {
            let trimmed = line.trim_start();
            if let Some(rest) = trimmed.strip_prefix(DIRECTIVE) {
                let target = self.include_target(rest, &canonical).map_err(|msg| {
                    ObliqueError::ShaderInclude(format!(
                        "{}:{}: {}",
                        canonical.display(),
                        line_no + 1,
                        msg
                    ))
                })?;
                self.expand(&target, chain, emitted, out)?;
            } else {
                out.push_str(line);
                out.push('\n');
            }
        }

        chain.pop();
        Ok(())
    }

    fn include_target(&self, directive: &str, from: &Path) -> std::result::Result<PathBuf, String> {
        let spec = directive.trim().trim_end_matches(';').trim_end();

        if let Some(name) = spec.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
            return Ok(self.vendor.join(name));
        }

        if let Some(name) = spec.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
            let sibling = from.parent().map(|dir| dir.join(name));
            return match sibling {
                Some(candidate) if candidate.exists() => Ok(candidate),
                _ => {
                    let rooted = self.root.join(name);
                    if rooted.exists() {
                        Ok(rooted)
                    } else {
                        Err(format!("include \"{}\" not found", name))
                    }
                }
            };
        }

        Err(format!("malformed include directive '{}'", spec))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn library() -> (tempfile::TempDir, ShaderLibrary) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("shaders");
        let vendor = root.join("vendor");
        fs::create_dir_all(root.join("common")).unwrap();
        fs::create_dir_all(vendor.join("math")).unwrap();
        let library = ShaderLibrary::new(&root, &vendor);
        (dir, library)
    }

    #[test]
    fn test_expands_local_and_vendor_includes() {
        let (_dir, library) = library();
        let root = library.root().to_path_buf();
        fs::write(root.join("vendor/math/consts.wgsl"), "const TAU: f32 = 6.2831853;\n").unwrap();
        fs::write(
            root.join("common/wave.wgsl"),
            "#include <math/consts.wgsl>\nfn wave(x: f32) -> f32 { return sin(x * TAU); }\n",
        )
        .unwrap();
        fs::write(
            root.join("main.wgsl"),
            "#include \"common/wave.wgsl\";\n#include <math/consts.wgsl>\nfn main_value() -> f32 { return wave(0.25); }\n",
        )
        .unwrap();

        let source = library.load(Path::new("main.wgsl")).unwrap();
        assert_eq!(source.matches("const TAU").count(), 1);
        assert!(source.find("const TAU").unwrap() < source.find("fn wave").unwrap());
        assert!(source.contains("fn main_value"));
        assert!(!source.contains("#include"));
    }

    #[test]
    fn test_relative_include_prefers_sibling() {
        let (_dir, library) = library();
        let root = library.root().to_path_buf();
        fs::write(root.join("common/util.wgsl"), "// sibling\n").unwrap();
        fs::write(root.join("util.wgsl"), "// root\n").unwrap();
        fs::write(root.join("common/entry.wgsl"), "#include \"util.wgsl\"\n").unwrap();

        let source = library.load(Path::new("common/entry.wgsl")).unwrap();
        assert!(source.contains("// sibling"));
        assert!(!source.contains("// root"));
    }

    #[test]
    fn test_circular_include_is_an_error() {
        let (_dir, library) = library();
        let root = library.root().to_path_buf();
        fs::write(root.join("a.wgsl"), "#include \"b.wgsl\"\n").unwrap();
        fs::write(root.join("b.wgsl"), "#include \"a.wgsl\"\n").unwrap();

        let err = library.load(Path::new("a.wgsl")).unwrap_err();
        let ObliqueError::ShaderInclude(message) = err else {
            panic!("expected include error");
        };
        assert!(message.contains("circular include"));
        assert!(message.contains("a.wgsl -> "));
    }

    #[test]
    fn test_missing_include_reports_location() {
        let (_dir, library) = library();
        let root = library.root().to_path_buf();
        fs::write(root.join("main.wgsl"), "// header\n#include \"nope.wgsl\"\n").unwrap();

        let err = library.load(Path::new("main.wgsl")).unwrap_err();
        assert!(err.to_string().contains("main.wgsl:2"));
    }

    #[test]
    fn test_malformed_directive() {
        let (_dir, library) = library();
        let root = library.root().to_path_buf();
        fs::write(root.join("main.wgsl"), "#include common/x.wgsl\n").unwrap();
        assert!(matches!(
            library.load(Path::new("main.wgsl")),
            Err(ObliqueError::ShaderInclude(_))
        ));
    }
}
