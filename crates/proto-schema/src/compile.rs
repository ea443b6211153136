//! Schema compilation from `.proto` sources.
//!
//! Wraps `protobuf-parse`, which can either drive the external `protoc`
//! binary or use its bundled pure-Rust parser. Both produce the same
//! file-level descriptors, which are then registered into a [`ProtoSchema`].

use crate::catalog::schema_from_files;
use crate::error::{Result, SchemaError};
use protobuf::descriptor::FileDescriptorProto;
use protobuf_parse::Parser;
use proto_types::ProtoSchema;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Which schema compiler backs [`SchemaCompiler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompilerKind {
    /// The external `protoc` binary
    #[default]
    Protoc,
    /// The pure-Rust parser bundled with protobuf-parse
    Pure,
}

impl fmt::Display for CompilerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompilerKind::Protoc => write!(f, "protoc"),
            CompilerKind::Pure => write!(f, "pure"),
        }
    }
}

impl FromStr for CompilerKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "protoc" => Ok(CompilerKind::Protoc),
            "pure" => Ok(CompilerKind::Pure),
            other => Err(format!(
                "Unknown schema compiler '{other}' (expected 'protoc' or 'pure')"
            )),
        }
    }
}

/// Compiles `.proto` files into file descriptors.
#[derive(Debug, Clone, Default)]
pub struct SchemaCompiler {
    kind: CompilerKind,
    protoc_path: Option<PathBuf>,
    includes: Vec<PathBuf>,
}

impl SchemaCompiler {
    pub fn new(kind: CompilerKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    /// Use a specific `protoc` binary instead of the one on `PATH`.
    pub fn protoc_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.protoc_path = Some(path.into());
        self
    }

    /// Add an import search directory.
    pub fn include(mut self, dir: impl Into<PathBuf>) -> Self {
        self.includes.push(dir.into());
        self
    }

    pub fn includes<I, P>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.includes.extend(dirs.into_iter().map(Into::into));
        self
    }

    /// The configured `protoc`, or the one on `PATH`.
    fn locate_protoc(&self) -> Result<PathBuf> {
        match &self.protoc_path {
            Some(path) => Ok(path.clone()),
            None => which::which("protoc").map_err(|e| {
                SchemaError::Compilation(format!(
                    "protoc not found on PATH ({e}); pass --protoc-path or use --compiler pure"
                ))
            }),
        }
    }

    /// Compile `inputs` and return every file descriptor, imports included.
    pub fn compile_files<P: AsRef<Path>>(&self, inputs: &[P]) -> Result<Vec<FileDescriptorProto>> {
        if inputs.is_empty() {
            return Err(SchemaError::Compilation(
                "No schema files were given".to_string(),
            ));
        }

        let mut parser = Parser::new();
        match self.kind {
            CompilerKind::Protoc => {
                let protoc = self.locate_protoc()?;
                parser.protoc();
                parser.protoc_path(&protoc);
            }
            CompilerKind::Pure => {
                parser.pure();
            }
        }

        let mut includes = self.includes.clone();
        for input in inputs {
            let input = input.as_ref();
            parser.input(input);

            // Inputs must live under an include directory
            let covered = includes.iter().any(|dir| input.starts_with(dir));
            if !covered {
                if let Some(parent) = input.parent() {
                    let parent = if parent.as_os_str().is_empty() {
                        Path::new(".")
                    } else {
                        parent
                    };
                    if !includes.iter().any(|dir| dir == parent) {
                        includes.push(parent.to_path_buf());
                    }
                }
            }
        }
        parser.includes(&includes);

        tracing::info!(
            "Compiling {} schema file(s) with {}",
            inputs.len(),
            self.kind
        );

        let parsed = parser
            .parse_and_typecheck()
            .map_err(|e| SchemaError::Compilation(format!("{e:#}")))?;

        if parsed.file_descriptors.is_empty() {
            return Err(SchemaError::Compilation(
                "Compiler produced no file descriptors".to_string(),
            ));
        }

        Ok(parsed.file_descriptors)
    }

    /// Compile `inputs` and build the schema catalog from the result.
    pub fn compile_schema<P: AsRef<Path>>(&self, inputs: &[P]) -> Result<ProtoSchema> {
        let files = self.compile_files(inputs)?;
        schema_from_files(&files)
    }

    /// Compile schema source held in memory.
    pub fn compile_str(&self, content: &str) -> Result<ProtoSchema> {
        let dir = tempfile::tempdir()
            .map_err(|e| SchemaError::Compilation(format!("Failed to create temp dir: {e}")))?;
        let path = dir.path().join("schema.proto");
        std::fs::write(&path, content)
            .map_err(|e| SchemaError::Compilation(format!("Failed to write temp file: {e}")))?;

        self.compile_schema(&[path])
    }
}
