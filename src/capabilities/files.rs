//! Filesystem tools, confined to a [`Sandbox`].
//!
//! `file-write`, `file-delete` and `file-move` are destructive and run as a
//! dry run unless `confirm` is `true`: they report what they would do and
//! leave the filesystem untouched.

use crate::capabilities::sandbox::Sandbox;
use crate::mcp::tools::{Argument, Arguments, InputSchema, Kind, Tool, ToolCallError, ToolCallResponse};
use logwise::privacy::LogIt;
use serde_json::json;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

fn confirm_argument() -> Argument {
    Argument::new(
        "confirm",
        Kind::Boolean,
        "Apply the change. When false, only describe what would happen.",
        false,
    )
    .with_default(false)
}

fn io_error(action: &str, shown: &str, error: io::Error) -> ToolCallError {
    let message = match error.kind() {
        io::ErrorKind::NotFound => format!("File not found: {shown}"),
        io::ErrorKind::PermissionDenied => format!("Permission denied: {shown}"),
        io::ErrorKind::AlreadyExists => format!("Already exists: {shown}"),
        io::ErrorKind::InvalidData => format!("File is not valid UTF-8 text: {shown}"),
        _ => format!("Failed to {action} {shown}"),
    };
    ToolCallError::new(message).with_detail(format!("{error:?}"))
}

fn dry_run(action: &str, description: String) -> Result<ToolCallResponse, ToolCallError> {
    ToolCallResponse::json(&json!({
        "dryRun": true,
        "action": action,
        "description": description,
        "hint": "Call again with confirm=true to apply",
    }))
}

fn kind_of(metadata: &fs::Metadata) -> &'static str {
    if metadata.is_symlink() {
        "symlink"
    } else if metadata.is_dir() {
        "directory"
    } else {
        "file"
    }
}

/// Reads a UTF-8 text file.
#[derive(Debug, Clone)]
pub struct FileRead {
    sandbox: Arc<Sandbox>,
}

impl FileRead {
    pub fn new(sandbox: Arc<Sandbox>) -> Self {
        FileRead { sandbox }
    }
}

impl Tool for FileRead {
    fn name(&self) -> &str {
        "file-read"
    }

    fn description(&self) -> &str {
        "Reads a text file inside the server's base directory and returns its contents"
    }

    fn input_schema(&self) -> InputSchema {
        InputSchema::new(vec![Argument::new(
            "path",
            Kind::String,
            "Path of the file, relative to the base directory",
            true,
        )])
    }

    fn call(&self, arguments: &Arguments) -> Result<ToolCallResponse, ToolCallError> {
        let requested = arguments.str("path")?;
        let path = self.sandbox.resolve(requested)?;
        let metadata = fs::metadata(&path).map_err(|e| io_error("read", requested, e))?;
        if metadata.is_dir() {
            return Err(ToolCallError::new(format!("Not a file: {requested}")));
        }
        let contents = fs::read_to_string(&path).map_err(|e| io_error("read", requested, e))?;
        Ok(ToolCallResponse::text(contents))
    }
}

/// Creates or overwrites a text file.
#[derive(Debug, Clone)]
pub struct FileWrite {
    sandbox: Arc<Sandbox>,
}

impl FileWrite {
    pub fn new(sandbox: Arc<Sandbox>) -> Self {
        FileWrite { sandbox }
    }
}

impl Tool for FileWrite {
    fn name(&self) -> &str {
        "file-write"
    }

    fn description(&self) -> &str {
        "Writes text to a file inside the base directory, creating parent directories as needed. Dry run unless confirm is true."
    }

    fn input_schema(&self) -> InputSchema {
        InputSchema::new(vec![
            Argument::new("path", Kind::String, "Path of the file, relative to the base directory", true),
            Argument::new("content", Kind::String, "Text to write", true),
            confirm_argument(),
        ])
    }

    fn call(&self, arguments: &Arguments) -> Result<ToolCallResponse, ToolCallError> {
        let requested = arguments.str("path")?;
        let content = arguments.str("content")?;
        let path = self.sandbox.resolve(requested)?;
        let shown = self.sandbox.display(&path);

        let existing = match fs::metadata(&path) {
            Ok(metadata) if metadata.is_dir() => {
                return Err(ToolCallError::new(format!("Is a directory: {shown}")));
            }
            Ok(metadata) => Some(metadata.len()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(io_error("inspect", &shown, e)),
        };

        if !arguments.flag("confirm") {
            let description = match existing {
                Some(old) => format!(
                    "Would overwrite {shown} ({old} bytes) with {} bytes",
                    content.len()
                ),
                None => format!("Would create {shown} with {} bytes", content.len()),
            };
            return dry_run("write", description);
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| io_error("create directories for", &shown, e))?;
        }
        fs::write(&path, content).map_err(|e| io_error("write", &shown, e))?;
        logwise::info_sync!(
            "file-write: wrote {bytes} bytes to {path}",
            bytes = LogIt(&content.len()),
            path = shown.as_str()
        );
        Ok(ToolCallResponse::text(format!(
            "Wrote {} bytes to {shown}",
            content.len()
        )))
    }
}

/// Lists a directory's entries, sorted by name.
#[derive(Debug, Clone)]
pub struct FileList {
    sandbox: Arc<Sandbox>,
}

impl FileList {
    pub fn new(sandbox: Arc<Sandbox>) -> Self {
        FileList { sandbox }
    }
}

impl Tool for FileList {
    fn name(&self) -> &str {
        "file-list"
    }

    fn description(&self) -> &str {
        "Lists the entries of a directory inside the base directory"
    }

    fn input_schema(&self) -> InputSchema {
        InputSchema::new(vec![
            Argument::new("path", Kind::String, "Directory to list, relative to the base directory", false)
                .with_default("."),
        ])
    }

    fn call(&self, arguments: &Arguments) -> Result<ToolCallResponse, ToolCallError> {
        let requested = arguments.opt_str("path").unwrap_or(".");
        let path = self.sandbox.resolve(requested)?;
        let shown = self.sandbox.display(&path);
        let metadata = fs::metadata(&path).map_err(|e| io_error("list", requested, e))?;
        if !metadata.is_dir() {
            return Err(ToolCallError::new(format!("Not a directory: {shown}")));
        }

        let mut entries = Vec::new();
        for entry in fs::read_dir(&path).map_err(|e| io_error("list", &shown, e))? {
            let entry = entry.map_err(|e| io_error("list", &shown, e))?;
            let metadata = entry
                .path()
                .symlink_metadata()
                .map_err(|e| io_error("inspect", &shown, e))?;
            entries.push((
                entry.file_name().to_string_lossy().into_owned(),
                kind_of(&metadata),
                metadata.len(),
            ));
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let entries: Vec<_> = entries
            .into_iter()
            .map(|(name, kind, size)| json!({"name": name, "type": kind, "size": size}))
            .collect();
        ToolCallResponse::json(&json!({"path": shown, "entries": entries}))
    }
}

/// Deletes a file or an empty directory.
#[derive(Debug, Clone)]
pub struct FileDelete {
    sandbox: Arc<Sandbox>,
}

impl FileDelete {
    pub fn new(sandbox: Arc<Sandbox>) -> Self {
        FileDelete { sandbox }
    }
}

impl Tool for FileDelete {
    fn name(&self) -> &str {
        "file-delete"
    }

    fn description(&self) -> &str {
        "Deletes a file or empty directory inside the base directory. Dry run unless confirm is true."
    }

    fn input_schema(&self) -> InputSchema {
        InputSchema::new(vec![
            Argument::new("path", Kind::String, "Path to delete, relative to the base directory", true),
            confirm_argument(),
        ])
    }

    fn call(&self, arguments: &Arguments) -> Result<ToolCallResponse, ToolCallError> {
        let requested = arguments.str("path")?;
        let path = self.sandbox.resolve_entry(requested)?;
        if path == self.sandbox.root() {
            return Err(ToolCallError::new("Refusing to delete the base directory"));
        }
        let shown = self.sandbox.display(&path);
        let metadata = fs::symlink_metadata(&path).map_err(|e| io_error("delete", requested, e))?;
        let kind = kind_of(&metadata);

        if !arguments.flag("confirm") {
            let description = if metadata.is_dir() {
                format!("Would delete empty directory {shown}")
            } else {
                format!("Would delete {kind} {shown} ({} bytes)", metadata.len())
            };
            return dry_run("delete", description);
        }

        let removed = if metadata.is_dir() {
            fs::remove_dir(&path)
        } else {
            fs::remove_file(&path)
        };
        removed.map_err(|e| io_error("delete", &shown, e))?;
        logwise::info_sync!("file-delete: deleted {path}", path = shown.as_str());
        Ok(ToolCallResponse::text(format!("Deleted {kind} {shown}")))
    }
}

/// Moves or renames a file or directory. Never overwrites.
#[derive(Debug, Clone)]
pub struct FileMove {
    sandbox: Arc<Sandbox>,
}

impl FileMove {
    pub fn new(sandbox: Arc<Sandbox>) -> Self {
        FileMove { sandbox }
    }
}

impl Tool for FileMove {
    fn name(&self) -> &str {
        "file-move"
    }

    fn description(&self) -> &str {
        "Moves or renames a file or directory inside the base directory without overwriting. Dry run unless confirm is true."
    }

    fn input_schema(&self) -> InputSchema {
        InputSchema::new(vec![
            Argument::new("from", Kind::String, "Existing path, relative to the base directory", true),
            Argument::new("to", Kind::String, "New path, relative to the base directory", true),
            confirm_argument(),
        ])
    }

    fn call(&self, arguments: &Arguments) -> Result<ToolCallResponse, ToolCallError> {
        let from_requested = arguments.str("from")?;
        let from = self.sandbox.resolve_entry(from_requested)?;
        let to = self.sandbox.resolve_entry(arguments.str("to")?)?;
        if from == self.sandbox.root() {
            return Err(ToolCallError::new("Refusing to move the base directory"));
        }
        let (from_shown, to_shown) = (self.sandbox.display(&from), self.sandbox.display(&to));

        fs::symlink_metadata(&from).map_err(|e| io_error("move", from_requested, e))?;
        if exists(&to) {
            return Err(ToolCallError::new(format!("Already exists: {to_shown}")));
        }
        if to.starts_with(&from) {
            return Err(ToolCallError::new(format!(
                "Cannot move {from_shown} into itself"
            )));
        }

        if !arguments.flag("confirm") {
            return dry_run("move", format!("Would move {from_shown} to {to_shown}"));
        }

        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent).map_err(|e| io_error("create directories for", &to_shown, e))?;
        }
        fs::rename(&from, &to).map_err(|e| io_error("move", &from_shown, e))?;
        logwise::info_sync!(
            "file-move: moved {from} to {to}",
            from = from_shown.as_str(),
            to = to_shown.as_str()
        );
        Ok(ToolCallResponse::text(format!("Moved {from_shown} to {to_shown}")))
    }
}

fn exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}
