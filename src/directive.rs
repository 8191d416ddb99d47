use regex::Regex;
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// Replace the whole file at `path` with `content`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEditDirective {
    pub path: String,
    pub content: String,
}

impl FileEditDirective {
    /// File name without directory or extension; names the script type the file defines.
    pub fn stem(&self) -> &str {
        let name = self.path.rsplit(['/', '\\']).next().unwrap_or(&self.path);
        match name.rfind('.') {
            Some(dot) if dot > 0 => &name[..dot],
            _ => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneEditDirective {
    CreateEntity { object_name: String, component_name: String },
    SetProperty { object_path: String, component_name: String, property_name: String, raw_value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    FileEdit(FileEditDirective),
    SceneEdit(SceneEditDirective),
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Directive::FileEdit(edit) => write!(f, "file {} ({} bytes)", edit.path, edit.content.len()),
            Directive::SceneEdit(SceneEditDirective::CreateEntity { object_name, component_name }) => {
                write!(f, "create {component_name} on {object_name}")
            }
            Directive::SceneEdit(SceneEditDirective::SetProperty {
                object_path,
                component_name,
                property_name,
                raw_value,
            }) => write!(f, "set {object_path}/{component_name}/{property_name} = {raw_value}"),
        }
    }
}

/// A scene instruction that matched the grammar but could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ParseError {
    /// Byte offset of the match in the reply.
    pub offset: usize,
    pub message: String,
}

/// Pulls edit directives out of free-form assistant text.
#[derive(Debug, Clone)]
pub struct DirectiveExtractor {
    file_block: Regex,
    scene_line: Regex,
}

impl DirectiveExtractor {
    /// `languages` are the fence tags accepted in front of a file path.
    pub fn new<S: AsRef<str>>(languages: &[S]) -> Result<Self, regex::Error> {
        let mut tags: Vec<String> = languages
            .iter()
            .map(|lang| lang.as_ref().trim())
            .filter(|lang| !lang.is_empty())
            .map(regex::escape)
            .collect();
        // Longest first so `csharp` is not cut short by `cs`.
        tags.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        tags.dedup();
        let alternation = if tags.is_empty() { "[A-Za-z0-9_+#-]+".to_string() } else { tags.join("|") };
        let file_block = Regex::new(&format!(r"```(?:{alternation}):([^\n]+)\n([\s\S]+?)```"))?;
        let scene_line = Regex::new(r"(?:```)?scene:([^\n]+)(?:```)?")?;
        Ok(Self { file_block, scene_line })
    }

    /// Every directive found in `text`, in source order. Malformed scene
    /// instructions come back as errors in their position; blank ones are dropped.
    pub fn extract(&self, text: &str) -> Vec<Result<Directive, ParseError>> {
        let mut found: Vec<(usize, Result<Directive, ParseError>)> = Vec::new();
        let mut file_spans = Vec::new();

        for captures in self.file_block.captures_iter(text) {
            let (Some(whole), Some(path), Some(body)) = (captures.get(0), captures.get(1), captures.get(2)) else {
                continue;
            };
            file_spans.push(whole.range());
            let content = body.as_str().trim();
            let path = path.as_str().trim();
            if content.is_empty() || path.is_empty() {
                debug!(target: "copilot::directive", path, "skipping empty file block");
                continue;
            }
            let edit = FileEditDirective { path: path.to_string(), content: content.to_string() };
            found.push((whole.start(), Ok(Directive::FileEdit(edit))));
        }

        for captures in self.scene_line.captures_iter(text) {
            let (Some(whole), Some(instruction)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            if file_spans.iter().any(|span| span.contains(&whole.start())) {
                continue;
            }
            let offset = whole.start();
            match parse_scene_instruction(instruction.as_str()) {
                Some(Ok(edit)) => found.push((offset, Ok(Directive::SceneEdit(edit)))),
                Some(Err(message)) => found.push((offset, Err(ParseError { offset, message }))),
                None => {}
            }
        }

        found.sort_by_key(|(offset, _)| *offset);
        debug!(target: "copilot::directive", count = found.len(), "extracted directives");
        found.into_iter().map(|(_, directive)| directive).collect()
    }
}

/// Parses the text after `scene:`. `None` means there was nothing to parse.
pub fn parse_scene_instruction(raw: &str) -> Option<Result<SceneEditDirective, String>> {
    let trimmed = raw.trim().trim_end_matches('`').trim();
    if trimmed.is_empty() {
        return None;
    }
    let instruction = if !trimmed.contains('=') && !trimmed.starts_with("Create") {
        format!("Create/{trimmed}")
    } else {
        trimmed.to_string()
    };

    if instruction.starts_with("Create/") || instruction.starts_with("Create:") {
        let parts = split_path(&instruction);
        if parts.len() != 3 {
            return Some(Err(format!("Invalid create command format: {instruction}")));
        }
        return Some(Ok(SceneEditDirective::CreateEntity {
            object_name: parts[1].to_string(),
            component_name: parts[2].to_string(),
        }));
    }

    let Some((path, value)) = instruction.split_once('=') else {
        return Some(Err(format!("Invalid scene edit format: {instruction}")));
    };
    let parts = split_path(path);
    if parts.len() < 3 {
        return Some(Err(format!("Invalid object path: {}", path.trim())));
    }
    let (object, rest) = parts.split_at(parts.len() - 2);
    Some(Ok(SceneEditDirective::SetProperty {
        object_path: object.join("/"),
        component_name: rest[0].to_string(),
        property_name: rest[1].to_string(),
        raw_value: value.trim().to_string(),
    }))
}

fn split_path(path: &str) -> Vec<&str> {
    path.split(['/', ':']).map(str::trim).filter(|segment| !segment.is_empty()).collect()
}
