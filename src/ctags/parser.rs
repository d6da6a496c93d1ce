//! Typed ctags records and the filter pipeline.
//!
//! ctags is run with `--fields=KSTtzns`, which yields one tab separated
//! record per symbol:
//!
//! ```text
//! setup	/tmp/Blink/Blink.ino	/^void setup() {$/;"	kind:function	line:3	signature:()	returntype:void
//! ```
//!
//! Every stage of the pipeline takes the whole tag stream and only marks
//! records as skipped, so later stages still see everything ctags found.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::ctags::clinkage;

pub const KIND_FUNCTION: &str = "function";
pub const KIND_PROTOTYPE: &str = "prototype";

const TEMPLATE: &str = "template";
const STATIC: &str = "static";
const EXTERN_C: &str = "extern \"C\"";

/// Lines read from the source file when a tag's code snippet is cut
/// before the closing parenthesis.
const MAX_CONTINUATION_LINES: usize = 10;

/// The `kind` field of a tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagKind {
    Function,
    Prototype,
    Variable,
    Struct,
    Class,
    Other(String),
}

impl TagKind {
    pub fn parse(value: &str) -> Self {
        match value {
            KIND_FUNCTION => TagKind::Function,
            KIND_PROTOTYPE => TagKind::Prototype,
            "variable" => TagKind::Variable,
            "struct" => TagKind::Struct,
            "class" => TagKind::Class,
            other => TagKind::Other(other.to_string()),
        }
    }

    /// Kinds that can need a forward declaration.
    pub fn is_known(&self) -> bool {
        matches!(self, TagKind::Function | TagKind::Prototype)
    }
}

impl fmt::Display for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagKind::Function => write!(f, "{}", KIND_FUNCTION),
            TagKind::Prototype => write!(f, "{}", KIND_PROTOTYPE),
            TagKind::Variable => write!(f, "variable"),
            TagKind::Struct => write!(f, "struct"),
            TagKind::Class => write!(f, "class"),
            TagKind::Other(kind) => write!(f, "{}", kind),
        }
    }
}

/// Enclosing scope of a member symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Class(String),
    Struct(String),
    Namespace(String),
}

/// Declaration modifiers kept apart from the prototype text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub is_static: bool,
    pub c_linkage: bool,
}

impl Modifiers {
    pub fn is_empty(&self) -> bool {
        !self.is_static && !self.c_linkage
    }
}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if self.is_static {
            parts.push(STATIC);
        }
        if self.c_linkage {
            parts.push(EXTERN_C);
        }
        write!(f, "{}", parts.join(" "))
    }
}

/// Why a tag produces no prototype.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Neither a function nor a prototype.
    UnknownKind,
    /// Member of a class, struct or namespace.
    Scoped,
    /// The sketch already declares this prototype.
    AlreadyDeclared,
    /// An earlier tag has the same prototype.
    Duplicate,
    /// The synthesized prototype is not what the source says.
    CodeMismatch,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            SkipReason::UnknownKind => "not a function",
            SkipReason::Scoped => "member of a class, struct or namespace",
            SkipReason::AlreadyDeclared => "already declared",
            SkipReason::Duplicate => "duplicate",
            SkipReason::CodeMismatch => "prototype does not match the code",
        };
        f.write_str(reason)
    }
}

/// One ctags record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub file: String,
    pub kind: TagKind,
    pub line: usize,
    /// The source line ctags matched, without the `/^...$/` delimiters.
    pub code: String,
    pub scope: Option<Scope>,
    pub typeref: Option<String>,
    pub signature: Option<String>,
    pub return_type: Option<String>,
    /// Declaration text, filled in by [`add_prototypes`].
    pub prototype: String,
    pub modifiers: Modifiers,
    pub skip: Option<SkipReason>,
}

impl Tag {
    pub fn is_skipped(&self) -> bool {
        self.skip.is_some()
    }

    /// A known kind outside any class, struct or namespace.
    pub fn is_handled(&self) -> bool {
        self.kind.is_known() && self.scope.is_none()
    }

    fn parse(row: &str) -> Option<Tag> {
        let mut columns = row.split('\t');
        let name = columns.next()?;
        let file = columns.next()?;

        let mut tag = Tag {
            name: name.to_string(),
            file: file.to_string(),
            kind: TagKind::Other(String::new()),
            line: 0,
            code: String::new(),
            scope: None,
            typeref: None,
            signature: None,
            return_type: None,
            prototype: String::new(),
            modifiers: Modifiers::default(),
            skip: None,
        };

        for column in columns {
            let Some((field, value)) = column.split_once(':') else {
                continue;
            };
            let value = value.trim();
            match field {
                "kind" => tag.kind = TagKind::parse(value),
                "line" => tag.line = value.parse().unwrap_or(0),
                "typeref" => tag.typeref = Some(value.to_string()),
                "signature" => tag.signature = Some(value.to_string()),
                "returntype" => tag.return_type = Some(value.to_string()),
                "class" => tag.set_scope(Scope::Class(value.to_string())),
                "struct" => tag.set_scope(Scope::Struct(value.to_string())),
                "namespace" => tag.set_scope(Scope::Namespace(value.to_string())),
                _ => {}
            }
        }

        if let (Some(start), Some(end)) = (row.find("/^"), row.find("$/;")) {
            if start + 2 <= end {
                tag.code = row[start + 2..end].to_string();
            }
        }

        Some(tag)
    }

    fn set_scope(&mut self, scope: Scope) {
        if self.scope.is_none() {
            self.scope = Some(scope);
        }
    }

    fn is_template(&self) -> bool {
        self.return_type
            .as_deref()
            .is_some_and(|r| r.starts_with(TEMPLATE))
            || self.code.starts_with(TEMPLATE)
    }
}

/// Parse raw ctags output. Blank lines and malformed records are dropped.
pub fn parse(raw: &str) -> Vec<Tag> {
    raw.lines()
        .map(str::trim)
        .filter(|row| !row.is_empty())
        .filter_map(|row| {
            let tag = Tag::parse(row);
            if tag.is_none() {
                tracing::debug!("ignoring malformed tag record: {}", row);
            }
            tag
        })
        .collect()
}

/// Parse and run the whole filter pipeline.
pub fn parse_and_filter(raw: &str) -> Vec<Tag> {
    filter(parse(raw))
}

/// Run every pipeline stage in order.
pub fn filter(tags: Vec<Tag>) -> Vec<Tag> {
    let tags = skip_unknown_kinds(tags);
    let tags = skip_scoped(tags);
    let tags = add_prototypes(tags);
    let tags = skip_declared(tags);
    let tags = skip_duplicates(tags);
    let tags = skip_code_mismatches(tags);
    clinkage::mark_c_linkage(tags)
}

fn skip_where(mut tags: Vec<Tag>, reason: SkipReason, pred: impl Fn(&Tag) -> bool) -> Vec<Tag> {
    for tag in tags.iter_mut().filter(|t| !t.is_skipped()) {
        if pred(tag) {
            tracing::debug!("skipping tag `{}`: {}", tag.name, reason);
            tag.skip = Some(reason);
        }
    }
    tags
}

pub fn skip_unknown_kinds(tags: Vec<Tag>) -> Vec<Tag> {
    skip_where(tags, SkipReason::UnknownKind, |t| !t.kind.is_known())
}

pub fn skip_scoped(tags: Vec<Tag>) -> Vec<Tag> {
    skip_where(tags, SkipReason::Scoped, |t| t.scope.is_some())
}

/// Fill in the prototype text and modifiers of every remaining tag.
pub fn add_prototypes(mut tags: Vec<Tag>) -> Vec<Tag> {
    for tag in tags.iter_mut().filter(|t| !t.is_skipped()) {
        if tag.is_template() {
            tag.prototype = template_prototype(&tag.code);
            continue;
        }

        tag.prototype = format!(
            "{} {}{};",
            tag.return_type.as_deref().unwrap_or_default(),
            tag.name,
            tag.signature.as_deref().unwrap_or_default()
        );

        let head = tag
            .code
            .find(tag.name.as_str())
            .map_or(tag.code.as_str(), |at| &tag.code[..at]);
        tag.modifiers.is_static = head.contains(&format!("{} ", STATIC));
        tag.modifiers.c_linkage = head.contains(&format!("{} ", EXTERN_C));
    }
    tags
}

/// Templates are declared with their header verbatim.
fn template_prototype(code: &str) -> String {
    let head = code.split('{').next().unwrap_or_default();
    let head = match head.rfind(')') {
        Some(close) => &head[..=close],
        None => head.trim_end(),
    };
    format!("{};", head)
}

/// Skip functions the sketch already declares itself.
pub fn skip_declared(tags: Vec<Tag>) -> Vec<Tag> {
    let declared: HashSet<String> = tags
        .iter()
        .filter(|t| !t.is_skipped() && t.kind == TagKind::Prototype)
        .map(|t| t.prototype.clone())
        .collect();

    skip_where(tags, SkipReason::AlreadyDeclared, |t| {
        declared.contains(&t.prototype)
    })
}

pub fn skip_duplicates(mut tags: Vec<Tag>) -> Vec<Tag> {
    let mut seen = HashSet::new();
    for tag in tags.iter_mut().filter(|t| !t.is_skipped()) {
        if !seen.insert(tag.prototype.clone()) {
            tracing::debug!("skipping tag `{}`: {}", tag.name, SkipReason::Duplicate);
            tag.skip = Some(SkipReason::Duplicate);
        }
    }
    tags
}

/// Skip tags whose synthesized prototype cannot be found in their code.
///
/// Macros and unusual formatting make ctags report signatures that do not
/// exist in the source; declaring those would break the build.
pub fn skip_code_mismatches(tags: Vec<Tag>) -> Vec<Tag> {
    skip_where(tags, SkipReason::CodeMismatch, |t| !prototype_matches_code(t))
}

fn prototype_matches_code(tag: &Tag) -> bool {
    let mut code = strip_blanks(&tag.code);
    if !code.contains(')') {
        if let Some(full) = read_declaration(Path::new(&tag.file), tag.line) {
            code = strip_blanks(&full);
        }
    }

    let prototype = strip_blanks(&tag.prototype);
    let prototype = prototype.strip_suffix(';').unwrap_or(&prototype);
    code.contains(prototype)
}

/// Join up to ten source lines starting at `line` until a `)` shows up.
fn read_declaration(file: &Path, line: usize) -> Option<String> {
    let text = fs::read_to_string(file).ok()?;
    let mut joined = String::new();
    for row in text.lines().skip(line.saturating_sub(1)).take(MAX_CONTINUATION_LINES) {
        joined.push_str(row);
        if joined.contains(')') {
            return Some(joined);
        }
    }
    None
}

pub(crate) fn strip_blanks(s: &str) -> String {
    s.chars().filter(|c| *c != ' ' && *c != '\t').collect()
}
