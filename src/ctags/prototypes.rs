//! Forward declarations synthesized from filtered tags.

use std::fmt;
use std::path::Path;

use crate::ctags::parser::{Modifiers, Tag, TagKind};

/// A forward declaration to insert into the sketch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prototype {
    pub name: String,
    pub file: String,
    /// Declaration text, e.g. `void setup();`.
    pub text: String,
    pub modifiers: Modifiers,
    pub line: usize,
}

impl Prototype {
    /// The line inserted into the source: modifiers, then the text.
    pub fn declaration(&self) -> String {
        if self.modifiers.is_empty() {
            self.text.clone()
        } else {
            format!("{} {}", self.modifiers, self.text)
        }
    }
}

impl fmt::Display for Prototype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.declaration())
    }
}

/// Prototypes for the surviving tags and the line to insert them at.
///
/// `main_file` restricts the search for the first function definition
/// to the sketch's main file.
pub fn synthesize(tags: &[Tag], main_file: Option<&Path>) -> (Vec<Prototype>, Option<usize>) {
    let prototypes = tags
        .iter()
        .filter(|t| !t.is_skipped() && !t.prototype.trim().is_empty())
        .map(|t| Prototype {
            name: t.name.clone(),
            file: t.file.clone(),
            text: t.prototype.clone(),
            modifiers: t.modifiers,
            line: t.line,
        })
        .collect();

    (prototypes, insertion_line(tags, main_file))
}

/// The earlier of the first function definition and the first use of a
/// function's address.
pub fn insertion_line(tags: &[Tag], main_file: Option<&Path>) -> Option<usize> {
    match (
        first_function_line(tags, main_file),
        first_function_pointer_line(tags),
    ) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

fn first_function_line(tags: &[Tag], main_file: Option<&Path>) -> Option<usize> {
    tags.iter()
        .filter(|t| main_file.map_or(true, |main| Path::new(&t.file) == main))
        .find(|t| t.is_handled() && t.kind == TagKind::Function)
        .map(|t| t.line)
}

/// Declarations must precede code like `attachInterrupt(0, &isr, RISING)`.
fn first_function_pointer_line(tags: &[Tag]) -> Option<usize> {
    let names: Vec<&str> = tags
        .iter()
        .filter(|t| t.kind == TagKind::Function)
        .map(|t| t.name.as_str())
        .collect();

    tags.iter()
        .find(|t| names.iter().any(|name| t.code.contains(&format!("&{}", name))))
        .map(|t| t.line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ctags::parser::parse_and_filter;

    fn produce(fixture: &str) -> (Vec<Prototype>, Option<usize>) {
        synthesize(&parse_and_filter(fixture), None)
    }

    fn texts(prototypes: &[Prototype]) -> Vec<&str> {
        prototypes.iter().map(|p| p.text.as_str()).collect()
    }

    #[test]
    fn test_lists_prototypes() {
        let (prototypes, line) = produce(include_str!("test_data/ListPrototypes.txt"));

        assert_eq!(
            texts(&prototypes),
            vec![
                "void setup();",
                "void loop();",
                "void digitalCommand(YunClient client);",
                "void analogCommand(YunClient client);",
                "void modeCommand(YunClient client);",
            ]
        );
        assert_eq!(prototypes[0].file, "/tmp/sketch7210316334309249705.cpp");
        assert_eq!(line, Some(33));
    }

    #[test]
    fn test_lists_templates() {
        let (prototypes, line) = produce(include_str!("test_data/Templates.txt"));

        assert_eq!(
            texts(&prototypes),
            vec![
                "template <typename T> T minimum (T a, T b);",
                "void setup();",
                "void loop();",
            ]
        );
        assert_eq!(line, Some(2));
    }

    #[test]
    fn test_lists_templates_with_references() {
        let (prototypes, line) = produce(include_str!("test_data/Templates2.txt"));

        assert_eq!(
            texts(&prototypes),
            vec![
                "void setup();",
                "void loop();",
                "template <class T> int SRAM_writeAnything(int ee, const T& value);",
                "template <class T> int SRAM_readAnything(int ee, T& value);",
            ]
        );
        assert_eq!(line, Some(1));
    }

    #[test]
    fn test_struct_members_never_leak() {
        let (prototypes, line) = produce(include_str!("test_data/Structs.txt"));

        assert_eq!(
            texts(&prototypes),
            vec!["void setup();", "void loop();", "void dostuff(A_NEW_TYPE * bar);"]
        );
        assert_eq!(line, Some(9));
    }

    #[test]
    fn test_class_members_are_filtered_out() {
        let (prototypes, line) = produce(include_str!("test_data/ClassMembers.txt"));

        assert_eq!(texts(&prototypes), vec!["void setup();", "void loop();"]);
        assert_eq!(line, Some(14));
    }

    #[test]
    fn test_function_pointer_moves_insertion_up() {
        let (prototypes, line) = produce(include_str!("test_data/FunctionPointer.txt"));

        assert_eq!(
            texts(&prototypes),
            vec!["void t1Callback();", "void setup();", "void loop();"]
        );
        assert_eq!(line, Some(2));
    }

    #[test]
    fn test_static_declaration_carries_modifier() {
        let (prototypes, _) = produce(include_str!("test_data/Static.txt"));

        let do_stuff = prototypes.iter().find(|p| p.name == "doStuff").unwrap();
        assert_eq!(do_stuff.declaration(), "static void doStuff();");
        assert_eq!(do_stuff.to_string(), "static void doStuff();");
    }

    #[test]
    fn test_main_file_restricts_first_function() {
        let tags = parse_and_filter(
            "helper\t/tmp/Blink/other.ino\t/^void helper() {$/;\"\tkind:function\tline:2\tsignature:()\treturntype:void\n\
             setup\t/tmp/Blink/Blink.ino\t/^void setup() {$/;\"\tkind:function\tline:5\tsignature:()\treturntype:void\n",
        );

        assert_eq!(insertion_line(&tags, None), Some(2));
        assert_eq!(
            insertion_line(&tags, Some(Path::new("/tmp/Blink/Blink.ino"))),
            Some(5)
        );
    }

    #[test]
    fn test_declared_function_still_marks_insertion_line() {
        let tags = parse_and_filter(
            "blink\t/tmp/a.ino\t/^void blink();$/;\"\tkind:prototype\tline:1\tsignature:()\treturntype:void\n\
             blink\t/tmp/a.ino\t/^void blink() {$/;\"\tkind:function\tline:3\tsignature:()\treturntype:void\n\
             setup\t/tmp/a.ino\t/^void setup() {$/;\"\tkind:function\tline:7\tsignature:()\treturntype:void\n",
        );

        let blink = tags
            .iter()
            .find(|t| t.name == "blink" && t.kind == TagKind::Function)
            .unwrap();
        assert!(blink.is_skipped());

        let (prototypes, line) = synthesize(&tags, None);
        assert_eq!(line, Some(3));
        assert!(texts(&prototypes).contains(&"void setup();"));
    }

    #[test]
    fn test_no_functions_no_insertion_line() {
        let (prototypes, line) =
            produce("x\t/tmp/a.ino\t/^int x;$/;\"\tkind:variable\tline:1\n");
        assert!(prototypes.is_empty());
        assert_eq!(line, None);
    }
}
