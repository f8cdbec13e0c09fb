//! Language identification
//!
//! Maps file extensions and `-x` compiler arguments to the grammars the
//! backend can parse.

use std::path::Path;

use tree_sitter::Language;

/// Languages with a parse backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LanguageId {
    C,
    Cpp,
}

impl LanguageId {
    /// Detect language from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "c" => Some(LanguageId::C),
            "h" | "cc" | "cpp" | "cxx" | "c++" | "hpp" | "hh" | "hxx" | "ipp" => {
                Some(LanguageId::Cpp)
            }
            _ => None,
        }
    }

    /// Detect language from file path
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Language named by a `-x` argument value
    pub fn from_x_flag(value: &str) -> Option<Self> {
        match value {
            "c" | "c-header" => Some(LanguageId::C),
            "c++" | "c++-header" => Some(LanguageId::Cpp),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            LanguageId::C => "C",
            LanguageId::Cpp => "C++",
        }
    }

    pub(crate) fn grammar(&self) -> Language {
        match self {
            LanguageId::C => tree_sitter_c::LANGUAGE.into(),
            LanguageId::Cpp => tree_sitter_cpp::LANGUAGE.into(),
        }
    }

    /// Reserved words offered by completion outside member access
    pub fn keywords(&self) -> &'static [&'static str] {
        const C_KEYWORDS: &[&str] = &[
            "auto", "break", "case", "char", "const", "continue", "default", "do", "double",
            "else", "enum", "extern", "float", "for", "goto", "if", "inline", "int", "long",
            "register", "restrict", "return", "short", "signed", "sizeof", "static", "struct",
            "switch", "typedef", "union", "unsigned", "void", "volatile", "while",
        ];
        const CPP_KEYWORDS: &[&str] = &[
            "auto", "bool", "break", "case", "catch", "char", "class", "const", "constexpr",
            "continue", "decltype", "default", "delete", "do", "double", "else", "enum",
            "explicit", "extern", "false", "float", "for", "friend", "goto", "if", "inline",
            "int", "long", "mutable", "namespace", "new", "noexcept", "nullptr", "operator",
            "override", "private", "protected", "public", "return", "short", "signed",
            "sizeof", "static", "static_cast", "struct", "switch", "template", "this", "throw",
            "true", "try", "typedef", "typename", "union", "unsigned", "using", "virtual",
            "void", "volatile", "while",
        ];
        match self {
            LanguageId::C => C_KEYWORDS,
            LanguageId::Cpp => CPP_KEYWORDS,
        }
    }
}
