//! Maps file extensions to Tree-sitter grammars.

use crate::errors::{InstrumentError, Result};
use std::path::Path;
use tree_sitter::Parser;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceLanguage {
    JavaScript,
    TypeScript,
    Tsx,
}

impl SourceLanguage {
    /// Pick a grammar from the file extension. JSX modules parse with the
    /// JavaScript grammar; `.tsx` needs the dedicated TSX grammar.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "js" | "jsx" | "mjs" | "cjs" => Some(SourceLanguage::JavaScript),
            "ts" | "mts" | "cts" => Some(SourceLanguage::TypeScript),
            "tsx" => Some(SourceLanguage::Tsx),
            _ => None,
        }
    }

    pub fn grammar(self) -> tree_sitter::Language {
        match self {
            SourceLanguage::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            SourceLanguage::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            SourceLanguage::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        }
    }

    pub fn parser(self) -> Result<Parser> {
        let mut parser = Parser::new();
        parser.set_language(&self.grammar())?;
        Ok(parser)
    }

    pub fn for_file(path: &Path) -> Result<Self> {
        Self::from_path(path).ok_or_else(|| InstrumentError::UnsupportedExtension {
            path: path.to_path_buf(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_selects_grammar() {
        assert_eq!(
            SourceLanguage::from_path(Path::new("lib/api.ts")),
            Some(SourceLanguage::TypeScript)
        );
        assert_eq!(
            SourceLanguage::from_path(Path::new("components/Button.tsx")),
            Some(SourceLanguage::Tsx)
        );
        assert_eq!(
            SourceLanguage::from_path(Path::new("util.mjs")),
            Some(SourceLanguage::JavaScript)
        );
        assert_eq!(SourceLanguage::from_path(Path::new("styles.css")), None);
        assert_eq!(SourceLanguage::from_path(Path::new("Makefile")), None);
    }
}
