//! Identifier case conversion for wire names and enum labels.
//!
//! Logical names are camelCase (fields) or PascalCase (types, variants). Word
//! splitting is heck's: digits stay attached to the word before them, so
//! `rotateSkew0` becomes `rotate_skew0`.

use heck::{ToKebabCase, ToLowerCamelCase, ToShoutySnakeCase, ToSnakeCase, ToUpperCamelCase};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStyle {
    CamelCase,
    PascalCase,
    SnakeCase,
    ScreamingSnakeCase,
    KebabCase,
}

impl CaseStyle {
    pub fn rename(self, ident: &str) -> String {
        match self {
            CaseStyle::SnakeCase => ident.to_snake_case(),
            CaseStyle::KebabCase => ident.to_kebab_case(),
            CaseStyle::ScreamingSnakeCase => ident.to_shouty_snake_case(),
            CaseStyle::PascalCase => ident.to_upper_camel_case(),
            CaseStyle::CamelCase => ident.to_lower_camel_case(),
        }
    }
}
