/// `title.principals.tsv` parser
///
/// Columns: tconst, ordering, nconst, category, job, characters
use super::Fields;
use crate::models::RoleKind;

pub const MIN_FIELDS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalRecord<'a> {
    pub tconst: &'a str,
    pub nconst: &'a str,
    pub role: RoleKind,
    pub characters: Option<String>,
}

/// Parse a principal line; categories without a role yield `None`
pub fn parse_principal<'a>(fields: &Fields<'a>) -> Option<PrincipalRecord<'a>> {
    let role = RoleKind::from_category(fields.text(3))?;

    Some(PrincipalRecord {
        tconst: fields.text(0),
        nconst: fields.text(2),
        role,
        characters: fields.optional_text(5).and_then(clean_characters),
    })
}

/// Strip the JSON-ish `["..."]` wrapping from a characters value
pub fn clean_characters(raw: &str) -> Option<String> {
    let cleaned = raw.trim_matches(|c| matches!(c, '[' | ']' | '"'));
    (!cleaned.is_empty()).then(|| cleaned.to_string())
}
