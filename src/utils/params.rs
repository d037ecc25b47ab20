use crate::error::{AppError, AppResult};
use uuid::Uuid;

/// Parse an identifier taken from a path or form field.
pub fn parse_uuid(raw: &str, name: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| AppError::Validation(format!("Please provide a valid '{}'", name)))
}

/// Parse a comma separated list of identifiers, skipping blanks and duplicates.
pub fn parse_uuid_list(raw: &str, name: &str) -> AppResult<Vec<Uuid>> {
    let mut ids = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let id = parse_uuid(part, name)?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

/// Split `rust, Async,,web` into lowercase names.
pub fn parse_name_list(raw: &str) -> Vec<String> {
    let mut names: Vec<String> = raw
        .split(',')
        .map(|p| p.trim().to_lowercase())
        .filter(|p| !p.is_empty())
        .collect();
    names.dedup();
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_uuid_names_the_field() {
        match parse_uuid("42", "id") {
            Err(AppError::Validation(msg)) => assert_eq!(msg, "Please provide a valid 'id'"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn uuid_list_skips_blanks_and_duplicates() {
        let id = Uuid::new_v4();
        let raw = format!("{id}, ,{id}");
        assert_eq!(parse_uuid_list(&raw, "tags").unwrap(), vec![id]);
        assert!(parse_uuid_list("", "tags").unwrap().is_empty());
        assert!(parse_uuid_list("nope", "tags").is_err());
    }

    #[test]
    fn names_are_lowercased() {
        assert_eq!(parse_name_list("Rust, async,,"), vec!["rust", "async"]);
    }
}
