// Common utilities and shared types used across the application

pub mod constants;
pub mod error;
pub mod types;

/// Python-style capitalization: first character uppercased, the rest
/// lowercased. The country service is case-sensitive on name matching, so
/// every configured name goes through this before lookup.
pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::capitalize;

    #[test]
    fn capitalize_lowercases_the_tail() {
        assert_eq!(capitalize("nigeria"), "Nigeria");
        assert_eq!(capitalize("GHANA"), "Ghana");
        assert_eq!(capitalize("Lagos"), "Lagos");
    }

    #[test]
    fn capitalize_handles_empty_input() {
        assert_eq!(capitalize(""), "");
    }
}
