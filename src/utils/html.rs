use ammonia;

/// Clean HTML content using the ammonia library.
///
/// Generated question text, options and teacher-supplied subjects are shown
/// verbatim by the client, so markup is stripped to a safe whitelist before
/// it is stored. `<script>` tags are removed along with their content.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

/// Cleans the input and trims surrounding whitespace.
pub fn clean_text(input: &str) -> String {
    clean_html(input).trim().to_string()
}
