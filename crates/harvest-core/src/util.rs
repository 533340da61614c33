use url::Url;

const INVALID_FILE_CHARS: &[char] = &['<', '>', ':', '"', '|', '?', '*', '\\'];

/// Derive the download file name for a job page.
///
/// Built from the URL path with slashes turned into underscores, prefixed by
/// the job id when there is one. Example:
/// `("https://jobs.example.com/en-us/details/200/eng", "200")` → `"200__en-us_details_200_eng.html"`
pub fn derive_file_name(url: &str, job_id: &str) -> String {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or(url).to_string(),
    };
    let path = path.replace('/', "_");
    let base = if job_id.is_empty() {
        path
    } else {
        format!("{job_id}_{path}")
    };

    let cleaned: String = base
        .chars()
        .map(|c| {
            if INVALID_FILE_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();
    let mut name = cleaned.trim_matches('_').to_string();
    if name.is_empty() {
        name.push_str("index");
    }
    if !name.ends_with(".html") {
        name.push_str(".html");
    }
    name
}

/// Capitalize the first letter of every word and lowercase the rest.
/// A word starts after any character that is not a letter.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for c in text.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_file_name() {
        assert_eq!(
            derive_file_name("https://jobs.example.com/en-us/details/200/eng", "200"),
            "200__en-us_details_200_eng.html"
        );
        assert_eq!(
            derive_file_name("https://jobs.example.com/en-us/details/200/eng?team=X", ""),
            "en-us_details_200_eng.html"
        );
        assert_eq!(
            derive_file_name("https://example.com/jobs/page.html", ""),
            "jobs_page.html"
        );
    }

    #[test]
    fn test_derive_file_name_strips_invalid_chars() {
        assert_eq!(
            derive_file_name("https://example.com/a:b/c*d", "id|1"),
            "id_1__a_b_c_d.html"
        );
        assert_eq!(derive_file_name("https://example.com/", ""), "index.html");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("senior software engineer"), "Senior Software Engineer");
        assert_eq!(title_case("SRE ii"), "Sre Ii");
        assert_eq!(title_case(""), "");
    }
}
