use scraper::ElementRef;

/// Visible text of an element with whitespace runs collapsed to single spaces
pub fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Replace embedded line breaks with single spaces and trim the ends
pub fn clean_field(value: &str) -> String {
    let mut cleaned = String::with_capacity(value.len());
    let mut in_break = false;
    for c in value.chars() {
        if c == '\n' || c == '\r' {
            if !in_break {
                cleaned.push(' ');
                in_break = true;
            }
        } else {
            cleaned.push(c);
            in_break = false;
        }
    }
    cleaned.trim().to_string()
}

/// Append `page=N` to a directory URL
pub fn page_url(base_url: &str, page: u32) -> String {
    let separator = if base_url.contains('?') { '&' } else { '?' };
    format!("{}{}page={}", base_url, separator, page)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    #[test]
    fn test_clean_field_collapses_breaks() {
        assert_eq!(clean_field("  Kopi\r\nKampung \n"), "Kopi Kampung");
        assert_eq!(clean_field("a\n\n\nb"), "a b");
        assert_eq!(clean_field("plain"), "plain");
        assert_eq!(clean_field("\n"), "");
    }

    #[test]
    fn test_page_url() {
        assert_eq!(page_url("https://petakopi.my/", 3), "https://petakopi.my/?page=3");
        assert_eq!(
            page_url("https://petakopi.my/?district=petaling", 2),
            "https://petakopi.my/?district=petaling&page=2"
        );
    }

    #[test]
    fn test_element_text() {
        let doc = Html::parse_fragment("<p>  Kopi \n <b>Kampung</b>  </p>");
        let selector = Selector::parse("p").unwrap();
        let p = doc.select(&selector).next().unwrap();
        assert_eq!(element_text(p), "Kopi Kampung");
    }
}
