#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressParts {
    pub province: String,
    pub district: String,
    pub detail: String,
}

/// Splits a whole address into province, district and the verbatim remainder.
/// Whitespace runs before the first two tokens are skipped; everything after
/// the single separator that ends the district is kept as is. Missing trailing
/// components come back empty.
pub fn split_address(whole: &str) -> AddressParts {
    let (province, rest) = next_token(whole);
    let (district, rest) = next_token(rest);
    AddressParts {
        province: province.to_string(),
        district: district.to_string(),
        detail: rest.to_string(),
    }
}

fn next_token(value: &str) -> (&str, &str) {
    let value = value.trim_start();
    match value.split_once(char::is_whitespace) {
        Some((token, rest)) => (token, rest),
        None => (value, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(value: &str) -> (String, String, String) {
        let split = split_address(value);
        (split.province, split.district, split.detail)
    }

    #[test]
    fn keeps_detail_spaces_verbatim() {
        assert_eq!(
            parts("서울특별시 강남구 테헤란로 133"),
            (
                "서울특별시".to_string(),
                "강남구".to_string(),
                "테헤란로 133".to_string()
            )
        );
        assert_eq!(
            parts("서울특별시 종로구 세종대로  175, 1층").2,
            "세종대로  175, 1층"
        );
    }

    #[test]
    fn degrades_to_empty_components() {
        assert_eq!(parts(""), (String::new(), String::new(), String::new()));
        assert_eq!(parts("   "), (String::new(), String::new(), String::new()));
        assert_eq!(
            parts("Seoul"),
            ("Seoul".to_string(), String::new(), String::new())
        );
        assert_eq!(
            parts("Seoul Mapo-gu"),
            ("Seoul".to_string(), "Mapo-gu".to_string(), String::new())
        );
    }

    #[test]
    fn collapses_separator_runs_between_leading_tokens() {
        assert_eq!(
            parts("  부산광역시   해운대구 우동 1408 "),
            (
                "부산광역시".to_string(),
                "해운대구".to_string(),
                "우동 1408 ".to_string()
            )
        );
    }

    #[test]
    fn detail_keeps_surrounding_whitespace() {
        assert_eq!(parts("A B C D  ").2, "C D  ");
        assert_eq!(parts("A B  C").2, " C");
        assert_eq!(parts("A B ").2, "");
    }
}
