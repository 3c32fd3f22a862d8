//! Content filter for message bodies.

const DENYLIST: [&str; 3] = ["kerfuffle", "sharbert", "fornax"];
const MASK: &str = "****";

/// Replace denylisted words with the mask token.
///
/// Purely lexical: words are space-delimited and must match a denylist
/// entry exactly (case-insensitive). "kerfuffle!" is not a match.
pub fn censor(body: &str) -> String {
    body.split(' ')
        .map(|word| {
            if DENYLIST.iter().any(|bad| word.eq_ignore_ascii_case(bad)) {
                MASK
            } else {
                word
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_denylisted_words() {
        assert_eq!(censor("hello kerfuffle world"), "hello **** world");
    }

    #[test]
    fn matching_ignores_case() {
        assert_eq!(censor("Sharbert FORNAX kerfuffle"), "**** **** ****");
    }

    #[test]
    fn punctuation_defeats_the_match() {
        // Exact-word matching only, no substring or stemmed matches.
        assert_eq!(censor("kerfuffle!"), "kerfuffle!");
    }

    #[test]
    fn clean_text_is_untouched() {
        assert_eq!(censor("nothing to see here"), "nothing to see here");
    }
}
